use anyhow::Result;
use raft_reconf::process::*;
use raft_reconf::ServerId;
use reconf_tests::*;
use serial_test::serial;

#[serial]
#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn remove_server_from_three_members() -> Result<()> {
    let cluster = Cluster::bootstrap(&[1, 2, 3]).await?;
    cluster.write(1, 10).await?;

    let resp = cluster.remove_server(1, 3).await?;
    assert!(resp.accepted);
    assert_eq!(resp.next_idx, 11);

    let leader = cluster.process(1);
    wait_for(move || async move { leader.is_config_changing().await }).await?;
    let removed = cluster.process(3);
    wait_for(move || async move { removed.is_removed().await }).await?;
    assert_eq!(removed.read_leader().await, None);
    assert!(cluster
        .app(3)
        .events()
        .contains(&RaftEvent::RemovedFromCluster));

    let conf = cluster.commit_config(1).await?;
    assert_eq!(conf.server_ids(), vec![ServerId(1), ServerId(2)]);
    assert_eq!(leader.read_peers().await, vec![ServerId(2)]);
    assert_eq!(leader.change_phase().await, ChangePhase::Idle);
    Ok(())
}

#[serial]
#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn evict_unreachable_peer_of_two_members() -> Result<()> {
    let cluster = Cluster::bootstrap(&[1, 2]).await?;
    cluster.network.disconnect(ServerId(2));

    let resp = cluster.remove_server(1, 2).await?;
    assert!(resp.accepted);

    let leader = cluster.process(1);
    wait_for(move || async move { leader.is_config_changing().await }).await?;
    assert!(leader.read_peers().await.is_empty());

    // Asking again never ends up in SERVER_NOT_FOUND.
    let resp = cluster.remove_server(1, 2).await?;
    assert!(!resp.accepted);
    assert_eq!(resp.result_code, api::ResultCode::ConfigChanging);

    let conf = cluster.commit_config(1).await?;
    assert_eq!(conf.server_ids(), vec![ServerId(1)]);
    assert!(!leader.is_config_changing().await);
    Ok(())
}

#[serial]
#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn cannot_remove_the_leader() -> Result<()> {
    let cluster = Cluster::bootstrap(&[1, 2, 3]).await?;
    let resp = cluster.remove_server(1, 1).await?;
    assert!(!resp.accepted);
    assert_eq!(resp.result_code, api::ResultCode::CannotRemoveLeader);

    let resp = cluster.remove_server(2, 3).await?;
    assert_eq!(resp.result_code, api::ResultCode::NotLeader);
    assert_eq!(
        cluster.process(1).read_config().await.server_ids().len(),
        3
    );
    Ok(())
}
