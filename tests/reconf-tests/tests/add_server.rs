use anyhow::Result;
use rand::Rng;
use raft_reconf::process::*;
use raft_reconf::ServerId;
use reconf_tests::*;
use serial_test::serial;

#[serial]
#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn add_server_to_three_members() -> Result<()> {
    let mut cluster = Cluster::bootstrap(&[1, 2, 3]).await?;
    let n = rand::thread_rng().gen_range(20..60);
    let commit_idx = cluster.write(1, n).await?;

    cluster.add_node(4, &[4]).await?;
    let resp = cluster.add_server(1, 4).await?;
    assert!(resp.accepted);
    assert_eq!(resp.next_idx, commit_idx + 1);

    let leader = cluster.process(1);
    wait_for(move || async move { leader.is_config_changing().await }).await?;

    let conf = leader
        .read_uncommitted_config()
        .await
        .ok_or(anyhow::anyhow!("config is not appended"))?;
    assert_eq!(
        conf.server_ids(),
        vec![ServerId(1), ServerId(2), ServerId(3), ServerId(4)]
    );
    assert_eq!(conf.log_idx, commit_idx + 1);

    // The new server converged to within the stop gap.
    let new_srv = cluster.process(4);
    assert!(new_srv.is_catching_up().await);
    assert_eq!(new_srv.read_leader().await, Some(ServerId(1)));
    assert_eq!(new_srv.read_election_state().await, ElectionState::Follower);
    assert!(cluster.log(4).next_slot().await? + 5 > commit_idx);

    cluster.commit_config(1).await?;
    assert!(!leader.is_config_changing().await);
    assert_eq!(leader.change_phase().await, ChangePhase::Idle);
    assert_eq!(
        leader.read_peers().await,
        vec![ServerId(2), ServerId(3), ServerId(4)]
    );
    assert!(!new_srv.is_catching_up().await);
    assert!(cluster.app(4).events().contains(&RaftEvent::JoinedCluster));
    Ok(())
}

#[serial]
#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn concurrent_adds_are_single_flight() -> Result<()> {
    let mut cluster = Cluster::bootstrap(&[1, 2, 3]).await?;
    cluster.write(1, 30).await?;
    for id in 4..=6 {
        cluster.add_node(id, &[id]).await?;
    }

    let futs = (4..=6).map(|id| cluster.add_server(1, id));
    let resps = futures::future::try_join_all(futs).await?;
    let n_accepted = resps.iter().filter(|r| r.accepted).count();
    assert_eq!(n_accepted, 1);
    for resp in resps.iter().filter(|r| !r.accepted) {
        // The accepted one may have converged already.
        assert!(matches!(
            resp.result_code,
            api::ResultCode::ServerIsJoining | api::ResultCode::ConfigChanging
        ));
    }

    let leader = cluster.process(1);
    wait_for(move || async move { leader.is_config_changing().await }).await?;
    for id in 4..=6 {
        let resp = cluster.add_server(1, id).await?;
        assert!(!resp.accepted);
        assert!(matches!(
            resp.result_code,
            api::ResultCode::ConfigChanging | api::ResultCode::ServerAlreadyExists
        ));
    }
    Ok(())
}

#[serial]
#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn join_after_abandoned_attempt() -> Result<()> {
    let mut cluster = Cluster::bootstrap(&[1, 2, 3]).await?;
    cluster.write(1, 30).await?;
    cluster.add_node(4, &[4]).await?;

    cluster.network.disconnect(ServerId(4));
    assert!(cluster.add_server(1, 4).await?.accepted);

    let app = cluster.app(1);
    wait_for(move || async move {
        app.events()
            .contains(&RaftEvent::JoinAbandoned { id: ServerId(4) })
    })
    .await?;
    let leader = cluster.process(1);
    assert_eq!(leader.change_phase().await, ChangePhase::Idle);
    assert!(!leader.is_config_changing().await);
    assert!(!cluster.process(4).is_catching_up().await);

    cluster.network.connect(ServerId(4));
    assert!(cluster.add_server(1, 4).await?.accepted);
    wait_for(move || async move { leader.is_config_changing().await }).await?;
    cluster.commit_config(1).await?;
    assert!(leader.read_config().await.contains(ServerId(4)));
    Ok(())
}
