use anyhow::{ensure, Context, Result};
use bytes::Bytes;
use raft_reconf::backend::mem;
use raft_reconf::node::LocalNetwork;
use raft_reconf::process::api::Response;
use raft_reconf::process::*;
use raft_reconf::{RaftParams, ServerId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing::info;

static INIT: Once = Once::new();

pub fn params() -> RaftParams {
    RaftParams {
        heartbeat_interval: Duration::from_millis(100),
        max_heartbeat_interval: Duration::from_millis(200),
        response_limit: 20,
        log_sync_stop_gap: 5,
        log_sync_batch_size: 10,
        initial_commit_index: 0,
    }
}

pub fn srv(id: u32) -> ServerConfig {
    ServerConfig::new(ServerId(id), format!("local:{id}"))
}

struct SnapshotReader {
    snapshot_idx: LogIndex,
}

#[derive(Default)]
struct AppState {
    snapshot: Option<(SnapshotMeta, Vec<Bytes>)>,
    received: Vec<Bytes>,
    installed: Option<(SnapshotMeta, Vec<Bytes>)>,
    events: Vec<RaftEvent>,
}

/// State machine whose snapshot is a list of chunks.
#[derive(Clone, Default)]
pub struct TestApp {
    state: Arc<spin::Mutex<AppState>>,
    n_opened: Arc<AtomicUsize>,
    n_freed: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn set_snapshot(&self, meta: SnapshotMeta, chunks: Vec<Bytes>) {
        self.state.lock().snapshot = Some((meta, chunks));
    }

    pub fn installed(&self) -> Option<(SnapshotMeta, Vec<Bytes>)> {
        self.state.lock().installed.clone()
    }

    pub fn events(&self) -> Vec<RaftEvent> {
        self.state.lock().events.clone()
    }

    pub fn n_opened(&self) -> usize {
        self.n_opened.load(Ordering::SeqCst)
    }

    pub fn n_freed(&self) -> usize {
        self.n_freed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RaftApp for TestApp {
    async fn latest_snapshot(&self) -> Result<Option<SnapshotMeta>> {
        Ok(self.state.lock().snapshot.as_ref().map(|(meta, _)| meta.clone()))
    }

    async fn read_snapshot_chunk(
        &self,
        snapshot: &SnapshotMeta,
        ctx: &mut Option<UserSnapshotContext>,
        offset: u64,
    ) -> Result<SnapshotChunk> {
        if ctx.is_none() {
            self.n_opened.fetch_add(1, Ordering::SeqCst);
            *ctx = Some(Box::new(SnapshotReader {
                snapshot_idx: snapshot.last_log_idx,
            }));
        }
        let reader = ctx
            .as_ref()
            .and_then(|ctx| ctx.downcast_ref::<SnapshotReader>())
            .context("not my snapshot reader")?;
        ensure!(reader.snapshot_idx == snapshot.last_log_idx);

        let state = self.state.lock();
        let (_, chunks) = state.snapshot.as_ref().context("snapshot is gone")?;
        let data = chunks
            .get(offset as usize)
            .cloned()
            .context("offset out of range")?;
        Ok(SnapshotChunk {
            data,
            is_last: offset as usize + 1 == chunks.len(),
        })
    }

    async fn free_snapshot_context(&self, _ctx: UserSnapshotContext) {
        self.n_freed.fetch_add(1, Ordering::SeqCst);
    }

    async fn save_snapshot_chunk(
        &self,
        _snapshot: &SnapshotMeta,
        offset: u64,
        data: Bytes,
        _is_last: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if offset == 0 {
            state.received.clear();
        }
        ensure!(state.received.len() as u64 == offset);
        state.received.push(data);
        Ok(())
    }

    async fn install_snapshot(&self, snapshot: &SnapshotMeta) -> Result<()> {
        let mut state = self.state.lock();
        let chunks = std::mem::take(&mut state.received);
        state.installed = Some((snapshot.clone(), chunks));
        Ok(())
    }

    fn on_event(&self, event: RaftEvent) {
        self.state.lock().events.push(event);
    }
}

pub struct Node {
    pub process: RaftProcess,
    pub app: TestApp,
    pub log: mem::LogStore,
}

pub struct Cluster {
    pub network: LocalNetwork,
    nodes: BTreeMap<u32, Node>,
}

impl Cluster {
    pub fn new(with_logging: bool) -> Self {
        INIT.call_once(|| {
            if with_logging {
                let format = tracing_subscriber::fmt::format()
                    .with_target(false)
                    .with_thread_names(true)
                    .compact();
                // test-log may have installed one already.
                tracing_subscriber::fmt()
                    .event_format(format)
                    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                    .try_init()
                    .ok();
            }
        });
        Self {
            network: LocalNetwork::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Servers `ids` forming a cluster led by the first one at term 1.
    pub async fn bootstrap(ids: &[u32]) -> Result<Self> {
        ensure!(!ids.is_empty());
        let mut cluster = Self::new(true);
        for &id in ids {
            cluster.add_node(id, ids).await?;
        }
        let leader = ids[0];
        cluster.process(leader).become_leader(1).await?;
        for &id in &ids[1..] {
            cluster
                .process(id)
                .become_follower(1, ServerId(leader))
                .await?;
        }
        Ok(cluster)
    }

    /// Start server `id` knowing the cluster as `members`.
    pub async fn add_node(&mut self, id: u32, members: &[u32]) -> Result<()> {
        info!("add node (id={id})");
        let app = TestApp::default();
        let log = mem::LogStore::new();
        let config = ClusterConfig::bootstrap(members.iter().map(|i| srv(*i)).collect());
        let process = RaftProcess::new(
            ServerId(id),
            params(),
            config,
            app.clone(),
            log.clone(),
            mem::BallotStore::new(),
            Arc::new(self.network.clone()),
        )
        .await?;
        self.network.attach_process(ServerId(id), process.clone());
        self.nodes.insert(id, Node { process, app, log });
        Ok(())
    }

    pub fn node(&self, id: u32) -> &Node {
        &self.nodes[&id]
    }

    pub fn process(&self, id: u32) -> &RaftProcess {
        &self.node(id).process
    }

    pub fn app(&self, id: u32) -> &TestApp {
        &self.node(id).app
    }

    pub fn log(&self, id: u32) -> &mem::LogStore {
        &self.node(id).log
    }

    /// Append `n` entries on `id` and commit them.
    pub async fn write(&self, id: u32, n: u64) -> Result<LogIndex> {
        let log = self.log(id);
        let mut last = log.next_slot().await? - 1;
        for i in 0..n {
            let e = LogEntry::new(1, Bytes::from(format!("{id}:{i}")), LogValueType::AppLog);
            last = log.append(e).await?;
        }
        self.process(id).advance_commit_index(last).await;
        Ok(last)
    }

    pub async fn add_server(&self, leader: u32, id: u32) -> Result<Response> {
        self.process(leader).add_server(srv(id)).await
    }

    pub async fn remove_server(&self, leader: u32, id: u32) -> Result<Response> {
        self.process(leader).remove_server(ServerId(id)).await
    }

    /// Stand-in for the replication and the commit driver:
    /// deliver the configuration `leader` appended to its members and commit it everywhere.
    pub async fn commit_config(&self, leader: u32) -> Result<Arc<ClusterConfig>> {
        let conf = self
            .process(leader)
            .read_uncommitted_config()
            .await
            .context("no config to commit")?;

        let members: Vec<u32> = conf
            .server_ids()
            .into_iter()
            .map(|id| id.0)
            .filter(|id| *id != leader && self.nodes.contains_key(id))
            .collect();
        for &id in &members {
            self.process(id)
                .notify_config_appended(conf.as_ref().clone())
                .await?;
        }

        self.process(leader).advance_commit_index(conf.log_idx).await;
        self.process(leader)
            .notify_config_committed(conf.log_idx)
            .await?;
        for &id in &members {
            self.process(id).notify_config_committed(conf.log_idx).await?;
        }
        Ok(conf)
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        for id in self.network.list_processes() {
            self.network.detach_process(id);
        }
    }
}

/// Poll `f` until it holds, for up to 5 seconds.
pub async fn wait_for<F, Fut>(f: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if f().await {
            return Ok(());
        }
        ensure!(tokio::time::Instant::now() < deadline, "timed out");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
