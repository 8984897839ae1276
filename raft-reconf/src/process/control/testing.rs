use super::*;

use crate::backend::mem;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// State machine recording what the protocol asked of it.
#[derive(Clone, Default)]
pub struct MockApp {
    pub snapshot: Arc<spin::Mutex<Option<SnapshotMeta>>>,
    pub n_chunks: Arc<AtomicU64>,
    pub opened: Arc<AtomicUsize>,
    pub freed: Arc<AtomicUsize>,
    pub received: Arc<spin::Mutex<Vec<(u64, bool)>>>,
    pub installed: Arc<spin::Mutex<Option<SnapshotMeta>>>,
    pub events: Arc<spin::Mutex<Vec<RaftEvent>>>,
}

impl MockApp {
    /// Every snapshot is read in `n` chunks.
    pub fn set_n_chunks(&self, n: u64) {
        self.n_chunks.store(n, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn freed(&self) -> usize {
        self.freed.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<RaftEvent> {
        self.events.lock().clone()
    }
}

#[async_trait::async_trait]
impl RaftApp for MockApp {
    async fn latest_snapshot(&self) -> Result<Option<SnapshotMeta>> {
        Ok(self.snapshot.lock().clone())
    }

    async fn read_snapshot_chunk(
        &self,
        _snapshot: &SnapshotMeta,
        ctx: &mut Option<UserSnapshotContext>,
        offset: u64,
    ) -> Result<SnapshotChunk> {
        if ctx.is_none() {
            self.opened.fetch_add(1, Ordering::SeqCst);
            *ctx = Some(Box::new(offset));
        }
        Ok(SnapshotChunk {
            data: Bytes::from(format!("chunk-{offset}")),
            is_last: offset + 1 >= self.n_chunks.load(Ordering::SeqCst).max(1),
        })
    }

    async fn free_snapshot_context(&self, _ctx: UserSnapshotContext) {
        self.freed.fetch_add(1, Ordering::SeqCst);
    }

    async fn save_snapshot_chunk(
        &self,
        _snapshot: &SnapshotMeta,
        offset: u64,
        _data: Bytes,
        is_last: bool,
    ) -> Result<()> {
        self.received.lock().push((offset, is_last));
        Ok(())
    }

    async fn install_snapshot(&self, snapshot: &SnapshotMeta) -> Result<()> {
        *self.installed.lock() = Some(snapshot.clone());
        Ok(())
    }

    fn on_event(&self, event: RaftEvent) {
        self.events.lock().push(event);
    }
}

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
    ServerConfig::new(ServerId(id), format!("n{id}"))
}

pub struct Fixture {
    pub ctrl: Control,
    pub app: MockApp,
    pub log: mem::LogStore,
    pub ballot: mem::BallotStore,
    pub replication_evt_rx: EventConsumer<ReplicationEvent>,
    pub commit_evt_rx: EventConsumer<CommitEvent>,
}

impl Fixture {
    /// Server `id` knowing the cluster as `members`.
    pub fn new(id: u32, members: &[u32]) -> Self {
        let app = MockApp::default();
        let log = mem::LogStore::new();
        let ballot = mem::BallotStore::new();
        let (replication_evt_tx, replication_evt_rx) = thread::notify();
        let (commit_evt_tx, commit_evt_rx) = thread::notify();

        let config = ClusterConfig::bootstrap(members.iter().map(|i| srv(*i)).collect());
        let ctrl = Control::new(
            ServerId(id),
            params(),
            config,
            Arc::new(app.clone()),
            Arc::new(log.clone()),
            Arc::new(ballot.clone()),
            replication_evt_tx,
            commit_evt_tx,
        );
        Self {
            ctrl,
            app,
            log,
            ballot,
            replication_evt_rx,
            commit_evt_rx,
        }
    }

    /// Server 1 leading the cluster of `1..=n` at term 1.
    pub async fn leader(n: u32) -> Result<Self> {
        let members: Vec<u32> = (1..=n).collect();
        let mut fx = Self::new(1, &members);
        fx.ctrl.become_leader(1).await?;
        Ok(fx)
    }

    /// Append `n` application entries and commit them.
    pub async fn fill_log(&mut self, n: u64) -> Result<LogIndex> {
        let mut last = 0;
        for i in 0..n {
            let e = LogEntry::new(1, Bytes::from(format!("e{i}")), LogValueType::AppLog);
            last = self.log.append(e).await?;
        }
        self.ctrl.advance_commit_index(last);
        Ok(last)
    }

    pub fn outbox(&mut self) -> Vec<Request> {
        self.ctrl.take_outbox().into_iter().map(|o| o.req).collect()
    }

    /// Add `id` and let it confirm the invitation from `next_idx`.
    pub async fn start_join(&mut self, id: u32, next_idx: LogIndex) -> Result<()> {
        let resp = effect::add_server::Effect { ctrl: &mut self.ctrl }
            .exec(Request::add_server(ServerId(1), ServerId(1), &srv(id))?)
            .await?;
        ensure!(resp.accepted);
        self.outbox();

        let mut resp = Response::new(MessageKind::JoinClusterResponse, 1, ServerId(id), ServerId(1));
        resp.accept(next_idx);
        effect::receive_join_response::Effect { ctrl: &mut self.ctrl }
            .exec(resp)
            .await
    }
}

pub fn response(kind: MessageKind, src: u32, accepted: bool, next_idx: LogIndex) -> Response {
    let mut resp = Response::new(kind, 1, ServerId(src), ServerId(1));
    if accepted {
        resp.accept(next_idx);
    }
    resp
}
