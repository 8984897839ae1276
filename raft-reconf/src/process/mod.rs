use super::*;

use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

pub mod api;
use api::{MessageKind, Request, Response, ResultCode};
mod cluster_config;
pub use cluster_config::{ClusterConfig, ServerConfig};
pub mod log_pack;
mod control;
use control::{Control, Outgoing};
pub use control::{ChangePhase, ElectionState, RoleTrigger};
mod thread;
use thread::*;
pub use thread::{CommitEvent, EventConsumer, ReplicationEvent};

/// Election term.
/// In Raft, only one leader can be elected per a term.
pub type Term = u64;

/// Log index.
pub type LogIndex = u64;

/// What the payload of a log entry is.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum LogValueType {
    AppLog,
    /// Serialized `ClusterConfig`.
    Conf,
    /// Serialized `ServerConfig` of a server to add.
    ClusterServer,
    /// Packed range of log entries.
    LogPack,
    /// Chunk of a snapshot in transfer.
    SnapshotSyncRequest,
    Custom,
}

/// Log entry.
/// Owned by the log store once appended.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub term: Term,
    pub value_type: LogValueType,
    pub buf: Bytes,
}

impl LogEntry {
    pub fn new(term: Term, buf: Bytes, value_type: LogValueType) -> Self {
        Self {
            term,
            value_type,
            buf,
        }
    }
}

/// Ballot in election.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Ballot {
    pub cur_term: Term,
    pub voted_for: Option<ServerId>,
}

impl Ballot {
    pub fn new() -> Self {
        Self {
            cur_term: 0,
            voted_for: None,
        }
    }
}

/// Description of a snapshot held by the state machine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SnapshotMeta {
    pub last_log_idx: LogIndex,
    pub last_log_term: Term,
    pub last_config: ClusterConfig,
}

/// A piece of snapshot read by the state machine.
#[derive(Clone, Debug)]
pub struct SnapshotChunk {
    pub data: Bytes,
    pub is_last: bool,
}

/// Chunk of a snapshot as carried in an install-snapshot request.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SnapshotSyncRequest {
    pub snapshot: SnapshotMeta,
    pub offset: u64,
    pub data: Bytes,
    pub done: bool,
}

impl SnapshotSyncRequest {
    pub fn serialize(&self) -> Result<Bytes> {
        Ok(bincode::serialize(self)?.into())
    }

    pub fn deserialize(bin: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bin)?)
    }
}

/// Handle the state machine attaches to a snapshot transfer in progress.
/// It must be given back through `RaftApp::free_snapshot_context` exactly once.
pub type UserSnapshotContext = Box<dyn std::any::Any + Send + Sync>;

/// Notable transitions reported to the application.
#[derive(Clone, Debug, PartialEq)]
pub enum RaftEvent {
    BecomeFollower { leader: ServerId },
    ConfigAppended { log_idx: LogIndex },
    ConfigCommitted { log_idx: LogIndex },
    JoinAbandoned { id: ServerId },
    JoinedCluster,
    RemovedFromCluster,
}

/// Replicated log as seen by the reconfiguration core.
#[async_trait::async_trait]
pub trait RaftLogStore: Sync + Send + 'static {
    /// Append an entry and return the index it is stored at.
    async fn append(&self, entry: LogEntry) -> Result<LogIndex>;
    async fn get_entry(&self, i: LogIndex) -> Result<Option<LogEntry>>;
    /// Pack `cnt` entries from `start`.
    async fn pack(&self, start: LogIndex, cnt: u64) -> Result<Bytes>;
    /// Write the entries of `pack` from `start`, replacing whatever follows.
    async fn apply_pack(&self, start: LogIndex, pack: Bytes) -> Result<()>;
    /// Drop every entry up to `last_idx` and move the start of the log past it.
    async fn compact(&self, last_idx: LogIndex) -> Result<()>;
    /// The earliest index retained.
    async fn start_index(&self) -> Result<LogIndex>;
    /// The index the next entry will be appended at.
    async fn next_slot(&self) -> Result<LogIndex>;
}

/// Durable term and vote.
#[async_trait::async_trait]
pub trait RaftBallotStore: Sync + Send + 'static {
    async fn save_ballot(&self, ballot: Ballot) -> Result<()>;
    async fn load_ballot(&self) -> Result<Ballot>;
}

/// `RaftApp` is an abstraction of the state machine used by `RaftProcess`.
#[async_trait::async_trait]
pub trait RaftApp: Sync + Send + 'static {
    /// The latest snapshot available for transfer.
    async fn latest_snapshot(&self) -> Result<Option<SnapshotMeta>>;

    /// Read the chunk at `offset` of the snapshot.
    /// The implementation may keep its own cursor in `ctx` across calls.
    async fn read_snapshot_chunk(
        &self,
        snapshot: &SnapshotMeta,
        ctx: &mut Option<UserSnapshotContext>,
        offset: u64,
    ) -> Result<SnapshotChunk>;

    /// Release the handle opened by `read_snapshot_chunk`.
    async fn free_snapshot_context(&self, ctx: UserSnapshotContext);

    /// Store a chunk of a snapshot received from the leader.
    async fn save_snapshot_chunk(
        &self,
        snapshot: &SnapshotMeta,
        offset: u64,
        data: Bytes,
        is_last: bool,
    ) -> Result<()>;

    /// Replace the state with the fully received snapshot.
    async fn install_snapshot(&self, snapshot: &SnapshotMeta) -> Result<()>;

    fn on_event(&self, _event: RaftEvent) {}
}

/// Sends a request to a peer and waits for its response.
/// An error means the request or its response was lost.
#[async_trait::async_trait]
pub trait RaftTransport: Sync + Send + 'static {
    async fn send(&self, req: Request) -> Result<Response>;
}

pub type Actor<T> = Arc<RwLock<T>>;

#[allow(dead_code)]
struct ThreadHandles {
    stepdown_handle: ThreadHandle,
}

/// `RaftProcess` runs the membership change protocol of one server.
///
/// Every inbound request, response and failure is processed under the write lock of `Control`,
/// so no two membership decisions are ever evaluated concurrently.
/// Outbound requests are sent after the lock is released and their outcomes re-enter the same path.
#[derive(Clone)]
pub struct RaftProcess {
    ctrl_actor: Actor<Control>,
    io: Arc<dyn RaftTransport>,
    replication_evt_rx: EventConsumer<ReplicationEvent>,
    commit_evt_rx: EventConsumer<CommitEvent>,
    _thread_handles: Arc<ThreadHandles>,
}

impl RaftProcess {
    pub async fn new(
        id: ServerId,
        params: RaftParams,
        init_config: ClusterConfig,
        app: impl RaftApp,
        log: impl RaftLogStore,
        ballot: impl RaftBallotStore,
        io: Arc<dyn RaftTransport>,
    ) -> Result<Self> {
        params.validate()?;

        let (replication_evt_tx, replication_evt_rx) = thread::notify();
        let (commit_evt_tx, commit_evt_rx) = thread::notify();

        let tick_interval = params.heartbeat_interval;
        let ctrl = Control::new(
            id,
            params,
            init_config,
            Arc::new(app),
            Arc::new(log),
            Arc::new(ballot),
            replication_evt_tx,
            commit_evt_tx,
        );
        let ctrl_actor = Arc::new(RwLock::new(ctrl));

        let _thread_handles = ThreadHandles {
            stepdown_handle: thread::stepdown::run(ctrl_actor.clone(), tick_interval),
        };

        Ok(Self {
            ctrl_actor,
            io,
            replication_evt_rx,
            commit_evt_rx,
            _thread_handles: Arc::new(_thread_handles),
        })
    }

    /// Handle a request from a client or the leader and return the response to send back.
    pub async fn process_request(&self, req: Request) -> Result<Response> {
        let mut ctrl = self.ctrl_actor.write().await;
        let resp = match req.kind {
            MessageKind::AddServerRequest => {
                control::effect::add_server::Effect { ctrl: &mut *ctrl }
                    .exec(req)
                    .await?
            }
            MessageKind::RemoveServerRequest => {
                control::effect::remove_server::Effect { ctrl: &mut *ctrl }
                    .exec(req)
                    .await?
            }
            MessageKind::JoinClusterRequest => {
                control::effect::receive_join_request::Effect { ctrl: &mut *ctrl }
                    .exec(req)
                    .await?
            }
            MessageKind::SyncLogRequest => {
                control::effect::receive_sync_log::Effect { ctrl: &mut *ctrl }
                    .exec(req)
                    .await?
            }
            MessageKind::InstallSnapshotRequest => {
                control::effect::receive_snapshot::Effect { ctrl: &mut *ctrl }
                    .exec(req)
                    .await?
            }
            MessageKind::LeaveClusterRequest => {
                control::effect::receive_leave_request::Effect { ctrl: &mut *ctrl }
                    .exec(req)
                    .await?
            }
            kind => bail!(Error::UnexpectedMessage(kind)),
        };
        let outbox = ctrl.take_outbox();
        drop(ctrl);

        self.dispatch(outbox);
        Ok(resp)
    }

    /// Handle the response to a request this server sent.
    pub async fn process_response(&self, resp: Response) -> Result<()> {
        let mut ctrl = self.ctrl_actor.write().await;
        match resp.kind {
            MessageKind::JoinClusterResponse => {
                control::effect::receive_join_response::Effect { ctrl: &mut *ctrl }
                    .exec(resp)
                    .await?
            }
            MessageKind::SyncLogResponse => {
                control::effect::receive_sync_log_response::Effect { ctrl: &mut *ctrl }
                    .exec(resp)
                    .await?
            }
            MessageKind::InstallSnapshotResponse => {
                control::effect::receive_snapshot_response::Effect { ctrl: &mut *ctrl }
                    .exec(resp)
                    .await?
            }
            MessageKind::LeaveClusterResponse => {
                control::effect::receive_leave_response::Effect { ctrl: &mut *ctrl }
                    .exec(resp)
                    .await?
            }
            kind => bail!(Error::UnexpectedMessage(kind)),
        }
        let outbox = ctrl.take_outbox();
        drop(ctrl);

        self.dispatch(outbox);
        Ok(())
    }

    /// A request of `kind` to `peer` failed even after retrying.
    pub async fn process_rpc_failure(&self, kind: MessageKind, peer: ServerId) -> Result<()> {
        let mut ctrl = self.ctrl_actor.write().await;
        control::effect::rpc_failure::Effect { ctrl: &mut *ctrl }
            .exec(kind, peer)
            .await?;
        let outbox = ctrl.take_outbox();
        drop(ctrl);

        self.dispatch(outbox);
        Ok(())
    }

    async fn process_send_failure(&self, req: Request) -> Result<()> {
        let mut ctrl = self.ctrl_actor.write().await;
        control::effect::retry_request::Effect { ctrl: &mut *ctrl }
            .exec(req)
            .await?;
        let outbox = ctrl.take_outbox();
        drop(ctrl);

        self.dispatch(outbox);
        Ok(())
    }

    fn dispatch(&self, outbox: Vec<Outgoing>) {
        for Outgoing { req, delay } in outbox {
            let this = self.clone();
            let fut = async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                let kind = req.kind;
                let dst = req.dst;
                match this.io.send(req.clone()).await {
                    Ok(resp) => {
                        if let Err(e) = this.process_response(resp).await {
                            error!("failed to process response of {kind} from {dst}: {e:#}");
                        }
                    }
                    Err(e) => {
                        debug!("{kind} to {dst} failed: {e:#}");
                        if let Err(e) = this.process_send_failure(req).await {
                            error!("failed to process failure of {kind} to {dst}: {e:#}");
                        }
                    }
                }
            };
            tokio::spawn(fut);
        }
    }

    pub async fn add_server(&self, srv: ServerConfig) -> Result<Response> {
        let id = self.ctrl_actor.read().await.self_id();
        let req = Request::add_server(id, id, &srv)?;
        self.process_request(req).await
    }

    pub async fn remove_server(&self, target: ServerId) -> Result<Response> {
        let id = self.ctrl_actor.read().await.self_id();
        let req = Request::remove_server(id, id, target);
        self.process_request(req).await
    }

    /// Called by the election when this server wins `term`.
    pub async fn become_leader(&self, term: Term) -> Result<()> {
        self.ctrl_actor.write().await.become_leader(term).await
    }

    /// Called by the election or the replication when `leader` is learned at `term`.
    pub async fn become_follower(&self, term: Term, leader: ServerId) -> Result<()> {
        self.ctrl_actor
            .write()
            .await
            .become_follower(term, leader)
            .await
    }

    /// Called by the commit driver as the commit index advances.
    pub async fn advance_commit_index(&self, index: LogIndex) {
        self.ctrl_actor.write().await.advance_commit_index(index);
    }

    /// Called by the commit driver as entries are applied to the state machine.
    pub async fn notify_applied(&self, index: LogIndex) {
        self.ctrl_actor.write().await.advance_sm_commit_index(index);
    }

    pub async fn set_write_paused(&self, paused: bool) {
        self.ctrl_actor.write().await.set_write_paused(paused);
    }

    /// Called by the replication when a configuration entry is appended to the local log.
    pub async fn notify_config_appended(&self, config: ClusterConfig) -> Result<()> {
        control::effect::append_config::Effect {
            ctrl: &mut *self.ctrl_actor.write().await,
        }
        .exec(config)
        .await
    }

    /// Called by the commit driver when the log is committed through `index`.
    pub async fn notify_config_committed(&self, index: LogIndex) -> Result<()> {
        control::effect::commit_config::Effect {
            ctrl: &mut *self.ctrl_actor.write().await,
        }
        .exec(index)
        .await
    }

    pub fn replication_events(&self) -> EventConsumer<ReplicationEvent> {
        self.replication_evt_rx.clone()
    }

    pub fn commit_events(&self) -> EventConsumer<CommitEvent> {
        self.commit_evt_rx.clone()
    }

    pub async fn self_id(&self) -> ServerId {
        self.ctrl_actor.read().await.self_id()
    }

    pub async fn read_election_state(&self) -> ElectionState {
        self.ctrl_actor.read().await.read_election_state()
    }

    pub async fn read_leader(&self) -> Option<ServerId> {
        self.ctrl_actor.read().await.read_leader()
    }

    pub async fn read_config(&self) -> Arc<ClusterConfig> {
        self.ctrl_actor.read().await.read_config()
    }

    pub async fn read_uncommitted_config(&self) -> Option<Arc<ClusterConfig>> {
        self.ctrl_actor.read().await.read_uncommitted_config()
    }

    pub async fn read_peers(&self) -> Vec<ServerId> {
        self.ctrl_actor.read().await.read_peers()
    }

    pub async fn change_phase(&self) -> ChangePhase {
        self.ctrl_actor.read().await.change_phase()
    }

    pub async fn is_config_changing(&self) -> bool {
        self.ctrl_actor.read().await.is_config_changing()
    }

    pub async fn is_catching_up(&self) -> bool {
        self.ctrl_actor.read().await.is_catching_up()
    }

    pub async fn is_removed(&self) -> bool {
        self.ctrl_actor.read().await.is_removed()
    }

    pub async fn commit_index(&self) -> LogIndex {
        self.ctrl_actor.read().await.quick_commit_index
    }

    pub async fn precommit_index(&self) -> LogIndex {
        self.ctrl_actor.read().await.precommit_index
    }
}
