use super::*;

pub mod effect;
mod peer;
mod snapshot_sync;
#[cfg(test)]
mod testing;

pub use peer::PeerSession;
pub use snapshot_sync::SnapshotSync;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectionState {
    Leader,
    Candidate,
    Follower,
}

/// What makes a server change its role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleTrigger {
    /// A leader invited this server to join the cluster.
    JoinInvitation,
    /// The election timer fired.
    Campaign,
    /// This server won an election.
    Elected,
    /// A legitimate leader or a higher term was observed.
    LeaderDiscovered,
    /// The step-down countdown after a leave request reached zero.
    LeftCluster,
}

impl ElectionState {
    pub fn next(self, trigger: RoleTrigger) -> Self {
        use ElectionState::*;
        match (self, trigger) {
            (_, RoleTrigger::JoinInvitation) => Follower,
            (_, RoleTrigger::LeaderDiscovered) => Follower,
            (_, RoleTrigger::LeftCluster) => Follower,
            (Leader, RoleTrigger::Campaign) => Leader,
            (_, RoleTrigger::Campaign) => Candidate,
            (_, RoleTrigger::Elected) => Leader,
        }
    }
}

/// Phase of the membership change as seen from outside the coordinator.
///
/// Validating a request and appending the new configuration happen
/// inside a single locked handler and are never observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangePhase {
    Idle,
    /// A server was invited but hasn't confirmed yet.
    Inviting,
    /// The joining server is receiving logs or a snapshot.
    Converging,
    /// A server was asked to leave.
    LeaveRequested,
    /// The new configuration is appended but not yet committed.
    CommitPending,
}

/// The only server allowed to be joining at a time.
pub struct PendingJoin {
    pub srv: Arc<ServerConfig>,
    pub peer: PeerSession,
    /// The server confirmed the invitation and syncing has started.
    pub accepted: bool,
}

pub struct Outgoing {
    pub req: Request,
    pub delay: Option<Duration>,
}

pub struct Control {
    id: ServerId,
    params: RaftParams,
    state: ElectionState,
    leader: Option<ServerId>,
    write_paused: bool,

    app: Arc<dyn RaftApp>,
    log: Arc<dyn RaftLogStore>,
    ballot: Arc<dyn RaftBallotStore>,

    /// The last committed configuration.
    config: Arc<ClusterConfig>,
    /// The configuration appended but not yet committed.
    uncommitted_config: Option<Arc<ClusterConfig>>,
    peers: BTreeMap<ServerId, PeerSession>,
    srv_to_join: Option<PendingJoin>,

    /// Unless the last configuration is committed,
    /// new membership changes are not allowed.
    config_changing: bool,
    /// Set on a server invited to join until it finds itself in a committed configuration.
    catching_up: bool,
    /// Remaining ticks before a server asked to leave steps down.
    steps_to_down: u32,
    removed: bool,

    pub quick_commit_index: LogIndex,
    pub sm_commit_index: LogIndex,
    pub precommit_index: LogIndex,

    outbox: Vec<Outgoing>,
    replication_evt_tx: EventProducer<ReplicationEvent>,
    commit_evt_tx: EventProducer<CommitEvent>,
}

impl Control {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ServerId,
        params: RaftParams,
        init_config: ClusterConfig,
        app: Arc<dyn RaftApp>,
        log: Arc<dyn RaftLogStore>,
        ballot: Arc<dyn RaftBallotStore>,
        replication_evt_tx: EventProducer<ReplicationEvent>,
        commit_evt_tx: EventProducer<CommitEvent>,
    ) -> Self {
        let mut peers = BTreeMap::new();
        for srv in &init_config.servers {
            if srv.id == id {
                continue;
            }
            let peer = PeerSession::new(Arc::new(srv.clone()), &params, 1);
            peers.insert(srv.id, peer);
        }

        Self {
            id,
            state: ElectionState::Follower,
            leader: None,
            write_paused: false,

            app,
            log,
            ballot,

            config: Arc::new(init_config),
            uncommitted_config: None,
            peers,
            srv_to_join: None,

            config_changing: false,
            catching_up: false,
            steps_to_down: 0,
            removed: false,

            quick_commit_index: params.initial_commit_index,
            sm_commit_index: params.initial_commit_index,
            precommit_index: params.initial_commit_index,
            params,

            outbox: vec![],
            replication_evt_tx,
            commit_evt_tx,
        }
    }

    pub fn self_id(&self) -> ServerId {
        self.id
    }

    pub fn read_election_state(&self) -> ElectionState {
        self.state
    }

    fn write_election_state(&mut self, e: ElectionState) {
        info!("election state -> {e:?}");
        self.state = e;
    }

    fn apply_role(&mut self, trigger: RoleTrigger) {
        let next = self.state.next(trigger);
        if next != self.state {
            self.write_election_state(next);
        }
    }

    pub fn is_leader(&self) -> bool {
        self.state == ElectionState::Leader
    }

    pub fn read_leader(&self) -> Option<ServerId> {
        self.leader
    }

    pub async fn read_ballot(&self) -> Result<Ballot> {
        self.ballot.load_ballot().await
    }

    async fn write_ballot(&mut self, b: Ballot) -> Result<()> {
        self.ballot.save_ballot(b).await
    }

    async fn current_term(&self) -> Result<Term> {
        Ok(self.read_ballot().await?.cur_term)
    }

    pub async fn become_leader(&mut self, term: Term) -> Result<()> {
        let ballot = Ballot {
            cur_term: term,
            voted_for: Some(self.id),
        };
        self.write_ballot(ballot).await?;
        self.apply_role(RoleTrigger::Elected);
        self.leader = Some(self.id);
        Ok(())
    }

    pub async fn become_follower(&mut self, term: Term, leader: ServerId) -> Result<()> {
        let mut ballot = self.read_ballot().await?;
        ensure!(
            term >= ballot.cur_term,
            "stale leader {leader} (term={term} < cur_term={})",
            ballot.cur_term
        );
        if term > ballot.cur_term {
            ballot.cur_term = term;
            ballot.voted_for = None;
        }
        if ballot.voted_for != Some(leader) {
            info!("learn the current leader ({leader})");
            ballot.voted_for = Some(leader);
        }
        self.write_ballot(ballot).await?;

        if self.is_leader() {
            self.drop_leader_duties().await;
        }
        self.apply_role(RoleTrigger::LeaderDiscovered);
        self.leader = Some(leader);
        Ok(())
    }

    /// Forget the membership changes this server was driving as the leader.
    async fn drop_leader_duties(&mut self) {
        effect::reset_srv_to_join::Effect { ctrl: &mut *self }
            .exec()
            .await;
        for peer in self.peers.values_mut() {
            peer.clear_leave_flag();
        }
    }

    pub fn advance_commit_index(&mut self, index: LogIndex) {
        self.quick_commit_index = u64::max(self.quick_commit_index, index);
    }

    pub fn advance_sm_commit_index(&mut self, index: LogIndex) {
        self.sm_commit_index = u64::max(self.sm_commit_index, index);
    }

    pub fn set_write_paused(&mut self, paused: bool) {
        info!("write paused -> {paused}");
        self.write_paused = paused;
    }

    pub fn read_config(&self) -> Arc<ClusterConfig> {
        self.config.clone()
    }

    pub fn read_uncommitted_config(&self) -> Option<Arc<ClusterConfig>> {
        self.uncommitted_config.clone()
    }

    /// The configuration a new change must be built on.
    /// An uncommitted configuration takes precedence over the committed one.
    fn latest_config(&self) -> Arc<ClusterConfig> {
        match &self.uncommitted_config {
            Some(conf) => {
                info!(
                    "uncommitted config exists at log {}, prev log {}",
                    conf.log_idx, conf.prev_log_idx
                );
                conf.clone()
            }
            None => self.config.clone(),
        }
    }

    pub fn read_peers(&self) -> Vec<ServerId> {
        self.peers.keys().cloned().collect()
    }

    pub fn is_config_changing(&self) -> bool {
        self.config_changing
    }

    pub fn is_catching_up(&self) -> bool {
        self.catching_up
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn change_phase(&self) -> ChangePhase {
        if self.config_changing {
            return ChangePhase::CommitPending;
        }
        if let Some(join) = &self.srv_to_join {
            return if join.accepted {
                ChangePhase::Converging
            } else {
                ChangePhase::Inviting
            };
        }
        let leaving = self
            .peers
            .values()
            .any(|p| p.is_leave_flag_set() && !p.is_stepped_down());
        if leaving {
            return ChangePhase::LeaveRequested;
        }
        ChangePhase::Idle
    }

    fn send(&mut self, req: Request) {
        self.outbox.push(Outgoing { req, delay: None });
    }

    fn send_after(&mut self, req: Request, delay: Duration) {
        self.outbox.push(Outgoing {
            req,
            delay: Some(delay),
        });
    }

    pub fn take_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    async fn new_request(&self, kind: MessageKind, dst: ServerId) -> Result<Request> {
        let next_slot = self.log.next_slot().await?;
        Ok(Request {
            kind,
            src: self.id,
            dst,
            term: self.current_term().await?,
            last_log_term: 0,
            last_log_idx: next_slot.saturating_sub(1),
            commit_idx: self.quick_commit_index,
            entries: vec![],
        })
    }

    async fn new_response(&self, kind: MessageKind, dst: ServerId) -> Result<Response> {
        let term = self.current_term().await?;
        Ok(Response::new(kind, term, self.id, dst))
    }

    fn is_joining(&self, id: ServerId) -> bool {
        matches!(&self.srv_to_join, Some(join) if join.srv.id == id)
    }

    /// The session of a peer, the joining server included.
    fn session_mut(&mut self, id: ServerId) -> Option<&mut PeerSession> {
        if self.is_joining(id) {
            return self.srv_to_join.as_mut().map(|join| &mut join.peer);
        }
        self.peers.get_mut(&id)
    }

    async fn release_snapshot_sync(&self, sync: Option<SnapshotSync>) {
        if let Some(ctx) = sync.and_then(|sync| sync.into_user_ctx()) {
            debug!("free user snapshot context");
            self.app.free_snapshot_context(ctx).await;
        }
    }

    /// Tear down a session, giving back its snapshot handle if any.
    async fn discard_peer(&self, mut peer: PeerSession) {
        peer.enable_hb(false);
        self.release_snapshot_sync(peer.take_snapshot_sync()).await;
    }

    /// Mark the log up to `index` as ready to commit and wake the commit driver.
    fn commit(&mut self, index: LogIndex) {
        self.advance_commit_index(index);
        self.commit_evt_tx.push_event(CommitEvent);
    }

    fn request_append_entries(&self) {
        self.replication_evt_tx.push_event(ReplicationEvent);
    }

    fn emit(&self, event: RaftEvent) {
        self.app.on_event(event);
    }

    /// Make `new_config` the effective configuration immediately
    /// and bring the peer set in line with it.
    async fn reconfigure(&mut self, new_config: Arc<ClusterConfig>) -> Result<()> {
        let next_slot = self.log.next_slot().await?;

        for srv in &new_config.servers {
            if srv.id == self.id || self.peers.contains_key(&srv.id) {
                continue;
            }
            let peer = PeerSession::new(Arc::new(srv.clone()), &self.params, next_slot);
            info!("peer {} added", srv.id);
            self.peers.insert(srv.id, peer);
        }

        let gone: Vec<ServerId> = self
            .peers
            .keys()
            .filter(|id| !new_config.contains(**id))
            .cloned()
            .collect();
        for id in gone {
            if let Some(peer) = self.peers.remove(&id) {
                info!("peer {id} removed");
                self.discard_peer(peer).await;
            }
        }

        info!("membership changed -> {:?}", new_config.server_ids());
        self.config = new_config;
        Ok(())
    }

    /// Save `new_config` to the log and track it as the uncommitted configuration.
    async fn append_config_entry(&mut self, new_config: ClusterConfig) -> Result<LogIndex> {
        let next_slot = self.log.next_slot().await?;
        ensure!(
            next_slot == new_config.log_idx,
            Error::ConfigIndexMismatch {
                expected: new_config.log_idx,
                actual: next_slot,
            }
        );
        let term = self.current_term().await?;
        let entry = LogEntry::new(term, new_config.serialize()?, LogValueType::Conf);
        let idx = self.log.append(entry).await?;

        self.config_changing = true;
        self.uncommitted_config = Some(Arc::new(new_config));
        self.emit(RaftEvent::ConfigAppended { log_idx: idx });
        self.request_append_entries();
        Ok(idx)
    }
}
