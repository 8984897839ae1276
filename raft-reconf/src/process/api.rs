use super::*;

/// Kind of a message exchanged by the reconfiguration protocol.
/// A response is matched to its request by the peer and the kind alone.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum MessageKind {
    AddServerRequest,
    AddServerResponse,
    RemoveServerRequest,
    RemoveServerResponse,
    JoinClusterRequest,
    JoinClusterResponse,
    LeaveClusterRequest,
    LeaveClusterResponse,
    SyncLogRequest,
    SyncLogResponse,
    InstallSnapshotRequest,
    InstallSnapshotResponse,
}

impl MessageKind {
    pub fn response_kind(self) -> Option<Self> {
        use MessageKind::*;
        let out = match self {
            AddServerRequest => AddServerResponse,
            RemoveServerRequest => RemoveServerResponse,
            JoinClusterRequest => JoinClusterResponse,
            LeaveClusterRequest => LeaveClusterResponse,
            SyncLogRequest => SyncLogResponse,
            InstallSnapshotRequest => InstallSnapshotResponse,
            _ => return None,
        };
        Some(out)
    }

    /// Requests the leader sends to a joining or leaving server.
    /// These are retried with back-off when the transport fails.
    pub fn is_join_leave_request(self) -> bool {
        use MessageKind::*;
        matches!(
            self,
            JoinClusterRequest | LeaveClusterRequest | SyncLogRequest | InstallSnapshotRequest
        )
    }
}

/// Result code carried by a response.
/// Every rejection is recoverable: the caller may retry once the blocking condition clears.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum ResultCode {
    Ok,
    BadRequest,
    NotLeader,
    ServerAlreadyExists,
    ConfigChanging,
    ServerIsJoining,
    ServerNotFound,
    CannotRemoveLeader,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Request {
    pub kind: MessageKind,
    pub src: ServerId,
    pub dst: ServerId,
    pub term: Term,
    pub last_log_term: Term,
    pub last_log_idx: LogIndex,
    pub commit_idx: LogIndex,
    pub entries: Vec<LogEntry>,
}

impl Request {
    /// Ask the leader `dst` to add `srv` to the cluster.
    pub fn add_server(src: ServerId, dst: ServerId, srv: &ServerConfig) -> Result<Self> {
        let entry = LogEntry::new(0, srv.serialize()?, LogValueType::ClusterServer);
        Ok(Self::client(MessageKind::AddServerRequest, src, dst, entry))
    }

    /// Ask the leader `dst` to remove server `target` from the cluster.
    pub fn remove_server(src: ServerId, dst: ServerId, target: ServerId) -> Self {
        let mut buf = bytes::BytesMut::with_capacity(4);
        bytes::BufMut::put_u32_le(&mut buf, target.0);
        let entry = LogEntry::new(0, buf.freeze(), LogValueType::Custom);
        Self::client(MessageKind::RemoveServerRequest, src, dst, entry)
    }

    fn client(kind: MessageKind, src: ServerId, dst: ServerId, entry: LogEntry) -> Self {
        Self {
            kind,
            src,
            dst,
            term: 0,
            last_log_term: 0,
            last_log_idx: 0,
            commit_idx: 0,
            entries: vec![entry],
        }
    }

    /// The single entry of the request if it has exactly one of the type `t`.
    pub fn single_entry(&self, t: LogValueType) -> Option<&LogEntry> {
        match self.entries.as_slice() {
            [e] if e.value_type == t => Some(e),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Response {
    pub kind: MessageKind,
    pub term: Term,
    pub src: ServerId,
    pub dst: ServerId,
    pub accepted: bool,
    pub next_idx: LogIndex,
    pub result_code: ResultCode,
}

impl Response {
    pub fn new(kind: MessageKind, term: Term, src: ServerId, dst: ServerId) -> Self {
        Self {
            kind,
            term,
            src,
            dst,
            accepted: false,
            next_idx: 0,
            result_code: ResultCode::Ok,
        }
    }

    pub fn accept(&mut self, next_idx: LogIndex) {
        self.accepted = true;
        self.next_idx = next_idx;
    }

    pub fn reject(mut self, code: ResultCode) -> Self {
        self.accepted = false;
        self.result_code = code;
        self
    }
}
