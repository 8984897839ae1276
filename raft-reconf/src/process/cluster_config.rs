use super::*;

/// Identity of a server as recorded in a cluster configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: ServerId,
    pub endpoint: String,
    /// Opaque metadata supplied by the user.
    pub aux: String,
}

impl ServerConfig {
    pub fn new(id: ServerId, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            aux: String::new(),
        }
    }

    pub fn serialize(&self) -> Result<Bytes> {
        Ok(bincode::serialize(self)?.into())
    }

    pub fn deserialize(bin: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bin)?)
    }
}

/// Membership of the cluster effective from `log_idx`.
///
/// A configuration is never modified once built.
/// The next one is derived from it with `derive_next` and chained through `prev_log_idx`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClusterConfig {
    pub log_idx: LogIndex,
    pub prev_log_idx: LogIndex,
    pub servers: Vec<ServerConfig>,
    pub user_ctx: Bytes,
    pub async_replication: bool,
}

impl ClusterConfig {
    pub fn new(log_idx: LogIndex, prev_log_idx: LogIndex) -> Self {
        Self {
            log_idx,
            prev_log_idx,
            servers: vec![],
            user_ctx: Bytes::new(),
            async_replication: false,
        }
    }

    /// The initial configuration of a freshly bootstrapped cluster.
    pub fn bootstrap(servers: Vec<ServerConfig>) -> Self {
        Self {
            servers,
            ..Self::new(0, 0)
        }
    }

    /// Start a configuration effective from `log_idx` that supersedes this one.
    /// Members, the user context and the replication mode are carried over.
    pub fn derive_next(&self, log_idx: LogIndex) -> Self {
        Self {
            log_idx,
            prev_log_idx: self.log_idx,
            servers: self.servers.clone(),
            user_ctx: self.user_ctx.clone(),
            async_replication: self.async_replication,
        }
    }

    pub fn with_server(mut self, srv: ServerConfig) -> Self {
        self.servers.push(srv);
        self
    }

    pub fn without_server(mut self, id: ServerId) -> Self {
        self.servers.retain(|s| s.id != id);
        self
    }

    pub fn get_server(&self, id: ServerId) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: ServerId) -> bool {
        self.get_server(id).is_some()
    }

    pub fn server_ids(&self) -> Vec<ServerId> {
        self.servers.iter().map(|s| s.id).collect()
    }

    pub fn serialize(&self) -> Result<Bytes> {
        Ok(bincode::serialize(self)?.into())
    }

    pub fn deserialize(bin: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bin)?)
    }
}
