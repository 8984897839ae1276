use super::*;

use process::api::{Request, Response};
use process::{RaftProcess, RaftTransport};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// `LocalNetwork` routes requests between `RaftProcess`es in the same address space.
///
/// A process attached here holds the network as its transport.
/// Detach it to let both go.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    process_map: Arc<spin::RwLock<HashMap<ServerId, RaftProcess>>>,
    disconnected: Arc<spin::RwLock<HashSet<ServerId>>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_process(&self, id: ServerId, p: RaftProcess) {
        self.process_map.write().insert(id, p);
    }

    pub fn detach_process(&self, id: ServerId) {
        self.process_map.write().remove(&id);
    }

    pub fn get_process(&self, id: ServerId) -> Option<RaftProcess> {
        self.process_map.read().get(&id).cloned()
    }

    pub fn list_processes(&self) -> Vec<ServerId> {
        let mut out: Vec<ServerId> = self.process_map.read().keys().cloned().collect();
        out.sort();
        out
    }

    /// Every request to or from `id` fails until it is connected again.
    pub fn disconnect(&self, id: ServerId) {
        info!("disconnect server {id}");
        self.disconnected.write().insert(id);
    }

    pub fn connect(&self, id: ServerId) {
        info!("connect server {id}");
        self.disconnected.write().remove(&id);
    }

    fn is_reachable(&self, src: ServerId, dst: ServerId) -> bool {
        let disconnected = self.disconnected.read();
        !disconnected.contains(&src) && !disconnected.contains(&dst)
    }
}

#[async_trait::async_trait]
impl RaftTransport for LocalNetwork {
    async fn send(&self, req: Request) -> Result<Response> {
        let src = req.src;
        let dst = req.dst;
        ensure!(self.is_reachable(src, dst), Error::PeerUnreachable(dst));
        let p = self
            .get_process(dst)
            .context(Error::PeerUnreachable(dst))?;

        let resp = p.process_request(req).await?;

        // The response is lost if the link went down in the meantime.
        ensure!(self.is_reachable(dst, src), Error::PeerUnreachable(dst));
        Ok(resp)
    }
}
