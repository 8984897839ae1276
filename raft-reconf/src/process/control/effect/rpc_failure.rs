use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// A request of `kind` to `peer` failed again after retrying.
    pub async fn exec(self, kind: MessageKind, peer: ServerId) -> Result<()> {
        if !self.ctrl.is_leader() {
            debug!("not the leader anymore, ignore the failed {kind} to {peer}");
            return Ok(());
        }

        if kind == MessageKind::LeaveClusterRequest {
            info!("rpc failed for removing server ({peer}), will remove this server directly");
            if self.ctrl.peers.len() == 1 {
                match self.ctrl.peers.remove(&peer) {
                    Some(p) => {
                        self.ctrl.discard_peer(p).await;
                        info!("server {peer} is removed from cluster");
                    }
                    None => info!("peer {peer} cannot be found, no action for removing"),
                }
            }

            return finalize_remove_server::Effect {
                ctrl: &mut *self.ctrl,
            }
            .exec(peer)
            .await;
        }

        if !self.ctrl.is_joining(peer) {
            debug!("{kind} to {peer} failed but {peer} is not joining, ignore");
            return Ok(());
        }
        info!("rpc failed again for the new coming server ({peer}), will stop retry for this server");
        self.ctrl.config_changing = false;
        reset_srv_to_join::Effect {
            ctrl: &mut *self.ctrl,
        }
        .exec()
        .await;
        Ok(())
    }
}
