use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, resp: Response) -> Result<()> {
        if !self.ctrl.is_leader() {
            debug!("not the leader anymore, drop the leave response from {}", resp.src);
            return Ok(());
        }
        let asked = matches!(
            self.ctrl.peers.get(&resp.src),
            Some(peer) if peer.is_leave_flag_set()
        );
        if !asked {
            debug!("drop late leave response from {}", resp.src);
            return Ok(());
        }

        if !resp.accepted {
            info!(
                "server {} doesn't accept to step down, stop proceeding",
                resp.src
            );
            return Ok(());
        }

        info!(
            "server {} accepted to step down, remove it from the cluster",
            resp.src
        );
        finalize_remove_server::Effect {
            ctrl: &mut *self.ctrl,
        }
        .exec(resp.src)
        .await
    }
}
