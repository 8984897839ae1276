use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, resp: Response) -> Result<()> {
        if !self.ctrl.is_leader() {
            debug!("not the leader anymore, drop the join response from {}", resp.src);
            return Ok(());
        }
        if !self.ctrl.is_joining(resp.src) {
            warn!("no server to join, drop the join response from {}", resp.src);
            return Ok(());
        }
        let Some(join) = self.ctrl.srv_to_join.as_mut() else {
            return Ok(());
        };
        join.peer.reset_active_timer();

        if !resp.accepted {
            warn!(
                "new server ({}) cannot accept the invitation, give up",
                resp.src
            );
            return Ok(());
        }

        info!(
            "new server ({}) confirms it will join, start syncing logs from {}",
            resp.src, resp.next_idx
        );
        join.accepted = true;
        sync_log::Effect {
            ctrl: &mut *self.ctrl,
        }
        .exec(resp.next_idx)
        .await
    }
}
