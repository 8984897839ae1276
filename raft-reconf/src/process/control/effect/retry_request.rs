use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// `req` was lost at the transport.
    pub async fn exec(self, req: Request) -> Result<()> {
        let kind = req.kind;
        let dst = req.dst;
        if !kind.is_join_leave_request() {
            debug!("{kind} to {dst} is lost");
            return Ok(());
        }

        let Some(peer) = self.ctrl.session_mut(dst) else {
            debug!("session of {dst} is gone, drop the lost {kind}");
            return Ok(());
        };
        if !peer.is_hb_enabled() {
            debug!("{dst} is stepping down, drop the lost {kind}");
            return Ok(());
        }

        if peer.is_backoff_exhausted() {
            return rpc_failure::Effect {
                ctrl: &mut *self.ctrl,
            }
            .exec(kind, dst)
            .await;
        }

        peer.slow_down_hb();
        let delay = peer.current_hb_interval();
        warn!("{kind} to {dst} failed, retry in {delay:?}");
        self.ctrl.send_after(req, delay);
        Ok(())
    }
}
