use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, req: Request) -> Result<Response> {
        let mut resp = self
            .ctrl
            .new_response(MessageKind::SyncLogResponse, req.src)
            .await?;
        resp.next_idx = self.ctrl.log.next_slot().await?;

        let Some(entry) = req.single_entry(LogValueType::LogPack) else {
            warn!("receive an invalid log sync request, it must carry exactly one log pack");
            return Ok(resp);
        };
        if !self.ctrl.catching_up {
            warn!("this server is not catching up, drop the log sync request from {}", req.src);
            return Ok(resp);
        }

        self.ctrl
            .log
            .apply_pack(req.last_log_idx + 1, entry.buf.clone())
            .await?;

        let next_slot = self.ctrl.log.next_slot().await?;
        let tail = next_slot - 1;
        debug!("synced the log through {tail}");
        self.ctrl.precommit_index = tail;
        self.ctrl.commit(tail);

        resp.accept(next_slot);
        Ok(resp)
    }
}
