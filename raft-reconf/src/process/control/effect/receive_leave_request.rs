use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, req: Request) -> Result<Response> {
        let mut resp = self
            .ctrl
            .new_response(MessageKind::LeaveClusterResponse, req.src)
            .await?;

        if self.ctrl.config_changing {
            warn!("config is changing, cannot leave the cluster now");
            return Ok(resp);
        }

        info!("asked to leave the cluster by {}, step down in 2 ticks", req.src);
        self.ctrl.steps_to_down = 2;
        resp.accept(self.ctrl.log.next_slot().await?);
        Ok(resp)
    }
}
