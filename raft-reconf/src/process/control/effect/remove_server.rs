use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, req: Request) -> Result<Response> {
        let mut resp = self
            .ctrl
            .new_response(MessageKind::RemoveServerResponse, req.src)
            .await?;

        let target = match req.entries.as_slice() {
            [e] if e.buf.len() == 4 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(&e.buf);
                ServerId(u32::from_le_bytes(buf))
            }
            _ => {
                warn!("bad remove server request as we are expecting one log entry with value type of int");
                return Ok(resp.reject(ResultCode::BadRequest));
            }
        };

        if !self.ctrl.is_leader() || self.ctrl.write_paused {
            warn!("this is not a leader, cannot handle remove server request");
            return Ok(resp.reject(ResultCode::NotLeader));
        }

        if self.ctrl.config_changing {
            warn!("previous config has not committed yet");
            return Ok(resp.reject(ResultCode::ConfigChanging));
        }

        if target == self.ctrl.id {
            warn!("cannot request to remove leader");
            return Ok(resp.reject(ResultCode::CannotRemoveLeader));
        }

        if !self.ctrl.peers.contains_key(&target) {
            warn!("server {target} does not exist");
            return Ok(resp.reject(ResultCode::ServerNotFound));
        }

        let leave_req = self
            .ctrl
            .new_request(MessageKind::LeaveClusterRequest, target)
            .await?;
        if let Some(peer) = self.ctrl.peers.get_mut(&target) {
            // The back-off is left as it is.
            // Removal may be requested many times and must converge anyway.
            peer.set_leave_flag();
        }
        info!("ask server {target} to leave the cluster");
        self.ctrl.send(leave_req);

        resp.accept(self.ctrl.log.next_slot().await?);
        Ok(resp)
    }
}
