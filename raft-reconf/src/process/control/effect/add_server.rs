use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, req: Request) -> Result<Response> {
        let mut resp = self
            .ctrl
            .new_response(MessageKind::AddServerResponse, req.src)
            .await?;

        let Some(entry) = req.single_entry(LogValueType::ClusterServer) else {
            warn!("bad add server request as we are expecting one log entry with value type of ClusterServer");
            return Ok(resp.reject(ResultCode::BadRequest));
        };
        let srv = match ServerConfig::deserialize(&entry.buf) {
            Ok(srv) => srv,
            Err(e) => {
                warn!("bad add server request: {e}");
                return Ok(resp.reject(ResultCode::BadRequest));
            }
        };

        if !self.ctrl.is_leader() || self.ctrl.write_paused {
            warn!("this is not a leader, cannot handle add server request");
            return Ok(resp.reject(ResultCode::NotLeader));
        }

        if self.ctrl.peers.contains_key(&srv.id) || srv.id == self.ctrl.id {
            warn!(
                "the server to be added has a duplicated id with existing server {}",
                srv.id
            );
            return Ok(resp.reject(ResultCode::ServerAlreadyExists));
        }

        if self.ctrl.config_changing {
            warn!("previous config has not committed yet");
            return Ok(resp.reject(ResultCode::ConfigChanging));
        }

        if let Some(join) = &self.ctrl.srv_to_join {
            let inactive = join.peer.inactive_for();
            warn!(
                "previous adding server ({}) is in progress, last activity: {} ms ago",
                join.srv.id,
                inactive.as_millis()
            );
            if inactive <= self.ctrl.params.join_activity_timeout() {
                return Ok(resp.reject(ResultCode::ServerIsJoining));
            }
            warn!("activity timeout, start over");
            reset_srv_to_join::Effect {
                ctrl: &mut *self.ctrl,
            }
            .exec()
            .await;
        }

        let srv = Arc::new(srv);
        let next_slot = self.ctrl.log.next_slot().await?;
        let peer = PeerSession::new(srv.clone(), &self.ctrl.params, next_slot);
        self.ctrl.srv_to_join = Some(PendingJoin {
            srv,
            peer,
            accepted: false,
        });

        invite::Effect {
            ctrl: &mut *self.ctrl,
        }
        .exec()
        .await?;

        resp.accept(self.ctrl.log.next_slot().await?);
        Ok(resp)
    }
}
