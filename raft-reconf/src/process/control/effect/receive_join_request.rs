use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, req: Request) -> Result<Response> {
        let Some(entry) = req.single_entry(LogValueType::Conf) else {
            warn!("receive an invalid join request, it must carry exactly one configuration entry");
            return self
                .ctrl
                .new_response(MessageKind::JoinClusterResponse, req.src)
                .await;
        };
        let config = ClusterConfig::deserialize(&entry.buf).context(Error::BadPayload(req.kind))?;

        if !self.ctrl.catching_up {
            let initial = self.ctrl.params.initial_commit_index;
            info!("invited to join by {}, reset commit indices to {initial}", req.src);
            self.ctrl.quick_commit_index = initial;
            self.ctrl.sm_commit_index = initial;
            self.ctrl.precommit_index = initial;
        } else {
            info!("invited to join by {} again, keep catching up", req.src);
        }
        self.ctrl.catching_up = true;
        self.ctrl.steps_to_down = 0;
        self.ctrl.removed = false;

        self.ctrl.apply_role(RoleTrigger::JoinInvitation);
        self.ctrl.leader = Some(req.src);
        self.ctrl.emit(RaftEvent::BecomeFollower { leader: req.src });

        let ballot = Ballot {
            cur_term: req.term,
            voted_for: None,
        };
        self.ctrl.write_ballot(ballot).await?;

        self.ctrl.reconfigure(Arc::new(config)).await?;

        let mut resp = self
            .ctrl
            .new_response(MessageKind::JoinClusterResponse, req.src)
            .await?;
        resp.accept(self.ctrl.quick_commit_index + 1);
        Ok(resp)
    }
}
