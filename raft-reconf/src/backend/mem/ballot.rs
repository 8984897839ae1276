use super::*;

#[derive(Clone)]
pub struct BallotStore {
    ballot: Arc<Mutex<Ballot>>,
}

impl BallotStore {
    pub fn new() -> Self {
        Self {
            ballot: Arc::new(Mutex::new(Ballot::new())),
        }
    }
}

#[async_trait::async_trait]
impl RaftBallotStore for BallotStore {
    async fn save_ballot(&self, v: Ballot) -> Result<()> {
        *self.ballot.lock() = v;
        Ok(())
    }

    async fn load_ballot(&self) -> Result<Ballot> {
        Ok(self.ballot.lock().clone())
    }
}
