use super::*;

struct Inner {
    entries: BTreeMap<LogIndex, LogEntry>,
    start_index: LogIndex,
}

impl Inner {
    fn next_slot(&self) -> LogIndex {
        match self.entries.last_key_value() {
            Some((i, _)) => i + 1,
            None => self.start_index,
        }
    }
}

/// Log store on a `BTreeMap`. Indices start from 1.
#[derive(Clone)]
pub struct LogStore {
    inner: Arc<Mutex<Inner>>,
}

impl LogStore {
    pub fn new() -> Self {
        let inner = Inner {
            entries: BTreeMap::new(),
            start_index: 1,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }
}

#[async_trait::async_trait]
impl RaftLogStore for LogStore {
    async fn append(&self, entry: LogEntry) -> Result<LogIndex> {
        let mut inner = self.inner.lock();
        let i = inner.next_slot();
        inner.entries.insert(i, entry);
        Ok(i)
    }

    async fn get_entry(&self, i: LogIndex) -> Result<Option<LogEntry>> {
        Ok(self.inner.lock().entries.get(&i).cloned())
    }

    async fn pack(&self, start: LogIndex, cnt: u64) -> Result<Bytes> {
        let inner = self.inner.lock();
        ensure!(
            start >= inner.start_index,
            "entry {start} is compacted (start index={})",
            inner.start_index
        );
        let entries: Vec<LogEntry> = inner
            .entries
            .range(start..start + cnt)
            .map(|(_, e)| e.clone())
            .collect();
        ensure!(
            entries.len() as u64 == cnt,
            "only {} entries from {start} (wanted {cnt})",
            entries.len()
        );
        log_pack::encode(&entries)
    }

    async fn apply_pack(&self, start: LogIndex, pack: Bytes) -> Result<()> {
        let entries = log_pack::decode(&pack)?;

        let mut inner = self.inner.lock();
        ensure!(
            start >= inner.start_index,
            "entry {start} is compacted (start index={})",
            inner.start_index
        );
        if inner.entries.is_empty() {
            inner.start_index = start;
        }
        ensure!(
            start <= inner.next_slot(),
            "pack from {start} leaves a hole after {}",
            inner.next_slot()
        );

        let _ = inner.entries.split_off(&start);
        for (i, e) in entries.into_iter().enumerate() {
            inner.entries.insert(start + i as u64, e);
        }
        Ok(())
    }

    async fn compact(&self, last_idx: LogIndex) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.entries = inner.entries.split_off(&(last_idx + 1));
        inner.start_index = u64::max(inner.start_index, last_idx + 1);
        Ok(())
    }

    async fn start_index(&self) -> Result<LogIndex> {
        Ok(self.inner.lock().start_index)
    }

    async fn next_slot(&self) -> Result<LogIndex> {
        Ok(self.inner.lock().next_slot())
    }
}
