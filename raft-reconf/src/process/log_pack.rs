//! A log pack is a contiguous range of log entries shipped as one opaque buffer.

use super::*;

pub fn encode(entries: &[LogEntry]) -> Result<Bytes> {
    Ok(bincode::serialize(entries)?.into())
}

pub fn decode(bin: &[u8]) -> Result<Vec<LogEntry>> {
    bincode::deserialize(bin).context(Error::BadLogPack)
}
