use super::*;
use process::api::MessageKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("log state is broken")]
    BadLogState,
    #[error("log pack is broken")]
    BadLogPack,
    #[error("payload of {0} is broken")]
    BadPayload(MessageKind),
    #[error("config entry landed at index {actual} but was built for {expected}")]
    ConfigIndexMismatch { expected: u64, actual: u64 },
    #[error("peer (id={0}) is unreachable")]
    PeerUnreachable(ServerId),
    #[error("unexpected message {0}")]
    UnexpectedMessage(MessageKind),
    #[error("no snapshot is available")]
    SnapshotNotFound,
}
