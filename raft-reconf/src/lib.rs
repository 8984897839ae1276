#![deny(unused_must_use)]

/// Typed failures of the reconfiguration core.
mod error;
use error::Error;

/// Tunables shared by the coordinator and the syncer.
mod params;
pub use params::RaftParams;

/// Implementation of `RaftProcess`.
pub mod process;

/// Ready-made log and ballot stores.
pub mod backend;

/// In-process transport connecting `RaftProcess`es.
pub mod node;

use anyhow::{bail, ensure, Context, Result};
use bytes::Bytes;
use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Identifier of Raft server.
/// Unique within a cluster and never reused for a different server.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, FromStr,
)]
pub struct ServerId(pub u32);

impl ServerId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}
