use super::*;

mod ballot;
mod log;

pub use ballot::BallotStore;
pub use log::LogStore;

use process::*;
use spin::Mutex;
use std::collections::BTreeMap;
