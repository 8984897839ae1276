use super::*;

mod ballot;

pub use ballot::BallotStore;

use ::redb::{Database, ReadableTableMetadata, TableDefinition};
use process::*;
