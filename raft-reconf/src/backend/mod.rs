use super::*;

/// Backends kept in memory.
pub mod mem;

/// Backends persisted in redb.
pub mod redb;
