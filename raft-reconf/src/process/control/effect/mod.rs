use super::*;

// leader
pub mod add_server;
pub mod finalize_add_server;
pub mod finalize_remove_server;
pub mod invite;
pub mod receive_join_response;
pub mod receive_leave_response;
pub mod receive_snapshot_response;
pub mod receive_sync_log_response;
pub mod remove_server;
pub mod reset_srv_to_join;
pub mod retry_request;
pub mod rpc_failure;
pub mod send_snapshot;
pub mod sync_log;

// joining or leaving server
pub mod receive_join_request;
pub mod receive_leave_request;
pub mod receive_snapshot;
pub mod receive_sync_log;
pub mod tick;

// configuration lifecycle
pub mod append_config;
pub mod commit_config;

#[cfg(test)]
use super::testing::*;
