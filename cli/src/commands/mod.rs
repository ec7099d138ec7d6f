//! Command implementations

pub mod client_setup;
pub mod control;
pub mod domain;
pub mod init;
pub mod logs;
pub mod server_setup;
pub mod status;
