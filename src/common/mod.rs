//! Common types, collaborator interfaces and config loading
//!
//! Shared by the escrow core, the service wrapper and the binary.

pub mod types;
pub mod config;
pub mod traits;
