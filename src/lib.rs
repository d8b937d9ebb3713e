//! Mail relay: subject-tag routing between an internal mailbox and the outside world.

pub mod config;
pub mod error;
pub mod inbound;
pub mod relay;
pub mod sender;
pub mod server;
