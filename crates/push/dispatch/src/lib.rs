//! Push Dispatch
//!
//! Sends payloads through drivers, tracks per-recipient failures and settles
//! dispatch attempts, either right away or from a queue worker.

mod client;
mod config;
mod error;
mod fanout;
mod queue;
mod service;

pub use client::*;
pub use config::*;
pub use error::*;
pub use fanout::*;
pub use queue::*;
pub use service::*;
