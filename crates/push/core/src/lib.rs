//! Push Core Types
//!
//! Recipients, payloads, failure sets and the dispatch attempt lifecycle
//! shared by drivers, the dispatch service and storage.

mod attempt;
mod device;
mod failure;
mod job;
mod payload;
mod recipient;

pub use attempt::*;
pub use device::*;
pub use failure::*;
pub use job::*;
pub use payload::*;
pub use recipient::*;
