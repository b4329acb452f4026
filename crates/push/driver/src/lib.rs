//! Push Drivers
//!
//! Delivery backends and the registry they are selected from.

mod apns;
mod backend;
mod error;
mod fake;
mod logging;
mod registry;
mod traits;

pub use apns::*;
pub use backend::*;
pub use error::*;
pub use fake::*;
pub use logging::*;
pub use registry::*;
pub use traits::*;
