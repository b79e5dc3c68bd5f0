//! Test doubles for checks and the certification catalog.
//!
//! Nothing here touches the network or a container registry.

pub mod catalog;
pub mod checks;

pub use catalog::*;
pub use checks::*;
