//! The VM instance set of a lab configuration.

mod instance;
#[allow(clippy::module_inception)]
mod registry;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use instance::*;
pub use registry::*;
