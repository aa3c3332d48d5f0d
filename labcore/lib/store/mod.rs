//! Ownership and state machine of lab configurations.

mod state;
#[allow(clippy::module_inception)]
mod store;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use state::*;
pub use store::*;
