//! The provisioning workflow: trainer VM bring-up, configuration and fleet
//! cloning, driven by asynchronous tasks against a simulated cloud.

mod events;
mod orchestrator;
mod provider;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use events::*;
pub use orchestrator::*;
pub use provider::*;
