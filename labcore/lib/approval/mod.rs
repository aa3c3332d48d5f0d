//! The two-party approval gate.

mod gate;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use gate::*;
