//! Cost computation over a lab configuration's resource shape and duration.

mod calculator;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use calculator::*;
