//! Lab configuration types and validation.

mod defaults;
mod lab;
mod validate;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use defaults::*;
pub use lab::*;
