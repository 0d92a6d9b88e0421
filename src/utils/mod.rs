//! contains parameters and dump/reload utilities

pub mod dumpload;
pub mod parameters;

pub use dumpload::*;
pub use parameters::*;
