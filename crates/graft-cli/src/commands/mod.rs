//! Command implementations. Each module exposes an `execute` function
//! taking its parsed arguments.

pub mod build;
pub mod check;
pub mod impact;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use check::execute as check_execute;
pub use impact::execute as impact_execute;
