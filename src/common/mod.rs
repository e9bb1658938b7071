//! Common utilities and shared components

pub mod constants;
pub mod error;
pub mod helper;
pub mod logging;

pub use constants::*;
pub use error::*;
pub use helper::*;
pub use logging::*;
