//! Caller identity from session tokens and role-based access checks.

pub mod gate;
pub mod token;
pub use gate::*;
pub use token::*;
