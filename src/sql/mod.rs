//! Two-stage SQL templating: symbolic placeholders in, positional binds out. No SQL parsing beyond that.

pub mod params;
pub mod placeholders;
pub use params::*;
pub use placeholders::*;
