//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Record Model
//! - A [`Record`] is an opaque string-to-string mapping handed to a sink unchanged
//! - [`Severity`] is the reporting level attached to a record by the hook layer

mod config;
mod error;
mod record;
mod sink;

pub use config::*;
pub use error::*;
pub use record::{Record, Severity};
pub use sink::*;
