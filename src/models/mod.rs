//! Core data models for matchfetch.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Concrete types with compile-time guarantees
//! - B_i (Beliefs): Wrapped in Result/Option
//! - I^R (Resolvable): Config parameters
//! - I^B (Bounded): Error variants surfaced as resumable failures

mod config;
mod error;
mod record;
mod regions;
mod signature;

pub use config::*;
pub use error::*;
pub use record::*;
pub use regions::*;
pub use signature::*;
