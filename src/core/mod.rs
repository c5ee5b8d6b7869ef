//! Core domain models
//!
//! This module defines tasks, steps, the task registry and the states a run
//! moves through, plus the YAML configuration they are loaded from.

pub mod config;
pub mod error;
pub mod registry;
pub mod state;
pub mod step;
pub mod task;

pub use error::*;
pub use registry::*;
pub use state::*;
pub use step::*;
pub use task::*;
