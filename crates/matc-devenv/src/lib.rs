//! matc-devenv - Developer environments for matc
//!
//! Rewrites table references so a developer's run reads their own
//! schema-prefixed copies of tables where those exist.

pub mod error;
pub mod modifier;

pub use error::{DevEnvError, DevEnvResult};
pub use modifier::DevEnvQueryModifier;
