//! Statline query engine
//!
//! Turns a dataset selector plus loose criteria into a sorted, bounded,
//! schema-stable response. Each stage is a plain function over [`Table`]s;
//! [`StatsEngine`] composes them per dataset kind and [`EngineHandle`] hands
//! out immutable generations of it.
//!
//! [`Table`]: statline_ir::Table

use statline_registry::RegistryError;
use thiserror::Error;

pub mod enrich;
pub mod filter;
pub mod join;
pub mod metadata;
pub mod reshape;
pub mod schema;
pub mod snaps;
pub mod sort;

mod engine;
mod handle;

pub use engine::StatsEngine;
pub use handle::{EngineHandle, Generation};
pub use join::identity_key;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
