//! Shader text loading for glvis visualizations.
//!
//! Programs are addressed by name (`flocking/velocity`, `vertical_wav`) and
//! resolved against a [`SourceLocation`], either an HTTP base URL or a local
//! directory with the same layout. [`ShaderTextLoader`] assembles the shared
//! initial-methods and utility fragments in front of each program fragment and
//! substitutes the default plane vertex program when a program ships without
//! its own `.vert`.
mod catalog;
mod error;
mod handle;
mod loader;
mod source;
mod text;

pub use catalog::{Catalog, CatalogEntry, CatalogError};
pub use error::LoadError;
pub use handle::SourceLocation;
pub use loader::{
    LoaderConfig, ShaderFuture, ShaderPromise, ShaderTextLoader, DEFAULT_PLANE_VERTEX,
};
pub use source::{open_source, DirectorySource, HttpSource, ShaderSource};
pub use text::ShaderText;
