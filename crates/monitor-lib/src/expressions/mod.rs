//! Query expression building
//!
//! - `level`: query scopes and component types
//! - `catalog`: named metric/meter templates per scope
//! - `options`: scoped query options and selector resolution
//! - `template`: `$token` substitution
//! - `compiler`: template + options -> backend expression

pub mod catalog;
pub mod compiler;
pub mod level;
pub mod options;
pub mod template;

pub use catalog::{Catalog, CatalogKey};
pub use compiler::Compiler;
pub use level::{ComponentType, Level};
pub use options::{MeterOptions, QueryOptions, ResolvedSelectors, Scope, WorkloadGroup, WorkloadKind};
