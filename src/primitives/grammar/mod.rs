//! Grammar registrar with separated pure types and I/O operations.
//!
//! This module is split into:
//! - `types`: TextMate grammar document model and `LanguageDefinition` (no filesystem access)
//! - `loader`: I/O operations with the `GrammarLoader` trait abstraction
//! - `convert`: TextMate -> syntect `SyntaxDefinition` translation
//!
//! # Example
//!
//! ```ignore
//! use keel_docs::primitives::grammar::{load_language, LocalGrammarLoader};
//!
//! let loader = LocalGrammarLoader::new();
//! let keel = load_language(&loader, &registration, Path::new("."))?;
//! catalog.register(keel);
//! ```

mod convert;
mod loader;
mod types;

pub use convert::*;
pub use loader::*;
pub use types::*;

#[cfg(test)]
pub(crate) use loader::mock;
