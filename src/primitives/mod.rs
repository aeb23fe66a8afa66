//! Low-level primitives
//!
//! This module contains grammar loading, the language catalog and
//! syntax highlighting.

pub mod catalog;
pub mod grammar;
pub mod highlighter;
