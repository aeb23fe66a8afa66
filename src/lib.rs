// Docs build library - exposes the grammar registrar, highlighter and site config

pub mod config;
pub mod primitives;
pub mod services;
pub mod site;
