//! Generate JSON Schema for the keel-docs settings file
//!
//! This binary generates a JSON Schema from the DocsConfig struct using schemars,
//! for editor completion in keel-docs.json.
//!
//! Usage:
//!   cargo run --bin generate_schema > keel-docs.schema.json

use keel_docs::config::DocsConfig;
use schemars::schema_for;

fn main() -> anyhow::Result<()> {
    let schema = schema_for!(DocsConfig);
    let output = serde_json::to_string_pretty(&schema)?;
    println!("{}", output);
    Ok(())
}
