//! CustomResourceDefinition handling
//!
//! - **Schema representation** (`schema`): the parts of a CRD that shape attributes
//! - **Parsing** (`parser`): CRD YAML/JSON into those structures
//!
//! The parsed schemas are the raw material the [`crate::resource`] module
//! turns into Terraform-style resource schemas.

mod parser;
mod schema;

pub use parser::CrdParser;
pub use schema::{
    Constraints, CrdNames, CrdSchema, CrdScope, CrdVersionSchema, PropertyType, SchemaProperty,
};
