//! Claim Forms MCP Server Library
//!
//! Fills fixed-layout benefit-claim PDF templates by overlaying positioned
//! text, checkbox marks and signature images:
//! - [`fields`]: normalization of dates, phones, SSNs, names and addresses
//! - [`layout`]: coordinate-delta tables and repeating-entry slots
//! - [`pdf`]: overlay layers, signature images and the layer compositor
//! - [`forms`]: per-form layouts behind one [`FormGenerator`]
//! - [`server`]: MCP tools `generate_form`, `list_forms`, `list_templates`
//!   and `coordinate_grid`

pub mod error;
pub mod fields;
pub mod forms;
pub mod layout;
pub mod pdf;
pub mod server;
pub mod warning;

pub use error::{Error, Result};
pub use forms::{FormGenerator, FormKind, FormRequest, GeneratedForm, GeneratorConfig};
pub use server::{run_server, run_server_with_config, FormServer, ServerConfig};
pub use warning::Warning;
