//! # tfgen_hcl
//!
//! Terraform document building for tfgen, on top of `hcl-rs`.
//!
//! Generators describe each discovered resource as a [`Document`] of
//! [`hcl::Block`]s whose attributes are [`hcl::Expression`]s; formatting goes
//! through `hcl::format`. [`Reference`] and the [`expr`] helpers cover the
//! symbolic references and templates the generators need, and the [`naming`]
//! helpers derive stable short names and identifier-safe block labels from
//! the names assigned by the management plane.
//!
//! ## Example
//!
//! ```rust
//! use tfgen_hcl::{expr, naming, BlockExt, Document, Reference};
//!
//! let name = naming::short_name("duplo-mycache", "duplo-");
//! let label = naming::safe_identifier(name);
//! let tenant_name = Reference::local("tenant_name").unwrap();
//! let mut doc = Document::new();
//! doc.add_block("resource", ["duplocloud_ecache_instance", label.as_str()])
//!     .set("tenant_id", Reference::local("tenant_id").unwrap())
//!     .set("name", expr::interpolate(&format!("{}-", name), &tenant_name).unwrap());
//!
//! let text = tfgen_hcl::to_string(&doc).unwrap();
//! assert!(text.contains(r#"name = "mycache-${local.tenant_name}""#));
//! ```

pub mod document;
pub mod error;
pub mod expr;
pub mod naming;
pub mod reference;

pub use document::{to_string, BlockExt, Document};
pub use error::{HclError, HclResult};
pub use hcl::{Block, Expression};
pub use reference::Reference;
