//! Parsing of the template and of every source shape, plus normalization
//! into [`crate::models::Node`].

pub mod lines;
pub mod normalize;
pub mod table;
pub mod template;

pub use normalize::{apply_default_port, dedupe, expand_dual_protocol, normalize};
pub use template::{parse_template, TemplateOverrides};
