//! CloudFormation role template: fragment loading, YAML embedding, rendering, and
//! the manual-setup fallback.

pub mod fragments;
pub mod manual;
pub mod render;
pub mod yaml_block;

pub use fragments::{load_policy_fragments, PolicyFragment, CUSTOM_POLICY_NAME};
pub use manual::{default_role_name, manual_instructions, synthesize_role_arn};
pub use render::{render_iam_template, RenderOutcome, TemplateContext, DEFAULT_TEMPLATE_NAME};
pub use yaml_block::to_nice_yaml_block;
