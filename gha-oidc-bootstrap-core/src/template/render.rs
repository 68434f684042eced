//! CloudFormation template rendering.

use std::path::{Path, PathBuf};

use log::{debug, info};
use minijinja::{AutoEscape, Environment, ErrorKind, Value};
use rust_embed::RustEmbed;
use serde::Serialize;

use super::fragments::{load_policy_fragments, PolicyFragment, CUSTOM_POLICY_NAME};
use super::yaml_block::to_nice_yaml_block;
use crate::config::{defaults, RenderConfig};
use crate::error::{BootstrapError, BootstrapResult};

/// Name of the built-in role template
pub const DEFAULT_TEMPLATE_NAME: &str = "iam_role.template.j2";

/// Templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "resources/templates"]
#[include = "*.j2"]
struct EmbeddedTemplates;

/// Variables exposed to the template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub trust_policy: serde_json::Value,
    pub policies: Vec<PolicyFragment>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub role_name: Option<String>,
}

/// Summary of a completed render
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub output: PathBuf,
    pub policy_names: Vec<String>,
}

/// Template filter form of [`to_nice_yaml_block`]; indent defaults to the policy
/// document depth.
fn yaml_block_filter(value: Value, indent: Option<usize>) -> Result<String, minijinja::Error> {
    let json = serde_json::to_value(&value).map_err(|e| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("value is not representable as JSON: {e}"),
        )
    })?;
    to_nice_yaml_block(&json, indent.unwrap_or(defaults::POLICY_BLOCK_INDENT))
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_filter("to_nice_yaml_block", yaml_block_filter);
    env
}

/// Read the template source, falling back to the embedded default.
pub fn load_template_source(path: Option<&Path>) -> BootstrapResult<(String, String)> {
    match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| BootstrapError::file_system("read template", path, e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_TEMPLATE_NAME.to_string());
            Ok((name, source))
        }
        None => {
            let file = EmbeddedTemplates::get(DEFAULT_TEMPLATE_NAME).ok_or_else(|| {
                BootstrapError::configuration(format!(
                    "Embedded template '{DEFAULT_TEMPLATE_NAME}' is missing"
                ))
            })?;
            let source = String::from_utf8(file.data.into_owned()).map_err(|e| {
                BootstrapError::configuration(format!("Embedded template is not UTF-8: {e}"))
            })?;
            Ok((DEFAULT_TEMPLATE_NAME.to_string(), source))
        }
    }
}

/// Render `source` with `context`.
pub fn render_template(
    name: &str,
    source: &str,
    context: &TemplateContext,
) -> BootstrapResult<String> {
    let env = environment();
    let template = env.template_from_named_str(name, source)?;
    Ok(template.render(context)?)
}

/// Load the trust policy and fragments named by `config` into a template context.
pub fn build_context(config: &RenderConfig) -> BootstrapResult<TemplateContext> {
    let trust_text = std::fs::read_to_string(&config.trust_policy_path).map_err(|e| {
        BootstrapError::file_system("read trust policy", &config.trust_policy_path, e)
    })?;
    let trust_policy = serde_json::from_str(&trust_text)
        .map_err(|e| BootstrapError::json(&config.trust_policy_path, e))?;

    let mut policies = load_policy_fragments(&config.policies_dir)?;
    if let Some(custom) = &config.custom_policy {
        debug!("Attaching {} as {CUSTOM_POLICY_NAME}", custom.display());
        policies.push(PolicyFragment::load(CUSTOM_POLICY_NAME, custom)?);
    }

    Ok(TemplateContext {
        trust_policy,
        policies,
        owner: config.owner.clone(),
        repo: config.repo.clone(),
        role_name: config.role_name.clone(),
    })
}

/// Render the role template described by `config` and write it to `config.output`.
///
/// The output directory is created when missing. Any failure aborts before the
/// output file is touched.
pub fn render_iam_template(config: &RenderConfig) -> BootstrapResult<RenderOutcome> {
    let (name, source) = load_template_source(config.template.as_deref())?;
    let context = build_context(config)?;
    let rendered = render_template(&name, &source, &context)?;

    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| BootstrapError::file_system("create output directory", parent, e))?;
    }
    std::fs::write(&config.output, rendered)
        .map_err(|e| BootstrapError::file_system("write rendered template", &config.output, e))?;

    info!(
        "Rendered {} with {} inline policies to {}",
        name,
        context.policies.len(),
        config.output.display()
    );

    Ok(RenderOutcome {
        output: config.output.clone(),
        policy_names: context.policies.into_iter().map(|p| p.name).collect(),
    })
}
