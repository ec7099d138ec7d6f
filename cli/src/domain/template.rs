//! Template rendering for remote configuration files.
//!
//! Templates are embedded at compile time from `cli/templates/`. Rendering is
//! a pure function of the template and a flat context record.
//!
//! Syntax:
//! - `{{field}}` substitutes a field; a missing field is an error.
//! - `{{#if field}}..{{else}}..{{/if}}` keeps the first branch when `field` is
//!   present and the (optional) second branch otherwise. Sections do not nest.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use include_dir::{Dir, include_dir};
use regex::{Captures, Regex};

use crate::domain::error::TemplateError;

static TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

#[allow(clippy::expect_used)] // Patterns are compile-time constants
static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{#if\s+(\w+)\s*\}\}(.*?)(?:\{\{else\}\}(.*?))?\{\{/if\}\}")
        .expect("valid section pattern")
});

#[allow(clippy::expect_used)] // Patterns are compile-time constants
static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid field pattern"));

/// The templates Latent knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateName {
    /// systemd service unit.
    Unit,
    /// nginx site.
    Route,
    /// git `post-receive` hook.
    Hook,
}

impl TemplateName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Route => "route",
            Self::Hook => "hook",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            Self::Unit => "unit.service.tmpl",
            Self::Route => "route.conf.tmpl",
            Self::Hook => "hook.sh.tmpl",
        }
    }

    fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Unit | Self::Route => &["id", "port"],
            Self::Hook => &["id"],
        }
    }
}

impl FromStr for TemplateName {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unit" => Ok(Self::Unit),
            "route" => Ok(Self::Route),
            "hook" => Ok(Self::Hook),
            other => Err(TemplateError::UnknownTemplate(other.to_string())),
        }
    }
}

/// Flat key/value record handed to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    fields: BTreeMap<String, String>,
}

impl TemplateContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for the `unit` and `route` templates.
    #[must_use]
    pub fn service(id: &str, port: u16, domain: Option<&str>) -> Self {
        Self::new()
            .with("id", id)
            .with("port", port.to_string())
            .with_opt("domain", domain)
    }

    /// Context for the `hook` template.
    #[must_use]
    pub fn hook(id: &str) -> Self {
        Self::new().with("id", id)
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Render a template by name.
///
/// # Errors
///
/// Returns [`TemplateError::UnknownTemplate`] for names other than `unit`,
/// `route` and `hook`, and [`TemplateError::MissingField`] when the context
/// lacks a field the template needs.
pub fn render(name: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
    render_template(name.parse()?, ctx)
}

/// Render a known template.
///
/// # Errors
///
/// Returns [`TemplateError::MissingField`] when the context lacks a field the
/// template needs.
pub fn render_template(template: TemplateName, ctx: &TemplateContext) -> Result<String, TemplateError> {
    let source = TEMPLATES
        .get_file(template.file_name())
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| TemplateError::UnknownTemplate(template.as_str().to_string()))?;

    if let Some(field) = template.required_fields().iter().find(|f| ctx.get(f).is_none()) {
        return Err(missing(template, field));
    }
    expand(template, source, ctx)
}

fn expand(template: TemplateName, source: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
    let selected = SECTION.replace_all(source, |caps: &Captures<'_>| {
        let branch = if ctx.get(&caps[1]).is_some() {
            caps.get(2)
        } else {
            caps.get(3)
        };
        branch.map_or("", |m| m.as_str()).to_string()
    });

    let mut absent: Option<String> = None;
    let rendered = FIELD.replace_all(&selected, |caps: &Captures<'_>| match ctx.get(&caps[1]) {
        Some(value) => value.to_string(),
        None => {
            absent.get_or_insert_with(|| caps[1].to_string());
            String::new()
        }
    });

    match absent {
        Some(field) => Err(missing(template, &field)),
        None => Ok(rendered.into_owned()),
    }
}

fn missing(template: TemplateName, field: &str) -> TemplateError {
    TemplateError::MissingField {
        template: template.as_str().to_string(),
        field: field.to_string(),
    }
}
