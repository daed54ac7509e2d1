// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Bicep template rendering
//!
//! Templates are compiled into the binary and rendered with tera.

use serde_json::Value;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::errors::{DefflowError, DefflowResult};

pub const NSD_BASE_TEMPLATE: &str = "nsd/base.bicep";
pub const NSD_MANIFEST_TEMPLATE: &str = "nsd/manifest.bicep";
pub const NSD_DEFINITION_TEMPLATE: &str = "nsd/definition.bicep";
pub const NSD_NF_TEMPLATE: &str = "nsd/nf.bicep";

const TEMPLATES: &[(&str, &str)] = &[
    (
        NSD_BASE_TEMPLATE,
        include_str!("../../templates/nsd/base.bicep.tera"),
    ),
    (
        NSD_MANIFEST_TEMPLATE,
        include_str!("../../templates/nsd/manifest.bicep.tera"),
    ),
    (
        NSD_DEFINITION_TEMPLATE,
        include_str!("../../templates/nsd/definition.bicep.tera"),
    ),
    (
        NSD_NF_TEMPLATE,
        include_str!("../../templates/nsd/nf.bicep.tera"),
    ),
];

/// Renders the embedded bicep templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    pub fn new() -> DefflowResult<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.register_filter("bicep_string", bicep_string);
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .map_err(|e| DefflowError::template_render("embedded templates", &e))?;

        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &Context) -> DefflowResult<String> {
        self.tera
            .render(template, context)
            .map_err(|e| DefflowError::template_render(template, &e))
    }
}

/// Escape a value for use inside a single-quoted bicep string
fn bicep_string(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Value::String(escape_bicep(&text)))
}

pub fn escape_bicep(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace("${", "\\${")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_templates_parse() {
        let renderer = TemplateRenderer::new().unwrap();
        let rendered = renderer
            .render(NSD_BASE_TEMPLATE, &Context::new())
            .unwrap();

        assert!(rendered.contains("param publisherName string"));
    }

    #[test]
    fn test_escape_bicep() {
        assert_eq!(escape_bicep("it's ${x}"), "it\\'s \\${x}");
        assert_eq!(escape_bicep("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_missing_variable_is_reported() {
        let renderer = TemplateRenderer::new().unwrap();
        let err = renderer
            .render(NSD_MANIFEST_TEMPLATE, &Context::new())
            .unwrap_err();

        assert!(matches!(err, DefflowError::TemplateRender { template, .. } if template == NSD_MANIFEST_TEMPLATE));
    }
}
