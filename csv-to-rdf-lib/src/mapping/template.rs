use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProcessorError;
use crate::utils::{encode_segment, safe};

pub const DEFAULT_PATH: &str = "{template}/{id}";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ColumnRef {
    pub from_column: String,
    pub match_by_index: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LiteralMode {
    Raw,
    Safe,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum LiteralRuleSpec {
    Mode(LiteralMode),
    FromColumn(ColumnRef),
}

/// Mapping-file form of an entity template.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct EntityTemplateSpec {
    /// Defaults to the template's own key.
    pub source_column: Option<String>,
    pub separator: Option<String>,
    pub path: Option<String>,
    pub id_source: Option<ColumnRef>,
    #[serde(default)]
    pub types: Vec<String>,
    pub link_predicate: Option<String>,
    pub inverse_predicate: Option<String>,
    #[serde(default)]
    pub literals: BTreeMap<String, LiteralRuleSpec>,
}

/// Resolved rule for one sub-entity literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralRule {
    Raw,
    Safe,
    FromColumn { column: String, by_index: bool },
}

impl From<&LiteralRuleSpec> for LiteralRule {
    fn from(spec: &LiteralRuleSpec) -> Self {
        match spec {
            LiteralRuleSpec::Mode(LiteralMode::Raw) => LiteralRule::Raw,
            LiteralRuleSpec::Mode(LiteralMode::Safe) => LiteralRule::Safe,
            LiteralRuleSpec::FromColumn(column) => LiteralRule::FromColumn {
                column: column.from_column.clone(),
                by_index: column.match_by_index.unwrap_or(false),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPart {
    Text(String),
    Id,
    Value,
    SafeValue,
    Template,
}

/// Parsed IRI path template, e.g. `author/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    parts: Vec<PathPart>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, ProcessorError> {
        let mut parts = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(PathPart::Text(rest[..open].to_string()));
            }
            let close = rest[open..].find('}').ok_or_else(|| {
                ProcessorError::InvalidMapping(format!(
                    "Unclosed placeholder in path template '{}'",
                    template
                ))
            })? + open;
            let part = match &rest[open + 1..close] {
                "id" => PathPart::Id,
                "value" => PathPart::Value,
                "safe_value" => PathPart::SafeValue,
                "template" => PathPart::Template,
                other => {
                    return Err(ProcessorError::InvalidMapping(format!(
                        "Unknown placeholder '{{{}}}' in path template '{}'. Expected one of {{id}}, {{value}}, {{safe_value}}, {{template}}",
                        other, template
                    )))
                }
            };
            parts.push(part);
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            parts.push(PathPart::Text(rest.to_string()));
        }
        if !parts.iter().any(|p| !matches!(p, PathPart::Text(_))) {
            return Err(ProcessorError::InvalidMapping(format!(
                "Path template '{}' has no placeholder; every instance would share one IRI",
                template
            )));
        }
        Ok(Self { parts })
    }

    /// True when the template reads the split value rather than only the identifier.
    pub fn uses_value(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, PathPart::Value | PathPart::SafeValue))
    }

    /// True when distinct identifiers always render distinct paths: the
    /// template carries `{id}` or `{value}`, both percent-encoded verbatim.
    pub fn is_injective(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, PathPart::Id | PathPart::Value))
    }

    /// Whether `{template}` contributes to the rendered path.
    pub fn uses_template_name(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, PathPart::Template))
    }

    pub fn render(&self, template_name: &str, identifier: &str, value: &str) -> String {
        let mut path = String::new();
        for part in &self.parts {
            match part {
                PathPart::Text(text) => path.push_str(text),
                PathPart::Id => path.push_str(&encode_segment(identifier)),
                PathPart::Value => path.push_str(&encode_segment(value)),
                PathPart::SafeValue => path.push_str(&safe(value)),
                PathPart::Template => path.push_str(&safe(template_name)),
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_template_render() {
        let template = PathTemplate::parse("author/{id}").unwrap();
        assert_eq!(template.render("Authors", "57123", "Smith J."), "author/57123");
        assert!(!template.uses_value());

        let template = PathTemplate::parse(DEFAULT_PATH).unwrap();
        assert_eq!(template.render("Author Keywords", "a/b", "a/b"), "Author_Keywords/a%2Fb");

        let template = PathTemplate::parse("person/{safe_value}").unwrap();
        assert_eq!(template.render("Authors", "", "Doe A."), "person/Doe_A");
        assert!(template.uses_value());
        assert!(!template.is_injective());

        let template = PathTemplate::parse("person/{safe_value}-{value}").unwrap();
        assert_eq!(
            template.render("Authors", "Doe, A.", "Doe, A."),
            "person/Doe_A-Doe%2C%20A."
        );
        assert!(template.is_injective());
    }

    #[test]
    fn test_path_template_errors() {
        assert!(PathTemplate::parse("author/{name}").is_err());
        assert!(PathTemplate::parse("author/{id").is_err());
        assert!(PathTemplate::parse("author/fixed").is_err());
    }

    #[test]
    fn test_literal_rule_spec_deserialization() {
        let literals: BTreeMap<String, LiteralRuleSpec> = serde_json::from_str(
            r#"{
                "foaf:name": "raw",
                "rdfs:label": "safe",
                "schema:identifier": { "from_column": "Author(s) ID", "match_by_index": true }
            }"#,
        )
        .unwrap();
        let rules: Vec<LiteralRule> = literals.values().map(LiteralRule::from).collect();
        assert_eq!(
            rules,
            vec![
                LiteralRule::Raw,
                LiteralRule::Safe,
                LiteralRule::FromColumn {
                    column: "Author(s) ID".to_string(),
                    by_index: true
                }
            ]
        );
    }
}
