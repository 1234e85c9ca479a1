// src/models/code_template.rs

use std::{
    collections::{BTreeSet, HashMap},
    sync::LazyLock,
};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Document, Timestamp};
use crate::{error::AppError, schema::CollectionName};

/// Matches `{{name}}` tokens inside template code.
static PLACEHOLDER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    Javascript,
    Cpp,
    Csharp,
    Go,
    Rust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateType {
    Basic,
    Class,
    Function,
    Algorithm,
    DataStructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// A named slot inside template code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Represents a document of the 'code_templates' collection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_placeholders))]
pub struct CodeTemplate {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub language: Language,

    pub template_type: TemplateType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template source with `{{name}}` placeholders.
    #[validate(length(min = 1))]
    pub code: String,

    #[serde(default)]
    pub placeholders: Vec<Placeholder>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<SkillLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,

    /// Author user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,

    #[serde(default, with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Timestamp,

    #[serde(default, with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Timestamp,
}

impl Document for CodeTemplate {
    const COLLECTION: CollectionName = CollectionName::CodeTemplates;

    fn normalize(&mut self) {
        self.tags.sort();
        self.tags.dedup();
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl CodeTemplate {
    /// Names of the placeholder tokens used in `code`, in order of first use.
    pub fn referenced_placeholders(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        PLACEHOLDER_TOKEN
            .captures_iter(&self.code)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Substitutes every placeholder with the supplied value or its default.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, AppError> {
        let mut missing = Vec::new();
        let rendered = PLACEHOLDER_TOKEN.replace_all(&self.code, |caps: &Captures| {
            let name = &caps[1];
            let value = values.get(name).cloned().or_else(|| {
                self.placeholders
                    .iter()
                    .find(|p| p.name == name)
                    .and_then(|p| p.default_value.clone())
            });
            match value {
                Some(v) => v,
                None => {
                    missing.push(name.to_string());
                    caps[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(AppError::BadRequest(format!(
                "No value for placeholder(s): {}",
                missing.join(", ")
            )));
        }

        Ok(rendered.into_owned())
    }
}

/// Every token in `code` needs a placeholder entry, and entry names are unique.
fn validate_placeholders(template: &CodeTemplate) -> Result<(), validator::ValidationError> {
    let mut declared = BTreeSet::new();
    for placeholder in &template.placeholders {
        if !declared.insert(placeholder.name.as_str()) {
            let mut err = validator::ValidationError::new("duplicate_placeholder");
            err.message = Some(format!("placeholder '{}' is declared twice", placeholder.name).into());
            return Err(err);
        }
    }

    let undeclared: Vec<&str> = template
        .referenced_placeholders()
        .into_iter()
        .filter(|name| !declared.contains(name))
        .collect();

    if !undeclared.is_empty() {
        let mut err = validator::ValidationError::new("undeclared_placeholder");
        err.message = Some(format!("undeclared placeholder(s): {}", undeclared.join(", ")).into());
        return Err(err);
    }
    Ok(())
}

/// DTO for rendering a template.
#[derive(Debug, Default, Deserialize)]
pub struct RenderTemplateRequest {
    #[serde(default)]
    pub values: HashMap<String, String>,
}
