//! Prompt types for ragline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A grounded-answer prompt, as stored in `.ragline/prompts/<id>.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDefinition {
    pub id: String,
    pub title: String,

    /// Schema version, `x.y`
    pub api_version: String,

    #[serde(default)]
    pub created_by: String,

    #[serde(default)]
    pub behavior: PromptBehavior,

    /// System message template (Handlebars)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User message template (Handlebars); receives `query` and `context`
    pub template: String,

    #[serde(default)]
    pub output: PromptOutputSpec,
}

impl PromptDefinition {
    /// Whether the user template renders `{{variable}}`.
    pub fn template_references(&self, variable: &str) -> bool {
        let compact = format!("{{{{{}}}}}", variable);
        let spaced = format!("{{{{ {} }}}}", variable);
        self.template.contains(&compact) || self.template.contains(&spaced)
    }
}

/// Exposed to templates as `tone` and `style`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBehavior {
    pub tone: String,
    pub style: String,
}

impl Default for PromptBehavior {
    fn default() -> Self {
        Self {
            tone: "helpful".to_string(),
            style: "concise".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// "text" or "markdown"
    pub format: String,
}

impl Default for PromptOutputSpec {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

/// Rendered system and user messages for one model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    pub system: Option<String>,
    pub user: String,
    pub metadata: BuiltPromptMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPromptMetadata {
    pub source_prompt_id: String,

    /// Every variable the templates were rendered with
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELPDESK_YAML: &str = r#"
id: rag.answer.helpdesk
title: Helpdesk answer
apiVersion: "1.0"
createdBy: it-team
behavior:
  tone: friendly
  style: step-by-step
system: "You answer for the {{tone}} helpdesk."
template: |
  Context:
  {{ context }}

  Question: {{query}}
"#;

    #[test]
    fn test_prompt_definition_deserialization() {
        let def: PromptDefinition = serde_yaml::from_str(HELPDESK_YAML).unwrap();
        assert_eq!(def.id, "rag.answer.helpdesk");
        assert_eq!(def.api_version, "1.0");
        assert_eq!(def.created_by, "it-team");
        assert_eq!(def.behavior.style, "step-by-step");
        assert!(def.system.is_some());
        assert_eq!(def.output.format, "text");
    }

    #[test]
    fn test_behavior_defaults_when_omitted() {
        let def: PromptDefinition = serde_yaml::from_str(
            "id: p\ntitle: P\napiVersion: \"1.0\"\ntemplate: \"{{context}}\"\n",
        )
        .unwrap();
        assert_eq!(def.behavior, PromptBehavior::default());
        assert!(def.system.is_none());
    }

    #[test]
    fn test_template_references() {
        let def: PromptDefinition = serde_yaml::from_str(HELPDESK_YAML).unwrap();
        assert!(def.template_references("context"));
        assert!(def.template_references("query"));
        assert!(!def.template_references("tone"));
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let built = BuiltPrompt::new(None, "u".to_string(), "rag.answer".to_string(), HashMap::new());
        let json = serde_json::to_value(&built).unwrap();
        assert_eq!(json["metadata"]["sourcePromptId"], "rag.answer");
    }
}
