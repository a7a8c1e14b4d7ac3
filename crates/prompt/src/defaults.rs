//! Built-in prompt definitions.

use crate::types::{PromptBehavior, PromptDefinition, PromptOutputSpec};

/// Identifier of the grounded-answer prompt.
pub const DEFAULT_RAG_PROMPT_ID: &str = "rag.answer";

const RAG_SYSTEM: &str = "You are a helpful assistant for students and staff looking for IT support information.
Answer the question based ONLY on the provided context. Be {{style}}, accurate, and {{tone}}.
If the context doesn't contain enough information to answer the question, say so clearly.
Do not invent links, phone numbers, or procedures that are not in the context.";

const RAG_TEMPLATE: &str = "Context:
{{context}}

Question: {{query}}

Answer based on the context above:";

/// The grounded-answer prompt used when the workspace has no override.
pub fn default_rag_prompt() -> PromptDefinition {
    PromptDefinition {
        id: DEFAULT_RAG_PROMPT_ID.to_string(),
        title: "Grounded answer".to_string(),
        api_version: "1.0".to_string(),
        created_by: "ragline".to_string(),
        behavior: PromptBehavior {
            tone: "helpful".to_string(),
            style: "concise".to_string(),
        },
        system: Some(RAG_SYSTEM.to_string()),
        template: RAG_TEMPLATE.to_string(),
        output: PromptOutputSpec::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_uses_rag_variables() {
        let def = default_rag_prompt();
        assert_eq!(def.id, DEFAULT_RAG_PROMPT_ID);
        assert!(def.template.contains("{{context}}"));
        assert!(def.template.contains("{{query}}"));
        assert!(def.system.as_deref().unwrap().contains("ONLY on the provided context"));
    }
}
