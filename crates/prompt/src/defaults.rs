//! Built-in prompt definitions.
//!
//! A YAML file with the same id under `.reviewqa/prompts/` replaces these.

use crate::types::PromptDefinition;

/// Id of the instruction that turns a follow-up into a standalone question.
pub const REWRITE_PROMPT_ID: &str = "chat.rewrite";

/// Id of the instruction that answers from retrieved reviews.
pub const ANSWER_PROMPT_ID: &str = "chat.answer";

const REWRITE_TEMPLATE: &str = "Given the chat history and the latest user message, \
rewrite the message as a standalone question that can be understood without the chat history. \
Replace pronouns and vague references such as \"it\", \"that one\" or \"tell me more\" with the \
product or topic they refer to. Do not answer the question. \
Return only the rewritten question.";

const ANSWER_TEMPLATE: &str = "You are an e-commerce assistant answering product questions \
using customer reviews and product titles.
Stick to the context below. Be concise and helpful.
If the context does not contain the answer, say that the reviews do not cover it instead of guessing.

CONTEXT:
{{context}}

QUESTION: {{input}}";

/// Names of all built-in prompts.
pub fn builtin_ids() -> [&'static str; 2] {
    [REWRITE_PROMPT_ID, ANSWER_PROMPT_ID]
}

/// Look up a built-in prompt by id.
pub fn builtin(id: &str) -> Option<PromptDefinition> {
    let (title, variables, template) = match id {
        REWRITE_PROMPT_ID => ("Standalone question rewriter", vec![], REWRITE_TEMPLATE),
        ANSWER_PROMPT_ID => (
            "Review-grounded answerer",
            vec!["context".to_string(), "input".to_string()],
            ANSWER_TEMPLATE,
        ),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        created_by: "reviewqa".to_string(),
        variables,
        template: template.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_exist() {
        for id in builtin_ids() {
            let def = builtin(id).unwrap();
            assert_eq!(def.id, id);
            assert!(!def.template.is_empty());
        }
        assert!(builtin("chat.unknown").is_none());
    }

    #[test]
    fn test_answer_template_declares_placeholders() {
        let def = builtin(ANSWER_PROMPT_ID).unwrap();
        for var in &def.variables {
            assert!(def.template.contains(&format!("{{{{{}}}}}", var)));
        }
    }
}
