//! Prompt builder: renders a definition's template into a system instruction.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use reviewqa_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a system instruction from a definition and template variables.
///
/// Every variable the definition declares must be present.
///
/// # Example
/// ```no_run
/// use reviewqa_prompt::{build_prompt, defaults};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = defaults::builtin(defaults::ANSWER_PROMPT_ID).unwrap();
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "Great battery life".to_string());
/// vars.insert("input".to_string(), "How is the battery?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{}", built.system);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::trace!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .variables
        .iter()
        .find(|name| !variables.contains_key(name.as_str()))
    {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' requires variable '{}'",
            definition.id, missing
        )));
    }

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        rendered,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Review text is plain text, never HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    #[test]
    fn test_render_without_escaping() {
        let mut vars = HashMap::new();
        vars.insert("input".to_string(), "Is it <5\" & light?".to_string());

        let result = render_template("Q: {{input}}", &vars).unwrap();
        assert_eq!(result, "Q: Is it <5\" & light?");
    }

    #[test]
    fn test_build_answer_prompt() {
        let def = defaults::builtin(defaults::ANSWER_PROMPT_ID).unwrap();
        let mut vars = HashMap::new();
        vars.insert(
            "context".to_string(),
            "Great battery life, lasts two days".to_string(),
        );
        vars.insert(
            "input".to_string(),
            "How is the battery on PhoneX?".to_string(),
        );

        let built = build_prompt(&def, vars).unwrap();
        assert!(built.system.contains("lasts two days"));
        assert!(built.system.contains("QUESTION: How is the battery on PhoneX?"));
        assert_eq!(built.metadata.source_prompt_id, "chat.answer");
    }

    #[test]
    fn test_missing_declared_variable() {
        let def = defaults::builtin(defaults::ANSWER_PROMPT_ID).unwrap();
        let mut vars = HashMap::new();
        vars.insert("input".to_string(), "q".to_string());

        let err = build_prompt(&def, vars).unwrap_err();
        assert!(err.to_string().contains("context"));
    }

    #[test]
    fn test_invalid_template() {
        let vars = HashMap::new();
        assert!(render_template("{{#if}}", &vars).is_err());
    }
}
