//! Prompt loader: workspace overrides first, built-ins second.

use crate::defaults;
use crate::types::PromptDefinition;
use reviewqa_core::{config::STATE_DIR, AppError, AppResult};
use std::path::{Path, PathBuf};

/// Directory holding prompt override files.
pub fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID.
///
/// Looks for `.reviewqa/prompts/<id>.yml` in the workspace and falls back to
/// the built-in definition with the same id.
///
/// # Example
/// ```no_run
/// use reviewqa_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "chat.rewrite")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        return defaults::builtin(prompt_id).ok_or_else(|| {
            AppError::Prompt(format!(
                "Prompt '{}' not found: no built-in and no file at {:?}",
                prompt_id, prompt_file
            ))
        });
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition, prompt_id)?;

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all available prompt IDs: built-ins plus workspace overrides.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = defaults::builtin_ids()
        .iter()
        .map(|id| id.to_string())
        .collect();

    let dir = prompts_dir(workspace_path);
    if !dir.exists() {
        return Ok(prompt_ids);
    }

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !prompt_ids.iter().any(|id| id == stem) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Validate a prompt definition loaded for `expected_id`.
fn validate_prompt(def: &PromptDefinition, expected_id: &str) -> AppResult<()> {
    if def.id != expected_id {
        return Err(AppError::Prompt(format!(
            "Prompt file for '{}' declares id '{}'",
            expected_id, def.id
        )));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, content: &str) -> PathBuf {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        let file_path = prompts.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_builtin_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), defaults::REWRITE_PROMPT_ID).unwrap();
        assert_eq!(prompt.created_by, "reviewqa");
    }

    #[test]
    fn test_override_replaces_builtin() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            "chat.rewrite",
            r#"
id: chat.rewrite
title: "Terse rewriter"
apiVersion: "1.1"
template: "Rewrite tersely."
"#,
        );

        let prompt = load_prompt(temp_dir.path(), "chat.rewrite").unwrap();
        assert_eq!(prompt.title, "Terse rewriter");
        assert_eq!(prompt.template, "Rewrite tersely.");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(temp_dir.path(), "nonexistent");
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "chat.answer", "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), "chat.answer").is_err());
    }

    #[test]
    fn test_mismatched_id_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            "chat.answer",
            "id: other\ntitle: t\napiVersion: \"1.0\"\ntemplate: x\n",
        );
        assert!(load_prompt(temp_dir.path(), "chat.answer").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            "custom.summary",
            "id: custom.summary\ntitle: t\napiVersion: \"1.0\"\ntemplate: x\n",
        );

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["chat.answer", "chat.rewrite", "custom.summary"]);
    }
}
