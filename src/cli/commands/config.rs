//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{anyhow, bail, Result};
use std::path::Path;

/// Run the config command against the file at `config_path`.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_value(&settings, key, value)?;
            updated.save_to(&config_path.to_path_buf())?;
            Output::success(&format!("Set {} = {} in {}", key, value, config_path.display()));
        }

        ConfigAction::Edit => {
            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save_to(&config_path.to_path_buf())?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor).arg(config_path).status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Set a dotted key such as `model.region`, returning the updated settings.
///
/// The value is read as a TOML literal (`0.5`, `true`, `3`) unless the key
/// currently holds a string, in which case it is taken verbatim.
fn set_value(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let mut root = toml::Value::try_from(settings)?;

    let mut parts: Vec<&str> = key.split('.').collect();
    let leaf = parts.pop().filter(|leaf| !leaf.is_empty()).ok_or_else(|| anyhow!("Empty key"))?;
    if parts.is_empty() {
        bail!("Key must name a setting inside a section, e.g. model.region");
    }

    let mut table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Configuration is not a table"))?;
    for part in &parts {
        table = table
            .get_mut(*part)
            .and_then(toml::Value::as_table_mut)
            .ok_or_else(|| anyhow!("Unknown configuration section: {}", part))?;
    }

    let new_value = match table.get(leaf) {
        Some(toml::Value::String(_)) => toml::Value::String(value.to_string()),
        _ => parse_literal(value),
    };
    table.insert(leaf.to_string(), new_value);

    let updated: Settings = root
        .try_into()
        .map_err(|e| anyhow!("Invalid value for {}: {}", key, e))?;

    // Unknown keys are ignored on load, so make sure this one survived.
    let check = toml::Value::try_from(&updated)?;
    let found = parts
        .iter()
        .try_fold(&check, |node, part| node.get(*part))
        .and_then(|section| section.get(leaf))
        .is_some();
    if !found {
        bail!("Unknown configuration key: {}", key);
    }

    Ok(updated)
}

fn parse_literal(value: &str) -> toml::Value {
    format!("v = {}", value)
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelFamily;

    #[test]
    fn test_set_string_and_number() {
        let settings = Settings::default();

        let updated = set_value(&settings, "model.region", "eu-west-1").unwrap();
        assert_eq!(updated.model.region, "eu-west-1");

        let updated = set_value(&updated, "model.temperature", "0.5").unwrap();
        assert!((updated.model.temperature - 0.5).abs() < f32::EPSILON);

        let updated = set_value(&updated, "agent.max_iterations", "4").unwrap();
        assert_eq!(updated.agent.max_iterations, 4);
        assert_eq!(updated.model.region, "eu-west-1");
    }

    #[test]
    fn test_set_enum_and_optional() {
        let settings = Settings::default();

        let updated = set_value(&settings, "model.family", "mistral").unwrap();
        assert_eq!(updated.model.family, ModelFamily::Mistral);

        let updated = set_value(&updated, "model.endpoint_url", "http://localhost:4566").unwrap();
        assert_eq!(updated.model.endpoint_url.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let settings = Settings::default();
        assert!(set_value(&settings, "agent.max_iterations", "many").is_err());
        assert!(set_value(&settings, "nope.key", "1").is_err());
        assert!(set_value(&settings, "model.no_such_field", "1").is_err());
        assert!(set_value(&settings, "model", "1").is_err());
    }
}
