//! Prompt templates for Svar.
//!
//! Prompts can be customized by placing a `prompts.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    pub tools: ToolPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts that set up the agent's behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: "You are a general AI assistant. I will ask you a question. \
Report your thoughts, and finish your answer with the following template: FINAL ANSWER: [YOUR FINAL ANSWER]. \
YOUR FINAL ANSWER should be a number OR as few words as possible OR a comma-separated list of numbers and/or strings. \
If you are asked for a number, don't use a comma to write your number neither use units such as $ or percent sign unless specified otherwise. \
If you are asked for a string, don't use articles, neither abbreviations (e.g. for cities), and write the digits in plain text unless specified otherwise. \
If you are asked for a comma-separated list, apply the above rules depending on whether the element to be put in the list is a number or a string."
                .to_string(),
        }
    }
}

/// Text wrapped around the tool catalog in the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPrompts {
    pub catalog_intro: String,
    pub catalog_outro: String,
}

impl Default for ToolPrompts {
    fn default() -> Self {
        Self {
            catalog_intro: "You can use the following tools. To call a tool, reply with a block in exactly the \
format shown in its usage example, replacing the placeholder values."
                .to_string(),
            catalog_outro: r#"Rules for tool calls:
- The args line must be a JSON object with double-quoted keys and string values.
- You may emit several tool call blocks in one reply; each is run independently.
- After your tool call blocks, stop and wait. Results arrive as <tool_result> messages.
- When you no longer need tools, answer without any tool call block."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("prompts.toml");
            if custom_path.exists() {
                let content = std::fs::read_to_string(&custom_path)?;
                prompts = toml::from_str(&content)?;
            }
        }

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// The system prompt with custom variables substituted.
    pub fn system_prompt(&self) -> String {
        Self::render(&self.agent.system, &self.variables)
    }
}
