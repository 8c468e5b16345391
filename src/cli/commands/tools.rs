//! Tools command - list the tools offered to the model.

use crate::cli::Output;
use crate::config::Settings;
use crate::tools::default_registry;
use anyhow::Result;
use console::style;

/// Run the tools command.
pub fn run_tools(settings: &Settings) -> Result<()> {
    let registry = default_registry(settings)?;

    Output::header(&format!("Tools ({})", registry.len()));
    for descriptor in registry.descriptors() {
        println!("\n  {} {}", style("*").cyan(), style(&descriptor.name).bold());
        println!("    {}", descriptor.description);
        if let Some(properties) = descriptor
            .schema
            .as_ref()
            .and_then(|s| s.get("properties"))
            .and_then(|p| p.as_object())
        {
            let names: Vec<&str> = properties.keys().map(String::as_str).collect();
            println!("    {} {}", style("args:").dim(), names.join(", "));
        }
    }
    println!();

    Ok(())
}
