// src/cli/handlers/commons.rs

// Output and prompting helpers shared by the handlers.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use serde::Serialize;

use crate::models::PrintFormat;

/// Serializes `value` in the requested format, without a trailing newline.
pub fn render_output<T: Serialize + ?Sized>(value: &T, format: PrintFormat) -> Result<String> {
    let rendered = match format {
        PrintFormat::Json => serde_json::to_string_pretty(value)?,
        PrintFormat::Yaml => serde_yaml::to_string(value)?.trim_end().to_string(),
    };
    Ok(rendered)
}

/// Writes a value to stdout in the requested format.
pub fn print_output<T: Serialize + ?Sized>(value: &T, format: PrintFormat) -> Result<()> {
    println!("{}", render_output(value, format)?);
    Ok(())
}

/// Asks before a destructive action. `assume_yes` skips the prompt.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    if !confirmed {
        println!("{}", t!("common.info.operation_cancelled").dimmed());
    }
    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_output_formats() {
        let value = json!({"name": "run1", "tags": {"stage": "raw"}});
        assert_eq!(
            render_output(&value, PrintFormat::Json).unwrap(),
            "{\n  \"name\": \"run1\",\n  \"tags\": {\n    \"stage\": \"raw\"\n  }\n}"
        );
        assert_eq!(
            render_output(&value, PrintFormat::Yaml).unwrap(),
            "name: run1\ntags:\n  stage: raw"
        );
    }

    #[test]
    fn test_confirm_assumed() {
        assert!(confirm("Delete?", true).unwrap());
    }
}
