use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;

use super::OutputFormat;
use crate::commands::CommandOutput;

/// Print a command's result in the requested format
pub fn print_command_output(output: &CommandOutput, format: OutputFormat) {
    match output {
        CommandOutput::Nothing => {}
        CommandOutput::Value(value) => print_value(value, format),
        CommandOutput::Views { json, text } => match format {
            OutputFormat::Json => print_value(json, format),
            OutputFormat::Text => print_value(text, format),
        },
    }
}

/// Print a JSON value in the specified format
pub fn print_value(value: &Value, format: OutputFormat) {
    if let Some(rendered) = render(value, format) {
        println!("{}", rendered);
    }
}

/// Render a value, or `None` when there is nothing to print
pub fn render(value: &Value, format: OutputFormat) -> Option<String> {
    if value.is_null() {
        return None;
    }
    Some(match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        OutputFormat::Text => render_text(value),
    })
}

fn render_text(value: &Value) -> String {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
            render_table(items)
        }
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join("\n"),
        Value::Object(fields) => {
            let width = fields.keys().map(String::len).max().unwrap_or(0);
            fields
                .iter()
                .map(|(key, v)| format!("{:<width$} : {}", key, cell(v), width = width))
                .collect::<Vec<_>>()
                .join("\n")
        }
        other => cell(other),
    }
}

fn render_table(rows: &[Value]) -> String {
    // Columns in first-seen order across all rows
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        if let Some(fields) = row.as_object() {
            for key in fields.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for row in rows {
        builder.push_record(
            columns
                .iter()
                .map(|c| row.get(*c).map(cell).unwrap_or_default()),
        );
    }
    builder.build().to_string()
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message);
}
