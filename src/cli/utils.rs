use std::io::Read;

use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "success": true, "message": message }))?
            );
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a single record; text mode prints one `field: value` per line
pub fn output_record(output_format: &OutputFormat, record: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Text => match record.as_object() {
            Some(fields) if fields.is_empty() => println!("No record found"),
            Some(fields) => {
                let width = fields.keys().map(String::len).max().unwrap_or(0);
                for (name, value) in fields {
                    println!("{:width$}  {}", name, display_value(value), width = width);
                }
            }
            None => println!("{}", display_value(record)),
        },
    }
    Ok(())
}

/// Output a list of records, separated by blank lines in text mode
pub fn output_records(output_format: &OutputFormat, records: &[Value]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No records found");
            }
            for (i, record) in records.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                output_record(output_format, record)?;
            }
        }
    }
    Ok(())
}

pub fn output_list(output_format: &OutputFormat, items: &[String]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Text => {
            for item in items {
                println!("{}", item);
            }
        }
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read a JSON object from stdin
pub fn read_stdin_json() -> anyhow::Result<Value> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    parse_record_json(&input)
}

pub fn parse_record_json(input: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(input.trim())
        .map_err(|e| anyhow::anyhow!("stdin is not valid JSON: {}", e))?;
    if !value.is_object() {
        anyhow::bail!("expected a JSON object, got {}", value);
    }
    Ok(value)
}
