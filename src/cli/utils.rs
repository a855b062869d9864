use serde_json::{json, Value};
use crate::cli::OutputFormat;

pub const RULE_WIDTH: usize = 60;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&success_body(message, data))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a non-fatal warning in the appropriate format
pub fn output_warning(output_format: &OutputFormat, message: &str) {
    match output_format {
        // JSON consumers read the flag from the report body
        OutputFormat::Json => {}
        OutputFormat::Text => println!("\n⚠️  WARNING: {}", message),
    }
}

/// JSON body for a success message, with the report fields merged in.
pub fn success_body(message: &str, data: Option<Value>) -> Value {
    let mut response = json!({
        "success": true,
        "message": message
    });

    if let (Some(Value::Object(fields)), Some(body)) = (data, response.as_object_mut()) {
        body.extend(fields);
    }

    response
}

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Print `label: value` lines between horizontal rules.
pub fn print_block(lines: &[(&str, String)]) {
    println!("{}", rule());
    for (label, value) in lines {
        println!("{}: {}", label, value);
    }
    println!("{}", rule());
}
