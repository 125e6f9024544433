//! Tool catalogue rendering
//!
//! The vendor has no function-calling support, so tool definitions are
//! described to the model in plain text appended to the user's turn.

use std::fmt::Write;

use serde_json::Value;

use crate::protocol::{ChatMessage, Content, ContentPart, Role};

/// Header placed before the rendered catalogue
pub const TOOLS_HEADER: &str = "\n\nAvailable tools:\n";

/// Render function tools as a numbered, human-readable catalogue.
///
/// Numbering follows the position in `tools`; entries that are not
/// `{"type": "function"}` are skipped but still consume a number.
pub fn render_tools(tools: &[Value]) -> String {
    let mut out = String::new();

    for (index, tool) in tools.iter().enumerate() {
        if tool.get("type").and_then(Value::as_str) != Some("function") {
            continue;
        }
        let function = tool.get("function").cloned().unwrap_or(Value::Null);
        let name = str_field(&function, "name");
        let description = str_field(&function, "description");

        let _ = writeln!(out, "Function {}: {}", index + 1, name);
        if !description.is_empty() {
            let _ = writeln!(out, "Description: {}", description);
        }

        if let Some(parameters) = function
            .get("parameters")
            .and_then(Value::as_object)
            .filter(|p| !p.is_empty())
        {
            let kind = parameters
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("object");
            let _ = writeln!(out, "Parameters (type: {}):", kind);

            let required: Vec<&str> = parameters
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            if let Some(properties) = parameters.get("properties").and_then(Value::as_object) {
                for (prop, info) in properties {
                    render_property(&mut out, prop, info, required.contains(&prop.as_str()));
                }
            }
        }

        out.push('\n');
    }

    out
}

fn render_property(out: &mut String, name: &str, info: &Value, required: bool) {
    let kind = info.get("type").and_then(Value::as_str).unwrap_or("string");
    let description = str_field(info, "description");

    let _ = write!(out, "  - {} ({})", name, kind);
    if required {
        out.push_str(" [required]");
    }
    if !description.is_empty() {
        let _ = write!(out, ": {}", description);
    }
    out.push('\n');

    if let Some(values) = info.get("enum").and_then(Value::as_array) {
        let values: Vec<String> = values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        let _ = writeln!(out, "    Values: {}", values.join(", "));
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Append the tool catalogue to the final message when it is a user turn.
///
/// Returns whether the catalogue was attached.
pub fn attach_tools(messages: &mut [ChatMessage], tools: &[Value]) -> bool {
    if tools.is_empty() {
        return false;
    }
    let Some(last) = messages.last_mut().filter(|m| m.role == Role::User) else {
        return false;
    };

    let addition = format!("{}{}", TOOLS_HEADER, render_tools(tools));
    match last.content.as_mut() {
        Some(Content::Text(text)) => text.push_str(&addition),
        Some(Content::Parts(parts)) => parts.push(ContentPart::Text { text: addition }),
        None => last.content = Some(Content::Text(addition)),
    }
    true
}
