//! Late-bound string templates resolved against sibling settings.
//!
//! `{name}` substitutes a sibling already resolved on the same node and
//! `{child.key}` reads through a resolved child node. `{{` and `}}` are
//! literal braces.

use super::{SettingValue, SettingsNode};
use crate::errors::ConfigError;
use serde_json::Value;

/// Renders `template` for the setting at `key`, looking fields up in `scope`.
pub(crate) fn render(template: &str, scope: &SettingsNode, key: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    match n {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => {
                            return Err(ConfigError::invalid_template(
                                key,
                                template,
                                "nested '{' in field",
                            ));
                        }
                        other => field.push(other),
                    }
                }
                if !closed {
                    return Err(ConfigError::invalid_template(key, template, "unclosed '{'"));
                }
                out.push_str(&lookup(&field, scope, key, template)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(ConfigError::invalid_template(key, template, "single '}'"));
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn lookup(field: &str, scope: &SettingsNode, key: &str, template: &str) -> Result<String, ConfigError> {
    if field.is_empty() {
        return Err(ConfigError::invalid_template(
            key,
            template,
            "positional fields are not supported",
        ));
    }
    if field.contains(['!', ':']) {
        return Err(ConfigError::invalid_template(
            key,
            template,
            format!("conversions and format specs are not supported in '{{{field}}}'"),
        ));
    }

    let mut segments = field.split('.');
    let first = segments.next().unwrap_or_default();
    let mut current = scope
        .get(first)
        .ok_or_else(|| ConfigError::missing_key(key, template, field))?;

    for segment in segments {
        current = match current {
            SettingValue::Node(node) => node
                .get(segment)
                .ok_or_else(|| ConfigError::missing_key(key, template, field))?,
            SettingValue::Value(_) => {
                return Err(ConfigError::invalid_template(
                    key,
                    template,
                    format!("'{field}' reads through a value that is not a mapping"),
                ));
            }
        };
    }

    match current {
        SettingValue::Value(Value::String(s)) => Ok(s.clone()),
        SettingValue::Value(Value::Number(n)) => Ok(n.to_string()),
        SettingValue::Value(Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(ConfigError::invalid_template(
            key,
            template,
            format!("'{field}' is not a string, number or boolean"),
        )),
    }
}
