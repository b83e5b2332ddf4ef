use serde_json::Value;

/// Pull a readable reply out of text that may itself be a JSON document.
///
/// `{"status": "ok"}` becomes `ok`. Anything else (plain text, JSON without a
/// usable `status`, invalid JSON) comes back unchanged.
pub fn normalize_response(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => match map.get("status") {
            Some(status) if is_truthy(status) => value_text(status),
            _ => raw.to_string(),
        },
        _ => raw.to_string(),
    }
}

/// Reply text for the `status` field of a `/message/` response.
pub fn reply_text(status: &Value) -> String {
    normalize_response(&value_text(status))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// null, false, 0 and "" don't count as a status.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
