use serde_json::Value;

/// Parse a facet response into a JSON object.
///
/// Markdown code fences around the body are tolerated. Anything that is
/// not a JSON object is rejected with a short reason.
pub(crate) fn parse_facet_json(raw: &str) -> Result<Value, String> {
    let body = strip_code_fence(raw.trim());
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("expected a JSON object".to_string())
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip an optional language tag on the opening fence.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
