//! JSON extraction from free-form model output

/// Locate the JSON object in a model response.
///
/// Handles fenced code blocks and falls back to the span between the first
/// `{` and the last `}`.
pub(crate) fn extract_json(response: &str) -> &str {
    let fenced = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
    } else if response.contains("```") {
        response.split("```").nth(1).and_then(|s| s.split("```").next())
    } else {
        None
    };

    let candidate = fenced.unwrap_or(response).trim();
    if candidate.starts_with('{') && candidate.ends_with('}') {
        return candidate;
    }

    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => candidate,
    }
}
