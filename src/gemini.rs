use crate::error::PipelineError;

pub fn generate_endpoint(base_url: &str, model: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/models/{model}:generateContent")
}

/// Single-prompt completion against the generative-text service. Any
/// transport failure, non-success status, or empty completion is a
/// [`PipelineError::Generation`].
pub async fn generate_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    prompt: &str,
) -> Result<String, PipelineError> {
    let body = serde_json::json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ],
    });

    let response = client
        .post(endpoint)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| PipelineError::Generation(format!("POST {endpoint}: {err}")))?;

    let status = response.status();
    let raw = response
        .text()
        .await
        .map_err(|err| PipelineError::Generation(format!("read response body: {err}")))?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or(raw);
        return Err(PipelineError::Generation(format!(
            "API error ({status}): {message}"
        )));
    }

    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|err| PipelineError::Generation(format!("parse response: {err}")))?;
    extract_candidate_text(&value)
        .ok_or_else(|| PipelineError::Generation("response contained no candidate text".to_owned()))
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_candidate_text(value: &serde_json::Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let mut text = String::new();
    for part in parts {
        if let Some(part_text) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(part_text);
        }
    }

    if text.trim().is_empty() {
        return None;
    }
    Some(text)
}
