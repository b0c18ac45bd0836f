use anyhow::Context as _;

pub fn generate_content_endpoint(base_url: &str, model: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/models/{model}:generateContent")
}

pub async fn generate_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    prompt: &str,
) -> anyhow::Result<String> {
    let body = serde_json::json!({
        "contents": [
            { "role": "user", "parts": [{ "text": prompt }] }
        ],
    });

    let response = client
        .post(endpoint)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read Gemini response body")?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        anyhow::bail!("Gemini API error ({status}): {message}");
    }

    let value: serde_json::Value = serde_json::from_str(&raw).context("parse Gemini response")?;
    extract_candidate_text(&value)
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    Some(value.pointer("/error/message")?.as_str()?.to_owned())
}

/// Text of the first candidate, all parts concatenated.
fn extract_candidate_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let Some(candidate) = value.pointer("/candidates/0") else {
        let reason = value
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
            .unwrap_or("no candidates");
        anyhow::bail!("Gemini returned no candidates ({reason})");
    };

    let text = candidate
        .pointer("/content/parts")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
        .collect::<String>();

    if text.trim().is_empty() {
        anyhow::bail!("Gemini output text is empty");
    }
    Ok(text)
}
