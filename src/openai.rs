use anyhow::Context as _;

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

/// One call to the Responses API.
#[derive(Debug, Clone)]
pub struct ResponsesRequest<'a> {
    pub model: &'a str,
    pub instructions: Option<&'a str>,
    pub input: &'a str,
    pub temperature: Option<f32>,
}

impl ResponsesRequest<'_> {
    fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "input": self.input,
            "text": { "format": { "type": "text" } },
            "store": false,
        });
        let Some(obj) = body.as_object_mut() else {
            return body;
        };
        if let Some(instructions) = self.instructions {
            obj.insert("instructions".to_owned(), serde_json::json!(instructions));
        }
        // GPT-5 models reject sampling params.
        if let Some(temperature) = self.temperature
            && !self.model.starts_with("gpt-5")
        {
            obj.insert("temperature".to_owned(), serde_json::json!(temperature));
        }
        body
    }
}

pub async fn responses_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    request: &ResponsesRequest<'_>,
) -> anyhow::Result<String> {
    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(&request.body())
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read OpenAI response body")?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        anyhow::bail!("OpenAI API error ({status}): {message}");
    }

    let value: serde_json::Value = serde_json::from_str(&raw).context("parse OpenAI response")?;
    extract_output_text(&value).context("extract output text")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("missing `output` array in response"))?;

    let text = output
        .iter()
        .filter(|item| item.get("type").and_then(|v| v.as_str()) == Some("message"))
        .filter_map(|item| item.get("content").and_then(|v| v.as_array()))
        .flatten()
        .filter(|part| part.get("type").and_then(|v| v.as_str()) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
        .collect::<String>();

    if text.trim().is_empty() {
        anyhow::bail!("OpenAI output text is empty");
    }
    Ok(text)
}
