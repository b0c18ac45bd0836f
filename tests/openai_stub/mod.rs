use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const STUB_API_KEY: &str = "sk-stub";

/// Responses API stand-in that answers every summary prompt with a canned text.
pub struct OpenAiStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl OpenAiStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start openai stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post || path != "/v1/responses" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let authorized = request.headers().iter().any(|h| {
                    h.field.equiv("Authorization")
                        && h.value.as_str() == format!("Bearer {STUB_API_KEY}")
                });
                if !authorized {
                    let body = serde_json::json!({
                        "error": { "message": "Incorrect API key provided" }
                    });
                    let _ = request.respond(
                        tiny_http::Response::from_string(body.to_string()).with_status_code(401),
                    );
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                let Some(prompt) = parsed.get("input").and_then(|v| v.as_str()) else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing input").with_status_code(400),
                    );
                    continue;
                };
                let Some(title) = quoted_title(prompt) else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("unknown prompt").with_status_code(400),
                    );
                    continue;
                };

                let output_text = format!("{title} is a stub summary.");
                let response_body = serde_json::json!({
                    "id": "resp_stub",
                    "object": "response",
                    "model": parsed.get("model").cloned().unwrap_or(Value::String("stub-model".to_owned())),
                    "output": [
                        {
                            "type": "message",
                            "role": "assistant",
                            "content": [
                                { "type": "output_text", "text": output_text }
                            ]
                        }
                    ]
                });

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(response_body.to_string())
                    .with_status_code(200)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for OpenAiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Title between the quotes of "... of the book '<title>'."
fn quoted_title(prompt: &str) -> Option<&str> {
    let rest = prompt.strip_prefix("Provide a concise summary")?;
    let start = rest.find(" of the book '")? + " of the book '".len();
    let rest = &rest[start..];
    rest.strip_suffix("'.")
}
