//! Generation endpoint client.
//!
//! One prompt in, one completion out: a single blocking request per call,
//! no retry and no streaming. Every failure is classified into a
//! [`GenerationFailure`], logged, and returned as the generic
//! [`SpecError::GenerationFailed`] so callers can show it without leaking
//! transport detail.
//!
//! Logs never include the prompt or the credential, only their lengths.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{GenerationFailure, SpecError};

/// Longest slice of an error body kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Something that turns a prompt into generated text.
pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String, SpecError>;
}

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub api_base: String,
    pub model: String,
    /// `None` keeps the transport's default timeout.
    pub timeout: Option<Duration>,
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: &EndpointSettings, api_key: String) -> anyhow::Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            http,
            url: endpoint_url(&settings.api_base, &settings.model),
            model: settings.model.clone(),
            api_key,
        })
    }

    fn request(&self, prompt: &str) -> Result<String, GenerationFailure> {
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| GenerationFailure::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| GenerationFailure::Transport(e.to_string()))?;

        debug!(status = status.as_u16(), body_len = text.len(), "endpoint responded");

        if !status.is_success() {
            return Err(GenerationFailure::Status {
                status: status.as_u16(),
                body: truncate_chars(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        extract_text(&text)
    }
}

impl Generator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, SpecError> {
        let started = Instant::now();
        info!(model = %self.model, prompt_len = prompt.len(), "requesting generation");

        match self.request(prompt) {
            Ok(text) => {
                info!(
                    model = %self.model,
                    text_len = text.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "generation succeeded"
                );
                Ok(text)
            }
            Err(cause) => {
                error!(
                    model = %self.model,
                    err = %cause,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "generation failed"
                );
                Err(SpecError::GenerationFailed { cause })
            }
        }
    }
}

/// `{api_base}/models/{model}:generateContent`, tolerating a trailing slash.
pub fn endpoint_url(api_base: &str, model: &str) -> String {
    format!(
        "{}/models/{model}:generateContent",
        api_base.trim_end_matches('/')
    )
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, GenerationFailure> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationFailure::Malformed(e.to_string()))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationFailure::Empty);
    }
    Ok(text)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GENERATION_FAILED_MESSAGE;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve exactly one HTTP response on a local port; the handle yields
    /// the raw request (head and body) that was received.
    fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
                let done = line == "\r\n" || line.is_empty();
                head.push_str(&line);
                if done {
                    break;
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();

            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();

            head + &String::from_utf8_lossy(&body)
        });

        (format!("http://{addr}/v1beta"), handle)
    }

    fn client_for(api_base: &str) -> GeminiClient {
        let settings = EndpointSettings {
            api_base: api_base.to_owned(),
            model: "gemini-2.5-flash".to_owned(),
            timeout: Some(Duration::from_secs(10)),
        };
        GeminiClient::new(&settings, "test-key".to_owned()).unwrap()
    }

    #[test]
    fn endpoint_url_joins_base_and_model() {
        assert_eq!(
            endpoint_url("https://example.test/v1beta/", "gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn extract_text_concatenates_first_candidate_parts() {
        let body = r###"{"candidates":[{"content":{"parts":[{"text":"## Spec"},{"text":"\nbody"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"###;
        assert_eq!(extract_text(body).unwrap(), "## Spec\nbody");
    }

    #[test]
    fn extract_text_rejects_empty_and_malformed() {
        assert_eq!(extract_text(r#"{"candidates":[]}"#), Err(GenerationFailure::Empty));
        assert_eq!(extract_text("{}"), Err(GenerationFailure::Empty));
        assert_eq!(
            extract_text(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#),
            Err(GenerationFailure::Empty)
        );
        assert!(matches!(
            extract_text("<html>"),
            Err(GenerationFailure::Malformed(_))
        ));
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn transport_failure_is_generic_to_caller() {
        // Nothing listens on port 1.
        let client = client_for("http://127.0.0.1:1");
        let err = client.generate("prompt").unwrap_err();

        assert_eq!(err.to_string(), GENERATION_FAILED_MESSAGE);
        match err {
            SpecError::GenerationFailed {
                cause: GenerationFailure::Transport(detail),
            } => assert!(!detail.is_empty()),
            other => panic!("expected transport failure, got {other:?}"),
        }
    }

    #[test]
    fn successful_response_returns_text_and_sends_key_header() {
        let (base, server) = serve_once(
            "200 OK",
            r##"{"candidates":[{"content":{"parts":[{"text":"# Website Spec"}]}}]}"##,
        );
        let text = client_for(&base).generate("build me a site").unwrap();
        assert_eq!(text, "# Website Spec");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent"));
        assert!(request.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains(r#"{"contents":[{"parts":[{"text":"build me a site"}]}]}"#));
    }

    #[test]
    fn error_status_is_classified_with_body() {
        let (base, server) = serve_once(
            "403 Forbidden",
            r#"{"error":{"message":"API key not valid"}}"#,
        );
        let err = client_for(&base).generate("p").unwrap_err();
        server.join().unwrap();

        assert_eq!(err.to_string(), GENERATION_FAILED_MESSAGE);
        match err {
            SpecError::GenerationFailed {
                cause: GenerationFailure::Status { status, body },
            } => {
                assert_eq!(status, 403);
                assert!(body.contains("API key not valid"));
            }
            other => panic!("expected status failure, got {other:?}"),
        }
    }
}
