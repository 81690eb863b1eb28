//! web_fetch: HTTP GET/POST with a response-size cap.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use thinkact_config::ToolsConfig;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};
use tracing::{debug, warn};

use crate::required_arg;

const TRUNCATION_NOTICE: &str = "\n... (response truncated)";

pub struct WebFetchTool {
    client: reqwest::Client,
    timeout_ms: u64,
    max_response_bytes: usize,
}

impl WebFetchTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.web_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            timeout_ms: config.web_timeout_ms,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

/// Parse `key:value,key:value` into a header map.
fn parse_headers(raw: &str) -> Result<HeaderMap, ToolError> {
    let mut headers = HeaderMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once(':')
            .ok_or_else(|| ToolError::InvalidArguments(format!("Malformed header: {pair}")))?;
        let name = HeaderName::from_bytes(key.trim().as_bytes())
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid header name '{key}': {e}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid header value for '{key}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl Tool for WebFetchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "web_fetch".into(),
            description: "Fetch content from a URL. Returns the response body.".into(),
            parameters: vec![
                ToolParameter::required("url", ParamKind::String, "The URL to fetch"),
                ToolParameter::optional("method", ParamKind::String, "HTTP method (GET, POST)", Some("GET")),
                ToolParameter::optional(
                    "headers",
                    ParamKind::String,
                    "Custom headers (key:value,key:value)",
                    None,
                ),
                ToolParameter::optional("body", ParamKind::String, "Request body for POST", None),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let url = required_arg(arguments, "url")?;
        let method = arguments
            .get("method")
            .map_or("GET".to_string(), |m| m.trim().to_uppercase());

        let parsed = match reqwest::Url::parse(url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            _ => return Ok(ToolOutcome::failure(format!("Invalid URL: {url}"))),
        };
        let headers = parse_headers(arguments.get("headers").map_or("", String::as_str))?;

        let mut request = match method.as_str() {
            "GET" => self.client.get(parsed),
            "POST" => self
                .client
                .post(parsed)
                .body(arguments.get("body").cloned().unwrap_or_default()),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "Unsupported HTTP method: {other}. Must be GET or POST."
                )));
            }
        };
        request = request.headers(headers);

        debug!(url = %url, method = %method, "Fetching URL");

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Ok(ToolOutcome::failure(format!(
                    "Request timed out after {}ms",
                    self.timeout_ms
                )));
            }
            Err(e) => return Ok(ToolOutcome::failure(format!("Request failed: {e}"))),
        };

        let status = response.status();
        let mut body = Vec::new();
        let mut truncated = false;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    return Ok(ToolOutcome::failure_with_output(
                        format!("Failed to receive response: {e}"),
                        String::from_utf8_lossy(&body).into_owned(),
                    ));
                }
            };
            let room = self.max_response_bytes.saturating_sub(body.len());
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let mut text = String::from_utf8_lossy(&body).into_owned();
        if truncated {
            text.push_str(TRUNCATION_NOTICE);
        }

        if status.is_success() {
            Ok(ToolOutcome::success(text))
        } else {
            Ok(ToolOutcome::failure_with_output(
                format!("HTTP {}", status.as_u16()),
                text,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn args(pairs: &[(&str, &str)]) -> ToolArguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Answer one request with `status` and `body`; yields the raw request head.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            while !String::from_utf8_lossy(&raw).contains("\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });
        (format!("http://{addr}/page"), handle)
    }

    #[test]
    fn header_parsing() {
        let headers = parse_headers("Accept: text/html, X-Trace:abc").unwrap();
        assert_eq!(headers["accept"], "text/html");
        assert_eq!(headers["x-trace"], "abc");
        assert!(parse_headers("").unwrap().is_empty());
        assert!(parse_headers("no-colon").is_err());
    }

    #[tokio::test]
    async fn fetch_success() {
        let (url, server) = serve_once("200 OK", "hello from server").await;
        let tool = WebFetchTool::new(&ToolsConfig::default());
        let outcome = tool
            .execute(&args(&[("url", url.as_str()), ("headers", "X-Test: yes")]))
            .await
            .unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.output, "hello from server");

        let head = server.await.unwrap().to_lowercase();
        assert!(head.starts_with("get /page"));
        assert!(head.contains("x-test: yes"));
        assert!(head.contains("user-agent: thinkact/"));
    }

    #[tokio::test]
    async fn non_success_status_is_failure_with_body() {
        let (url, _server) = serve_once("404 Not Found", "missing").await;
        let outcome = WebFetchTool::new(&ToolsConfig::default())
            .execute(&args(&[("url", url.as_str())]))
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(outcome.error(), "HTTP 404");
        assert_eq!(outcome.output, "missing");
    }

    #[tokio::test]
    async fn body_is_capped() {
        let (url, _server) = serve_once("200 OK", "0123456789").await;
        let config = ToolsConfig {
            max_response_bytes: 4,
            ..ToolsConfig::default()
        };
        let outcome = WebFetchTool::new(&config)
            .execute(&args(&[("url", url.as_str())]))
            .await
            .unwrap();
        assert_eq!(outcome.output, format!("0123{TRUNCATION_NOTICE}"));
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let tool = WebFetchTool::new(&ToolsConfig::default());
        let outcome = tool.execute(&args(&[("url", "ftp://example.com")])).await.unwrap();
        assert_eq!(outcome.error(), "Invalid URL: ftp://example.com");

        let result = tool
            .execute(&args(&[("url", "http://example.com"), ("method", "DELETE")]))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
