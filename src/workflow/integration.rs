use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::IntegrationConfig;
use crate::errors::{AutomationError, AutomationResult};

/// External runner for `MCP_EXECUTE` pieces.
#[async_trait]
pub trait IntegrationRunner: Send + Sync {
    async fn execute(&self, piece_name: &str, action: &str, params: &Value) -> AutomationResult<Value>;
}

/// Runner used when no piece endpoint is configured.
pub struct UnavailableIntegration;

#[async_trait]
impl IntegrationRunner for UnavailableIntegration {
    async fn execute(&self, piece_name: &str, action: &str, _params: &Value) -> AutomationResult<Value> {
        tracing::debug!(piece = piece_name, action, "no integration endpoint configured");
        Err(AutomationError::IntegrationUnavailable)
    }
}

#[derive(Debug, Deserialize)]
struct PieceResponse {
    success: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Calls a piece server over HTTP: `POST <endpoint>/execute-piece` with
/// `{pieceName, action, params}`, answered by `{success, result | error}`.
pub struct HttpPieceRunner {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpPieceRunner {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AutomationResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl IntegrationRunner for HttpPieceRunner {
    async fn execute(&self, piece_name: &str, action: &str, params: &Value) -> AutomationResult<Value> {
        let url = format!("{}/execute-piece", self.endpoint);
        let body = serde_json::json!({
            "pieceName": piece_name,
            "action": action,
            "params": params,
        });

        tracing::debug!(url = %url, piece = piece_name, action, "executing piece");

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) if e.is_connect() => {
                tracing::warn!(url = %url, error = %e, "piece server unreachable");
                return Err(AutomationError::IntegrationUnavailable);
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        let text = response.text().await?;
        let parsed: PieceResponse = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(_) if !status.is_success() => {
                return Err(AutomationError::Integration(format!("{}: {}", status, text)));
            }
            Err(e) => return Err(e.into()),
        };

        if parsed.success {
            Ok(parsed.result)
        } else {
            Err(AutomationError::Integration(
                parsed.error.unwrap_or_else(|| format!("piece {piece_name} failed")),
            ))
        }
    }
}

/// Picks the runner for `config`: HTTP when an endpoint is set, otherwise
/// the always-unavailable runner.
pub fn from_config(config: &IntegrationConfig) -> AutomationResult<Arc<dyn IntegrationRunner>> {
    match &config.endpoint {
        Some(endpoint) if !endpoint.trim().is_empty() => {
            tracing::info!(endpoint = %endpoint, "piece integration enabled");
            let runner = HttpPieceRunner::new(endpoint.as_str(), Duration::from_secs(config.timeout_secs))?;
            Ok(Arc::new(runner))
        }
        _ => Ok(Arc::new(UnavailableIntegration)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves one HTTP exchange and hands back the request body.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let request_body = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= split + 4 + length {
                        break text[split + 4..].to_string();
                    }
                }
                if n == 0 {
                    break String::new();
                }
            };
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request_body
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn unavailable_runner_always_refuses() {
        let err = UnavailableIntegration
            .execute("slack", "send_message", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::IntegrationUnavailable));
        assert_eq!(err.to_string(), "Node.js integration not available");
    }

    #[tokio::test]
    async fn posts_piece_request_and_returns_result() {
        let (endpoint, server) = serve_once("200 OK", r#"{"success":true,"result":{"ts":"1712"}}"#).await;
        let runner = HttpPieceRunner::new(format!("{endpoint}/"), Duration::from_secs(5)).unwrap();
        let result = runner
            .execute("slack", "send_message", &json!({"channel": "ops"}))
            .await
            .unwrap();
        assert_eq!(result, json!({"ts": "1712"}));

        let sent: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(
            sent,
            json!({"pieceName": "slack", "action": "send_message", "params": {"channel": "ops"}})
        );
    }

    #[tokio::test]
    async fn piece_failure_maps_to_integration_error() {
        let (endpoint, _server) =
            serve_once("500 Internal Server Error", r#"{"success":false,"error":"Piece not found"}"#).await;
        let runner = HttpPieceRunner::new(endpoint, Duration::from_secs(5)).unwrap();
        let err = runner.execute("nope", "run", &json!({})).await.unwrap_err();
        assert!(matches!(err, AutomationError::Integration(m) if m == "Piece not found"));
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let runner = HttpPieceRunner::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let err = runner.execute("slack", "send_message", &json!({})).await.unwrap_err();
        assert!(matches!(err, AutomationError::IntegrationUnavailable));
    }

    #[test]
    fn config_without_endpoint_is_unavailable() {
        assert!(from_config(&IntegrationConfig::default()).is_ok());
    }
}
