//! Client for the command server: runs commands on the machine hosting it.
//!
//! Endpoints:
//! - `GET  /health` → `{"status":"online"}`
//! - `POST /api/execute` `{command, cwd}` → `{success, output}`
//! - `POST /api/execute/stream` `{command, cwd}` → SSE `output` / `done` / `error`

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use shared::events::ExecEvent;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::executor::{EventSink, ExecutionChannel, RunOutcome};
use crate::sse::SseParser;

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwd: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

pub struct RemoteExecutor {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteExecutor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn request<'a>(command: &'a str, cwd: Option<&Path>) -> ExecuteRequest<'a> {
        ExecuteRequest {
            command,
            cwd: cwd.map(|p| p.to_string_lossy().to_string()),
        }
    }

    /// A request timeout means the command outran its budget, not a dead server.
    fn transport_error(&self, e: reqwest::Error, context: &str) -> anyhow::Error {
        if e.is_timeout() {
            anyhow!("Command timed out after {} seconds", self.timeout.as_secs())
        } else {
            anyhow!("{}: {}", context, e)
        }
    }
}

#[async_trait]
impl ExecutionChannel for RemoteExecutor {
    /// True when the server answers `/health` with `online`.
    async fn health(&self) -> Result<bool> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Command server unreachable")?;
        if !resp.status().is_success() {
            return Ok(false);
        }
        let body: HealthResponse = resp.json().await.context("Malformed health response")?;
        Ok(body.status == "online")
    }

    async fn run(&self, command: &str, cwd: Option<&Path>) -> Result<RunOutcome> {
        // The server reports failures (400 included) as {success:false, output}
        let resp = self
            .http
            .post(format!("{}/api/execute", self.base_url))
            .json(&Self::request(command, cwd))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, "Command server unreachable"))?;
        resp.json::<RunOutcome>()
            .await
            .context("Malformed response from command server")
    }

    async fn stream(&self, command: &str, cwd: Option<&Path>, sink: &EventSink) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/api/execute/stream", self.base_url))
            .header("Accept", "text/event-stream")
            .json(&Self::request(command, cwd))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, "Command server unreachable"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(400).collect();
            bail!("Command server returned {}: {}", status, detail.trim());
        }

        let mut parser = SseParser::new();
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let bytes = chunk.map_err(|e| self.transport_error(e, "Connection to command server lost"))?;
            for raw in parser.feed(&bytes) {
                let Some(event) = ExecEvent::from_sse(&raw.event, &raw.data) else {
                    debug!(event = %raw.event, "ignoring unknown stream event");
                    continue;
                };
                let terminal = event.is_terminal();
                let _ = sink.send(event);
                if terminal {
                    return Ok(());
                }
            }
        }

        warn!(command, "command server closed the stream early");
        bail!("Connection closed before the command finished")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tokio::sync::mpsc::unbounded_channel;

    /// One-shot HTTP server answering every request with `body`.
    fn serve(body: &'static str, content_type: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                        .unwrap();
                let _ = request.respond(tiny_http::Response::from_string(body).with_header(header));
            }
        });
        format!("http://127.0.0.1:{}", port)
    }

    async fn collect(exec: &RemoteExecutor) -> (Result<()>, Vec<ExecEvent>) {
        let (tx, mut rx) = unbounded_channel();
        let result = exec.stream("echo hello", None, &tx).await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        (result, events)
    }

    #[tokio::test]
    async fn test_stream_until_done() {
        let url = serve(
            "event: output\ndata: {\"text\":\"hel\"}\n\nevent: output\ndata: {\"text\":\"lo\\n\"}\n\nevent: done\ndata: {\"exitCode\":0}\n\n",
            "text/event-stream",
        );
        let (result, events) = collect(&RemoteExecutor::new(url, Duration::from_secs(10))).await;
        assert!(result.is_ok());
        assert_eq!(
            events,
            vec![
                ExecEvent::output("hel"),
                ExecEvent::output("lo\n"),
                ExecEvent::Done { exit_code: 0 }
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_without_terminal_is_err() {
        let url = serve("event: output\ndata: {\"text\":\"partial\"}\n\n", "text/event-stream");
        let (result, events) = collect(&RemoteExecutor::new(url, Duration::from_secs(10))).await;
        assert!(result.is_err());
        assert_eq!(events, vec![ExecEvent::output("partial")]);
    }

    #[tokio::test]
    async fn test_run_to_completion() {
        let url = serve(
            r#"{"success":false,"output":"nope\nExit Code: 1"}"#,
            "application/json",
        );
        let outcome = RemoteExecutor::new(url, Duration::from_secs(10))
            .run("false", None)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.ends_with("Exit Code: 1"));
    }

    #[tokio::test]
    async fn test_health() {
        let url = serve(r#"{"status":"online"}"#, "application/json");
        assert!(RemoteExecutor::new(url, Duration::from_secs(10)).health().await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let exec = RemoteExecutor::new("http://127.0.0.1:9", Duration::from_secs(2));
        let (tx, _rx) = unbounded_channel();
        assert!(exec.stream("ls", None, &tx).await.is_err());
    }

    #[tokio::test]
    async fn test_stream_timeout_reports_timed_out() {
        use std::io::{Read, Write};

        // Sends one chunk, then stalls past the client's timeout
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            if let Ok((mut conn, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = conn.read(&mut buf);
                let _ = conn.write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\nevent: output\ndata: {\"text\":\"working\"}\n\n",
                );
                let _ = conn.flush();
                thread::sleep(Duration::from_secs(5));
            }
        });

        let exec = RemoteExecutor::new(format!("http://127.0.0.1:{}", port), Duration::from_secs(1));
        let (result, events) = collect(&exec).await;
        assert_eq!(events, vec![ExecEvent::output("working")]);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Command timed out after 1 seconds"
        );
    }
}
