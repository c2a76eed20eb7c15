use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::decode::{decode_evaluation, decode_health, decode_transcript, HealthStatus};
use crate::audio::AudioPayload;
use crate::error::ApiError;
use crate::evaluation::{EvaluationRequest, EvaluationResponse};

/// HTTP client for the transcription/evaluation backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Every request made through this client is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    /// Health probe. Transport failures map to `Disconnected` instead of an error.
    pub async fn health(&self) -> HealthStatus {
        let result = async {
            let resp = self
                .http
                .get(self.endpoint("health"))
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            self.read_json(resp).await
        }
        .await;

        match result {
            Ok(body) => decode_health(&body),
            Err(e) => {
                log::warn!("API connection check failed: {e}");
                HealthStatus::Disconnected
            }
        }
    }

    /// Upload audio as the single multipart field `audio`.
    pub async fn transcribe(&self, payload: &AudioPayload) -> Result<String, ApiError> {
        let part = Part::bytes(payload.bytes.clone())
            .file_name(payload.filename.clone())
            .mime_str(&payload.mime_type)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let form = Form::new().part("audio", part);

        log::info!(
            "Transcribing {} ({} bytes)",
            payload.filename,
            payload.bytes.len()
        );
        let resp = self
            .http
            .post(self.endpoint("transcribe"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body = self.read_json(resp).await?;
        Ok(decode_transcript(&body))
    }

    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse, ApiError> {
        let mut form = Form::new()
            .text("question", request.question.clone())
            .text("rubrics", request.rubrics.clone())
            .text("response", request.response.clone());
        if let Some(level) = request.level.as_ref().filter(|l| !l.is_empty()) {
            form = form.text("level", level.clone());
        }

        log::info!("Requesting evaluation (level: {:?})", request.level);
        let resp = self
            .http
            .post(self.endpoint("evaluate"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body = self.read_json(resp).await?;
        Ok(decode_evaluation(&body))
    }

    /// Read the body as text first. Non-success statuses fail with the raw body
    /// (or the status line when empty); an empty success body is `{}`.
    async fn read_json(&self, resp: reqwest::Response) -> Result<Value, ApiError> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let detail = if text.is_empty() {
                format!(
                    "{} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )
                .trim_end()
                .to_string()
            } else {
                text
            };
            return Err(ApiError::Backend(detail));
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&text).map_err(|_| ApiError::MalformedResponse { body: text })
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response and hand back the raw request bytes.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            if request_complete(&data) {
                break;
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    fn request_complete(data: &[u8]) -> bool {
        let text = String::from_utf8_lossy(data);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let headers = text[..header_end].to_ascii_lowercase();
        let body_len = data.len() - (header_end + 4);
        if let Some(line) = headers.lines().find(|l| l.starts_with("content-length:")) {
            let expected: usize = line["content-length:".len()..].trim().parse().unwrap_or(0);
            return body_len >= expected;
        }
        if headers.contains("transfer-encoding: chunked") {
            return text.ends_with("0\r\n\r\n");
        }
        true
    }

    #[tokio::test]
    async fn test_stalled_body_reports_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            // Promise a body, send half of it, then go quiet.
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 64\r\n\r\n{\"text\":")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(3)).await;
        });

        let api = ApiClient::new(&format!("http://{addr}"), Duration::from_millis(500)).unwrap();
        let payload = AudioPayload::recorded(vec![0; 4]);
        let err = api.transcribe(&payload).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout { .. }), "{err:?}");
        server.abort();
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(5)).unwrap()
    }

    fn request(level: Option<&str>) -> EvaluationRequest {
        EvaluationRequest {
            question: "Tell me about your weekend".into(),
            rubrics: "Fluency (Competent Level)\nMostly smooth with some pauses\n\n".into(),
            response: "I went hiking".into(),
            level: level.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced_verbatim() {
        let (base, server) = serve_once("404 Not Found", "rubric service unavailable").await;
        let err = client(&base).evaluate(&request(None)).await.unwrap_err();
        assert_eq!(err, ApiError::Backend("rubric service unavailable".into()));
        assert_eq!(err.to_string(), "rubric service unavailable");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_error_body_uses_status_line() {
        let (base, server) = serve_once("503 Service Unavailable", "").await;
        let err = client(&base).evaluate(&request(None)).await.unwrap_err();
        assert_eq!(err.to_string(), "503 Service Unavailable");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let (base, server) = serve_once("200 OK", "<html>oops</html>").await;
        let err = client(&base).evaluate(&request(None)).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::MalformedResponse {
                body: "<html>oops</html>".into()
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_level_field_omitted_when_unknown() {
        let (base, server) = serve_once("200 OK", r#"{"overall_score": 75}"#).await;
        let result = client(&base).evaluate(&request(None)).await.unwrap();
        assert_eq!(result.overall_score, 75.0);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/evaluate "));
        assert!(raw.contains("name=\"question\""));
        assert!(raw.contains("name=\"rubrics\""));
        assert!(raw.contains("name=\"response\""));
        assert!(!raw.contains("name=\"level\""));
    }

    #[tokio::test]
    async fn test_level_field_sent_when_known() {
        let (base, server) = serve_once("200 OK", r#"{"overallScore": 81}"#).await;
        client(&base).evaluate(&request(Some("Competent"))).await.unwrap();

        let raw = server.await.unwrap();
        assert!(raw.contains("name=\"level\"\r\n\r\nCompetent"));
    }

    #[tokio::test]
    async fn test_transcribe_uploads_audio_field() {
        let (base, server) = serve_once("200 OK", r#"{"text": "hello there"}"#).await;
        let payload = AudioPayload::recorded(vec![1, 2, 3, 4]);
        let text = client(&format!("{base}/")).transcribe(&payload).await.unwrap();
        assert_eq!(text, "hello there");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/transcribe "));
        assert!(raw.contains("name=\"audio\"; filename=\"recording.wav\""));
        assert!(raw.contains("audio/wav"));
    }

    #[tokio::test]
    async fn test_transcribe_missing_text_is_empty() {
        let (base, server) = serve_once("200 OK", "").await;
        let payload = AudioPayload::uploaded("clip.ogg", None, vec![0; 8]);
        assert_eq!(client(&base).transcribe(&payload).await.unwrap(), "");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_health_connected() {
        let (base, server) =
            serve_once("200 OK", r#"{"status": "healthy", "api_configured": true}"#).await;
        assert_eq!(client(&base).health().await, HealthStatus::Connected);
        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /api/health "));
    }

    #[tokio::test]
    async fn test_health_disconnected_on_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert_eq!(
            client(&format!("http://{addr}")).health().await,
            HealthStatus::Disconnected
        );
    }
}
