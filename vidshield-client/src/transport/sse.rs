//! Server-Sent Events transport
//!
//! GET `{base}/api/v1/processing/{job_id}/stream?token=...` with
//! `Accept: text/event-stream`; frames are parsed by `eventsource-stream`.

use super::{EventStream, EventTransport, RawEvent};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Url;
use tracing::{debug, info};

/// Build the per-job stream URL; the token travels as a query parameter
pub fn stream_url(base_url: &str, job_id: &str, token: Option<&str>) -> ClientResult<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ClientError::Transport(format!("Invalid API URL '{}': {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Transport(format!("API URL '{}' cannot be a base", base_url)))?
        .pop_if_empty()
        .extend(["api", "v1", "processing", job_id, "stream"]);
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url)
}

/// SSE over a shared reqwest client
#[derive(Clone)]
pub struct SseTransport {
    http: reqwest::Client,
    base_url: String,
}

impl SseTransport {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EventTransport for SseTransport {
    async fn open(&self, job_id: &str, token: Option<&str>) -> ClientResult<EventStream> {
        let url = stream_url(&self.base_url, job_id, token)?;
        // Never log the query string: it carries the credential
        debug!(job_id, path = url.path(), "Opening SSE stream");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Stream request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Transport(format!(
                "Stream rejected with HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        info!(job_id, "SSE stream open");

        let stream = response
            .bytes_stream()
            .eventsource()
            .map(|frame| match frame {
                Ok(event) => Ok(RawEvent {
                    event: event.event,
                    data: event.data,
                }),
                Err(e) => Err(ClientError::Transport(format!("Stream read failed: {}", e))),
            });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url_with_token() {
        let url = stream_url("https://api.example.com", "vid1", Some("s3cr&t")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/v1/processing/vid1/stream?token=s3cr%26t"
        );
    }

    #[test]
    fn test_stream_url_without_token() {
        let url = stream_url("http://localhost:8000/base/", "abc", None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/base/api/v1/processing/abc/stream"
        );
    }

    #[test]
    fn test_stream_url_rejects_garbage() {
        assert!(matches!(
            stream_url("not a url", "abc", None),
            Err(ClientError::Transport(_))
        ));
    }
}
