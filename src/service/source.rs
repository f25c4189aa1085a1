//! HTTP uptime source.

use super::FetchFailure;
use crate::config::ClockConfig;
use crate::uptime::UptimeBody;

use async_trait::async_trait;
use std::time::Duration;

/// Anything that can report the monitored service's uptime in seconds.
#[async_trait]
pub trait UptimeSource: Send + Sync {
    async fn fetch_uptime(&self) -> Result<f64, FetchFailure>;
}

/// Fetches uptime with a GET against a fixed URL.
pub struct HttpUptimeSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpUptimeSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchFailure::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
        })
    }

    pub fn from_config(cfg: &ClockConfig) -> Result<Self, FetchFailure> {
        Self::new(&cfg.uptime_url, cfg.request_timeout)
    }

    fn map_reqwest(&self, e: reqwest::Error) -> FetchFailure {
        if e.is_timeout() {
            FetchFailure::Timeout(self.timeout)
        } else {
            FetchFailure::Network(e.to_string())
        }
    }
}

#[async_trait]
impl UptimeSource for HttpUptimeSource {
    async fn fetch_uptime(&self) -> Result<f64, FetchFailure> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.map_reqwest(e))?;
        parse_uptime_body(&body)
    }
}

/// Extract the uptime sample from a response body.
///
/// Undecodable JSON is a `Body` failure. Valid JSON without a usable
/// non-negative, finite number is a `Format` failure.
pub fn parse_uptime_body(body: &[u8]) -> Result<f64, FetchFailure> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| FetchFailure::Body(e.to_string()))?;

    let seconds = serde_json::from_value::<UptimeBody>(value)
        .ok()
        .and_then(|b| b.seconds())
        .ok_or(FetchFailure::Format)?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(FetchFailure::Format);
    }

    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source(base: &str, path: &str) -> HttpUptimeSource {
        HttpUptimeSource::new(&format!("{}{}", base, path), Duration::from_secs(2)).unwrap()
    }

    fn test_router() -> Router {
        Router::new()
            .route("/bare", get(|| async { Json(json!(90061)) }))
            .route("/wrapped", get(|| async { Json(json!({ "uptime": 3661.5 })) }))
            .route("/missing", get(|| async { Json(json!({ "status": "ok" })) }))
            .route("/negative", get(|| async { Json(json!(-5)) }))
            .route("/garbage", get(|| async { "definitely not json" }))
            .route(
                "/down",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response() }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Json(json!(1))
                }),
            )
    }

    #[test]
    fn test_parse_uptime_body() {
        assert_eq!(parse_uptime_body(b"42"), Ok(42.0));
        assert_eq!(parse_uptime_body(br#"{"uptime": 7}"#), Ok(7.0));
        assert_eq!(parse_uptime_body(b"null"), Err(FetchFailure::Format));
        assert_eq!(parse_uptime_body(br#"{"uptime": null}"#), Err(FetchFailure::Format));
        assert_eq!(parse_uptime_body(b"-1"), Err(FetchFailure::Format));
        assert!(matches!(parse_uptime_body(b"{"), Err(FetchFailure::Body(_))));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(FetchFailure::Status(503).to_string(), "HTTP error! Status: 503");
        assert_eq!(FetchFailure::Format.to_string(), "Unknown API response format");
    }

    #[tokio::test]
    async fn test_http_source_reads_both_shapes() {
        let base = serve(test_router()).await;
        assert_eq!(source(&base, "/bare").fetch_uptime().await, Ok(90061.0));
        assert_eq!(source(&base, "/wrapped").fetch_uptime().await, Ok(3661.5));
    }

    #[tokio::test]
    async fn test_http_source_failures() {
        let base = serve(test_router()).await;

        assert_eq!(
            source(&base, "/down").fetch_uptime().await,
            Err(FetchFailure::Status(503))
        );
        assert_eq!(
            source(&base, "/missing").fetch_uptime().await,
            Err(FetchFailure::Format)
        );
        assert_eq!(
            source(&base, "/negative").fetch_uptime().await,
            Err(FetchFailure::Format)
        );
        assert!(matches!(
            source(&base, "/garbage").fetch_uptime().await,
            Err(FetchFailure::Body(_))
        ));
        assert_eq!(
            source(&base, "/nowhere").fetch_uptime().await,
            Err(FetchFailure::Status(404))
        );
    }

    #[tokio::test]
    async fn test_http_source_times_out() {
        let base = serve(test_router()).await;
        let slow = HttpUptimeSource::new(&format!("{}/slow", base), Duration::from_millis(100)).unwrap();
        assert_eq!(
            slow.fetch_uptime().await,
            Err(FetchFailure::Timeout(Duration::from_millis(100)))
        );
    }

    #[tokio::test]
    async fn test_http_source_invalid_url() {
        let source = HttpUptimeSource::new("http://256.256.256.256", Duration::from_millis(100)).unwrap();
        assert!(source.fetch_uptime().await.is_err());
    }
}
