//! Shared blocking HTTP client for the remote sources.
//!
//! Wraps a reqwest client with a bounded timeout and a per-provider circuit
//! breaker. Status handling: 403 trips the breaker, 429 and 5xx count as
//! breaker failures, any other non-2xx is reported as-is. There are no
//! retries here; the next timer tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{BreakerConfig, HttpConfig};
use crate::error::FetchError;

/// Seconds to wait when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

pub struct HttpClient {
    client: reqwest::blocking::Client,
    breaker: Arc<CircuitBreaker>,
    timeout_secs: u64,
}

impl HttpClient {
    pub fn new(http: &HttpConfig, breaker: Arc<CircuitBreaker>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            breaker,
            timeout_secs: http.timeout_secs,
        })
    }

    /// Client with a fresh breaker built from config.
    pub fn with_breaker_config(http: &HttpConfig, breaker: &BreakerConfig) -> Result<Self, FetchError> {
        Self::new(
            http,
            Arc::new(CircuitBreaker::new(
                Duration::from_secs(breaker.cooldown_secs),
                breaker.failure_threshold,
            )),
        )
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// GET `url` with query parameters and return the response body.
    pub fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        if !self.breaker.is_allowed() {
            return Err(FetchError::CircuitOpen {
                remaining_secs: self.breaker.remaining_cooldown().as_secs(),
            });
        }

        debug!(url, ?query, "GET");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| FetchError::from_transport(&e, url, self.timeout_secs))?;

        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        settle_status(
            &self.breaker,
            resp.status().as_u16(),
            retry_after.as_deref(),
            url,
        )?;

        let body = resp
            .text()
            .map_err(|e| FetchError::from_transport(&e, url, self.timeout_secs))?;
        Ok(body)
    }

    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let body = self.get_text(url, query)?;
        decode_json(&body, url)
    }
}

/// What the client does with a response status.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusAction {
    Success,
    /// The provider refuses us outright: open the breaker.
    Trip,
    /// Counts toward the breaker threshold.
    Failure(FetchError),
    /// Reported as-is; the breaker is left alone.
    Reject(FetchError),
}

/// Classify an HTTP status. `retry_after` is the raw `Retry-After` header.
pub fn classify_status(status: u16, retry_after: Option<&str>, url: &str) -> StatusAction {
    match status {
        200..=299 => StatusAction::Success,
        403 => StatusAction::Trip,
        429 => StatusAction::Failure(FetchError::RateLimited {
            retry_after_secs: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        }),
        500..=599 => StatusAction::Failure(FetchError::HttpStatus {
            status,
            url: url.to_string(),
        }),
        _ => StatusAction::Reject(FetchError::HttpStatus {
            status,
            url: url.to_string(),
        }),
    }
}

/// Apply a response status to the breaker and turn it into a result.
pub fn settle_status(
    breaker: &CircuitBreaker,
    status: u16,
    retry_after: Option<&str>,
    url: &str,
) -> Result<(), FetchError> {
    match classify_status(status, retry_after, url) {
        StatusAction::Success => {
            breaker.record_success();
            Ok(())
        }
        StatusAction::Trip => {
            warn!(url, status, "provider refused the request, opening circuit breaker");
            breaker.trip();
            Err(FetchError::CircuitOpen {
                remaining_secs: breaker.remaining_cooldown().as_secs(),
            })
        }
        StatusAction::Failure(err) => {
            warn!(url, status, error = %err, "provider failure");
            breaker.record_failure();
            Err(err)
        }
        StatusAction::Reject(err) => Err(err),
    }
}

/// Decode a JSON body into a typed payload; any mismatch is a schema error.
pub fn decode_json<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Schema(format!("{what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        prices: Vec<(f64, f64)>,
    }

    #[test]
    fn missing_key_is_schema_error() {
        let err = decode_json::<Payload>(r#"{"price": []}"#, "market_chart").unwrap_err();
        match err {
            FetchError::Schema(msg) => assert!(msg.contains("prices")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_is_schema_error() {
        assert!(matches!(
            decode_json::<Payload>("<html>busy</html>", "market_chart"),
            Err(FetchError::Schema(_))
        ));
    }

    #[test]
    fn open_breaker_refuses_without_network() {
        let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(60), 1));
        breaker.trip();
        let client = HttpClient::new(&HttpConfig::default(), breaker).unwrap();
        // Unroutable URL: the request must be refused before it is sent.
        let err = client.get_text("http://192.0.2.1/never", &[]).unwrap_err();
        assert!(matches!(err, FetchError::CircuitOpen { .. }));
    }

    #[test]
    fn forbidden_trips_breaker() {
        let breaker = CircuitBreaker::new(Duration::from_secs(60), 3);
        let err = settle_status(&breaker, 403, None, "u").unwrap_err();
        assert!(matches!(err, FetchError::CircuitOpen { remaining_secs } if remaining_secs > 0));
        assert!(!breaker.is_allowed());
    }

    #[test]
    fn rate_limit_reads_retry_after() {
        assert_eq!(
            classify_status(429, Some(" 120 "), "u"),
            StatusAction::Failure(FetchError::RateLimited {
                retry_after_secs: 120
            })
        );
        // HTTP-date form is not parsed; fall back to the default wait.
        assert_eq!(
            classify_status(429, Some("Wed, 21 Oct 2015 07:28:00 GMT"), "u"),
            StatusAction::Failure(FetchError::RateLimited {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS
            })
        );
        assert_eq!(
            classify_status(429, None, "u"),
            StatusAction::Failure(FetchError::RateLimited {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS
            })
        );
    }

    #[test]
    fn repeated_rate_limits_open_breaker() {
        let breaker = CircuitBreaker::new(Duration::from_secs(60), 2);
        assert!(matches!(
            settle_status(&breaker, 429, None, "u"),
            Err(FetchError::RateLimited { .. })
        ));
        assert!(breaker.is_allowed());
        assert!(settle_status(&breaker, 429, None, "u").is_err());
        assert!(!breaker.is_allowed());
    }

    #[test]
    fn server_errors_count_client_errors_do_not() {
        let breaker = CircuitBreaker::new(Duration::from_secs(60), 2);
        for _ in 0..3 {
            let err = settle_status(&breaker, 404, None, "http://x/coins/nope").unwrap_err();
            assert_eq!(
                err,
                FetchError::HttpStatus {
                    status: 404,
                    url: "http://x/coins/nope".into()
                }
            );
        }
        assert!(breaker.is_allowed());

        assert!(matches!(
            settle_status(&breaker, 502, None, "u"),
            Err(FetchError::HttpStatus { status: 502, .. })
        ));
        assert!(settle_status(&breaker, 503, None, "u").is_err());
        assert!(!breaker.is_allowed());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(Duration::from_secs(60), 2);
        assert!(settle_status(&breaker, 500, None, "u").is_err());
        assert!(settle_status(&breaker, 200, None, "u").is_ok());
        assert!(settle_status(&breaker, 500, None, "u").is_err());
        assert!(breaker.is_allowed());
    }
}
