use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use stampede_core::{
    BenchConfig, BenchError, Operation, OperationResult, ProtocolAdapter,
};
use tokio_util::sync::CancellationToken;

struct HttpState {
    client: reqwest::Client,
    base_url: String,
}

/// GET/POST driver over a shared reqwest client (which brings its own
/// connection pool, so this adapter does not own a `stampede-pool`).
pub struct HttpAdapter {
    state: tokio::sync::OnceCell<HttpState>,
    responses_2xx: AtomicU64,
    responses_4xx: AtomicU64,
    responses_5xx: AtomicU64,
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self {
            state: tokio::sync::OnceCell::new(),
            responses_2xx: AtomicU64::new(0),
            responses_4xx: AtomicU64::new(0),
            responses_5xx: AtomicU64::new(0),
        }
    }

    fn classify(&self, status: reqwest::StatusCode) {
        if status.is_success() {
            self.responses_2xx.fetch_add(1, Ordering::Relaxed);
        } else if status.is_client_error() {
            self.responses_4xx.fetch_add(1, Ordering::Relaxed);
        } else if status.is_server_error() {
            self.responses_5xx.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn request_error(e: reqwest::Error) -> BenchError {
        if e.is_timeout() {
            BenchError::OperationTimeout
        } else if e.is_connect() {
            BenchError::OperationNetwork(e.to_string())
        } else {
            BenchError::OperationProtocol(e.to_string())
        }
    }
}

fn build_http_client(request_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("stampede-loadgen")
        .timeout(request_timeout)
        .build()
}

#[async_trait]
impl ProtocolAdapter for HttpAdapter {
    async fn connect(&self, config: &BenchConfig) -> Result<(), BenchError> {
        let state = self
            .state
            .get_or_try_init(|| async {
                let base_url = config
                    .connection
                    .addresses
                    .first()
                    .ok_or_else(|| {
                        BenchError::ConfigInvalid("http requires a base url".to_string())
                    })?
                    .clone();
                let client = build_http_client(config.connection.timeout)
                    .map_err(|e| BenchError::Internal(format!("building http client: {e}")))?;
                Ok::<_, BenchError>(HttpState { client, base_url })
            })
            .await?;

        // Reachability probe; any HTTP response at all counts as reachable.
        state
            .client
            .get(&state.base_url)
            .send()
            .await
            .map_err(|e| BenchError::ConnectFailed(e.to_string()))?;
        Ok(())
    }

    async fn execute(&self, cancel: &CancellationToken, op: &Operation) -> OperationResult {
        let Some(state) = self.state.get() else {
            return OperationResult::failure(BenchError::ConnectFailed(
                "execute before connect".to_string(),
            ));
        };

        let (request, is_read) = match op.kind.as_str() {
            "get" => (state.client.get(&state.base_url), true),
            "post" => {
                let body = op.value.clone().unwrap_or_default();
                (state.client.post(&state.base_url).body(body), false)
            }
            other => {
                return OperationResult::failure(BenchError::OperationProtocol(format!(
                    "unsupported http operation: {other}"
                )));
            }
        };

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return OperationResult::failure(BenchError::Cancelled).read(is_read);
            }
            sent = request.send() => sent,
        };

        match response {
            Ok(response) => {
                let status = response.status();
                self.classify(status);
                if status.is_success() {
                    OperationResult::ok().read(is_read)
                } else {
                    OperationResult::failure(BenchError::OperationProtocol(format!(
                        "http status {status}"
                    )))
                    .read(is_read)
                }
            }
            Err(e) => OperationResult::failure(Self::request_error(e)).read(is_read),
        }
    }

    async fn health_check(&self) -> Result<(), BenchError> {
        let Some(state) = self.state.get() else {
            return Err(BenchError::ConnectFailed("not connected".to_string()));
        };
        state
            .client
            .get(&state.base_url)
            .send()
            .await
            .map_err(|e| BenchError::OperationNetwork(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BenchError> {
        // reqwest clients tear down with their last clone.
        Ok(())
    }

    fn protocol_name(&self) -> &'static str {
        "http"
    }

    fn protocol_metrics(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut m = serde_json::Map::new();
        m.insert(
            "responses_2xx".to_string(),
            self.responses_2xx.load(Ordering::Relaxed).into(),
        );
        m.insert(
            "responses_4xx".to_string(),
            self.responses_4xx.load(Ordering::Relaxed).into(),
        );
        m.insert(
            "responses_5xx".to_string(),
            self.responses_5xx.load(Ordering::Relaxed).into(),
        );
        m
    }
}
