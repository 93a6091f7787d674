use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use stampede_core::{
    BenchConfig, BenchError, Operation, OperationResult, ProtocolAdapter,
};
use stampede_pool::{ConnectionFactory, ConnectionPool};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A pooled TCP stream plus a poison flag: any I/O error or timeout marks
/// the stream broken so the pool discards it on release instead of handing
/// a desynchronized connection to the next worker.
pub struct TcpConn {
    stream: TcpStream,
    broken: bool,
}

pub struct TcpConnFactory {
    addr: String,
    connect_timeout: Duration,
}

#[async_trait]
impl ConnectionFactory for TcpConnFactory {
    type Conn = TcpConn;

    async fn create(&self) -> Result<TcpConn, BenchError> {
        let connect = TcpStream::connect(&self.addr);
        match tokio::time::timeout(self.connect_timeout, connect).await {
            Err(_) => Err(BenchError::ConnectFailed(format!(
                "connect to {} timed out",
                self.addr
            ))),
            Ok(Err(e)) => Err(BenchError::ConnectFailed(format!("{}: {e}", self.addr))),
            Ok(Ok(stream)) => {
                stream.set_nodelay(true).ok();
                Ok(TcpConn {
                    stream,
                    broken: false,
                })
            }
        }
    }

    async fn validate(&self, conn: &mut TcpConn) -> bool {
        !conn.broken && conn.stream.peer_addr().is_ok()
    }

    async fn close(&self, conn: TcpConn) {
        // Dropping the stream closes the socket.
        drop(conn);
    }
}

struct TcpState {
    pool: ConnectionPool<TcpConnFactory>,
    op_timeout: Duration,
}

/// Write-then-read adapter for echo-style TCP targets.
pub struct TcpAdapter {
    state: tokio::sync::OnceCell<TcpState>,
}

impl Default for TcpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpAdapter {
    pub fn new() -> Self {
        Self {
            state: tokio::sync::OnceCell::new(),
        }
    }

    async fn echo_io(stream: &mut TcpStream, payload: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        stream.write_all(payload).await?;
        let mut buf = vec![0u8; payload.len()];
        stream.read_exact(&mut buf).await?;
        Ok(buf)
    }
}

#[async_trait]
impl ProtocolAdapter for TcpAdapter {
    async fn connect(&self, config: &BenchConfig) -> Result<(), BenchError> {
        self.state
            .get_or_try_init(|| async {
                let addr = config
                    .connection
                    .addresses
                    .first()
                    .ok_or_else(|| {
                        BenchError::ConfigInvalid("tcp requires a target address".to_string())
                    })?
                    .clone();
                let factory = TcpConnFactory {
                    addr,
                    connect_timeout: config.connection.pool.connection_timeout,
                };
                let pool = ConnectionPool::new(factory, config.connection.pool.clone());
                pool.warm().await?;
                debug!(idle = pool.stats().idle, "tcp pool warmed");
                Ok::<_, BenchError>(TcpState {
                    pool,
                    op_timeout: config.connection.timeout,
                })
            })
            .await?;
        Ok(())
    }

    async fn execute(&self, cancel: &CancellationToken, op: &Operation) -> OperationResult {
        let Some(state) = self.state.get() else {
            return OperationResult::failure(BenchError::ConnectFailed(
                "execute before connect".to_string(),
            ));
        };

        // Both test cases are write-then-read round trips; ping counts as
        // the read-side probe, echo as a write.
        let is_read = match op.kind.as_str() {
            "ping" => true,
            "echo" => false,
            other => {
                return OperationResult::failure(BenchError::OperationProtocol(format!(
                    "unsupported tcp operation: {other}"
                )));
            }
        };

        let mut conn = match state.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => return OperationResult::failure(e).read(is_read),
        };

        let payload: &[u8] = op.value.as_deref().unwrap_or(b"ping");
        let outcome: Result<Vec<u8>, BenchError> = tokio::select! {
            _ = cancel.cancelled() => Err(BenchError::Cancelled),
            io = tokio::time::timeout(state.op_timeout, Self::echo_io(&mut conn.stream, payload)) => {
                match io {
                    Err(_) => Err(BenchError::OperationTimeout),
                    Ok(Err(e)) => Err(e.into()),
                    Ok(Ok(buf)) => Ok(buf),
                }
            }
        };

        let result = match outcome {
            Ok(echoed) => {
                if echoed.as_slice() == payload {
                    OperationResult::ok().with_value(Bytes::from(echoed))
                } else {
                    conn.broken = true;
                    OperationResult::failure(BenchError::OperationProtocol(
                        "echo mismatch".to_string(),
                    ))
                }
            }
            Err(e) => {
                conn.broken = true;
                OperationResult::failure(e)
            }
        };
        state.pool.release(conn).await;
        result.read(is_read)
    }

    async fn health_check(&self) -> Result<(), BenchError> {
        let Some(state) = self.state.get() else {
            return Err(BenchError::ConnectFailed("not connected".to_string()));
        };
        let conn = state.pool.acquire().await?;
        state.pool.release(conn).await;
        Ok(())
    }

    async fn close(&self) -> Result<(), BenchError> {
        if let Some(state) = self.state.get() {
            state.pool.close().await;
        }
        Ok(())
    }

    fn protocol_name(&self) -> &'static str {
        "tcp"
    }

    fn protocol_metrics(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut m = serde_json::Map::new();
        if let Some(state) = self.state.get() {
            let stats = state.pool.stats();
            m.insert("pool_live".to_string(), stats.live.into());
            m.insert("pool_idle".to_string(), stats.idle.into());
            m.insert("pool_created".to_string(), stats.total_created.into());
            m.insert(
                "pool_acquire_timeouts".to_string(),
                stats.acquire_timeouts.into(),
            );
        }
        m
    }
}
