//! Production log sink: a Redis stream keyed by the deployment's
//! log-stream key.

use std::sync::Mutex;

use anyhow::{Context, Result};
use redis::Commands;
use trainpack_sdk::{LogRecord, LogSink};

/// Forwards log records to a Redis stream via `XADD`.
///
/// The connection sits behind a mutex: stage code writes synchronously
/// and one run never writes from two stages at once, but the sink must
/// still be shareable across the engine's writer pair.
pub struct RedisLogSink {
    conn: Mutex<redis::Connection>,
    stream_key: String,
}

impl RedisLogSink {
    /// Connect to `address` (`host:port`), authenticating when a
    /// non-empty password is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is malformed or the connection
    /// cannot be established.
    pub fn connect(address: &str, password: Option<&str>, stream_key: &str) -> Result<Self> {
        let url = connection_url(address, password)?;
        let client = redis::Client::open(url).context("Invalid Redis connection parameters")?;
        let conn = client
            .get_connection()
            .with_context(|| format!("Failed to connect to Redis at {address}"))?;

        Ok(Self {
            conn: Mutex::new(conn),
            stream_key: stream_key.to_string(),
        })
    }
}

impl LogSink for RedisLogSink {
    fn append(&self, record: &LogRecord) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("redis connection lock poisoned"))?;

        let fields = [
            ("msg", record.text.clone()),
            ("ts", record.timestamp.to_rfc3339()),
            ("stage", record.stage.clone()),
            ("level", record.level.as_str().to_string()),
        ];
        let _id: String = conn
            .xadd(&self.stream_key, "*", &fields)
            .with_context(|| format!("XADD to stream '{}' failed", self.stream_key))?;
        Ok(())
    }
}

/// Build a `redis://` URL from a `host:port` address and an optional
/// password.
fn connection_url(address: &str, password: Option<&str>) -> Result<String> {
    let (host, port) = address
        .rsplit_once(':')
        .with_context(|| format!("Redis address '{address}' must be host:port"))?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("Invalid Redis port in address '{address}'"))?;

    Ok(match password {
        Some(pass) if !pass.is_empty() => format!("redis://:{pass}@{host}:{port}/"),
        _ => format!("redis://{host}:{port}/"),
    })
}
