//! Client for the actuation endpoint (the robot body).
//!
//! Every request goes through a [`CircuitBreaker`] shared by all calls, is
//! individually timeout-bounded, and reports its outcome back to the breaker.
//! Failures come back as [`BodyError`] values so the dispatcher can degrade.

use crate::breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker};
use crate::directive::Directive;
use crate::mood::Light;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timeout for status and directive calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for `/look`, which captures and analyzes a photo.
pub const LOOK_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("circuit open")]
    CircuitOpen,
    #[error("request to {path} timed out")]
    Timeout { path: String },
    #[error("transport error on {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("could not decode response from {path}: {message}")]
    Decode { path: String, message: String },
}

/// Power reserve as reported by `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerReading {
    pub battery_volts: f64,
    pub charging: bool,
}

impl PowerReading {
    /// Reads `sensors.battery_v` (or a top-level `battery_v` when there is no
    /// `sensors` object). Numeric strings are accepted.
    pub fn from_status(status: &Value) -> Option<Self> {
        let sensors = status.get("sensors").unwrap_or(status);
        let battery_volts = match sensors.get("battery_v")? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        let charging = sensors
            .get("charging")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Some(Self {
            battery_volts,
            charging,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetectedFace {
    #[serde(default)]
    pub name: Option<String>,
}

/// Perception result of `GET /look`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct LookSnapshot {
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
}

/// The calls the dispatcher and the power monitor make against the body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BodyApi: Send + Sync {
    async fn status(&self) -> Result<Value, BodyError>;
    async fn look(&self) -> Result<LookSnapshot, BodyError>;
    async fn speak(&self, text: String) -> Result<Value, BodyError>;
    async fn command(&self, action: String) -> Result<Value, BodyError>;
    async fn rgb(&self, light: Light) -> Result<Value, BodyError>;
    async fn combo(&self, directive: Directive) -> Result<Value, BodyError>;
}

/// HTTP implementation of [`BodyApi`] with breaker and failover.
pub struct BodyClient {
    http: reqwest::Client,
    breaker: Mutex<CircuitBreaker>,
}

impl BodyClient {
    pub fn new(config: BreakerConfig, primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            breaker: Mutex::new(CircuitBreaker::new(config, primary, fallback)),
        }
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker().snapshot()
    }

    /// Checks reachability at startup. If the active endpoint does not answer,
    /// switches to the other one and tries once more.
    pub async fn probe(&self) -> Option<PowerReading> {
        match self.status().await {
            Ok(status) => {
                let reading = PowerReading::from_status(&status);
                info!(endpoint = %self.breaker_snapshot().active_endpoint, battery = ?reading, "Actuation endpoint reachable");
                return reading;
            }
            Err(e) => warn!(error = %e, "Actuation endpoint unreachable, trying alternate"),
        }

        self.breaker().failover();
        match self.status().await {
            Ok(status) => {
                let reading = PowerReading::from_status(&status);
                info!(endpoint = %self.breaker_snapshot().active_endpoint, battery = ?reading, "Actuation endpoint reachable");
                reading
            }
            Err(e) => {
                warn!(error = %e, "Alternate endpoint unreachable, will retry on first event");
                None
            }
        }
    }

    /// `GET {active}{path}`, bounded by `timeout`.
    pub async fn get(&self, path: &str, timeout: Duration) -> Result<Value, BodyError> {
        let base = self.acquire()?;
        let request = self.http.get(format!("{base}{path}")).timeout(timeout);
        self.finish(path, request).await
    }

    /// `POST {active}{path}` with a JSON body, bounded by `timeout`.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        timeout: Duration,
    ) -> Result<Value, BodyError> {
        let base = self.acquire()?;
        let request = self
            .http
            .post(format!("{base}{path}"))
            .json(payload)
            .timeout(timeout);
        self.finish(path, request).await
    }

    fn acquire(&self) -> Result<String, BodyError> {
        let mut breaker = self.breaker();
        breaker
            .try_acquire(Instant::now())
            .map_err(|_| BodyError::CircuitOpen)?;
        Ok(breaker.active_endpoint().to_string())
    }

    async fn finish(&self, path: &str, request: reqwest::RequestBuilder) -> Result<Value, BodyError> {
        let result = send(path, request).await;
        match &result {
            Ok(_) => self.breaker().record_success(),
            Err(e) => {
                debug!(%path, error = %e, "Actuation call failed");
                self.breaker().record_failure(Instant::now());
            }
        }
        result
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn send(path: &str, request: reqwest::RequestBuilder) -> Result<Value, BodyError> {
    let response = request.send().await.map_err(|e| transport(path, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(BodyError::Status {
            path: path.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await.map_err(|e| transport(path, e))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| BodyError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn transport(path: &str, e: reqwest::Error) -> BodyError {
    if e.is_timeout() {
        BodyError::Timeout {
            path: path.to_string(),
        }
    } else {
        BodyError::Transport {
            path: path.to_string(),
            source: e,
        }
    }
}

#[async_trait]
impl BodyApi for BodyClient {
    async fn status(&self) -> Result<Value, BodyError> {
        self.get("/status", DEFAULT_TIMEOUT).await
    }

    async fn look(&self) -> Result<LookSnapshot, BodyError> {
        let value = self.get("/look", LOOK_TIMEOUT).await?;
        serde_json::from_value(value).map_err(|e| BodyError::Decode {
            path: "/look".to_string(),
            message: e.to_string(),
        })
    }

    async fn speak(&self, text: String) -> Result<Value, BodyError> {
        self.post("/speak", &json!({ "text": text }), DEFAULT_TIMEOUT)
            .await
    }

    async fn command(&self, action: String) -> Result<Value, BodyError> {
        self.post("/command", &json!({ "action": action }), DEFAULT_TIMEOUT)
            .await
    }

    async fn rgb(&self, light: Light) -> Result<Value, BodyError> {
        self.post("/rgb", &light, DEFAULT_TIMEOUT).await
    }

    async fn combo(&self, directive: Directive) -> Result<Value, BodyError> {
        self.post("/combo", &directive, DEFAULT_TIMEOUT).await
    }
}
