//! Solver client.
//!
//! The solver is a plain HTTP service: the model goes out as JSON-encoded query
//! parameters on a GET request and the contour levels and traced contours come
//! back as JSON.  [`run_solve`] drives one round trip through a [`SyncEngine`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SolverConfig;
use crate::engine::{SolveOutcome, SyncEngine, SyncError};
use crate::submission::SolverSubmission;
use crate::{MapSurface, SessionCache, TableSurface};

/// The solver's answer.
///
/// `heads` and `contours` may be inline JSON or JSON-encoded strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverResponse {
    /// Contour levels.
    pub heads: Option<Value>,
    /// Traced contours as GeoJSON line features.
    pub contours: Option<Value>,
    /// Set when the solver could not solve the model.
    pub error: Option<String>,
}

/// Errors reaching the solver.
#[derive(Debug)]
pub enum SolverError {
    /// The submission could not be serialized.
    Encode(serde_json::Error),
    /// The solver answered with a non-success status.
    Http {
        /// Status code.
        status: u16,
        /// Response body, if any.
        details: String,
    },
    /// The request never completed.
    Transport(reqwest::Error),
    /// The solver did not answer in time.
    Timeout,
    /// The answer was not a solver response.
    Decode(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Encode(e) => write!(f, "failed to encode model: {}", e),
            SolverError::Http { status, details } => {
                write!(f, "solver returned HTTP {}: {}", status, details)
            }
            SolverError::Transport(e) => write!(f, "failed to reach solver: {}", e),
            SolverError::Timeout => write!(f, "solver did not respond in time"),
            SolverError::Decode(e) => write!(f, "invalid solver response: {}", e),
        }
    }
}

impl std::error::Error for SolverError {}

impl From<serde_json::Error> for SolverError {
    fn from(e: serde_json::Error) -> Self {
        SolverError::Encode(e)
    }
}

impl From<reqwest::Error> for SolverError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SolverError::Timeout
        } else if e.is_decode() {
            SolverError::Decode(e.to_string())
        } else {
            SolverError::Transport(e)
        }
    }
}

/// Something that can solve a model.
pub trait Solver: Send + Sync {
    /// Sends the submission and waits for the answer.
    fn solve(
        &self,
        submission: &SolverSubmission,
    ) -> impl Future<Output = Result<SolverResponse, SolverError>> + Send;
}

/// HTTP client for a solver service.
#[derive(Debug, Clone)]
pub struct SolverClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl SolverClient {
    /// Creates a client for `<base_url>/<endpoint>`.
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.url(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// The full solver URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends the request and reads the whole body.
    async fn exchange(&self, params: &[(&str, String)]) -> Result<SolverResponse, SolverError> {
        let response = self.client.get(&self.url).query(params).send().await?;
        self.handle_response(response).await
    }

    /// Handles HTTP response, deserializing success or returning error
    async fn handle_response(&self, response: Response) -> Result<SolverResponse, SolverError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let error = response.text().await.unwrap_or_default();
            let details = if error.is_empty() {
                "No error details".to_string()
            } else {
                error
            };
            Err(SolverError::Http {
                status: status.as_u16(),
                details,
            })
        }
    }
}

impl Solver for SolverClient {
    async fn solve(&self, submission: &SolverSubmission) -> Result<SolverResponse, SolverError> {
        let params = submission.query_params()?;
        tokio::time::timeout(self.timeout, self.exchange(&params))
            .await
            .map_err(|_| SolverError::Timeout)?
    }
}

/// Validates, submits and renders one model run.
///
/// The engine lock is only held around [`SyncEngine::begin_solve`] and
/// [`SyncEngine::finish_solve`], never across the request.  Input is blocked for
/// the whole round trip and released however it ends, including when this future
/// is dropped before the solver answers.
pub async fn run_solve<M, T, S, C>(
    engine: &tokio::sync::Mutex<SyncEngine<M, T, S>>,
    solver: &C,
) -> Result<SolveOutcome, SyncError>
where
    M: MapSurface,
    T: TableSurface,
    S: SessionCache,
    C: Solver,
{
    let (submission, ticket) = {
        let mut engine = engine.lock().await;
        let submission = engine.begin_solve()?;
        (submission, engine.solve_ticket())
    };
    let result = solver.solve(&submission).await;
    let mut engine = engine.lock().await;
    if let Some(ticket) = ticket {
        ticket.settle();
    }
    Ok(engine.finish_solve(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_tolerate_missing_fields() {
        let response: SolverResponse = serde_json::from_str("{\"error\": \"no constant\"}").unwrap();
        assert_eq!(response.error.as_deref(), Some("no constant"));
        assert!(response.heads.is_none());
        assert!(response.contours.is_none());
    }

    #[test]
    fn client_joins_base_and_endpoint() {
        let config = SolverConfig {
            base_url: "http://localhost:5000/".to_string(),
            endpoint: "/solve".to_string(),
            timeout_secs: 5,
        };
        assert_eq!(SolverClient::new(&config).url(), "http://localhost:5000/solve");
    }

    #[test]
    fn http_errors_carry_details() {
        let err = SolverError::Http {
            status: 500,
            details: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "solver returned HTTP 500: boom");
    }
}
