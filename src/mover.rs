use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Reply body from the remote mover.
#[derive(Debug, Clone, Deserialize)]
pub struct MoverReply {
    /// Position after the opponent's move; empty when the mover sent none.
    #[serde(default)]
    pub updated_fen: String,
    /// Score claimed by the mover ("1-0", "0-1", "1/2-1/2" or "*").
    #[serde(default = "default_result")]
    pub result: String,
}

fn default_result() -> String {
    "*".to_string()
}

/// Failure talking to the remote mover.
#[derive(Debug, Error)]
pub enum MoverError {
    #[error("mover request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mover returned status {0}")]
    Status(StatusCode),
}

/// Computes the opponent's reply for a position.
#[async_trait]
pub trait MoveService: Send + Sync {
    async fn compute_move(&self, fen: &str) -> Result<MoverReply, MoverError>;
}

/// HTTP client for the mover endpoint. The position travels in the `value`
/// query parameter. The call has no timeout of its own; the opponent clock
/// runs while it is outstanding and bounds the wait.
pub struct HttpMoveService {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpMoveService {
    pub fn new(endpoint: String) -> Self {
        HttpMoveService {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MoveService for HttpMoveService {
    async fn compute_move(&self, fen: &str) -> Result<MoverReply, MoverError> {
        debug!("Requesting move for position: {}", fen);
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("value", fen)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MoverError::Status(response.status()));
        }
        let reply = response.json::<MoverReply>().await?;
        debug!("Mover replied with result {}", reply.result);
        Ok(reply)
    }
}

#[cfg(test)]
#[path = "mover_tests.rs"]
mod mover_tests;
