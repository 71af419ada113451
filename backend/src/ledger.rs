//! Record of transfer proofs that have already bought a spin.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::Client as RedisClient;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait ProofLedger: Send + Sync {
    /// Marks `proof` as spent for `ttl`. Returns false when it was already claimed.
    async fn claim(&self, proof: &str, ttl: Duration) -> Result<bool, LedgerError>;
}

fn proof_key(proof: &str) -> String {
    format!("spin_proof:{}", proof.to_lowercase())
}

#[derive(Default)]
pub struct InMemoryLedger {
    claims: Mutex<HashMap<String, Instant>>,
}

#[async_trait]
impl ProofLedger for InMemoryLedger {
    async fn claim(&self, proof: &str, ttl: Duration) -> Result<bool, LedgerError> {
        let now = Instant::now();
        let mut claims = self.claims.lock().await;
        claims.retain(|_, expires_at| *expires_at > now);

        let key = proof_key(proof);
        if claims.contains_key(&key) {
            return Ok(false);
        }
        claims.insert(key, now + ttl);
        Ok(true)
    }
}

pub struct RedisLedger {
    client: RedisClient,
}

impl RedisLedger {
    pub fn open(url: &str) -> Result<Self, LedgerError> {
        Ok(Self {
            client: RedisClient::open(url)?,
        })
    }
}

#[async_trait]
impl ProofLedger for RedisLedger {
    async fn claim(&self, proof: &str, ttl: Duration) -> Result<bool, LedgerError> {
        let mut conn = self.client.get_async_connection().await?;

        // SET NX replies OK when the key was created and nil when it already existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(proof_key(proof))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        tracing::debug!("Proof {} claim reply: {:?}", proof, reply);
        Ok(reply.is_some())
    }
}
