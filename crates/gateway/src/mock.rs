use std::sync::Arc;

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::Mutex;

use crate::{GatewayError, SmsGateway, SmsMessage};

/// Always-accepting gateway for tests and offline runs. Every submitted
/// message is recorded so callers can assert on traffic (or its absence).
#[derive(Default)]
pub struct MockGateway {
    submitted: Mutex<Vec<SmsMessage>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn submitted(&self) -> Vec<SmsMessage> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl SmsGateway for MockGateway {
    async fn submit(&self, message: &SmsMessage) -> Result<String, GatewayError> {
        self.submitted.lock().await.push(message.clone());
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        Ok(format!("ID: {suffix}"))
    }
}
