use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod clickatell;
pub mod mock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsMessage {
    pub text: String,
    pub recipient: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway refused the credentials. Carries the raw auth response.
    #[error("gateway rejected authentication: {response}")]
    AuthRejected { response: String },

    /// Authentication went through but the gateway refused the message.
    #[error("gateway rejected message: {response}")]
    SendRejected { response: String },

    #[error("transport failure talking to gateway")]
    Transport(#[from] reqwest::Error),

    /// A response arrived but was not the SOAP shape we expect.
    #[error("malformed gateway response: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Transport-class failures are surfaced to the caller as errors;
    /// rejections become a failed dispatch result plus a log line.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol(_))
    }

    /// The raw gateway response for rejections, the error text otherwise.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::AuthRejected { response } | Self::SendRejected { response } => response.clone(),
            other => other.to_string(),
        }
    }
}

/// A single-capability SMS gateway: authenticate and submit one message,
/// returning the gateway-assigned message id.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn submit(&self, message: &SmsMessage) -> Result<String, GatewayError>;
}
