//! Outbound payment integrations: the gateway api, its callback signatures
//! and the embargo api consulted before checkout.
pub mod embargo;
pub mod gateway;
pub mod signature;

pub use self::embargo::*;
pub use self::gateway::*;
pub use self::signature::*;

use std::sync::Arc;

use failure::Error as FailureError;

use config::Config;

/// Clients shared by every request through the static context
#[derive(Clone)]
pub struct PaymentClients {
    pub gateway: Arc<dyn PaymentGateway>,
    pub embargo: Arc<dyn EmbargoClient>,
}

impl PaymentClients {
    pub fn new(gateway: Arc<dyn PaymentGateway>, embargo: Arc<dyn EmbargoClient>) -> Self {
        Self { gateway, embargo }
    }

    /// Http clients configured from the `payments` and `embargo` sections
    pub fn from_config(config: &Config) -> Result<Self, FailureError> {
        let gateway = HttpPaymentGateway::new(&config.payments)?;
        let embargo = HttpEmbargoClient::new(&config.embargo)?;
        Ok(Self::new(Arc::new(gateway), Arc::new(embargo)))
    }
}
