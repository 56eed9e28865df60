//! Config module contains the top-level config for the app.
use std::env;

use config_crate::{Config as RawConfig, ConfigError, Environment, File};

use models::EmailType;
use sentry_integration::SentryConfig;

/// Basic settings - HTTP binding address and database DSN
#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: String,
    pub database: String,
    pub thread_count: usize,
    /// Absolute prefix for pagination links
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Coupons {
    /// Landing page customers open to redeem a code
    pub redeem_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Notifications {
    pub url: String,
    pub timeout_s: u64,
}

/// Payment gateway account, amounts are in minor units of `currency`
#[derive(Debug, Deserialize, Clone)]
pub struct Payments {
    pub url: String,
    pub key_id: String,
    pub key_secret: String,
    pub currency: String,
    pub timeout_s: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Embargo {
    pub url: String,
    pub timeout_s: u64,
}

/// Email bodies per email type
#[derive(Debug, Deserialize, Clone)]
pub struct Templates {
    pub assign: String,
    pub remind: String,
    pub revoke: String,
}

impl Templates {
    pub fn body_for(&self, email_type: EmailType) -> &str {
        match email_type {
            EmailType::Assign => self.assign.as_str(),
            EmailType::Remind => self.remind.as_str(),
            EmailType::Revoke => self.revoke.as_str(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Logging {
    pub level: String,
}

/// Service configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: Server,
    pub coupons: Coupons,
    pub notifications: Notifications,
    pub payments: Payments,
    pub embargo: Embargo,
    pub templates: Templates,
    pub logging: Logging,
    pub sentry: Option<SentryConfig>,
}

impl Config {
    /// Creates config from base.toml, which are overwritten by <env>.toml, where env is one of dev,
    /// k8s, nightly. After that it could be overwritten by env variables like OFFERS__SERVER__PORT
    pub fn new() -> Result<Self, ConfigError> {
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::with_env(env)
    }

    pub fn with_env(env: impl Into<String>) -> Result<Self, ConfigError> {
        let mut s = RawConfig::new();

        s.merge(File::with_name("config/base"))?;
        // Optional file specific for environment
        s.merge(File::with_name(&format!("config/{}", env.into())).required(false))?;
        // Add in settings from the environment (with a prefix of OFFERS)
        s.merge(Environment::with_prefix("OFFERS").separator("__"))?;

        s.try_into()
    }
}
