use std::{str::FromStr, sync::Arc, time::Duration};

use dotenv::dotenv;
use eyre::{eyre, Context, Error};
use log::info;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Sync,
    Async,
}

impl FromStr for DeliveryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(DeliveryMode::Sync),
            "async" => Ok(DeliveryMode::Async),
            other => Err(eyre!("Unknown delivery mode: {}", other)),
        }
    }
}

#[derive(Clone)]
pub struct Env(Arc<EnvInner>);

struct EnvInner {
    mongo_url: String,
    jwt_secret: String,
    http_addr: String,
    queue_workers: usize,
    queue_max_attempts: u32,
    queue_visibility: Duration,
    merge_max_retries: u32,
    workload_url: Option<Url>,
    delivery_mode: DeliveryMode,
    http_timeout: Duration,
    breaker_failure_threshold: u32,
    breaker_open: Duration,
}

impl Env {
    pub fn mongo_url(&self) -> &str {
        &self.0.mongo_url
    }

    pub fn jwt_secret(&self) -> &str {
        &self.0.jwt_secret
    }

    pub fn http_addr(&self) -> &str {
        &self.0.http_addr
    }

    pub fn queue_workers(&self) -> usize {
        self.0.queue_workers
    }

    pub fn queue_max_attempts(&self) -> u32 {
        self.0.queue_max_attempts
    }

    pub fn queue_visibility(&self) -> Duration {
        self.0.queue_visibility
    }

    pub fn merge_max_retries(&self) -> u32 {
        self.0.merge_max_retries
    }

    pub fn workload_url(&self) -> Option<&Url> {
        self.0.workload_url.as_ref()
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.0.delivery_mode
    }

    pub fn http_timeout(&self) -> Duration {
        self.0.http_timeout
    }

    pub fn breaker_failure_threshold(&self) -> u32 {
        self.0.breaker_failure_threshold
    }

    pub fn breaker_open(&self) -> Duration {
        self.0.breaker_open
    }

    pub fn load() -> Result<Env, Error> {
        if let Err(err) = dotenv() {
            info!("Failed to load .env file: {}", err);
        }
        Env::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Env, Error> {
        let required = |key: &str| var(key).ok_or_else(|| eyre!("{} is not set", key));
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: u64| -> Result<u64, Error> {
            match var(key) {
                Some(value) => value
                    .trim()
                    .parse()
                    .with_context(|| format!("{} is not a number: {}", key, value)),
                None => Ok(default),
            }
        };

        let workload_url = match var("WORKLOAD_URL") {
            Some(url) => Some(Url::parse(&url).context("WORKLOAD_URL is not a valid url")?),
            None => None,
        };

        Ok(Env(Arc::new(EnvInner {
            mongo_url: required("MONGO_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            http_addr: or_default("HTTP_ADDR", "0.0.0.0:3000"),
            queue_workers: number("QUEUE_WORKERS", 4)? as usize,
            queue_max_attempts: number("QUEUE_MAX_ATTEMPTS", 5)? as u32,
            queue_visibility: Duration::from_secs(number("QUEUE_VISIBILITY_SECS", 30)?),
            merge_max_retries: number("MERGE_MAX_RETRIES", 8)? as u32,
            workload_url,
            delivery_mode: or_default("DELIVERY_MODE", "async").parse()?,
            http_timeout: Duration::from_secs(number("HTTP_TIMEOUT_SECS", 5)?),
            breaker_failure_threshold: number("BREAKER_FAILURE_THRESHOLD", 5)? as u32,
            breaker_open: Duration::from_secs(number("BREAKER_OPEN_SECS", 30)?),
        })))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> Result<Env, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Env::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let env = env(&[("MONGO_URL", "mongodb://localhost"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(env.http_addr(), "0.0.0.0:3000");
        assert_eq!(env.queue_workers(), 4);
        assert_eq!(env.queue_max_attempts(), 5);
        assert_eq!(env.merge_max_retries(), 8);
        assert_eq!(env.delivery_mode(), DeliveryMode::Async);
        assert_eq!(env.breaker_open(), Duration::from_secs(30));
        assert!(env.workload_url().is_none());
    }

    #[test]
    fn test_overrides() {
        let env = env(&[
            ("MONGO_URL", "mongodb://localhost"),
            ("JWT_SECRET", "s"),
            ("QUEUE_WORKERS", "1"),
            ("DELIVERY_MODE", "SYNC"),
            ("WORKLOAD_URL", "http://workload:3000"),
            ("BREAKER_FAILURE_THRESHOLD", "2"),
        ])
        .unwrap();
        assert_eq!(env.queue_workers(), 1);
        assert_eq!(env.delivery_mode(), DeliveryMode::Sync);
        assert_eq!(env.breaker_failure_threshold(), 2);
        assert_eq!(env.workload_url().unwrap().host_str(), Some("workload"));
    }

    #[test]
    fn test_errors() {
        assert!(env(&[("JWT_SECRET", "s")]).is_err());
        assert!(env(&[
            ("MONGO_URL", "mongodb://localhost"),
            ("JWT_SECRET", "s"),
            ("QUEUE_WORKERS", "many"),
        ])
        .is_err());
        assert!(env(&[
            ("MONGO_URL", "mongodb://localhost"),
            ("JWT_SECRET", "s"),
            ("DELIVERY_MODE", "carrier-pigeon"),
        ])
        .is_err());
    }
}
