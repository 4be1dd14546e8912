//! Operator configuration, read from the environment.

use crate::error::{OperatorError, OperatorResult};
use std::time::Duration;

/// Default console image repository.
pub const DEFAULT_IMAGE_NAME: &str = "quay.io/hawtio/online";

/// Default console image tag.
pub const DEFAULT_IMAGE_VERSION: &str = "latest";

/// Default field manager for server side writes.
pub const DEFAULT_FIELD_MANAGER: &str = "hawtio-operator";

const DEFAULT_CAPABILITY_TTL_SECS: u64 = 30;
const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 60;

/// Operator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Console image repository.
    pub image_name: String,
    /// Console image tag.
    pub image_version: String,
    /// How long a capability snapshot stays valid.
    pub capability_ttl: Duration,
    /// Deadline of a single reconciliation.
    pub reconcile_timeout: Duration,
    /// Field manager recorded on writes.
    pub field_manager: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            image_name: DEFAULT_IMAGE_NAME.to_string(),
            image_version: DEFAULT_IMAGE_VERSION.to_string(),
            capability_ttl: Duration::from_secs(DEFAULT_CAPABILITY_TTL_SECS),
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }
}

impl OperatorConfig {
    /// Load from the process environment.
    pub fn from_env() -> OperatorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset or empty keys take their default.
    pub fn from_lookup<F>(lookup: F) -> OperatorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            image_name: get("HAWTIO_ONLINE_IMAGE_NAME").unwrap_or(defaults.image_name),
            image_version: get("HAWTIO_ONLINE_IMAGE_VERSION").unwrap_or(defaults.image_version),
            capability_ttl: match get("HAWTIO_CAPABILITY_TTL_SECS") {
                Some(raw) => Duration::from_secs(parse_secs("HAWTIO_CAPABILITY_TTL_SECS", &raw)?),
                None => defaults.capability_ttl,
            },
            reconcile_timeout: match get("HAWTIO_RECONCILE_TIMEOUT_SECS") {
                Some(raw) => {
                    let secs = parse_secs("HAWTIO_RECONCILE_TIMEOUT_SECS", &raw)?;
                    if secs == 0 {
                        return Err(OperatorError::InvalidConfig(
                            "HAWTIO_RECONCILE_TIMEOUT_SECS must be greater than 0".into(),
                        ));
                    }
                    Duration::from_secs(secs)
                }
                None => defaults.reconcile_timeout,
            },
            field_manager: get("HAWTIO_FIELD_MANAGER").unwrap_or(defaults.field_manager),
        })
    }

    /// Full console image reference.
    pub fn image(&self) -> String {
        format!("{}:{}", self.image_name, self.image_version)
    }
}

fn parse_secs(key: &str, raw: &str) -> OperatorResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| OperatorError::InvalidConfig(format!("{key} must be a number of seconds, got {raw:?}")))
}
