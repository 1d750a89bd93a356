//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees syntactically.
//! Returns all validation errors, not just the first, so a broken config
//! can be fixed in one pass.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid listener bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("invalid upstream endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("upstream name must not be empty")]
    EmptyUpstreamName,

    #[error("retries.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("retries.base_delay_ms ({base}) must not exceed retries.max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },

    #[error("retries.backoff_multiplier ({0}) must be at least 1.0")]
    MultiplierTooSmall(f64),

    #[error("health_check.{0} must be at least 1")]
    ZeroHealthSetting(&'static str),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.upstream.name.trim().is_empty() {
        errors.push(ValidationError::EmptyUpstreamName);
    }

    match Url::parse(&config.upstream.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::InvalidEndpoint {
            url: config.upstream.endpoint.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidEndpoint {
            url: config.upstream.endpoint.clone(),
            reason: e.to_string(),
        }),
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }
    if config.retries.backoff_multiplier < 1.0 {
        errors.push(ValidationError::MultiplierTooSmall(
            config.retries.backoff_multiplier,
        ));
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::ZeroHealthSetting("interval_secs"));
        }
        if config.health_check.unhealthy_threshold == 0 {
            errors.push(ValidationError::ZeroHealthSetting("unhealthy_threshold"));
        }
        if config.health_check.healthy_threshold == 0 {
            errors.push(ValidationError::ZeroHealthSetting("healthy_threshold"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.retries.max_attempts = 0;
        config.upstream.endpoint = "ftp://example.com/events".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_inverted_delay_bounds() {
        let mut config = GatewayConfig::default();
        config.retries.base_delay_ms = 5000;
        config.retries.max_delay_ms = 1000;

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::DelayOrder { .. }));
    }

    #[test]
    fn rejects_sub_unit_multiplier() {
        let mut config = GatewayConfig::default();
        config.retries.backoff_multiplier = 0.5;

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::MultiplierTooSmall(_)));
    }
}
