//! Configuration validation.

use std::collections::HashSet;

use url::{Host, Url};

use crate::error::ConfigError;
use crate::schema::Config;

const SUPPORTED_SCHEMES: &[&str] = &["ws", "wss", "ws+unix", "wss+unix"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_driver(config, &mut result);
        Self::validate_timing(config, &mut result);
        Self::validate_logging(config, &mut result);
        result
    }

    fn validate_driver(config: &Config, result: &mut ValidationResult) {
        let url = config.driver.url.trim();
        if url.is_empty() {
            result.add_error(ValidationError::new("driver.url", "URL cannot be empty"));
            return;
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                result.add_error(ValidationError::new(
                    "driver.url",
                    format!("'{}' is not a valid URL: {}", url, e),
                ));
                return;
            }
        };
        let scheme = parsed.scheme();
        if !SUPPORTED_SCHEMES.contains(&scheme) {
            result.add_error(ValidationError::new(
                "driver.url",
                format!("Unsupported scheme '{}'", scheme),
            ));
            return;
        }

        match parsed.host().filter(|host| !host.to_string().is_empty()) {
            None => result.add_error(ValidationError::new("driver.url", "URL has no host")),
            Some(host) => {
                if !scheme.ends_with("+unix")
                    && config.driver.token().is_none()
                    && !is_loopback(&host)
                {
                    result.add_warning(ValidationWarning::new(
                        "driver.access_token",
                        format!("No access token set for non-local host '{}'", host),
                    ));
                }
            }
        }

        let mut seen = HashSet::new();
        for id in &config.driver.self_ids {
            if !seen.insert(id) {
                result.add_warning(ValidationWarning::new(
                    "driver.self_ids",
                    format!("Identity {} listed more than once", id),
                ));
            }
        }
    }

    fn validate_timing(config: &Config, result: &mut ValidationResult) {
        let timing = &config.driver.timing;
        let fields = [
            ("driver.timing.dial_backoff_ms", timing.dial_backoff_ms),
            ("driver.timing.handshake_window_ms", timing.handshake_window_ms),
            ("driver.timing.api_timeout_ms", timing.api_timeout_ms),
        ];
        for (path, value) in fields {
            if value == 0 {
                result.add_error(ValidationError::new(path, "Must be greater than 0"));
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.trim();
        // Directive lists like "info,botwire_driver=debug" are left to the filter parser.
        if !level.contains(['=', ',']) && !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!("Unknown log level '{}'", level),
            ));
        }
        if config.logging.file_prefix.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.file_prefix",
                "File prefix cannot be empty",
            ));
        }
    }
}

fn is_loopback(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(addr) => addr.is_loopback(),
        Host::Ipv6(addr) => addr.is_loopback(),
    }
}
