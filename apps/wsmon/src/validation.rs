use url::Url;

/// Shortest allowed check interval, in seconds
pub const MIN_CHECK_INTERVAL_SECS: u64 = 5;
/// Longest allowed check interval, in seconds
pub const MAX_CHECK_INTERVAL_SECS: u64 = 300;
/// Longest allowed request timeout, in seconds
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn to_result(&self) -> Result<(), String> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.error.clone().unwrap_or_else(|| "Validation failed".to_string()))
        }
    }
}

/// Validate HTTP/HTTPS URL endpoint
pub fn validate_http_endpoint(target: &str) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("URL cannot be empty");
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err(format!(
                    "Invalid scheme '{scheme}'. Must be http or https"
                ));
            }

            if url.host_str().is_none() {
                return ValidationResult::err("URL must have a valid host");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            // If it fails to parse, check if it's missing a scheme
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

/// Validate a site's check interval
pub fn validate_check_interval(interval: u64) -> ValidationResult {
    if !(MIN_CHECK_INTERVAL_SECS..=MAX_CHECK_INTERVAL_SECS).contains(&interval) {
        return ValidationResult::err(format!(
            "check_interval set to {interval} but should be between \
             {MIN_CHECK_INTERVAL_SECS} and {MAX_CHECK_INTERVAL_SECS} seconds"
        ));
    }

    ValidationResult::ok()
}

/// Validate the per-request timeout
pub fn validate_timeout(timeout: u64) -> ValidationResult {
    if timeout == 0 {
        return ValidationResult::err("Timeout must be at least 1 second");
    }

    if timeout > MAX_REQUEST_TIMEOUT_SECS {
        return ValidationResult::err(format!(
            "Timeout too long (max {MAX_REQUEST_TIMEOUT_SECS} seconds)"
        ));
    }

    ValidationResult::ok()
}

/// Validate a table name for use in generated SQL.
///
/// Only plain identifiers are accepted since the name is interpolated into
/// statements rather than bound as a parameter.
pub fn validate_table_name(name: &str) -> ValidationResult {
    let mut chars = name.chars();

    match chars.next() {
        None => return ValidationResult::err("Table name cannot be empty"),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            return ValidationResult::err("Table name must start with a letter or underscore");
        }
        Some(_) => {}
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return ValidationResult::err(
            "Table name may only contain ASCII letters, digits and underscores",
        );
    }

    if name.len() > 63 {
        return ValidationResult::err("Table name too long (max 63 characters)");
    }

    ValidationResult::ok()
}
