use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Gateway request timed out after {seconds}s")]
    TimeoutError { seconds: u64 },

    #[error("Gateway rejected the request: {message}")]
    RejectedError {
        message: String,
        gateway_code: Option<String>,
    },

    #[error("Gateway unavailable: {message}")]
    UnavailableError { message: String },
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::ValidationError { .. } => false,
            GatewayError::RejectedError { .. } => false,
            GatewayError::NetworkError { .. } => true,
            GatewayError::TimeoutError { .. } => true,
            GatewayError::UnavailableError { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_flags_are_set() {
        assert!(GatewayError::NetworkError {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(!GatewayError::RejectedError {
            message: "bad amount".to_string(),
            gateway_code: Some("BAD_REQUEST_ERROR".to_string())
        }
        .is_retryable());
    }
}
