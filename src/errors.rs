use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Ledger content is not readable: {0}")]
    CorruptLedger(String),
    #[error("Extraction incomplete: {0}")]
    ExtractionIncomplete(String),
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    #[error("Delivery failure: {0}")]
    DeliveryFailure(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::StorageUnavailable(_) | AppError::CorruptLedger(_) | AppError::Config(_) => 1,
            AppError::FetchFailed(_) | AppError::ExtractionIncomplete(_) => 2,
            AppError::DeliveryFailure(_) => 3,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::StorageUnavailable(value.to_string())
    }
}

impl From<object_store::Error> for AppError {
    fn from(value: object_store::Error) -> Self {
        AppError::StorageUnavailable(value.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        AppError::CorruptLedger(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_error_class() {
        assert_eq!(AppError::StorageUnavailable("x".into()).exit_code(), 1);
        assert_eq!(AppError::CorruptLedger("x".into()).exit_code(), 1);
        assert_eq!(AppError::ExtractionIncomplete("x".into()).exit_code(), 2);
        assert_eq!(AppError::FetchFailed("x".into()).exit_code(), 2);
        assert_eq!(AppError::DeliveryFailure("x".into()).exit_code(), 3);
    }

    #[test]
    fn test_io_errors_map_to_storage_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(AppError::from(io), AppError::StorageUnavailable(_)));
    }
}
