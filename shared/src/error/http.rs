//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::ReservationNotFound
            | Self::CatalogItemNotFound => StatusCode::NOT_FOUND,

            // 401 Unauthorized
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied => StatusCode::FORBIDDEN,

            // 409 Conflict (caller may retry or pick another product/branch)
            Self::PersistenceConflict | Self::StockInsufficient | Self::ReservationClosed => {
                StatusCode::CONFLICT
            }

            // 503 Service Unavailable (transient)
            Self::SystemBusy => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::Unknown
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::StorageFull
            | Self::StorageCorrupted => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (validation / workflow / payment errors)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::RequiredField
            | Self::InvalidTransition
            | Self::OrderTerminal
            | Self::InvalidOperation
            | Self::Overpayment
            | Self::InvalidAmount => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_statuses() {
        assert_eq!(ErrorCode::PermissionDenied.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::InvalidTransition.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Overpayment.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::PersistenceConflict.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::StockInsufficient.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
