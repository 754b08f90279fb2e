//! Unified error codes for the repair-shop workflow engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order / workflow errors
//! - 5xxx: Payment errors
//! - 6xxx: Inventory and catalog errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// Actor identity missing from the request
    NotAuthenticated = 1001,

    // ==================== 2xxx: Permission ====================
    /// Role may not perform the action in the current state
    PermissionDenied = 2001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Requested edge does not exist or its guard is not met
    InvalidTransition = 4002,
    /// Order is in a terminal state
    OrderTerminal = 4003,
    /// Concurrent write detected via version check
    PersistenceConflict = 4004,
    /// Invalid operation on the order
    InvalidOperation = 4005,

    // ==================== 5xxx: Payment ====================
    /// Payment exceeds outstanding balance
    Overpayment = 5001,
    /// Invalid amount
    InvalidAmount = 5002,

    // ==================== 6xxx: Inventory ====================
    /// Reservation exceeds available stock
    StockInsufficient = 6001,
    /// Reservation not found
    ReservationNotFound = 6002,
    /// Reservation already consumed or released
    ReservationClosed = 6003,
    /// SKU not present in the catalog
    CatalogItemNotFound = 6004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Storage is full
    StorageFull = 9401,
    /// Storage is corrupted
    StorageCorrupted = 9402,
    /// System busy, retry later
    SystemBusy = 9403,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::NotAuthenticated => "Actor identity is required",
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidTransition => "Invalid state transition",
            ErrorCode::OrderTerminal => "Order is closed",
            ErrorCode::PersistenceConflict => "Order was modified concurrently, retry",
            ErrorCode::InvalidOperation => "Invalid operation",
            ErrorCode::Overpayment => "Payment exceeds outstanding balance",
            ErrorCode::InvalidAmount => "Invalid amount",
            ErrorCode::StockInsufficient => "Insufficient stock",
            ErrorCode::ReservationNotFound => "Reservation not found",
            ErrorCode::ReservationClosed => "Reservation already closed",
            ErrorCode::CatalogItemNotFound => "Catalog item not found",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::StorageFull => "Storage is full",
            ErrorCode::StorageCorrupted => "Storage is corrupted",
            ErrorCode::SystemBusy => "System busy, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a u16 doesn't map to any [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),

            // Auth / Permission
            1001 => Ok(ErrorCode::NotAuthenticated),
            2001 => Ok(ErrorCode::PermissionDenied),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::InvalidTransition),
            4003 => Ok(ErrorCode::OrderTerminal),
            4004 => Ok(ErrorCode::PersistenceConflict),
            4005 => Ok(ErrorCode::InvalidOperation),

            // Payment
            5001 => Ok(ErrorCode::Overpayment),
            5002 => Ok(ErrorCode::InvalidAmount),

            // Inventory
            6001 => Ok(ErrorCode::StockInsufficient),
            6002 => Ok(ErrorCode::ReservationNotFound),
            6003 => Ok(ErrorCode::ReservationClosed),
            6004 => Ok(ErrorCode::CatalogItemNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),
            9401 => Ok(ErrorCode::StorageFull),
            9402 => Ok(ErrorCode::StorageCorrupted),
            9403 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
