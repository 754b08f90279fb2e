use super::super::storage::StorageError;
use super::super::traits::OrderError;
use shared::error::{AppError, ErrorCode};
use shared::order::CommandError;
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::Storage(e) => classify_storage_error(e),
            ManagerError::Order(e) => e.code(),
            ManagerError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

/// 将存储错误转换为错误码（前端负责本地化）
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    // 先按枚举变体精确匹配
    match e {
        StorageError::Serialization(_) => return ErrorCode::InternalError,
        StorageError::OrderNotFound(_) => return ErrorCode::OrderNotFound,
        _ => {}
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙（redb 的 Database/Transaction/Table/Storage/Commit 错误）
    ErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let code = err.code();
        if let ManagerError::Storage(e) = &err {
            tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
        }
        CommandError::new(code, err.to_string())
    }
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        let code = err.code();
        match &err {
            ManagerError::Order(OrderError::InvalidTransition { from, to, reason }) => {
                AppError::with_message(code, err.to_string())
                    .with_detail("from", from.to_string())
                    .with_detail("to", to.to_string())
                    .with_detail("reason", reason.clone())
            }
            ManagerError::Order(OrderError::StockInsufficient {
                product_id,
                available,
                ..
            }) => AppError::with_message(code, err.to_string())
                .with_detail("product_id", product_id.clone())
                .with_detail("available", *available),
            ManagerError::Order(OrderError::PersistenceConflict { actual, .. }) => {
                AppError::with_message(code, err.to_string()).with_detail("current_version", *actual)
            }
            _ => AppError::with_message(code, err.to_string()),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::OrderState;

    #[test]
    fn test_order_error_codes_survive_conversion() {
        let err = ManagerError::from(OrderError::transition(
            OrderState::Cancelled,
            OrderState::InDiagnosis,
            "order is closed",
        ));
        let cmd: CommandError = err.into();
        assert_eq!(cmd.code, ErrorCode::OrderTerminal);
    }

    #[test]
    fn test_app_error_status() {
        let err = ManagerError::from(OrderError::StockInsufficient {
            product_id: "PART-X".to_string(),
            branch: "CENTRO".to_string(),
            requested: 1,
            available: 0,
        });
        let app: AppError = err.into();
        assert_eq!(app.http_status(), http::StatusCode::CONFLICT);
        assert!(app.details.is_some());
    }

    #[test]
    fn test_serialization_error_is_internal() {
        let bad = serde_json::from_str::<u32>("x").unwrap_err();
        let err = ManagerError::Storage(StorageError::Serialization(bad));
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
