//! HTTP status for each error code
//!
//! The engine has no HTTP surface of its own; request layers use this to
//! render [`AppError`](super::AppError) consistently.

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        use ErrorCode::*;
        match self {
            Success => StatusCode::OK,

            OrderNotFound | OrderItemNotFound | CustomerNotFound | ProductNotFound
            | ComboNotFound | StockItemNotFound | TableNotFound => StatusCode::NOT_FOUND,

            // 状态冲突：客户端应刷新订单后再试
            OrderAlreadyPaid | OrderAlreadyClosed | OrderAlreadyCancelled | InvalidTransition
            | OrderItemsFrozen | DocumentAlreadyIssued | ConcurrencyConflict => {
                StatusCode::CONFLICT
            }

            InsufficientCredit => StatusCode::PAYMENT_REQUIRED,
            ProductOutOfStock | ProductUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
            DocumentGenerationFailed => StatusCode::BAD_GATEWAY,
            SystemBusy => StatusCode::SERVICE_UNAVAILABLE,

            InternalError | DatabaseError | StorageFull | StorageCorrupted => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            ValidationFailed | RequiredField | ValueOutOfRange | OrderEmpty
            | CreditAmountMismatch | ProductInvalidPrice | ComboInvalid => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_failures() {
        assert_eq!(
            ErrorCode::InsufficientCredit.http_status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ErrorCode::ProductOutOfStock.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::ConcurrencyConflict.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_request_and_upstream() {
        assert_eq!(
            ErrorCode::CreditAmountMismatch.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::CustomerNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::DocumentGenerationFailed.http_status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
