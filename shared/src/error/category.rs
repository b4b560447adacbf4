//! Error code ranges

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Domain an error code belongs to, by its thousands digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 0xxx
    General,
    /// 4xxx
    Order,
    /// 5xxx, credit included
    Payment,
    /// 6xxx: products, combos, stock
    Catalog,
    /// 7xxx
    Table,
    /// 9xxx and anything unknown
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            4 => Self::Order,
            5 => Self::Payment,
            6 => Self::Catalog,
            7 => Self::Table,
            _ => Self::System,
        }
    }

    /// Errors caused by the request rather than by the engine
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, Self::System)
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(ErrorCode::RequiredField.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::InvalidTransition.category(), ErrorCategory::Order);
        assert_eq!(
            ErrorCode::InsufficientCredit.category(),
            ErrorCategory::Payment
        );
        assert_eq!(
            ErrorCode::StockItemNotFound.category(),
            ErrorCategory::Catalog
        );
        assert_eq!(ErrorCode::TableNotFound.category(), ErrorCategory::Table);
        assert_eq!(ErrorCategory::from_code(12_000), ErrorCategory::System);
    }

    #[test]
    fn test_client_fault() {
        assert!(ErrorCode::OrderEmpty.category().is_client_fault());
        assert!(!ErrorCode::ConcurrencyConflict.category().is_client_fault());
    }
}
