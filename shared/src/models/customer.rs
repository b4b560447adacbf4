//! Customer Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::CustomerSnapshot;

/// Customer entity (cliente)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u64,
    pub name: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub nrc: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Authorized credit ceiling
    pub credit_limit: Decimal,
    pub active: bool,
}

impl Customer {
    pub fn snapshot(&self) -> CustomerSnapshot {
        CustomerSnapshot {
            customer_id: Some(self.id),
            name: self.name.clone(),
            document_type: self.document_type.clone(),
            document_number: self.document_number.clone(),
            nrc: self.nrc.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
        }
    }
}

/// Create customer payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerCreate {
    pub name: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub nrc: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub credit_limit: Decimal,
}

/// Credit position of one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditSummary {
    pub customer_id: u64,
    pub ceiling: Decimal,
    pub utilized: Decimal,
    pub available: Decimal,
}
