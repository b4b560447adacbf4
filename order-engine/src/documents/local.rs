//! Local ticket generator (non-fiscal)

use async_trait::async_trait;
use serde_json::json;
use shared::order::ReceiptType;

use super::{DocumentError, DocumentGenerator, DocumentRequest, GeneratedDocument};

/// Builds a printable, non-certified ticket payload in-process
#[derive(Debug, Clone, Default)]
pub struct LocalTicketGenerator;

impl LocalTicketGenerator {
    fn number(request: &DocumentRequest) -> String {
        let prefix = match request.receipt_type {
            ReceiptType::Ticket => "T",
            ReceiptType::Invoice => "F",
        };
        format!("{}-{:08}", prefix, request.sequence_number)
    }
}

#[async_trait]
impl DocumentGenerator for LocalTicketGenerator {
    async fn generate(&self, request: &DocumentRequest) -> Result<GeneratedDocument, DocumentError> {
        let order = &request.order.order;
        if request.receipt_type == ReceiptType::Invoice && request.customer.is_none() {
            return Err(DocumentError::Rejected(
                "invoice requires customer data".to_string(),
            ));
        }

        let lines: Vec<_> = request
            .order
            .billing_lines()
            .map(|line| {
                json!({
                    "name": line.name,
                    "quantity": line.quantity,
                    "unit_price": line.unit_price,
                    "tax": line.tax_amount,
                    "total": line.line_total,
                })
            })
            .collect();

        let payload = json!({
            "number": Self::number(request),
            "receipt_type": request.receipt_type.as_str(),
            "fiscal": false,
            "order_id": order.id,
            "operator": order.operator,
            "customer": request.customer,
            "lines": lines,
            "subtotal": order.subtotal,
            "tax": order.tax,
            "tip": order.tip,
            "total": order.total,
        });

        Ok(GeneratedDocument {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{CreateOrder, Order, OrderSnapshot, PaymentMode};

    fn request(receipt_type: ReceiptType) -> DocumentRequest {
        let input = CreateOrder {
            table_id: None,
            operator: "caja".into(),
            payment_mode: PaymentMode::Prepaid,
            customer_name: None,
            note: None,
            items: vec![],
        };
        DocumentRequest {
            order: OrderSnapshot::new(Order::new(5, &input, 0)),
            customer: None,
            receipt_type,
            sequence_number: 42,
        }
    }

    #[tokio::test]
    async fn test_ticket_payload() {
        let doc = LocalTicketGenerator
            .generate(&request(ReceiptType::Ticket))
            .await
            .unwrap();
        assert_eq!(doc.payload["number"], "T-00000042");
        assert_eq!(doc.payload["order_id"], 5);
        assert!(!doc.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn test_invoice_without_customer_rejected() {
        let err = LocalTicketGenerator
            .generate(&request(ReceiptType::Invoice))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
