//! Document issuing boundary
//!
//! The fiscal document generator is an external collaborator. This module
//! only decides *when* a document may be generated and stores the link:
//!
//! ```text
//! issue_document(order_id)
//!     ├─ 1. prepare: order paid or credit? already issued → return link
//!     ├─ 2. allocate sequence number (own committed txn, per receipt type)
//!     ├─ 3. generator.generate() under timeout, bounded retry (no txn open)
//!     └─ 4. record link in a fresh txn (first writer wins, refused if the
//!           order's billed fields moved during step 3)
//! ```
//!
//! A failed generation leaves the payment untouched. A refused link
//! surfaces as a retryable conflict; issuing again uses the new totals.

pub mod local;

pub use local::LocalTicketGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::order::{CustomerSnapshot, InvoiceLink, OrderSnapshot, ReceiptType};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::ledger::seq;
use crate::orders::manager::{DocumentPlan, OrderService};
use crate::orders::{OrderError, OrderResult};

/// Upstream generator failures
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    #[error("generator timed out after {0:?}")]
    Timeout(Duration),

    #[error("generator rejected the document: {0}")]
    Rejected(String),

    #[error("generator unavailable: {0}")]
    Unavailable(String),
}

impl DocumentError {
    /// Rejections are final; timeouts and outages may succeed later
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DocumentError::Rejected(_))
    }
}

/// Input handed to the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub order: OrderSnapshot,
    pub customer: Option<CustomerSnapshot>,
    pub receipt_type: ReceiptType,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub correlation_id: String,
    pub payload: serde_json::Value,
}

/// Ticket / invoice generator (DTE certification lives behind this)
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn generate(&self, request: &DocumentRequest) -> Result<GeneratedDocument, DocumentError>;
}

#[derive(Debug, Clone)]
pub struct DocumentSettings {
    /// Per attempt
    pub timeout: Duration,
    /// Total attempts
    pub max_retries: u32,
    /// Linear backoff step between attempts
    pub retry_backoff: Duration,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

fn sequence_name(receipt_type: ReceiptType) -> &'static str {
    match receipt_type {
        ReceiptType::Ticket => seq::DOC_TICKET,
        ReceiptType::Invoice => seq::DOC_INVOICE,
    }
}

/// Run a synchronous order call on the blocking pool
async fn blocking<T, F>(f: F) -> OrderResult<T>
where
    F: FnOnce() -> OrderResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OrderError::Concurrency(format!("blocking task failed: {}", e)))?
}

#[derive(Clone)]
pub struct DocumentService {
    orders: OrderService,
    generator: Arc<dyn DocumentGenerator>,
    settings: DocumentSettings,
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("generator", &"<DocumentGenerator>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl DocumentService {
    pub fn new(
        orders: OrderService,
        generator: Arc<dyn DocumentGenerator>,
        settings: DocumentSettings,
    ) -> Self {
        Self {
            orders,
            generator,
            settings,
        }
    }

    /// Issue (or return the already issued) document of a settled order
    pub async fn issue_document(&self, order_id: u64) -> OrderResult<InvoiceLink> {
        let orders = self.orders.clone();
        let snapshot = match blocking(move || orders.prepare_document(order_id)).await? {
            DocumentPlan::Existing(link) => {
                tracing::debug!(order_id, document_id = %link.document_id, "Document already issued");
                return Ok(link);
            }
            DocumentPlan::Issue(snapshot) => snapshot,
        };

        let prepared = snapshot.order.clone();
        let receipt_type = prepared.receipt_type;
        let store = self.orders.store().clone();
        let sequence_number = blocking(move || {
            Ok(store.next_id_committed(sequence_name(receipt_type))?)
        })
        .await?;

        let request = DocumentRequest {
            customer: snapshot.order.customer.clone(),
            order: snapshot,
            receipt_type,
            sequence_number,
        };
        let generated = match self.generate_with_retry(&request).await {
            Ok(generated) => generated,
            Err(e) => {
                tracing::error!(order_id, sequence_number, error = %e, "Document generation failed");
                return Err(e.into());
            }
        };

        let link = InvoiceLink {
            document_id: generated.correlation_id,
            sequence_number,
            receipt_type,
            payload: generated.payload,
            generated_at: shared::util::now_millis(),
        };
        let orders = self.orders.clone();
        let (stored, _created) =
            blocking(move || orders.record_document(order_id, &prepared, link)).await?;
        Ok(stored)
    }

    /// Generator call under timeout, linear backoff between attempts
    async fn generate_with_retry(
        &self,
        request: &DocumentRequest,
    ) -> Result<GeneratedDocument, DocumentError> {
        let attempts = self.settings.max_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(
                self.settings.timeout,
                self.generator.generate(request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(DocumentError::Timeout(self.settings.timeout)),
            };

            match result {
                Ok(generated) => return Ok(generated),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.settings.retry_backoff * attempt;
                    tracing::warn!(
                        order_id = request.order.id(),
                        attempt,
                        max_retries = attempts,
                        ?delay,
                        "Document generation attempt failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
