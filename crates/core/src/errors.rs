use thiserror::Error;

use crate::domain::approval::OrderId;

/// Failures raised by workflow store transitions. Nothing here is fatal:
/// every variant degrades to a visible message and leaves the store
/// untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no pending approval request for order `{order_id}`")]
    ApprovalNotFound { order_id: OrderId },
    #[error("revenue entry for `{product}` has no numeric amount")]
    InvalidRevenueAmount { product: String },
}
