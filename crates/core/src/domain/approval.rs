use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ticket::{TicketId, TicketStatus};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Refund,
    AccountChange,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refund => "refund",
            Self::AccountChange => "account_change",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Denied,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }

    /// Ticket status applied to a linked ticket when the resolution does not
    /// declare one explicitly.
    pub fn default_ticket_status(self) -> TicketStatus {
        match self {
            Self::Approved => TicketStatus::Resolved,
            Self::Denied => TicketStatus::Denied,
        }
    }
}

/// Agent-supplied approval request shape, before the store stamps it with a
/// timestamp and a customer name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDraft {
    pub order_id: OrderId,
    pub request_type: RequestType,
    pub reason: String,
    pub desired_outcome: String,
    pub summary: String,
    #[serde(default)]
    pub ticket_id: Option<TicketId>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub order_id: OrderId,
    pub request_type: RequestType,
    pub reason: String,
    pub desired_outcome: String,
    pub summary: String,
    pub ticket_id: Option<TicketId>,
    pub customer_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome applied when a pending request leaves the pending set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalResolution {
    pub decision: Decision,
    pub customer_response: String,
    pub resolution_notes: String,
    pub operator_notes: String,
    pub action_taken: String,
    pub ticket_status: Option<TicketStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedApproval {
    pub request: ApprovalRequest,
    pub decision: Decision,
    pub customer_response: String,
    pub resolution_notes: String,
    pub operator_notes: String,
    pub action_taken: String,
    pub resolved_at: DateTime<Utc>,
}
