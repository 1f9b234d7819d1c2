use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::approval::ApprovalDraft;
use crate::domain::revenue::RevenueDraft;
use crate::domain::ticket::TicketPatch;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub excerpt: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadInfo {
    pub name: String,
    pub email: String,
    pub use_case: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellOffer {
    pub product_name: String,
    pub price: String,
    pub description: String,
    pub checkout_url: String,
}

/// One transcript entry. Immutable once appended; the annotation fields keep
/// the agent-reported shapes so the transcript reflects exactly what the
/// agent said, independent of how the store applied it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_info: Option<LeadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upsell_offer: Option<UpsellOffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_request: Option<ApprovalDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_entry: Option<RevenueDraft>,
}

impl ChatMessage {
    pub fn new(
        role: MessageRole,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            timestamp,
            citations: Vec::new(),
            ticket: None,
            lead_info: None,
            upsell_offer: None,
            approval_request: None,
            revenue_entry: None,
        }
    }

    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageRole::User, content, timestamp)
    }

    pub fn agent(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageRole::Agent, content, timestamp)
    }

    pub fn system(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageRole::System, content, timestamp)
    }
}
