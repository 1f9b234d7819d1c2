use serde::de::DeserializeOwned;
use serde_json::Value;

use corey_core::domain::approval::{ApprovalDraft, Decision};
use corey_core::domain::message::{Citation, LeadInfo, UpsellOffer};
use corey_core::domain::revenue::RevenueDraft;
use corey_core::domain::ticket::{TicketPatch, TicketStatus};

/// Structured data extracted from a support-agent reply. Every field is
/// optional and extracted independently: one malformed section never drops
/// the rest of the payload. Unknown fields are ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentPayload {
    pub response_text: Option<String>,
    pub citations: Vec<Citation>,
    pub ticket: Option<TicketPatch>,
    pub lead_info: Option<LeadInfo>,
    pub upsell_offer: Option<UpsellOffer>,
    pub approval_request: Option<ApprovalDraft>,
    pub revenue_entry: Option<RevenueDraft>,
}

impl AgentPayload {
    pub fn from_value(value: &Value) -> Self {
        Self {
            response_text: field_text(value, "response_text"),
            citations: field_seq(value, "citations"),
            ticket: field(value, "ticket"),
            lead_info: field(value, "lead_info"),
            upsell_offer: field(value, "upsell_offer"),
            approval_request: field(value, "approval_request"),
            revenue_entry: field(value, "revenue_entry"),
        }
    }
}

/// Structured data extracted from an approval-agent reply. Callers fall back
/// to the operator-supplied decision and notes for any absent field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolutionPayload {
    pub decision: Option<Decision>,
    pub customer_response: Option<String>,
    pub resolution_notes: Option<String>,
    pub new_ticket_status: Option<TicketStatus>,
    pub operator_notes: Option<String>,
    pub action_taken: Option<String>,
}

impl ResolutionPayload {
    pub fn from_value(value: &Value) -> Self {
        let ticket_update = value.get("ticket_update");
        let outcome_log = value.get("outcome_log");

        Self {
            decision: field(value, "decision"),
            customer_response: field_text(value, "customer_response"),
            resolution_notes: ticket_update.and_then(|tu| field_text(tu, "resolution_notes")),
            new_ticket_status: ticket_update.and_then(|tu| field(tu, "new_status")),
            operator_notes: outcome_log.and_then(|log| field_text(log, "operator_notes")),
            action_taken: outcome_log.and_then(|log| field_text(log, "action_taken")),
        }
    }
}

fn field<T>(value: &Value, key: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    value.get(key).cloned().and_then(|raw| serde_json::from_value(raw).ok())
}

fn field_text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn field_seq<T>(value: &Value, key: &str) -> Vec<T>
where
    T: DeserializeOwned,
{
    let Some(Value::Array(items)) = value.get(key) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}
