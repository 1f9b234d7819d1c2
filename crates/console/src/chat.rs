use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use corey_agent::{
    interpret, AgentClient, AgentId, AgentPayload, AgentReply, Interpretation, InvokeContext,
};
use corey_core::domain::approval::OrderId;
use corey_core::domain::message::{ChatMessage, MessageId};
use corey_core::domain::ticket::TicketId;
use corey_core::store::WorkflowStore;

const FALLBACK_ACKNOWLEDGMENT: &str =
    "I received your message. Let me look into that for you.";
const AGENT_APOLOGY: &str =
    "I apologize, but I encountered an issue processing your request. Please try again.";
const CONNECTION_APOLOGY: &str =
    "I apologize, but there was a connection issue. Please try again in a moment.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("a message exchange is already in flight for this session")]
    SessionBusy,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SendOutcome {
    /// Empty or whitespace-only input; nothing was sent or recorded.
    Ignored,
    /// The agent call or the agent itself failed; a single apology message
    /// was appended and no workflow effects were applied.
    Failed { agent_message: MessageId },
    Replied(TurnReport),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnReport {
    pub agent_message: MessageId,
    pub ticket_upserted: Option<TicketId>,
    pub approval_enqueued: Option<OrderId>,
    pub revenue: RevenueOutcome,
    pub lead_captured: Option<String>,
}

impl TurnReport {
    fn new(agent_message: MessageId) -> Self {
        Self {
            agent_message,
            ticket_upserted: None,
            approval_enqueued: None,
            revenue: RevenueOutcome::None,
            lead_captured: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RevenueOutcome {
    #[default]
    None,
    Recorded {
        allocation: Decimal,
    },
    /// The draft had no numeric amount; a system warning was appended
    /// instead of a ledger entry.
    Rejected {
        product: String,
    },
}

/// Runs one exchange with the conversational support agent:
/// append user message, invoke, interpret, append the agent message, then
/// apply side effects in fixed order. One exchange is in flight per session
/// at most; the guard is cleared on every path.
pub struct ChatController<C> {
    client: C,
    agent: AgentId,
    session_id: String,
    pro_fund_percentage: Decimal,
    in_flight: bool,
}

impl<C> ChatController<C>
where
    C: AgentClient,
{
    pub fn new(
        client: C,
        agent: AgentId,
        session_id: impl Into<String>,
        pro_fund_percentage: Decimal,
    ) -> Self {
        Self {
            client,
            agent,
            session_id: session_id.into(),
            pro_fund_percentage,
            in_flight: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub async fn send_message(
        &mut self,
        store: &mut WorkflowStore,
        input: &str,
    ) -> Result<SendOutcome, ChatError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        if self.in_flight {
            return Err(ChatError::SessionBusy);
        }

        self.in_flight = true;
        let outcome = self.exchange(store, trimmed).await;
        self.in_flight = false;
        Ok(outcome)
    }

    async fn exchange(&self, store: &mut WorkflowStore, text: &str) -> SendOutcome {
        store.append_message(ChatMessage::user(text, Utc::now()));

        let context = InvokeContext { session_id: Some(self.session_id.clone()) };
        match self.client.invoke(text, &self.agent, Some(&context)).await {
            Ok(reply) if reply.success => self.apply_reply(store, reply),
            Ok(reply) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = reply.error.as_deref().unwrap_or("unspecified"),
                    "support agent declared failure"
                );
                let content = reply
                    .error
                    .filter(|error| !error.trim().is_empty())
                    .unwrap_or_else(|| AGENT_APOLOGY.to_string());
                let message = ChatMessage::agent(content, Utc::now());
                let agent_message = message.id.clone();
                store.append_message(message);
                SendOutcome::Failed { agent_message }
            }
            Err(error) => {
                tracing::error!(session_id = %self.session_id, %error, "support agent call failed");
                let message = ChatMessage::agent(CONNECTION_APOLOGY, Utc::now());
                let agent_message = message.id.clone();
                store.append_message(message);
                SendOutcome::Failed { agent_message }
            }
        }
    }

    fn apply_reply(&self, store: &mut WorkflowStore, reply: AgentReply) -> SendOutcome {
        let (raw, transport_message) = match reply.response {
            Some(body) => (body.result, body.message),
            None => (Value::Null, None),
        };

        let (payload, unstructured_text) = match interpret(&raw) {
            Interpretation::Payload(payload) => (payload, None),
            // No structured payload: the raw reply text itself is the
            // display content.
            Interpretation::Uninterpretable => {
                let text = raw
                    .as_str()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string);
                (AgentPayload::default(), text)
            }
        };

        let content = payload
            .response_text
            .clone()
            .or(unstructured_text)
            .or_else(|| transport_message.filter(|message| !message.trim().is_empty()))
            .unwrap_or_else(|| FALLBACK_ACKNOWLEDGMENT.to_string());

        let now = Utc::now();
        let mut message = ChatMessage::agent(content, now);
        message.citations = payload.citations.clone();
        message.ticket = payload.ticket.clone();
        message.lead_info = payload.lead_info.clone();
        message.upsell_offer = payload.upsell_offer.clone();
        message.approval_request = payload.approval_request.clone();
        message.revenue_entry = payload.revenue_entry.clone();
        let mut report = TurnReport::new(message.id.clone());
        store.append_message(message);

        // Effect order is fixed for transcript readability: ticket, approval,
        // revenue, lead. Each targets a disjoint part of state.
        if let Some(patch) = payload.ticket {
            let ticket = store.upsert_ticket(patch, now);
            tracing::info!(session_id = %self.session_id, ticket_id = %ticket.ticket_id, "ticket upserted");
            report.ticket_upserted = Some(ticket.ticket_id);
        }

        if let Some(draft) = payload.approval_request {
            let fallback = payload.lead_info.as_ref().map(|lead| lead.name.as_str());
            let request = store.enqueue_approval(draft, now, fallback);
            tracing::info!(session_id = %self.session_id, order_id = %request.order_id, "approval request enqueued");
            store.append_message(ChatMessage::system(
                format!(
                    "Approval request submitted for {}. An operator will review and follow up.",
                    request.request_type.as_str()
                ),
                now,
            ));
            report.approval_enqueued = Some(request.order_id);
        }

        if let Some(draft) = payload.revenue_entry {
            let product = draft.product.clone();
            match store.record_revenue(draft, now, self.pro_fund_percentage) {
                Ok(entry) => {
                    tracing::info!(
                        session_id = %self.session_id,
                        product = %entry.product,
                        "revenue entry recorded"
                    );
                    report.revenue =
                        RevenueOutcome::Recorded { allocation: entry.pro_fund_allocation };
                }
                Err(error) => {
                    tracing::warn!(session_id = %self.session_id, %error, "revenue entry rejected");
                    store.append_message(ChatMessage::system(
                        format!("Revenue entry could not be recorded: {error}."),
                        now,
                    ));
                    report.revenue = RevenueOutcome::Rejected { product };
                }
            }
        }

        if let Some(lead) = payload.lead_info {
            store.append_message(ChatMessage::system(
                format!("Lead information captured for {}.", lead.name),
                now,
            ));
            report.lead_captured = Some(lead.name);
        }

        SendOutcome::Replied(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;

    use corey_agent::{AgentClient, AgentId, AgentReply, AgentTransportError, InvokeContext};
    use corey_core::domain::message::MessageRole;
    use corey_core::store::WorkflowStore;

    use super::{ChatController, ChatError, RevenueOutcome, SendOutcome};

    struct ScriptedClient {
        replies: Mutex<Vec<Result<AgentReply, AgentTransportError>>>,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<AgentReply, AgentTransportError>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self { replies: Mutex::new(replies), seen: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> Vec<(String, Option<String>)> {
            self.seen.lock().expect("seen lock").clone()
        }
    }

    #[async_trait]
    impl AgentClient for ScriptedClient {
        async fn invoke(
            &self,
            message: &str,
            _agent: &AgentId,
            context: Option<&InvokeContext>,
        ) -> Result<AgentReply, AgentTransportError> {
            self.seen
                .lock()
                .expect("seen lock")
                .push((message.to_string(), context.and_then(|ctx| ctx.session_id.clone())));
            self.replies.lock().expect("replies lock").pop().unwrap_or_else(|| {
                Err(AgentTransportError::Unreachable { reason: "script exhausted".to_string() })
            })
        }
    }

    fn controller(replies: Vec<Result<AgentReply, AgentTransportError>>) -> ChatController<ScriptedClient> {
        ChatController::new(
            ScriptedClient::new(replies),
            AgentId("support-agent".to_string()),
            "session-1",
            Decimal::from(20),
        )
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let mut controller = controller(Vec::new());
        let mut store = WorkflowStore::new();

        let outcome = controller.send_message(&mut store, "   \n").await.expect("no error");
        assert_eq!(outcome, SendOutcome::Ignored);
        assert!(store.transcript().is_empty());
        assert!(controller.client.calls().is_empty());
    }

    #[tokio::test]
    async fn in_flight_guard_rejects_second_send() {
        let mut controller = controller(Vec::new());
        let mut store = WorkflowStore::new();
        controller.in_flight = true;

        let error =
            controller.send_message(&mut store, "hello").await.expect_err("guard should reject");
        assert_eq!(error, ChatError::SessionBusy);
        assert!(store.transcript().is_empty());
    }

    #[tokio::test]
    async fn session_id_travels_as_invocation_context() {
        let reply = AgentReply::ok(json!({"response_text": "Hi there!"}));
        let mut controller = controller(vec![Ok(reply)]);
        let mut store = WorkflowStore::new();

        controller.send_message(&mut store, "hello").await.expect("send succeeds");

        let calls = controller.client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "hello");
        assert_eq!(calls[0].1.as_deref(), Some("session-1"));
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn upsell_reply_annotates_message_without_side_effects() {
        let reply = AgentReply::ok(json!({
            "response_text": "Our Concierge Setup package provides hands-on assistance.",
            "upsell_offer": {
                "product_name": "Concierge Setup",
                "price": "$97",
                "description": "Full hands-on setup assistance.",
                "checkout_url": "https://checkout.stripe.com/concierge-setup",
            },
        }));
        let mut controller = controller(vec![Ok(reply)]);
        let mut store = WorkflowStore::new();

        let outcome = controller
            .send_message(&mut store, "Can you tell me about the Concierge Setup package?")
            .await
            .expect("send succeeds");

        let SendOutcome::Replied(report) = outcome else { panic!("expected a reply") };
        assert!(report.ticket_upserted.is_none());
        assert!(report.approval_enqueued.is_none());
        assert_eq!(report.revenue, RevenueOutcome::None);

        // user message + agent message, nothing else
        assert_eq!(store.transcript().len(), 2);
        let agent_message = &store.transcript()[1];
        assert_eq!(agent_message.role, MessageRole::Agent);
        let offer = agent_message.upsell_offer.as_ref().expect("offer annotation");
        assert_eq!(offer.product_name, "Concierge Setup");
        assert!(store.tickets().is_empty());
        assert!(store.pending_approvals().is_empty());
        assert!(store.ledger().is_empty());
    }

    #[tokio::test]
    async fn revenue_reply_updates_ledger_and_counters() {
        let reply = AgentReply::ok(json!({
            "response_text": "Purchase confirmed!",
            "revenue_entry": {"amount": 97, "product": "Concierge Setup"},
        }));
        let mut controller = controller(vec![Ok(reply)]);
        let mut store = WorkflowStore::new();

        let outcome =
            controller.send_message(&mut store, "I bought it").await.expect("send succeeds");

        let SendOutcome::Replied(report) = outcome else { panic!("expected a reply") };
        assert_eq!(report.revenue, RevenueOutcome::Recorded { allocation: Decimal::new(194, 1) });
        assert_eq!(store.ledger().len(), 1);
        assert_eq!(store.ledger()[0].pro_fund_allocation, Decimal::new(194, 1));
        assert_eq!(store.pro_fund_balance(), Decimal::new(194, 1));
        assert_eq!(store.conversion_count(), 1);
    }

    #[tokio::test]
    async fn non_numeric_revenue_amount_yields_system_warning() {
        let reply = AgentReply::ok(json!({
            "response_text": "Purchase confirmed!",
            "revenue_entry": {"amount": "ninety-seven", "product": "Concierge Setup"},
        }));
        let mut controller = controller(vec![Ok(reply)]);
        let mut store = WorkflowStore::new();

        let outcome =
            controller.send_message(&mut store, "I bought it").await.expect("send succeeds");

        let SendOutcome::Replied(report) = outcome else { panic!("expected a reply") };
        assert_eq!(
            report.revenue,
            RevenueOutcome::Rejected { product: "Concierge Setup".to_string() }
        );
        assert!(store.ledger().is_empty());
        assert_eq!(store.conversion_count(), 0);

        let warning = store
            .transcript()
            .iter()
            .find(|message| message.role == MessageRole::System)
            .expect("system warning present");
        assert!(warning.content.contains("could not be recorded"));
    }

    #[tokio::test]
    async fn approval_reply_enqueues_request_with_lead_name_fallback() {
        let reply = AgentReply::ok(json!({
            "response_text": "I have escalated this to an operator.",
            "approval_request": {
                "request_type": "refund",
                "reason": "Defective product",
                "order_id": "#4521",
                "desired_outcome": "Full refund",
                "summary": "Customer reports the add-on never activated.",
            },
            "lead_info": {"name": "Sarah Mitchell", "email": "sarah@example.com", "use_case": "support"},
        }));
        let mut controller = controller(vec![Ok(reply)]);
        let mut store = WorkflowStore::new();

        controller.send_message(&mut store, "I want a refund").await.expect("send succeeds");

        assert_eq!(store.pending_count(), 1);
        assert_eq!(store.pending_approvals()[0].customer_name, "Sarah Mitchell");

        let system_notices: Vec<&str> = store
            .transcript()
            .iter()
            .filter(|message| message.role == MessageRole::System)
            .map(|message| message.content.as_str())
            .collect();
        assert!(system_notices.iter().any(|notice| notice.contains("Approval request submitted")));
        assert!(system_notices.iter().any(|notice| notice.contains("Lead information captured")));
    }

    #[tokio::test]
    async fn transport_failure_appends_single_apology_without_effects() {
        let mut controller = controller(vec![Err(AgentTransportError::Unreachable {
            reason: "connection refused".to_string(),
        })]);
        let mut store = WorkflowStore::new();

        let outcome =
            controller.send_message(&mut store, "hello?").await.expect("send completes");

        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        assert_eq!(store.transcript().len(), 2);
        assert_eq!(store.transcript()[1].role, MessageRole::Agent);
        assert!(store.transcript()[1].content.contains("connection issue"));
        assert!(store.tickets().is_empty());
        assert!(store.ledger().is_empty());
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn agent_declared_failure_uses_error_text() {
        let mut controller = controller(vec![Ok(AgentReply::failed("Agent quota exhausted"))]);
        let mut store = WorkflowStore::new();

        let outcome = controller.send_message(&mut store, "hello").await.expect("send completes");

        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        assert_eq!(store.transcript()[1].content, "Agent quota exhausted");
    }

    #[tokio::test]
    async fn uninterpretable_string_reply_is_displayed_verbatim() {
        let reply = AgentReply {
            success: true,
            response: Some(corey_agent::AgentResponseBody {
                result: json!("Thanks for reaching out! No structured data here."),
                message: Some("transport-level message".to_string()),
            }),
            error: None,
        };
        let mut controller = controller(vec![Ok(reply)]);
        let mut store = WorkflowStore::new();

        controller.send_message(&mut store, "hello").await.expect("send succeeds");

        assert_eq!(
            store.transcript()[1].content,
            "Thanks for reaching out! No structured data here."
        );
    }

    #[tokio::test]
    async fn missing_result_falls_back_to_transport_message_then_generic() {
        let with_message = AgentReply {
            success: true,
            response: Some(corey_agent::AgentResponseBody {
                result: serde_json::Value::Null,
                message: Some("Handled upstream.".to_string()),
            }),
            error: None,
        };
        let bare = AgentReply { success: true, response: None, error: None };
        let mut controller = controller(vec![Ok(with_message), Ok(bare)]);
        let mut store = WorkflowStore::new();

        controller.send_message(&mut store, "first").await.expect("send succeeds");
        controller.send_message(&mut store, "second").await.expect("send succeeds");

        assert_eq!(store.transcript()[1].content, "Handled upstream.");
        assert_eq!(
            store.transcript()[3].content,
            "I received your message. Let me look into that for you."
        );
    }
}
