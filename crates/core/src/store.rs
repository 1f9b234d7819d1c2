use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::approval::{
    ApprovalDraft, ApprovalRequest, ApprovalResolution, OrderId, ResolvedApproval,
};
use crate::domain::message::ChatMessage;
use crate::domain::revenue::{RevenueDraft, RevenueEntry};
use crate::domain::ticket::{Ticket, TicketId, TicketPatch, TicketStatus};
use crate::errors::WorkflowError;

const DEFAULT_CUSTOMER_NAME: &str = "Customer";

/// In-memory session state: transcript, tickets, approvals, and the revenue
/// ledger with its derived fund counters.
///
/// Every transition is atomic with respect to the store and takes `now`
/// explicitly so replays are deterministic. Collections keep insertion order
/// because insertion order is display order.
#[derive(Clone, Debug, Default)]
pub struct WorkflowStore {
    transcript: Vec<ChatMessage>,
    tickets: Vec<Ticket>,
    pending_approvals: Vec<ApprovalRequest>,
    resolved_approvals: Vec<ResolvedApproval>,
    ledger: Vec<RevenueEntry>,
    pro_fund_balance: Decimal,
    conversion_count: u64,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_message(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    /// Merge by `ticket_id`: defined incoming fields overwrite, absent fields
    /// keep prior values, and `created_at` always keeps the first-seen value.
    /// Unknown ids insert a fresh ticket with `created_at = now`.
    pub fn upsert_ticket(&mut self, patch: TicketPatch, now: DateTime<Utc>) -> Ticket {
        if let Some(existing) =
            self.tickets.iter_mut().find(|ticket| ticket.ticket_id == patch.ticket_id)
        {
            patch.apply_to(existing);
            return existing.clone();
        }

        let ticket = patch.into_ticket(now);
        self.tickets.push(ticket.clone());
        ticket
    }

    /// Stamps the draft with `now` and a customer name (draft value, then the
    /// caller's fallback, then a generic placeholder). A draft whose
    /// `order_id` is already pending replaces the existing entry in place:
    /// the latest request wins and the pending set stays unique by order.
    pub fn enqueue_approval(
        &mut self,
        draft: ApprovalDraft,
        now: DateTime<Utc>,
        customer_name_fallback: Option<&str>,
    ) -> ApprovalRequest {
        let customer_name = draft
            .customer_name
            .clone()
            .or_else(|| customer_name_fallback.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string());

        let request = ApprovalRequest {
            order_id: draft.order_id,
            request_type: draft.request_type,
            reason: draft.reason,
            desired_outcome: draft.desired_outcome,
            summary: draft.summary,
            ticket_id: draft.ticket_id,
            customer_name,
            timestamp: now,
        };

        if let Some(existing) = self
            .pending_approvals
            .iter_mut()
            .find(|pending| pending.order_id == request.order_id)
        {
            *existing = request.clone();
        } else {
            self.pending_approvals.push(request.clone());
        }

        request
    }

    /// Appends a ledger entry and maintains the fund counters. Drafts without
    /// a numeric amount are rejected so the caller can surface a warning
    /// instead of silently dropping the sale.
    pub fn record_revenue(
        &mut self,
        draft: RevenueDraft,
        now: DateTime<Utc>,
        pro_fund_percentage: Decimal,
    ) -> Result<RevenueEntry, WorkflowError> {
        let Some(amount) = draft.amount else {
            return Err(WorkflowError::InvalidRevenueAmount { product: draft.product });
        };

        let allocation = draft
            .pro_fund_allocation
            .unwrap_or_else(|| amount * pro_fund_percentage / Decimal::from(100));

        let entry = RevenueEntry {
            amount,
            product: draft.product,
            pro_fund_allocation: allocation,
            timestamp: now,
        };

        self.ledger.push(entry.clone());
        self.pro_fund_balance += allocation;
        self.conversion_count += 1;
        Ok(entry)
    }

    /// Moves the pending entry for `order_id` into the resolved log and syncs
    /// the linked ticket's status. Fails without touching state when the
    /// order is no longer pending.
    pub fn resolve_approval(
        &mut self,
        order_id: &OrderId,
        resolution: ApprovalResolution,
        now: DateTime<Utc>,
    ) -> Result<ResolvedApproval, WorkflowError> {
        let position = self
            .pending_approvals
            .iter()
            .position(|pending| pending.order_id == *order_id)
            .ok_or_else(|| WorkflowError::ApprovalNotFound { order_id: order_id.clone() })?;

        let request = self.pending_approvals.remove(position);

        if let Some(ticket_id) = &request.ticket_id {
            let status = resolution
                .ticket_status
                .unwrap_or_else(|| resolution.decision.default_ticket_status());
            // A resolution naming an unknown ticket is a no-op on the ticket
            // collection; the resolved log entry is still recorded.
            if let Some(ticket) =
                self.tickets.iter_mut().find(|ticket| ticket.ticket_id == *ticket_id)
            {
                ticket.status = status;
            }
        }

        let resolved = ResolvedApproval {
            request,
            decision: resolution.decision,
            customer_response: resolution.customer_response,
            resolution_notes: resolution.resolution_notes,
            operator_notes: resolution.operator_notes,
            action_taken: resolution.action_taken,
            resolved_at: now,
        };

        self.resolved_approvals.push(resolved.clone());
        Ok(resolved)
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn ticket(&self, ticket_id: &TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|ticket| ticket.ticket_id == *ticket_id)
    }

    pub fn pending_approvals(&self) -> &[ApprovalRequest] {
        &self.pending_approvals
    }

    pub fn resolved_approvals(&self) -> &[ResolvedApproval] {
        &self.resolved_approvals
    }

    pub fn ledger(&self) -> &[RevenueEntry] {
        &self.ledger
    }

    pub fn pro_fund_balance(&self) -> Decimal {
        self.pro_fund_balance
    }

    pub fn conversion_count(&self) -> u64 {
        self.conversion_count
    }

    pub fn pending_count(&self) -> usize {
        self.pending_approvals.len()
    }

    pub fn active_ticket_count(&self) -> usize {
        self.tickets.iter().filter(|ticket| ticket.status != TicketStatus::Resolved).count()
    }

    pub fn total_revenue(&self) -> Decimal {
        self.ledger.iter().map(|entry| entry.amount).sum()
    }
}
