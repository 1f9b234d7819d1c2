use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use corey_agent::{interpret_resolution, AgentClient, AgentId};
use corey_core::domain::approval::{
    ApprovalRequest, ApprovalResolution, Decision, OrderId, ResolvedApproval,
};
use corey_core::errors::WorkflowError;
use corey_core::store::WorkflowStore;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("operator notes are required before processing order `{order_id}`")]
    MissingNotes { order_id: OrderId },
    #[error("order `{order_id}` is already being processed")]
    AlreadyInFlight { order_id: OrderId },
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("approval agent failure: {0}")]
    Agent(String),
}

/// Runs one operator decision round trip with the approval-handling agent.
///
/// The in-flight guard is keyed by `order_id`, so two different pending
/// orders can resolve concurrently while a duplicate resolution of the same
/// order is rejected at the boundary. On any failure the request stays
/// pending and the guard is cleared, so the order remains resolvable.
pub struct ApprovalController<C> {
    client: C,
    agent: AgentId,
    notes: HashMap<String, String>,
    in_flight: HashSet<String>,
}

impl<C> ApprovalController<C>
where
    C: AgentClient,
{
    pub fn new(client: C, agent: AgentId) -> Self {
        Self { client, agent, notes: HashMap::new(), in_flight: HashSet::new() }
    }

    /// Buffers operator notes for a pending order ahead of a decision.
    pub fn set_notes(&mut self, order_id: &OrderId, notes: impl Into<String>) {
        self.notes.insert(order_id.0.clone(), notes.into());
    }

    pub fn notes_for(&self, order_id: &OrderId) -> Option<&str> {
        self.notes.get(&order_id.0).map(String::as_str)
    }

    pub fn is_processing(&self, order_id: &OrderId) -> bool {
        self.in_flight.contains(&order_id.0)
    }

    pub async fn resolve(
        &mut self,
        store: &mut WorkflowStore,
        order_id: &OrderId,
        decision: Decision,
    ) -> Result<ResolvedApproval, ApprovalError> {
        let notes = self
            .notes
            .get(&order_id.0)
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty())
            .ok_or_else(|| ApprovalError::MissingNotes { order_id: order_id.clone() })?;

        if !self.in_flight.insert(order_id.0.clone()) {
            return Err(ApprovalError::AlreadyInFlight { order_id: order_id.clone() });
        }

        let result = self.submit(store, order_id, decision, &notes).await;
        self.in_flight.remove(&order_id.0);
        if result.is_ok() {
            self.notes.remove(&order_id.0);
        }
        result
    }

    async fn submit(
        &self,
        store: &mut WorkflowStore,
        order_id: &OrderId,
        decision: Decision,
        notes: &str,
    ) -> Result<ResolvedApproval, ApprovalError> {
        let Some(request) = store
            .pending_approvals()
            .iter()
            .find(|pending| pending.order_id == *order_id)
            .cloned()
        else {
            return Err(WorkflowError::ApprovalNotFound { order_id: order_id.clone() }.into());
        };

        let message = operator_message(&request, decision, notes);
        let reply = self
            .client
            .invoke(&message, &self.agent, None)
            .await
            .map_err(|error| ApprovalError::Agent(error.to_string()))?;

        if !reply.success {
            let reason = reply
                .error
                .filter(|error| !error.trim().is_empty())
                .unwrap_or_else(|| "approval agent rejected the request".to_string());
            tracing::warn!(order_id = %order_id, reason = %reason, "approval agent declared failure");
            return Err(ApprovalError::Agent(reason));
        }

        let raw = reply.response.map(|body| body.result).unwrap_or(Value::Null);
        // An uninterpretable reply is not a failure here: every resolution
        // field falls back to the operator-supplied decision and notes.
        let payload = interpret_resolution(&raw).unwrap_or_default();

        let resolution = ApprovalResolution {
            decision: payload.decision.unwrap_or(decision),
            customer_response: payload
                .customer_response
                .unwrap_or_else(|| format!("Request {}.", decision.as_str())),
            resolution_notes: payload.resolution_notes.unwrap_or_else(|| notes.to_string()),
            operator_notes: payload.operator_notes.unwrap_or_else(|| notes.to_string()),
            action_taken: payload
                .action_taken
                .unwrap_or_else(|| decision.as_str().to_string()),
            ticket_status: payload.new_ticket_status,
        };

        let resolved = store.resolve_approval(order_id, resolution, Utc::now())?;
        tracing::info!(
            order_id = %resolved.request.order_id,
            decision = resolved.decision.as_str(),
            "approval resolved"
        );
        Ok(resolved)
    }
}

fn operator_message(request: &ApprovalRequest, decision: Decision, notes: &str) -> String {
    format!(
        "Process {} decision for {} request. Order: {}. Customer requested: {}. Summary: {}. \
         Operator notes: {}. Ticket: {}.",
        decision.as_str(),
        request.request_type.as_str(),
        request.order_id,
        request.desired_outcome,
        request.summary,
        notes,
        request
            .ticket_id
            .as_ref()
            .map(|ticket_id| ticket_id.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
    )
}
