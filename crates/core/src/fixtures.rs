use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::approval::{ApprovalDraft, OrderId, RequestType};
use crate::domain::message::{ChatMessage, Citation, UpsellOffer};
use crate::domain::revenue::RevenueDraft;
use crate::domain::ticket::{TicketCategory, TicketId, TicketPatch, TicketPriority, TicketStatus};
use crate::store::WorkflowStore;

/// Deterministic demo dataset: four tickets, two pending approvals, three
/// revenue entries, and a short transcript. Everything is loaded through the
/// store's own transitions so the seeded session satisfies the same
/// invariants as a live one (balance 43.80, three conversions, two pending).
pub fn sample_store(now: DateTime<Utc>) -> WorkflowStore {
    let mut store = WorkflowStore::new();

    for (patch, age_days) in sample_tickets() {
        store.upsert_ticket(patch, now - Duration::days(age_days));
    }

    for (draft, customer_name, age_hours) in sample_approvals() {
        let mut draft = draft;
        draft.customer_name = Some(customer_name.to_string());
        store.enqueue_approval(draft, now - Duration::hours(age_hours), None);
    }

    for (draft, age_hours) in sample_revenue() {
        // Seed entries carry explicit allocations, so the percentage here is
        // never consulted.
        let _ = store.record_revenue(draft, now - Duration::hours(age_hours), Decimal::from(20));
    }

    for message in sample_transcript(now) {
        store.append_message(message);
    }

    store
}

fn sample_tickets() -> Vec<(TicketPatch, i64)> {
    vec![
        (
            ticket(
                "TKT-001",
                TicketCategory::Billing,
                "Refund request for order #4521",
                TicketStatus::PendingApproval,
                TicketPriority::High,
            ),
            1,
        ),
        (
            ticket(
                "TKT-002",
                TicketCategory::Technical,
                "API integration not working",
                TicketStatus::InProgress,
                TicketPriority::Medium,
            ),
            1,
        ),
        (
            ticket(
                "TKT-003",
                TicketCategory::Account,
                "Password reset issue",
                TicketStatus::Open,
                TicketPriority::Low,
            ),
            0,
        ),
        (
            ticket(
                "TKT-004",
                TicketCategory::General,
                "Feature request: dark mode",
                TicketStatus::Resolved,
                TicketPriority::Low,
            ),
            2,
        ),
    ]
}

fn sample_approvals() -> Vec<(ApprovalDraft, &'static str, i64)> {
    vec![
        (
            ApprovalDraft {
                order_id: OrderId("#4521".to_string()),
                request_type: RequestType::Refund,
                reason: "Product did not meet expectations".to_string(),
                desired_outcome: "Full refund of $97".to_string(),
                summary: "Customer requesting full refund for Concierge Setup package. \
                          Purchased 5 days ago, claims features did not match description."
                    .to_string(),
                ticket_id: Some(TicketId("TKT-001".to_string())),
                customer_name: None,
            },
            "Sarah Mitchell",
            20,
        ),
        (
            ApprovalDraft {
                order_id: OrderId("#4530".to_string()),
                request_type: RequestType::AccountChange,
                reason: "Needs enterprise tier upgrade".to_string(),
                desired_outcome: "Upgrade to enterprise with prorated billing".to_string(),
                summary: "Long-term customer requesting enterprise upgrade with prorated \
                          billing for remainder of current billing cycle."
                    .to_string(),
                ticket_id: Some(TicketId("TKT-005".to_string())),
                customer_name: None,
            },
            "James Anderson",
            2,
        ),
    ]
}

fn sample_revenue() -> Vec<(RevenueDraft, i64)> {
    vec![
        (revenue("Concierge Setup", 97, Decimal::new(1940, 2)), 3),
        (revenue("Add-On Pack", 25, Decimal::new(500, 2)), 27),
        (revenue("Concierge Setup", 97, Decimal::new(1940, 2)), 50),
    ]
}

fn sample_transcript(now: DateTime<Utc>) -> Vec<ChatMessage> {
    let start = now - Duration::minutes(30);

    let greeting =
        ChatMessage::agent("Welcome to Corey Support! How can I help you today?", start);

    let user = ChatMessage::user(
        "I need help with my recent order. The product setup guide seems incomplete.",
        start + Duration::minutes(1),
    );

    let mut cited_reply = ChatMessage::agent(
        "I understand your concern about the setup guide. Let me pull up the relevant \
         documentation for you.",
        start + Duration::minutes(2),
    );
    cited_reply.citations = vec![Citation {
        source: "Setup Guide v3.2".to_string(),
        excerpt: "The setup wizard provides step-by-step configuration for new users..."
            .to_string(),
    }];

    let follow_up = ChatMessage::user(
        "That helps! Can you also tell me about the Concierge Setup package?",
        start + Duration::minutes(5),
    );

    let mut upsell_reply = ChatMessage::agent(
        "Great question! Our Concierge Setup package provides hands-on assistance to get \
         you fully configured.",
        start + Duration::minutes(5),
    );
    upsell_reply.upsell_offer = Some(UpsellOffer {
        product_name: "Concierge Setup".to_string(),
        price: "$97".to_string(),
        description: "Full hands-on setup assistance including API configuration, \
                      integration testing, and 30-day priority support."
            .to_string(),
        checkout_url: "https://checkout.stripe.com/concierge-setup".to_string(),
    });

    vec![greeting, user, cited_reply, follow_up, upsell_reply]
}

fn ticket(
    id: &str,
    category: TicketCategory,
    subject: &str,
    status: TicketStatus,
    priority: TicketPriority,
) -> TicketPatch {
    TicketPatch {
        ticket_id: TicketId(id.to_string()),
        category: Some(category),
        subject: Some(subject.to_string()),
        status: Some(status),
        priority: Some(priority),
    }
}

fn revenue(product: &str, amount: i64, allocation: Decimal) -> RevenueDraft {
    RevenueDraft {
        amount: Some(Decimal::from(amount)),
        product: product.to_string(),
        pro_fund_allocation: Some(allocation),
    }
}
