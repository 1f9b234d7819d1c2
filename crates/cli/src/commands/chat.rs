use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use corey_agent::{AgentClient, AgentId, HttpAgentClient};
use corey_console::{ApprovalController, ChatController, SendOutcome};
use corey_core::config::{AppConfig, LoadOptions};
use corey_core::domain::approval::{Decision, OrderId};
use corey_core::domain::message::MessageRole;
use corey_core::fixtures::sample_store;
use corey_core::fund::FundPolicy;
use corey_core::store::WorkflowStore;

pub async fn run(config_path: Option<PathBuf>, sample_data: bool) -> ExitCode {
    let config = match AppConfig::load(LoadOptions { config_path, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::from(2);
        }
    };
    super::init_logging(&config);

    match run_session(config, sample_data).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("session error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run_session(config: AppConfig, sample_data: bool) -> Result<()> {
    let client = HttpAgentClient::from_config(&config.agents)?;
    let mut store =
        if sample_data { sample_store(Utc::now()) } else { WorkflowStore::new() };

    let session_id = Uuid::new_v4().to_string();
    let mut chat = ChatController::new(
        client.clone(),
        AgentId(config.agents.support_agent_id.clone()),
        session_id,
        config.fund.pro_fund_percentage,
    );
    let mut approvals =
        ApprovalController::new(client, AgentId(config.agents.approval_agent_id.clone()));
    let policy =
        FundPolicy::new(config.fund.pro_fund_threshold, config.fund.conversion_count_threshold);

    println!("{}", config.console.greeting);
    println!("Commands: status | approve <order_id> <notes> | deny <order_id> <notes> | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if line == "status" {
            print_status(&store, &policy, &config);
            continue;
        }
        if let Some(rest) = line.strip_prefix("approve ") {
            handle_decision(&mut approvals, &mut store, rest, Decision::Approved).await;
            continue;
        }
        if let Some(rest) = line.strip_prefix("deny ") {
            handle_decision(&mut approvals, &mut store, rest, Decision::Denied).await;
            continue;
        }

        let seen = store.transcript().len();
        match chat.send_message(&mut store, line).await {
            Ok(SendOutcome::Ignored) => {}
            Ok(_) => print_new_messages(&store, seen),
            Err(error) => eprintln!("{error}"),
        }
    }

    Ok(())
}

async fn handle_decision<C>(
    approvals: &mut ApprovalController<C>,
    store: &mut WorkflowStore,
    input: &str,
    decision: Decision,
) where
    C: AgentClient,
{
    let (order_raw, notes) = match input.split_once(' ') {
        Some((order, notes)) => (order, notes.trim()),
        None => (input, ""),
    };
    let order_id = OrderId(order_raw.trim().to_string());
    if !notes.is_empty() {
        approvals.set_notes(&order_id, notes);
    }

    match approvals.resolve(store, &order_id, decision).await {
        Ok(resolved) => {
            println!(
                "Approval {} for order {}: {}",
                resolved.decision.as_str(),
                resolved.request.order_id,
                resolved.customer_response
            );
        }
        Err(error) => eprintln!("{error}"),
    }
}

fn print_new_messages(store: &WorkflowStore, seen: usize) {
    for message in &store.transcript()[seen..] {
        match message.role {
            MessageRole::User => {}
            MessageRole::Agent => println!("corey: {}", message.content),
            MessageRole::System => println!("[system] {}", message.content),
        }
        if let Some(offer) = &message.upsell_offer {
            println!("  offer: {} - {} ({})", offer.product_name, offer.price, offer.checkout_url);
        }
        for citation in &message.citations {
            println!("  source: {}", citation.source);
        }
    }
}

fn print_status(store: &WorkflowStore, policy: &FundPolicy, config: &AppConfig) {
    let fund = policy.evaluate(store.ledger(), Utc::now());

    println!("Active tickets: {} ({} total)", store.active_ticket_count(), store.tickets().len());
    println!(
        "Revenue: ${} across {} transactions",
        store.total_revenue(),
        store.ledger().len()
    );
    println!(
        "Pro fund: ${} of ${} threshold, {} of {} conversions{}",
        fund.balance,
        config.fund.pro_fund_threshold,
        fund.conversions,
        config.fund.conversion_count_threshold,
        if fund.ready { " - ready for payout" } else { "" }
    );
    println!("Pending approvals: {}", store.pending_count());
    for request in store.pending_approvals() {
        println!(
            "  {} {} from {}: {}",
            request.order_id,
            request.request_type.as_str(),
            request.customer_name,
            request.desired_outcome
        );
    }
}
