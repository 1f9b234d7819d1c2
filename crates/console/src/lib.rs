//! Console orchestration - the two controllers that drive a support session
//!
//! `chat` runs one message exchange with the conversational support agent
//! and applies the interpreted payload to the workflow store. `approval`
//! runs one human decision round trip with the approval-handling agent.
//! Both controllers own their in-flight guards; the store is only ever
//! mutated through them.

pub mod approval;
pub mod chat;

pub use approval::{ApprovalController, ApprovalError};
pub use chat::{ChatController, ChatError, RevenueOutcome, SendOutcome, TurnReport};
