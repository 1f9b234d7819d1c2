//! Agent integration - reply interpretation and remote invocation
//!
//! This crate is the boundary between the console and the two remote agents:
//! - Extracts structured payloads from free-form agent replies (`interpreter`)
//! - Defines the typed payload shapes the workflow engine consumes (`payload`)
//! - Carries the `invoke(message, agent, context)` contract and its HTTP
//!   implementation (`client`)
//!
//! # Safety Principle
//!
//! The remote agents are strictly translators. They never mutate workflow
//! state directly: every ticket, approval, and revenue effect is applied by
//! the deterministic store after interpretation, so a malformed or
//! adversarial reply can at worst degrade to plain text.

pub mod client;
pub mod interpreter;
pub mod payload;

pub use client::{
    AgentClient, AgentId, AgentReply, AgentResponseBody, AgentTransportError, HttpAgentClient,
    InvokeContext,
};
pub use interpreter::{interpret, interpret_resolution, Interpretation};
pub use payload::{AgentPayload, ResolutionPayload};
