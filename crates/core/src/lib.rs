pub mod config;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod fund;
pub mod store;

pub use config::{AgentsConfig, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::approval::{
    ApprovalDraft, ApprovalRequest, ApprovalResolution, Decision, OrderId, RequestType,
    ResolvedApproval,
};
pub use domain::message::{ChatMessage, Citation, LeadInfo, MessageId, MessageRole, UpsellOffer};
pub use domain::revenue::{RevenueDraft, RevenueEntry};
pub use domain::ticket::{
    Ticket, TicketCategory, TicketId, TicketPatch, TicketPriority, TicketStatus,
};
pub use errors::WorkflowError;
pub use fund::{ConversionWindow, FundPolicy, FundStatus};
pub use store::WorkflowStore;
