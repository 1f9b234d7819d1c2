pub mod approval;
pub mod message;
pub mod revenue;
pub mod ticket;
