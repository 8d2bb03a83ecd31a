//! Financial Analyst Agent
//!
//! A conversational financial assistant that:
//! - Answers per-message by dispatching typed tools over simulated market
//!   and client data
//! - Scores credit risk deterministically, so decisions are reproducible
//! - Keeps multi-turn context per session, in memory, until explicitly
//!   deleted
//! - Exposes the orchestrator and direct tool endpoints over HTTP
//!
//! PER-MESSAGE PROTOCOL:
//! RECEIVED → CONTEXT_LOADED → REASONING → HISTORY_APPENDED → RESPONDED

pub mod agent;
pub mod api;
pub mod error;
pub mod models;
pub mod reasoner;
pub mod risk;
pub mod session;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use risk::{RiskAssessment, RiskAssessmentInput, RiskClassification};
