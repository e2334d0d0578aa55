//! Shared foundation for the IMRE dialogue engine.
//!
//! Configuration, the top-level error type, shared value types, text
//! normalization, and the collaborator contracts (knowledge search, report
//! generation, assistant, patient records) consumed by the higher crates.

pub mod config;
pub mod error;
pub mod services;
pub mod text;
pub mod types;

pub use config::ImreConfig;
pub use error::{ImreError, Result};
pub use services::{
    with_timeout, AssistantReply, AssistantService, AssistantSource, Document, InteractionSnapshot,
    KnowledgeSearch, PatientRecordStore, Report, ReportSections, ReportService, SearchOptions,
};
pub use types::*;
