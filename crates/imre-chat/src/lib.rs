//! Conversational layer of the IMRE engine.
//!
//! Composes intent classification, platform actions and the interview state
//! machine into a single `handle(user_id, text)` entry point, and builds
//! scripted replies when no external assistant answers.

pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod persist;
pub mod phrases;
pub mod response;
pub mod types;

pub use error::ChatError;
pub use memory::MemoryBuffer;
pub use orchestrator::{Collaborators, ConversationOrchestrator};
pub use persist::PersistenceWorker;
pub use phrases::{FixedPhrases, PhraseSource, RandomPhrases};
pub use response::{Payload, PlatformStatus, ResponseSynthesizer, SynthesisOptions, SynthesizedReply};
pub use types::{Reply, ReplySource};
