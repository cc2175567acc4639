//! Remote collaborators consumed through narrow async interfaces.
//!
//! Concrete clients (mail provider, LLM, profile enrichment) live outside this crate and
//! implement these traits; their wire formats and credential handling are theirs to own.

pub mod generator;
pub mod mail;
pub mod profile;

pub use generator::{DraftContext, DraftGenerator, GeneratedDraft, HistoryEntry, parse_generated_draft};
pub use mail::{MailProvider, Message, SentMessage, Thread};
pub use profile::{Experience, ProfileData, ProfileDate, ProfileEnricher, normalize_profile_url};
