//! Email outreach engine.
//!
//! Contacts are imported and enriched, drafts are generated per contact by an LLM, sent
//! through a webmail provider and tracked for opens and replies. Storage and the three
//! remote services are collaborators behind the traits in [`store`] and [`service`].
//!
//! Every per-contact batch (draft generation, bulk send, reply detection, enrichment) fans
//! out through [`task::BoundedRunner`], which bounds the number of provider calls in flight,
//! keeps results in input order and, in its tagged mode, turns each task's failure into
//! data so that siblings always complete.

pub mod campaign;
pub mod config;
pub mod contact;
pub mod error;
pub mod model;
pub mod outreach;
pub mod service;
pub mod store;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use config::OutreachConfig;
pub use error::{OutreachError, Result};
pub use outreach::Outreach;
pub use task::{BoundedRunner, Outcome, run_bounded};
