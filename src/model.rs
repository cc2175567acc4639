//! Records kept by the storage collaborator.
//!
//! Identifiers are random v4 UUID strings and timestamps are UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::{GeneratedDraft, ProfileData, SentMessage};

pub type RecordId = String;

pub fn new_id() -> RecordId {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: RecordId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    /// Raw enrichment result, kept for draft personalization.
    pub profile: Option<ProfileData>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            first_name: None,
            last_name: None,
            email: None,
            company: None,
            title: None,
            linkedin_url: None,
            profile: None,
            enriched_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::new()
        }
    }

    /// Full name when known, otherwise the email, otherwise `"Contact"`.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !name.is_empty() {
            name
        } else {
            self.email
                .clone()
                .filter(|email| !email.is_empty())
                .unwrap_or_else(|| "Contact".to_string())
        }
    }
}

impl Default for Contact {
    fn default() -> Self {
        Self::new()
    }
}

/// Contact listing criteria. Tag criteria are resolved by the store; `untagged` wins over
/// `tag_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactFilter {
    /// Case-insensitive match on first name, last name, email or company.
    pub search: Option<String>,
    pub enriched: Option<bool>,
    /// Contacts carrying any of these tags.
    pub tag_ids: Vec<RecordId>,
    pub untagged: bool,
}

impl ContactFilter {
    /// Check the text and enrichment criteria.
    pub fn matches(&self, contact: &Contact) -> bool {
        let needle = self
            .search
            .as_deref()
            .filter(|search| !search.is_empty())
            .map(str::to_lowercase);
        let text = needle.is_none_or(|needle| {
            [
                &contact.first_name,
                &contact.last_name,
                &contact.email,
                &contact.company,
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
        });
        let enriched = self
            .enriched
            .is_none_or(|enriched| contact.enriched_at.is_some() == enriched);

        text && enriched
    }
}

pub const DEFAULT_TAG_COLOR: &str = "#6366f1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: RecordId,
    /// Unique across the store.
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            color: color
                .filter(|color| !color.is_empty())
                .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: RecordId,
    pub name: String,
    pub subject_template: String,
    /// Free-form instructions handed to the draft generator.
    pub body_instructions: String,
    pub created_at: DateTime<Utc>,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        subject_template: impl Into<String>,
        body_instructions: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            subject_template: subject_template.into(),
            body_instructions: body_instructions.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    /// Extra context passed to the generator for every draft in the campaign.
    pub context: Option<String>,
    pub template_id: Option<RecordId>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
}

/// Progress of one contact through a campaign.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    #[default]
    Pending,
    DraftReady,
    Approved,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignContact {
    pub id: RecordId,
    pub campaign_id: RecordId,
    pub contact_id: RecordId,
    pub status: ContactStatus,
}

impl CampaignContact {
    pub fn new(campaign_id: impl Into<RecordId>, contact_id: impl Into<RecordId>) -> Self {
        Self {
            id: new_id(),
            campaign_id: campaign_id.into(),
            contact_id: contact_id.into(),
            status: ContactStatus::Pending,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    #[default]
    Generated,
    Approved,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub template_id: RecordId,
    pub campaign_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: RecordId,
    pub contact_id: RecordId,
    pub campaign_contact_id: Option<RecordId>,
    pub subject: String,
    /// HTML body.
    pub body: String,
    pub status: DraftStatus,
    pub generation_context: Option<GenerationContext>,
    pub opened_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    pub fn generated(
        contact_id: impl Into<RecordId>,
        campaign_contact_id: Option<RecordId>,
        generated: GeneratedDraft,
        generation_context: Option<GenerationContext>,
    ) -> Self {
        Self {
            id: new_id(),
            contact_id: contact_id.into(),
            campaign_contact_id,
            subject: generated.subject,
            body: generated.body,
            status: DraftStatus::Generated,
            generation_context,
            opened_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentEmail {
    pub id: RecordId,
    pub draft_id: RecordId,
    pub message_id: String,
    pub thread_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl SentEmail {
    pub fn new(draft_id: impl Into<RecordId>, sent: SentMessage) -> Self {
        Self {
            id: new_id(),
            draft_id: draft_id.into(),
            message_id: sent.message_id,
            thread_id: Some(sent.thread_id).filter(|id| !id.is_empty()),
            sent_at: Utc::now(),
        }
    }
}
