//! Storage collaborator.
//!
//! The [`Store`] trait is the narrow CRUD/count/filter surface the orchestration code needs.
//! [`MemoryStore`] keeps everything in process; a database-backed store implements the same
//! trait.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::StoreError,
    model::{
        Campaign, CampaignContact, CampaignStatus, Contact, ContactFilter, ContactStatus, Draft,
        SentEmail, Tag, Template,
    },
};

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a contact. Returns `false` when a contact with the same email already exists.
    async fn insert_contact(&self, contact: Contact) -> Result<bool, StoreError>;

    async fn get_contact(&self, id: &str) -> Result<Contact, StoreError>;

    async fn update_contact(&self, contact: &Contact) -> Result<(), StoreError>;

    /// Contacts matching `filter`, newest first.
    async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, StoreError>;

    /// Insert a tag. Fails with [`StoreError::Conflict`] when the name is taken.
    async fn insert_tag(&self, tag: Tag) -> Result<(), StoreError>;

    async fn get_tag(&self, id: &str) -> Result<Tag, StoreError>;

    /// All tags ordered by name.
    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when renamed to a name another tag holds.
    async fn update_tag(&self, tag: &Tag) -> Result<(), StoreError>;

    /// Delete a tag and detach it from every contact.
    async fn delete_tag(&self, id: &str) -> Result<(), StoreError>;

    /// Attach a tag to a contact. Returns `false` when it was already attached.
    async fn tag_contact(&self, contact_id: &str, tag_id: &str) -> Result<bool, StoreError>;

    /// Detach a tag from a contact. Returns `false` when it was not attached.
    async fn untag_contact(&self, contact_id: &str, tag_id: &str) -> Result<bool, StoreError>;

    /// Tags of one contact ordered by name.
    async fn contact_tags(&self, contact_id: &str) -> Result<Vec<Tag>, StoreError>;

    /// Number of contacts carrying a tag.
    async fn count_tagged(&self, tag_id: &str) -> Result<usize, StoreError>;

    async fn insert_template(&self, template: Template) -> Result<(), StoreError>;

    async fn get_template(&self, id: &str) -> Result<Template, StoreError>;

    /// All templates, newest first.
    async fn list_templates(&self) -> Result<Vec<Template>, StoreError>;

    async fn update_template(&self, template: &Template) -> Result<(), StoreError>;

    /// Delete a template and unassign it from every campaign using it.
    async fn delete_template(&self, id: &str) -> Result<(), StoreError>;

    /// Campaigns whose template is `template_id`.
    async fn campaigns_for_template(&self, template_id: &str)
    -> Result<Vec<Campaign>, StoreError>;

    async fn set_campaign_template(
        &self,
        campaign_id: &str,
        template_id: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError>;

    async fn get_campaign(&self, id: &str) -> Result<Campaign, StoreError>;

    async fn set_campaign_status(&self, id: &str, status: CampaignStatus)
    -> Result<(), StoreError>;

    /// Add a contact to a campaign. Returns `false` when it is already a member.
    async fn add_campaign_contact(&self, member: CampaignContact) -> Result<bool, StoreError>;

    async fn get_campaign_contact(&self, id: &str) -> Result<CampaignContact, StoreError>;

    /// Members of a campaign in any of `statuses`; an empty slice lists all members.
    async fn list_campaign_contacts(
        &self,
        campaign_id: &str,
        statuses: &[ContactStatus],
    ) -> Result<Vec<CampaignContact>, StoreError>;

    async fn set_campaign_contact_status(
        &self,
        id: &str,
        status: ContactStatus,
    ) -> Result<(), StoreError>;

    /// Count members of a campaign in any of `statuses`; an empty slice counts all members.
    async fn count_campaign_contacts(
        &self,
        campaign_id: &str,
        statuses: &[ContactStatus],
    ) -> Result<usize, StoreError>;

    async fn insert_draft(&self, draft: Draft) -> Result<(), StoreError>;

    async fn get_draft(&self, id: &str) -> Result<Draft, StoreError>;

    async fn update_draft(&self, draft: &Draft) -> Result<(), StoreError>;

    async fn delete_draft(&self, id: &str) -> Result<(), StoreError>;

    /// Newest draft of a campaign member that has not been sent yet.
    async fn latest_unsent_draft(
        &self,
        campaign_contact_id: &str,
    ) -> Result<Option<Draft>, StoreError>;

    /// Record the first open of a draft. Returns `false` if it was already opened.
    async fn mark_opened(&self, draft_id: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Drafts of a campaign that have been opened at least once.
    async fn count_opened(&self, campaign_id: &str) -> Result<usize, StoreError>;

    async fn insert_sent_email(&self, sent: SentEmail) -> Result<(), StoreError>;

    /// Sent emails of a campaign, newest first.
    async fn sent_emails_for_campaign(&self, campaign_id: &str)
    -> Result<Vec<SentEmail>, StoreError>;
}
