use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    error::{OutreachError, Result, StoreError},
    model::{RecordId, Tag},
    outreach::Outreach,
};

const TAG_NAME_TAKEN: &str = "A tag with this name already exists";

/// The tag to attach to a contact: an existing one, or a new one created on the fly.
#[derive(Debug, Clone)]
pub enum TagRef {
    Existing(RecordId),
    New { name: String, color: Option<String> },
}

/// Edits to a tag. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// A tag with the number of contacts carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    #[serde(flatten)]
    pub tag: Tag,
    pub contacts: usize,
}

fn name_taken(err: StoreError) -> OutreachError {
    match err {
        StoreError::Conflict(_) => OutreachError::conflict(TAG_NAME_TAKEN),
        other => other.into(),
    }
}

impl Outreach {
    pub async fn create_tag(&self, name: &str, color: Option<String>) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OutreachError::invalid("Tag name is required"));
        }

        let tag = Tag::new(name, color);
        self.store.insert_tag(tag.clone()).await.map_err(name_taken)?;
        info!(tag_id = %tag.id, name = %tag.name, "tag_created");
        Ok(tag)
    }

    /// Every tag ordered by name, with its contact count.
    pub async fn list_tags(&self) -> Result<Vec<TagSummary>> {
        let mut summaries = Vec::new();
        for tag in self.store.list_tags().await? {
            let contacts = self.store.count_tagged(&tag.id).await?;
            summaries.push(TagSummary { tag, contacts });
        }
        Ok(summaries)
    }

    pub async fn update_tag(&self, tag_id: &str, update: TagUpdate) -> Result<Tag> {
        let mut tag = self.store.get_tag(tag_id).await?;
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(OutreachError::invalid("Tag name is required"));
            }
            tag.name = name.to_string();
        }
        if let Some(color) = update.color {
            tag.color = color;
        }

        self.store.update_tag(&tag).await.map_err(name_taken)?;
        Ok(tag)
    }

    pub async fn delete_tag(&self, tag_id: &str) -> Result<()> {
        self.store.delete_tag(tag_id).await?;
        info!(tag_id, "tag_deleted");
        Ok(())
    }

    /// Attach a tag to a contact, creating the tag first for [`TagRef::New`]. Attaching a
    /// tag the contact already carries is a no-op.
    #[instrument(name = "contact_tag", skip(self, tag))]
    pub async fn tag_contact(&self, contact_id: &str, tag: TagRef) -> Result<Tag> {
        self.store.get_contact(contact_id).await?;
        let tag = match tag {
            TagRef::Existing(tag_id) => self.store.get_tag(&tag_id).await?,
            TagRef::New { name, color } => self.create_tag(&name, color).await?,
        };

        self.store.tag_contact(contact_id, &tag.id).await?;
        Ok(tag)
    }

    pub async fn untag_contact(&self, contact_id: &str, tag_id: &str) -> Result<()> {
        self.store.get_contact(contact_id).await?;
        self.store.untag_contact(contact_id, tag_id).await?;
        Ok(())
    }

    pub async fn contact_tags(&self, contact_id: &str) -> Result<Vec<Tag>> {
        Ok(self.store.contact_tags(contact_id).await?)
    }
}
