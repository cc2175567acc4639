use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet, mapref::entry::Entry};

use crate::{
    error::StoreError,
    model::{
        Campaign, CampaignContact, CampaignStatus, Contact, ContactFilter, ContactStatus, Draft,
        DraftStatus, RecordId, SentEmail, Tag, Template,
    },
    store::Store,
};

/// In-process [`Store`] on concurrent hash maps.
///
/// Uniqueness (contact email, tag name, campaign membership) is enforced through secondary indexes
/// updated with the entry API, so concurrent inserts from a fan-out cannot both win.
#[derive(Default)]
pub struct MemoryStore {
    contacts: DashMap<RecordId, Contact>,
    contact_emails: DashMap<String, RecordId>,
    tags: DashMap<RecordId, Tag>,
    tag_names: DashMap<String, RecordId>,
    /// `(contact_id, tag_id)` pairs.
    contact_tags: DashSet<(RecordId, RecordId)>,
    templates: DashMap<RecordId, Template>,
    campaigns: DashMap<RecordId, Campaign>,
    campaign_contacts: DashMap<RecordId, CampaignContact>,
    memberships: DashMap<(RecordId, RecordId), RecordId>,
    drafts: DashMap<RecordId, Draft>,
    sent_emails: DashMap<RecordId, SentEmail>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn belongs_to_campaign(&self, campaign_contact_id: Option<&str>, campaign_id: &str) -> bool {
        campaign_contact_id
            .and_then(|id| self.campaign_contacts.get(id))
            .is_some_and(|member| member.campaign_id == campaign_id)
    }

    fn is_tagged(&self, contact_id: &str) -> bool {
        self.contact_tags.iter().any(|link| link.0 == contact_id)
    }

    fn has_any_tag(&self, contact_id: &str, tag_ids: &[RecordId]) -> bool {
        tag_ids
            .iter()
            .any(|tag_id| self.contact_tags.contains(&(contact_id.to_string(), tag_id.clone())))
    }

    fn matches_tags(&self, contact_id: &str, filter: &ContactFilter) -> bool {
        if filter.untagged {
            !self.is_tagged(contact_id)
        } else if filter.tag_ids.is_empty() {
            true
        } else {
            self.has_any_tag(contact_id, &filter.tag_ids)
        }
    }

    fn tag_name_conflict(name: &str) -> StoreError {
        StoreError::Conflict(format!("tag name {name} is taken"))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_contact(&self, contact: Contact) -> Result<bool, StoreError> {
        if let Some(email) = contact.email.clone() {
            match self.contact_emails.entry(email) {
                Entry::Occupied(_) => return Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(contact.id.clone());
                }
            }
        }
        self.contacts.insert(contact.id.clone(), contact);
        Ok(true)
    }

    async fn get_contact(&self, id: &str) -> Result<Contact, StoreError> {
        self.contacts
            .get(id)
            .map(|contact| contact.clone())
            .ok_or_else(|| StoreError::not_found("contact", id))
    }

    async fn update_contact(&self, contact: &Contact) -> Result<(), StoreError> {
        let previous = self
            .contacts
            .get(&contact.id)
            .map(|existing| existing.email.clone())
            .ok_or_else(|| StoreError::not_found("contact", &contact.id))?;

        if previous != contact.email {
            if let Some(email) = &contact.email {
                match self.contact_emails.entry(email.clone()) {
                    Entry::Occupied(owner) if owner.get() != &contact.id => {
                        return Err(StoreError::Conflict(format!(
                            "email {email} already belongs to contact {}",
                            owner.get()
                        )));
                    }
                    Entry::Occupied(_) => {}
                    Entry::Vacant(slot) => {
                        slot.insert(contact.id.clone());
                    }
                }
            }
            if let Some(old) = previous {
                self.contact_emails.remove(&old);
            }
        }

        self.contacts.insert(contact.id.clone(), contact.clone());
        Ok(())
    }

    async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, StoreError> {
        let mut contacts: Vec<Contact> = self
            .contacts
            .iter()
            .filter(|contact| filter.matches(contact))
            .filter(|contact| self.matches_tags(&contact.id, filter))
            .map(|contact| contact.clone())
            .collect();

        contacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(contacts)
    }

    async fn insert_tag(&self, tag: Tag) -> Result<(), StoreError> {
        match self.tag_names.entry(tag.name.clone()) {
            Entry::Occupied(_) => return Err(Self::tag_name_conflict(&tag.name)),
            Entry::Vacant(slot) => {
                slot.insert(tag.id.clone());
            }
        }
        self.tags.insert(tag.id.clone(), tag);
        Ok(())
    }

    async fn get_tag(&self, id: &str) -> Result<Tag, StoreError> {
        self.tags
            .get(id)
            .map(|tag| tag.clone())
            .ok_or_else(|| StoreError::not_found("tag", id))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let mut tags: Vec<Tag> = self.tags.iter().map(|tag| tag.clone()).collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn update_tag(&self, tag: &Tag) -> Result<(), StoreError> {
        let previous = self
            .tags
            .get(&tag.id)
            .map(|existing| existing.name.clone())
            .ok_or_else(|| StoreError::not_found("tag", &tag.id))?;

        if previous != tag.name {
            match self.tag_names.entry(tag.name.clone()) {
                Entry::Occupied(owner) if owner.get() != &tag.id => {
                    return Err(Self::tag_name_conflict(&tag.name));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(tag.id.clone());
                }
            }
            self.tag_names.remove(&previous);
        }

        self.tags.insert(tag.id.clone(), tag.clone());
        Ok(())
    }

    async fn delete_tag(&self, id: &str) -> Result<(), StoreError> {
        let (_, tag) = self
            .tags
            .remove(id)
            .ok_or_else(|| StoreError::not_found("tag", id))?;
        self.tag_names.remove(&tag.name);
        self.contact_tags.retain(|(_, tag_id)| tag_id != id);
        Ok(())
    }

    async fn tag_contact(&self, contact_id: &str, tag_id: &str) -> Result<bool, StoreError> {
        if !self.contacts.contains_key(contact_id) {
            return Err(StoreError::not_found("contact", contact_id));
        }
        if !self.tags.contains_key(tag_id) {
            return Err(StoreError::not_found("tag", tag_id));
        }
        Ok(self
            .contact_tags
            .insert((contact_id.to_string(), tag_id.to_string())))
    }

    async fn untag_contact(&self, contact_id: &str, tag_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .contact_tags
            .remove(&(contact_id.to_string(), tag_id.to_string()))
            .is_some())
    }

    async fn contact_tags(&self, contact_id: &str) -> Result<Vec<Tag>, StoreError> {
        let tag_ids: Vec<RecordId> = self
            .contact_tags
            .iter()
            .filter(|link| link.0 == contact_id)
            .map(|link| link.1.clone())
            .collect();
        let mut tags: Vec<Tag> = tag_ids
            .iter()
            .filter_map(|tag_id| self.tags.get(tag_id).map(|tag| tag.clone()))
            .collect();

        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn count_tagged(&self, tag_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .contact_tags
            .iter()
            .filter(|link| link.1 == tag_id)
            .count())
    }

    async fn insert_template(&self, template: Template) -> Result<(), StoreError> {
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    async fn get_template(&self, id: &str) -> Result<Template, StoreError> {
        self.templates
            .get(id)
            .map(|template| template.clone())
            .ok_or_else(|| StoreError::not_found("template", id))
    }

    async fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        let mut templates: Vec<Template> = self
            .templates
            .iter()
            .map(|template| template.clone())
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn update_template(&self, template: &Template) -> Result<(), StoreError> {
        let mut existing = self
            .templates
            .get_mut(&template.id)
            .ok_or_else(|| StoreError::not_found("template", &template.id))?;
        *existing = template.clone();
        Ok(())
    }

    async fn delete_template(&self, id: &str) -> Result<(), StoreError> {
        self.templates
            .remove(id)
            .ok_or_else(|| StoreError::not_found("template", id))?;
        for mut campaign in self.campaigns.iter_mut() {
            if campaign.template_id.as_deref() == Some(id) {
                campaign.template_id = None;
            }
        }
        Ok(())
    }

    async fn campaigns_for_template(
        &self,
        template_id: &str,
    ) -> Result<Vec<Campaign>, StoreError> {
        Ok(self
            .campaigns
            .iter()
            .filter(|campaign| campaign.template_id.as_deref() == Some(template_id))
            .map(|campaign| campaign.clone())
            .collect())
    }

    async fn set_campaign_template(
        &self,
        campaign_id: &str,
        template_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut campaign = self
            .campaigns
            .get_mut(campaign_id)
            .ok_or_else(|| StoreError::not_found("campaign", campaign_id))?;
        campaign.template_id = template_id.map(str::to_string);
        Ok(())
    }

    async fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError> {
        self.campaigns.insert(campaign.id.clone(), campaign);
        Ok(())
    }

    async fn get_campaign(&self, id: &str) -> Result<Campaign, StoreError> {
        self.campaigns
            .get(id)
            .map(|campaign| campaign.clone())
            .ok_or_else(|| StoreError::not_found("campaign", id))
    }

    async fn set_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), StoreError> {
        let mut campaign = self
            .campaigns
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("campaign", id))?;
        campaign.status = status;
        Ok(())
    }

    async fn add_campaign_contact(&self, member: CampaignContact) -> Result<bool, StoreError> {
        let key = (member.campaign_id.clone(), member.contact_id.clone());
        match self.memberships.entry(key) {
            Entry::Occupied(_) => return Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(member.id.clone());
            }
        }
        self.campaign_contacts.insert(member.id.clone(), member);
        Ok(true)
    }

    async fn get_campaign_contact(&self, id: &str) -> Result<CampaignContact, StoreError> {
        self.campaign_contacts
            .get(id)
            .map(|member| member.clone())
            .ok_or_else(|| StoreError::not_found("campaign contact", id))
    }

    async fn list_campaign_contacts(
        &self,
        campaign_id: &str,
        statuses: &[ContactStatus],
    ) -> Result<Vec<CampaignContact>, StoreError> {
        Ok(self
            .campaign_contacts
            .iter()
            .filter(|member| member.campaign_id == campaign_id)
            .filter(|member| statuses.is_empty() || statuses.contains(&member.status))
            .map(|member| member.clone())
            .collect())
    }

    async fn set_campaign_contact_status(
        &self,
        id: &str,
        status: ContactStatus,
    ) -> Result<(), StoreError> {
        let mut member = self
            .campaign_contacts
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("campaign contact", id))?;
        member.status = status;
        Ok(())
    }

    async fn count_campaign_contacts(
        &self,
        campaign_id: &str,
        statuses: &[ContactStatus],
    ) -> Result<usize, StoreError> {
        Ok(self
            .campaign_contacts
            .iter()
            .filter(|member| member.campaign_id == campaign_id)
            .filter(|member| statuses.is_empty() || statuses.contains(&member.status))
            .count())
    }

    async fn insert_draft(&self, draft: Draft) -> Result<(), StoreError> {
        self.drafts.insert(draft.id.clone(), draft);
        Ok(())
    }

    async fn get_draft(&self, id: &str) -> Result<Draft, StoreError> {
        self.drafts
            .get(id)
            .map(|draft| draft.clone())
            .ok_or_else(|| StoreError::not_found("draft", id))
    }

    async fn update_draft(&self, draft: &Draft) -> Result<(), StoreError> {
        let mut existing = self
            .drafts
            .get_mut(&draft.id)
            .ok_or_else(|| StoreError::not_found("draft", &draft.id))?;
        *existing = draft.clone();
        Ok(())
    }

    async fn delete_draft(&self, id: &str) -> Result<(), StoreError> {
        self.drafts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("draft", id))
    }

    async fn latest_unsent_draft(
        &self,
        campaign_contact_id: &str,
    ) -> Result<Option<Draft>, StoreError> {
        Ok(self
            .drafts
            .iter()
            .filter(|draft| draft.campaign_contact_id.as_deref() == Some(campaign_contact_id))
            .filter(|draft| draft.status != DraftStatus::Sent)
            .max_by_key(|draft| draft.created_at)
            .map(|draft| draft.clone()))
    }

    async fn mark_opened(&self, draft_id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut draft = self
            .drafts
            .get_mut(draft_id)
            .ok_or_else(|| StoreError::not_found("draft", draft_id))?;
        if draft.opened_at.is_some() {
            return Ok(false);
        }
        draft.opened_at = Some(at);
        Ok(true)
    }

    async fn count_opened(&self, campaign_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .drafts
            .iter()
            .filter(|draft| draft.opened_at.is_some())
            .filter(|draft| {
                self.belongs_to_campaign(draft.campaign_contact_id.as_deref(), campaign_id)
            })
            .count())
    }

    async fn insert_sent_email(&self, sent: SentEmail) -> Result<(), StoreError> {
        self.sent_emails.insert(sent.id.clone(), sent);
        Ok(())
    }

    async fn sent_emails_for_campaign(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<SentEmail>, StoreError> {
        let mut sent: Vec<SentEmail> = self
            .sent_emails
            .iter()
            .filter(|sent| {
                let member = self
                    .drafts
                    .get(&sent.draft_id)
                    .and_then(|draft| draft.campaign_contact_id.clone());
                self.belongs_to_campaign(member.as_deref(), campaign_id)
            })
            .map(|sent| sent.clone())
            .collect();

        sent.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(sent)
    }
}
