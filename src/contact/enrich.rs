use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::{
    campaign::BatchReport,
    error::{OutreachError, Result},
    model::{Contact, RecordId},
    outreach::Outreach,
    service::{ProfileData, normalize_profile_url},
};

fn fill(field: &mut Option<String>, value: Option<&str>) {
    if field.is_none() {
        *field = value.filter(|v| !v.is_empty()).map(str::to_string);
    }
}

/// Store the profile and fill only the fields the contact is missing.
fn apply_profile(contact: &mut Contact, profile: ProfileData) {
    fill(&mut contact.first_name, profile.first_name.as_deref());
    fill(&mut contact.last_name, profile.last_name.as_deref());
    fill(&mut contact.email, profile.preferred_email());
    fill(&mut contact.company, profile.current_company());
    fill(&mut contact.title, profile.current_title());
    contact.profile = Some(profile);
    contact.enriched_at = Some(Utc::now());
}

impl Outreach {
    #[instrument(name = "contact_enrich", skip(self))]
    pub async fn enrich_contact(&self, contact_id: &str) -> Result<Contact> {
        let mut contact = self.store.get_contact(contact_id).await?;
        let url = contact
            .linkedin_url
            .as_deref()
            .ok_or_else(|| OutreachError::invalid("Contact has no LinkedIn URL to enrich from"))?;
        let url = normalize_profile_url(url)?;

        let profile = self.enricher.enrich(&url).await?;
        apply_profile(&mut contact, profile);
        self.store.update_contact(&contact).await?;

        Ok(contact)
    }

    /// Enrich many contacts through the bounded runner.
    #[instrument(name = "contacts_enrich", skip_all, fields(contacts = contact_ids.len()))]
    pub async fn enrich_contacts(&self, contact_ids: &[RecordId]) -> Result<BatchReport> {
        let tasks: Vec<_> = contact_ids
            .iter()
            .map(|id| move || async move { self.enrich_contact(id).await.map(|_| ()) })
            .collect();

        let outcomes = self.runner.run_tagged(tasks).await;
        let report = BatchReport::from_outcomes(contact_ids.to_vec(), outcomes);

        for (contact_id, error) in report.failures() {
            warn!(%contact_id, %error, "enrichment_failed");
        }
        info!(enriched = report.succeeded, failed = report.failed, "contacts_enriched");
        Ok(report)
    }
}
