use tracing::{debug, info, instrument, warn};

use crate::{
    campaign::BatchReport,
    error::{OutreachError, Result},
    model::{
        Campaign, CampaignContact, CampaignStatus, ContactStatus, Draft, GenerationContext,
        RecordId, Template,
    },
    outreach::Outreach,
    service::{DraftContext, HistoryEntry},
};

impl Outreach {
    /// Generate a draft for every pending member of a campaign and mark the campaign active.
    #[instrument(name = "campaign_generate", skip(self))]
    pub async fn generate_drafts(&self, campaign_id: &str) -> Result<BatchReport> {
        let campaign = self.store.get_campaign(campaign_id).await?;
        let template_id = campaign
            .template_id
            .as_deref()
            .ok_or_else(|| OutreachError::invalid("Campaign has no template assigned"))?;
        let template = self.store.get_template(template_id).await?;

        let pending = self
            .store
            .list_campaign_contacts(campaign_id, &[ContactStatus::Pending])
            .await?;
        let contact_ids: Vec<RecordId> = pending.iter().map(|m| m.contact_id.clone()).collect();

        let (campaign_ref, template_ref) = (&campaign, &template);
        let tasks: Vec<_> = pending
            .into_iter()
            .map(|member| move || self.generate_for_member(campaign_ref, template_ref, member))
            .collect();

        let outcomes = self.runner.run_tagged(tasks).await;
        let report = BatchReport::from_outcomes(contact_ids, outcomes);

        for (contact_id, error) in report.failures() {
            warn!(%contact_id, %error, "draft_generation_failed");
        }

        self.store
            .set_campaign_status(campaign_id, CampaignStatus::Active)
            .await?;

        info!(
            generated = report.succeeded,
            failed = report.failed,
            "campaign_drafts_generated"
        );
        Ok(report)
    }

    async fn generate_for_member(
        &self,
        campaign: &Campaign,
        template: &Template,
        member: CampaignContact,
    ) -> Result<()> {
        let contact = self.store.get_contact(&member.contact_id).await?;

        let history = match contact.email.as_deref() {
            Some(email) => self.email_history(email).await,
            None => Vec::new(),
        };

        let context = DraftContext {
            contact_name: contact.display_name(),
            contact_email: contact.email.clone(),
            contact_company: contact.company.clone(),
            contact_title: contact.title.clone(),
            profile: contact.profile.clone(),
            history,
            template_subject: template.subject_template.clone(),
            template_instructions: template.body_instructions.clone(),
            campaign_context: campaign.context.clone(),
        };

        let generated = self.generator.generate_draft(&context).await?;
        let draft = Draft::generated(
            contact.id,
            Some(member.id.clone()),
            generated,
            Some(GenerationContext {
                template_id: template.id.clone(),
                campaign_id: campaign.id.clone(),
            }),
        );

        self.store.insert_draft(draft).await?;
        self.store
            .set_campaign_contact_status(&member.id, ContactStatus::DraftReady)
            .await?;
        Ok(())
    }

    /// Messages exchanged with `address`, flattened across threads. Provider failures only
    /// cost the draft its history.
    async fn email_history(&self, address: &str) -> Vec<HistoryEntry> {
        if self.config.history_threads == 0 {
            return Vec::new();
        }

        match self
            .mail
            .fetch_threads(address, self.config.history_threads)
            .await
        {
            Ok(threads) => threads
                .into_iter()
                .flat_map(|thread| thread.messages)
                .map(HistoryEntry::from)
                .collect(),
            Err(err) => {
                debug!(%address, error = %err, "continuing without email history");
                Vec::new()
            }
        }
    }
}
