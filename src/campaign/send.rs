use tracing::{info, instrument, warn};

use crate::{
    campaign::BatchReport,
    error::{OutreachError, Result},
    model::{CampaignContact, CampaignStatus, ContactStatus, Draft, DraftStatus, RecordId, SentEmail},
    outreach::Outreach,
};

const AWAITING_SEND: &[ContactStatus] = &[ContactStatus::DraftReady, ContactStatus::Approved];

/// URL of the open-tracking pixel for one draft.
pub fn tracking_url(base_url: &str, draft_id: &str) -> String {
    format!(
        "{}/api/track/open?draftId={draft_id}",
        base_url.trim_end_matches('/')
    )
}

pub fn append_tracking_pixel(html_body: &str, pixel_url: &str) -> String {
    format!(
        "{html_body}<img src=\"{pixel_url}\" width=\"1\" height=\"1\" alt=\"\" style=\"display:none\" />"
    )
}

impl Outreach {
    /// Send one draft to its contact.
    #[instrument(name = "draft_send", skip(self))]
    pub async fn send_draft(&self, draft_id: &str) -> Result<SentEmail> {
        let draft = self.store.get_draft(draft_id).await?;
        if draft.status == DraftStatus::Sent {
            return Err(OutreachError::invalid("Draft has already been sent"));
        }

        let contact = self.store.get_contact(&draft.contact_id).await?;
        let to = contact
            .email
            .as_deref()
            .ok_or_else(|| OutreachError::invalid("Contact has no email address"))?;

        self.deliver(draft, to).await
    }

    /// Send the latest unsent draft of every `DraftReady` or `Approved` member. The campaign
    /// is completed once no member is left pending or awaiting send.
    #[instrument(name = "campaign_send_all", skip(self))]
    pub async fn send_all(&self, campaign_id: &str) -> Result<BatchReport> {
        let ready = self
            .store
            .list_campaign_contacts(campaign_id, AWAITING_SEND)
            .await?;
        if ready.is_empty() {
            return Ok(BatchReport::default());
        }

        let contact_ids: Vec<RecordId> = ready.iter().map(|m| m.contact_id.clone()).collect();
        let tasks: Vec<_> = ready
            .into_iter()
            .map(|member| move || self.send_to_member(member))
            .collect();

        let outcomes = self.runner.run_tagged(tasks).await;
        let report = BatchReport::from_outcomes(contact_ids, outcomes);

        for (contact_id, error) in report.failures() {
            warn!(%contact_id, %error, "send_failed");
        }

        let remaining = self
            .store
            .count_campaign_contacts(
                campaign_id,
                &[
                    ContactStatus::Pending,
                    ContactStatus::DraftReady,
                    ContactStatus::Approved,
                ],
            )
            .await?;
        if remaining == 0 {
            self.store
                .set_campaign_status(campaign_id, CampaignStatus::Completed)
                .await?;
            info!(%campaign_id, "campaign_completed");
        }

        info!(sent = report.succeeded, failed = report.failed, "campaign_sent");
        Ok(report)
    }

    async fn send_to_member(&self, member: CampaignContact) -> Result<()> {
        let draft = self
            .store
            .latest_unsent_draft(&member.id)
            .await?
            .ok_or_else(|| OutreachError::invalid("No draft found"))?;
        let contact = self.store.get_contact(&member.contact_id).await?;
        let to = contact
            .email
            .as_deref()
            .ok_or_else(|| OutreachError::invalid("No email address"))?;

        self.deliver(draft, to).await?;
        Ok(())
    }

    async fn deliver(&self, mut draft: Draft, to: &str) -> Result<SentEmail> {
        let pixel = tracking_url(self.config.base_url(), &draft.id);
        let body = append_tracking_pixel(&draft.body, &pixel);

        let sent = self.mail.send_message(to, &draft.subject, &body).await?;
        let record = SentEmail::new(draft.id.clone(), sent);
        self.store.insert_sent_email(record.clone()).await?;

        draft.status = DraftStatus::Sent;
        self.store.update_draft(&draft).await?;
        if let Some(member_id) = &draft.campaign_contact_id {
            self.store
                .set_campaign_contact_status(member_id, ContactStatus::Sent)
                .await?;
        }

        Ok(record)
    }
}
