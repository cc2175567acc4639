use tracing::{info, instrument};

use crate::{
    error::{OutreachError, Result},
    model::{ContactStatus, Draft, DraftStatus},
    outreach::Outreach,
};

/// Edits to a draft under review. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct DraftUpdate {
    pub subject: Option<String>,
    pub body: Option<String>,
    pub status: Option<DraftStatus>,
}

impl Outreach {
    /// Edit a draft that has not been sent. Approving it also approves its campaign member.
    #[instrument(name = "draft_update", skip(self, update))]
    pub async fn update_draft(&self, draft_id: &str, update: DraftUpdate) -> Result<Draft> {
        let mut draft = self.store.get_draft(draft_id).await?;
        if draft.status == DraftStatus::Sent {
            return Err(OutreachError::invalid("Cannot edit a sent email"));
        }
        if update.status == Some(DraftStatus::Sent) {
            return Err(OutreachError::invalid("Drafts are marked sent only by sending them"));
        }

        if let Some(subject) = update.subject {
            draft.subject = subject;
        }
        if let Some(body) = update.body {
            draft.body = body;
        }
        if let Some(status) = update.status {
            draft.status = status;
        }
        self.store.update_draft(&draft).await?;

        if update.status == Some(DraftStatus::Approved) {
            if let Some(member_id) = &draft.campaign_contact_id {
                self.store
                    .set_campaign_contact_status(member_id, ContactStatus::Approved)
                    .await?;
            }
            info!(draft_id, "draft_approved");
        }

        Ok(draft)
    }

    pub async fn approve_draft(&self, draft_id: &str) -> Result<Draft> {
        self.update_draft(
            draft_id,
            DraftUpdate {
                status: Some(DraftStatus::Approved),
                ..Default::default()
            },
        )
        .await
    }

    /// Discard a draft that has not been sent.
    #[instrument(name = "draft_delete", skip(self))]
    pub async fn delete_draft(&self, draft_id: &str) -> Result<()> {
        let draft = self.store.get_draft(draft_id).await?;
        if draft.status == DraftStatus::Sent {
            return Err(OutreachError::invalid("Cannot delete a sent email"));
        }
        self.store.delete_draft(draft_id).await?;
        Ok(())
    }
}
