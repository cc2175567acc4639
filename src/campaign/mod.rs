//! Campaign orchestration: templates, draft generation and review, bulk sending, analytics
//! and open tracking.
//!
//! Every per-contact step is submitted to the shared [`BoundedRunner`] with the
//! catch-and-tag convention, so one failed contact never stops its siblings and the batch
//! reports how many items succeeded.
//!
//! [`BoundedRunner`]: crate::task::BoundedRunner

mod analytics;
mod generate;
mod report;
mod review;
mod send;
mod template;
mod tracking;

pub use analytics::{CampaignAnalytics, TimelinePoint};
pub use report::{BatchReport, ItemResult};
pub use review::DraftUpdate;
pub use send::{append_tracking_pixel, tracking_url};
pub use template::{NewTemplate, TemplateUpdate};
pub use tracking::{TRACKING_PIXEL, TRACKING_PIXEL_CONTENT_TYPE};

use chrono::Utc;
use tracing::info;

use crate::{
    error::{OutreachError, Result},
    model::{Campaign, CampaignContact, CampaignStatus, RecordId, new_id},
    outreach::Outreach,
};

#[derive(Debug, Clone, Default)]
pub struct NewCampaign {
    pub name: String,
    pub description: Option<String>,
    pub context: Option<String>,
    pub template_id: Option<RecordId>,
    pub contact_ids: Vec<RecordId>,
}

impl Outreach {
    /// Create a campaign in `Draft` status with its initial members.
    pub async fn create_campaign(&self, new: NewCampaign) -> Result<Campaign> {
        if new.name.trim().is_empty() {
            return Err(OutreachError::invalid("Campaign name is required"));
        }
        if let Some(template_id) = &new.template_id {
            self.store.get_template(template_id).await?;
        }

        let campaign = Campaign {
            id: new_id(),
            name: new.name,
            description: new.description,
            context: new.context,
            template_id: new.template_id,
            status: CampaignStatus::Draft,
            created_at: Utc::now(),
        };
        self.store.insert_campaign(campaign.clone()).await?;
        let added = self.add_contacts(&campaign.id, &new.contact_ids).await?;

        info!(campaign_id = %campaign.id, contacts = added, "campaign_created");
        Ok(campaign)
    }

    /// Add contacts to a campaign, skipping those already in it. Returns how many were added.
    pub async fn add_contacts(&self, campaign_id: &str, contact_ids: &[RecordId]) -> Result<usize> {
        let mut added = 0;
        for contact_id in contact_ids {
            self.store.get_contact(contact_id).await?;
            if self
                .store
                .add_campaign_contact(CampaignContact::new(campaign_id, contact_id.clone()))
                .await?
            {
                added += 1;
            }
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{
        config::OutreachConfig,
        error::StoreError,
        model::{ContactStatus, DraftStatus},
        service::{Message, Thread},
        store::Store,
        testing::{Harness, SENDER},
    };

    fn result_for<'a>(report: &'a BatchReport, contact_id: &str) -> &'a ItemResult {
        report
            .results
            .iter()
            .find(|r| r.contact_id == contact_id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_campaign_validation() {
        let h = Harness::new();

        let err = h.outreach.create_campaign(NewCampaign::default()).await.unwrap_err();
        assert!(matches!(err, OutreachError::Invalid(_)));

        let err = h
            .outreach
            .create_campaign(NewCampaign {
                name: "Launch".into(),
                template_id: Some("missing".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_add_contacts_skips_members() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let grace = h.contact("Grace", None).await;
        let (campaign, members) = h.campaign(&[&ada]).await;
        assert_eq!(members.len(), 1);
        assert_eq!(campaign.status, CampaignStatus::Draft);

        let added = h
            .outreach
            .add_contacts(&campaign.id, &[ada.id.clone(), grace.id.clone()])
            .await
            .unwrap();
        assert_eq!(added, 1);
    }

    #[tokio::test]
    async fn test_generate_drafts_isolates_failures() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let grace = h.contact("Grace", None).await;
        let linus = h.contact("Linus", Some("linus@example.com")).await;
        h.generator.refuse.insert("Linus".to_string());
        h.mail.history.insert(
            "ada@example.com".to_string(),
            vec![Thread {
                id: "old".into(),
                messages: vec![Message {
                    from: "ada@example.com".into(),
                    subject: "Last year".into(),
                    body: "Nice meeting you".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        );
        let (campaign, members) = h.campaign(&[&ada, &grace, &linus]).await;

        let report = h.outreach.generate_drafts(&campaign.id).await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.results.len(), 3);
        assert!(result_for(&report, &ada.id).outcome.is_success());
        assert!(result_for(&report, &grace.id).outcome.is_success());
        assert_eq!(
            result_for(&report, &linus.id).outcome.error(),
            Some("draft generation error: model refused Linus")
        );

        for member in members {
            let status = h.store.get_campaign_contact(&member.id).await.unwrap().status;
            let expected = if member.contact_id == linus.id {
                ContactStatus::Pending
            } else {
                ContactStatus::DraftReady
            };
            assert_eq!(status, expected);
        }
        assert_eq!(
            h.store.get_campaign(&campaign.id).await.unwrap().status,
            CampaignStatus::Active
        );

        let contexts = h.generator.contexts.lock().unwrap().clone();
        let ada_context = contexts.iter().find(|c| c.contact_name == "Ada").unwrap();
        assert_eq!(ada_context.history.len(), 1);
        assert_eq!(ada_context.history[0].subject, "Last year");
        assert_eq!(ada_context.campaign_context.as_deref(), Some("Product launch"));
        assert_eq!(ada_context.template_subject, "Quick intro");
    }

    #[tokio::test]
    async fn test_generate_without_history_when_mailbox_fails() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        h.mail.history_failures.insert("ada@example.com".to_string());
        let (campaign, _) = h.campaign(&[&ada]).await;

        let report = h.outreach.generate_drafts(&campaign.id).await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert!(h.generator.contexts.lock().unwrap()[0].history.is_empty());
    }

    #[tokio::test]
    async fn test_generate_requires_template() {
        let h = Harness::new();
        let campaign = h
            .outreach
            .create_campaign(NewCampaign {
                name: "No template".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = h.outreach.generate_drafts(&campaign.id).await.unwrap_err();

        assert_eq!(err.to_string(), "Campaign has no template assigned");
    }

    #[tokio::test]
    async fn test_send_all_reports_each_contact() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let grace = h.contact("Grace", None).await;
        let bob = h.contact("Bob", Some("bob@example.com")).await;
        h.mail.rejected_recipients.insert("bob@example.com".to_string());
        let (campaign, _) = h.campaign(&[&ada, &grace, &bob]).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();

        let report = h.outreach.send_all(&campaign.id).await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert!(result_for(&report, &ada.id).outcome.is_success());
        assert_eq!(
            result_for(&report, &grace.id).outcome.error(),
            Some("No email address")
        );
        assert_eq!(
            result_for(&report, &bob.id).outcome.error(),
            Some("recipient bob@example.com rejected")
        );

        let deliveries = h.mail.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, "ada@example.com");
        assert_eq!(deliveries[0].subject, "Quick intro for Ada");

        let sent = h.store.sent_emails_for_campaign(&campaign.id).await.unwrap();
        assert_eq!(sent.len(), 1);
        let draft = h.store.get_draft(&sent[0].draft_id).await.unwrap();
        assert_eq!(draft.status, DraftStatus::Sent);
        assert!(deliveries[0].body.starts_with("<p>Hi Ada</p><img"));
        assert!(deliveries[0].body.contains(&format!(
            "https://outreach.example/api/track/open?draftId={}",
            draft.id
        )));

        // failed members stay ready, so the campaign is not complete
        assert_eq!(
            h.store.get_campaign(&campaign.id).await.unwrap().status,
            CampaignStatus::Active
        );
        assert_eq!(
            h.store
                .count_campaign_contacts(&campaign.id, &[ContactStatus::DraftReady])
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_send_all_completes_campaign() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let grace = h.contact("Grace", Some("grace@example.com")).await;
        let (campaign, _) = h.campaign(&[&ada, &grace]).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();

        let report = h.outreach.send_all(&campaign.id).await.unwrap();

        assert_eq!((report.succeeded, report.failed), (2, 0));
        assert_eq!(
            h.store.get_campaign(&campaign.id).await.unwrap().status,
            CampaignStatus::Completed
        );

        let again = h.outreach.send_all(&campaign.id).await.unwrap();
        assert_eq!(again, BatchReport::default());
        assert_eq!(h.mail.deliveries().len(), 2);
    }

    #[tokio::test]
    async fn test_send_all_without_draft() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let (campaign, members) = h.campaign(&[&ada]).await;
        h.store
            .set_campaign_contact_status(&members[0].id, ContactStatus::DraftReady)
            .await
            .unwrap();

        let report = h.outreach.send_all(&campaign.id).await.unwrap();

        assert_eq!(report.results[0].outcome.error(), Some("No draft found"));
        assert!(h.mail.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_send_all_bounds_concurrent_sends() {
        let h = Harness::with_config(OutreachConfig {
            concurrency: 3,
            ..Default::default()
        });
        let mut contacts = Vec::new();
        for i in 0..12 {
            contacts.push(h.contact(&format!("Contact{i}"), Some(&format!("c{i}@example.com"))).await);
        }
        let (campaign, _) = h.campaign(&contacts.iter().collect::<Vec<_>>()).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();

        let report = h.outreach.send_all(&campaign.id).await.unwrap();

        assert_eq!(report.succeeded, 12);
        assert_eq!(h.mail.peak_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_send_draft_only_once() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let (campaign, members) = h.campaign(&[&ada]).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();
        let draft = h
            .store
            .latest_unsent_draft(&members[0].id)
            .await
            .unwrap()
            .unwrap();

        let sent = h.outreach.send_draft(&draft.id).await.unwrap();
        assert_eq!(sent.draft_id, draft.id);
        assert_eq!(sent.thread_id.as_deref(), Some("thread-0"));
        assert_eq!(
            h.store.get_campaign_contact(&members[0].id).await.unwrap().status,
            ContactStatus::Sent
        );

        let err = h.outreach.send_draft(&draft.id).await.unwrap_err();
        assert!(matches!(err, OutreachError::Invalid(_)));
    }

    async fn sent_campaign(h: &Harness, count: usize) -> Campaign {
        let mut contacts = Vec::new();
        for i in 0..count {
            contacts.push(h.contact(&format!("Contact{i}"), Some(&format!("c{i}@example.com"))).await);
        }
        let (campaign, _) = h.campaign(&contacts.iter().collect::<Vec<_>>()).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();
        h.outreach.send_all(&campaign.id).await.unwrap();
        campaign
    }

    #[tokio::test]
    async fn test_analytics_counts_opens_and_replies() {
        let h = Harness::new();
        let campaign = sent_campaign(&h, 4).await;
        let sent = h.store.sent_emails_for_campaign(&campaign.id).await.unwrap();
        let thread = |i: usize| sent[i].thread_id.clone().unwrap();

        h.mail.reply(&thread(0), "Contact <someone@example.com>");
        h.mail.reply(&thread(1), &format!("Me <{}>", SENDER.to_uppercase()));
        h.mail.broken_threads.insert(thread(2));
        let pixel = h.outreach.record_open(Some(&sent[3].draft_id)).await;
        assert_eq!(pixel, &TRACKING_PIXEL[..]);
        h.outreach.record_open(Some(&sent[3].draft_id)).await;

        let analytics = h.outreach.analytics(&campaign.id).await.unwrap();

        assert_eq!(analytics.total_contacts, 4);
        assert_eq!(analytics.sent, 4);
        assert_eq!(analytics.draft_ready, 0);
        assert_eq!(analytics.pending, 0);
        assert_eq!(analytics.send_rate, 100.0);
        assert_eq!(analytics.opened, 1);
        assert_eq!(analytics.open_rate, 25.0);
        assert_eq!(analytics.reply_checked_count, 4);
        assert_eq!(analytics.replies_detected, 1);
        assert_eq!(analytics.reply_rate, 25.0);
        assert_eq!(analytics.avg_hours_to_send, 0.0);
        assert_eq!(analytics.send_timeline.len(), 1);
        assert_eq!(analytics.send_timeline[0].count, 4);
    }

    #[tokio::test]
    async fn test_analytics_without_sender_address() {
        let h = Harness::new();
        let campaign = sent_campaign(&h, 2).await;
        let sent = h.store.sent_emails_for_campaign(&campaign.id).await.unwrap();
        h.mail.reply(sent[0].thread_id.as_deref().unwrap(), "someone@example.com");
        h.mail.no_profile.store(true, Ordering::SeqCst);

        let analytics = h.outreach.analytics(&campaign.id).await.unwrap();

        assert_eq!(analytics.reply_checked_count, 2);
        assert_eq!(analytics.replies_detected, 0);
        assert_eq!(analytics.reply_rate, 0.0);
    }

    #[tokio::test]
    async fn test_analytics_checks_newest_threads_only() {
        let h = Harness::with_config(OutreachConfig {
            reply_check_limit: 2,
            ..Default::default()
        });
        let campaign = sent_campaign(&h, 5).await;

        let analytics = h.outreach.analytics(&campaign.id).await.unwrap();

        assert_eq!(analytics.sent, 5);
        assert_eq!(analytics.reply_checked_count, 2);
    }

    #[tokio::test]
    async fn test_analytics_for_fresh_campaign() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let (campaign, _) = h.campaign(&[&ada]).await;

        let analytics = h.outreach.analytics(&campaign.id).await.unwrap();

        assert_eq!(analytics.pending, 1);
        assert_eq!(analytics.send_rate, 0.0);
        assert_eq!(analytics.open_rate, 0.0);
        assert_eq!(analytics.reply_checked_count, 0);
        assert!(analytics.send_timeline.is_empty());
    }

    #[tokio::test]
    async fn test_record_open_never_fails() {
        let h = Harness::new();
        assert_eq!(h.outreach.record_open(None).await.len(), 42);
        assert_eq!(h.outreach.record_open(Some("unknown")).await, &TRACKING_PIXEL[..]);
    }

    async fn first_draft(h: &Harness, member: &CampaignContact) -> crate::model::Draft {
        h.store
            .latest_unsent_draft(&member.id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_review_edits_and_approves_draft() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let (campaign, members) = h.campaign(&[&ada]).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();
        let draft = first_draft(&h, &members[0]).await;

        let edited = h
            .outreach
            .update_draft(
                &draft.id,
                DraftUpdate {
                    subject: Some("Hello Ada".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.subject, "Hello Ada");
        assert_eq!(edited.body, draft.body);
        assert_eq!(edited.status, DraftStatus::Generated);
        assert_eq!(
            h.store.get_campaign_contact(&members[0].id).await.unwrap().status,
            ContactStatus::DraftReady
        );

        let approved = h.outreach.approve_draft(&draft.id).await.unwrap();
        assert_eq!(approved.status, DraftStatus::Approved);
        assert_eq!(
            h.store.get_campaign_contact(&members[0].id).await.unwrap().status,
            ContactStatus::Approved
        );
        assert_eq!(h.store.get_draft(&draft.id).await.unwrap().subject, "Hello Ada");
    }

    #[tokio::test]
    async fn test_sent_drafts_cannot_be_edited_or_deleted() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let (campaign, members) = h.campaign(&[&ada]).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();
        let draft = first_draft(&h, &members[0]).await;

        let err = h
            .outreach
            .update_draft(
                &draft.id,
                DraftUpdate {
                    status: Some(DraftStatus::Sent),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::Invalid(_)));

        h.outreach.send_draft(&draft.id).await.unwrap();

        let err = h.outreach.approve_draft(&draft.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot edit a sent email");
        let err = h.outreach.delete_draft(&draft.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete a sent email");
    }

    #[tokio::test]
    async fn test_delete_draft_leaves_member_without_draft() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let (campaign, members) = h.campaign(&[&ada]).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();
        let draft = first_draft(&h, &members[0]).await;

        h.outreach.delete_draft(&draft.id).await.unwrap();

        assert!(h.store.get_draft(&draft.id).await.is_err());
        let report = h.outreach.send_all(&campaign.id).await.unwrap();
        assert_eq!(report.results[0].outcome.error(), Some("No draft found"));
    }

    #[tokio::test]
    async fn test_send_all_includes_approved_members() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let grace = h.contact("Grace", Some("grace@example.com")).await;
        let (campaign, members) = h.campaign(&[&ada, &grace]).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();
        let ada_member = members.iter().find(|m| m.contact_id == ada.id).unwrap();
        let draft = first_draft(&h, ada_member).await;
        h.outreach.approve_draft(&draft.id).await.unwrap();

        let report = h.outreach.send_all(&campaign.id).await.unwrap();

        assert_eq!((report.succeeded, report.failed), (2, 0));
        assert_eq!(h.store.get_draft(&draft.id).await.unwrap().status, DraftStatus::Sent);
        assert_eq!(
            h.store.get_campaign(&campaign.id).await.unwrap().status,
            CampaignStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_approved_member_keeps_campaign_open() {
        let h = Harness::new();
        let ada = h.contact("Ada", None).await;
        let (campaign, members) = h.campaign(&[&ada]).await;
        h.outreach.generate_drafts(&campaign.id).await.unwrap();
        let draft = first_draft(&h, &members[0]).await;
        h.outreach.approve_draft(&draft.id).await.unwrap();

        let report = h.outreach.send_all(&campaign.id).await.unwrap();

        assert_eq!(report.results[0].outcome.error(), Some("No email address"));
        assert_eq!(
            h.store.get_campaign(&campaign.id).await.unwrap().status,
            CampaignStatus::Active
        );
    }

    #[tokio::test]
    async fn test_create_template_validation_and_assignment() {
        let h = Harness::new();
        let err = h
            .outreach
            .create_template(NewTemplate {
                name: "Intro".into(),
                subject_template: " ".into(),
                body_instructions: "Be brief".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::Invalid(_)));

        let campaign = h
            .outreach
            .create_campaign(NewCampaign {
                name: "Launch".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let template = h
            .outreach
            .create_template(NewTemplate {
                name: "Intro".into(),
                subject_template: "Quick intro".into(),
                body_instructions: "Be brief".into(),
                campaign_ids: vec![campaign.id.clone()],
            })
            .await
            .unwrap();

        assert_eq!(
            h.store.get_campaign(&campaign.id).await.unwrap().template_id,
            Some(template.id.clone())
        );
        assert_eq!(h.outreach.list_templates().await.unwrap(), vec![template]);
    }

    #[tokio::test]
    async fn test_update_template_reassigns_campaigns() {
        let h = Harness::new();
        let (first, _) = h.campaign(&[]).await;
        let template_id = first.template_id.clone().unwrap();
        let second = h
            .outreach
            .create_campaign(NewCampaign {
                name: "Follow-up".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = h
            .outreach
            .update_template(
                &template_id,
                TemplateUpdate {
                    body_instructions: Some("Mention the launch".into()),
                    campaign_ids: Some(vec![second.id.clone()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.body_instructions, "Mention the launch");
        assert_eq!(updated.subject_template, "Quick intro");
        assert_eq!(h.store.get_campaign(&first.id).await.unwrap().template_id, None);
        assert_eq!(
            h.store.get_campaign(&second.id).await.unwrap().template_id,
            Some(template_id)
        );
    }

    #[tokio::test]
    async fn test_delete_template_leaves_campaign_without_template() {
        let h = Harness::new();
        let ada = h.contact("Ada", Some("ada@example.com")).await;
        let (campaign, _) = h.campaign(&[&ada]).await;

        h.outreach
            .delete_template(campaign.template_id.as_deref().unwrap())
            .await
            .unwrap();

        let err = h.outreach.generate_drafts(&campaign.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Campaign has no template assigned");
        assert!(matches!(
            h.outreach.delete_template("missing").await,
            Err(OutreachError::Store(StoreError::NotFound { .. }))
        ));
    }
}
