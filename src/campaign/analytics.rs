use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{
    error::Result,
    model::{ContactStatus, SentEmail},
    outreach::Outreach,
    service::MailProvider,
    task::{BoxError, TaskRunner},
};

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignAnalytics {
    pub total_contacts: usize,
    pub sent: usize,
    pub draft_ready: usize,
    pub pending: usize,
    /// Percent of members sent, one decimal.
    pub send_rate: f64,
    pub opened: usize,
    pub open_rate: f64,
    pub replies_detected: usize,
    pub reply_checked_count: usize,
    pub reply_rate: f64,
    pub avg_hours_to_send: f64,
    pub send_timeline: Vec<TimelinePoint>,
}

/// Looks one sent thread up and reports whether the recipient wrote back.
struct ReplyCheck<'a> {
    mail: &'a dyn MailProvider,
    sender: String,
}

#[async_trait]
impl TaskRunner for ReplyCheck<'_> {
    type Item = String;
    type Output = bool;

    async fn run(&self, thread_id: String) -> std::result::Result<bool, BoxError> {
        let thread = self.mail.fetch_thread(&thread_id).await?;
        Ok(thread.has_reply_from_other(&self.sender))
    }
}

impl Outreach {
    #[instrument(name = "campaign_analytics", skip(self))]
    pub async fn analytics(&self, campaign_id: &str) -> Result<CampaignAnalytics> {
        let campaign = self.store.get_campaign(campaign_id).await?;

        let total_contacts = self.store.count_campaign_contacts(campaign_id, &[]).await?;
        let sent = self
            .store
            .count_campaign_contacts(campaign_id, &[ContactStatus::Sent])
            .await?;
        let draft_ready = self
            .store
            .count_campaign_contacts(campaign_id, &[ContactStatus::DraftReady])
            .await?;
        let pending = self
            .store
            .count_campaign_contacts(campaign_id, &[ContactStatus::Pending])
            .await?;
        let opened = self.store.count_opened(campaign_id).await?;
        let sent_emails = self.store.sent_emails_for_campaign(campaign_id).await?;

        let avg_hours_to_send = if sent_emails.is_empty() {
            0.0
        } else {
            let total_ms: i64 = sent_emails
                .iter()
                .map(|email| (email.sent_at - campaign.created_at).num_milliseconds())
                .sum();
            round_one_decimal(total_ms as f64 / sent_emails.len() as f64 / MS_PER_HOUR)
        };

        let thread_ids: Vec<String> = sent_emails
            .iter()
            .take(self.config.reply_check_limit)
            .filter_map(|email| email.thread_id.clone())
            .collect();
        let reply_checked_count = thread_ids.len();
        let replies_detected = self.count_replies(thread_ids).await;

        Ok(CampaignAnalytics {
            total_contacts,
            sent,
            draft_ready,
            pending,
            send_rate: percent(sent, total_contacts),
            opened,
            open_rate: percent(opened, sent),
            replies_detected,
            reply_checked_count,
            reply_rate: percent(replies_detected, reply_checked_count),
            avg_hours_to_send,
            send_timeline: send_timeline(&sent_emails),
        })
    }

    /// Threads with a reply. Mail provider failures count as "no reply".
    async fn count_replies(&self, thread_ids: Vec<String>) -> usize {
        if thread_ids.is_empty() {
            return 0;
        }

        let sender = match self.mail.sender_address().await {
            Ok(address) => address,
            Err(err) => {
                warn!(error = %err, "reply detection skipped");
                return 0;
            }
        };

        let check = ReplyCheck {
            mail: self.mail.as_ref(),
            sender,
        };
        self.runner
            .run_items(&check, thread_ids)
            .await
            .iter()
            .filter(|outcome| outcome.success().copied().unwrap_or(false))
            .count()
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_one_decimal(part as f64 / whole as f64 * 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn send_timeline(sent_emails: &[SentEmail]) -> Vec<TimelinePoint> {
    let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for email in sent_emails {
        *days.entry(email.sent_at.date_naive()).or_default() += 1;
    }
    days.into_iter()
        .map(|(date, count)| TimelinePoint { date, count })
        .collect()
}
