//! In-memory fakes of the remote collaborators, shared by unit tests.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::{
    config::OutreachConfig,
    error::ServiceError,
    model::{Campaign, CampaignContact, Contact, Template},
    outreach::Outreach,
    service::{
        DraftContext, DraftGenerator, GeneratedDraft, MailProvider, Message, ProfileData,
        ProfileEnricher, SentMessage, Thread,
    },
    store::{MemoryStore, Store},
};

pub(crate) const SENDER: &str = "me@outreach.example";

#[derive(Debug, Clone)]
pub(crate) struct Delivery {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub(crate) struct FakeMail {
    pub history: DashMap<String, Vec<Thread>>,
    pub threads: DashMap<String, Thread>,
    pub rejected_recipients: DashSet<String>,
    pub broken_threads: DashSet<String>,
    pub no_profile: AtomicBool,
    pub history_failures: DashSet<String>,
    pub deliveries: Mutex<Vec<Delivery>>,
    sequence: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeMail {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Make the thread of a sent message contain a message from `from`.
    pub fn reply(&self, thread_id: &str, from: &str) {
        if let Some(mut thread) = self.threads.get_mut(thread_id) {
            thread.messages.push(Message {
                thread_id: thread_id.to_string(),
                from: from.to_string(),
                ..Default::default()
            });
        }
    }
}

#[async_trait]
impl MailProvider for FakeMail {
    async fn fetch_threads(&self, address: &str, limit: usize) -> Result<Vec<Thread>, ServiceError> {
        if self.history_failures.contains(address) {
            return Err(ServiceError::Mail(format!("history unavailable for {address}")));
        }
        Ok(self
            .history
            .get(address)
            .map(|threads| threads.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_thread(&self, thread_id: &str) -> Result<Thread, ServiceError> {
        if self.broken_threads.contains(thread_id) {
            return Err(ServiceError::Mail(format!("thread {thread_id} unavailable")));
        }
        self.threads
            .get(thread_id)
            .map(|thread| thread.clone())
            .ok_or_else(|| ServiceError::Mail(format!("thread {thread_id} not found")))
    }

    async fn send_message(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<SentMessage, ServiceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(3)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.rejected_recipients.contains(to) {
            return Err(anyhow::anyhow!("recipient {to} rejected").into());
        }

        let n = self.sequence.fetch_add(1, Ordering::SeqCst);
        let sent = SentMessage {
            message_id: format!("message-{n}"),
            thread_id: format!("thread-{n}"),
        };
        self.threads.insert(
            sent.thread_id.clone(),
            Thread {
                id: sent.thread_id.clone(),
                subject: subject.to_string(),
                snippet: String::new(),
                messages: vec![Message {
                    id: sent.message_id.clone(),
                    thread_id: sent.thread_id.clone(),
                    from: format!("Me <{SENDER}>"),
                    to: to.to_string(),
                    subject: subject.to_string(),
                    body: html_body.to_string(),
                    ..Default::default()
                }],
            },
        );
        self.deliveries.lock().unwrap().push(Delivery {
            to: to.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        Ok(sent)
    }

    async fn sender_address(&self) -> Result<String, ServiceError> {
        if self.no_profile.load(Ordering::SeqCst) {
            return Err(ServiceError::Mail("profile unavailable".into()));
        }
        Ok(SENDER.to_string())
    }
}

#[derive(Default)]
pub(crate) struct FakeGenerator {
    /// Contact names the generator refuses.
    pub refuse: DashSet<String>,
    pub contexts: Mutex<Vec<DraftContext>>,
}

#[async_trait]
impl DraftGenerator for FakeGenerator {
    async fn generate_draft(&self, context: &DraftContext) -> Result<GeneratedDraft, ServiceError> {
        tokio::task::yield_now().await;
        self.contexts.lock().unwrap().push(context.clone());
        if self.refuse.contains(&context.contact_name) {
            return Err(ServiceError::Generation(format!(
                "model refused {}",
                context.contact_name
            )));
        }
        Ok(GeneratedDraft {
            subject: format!("{} for {}", context.template_subject, context.contact_name),
            body: format!("<p>Hi {}</p>", context.contact_name),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeEnricher {
    pub profiles: DashMap<String, ProfileData>,
}

#[async_trait]
impl ProfileEnricher for FakeEnricher {
    async fn enrich(&self, profile_url: &str) -> Result<ProfileData, ServiceError> {
        self.profiles
            .get(profile_url)
            .map(|profile| profile.clone())
            .ok_or_else(|| ServiceError::Enrichment(format!("no profile for {profile_url}")))
    }
}

pub(crate) struct Harness {
    pub store: Arc<MemoryStore>,
    pub mail: Arc<FakeMail>,
    pub generator: Arc<FakeGenerator>,
    pub enricher: Arc<FakeEnricher>,
    pub outreach: Outreach,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(OutreachConfig {
            base_url: "https://outreach.example".into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: OutreachConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mail = Arc::new(FakeMail::default());
        let generator = Arc::new(FakeGenerator::default());
        let enricher = Arc::new(FakeEnricher::default());
        let outreach = Outreach::new(
            config,
            store.clone(),
            mail.clone(),
            generator.clone(),
            enricher.clone(),
        )
        .unwrap();

        Self {
            store,
            mail,
            generator,
            enricher,
            outreach,
        }
    }

    pub async fn template(&self) -> Template {
        let template = Template::new("Intro", "Quick intro", "Mention their current role");
        self.store.insert_template(template.clone()).await.unwrap();
        template
    }

    pub async fn contact(&self, first_name: &str, email: Option<&str>) -> Contact {
        let contact = Contact {
            first_name: Some(first_name.to_string()),
            email: email.map(str::to_string),
            ..Contact::new()
        };
        assert!(self.store.insert_contact(contact.clone()).await.unwrap());
        contact
    }

    /// A campaign with a template and one member per contact.
    pub async fn campaign(&self, contacts: &[&Contact]) -> (Campaign, Vec<CampaignContact>) {
        let template = self.template().await;
        let campaign = self
            .outreach
            .create_campaign(crate::campaign::NewCampaign {
                name: "Launch".into(),
                context: Some("Product launch".into()),
                template_id: Some(template.id),
                contact_ids: contacts.iter().map(|c| c.id.clone()).collect(),
                ..Default::default()
            })
            .await
            .unwrap();
        let members = self
            .store
            .list_campaign_contacts(&campaign.id, &[])
            .await
            .unwrap();
        (campaign, members)
    }
}
