use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::ServiceError,
    service::{Message, ProfileData},
};

/// Instructions for the model; clients send it as the system prompt.
pub const SYSTEM_PROMPT: &str = "You are an expert email copywriter helping compose personalized outreach emails.
Write professional, warm, and concise emails. Personalize based on the contact's background.
Always return a JSON object with \"subject\" and \"body\" fields.
The body should be in HTML format with <p> tags for paragraphs and <br> for line breaks.";

const MAX_HISTORY: usize = 5;
const HISTORY_BODY_CHARS: usize = 200;
const MAX_CURRENT_EXPERIENCES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDraft {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub from: String,
    pub subject: String,
    pub body: String,
    pub date: String,
}

impl From<Message> for HistoryEntry {
    fn from(message: Message) -> Self {
        Self {
            from: message.from,
            subject: message.subject,
            body: message.body,
            date: message.date,
        }
    }
}

/// Everything the generator knows about one contact when drafting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftContext {
    pub contact_name: String,
    pub contact_email: Option<String>,
    pub contact_company: Option<String>,
    pub contact_title: Option<String>,
    pub profile: Option<ProfileData>,
    /// Most recent first.
    pub history: Vec<HistoryEntry>,
    pub template_subject: String,
    pub template_instructions: String,
    pub campaign_context: Option<String>,
}

impl DraftContext {
    /// The user prompt for one personalized draft.
    pub fn render_prompt(&self) -> String {
        let mut sections = Vec::new();

        sections.push(format!(
            "## Contact Information\n- Name: {}\n- Email: {}\n- Company: {}\n- Title: {}",
            self.contact_name,
            self.contact_email.as_deref().unwrap_or("Unknown"),
            self.contact_company.as_deref().unwrap_or("Unknown"),
            self.contact_title.as_deref().unwrap_or("Unknown"),
        ));

        if let Some(profile) = &self.profile {
            let experiences =
                serde_json::to_string_pretty(&profile.current_experiences(MAX_CURRENT_EXPERIENCES))
                    .unwrap_or_else(|_| "[]".to_string());
            sections.push(format!(
                "## LinkedIn Profile\n- Headline: {}\n- Summary: {}\n- Current experiences: {}",
                profile.headline.as_deref().unwrap_or("N/A"),
                profile.summary.as_deref().unwrap_or("N/A"),
                experiences,
            ));
        }

        if !self.history.is_empty() {
            let mut section = String::from("## Email History (most recent first)");
            for entry in self.history.iter().take(MAX_HISTORY) {
                let excerpt: String = entry.body.chars().take(HISTORY_BODY_CHARS).collect();
                section.push_str(&format!(
                    "\n- [{}] From: {} | Subject: {}\n  {}...",
                    entry.date, entry.from, entry.subject, excerpt
                ));
            }
            sections.push(section);
        }

        if let Some(context) = &self.campaign_context {
            sections.push(format!("## Campaign Context\n{context}"));
        }

        sections.push(format!(
            "## Template Instructions\nSubject template: {}\nInstructions: {}",
            self.template_subject, self.template_instructions
        ));

        format!(
            "Generate a personalized email for this contact based on the template instructions.\n\n{}\n\nReturn ONLY a JSON object with \"subject\" and \"body\" fields. No other text.",
            sections.join("\n\n")
        )
    }
}

#[async_trait]
pub trait DraftGenerator: Send + Sync {
    async fn generate_draft(&self, context: &DraftContext) -> Result<GeneratedDraft, ServiceError>;
}

/// Pull the `{"subject", "body"}` object out of a model reply that may carry surrounding text.
pub fn parse_generated_draft(text: &str) -> Result<GeneratedDraft, ServiceError> {
    let object = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(ServiceError::MalformedResponse(
                "Failed to parse AI response as JSON".to_string(),
            ));
        }
    };

    serde_json::from_str(object).map_err(|err| ServiceError::MalformedResponse(err.to_string()))
}
