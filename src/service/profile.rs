use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDate {
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<ProfileDate>,
    pub ends_at: Option<ProfileDate>,
}

impl Experience {
    pub fn is_current(&self) -> bool {
        self.ends_at.is_none()
    }
}

/// Public profile data returned by the enrichment provider.
///
/// Fields the crate does not interpret are kept in `extra` so the stored profile stays
/// complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileData {
    pub public_identifier: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub experiences: Vec<Experience>,
    pub personal_emails: Vec<String>,
    pub work_email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProfileData {
    /// Work email first, then the first personal email.
    pub fn preferred_email(&self) -> Option<&str> {
        self.work_email
            .as_deref()
            .or_else(|| self.personal_emails.first().map(String::as_str))
    }

    /// The first experience without an end date, falling back to the first listed.
    pub fn current_experience(&self) -> Option<&Experience> {
        self.experiences
            .iter()
            .find(|experience| experience.is_current())
            .or_else(|| self.experiences.first())
    }

    pub fn current_company(&self) -> Option<&str> {
        self.current_experience()?.company.as_deref()
    }

    pub fn current_title(&self) -> Option<&str> {
        self.current_experience()?.title.as_deref()
    }

    pub fn current_experiences(&self, limit: usize) -> Vec<&Experience> {
        self.experiences
            .iter()
            .filter(|experience| experience.is_current())
            .take(limit)
            .collect()
    }
}

#[async_trait]
pub trait ProfileEnricher: Send + Sync {
    async fn enrich(&self, profile_url: &str) -> Result<ProfileData, ServiceError>;
}

/// Canonical form of a LinkedIn profile URL: scheme added, trailing slash removed.
pub fn normalize_profile_url(url: &str) -> Result<String, ServiceError> {
    let mut cleaned = url.trim().to_string();
    if !cleaned.starts_with("http") {
        cleaned = format!("https://{cleaned}");
    }
    if cleaned.ends_with('/') {
        cleaned.pop();
    }
    if !cleaned.contains("linkedin.com/in/") {
        return Err(ServiceError::InvalidProfileUrl(url.to_string()));
    }
    Ok(cleaned)
}
