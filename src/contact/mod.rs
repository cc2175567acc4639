//! Contacts: creation, bulk import, tagging, filtered listing and profile enrichment.

mod enrich;
mod import;
mod tags;

pub use import::{ImportReport, ImportRow};
pub use tags::{TagRef, TagSummary, TagUpdate};

use tracing::info;

use crate::{
    error::{OutreachError, Result},
    model::{Contact, ContactFilter},
    outreach::Outreach,
};

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Outreach {
    /// Create one contact. It needs an email or a profile URL, and the email must be unused.
    pub async fn create_contact(&self, new: NewContact) -> Result<Contact> {
        let email = non_empty(new.email).map(|email| email.to_lowercase());
        let linkedin_url = non_empty(new.linkedin_url);
        if email.is_none() && linkedin_url.is_none() {
            return Err(OutreachError::invalid(
                "At least one of email or LinkedIn URL must be provided",
            ));
        }

        let contact = Contact {
            first_name: non_empty(new.first_name),
            last_name: non_empty(new.last_name),
            email,
            linkedin_url,
            ..Contact::new()
        };
        if !self.store.insert_contact(contact.clone()).await? {
            return Err(OutreachError::conflict("A contact with this email already exists"));
        }

        info!(contact_id = %contact.id, "contact_created");
        Ok(contact)
    }

    /// Contacts matching `filter`, newest first.
    pub async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>> {
        Ok(self.store.list_contacts(filter).await?)
    }
}
