use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    error::{OutreachError, Result},
    model::Contact,
    outreach::Outreach,
};

/// One row of an uploaded contact list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportRow {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Valid rows that matched an existing contact.
    pub skipped: usize,
    pub errors: Vec<String>,
}

fn cleaned(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl ImportRow {
    /// Normalized contact for this row, or `None` when it has neither a usable email nor a
    /// profile URL.
    fn to_contact(&self) -> Option<Contact> {
        let email = cleaned(self.email.as_deref())
            .map(|email| email.to_lowercase())
            .filter(|email| email.contains('@'));
        let linkedin_url = cleaned(self.linkedin_url.as_deref());

        if email.is_none() && linkedin_url.is_none() {
            return None;
        }

        Some(Contact {
            first_name: cleaned(self.first_name.as_deref()),
            last_name: cleaned(self.last_name.as_deref()),
            email,
            linkedin_url,
            ..Contact::new()
        })
    }
}

impl Outreach {
    #[instrument(name = "contacts_import", skip_all, fields(rows = rows.len()))]
    pub async fn import_contacts(&self, rows: &[ImportRow]) -> Result<ImportReport> {
        if rows.is_empty() {
            return Err(OutreachError::invalid("No contacts provided"));
        }
        if rows.len() > self.config.max_import {
            return Err(OutreachError::invalid(format!(
                "Maximum {} contacts per import",
                self.config.max_import
            )));
        }

        let mut valid = Vec::new();
        let mut errors = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            match row.to_contact() {
                Some(contact) => valid.push(contact),
                None => errors.push(format!(
                    "Row {}: must have a valid email or LinkedIn URL",
                    i + 1
                )),
            }
        }

        if valid.is_empty() {
            return Err(OutreachError::invalid(format!(
                "No valid contacts found: {}",
                errors.join("; ")
            )));
        }

        let total = valid.len();
        let mut imported = 0;
        for contact in valid {
            if self.store.insert_contact(contact).await? {
                imported += 1;
            }
        }

        info!(imported, skipped = total - imported, invalid = errors.len(), "contacts_imported");
        Ok(ImportReport {
            imported,
            skipped: total - imported,
            errors,
        })
    }
}
