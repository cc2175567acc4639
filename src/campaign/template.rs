use std::collections::HashSet;

use tracing::{info, instrument};

use crate::{
    error::{OutreachError, Result},
    model::{RecordId, Template},
    outreach::Outreach,
};

#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    pub name: String,
    pub subject_template: String,
    pub body_instructions: String,
    /// Campaigns switched to the new template.
    pub campaign_ids: Vec<RecordId>,
}

/// Edits to a template. `None` leaves a field as it is; `campaign_ids` replaces the set of
/// campaigns using the template.
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub subject_template: Option<String>,
    pub body_instructions: Option<String>,
    pub campaign_ids: Option<Vec<RecordId>>,
}

impl Outreach {
    pub async fn create_template(&self, new: NewTemplate) -> Result<Template> {
        if [&new.name, &new.subject_template, &new.body_instructions]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(OutreachError::invalid(
                "Template name, subject and body instructions are required",
            ));
        }

        let template = Template::new(new.name, new.subject_template, new.body_instructions);
        self.store.insert_template(template.clone()).await?;
        for campaign_id in &new.campaign_ids {
            self.store
                .set_campaign_template(campaign_id, Some(&template.id))
                .await?;
        }

        info!(template_id = %template.id, campaigns = new.campaign_ids.len(), "template_created");
        Ok(template)
    }

    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        Ok(self.store.list_templates().await?)
    }

    #[instrument(name = "template_update", skip(self, update))]
    pub async fn update_template(&self, template_id: &str, update: TemplateUpdate) -> Result<Template> {
        let mut template = self.store.get_template(template_id).await?;
        if let Some(name) = update.name {
            template.name = name;
        }
        if let Some(subject_template) = update.subject_template {
            template.subject_template = subject_template;
        }
        if let Some(body_instructions) = update.body_instructions {
            template.body_instructions = body_instructions;
        }
        self.store.update_template(&template).await?;

        if let Some(campaign_ids) = update.campaign_ids {
            let keep: HashSet<&str> = campaign_ids.iter().map(String::as_str).collect();
            for campaign in self.store.campaigns_for_template(template_id).await? {
                if !keep.contains(campaign.id.as_str()) {
                    self.store.set_campaign_template(&campaign.id, None).await?;
                }
            }
            for campaign_id in &campaign_ids {
                self.store
                    .set_campaign_template(campaign_id, Some(template_id))
                    .await?;
            }
        }

        Ok(template)
    }

    /// Delete a template. Campaigns using it are left without one.
    pub async fn delete_template(&self, template_id: &str) -> Result<()> {
        self.store.delete_template(template_id).await?;
        info!(template_id, "template_deleted");
        Ok(())
    }
}
