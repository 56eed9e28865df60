//! Model offer assignment email templates
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::ValidationErrors;

use models::newtypes::EmailTemplateId;
use models::validation_rules::*;
use schema::offer_assignment_email_templates;

varchar_enum! {
    pub enum EmailType {
        Assign => "assign",
        Remind => "remind",
        Revoke => "revoke",
    }
}

/// DB presenting by email template
#[derive(Debug, Serialize, Queryable, Clone, PartialEq)]
pub struct EmailTemplate {
    pub id: EmailTemplateId,
    pub enterprise_customer_uuid: Uuid,
    pub email_type: EmailType,
    pub email_greeting: String,
    pub email_closing: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Template as rendered to clients, with the configured body attached
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct EmailTemplateWithBody {
    #[serde(flatten)]
    pub template: EmailTemplate,
    pub email_body: String,
}

#[derive(Insertable, Clone, Debug)]
#[table_name = "offer_assignment_email_templates"]
pub struct NewEmailTemplate {
    pub enterprise_customer_uuid: Uuid,
    pub email_type: EmailType,
    pub email_greeting: String,
    pub email_closing: String,
    pub active: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewEmailTemplatePayload {
    pub email_type: EmailType,
    pub email_greeting: Option<String>,
    pub email_closing: Option<String>,
}

impl NewEmailTemplatePayload {
    pub fn validate_payload(&self) -> Result<(), ValidationErrors> {
        let mut errors = vec![];
        if let Some(Err(e)) = self.email_greeting.as_ref().map(|value| validate_template_field(value)) {
            errors.push(("email_greeting", e));
        }
        if let Some(Err(e)) = self.email_closing.as_ref().map(|value| validate_template_field(value)) {
            errors.push(("email_closing", e));
        }
        collect_errors(errors)
    }

    /// Sanitized row for the given enterprise
    pub fn into_new_template(self, enterprise_customer_uuid: Uuid) -> NewEmailTemplate {
        NewEmailTemplate {
            enterprise_customer_uuid,
            email_type: self.email_type,
            email_greeting: sanitize_markup(&self.email_greeting.unwrap_or_default()),
            email_closing: sanitize_markup(&self.email_closing.unwrap_or_default()),
            active: true,
        }
    }
}

/// Filters for listing templates
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EmailTemplateSearch {
    pub email_type: Option<EmailType>,
    pub active: Option<bool>,
}
