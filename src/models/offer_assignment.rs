//! Model offer assignments, the ledger binding a code to a recipient email
use chrono::{DateTime, Utc};
use validator::ValidationErrors;

use models::newtypes::{CouponId, OfferAssignmentId, VoucherId};
use models::validation_rules::*;
use schema::offer_assignments;

varchar_enum! {
    pub enum OfferAssignmentStatus {
        Assigned => "assigned",
        Redeemed => "redeemed",
        PartiallyRedeemed => "partially-redeemed",
        Revoked => "revoked",
        EmailBounced => "email-bounced",
    }
}

impl OfferAssignmentStatus {
    /// Active assignments hold one use-slot of their voucher.
    pub fn is_active(&self) -> bool {
        match *self {
            OfferAssignmentStatus::Assigned | OfferAssignmentStatus::PartiallyRedeemed | OfferAssignmentStatus::EmailBounced => true,
            OfferAssignmentStatus::Redeemed | OfferAssignmentStatus::Revoked => false,
        }
    }
}

/// DB presenting by offer assignment
#[derive(Debug, Serialize, Queryable, Clone, PartialEq)]
pub struct OfferAssignment {
    pub id: OfferAssignmentId,
    pub voucher_id: VoucherId,
    pub code: String,
    pub user_email: String,
    pub status: OfferAssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OfferAssignment {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[table_name = "offer_assignments"]
pub struct NewOfferAssignment {
    pub voucher_id: VoucherId,
    pub code: String,
    pub user_email: String,
    pub status: OfferAssignmentStatus,
}

/// Payload for assigning codes to recipients
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssignCodesPayload {
    pub template: String,
    pub template_greeting: Option<String>,
    pub template_closing: Option<String>,
    pub emails: Vec<String>,
    #[serde(default)]
    pub codes: Vec<String>,
}

impl AssignCodesPayload {
    pub fn validate_payload(&self) -> Result<(), ValidationErrors> {
        validate_emails(&self.emails)?;
        let mut errors = template_errors(&self.template_greeting, &self.template_closing);
        if self.template.trim().is_empty() {
            errors.push(("template", validation_error("required", "Template is required.".to_string())));
        }
        collect_errors(errors)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EmailCodePair {
    pub email: String,
    pub code: String,
}

/// Payload for revoking assignments
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RevokeCodesPayload {
    pub assignments: Vec<EmailCodePair>,
    pub template: Option<String>,
    pub template_greeting: Option<String>,
    pub template_closing: Option<String>,
}

impl RevokeCodesPayload {
    pub fn validate_payload(&self) -> Result<(), ValidationErrors> {
        let mut errors = template_errors(&self.template_greeting, &self.template_closing);
        if self.assignments.is_empty() {
            errors.push((
                "assignments",
                validation_error("required", "At least one assignment is required.".to_string()),
            ));
        }
        collect_errors(errors)
    }
}

varchar_enum! {
    /// Bucket a code (or an assignment) falls in by its redemption progress
    pub enum CodeFilter {
        Unassigned => "unassigned",
        Unredeemed => "unredeemed",
        PartiallyRedeemed => "partially-redeemed",
        Redeemed => "redeemed",
    }
}

/// Payload for reminding recipients, either explicit pairs or a code filter
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RemindCodesPayload {
    pub assignments: Option<Vec<EmailCodePair>>,
    pub code_filter: Option<String>,
    pub template: String,
    pub template_greeting: Option<String>,
    pub template_closing: Option<String>,
}

/// Resolved reminder targets
#[derive(Clone, Debug, PartialEq)]
pub enum RemindTargets {
    Pairs(Vec<EmailCodePair>),
    Filter(CodeFilter),
}

impl RemindCodesPayload {
    pub fn validate_payload(&self) -> Result<RemindTargets, ValidationErrors> {
        collect_errors(template_errors(&self.template_greeting, &self.template_closing))?;
        if self.template.trim().is_empty() {
            return Err(single_error("template", "required", "Template is required.".to_string()));
        }

        match (&self.assignments, &self.code_filter) {
            (Some(assignments), _) if !assignments.is_empty() => Ok(RemindTargets::Pairs(assignments.clone())),
            (_, None) => Err(single_error(
                "code_filter",
                "required",
                "code_filter must be specified".to_string(),
            )),
            (_, Some(code_filter)) => match code_filter.parse::<CodeFilter>() {
                Ok(filter @ CodeFilter::Unredeemed) | Ok(filter @ CodeFilter::PartiallyRedeemed) => Ok(RemindTargets::Filter(filter)),
                _ => Err(single_error(
                    "code_filter",
                    "invalid",
                    format!("Invalid code_filter specified: {}", code_filter),
                )),
            },
        }
    }
}

fn template_errors(greeting: &Option<String>, closing: &Option<String>) -> Vec<(&'static str, ::validator::ValidationError)> {
    let mut errors = vec![];
    if let Some(Err(e)) = greeting.as_ref().map(|value| validate_template_field(value)) {
        errors.push(("template_greeting", e));
    }
    if let Some(Err(e)) = closing.as_ref().map(|value| validate_template_field(value)) {
        errors.push(("template_closing", e));
    }
    errors
}

varchar_enum! {
    pub enum ItemDetail {
        Success => "success",
        Failure => "failure",
    }
}

/// Outcome of one assignment created by an assign request
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AssignedCode {
    pub id: OfferAssignmentId,
    pub code: String,
    pub user_email: String,
    pub notification: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AssignCodesResponse {
    pub coupon_id: CouponId,
    pub offer_assignments: Vec<AssignedCode>,
}

/// Per-item outcome of revoke and remind requests
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ItemResult {
    pub code: String,
    pub email: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemResult {
    pub fn success(pair: &EmailCodePair) -> Self {
        Self {
            code: pair.code.clone(),
            email: pair.email.clone(),
            detail: ItemDetail::Success.to_string(),
            message: None,
        }
    }

    pub fn failure(pair: &EmailCodePair, message: String) -> Self {
        Self {
            code: pair.code.clone(),
            email: pair.email.clone(),
            detail: ItemDetail::Failure.to_string(),
            message: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.detail == ItemDetail::Success.as_str()
    }
}
