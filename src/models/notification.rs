//! Outbound notifications handed to the delivery queue
use models::newtypes::CouponId;
use models::validation_rules::sanitize_markup;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Assign,
    Remind,
    Revoke,
    NewCodes,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub coupon_id: CouponId,
    pub recipient: String,
    pub codes: Vec<String>,
    pub template: String,
    pub greeting: String,
    pub closing: String,
    pub redemptions_remaining: Option<i32>,
}

impl Notification {
    pub fn new(kind: NotificationKind, coupon_id: CouponId, recipient: String, codes: Vec<String>) -> Self {
        Self {
            kind,
            coupon_id,
            recipient,
            codes,
            template: String::default(),
            greeting: String::default(),
            closing: String::default(),
            redemptions_remaining: None,
        }
    }

    /// Attaches template text; greeting and closing are escaped.
    pub fn with_template(mut self, template: String, greeting: Option<&String>, closing: Option<&String>) -> Self {
        self.template = template;
        self.greeting = greeting.map(|s| sanitize_markup(s)).unwrap_or_default();
        self.closing = closing.map(|s| sanitize_markup(s)).unwrap_or_default();
        self
    }

    pub fn with_redemptions_remaining(mut self, redemptions_remaining: i32) -> Self {
        self.redemptions_remaining = Some(redemptions_remaining);
        self
    }
}
