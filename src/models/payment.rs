//! Model payment transactions, the local ledger of gateway payments
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use models::newtypes::PaymentTransactionId;
use models::validation_rules::*;
use schema::payment_transactions;

varchar_enum! {
    /// Lifecycle of a payment as reported by the gateway
    pub enum PaymentStatus {
        Initiated => "initiated",
        Created => "created",
        Authorized => "authorized",
        Captured => "captured",
        Refunded => "refunded",
        Failed => "failed",
    }
}

/// DB presenting by payment transaction, amounts in minor currency units
#[derive(Debug, Serialize, Queryable, Clone, PartialEq)]
pub struct PaymentTransaction {
    pub id: PaymentTransactionId,
    pub txn_id: String,
    pub user_email: String,
    pub order_number: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    pub const TXN_ID_LENGTH: usize = 28;

    /// Fresh local reference handed to the gateway as the order receipt.
    pub fn generate_txn_id() -> String {
        let mut txn_id = Uuid::new_v4().to_string().replace("-", "");
        txn_id.truncate(Self::TXN_ID_LENGTH);
        txn_id
    }
}

#[derive(Insertable, Clone, Debug)]
#[table_name = "payment_transactions"]
pub struct NewPaymentTransaction {
    pub txn_id: String,
    pub user_email: String,
    pub order_number: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub gateway_order_id: String,
}

#[derive(AsChangeset, Clone, Debug, Default)]
#[table_name = "payment_transactions"]
pub struct UpdatePaymentTransaction {
    pub status: Option<PaymentStatus>,
    pub gateway_payment_id: Option<String>,
}

/// Payload for starting a checkout
#[derive(Serialize, Deserialize, Validate, Clone, Debug)]
pub struct NewPaymentPayload {
    #[validate(email)]
    pub user_email: String,
    #[validate(length(min = "1", max = "128"))]
    pub order_number: String,
    #[validate(custom = "validate_positive_amount")]
    pub amount: i64,
    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
}

/// Everything the checkout page needs to open the gateway widget
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PaymentCheckout {
    pub txn_id: String,
    pub gateway_order_id: String,
    pub gateway_key: String,
    pub amount: i64,
    pub currency: String,
    pub user_email: String,
}

/// Callback data the gateway widget posts back after payment
#[derive(Serialize, Deserialize, Validate, Clone, Debug)]
pub struct ConfirmPaymentPayload {
    #[validate(length(min = "1"))]
    pub gateway_payment_id: String,
    #[validate(length(min = "1"))]
    pub signature: String,
}

#[derive(Serialize, Deserialize, Validate, Clone, Debug)]
pub struct RefundPaymentPayload {
    #[validate(custom = "validate_positive_amount")]
    pub amount: i64,
    #[validate(custom = "validate_currency")]
    pub currency: String,
}

/// Payment as the gateway reports it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GatewayPayment {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
}

/// Access check of a learner against country embargoes
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EmbargoQuery {
    pub user: String,
    pub ip_address: String,
    pub course_ids: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct EmbargoAccess {
    pub access: bool,
}
