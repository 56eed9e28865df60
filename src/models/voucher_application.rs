//! Model voucher applications, one row per redemption
use chrono::{DateTime, Utc};
use validator::Validate;

use models::newtypes::{VoucherApplicationId, VoucherId};
use schema::voucher_applications;

#[derive(Debug, Serialize, Queryable, Clone, PartialEq)]
pub struct VoucherApplication {
    pub id: VoucherApplicationId,
    pub voucher_id: VoucherId,
    pub user_email: String,
    pub order_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Clone, Debug)]
#[table_name = "voucher_applications"]
pub struct NewVoucherApplication {
    pub voucher_id: VoucherId,
    pub user_email: String,
    pub order_number: String,
}

/// Payload for recording a redemption of a code
#[derive(Serialize, Deserialize, Validate, Clone, Debug)]
pub struct RedeemPayload {
    #[validate(length(min = "1"))]
    pub code: String,
    #[validate(email)]
    pub user_email: String,
    #[validate(length(min = "1", max = "128"))]
    pub order_number: String,
}

/// Result of checking whether a customer may redeem a code
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum VoucherValidate {
    NotActive,
    HasExpired,
    AlreadyActivated,
    NoActivationsAvailable,
    AssignedToAnotherCustomer,
    Valid,
}
