//! Model vouchers
use chrono::{DateTime, Utc};
use uuid::Uuid;

use models::newtypes::{CouponId, VoucherId};
use schema::vouchers;

/// DB presenting by voucher, a single redeemable code
#[derive(Debug, Serialize, Queryable, Clone, PartialEq)]
pub struct Voucher {
    pub id: VoucherId,
    pub coupon_id: CouponId,
    pub code: String,
    pub num_orders: i32,
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    pub const GENERATED_CODE_LENGTH: usize = 16;
}

#[derive(Insertable, Clone, Debug)]
#[table_name = "vouchers"]
pub struct NewVoucher {
    pub coupon_id: CouponId,
    pub code: String,
}

/// Generates a random uppercase code
pub fn generate_voucher_code() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .to_uppercase()
        .chars()
        .take(Voucher::GENERATED_CODE_LENGTH)
        .collect()
}
