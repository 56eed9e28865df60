//! Model coupons: the offer record owning a batch of vouchers
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use models::newtypes::CouponId;
use models::validation_rules::*;
use schema::coupons;

varchar_enum! {
    /// Who may redeem a voucher and how many times
    pub enum VoucherType {
        SingleUse => "single_use",
        MultiUse => "multi_use",
        OncePerCustomer => "once_per_customer",
        MultiUsePerCustomer => "multi_use_per_customer",
    }
}

impl VoucherType {
    pub fn display_name(&self) -> &'static str {
        match *self {
            VoucherType::SingleUse => "Single use",
            VoucherType::MultiUse => "Multi-use",
            VoucherType::OncePerCustomer => "Once per customer",
            VoucherType::MultiUsePerCustomer => "Multi-use per customer",
        }
    }

    /// `None` means the caller has to provide `max_uses` explicitly.
    pub fn default_max_uses(&self) -> Option<i32> {
        match *self {
            VoucherType::SingleUse => Some(1),
            VoucherType::MultiUse | VoucherType::OncePerCustomer => Some(Coupon::DEFAULT_MAX_USES),
            VoucherType::MultiUsePerCustomer => None,
        }
    }
}

varchar_enum! {
    pub enum BenefitType {
        Percentage => "percentage",
        Absolute => "absolute",
    }
}

impl BenefitType {
    pub fn display_name(&self) -> &'static str {
        match *self {
            BenefitType::Percentage => "Percentage",
            BenefitType::Absolute => "Absolute",
        }
    }
}

/// DB presenting by coupon
#[derive(Debug, Serialize, Queryable, Clone)]
pub struct Coupon {
    pub id: CouponId,
    pub title: String,
    pub enterprise_customer_uuid: Uuid,
    pub enterprise_customer_name: String,
    pub enterprise_catalog_uuid: Option<Uuid>,
    pub voucher_type: VoucherType,
    pub max_uses: i32,
    pub benefit_type: BenefitType,
    pub benefit_value: f64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub is_active: bool,
    pub notify_email: Option<String>,
    pub contract_discount_type: Option<BenefitType>,
    pub contract_discount_value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    pub const DEFAULT_MAX_USES: i32 = 10000;
    pub const MAX_MAX_USES: i32 = 10000;
    pub const MAX_QUANTITY: i32 = 10000;

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_at <= now && now < self.end_at
    }
}

/// Payload for creating coupon together with its vouchers
#[derive(Serialize, Deserialize, Validate, Clone, Debug)]
pub struct NewCouponPayload {
    #[validate(length(min = "1", max = "255"))]
    pub title: String,
    pub enterprise_customer_uuid: Uuid,
    #[validate(length(min = "1", max = "255"))]
    pub enterprise_customer_name: String,
    pub enterprise_catalog_uuid: Option<Uuid>,
    pub voucher_type: VoucherType,
    pub max_uses: Option<i32>,
    #[validate(range(min = "1", max = "10000"))]
    pub quantity: i32,
    #[validate(custom = "validate_voucher_code")]
    pub code: Option<String>,
    pub benefit_type: BenefitType,
    #[validate(custom = "validate_non_negative")]
    pub benefit_value: f64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[validate(email)]
    pub notify_email: Option<String>,
    pub contract_discount_type: Option<BenefitType>,
    #[validate(custom = "validate_non_negative")]
    pub contract_discount_value: Option<f64>,
}

impl NewCouponPayload {
    /// Field validation plus the rules spanning several fields.
    pub fn validate_payload(&self) -> Result<(), ValidationErrors> {
        self.validate()?;

        let mut errors = vec![];
        if self.start_at >= self.end_at {
            errors.push((
                "end_at",
                validation_error("range", "End datetime must be after start datetime.".to_string()),
            ));
        }
        if let Some(error) = check_max_uses(self.voucher_type, self.max_uses) {
            errors.push(("max_uses", error));
        }
        if self.voucher_type == VoucherType::MultiUsePerCustomer && self.max_uses.is_none() {
            errors.push((
                "max_uses",
                validation_error("required", "Max uses is required for multi-use per customer vouchers.".to_string()),
            ));
        }
        if self.code.is_some() && self.quantity != 1 {
            errors.push((
                "code",
                validation_error("quantity", "A custom code can only be set when quantity is 1.".to_string()),
            ));
        }
        if self.benefit_type == BenefitType::Percentage && self.benefit_value > 100f64 {
            errors.push((
                "benefit_value",
                validation_error("range", "Percentage benefit can not exceed 100.".to_string()),
            ));
        }
        if let (Some(BenefitType::Percentage), Some(value)) = (self.contract_discount_type, self.contract_discount_value) {
            if value > 100f64 {
                errors.push((
                    "contract_discount_value",
                    validation_error("range", "Percentage discounts cannot be greater than 100%.".to_string()),
                ));
            }
        }
        collect_errors(errors)
    }

    pub fn resolve_max_uses(&self) -> i32 {
        self.max_uses
            .or_else(|| self.voucher_type.default_max_uses())
            .unwrap_or(Coupon::DEFAULT_MAX_USES)
    }
}

/// Checks `max_uses` against the voucher type, `None` means valid.
pub fn check_max_uses(voucher_type: VoucherType, max_uses: Option<i32>) -> Option<::validator::ValidationError> {
    match max_uses {
        Some(_) if voucher_type == VoucherType::SingleUse => Some(validation_error(
            "max_uses",
            "Max uses can not be set for single use vouchers.".to_string(),
        )),
        Some(value) if value < 1 => Some(validation_error("range", "Max uses must be a positive number.".to_string())),
        Some(value) if value > Coupon::MAX_MAX_USES => Some(validation_error(
            "range",
            format!("Max uses can not exceed {}.", Coupon::MAX_MAX_USES),
        )),
        _ => None,
    }
}

/// Row inserted for a new coupon
#[derive(Insertable, Clone, Debug)]
#[table_name = "coupons"]
pub struct NewCoupon {
    pub title: String,
    pub enterprise_customer_uuid: Uuid,
    pub enterprise_customer_name: String,
    pub enterprise_catalog_uuid: Option<Uuid>,
    pub voucher_type: VoucherType,
    pub max_uses: i32,
    pub benefit_type: BenefitType,
    pub benefit_value: f64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub notify_email: Option<String>,
    pub contract_discount_type: Option<BenefitType>,
    pub contract_discount_value: Option<f64>,
}

impl From<NewCouponPayload> for NewCoupon {
    fn from(payload: NewCouponPayload) -> Self {
        let max_uses = payload.resolve_max_uses();
        Self {
            title: payload.title,
            enterprise_customer_uuid: payload.enterprise_customer_uuid,
            enterprise_customer_name: payload.enterprise_customer_name,
            enterprise_catalog_uuid: payload.enterprise_catalog_uuid,
            voucher_type: payload.voucher_type,
            max_uses,
            benefit_type: payload.benefit_type,
            benefit_value: payload.benefit_value,
            start_at: payload.start_at,
            end_at: payload.end_at,
            notify_email: payload.notify_email,
            contract_discount_type: payload.contract_discount_type,
            contract_discount_value: payload.contract_discount_value,
        }
    }
}

/// Payload for updating coupon
#[derive(Serialize, Deserialize, AsChangeset, Validate, Clone, Debug, Default)]
#[table_name = "coupons"]
pub struct UpdateCoupon {
    #[validate(length(min = "1", max = "255"))]
    pub title: Option<String>,
    pub max_uses: Option<i32>,
    #[validate(custom = "validate_non_negative")]
    pub benefit_value: Option<f64>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    #[validate(email)]
    pub notify_email: Option<String>,
}

/// Coupon together with its voucher codes, returned on creation
#[derive(Debug, Serialize, Clone)]
pub struct CouponWithCodes {
    #[serde(flatten)]
    pub coupon: Coupon,
    pub codes: Vec<String>,
}
