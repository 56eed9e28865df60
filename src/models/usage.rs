//! Read-only projections over the assignment ledger and redemption records
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use models::coupon::Coupon;
use models::newtypes::{CouponId, OfferAssignmentId, VoucherId};
use models::offer_assignment::{CodeFilter, OfferAssignment, OfferAssignmentStatus};
use models::validation_rules::normalize_email;
use models::voucher::Voucher;
use models::voucher_application::VoucherApplication;

/// A voucher with every assignment and redemption recorded against it
#[derive(Clone, Debug, PartialEq)]
pub struct VoucherUsage {
    pub voucher: Voucher,
    pub assignments: Vec<OfferAssignment>,
    pub applications: Vec<VoucherApplication>,
}

impl VoucherUsage {
    /// Groups ledger rows under their vouchers, keeping the voucher order.
    pub fn group(vouchers: Vec<Voucher>, assignments: Vec<OfferAssignment>, applications: Vec<VoucherApplication>) -> Vec<Self> {
        let mut assignments_by_voucher: HashMap<VoucherId, Vec<OfferAssignment>> = HashMap::new();
        for assignment in assignments {
            assignments_by_voucher.entry(assignment.voucher_id).or_insert_with(Vec::new).push(assignment);
        }
        let mut applications_by_voucher: HashMap<VoucherId, Vec<VoucherApplication>> = HashMap::new();
        for application in applications {
            applications_by_voucher
                .entry(application.voucher_id)
                .or_insert_with(Vec::new)
                .push(application);
        }

        vouchers
            .into_iter()
            .map(|voucher| {
                let mut assignments = assignments_by_voucher.remove(&voucher.id).unwrap_or_default();
                assignments.sort_by_key(|assignment| assignment.id);
                let applications = applications_by_voucher.remove(&voucher.id).unwrap_or_default();
                VoucherUsage {
                    voucher,
                    assignments,
                    applications,
                }
            }).collect()
    }

    pub fn active_assignments(&self) -> impl Iterator<Item = &OfferAssignment> {
        self.assignments.iter().filter(|assignment| assignment.is_active())
    }

    /// Active assignments held by `email`, compared case-insensitively.
    pub fn active_assignments_for<'a>(&'a self, email: &str) -> impl Iterator<Item = &'a OfferAssignment> + 'a {
        let email = normalize_email(email);
        self.active_assignments()
            .filter(move |assignment| normalize_email(&assignment.user_email) == email)
    }

    pub fn num_active(&self) -> i32 {
        self.active_assignments().count() as i32
    }

    pub fn num_redemptions(&self) -> i32 {
        self.applications.len() as i32
    }

    pub fn redemptions_by(&self, email: &str) -> i32 {
        let email = normalize_email(email);
        self.applications
            .iter()
            .filter(|application| normalize_email(&application.user_email) == email)
            .count() as i32
    }

    /// Use-slots neither held by an active assignment nor consumed by a redemption.
    pub fn free_slots(&self, max_uses: i32) -> i32 {
        (max_uses - self.num_active() - self.num_redemptions()).max(0)
    }

    pub fn is_fresh(&self) -> bool {
        self.num_active() == 0 && self.num_redemptions() == 0
    }

    /// Distinct emails holding active assignments, in assignment order.
    pub fn active_emails(&self) -> Vec<String> {
        let mut emails: Vec<String> = vec![];
        for assignment in self.active_assignments() {
            if !emails.contains(&assignment.user_email) {
                emails.push(assignment.user_email.clone());
            }
        }
        emails
    }

    pub fn classify(&self, max_uses: i32) -> CodeFilter {
        classify_code(self.num_active(), self.num_redemptions(), max_uses)
    }
}

/// Every code lands in exactly one bucket.
pub fn classify_code(num_active: i32, num_redemptions: i32, max_uses: i32) -> CodeFilter {
    if num_redemptions >= max_uses {
        CodeFilter::Redeemed
    } else if num_redemptions > 0 {
        CodeFilter::PartiallyRedeemed
    } else if num_active > 0 {
        CodeFilter::Unredeemed
    } else {
        CodeFilter::Unassigned
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct BouncedAssignment {
    pub id: OfferAssignmentId,
    pub code: String,
    pub user_email: String,
}

/// Aggregated usage statistics of one coupon
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CouponOverview {
    pub id: CouponId,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub num_codes: i64,
    pub max_uses: i64,
    pub num_unassigned: i64,
    pub num_uses: i64,
    pub errors: Vec<BouncedAssignment>,
    pub usage_limitation: String,
    pub available: bool,
}

impl CouponOverview {
    pub fn new(coupon: &Coupon, usages: &[VoucherUsage], now: DateTime<Utc>) -> Self {
        let errors = usages
            .iter()
            .flat_map(|usage| usage.assignments.iter())
            .filter(|assignment| assignment.status == OfferAssignmentStatus::EmailBounced)
            .map(|assignment| BouncedAssignment {
                id: assignment.id,
                code: assignment.code.clone(),
                user_email: assignment.user_email.clone(),
            }).collect();

        Self {
            id: coupon.id,
            title: coupon.title.clone(),
            start_date: coupon.start_at,
            end_date: coupon.end_at,
            num_codes: usages.len() as i64,
            max_uses: i64::from(coupon.max_uses) * usages.len() as i64,
            num_unassigned: usages.iter().map(|usage| i64::from(usage.free_slots(coupon.max_uses))).sum(),
            num_uses: usages.iter().map(|usage| i64::from(usage.num_redemptions())).sum(),
            errors,
            usage_limitation: coupon.voucher_type.display_name().to_string(),
            available: coupon.is_available(now),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Redemptions {
    pub used: i32,
    pub total: i32,
    pub num_assignments: i32,
}

/// One row of the code-detail listing
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CodeUsage {
    pub code: String,
    pub assigned_to: String,
    pub redeem_url: String,
    pub redemptions: Redemptions,
}

impl CodeUsage {
    pub fn new(usage: &VoucherUsage, max_uses: i32, redeem_url_base: &str) -> Self {
        Self {
            code: usage.voucher.code.clone(),
            assigned_to: usage.active_emails().join(", "),
            redeem_url: format!("{}?code={}", redeem_url_base, usage.voucher.code),
            redemptions: Redemptions {
                used: usage.num_redemptions(),
                total: max_uses,
                num_assignments: usage.num_active(),
            },
        }
    }
}

/// Codes of the requested bucket, in voucher order
pub fn code_usages(usages: &[VoucherUsage], max_uses: i32, filter: CodeFilter, redeem_url_base: &str) -> Vec<CodeUsage> {
    usages
        .iter()
        .filter(|usage| usage.classify(max_uses) == filter)
        .map(|usage| CodeUsage::new(usage, max_uses, redeem_url_base))
        .collect()
}

/// Per-code entry of a recipient's summary
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OfferAssignmentSummary {
    pub coupon_id: CouponId,
    pub code: String,
    pub benefit_type: String,
    pub benefit_value: f64,
    pub redemptions_remaining: i32,
    pub catalog: Option<::uuid::Uuid>,
}

impl OfferAssignmentSummary {
    /// `None` when `email` holds no active assignment on the voucher.
    pub fn new(coupon: &Coupon, usage: &VoucherUsage, email: &str) -> Option<Self> {
        let redemptions_remaining = usage.active_assignments_for(email).count() as i32;
        if redemptions_remaining == 0 {
            return None;
        }
        Some(Self {
            coupon_id: coupon.id,
            code: usage.voucher.code.clone(),
            benefit_type: coupon.benefit_type.display_name().to_string(),
            benefit_value: coupon.benefit_value,
            redemptions_remaining,
            catalog: coupon.enterprise_catalog_uuid,
        })
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OverviewFilter {
    Active,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_code_buckets_are_exclusive() {
        assert_eq!(classify_code(0, 0, 3), CodeFilter::Unassigned);
        assert_eq!(classify_code(2, 0, 3), CodeFilter::Unredeemed);
        assert_eq!(classify_code(1, 1, 3), CodeFilter::PartiallyRedeemed);
        assert_eq!(classify_code(0, 3, 3), CodeFilter::Redeemed);
        assert_eq!(classify_code(0, 1, 1), CodeFilter::Redeemed);
    }
}
