extern crate chrono;
extern crate offers_lib;
extern crate uuid;

#[allow(unused_imports)]
use chrono::{Duration, Utc};
use uuid::Uuid;

use offers_lib::models::*;

#[allow(dead_code)]
pub fn coupon(voucher_type: VoucherType, max_uses: i32) -> Coupon {
    let now = Utc::now();
    Coupon {
        id: CouponId(1),
        title: "Spring learners".to_string(),
        enterprise_customer_uuid: Uuid::new_v4(),
        enterprise_customer_name: "Acme".to_string(),
        enterprise_catalog_uuid: None,
        voucher_type,
        max_uses,
        benefit_type: BenefitType::Percentage,
        benefit_value: 100.0,
        start_at: now - Duration::days(1),
        end_at: now + Duration::days(30),
        is_active: true,
        notify_email: None,
        contract_discount_type: None,
        contract_discount_value: None,
        created_at: now,
        updated_at: now,
    }
}

/// Voucher `id` with code `CODE{id}` and the given ledger rows
#[allow(dead_code)]
pub fn usage(id: i32, assignments: &[(&str, OfferAssignmentStatus)], redeemed_by: &[&str]) -> VoucherUsage {
    let now = Utc::now();
    let code = format!("CODE{}", id);
    let voucher = Voucher {
        id: VoucherId(id),
        coupon_id: CouponId(1),
        code: code.clone(),
        num_orders: redeemed_by.len() as i32,
        created_at: now,
    };
    let assignments = assignments
        .iter()
        .enumerate()
        .map(|(n, (email, status))| OfferAssignment {
            id: OfferAssignmentId(id * 100 + n as i32),
            voucher_id: voucher.id,
            code: code.clone(),
            user_email: email.to_string(),
            status: *status,
            created_at: now,
            updated_at: now,
        }).collect();
    let applications = redeemed_by
        .iter()
        .enumerate()
        .map(|(n, email)| VoucherApplication {
            id: VoucherApplicationId(id * 100 + n as i32),
            voucher_id: voucher.id,
            user_email: email.to_string(),
            order_number: format!("ORDER-{}-{}", id, n),
            created_at: now,
        }).collect();
    VoucherUsage {
        voucher,
        assignments,
        applications,
    }
}

#[allow(dead_code)]
pub fn emails(list: &[&str]) -> Vec<String> {
    list.iter().map(|email| email.to_string()).collect()
}
