include!("ledger_setup.rs");

use offers_lib::services::{check_voucher, render_csv, CSV_HEADER};

const REDEEM_URL: &str = "https://learn.example.com/coupons/offer/";

fn ledger() -> Vec<VoucherUsage> {
    vec![
        usage(1, &[], &[]),
        usage(2, &[("a@example.com", OfferAssignmentStatus::Assigned)], &[]),
        usage(
            3,
            &[
                ("b@example.com", OfferAssignmentStatus::PartiallyRedeemed),
                ("c@example.com", OfferAssignmentStatus::EmailBounced),
            ],
            &["b@example.com"],
        ),
        usage(4, &[("d@example.com", OfferAssignmentStatus::Redeemed)], &["d@example.com", "e@example.com", "f@example.com"]),
    ]
}

#[test]
fn every_code_lands_in_one_bucket() {
    let usages = ledger();
    let buckets: Vec<CodeFilter> = usages.iter().map(|usage| usage.classify(3)).collect();
    assert_eq!(
        buckets,
        vec![
            CodeFilter::Unassigned,
            CodeFilter::Unredeemed,
            CodeFilter::PartiallyRedeemed,
            CodeFilter::Redeemed,
        ]
    );
    assert_eq!(classify_code(0, 0, 1), CodeFilter::Unassigned);
    assert_eq!(classify_code(2, 1, 1), CodeFilter::Redeemed);
}

#[test]
fn overview_counts_slots_and_bounces() {
    let coupon = coupon(VoucherType::MultiUse, 3);
    let overview = CouponOverview::new(&coupon, &ledger(), Utc::now());

    assert_eq!(overview.num_codes, 4);
    assert_eq!(overview.max_uses, 12);
    // 3 + 2 + 0 + 0 free slots
    assert_eq!(overview.num_unassigned, 5);
    assert_eq!(overview.num_uses, 4);
    assert_eq!(overview.errors.len(), 1);
    assert_eq!(overview.errors[0].user_email, "c@example.com");
    assert_eq!(overview.usage_limitation, "Multi-use");
    assert!(overview.available);
}

#[test]
fn overview_totals_of_large_coupons_do_not_wrap() {
    let coupon = coupon(VoucherType::MultiUse, 1_000_000);
    let usages: Vec<VoucherUsage> = (1..=3000).map(|id| usage(id, &[], &[])).collect();
    let overview = CouponOverview::new(&coupon, &usages, Utc::now());

    assert_eq!(overview.num_codes, 3000);
    assert_eq!(overview.max_uses, 3_000_000_000);
    assert_eq!(overview.num_unassigned, 3_000_000_000);
    assert_eq!(overview.num_uses, 0);
}

#[test]
fn partially_redeemed_rows_render_as_csv() {
    let rows = code_usages(&ledger(), 3, CodeFilter::PartiallyRedeemed, REDEEM_URL);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].assigned_to, "b@example.com, c@example.com");

    let csv = render_csv(&rows);
    let lines: Vec<&str> = csv.split("\r\n").collect();
    assert_eq!(lines[0], CSV_HEADER);
    assert_eq!(
        lines[1],
        "\"b@example.com, c@example.com\",CODE3,https://learn.example.com/coupons/offer/?code=CODE3,3,1"
    );
    assert_eq!(lines[2], "");
}

#[test]
fn pages_link_to_neighbours() {
    let location = PageLocation {
        base_url: "http://localhost:8000".to_string(),
        path: "/coupons/1/codes".to_string(),
        query: vec![("code_filter".to_string(), "unassigned".to_string())],
    };
    let rows = code_usages(&ledger(), 3, CodeFilter::Unassigned, REDEEM_URL);
    let page = paginate(rows, PageParams { page: 1, page_size: 50 }, &location).unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.next, None);
    assert_eq!(page.previous, None);

    assert!(paginate(Vec::<CodeUsage>::new(), PageParams { page: 2, page_size: 50 }, &location).is_none());
}

#[test]
fn voucher_checks_follow_voucher_type() {
    let single = coupon(VoucherType::SingleUse, 1);
    let fresh = usage(1, &[], &[]);
    let held = usage(2, &[("a@example.com", OfferAssignmentStatus::Assigned)], &[]);
    assert_eq!(check_voucher(&single, &fresh, "a@example.com", Utc::now()), VoucherValidate::Valid);
    assert_eq!(check_voucher(&single, &held, "a@example.com", Utc::now()), VoucherValidate::Valid);
    assert_eq!(
        check_voucher(&single, &held, "b@example.com", Utc::now()),
        VoucherValidate::NoActivationsAvailable
    );

    let per_customer = coupon(VoucherType::MultiUsePerCustomer, 3);
    assert_eq!(
        check_voucher(&per_customer, &held, "b@example.com", Utc::now()),
        VoucherValidate::AssignedToAnotherCustomer
    );
    assert_eq!(
        check_voucher(&per_customer, &held, "a@example.com", Utc::now() + Duration::days(60)),
        VoucherValidate::HasExpired
    );
}
