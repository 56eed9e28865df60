include!("ledger_setup.rs");

use offers_lib::services::{plan_assignments, remind_targets, resolve_pair};

#[test]
fn single_use_codes_go_one_per_email() {
    let usages = vec![
        usage(1, &[("taken@example.com", OfferAssignmentStatus::Assigned)], &[]),
        usage(2, &[], &[]),
        usage(3, &[], &[]),
    ];
    let plan = plan_assignments(VoucherType::SingleUse, 1, &usages, &emails(&["a@example.com", "b@example.com"])).unwrap();
    let codes: Vec<&str> = plan.iter().map(|row| row.code.as_str()).collect();
    assert_eq!(codes, vec!["CODE2", "CODE3"]);
    assert!(plan.iter().all(|row| row.status == OfferAssignmentStatus::Assigned));
}

#[test]
fn shortage_plans_nothing() {
    let usages = vec![usage(1, &[], &[]), usage(2, &[], &["done@example.com"])];
    let plan = plan_assignments(VoucherType::SingleUse, 1, &usages, &emails(&["a@example.com", "b@example.com"]));
    assert_eq!(plan, None);
}

#[test]
fn multi_use_fills_unassigned_vouchers_first() {
    let usages = vec![
        usage(1, &[("x@example.com", OfferAssignmentStatus::Assigned)], &[]),
        usage(2, &[], &[]),
    ];
    let plan = plan_assignments(
        VoucherType::MultiUse,
        2,
        &usages,
        &emails(&["a@example.com", "b@example.com", "c@example.com"]),
    ).unwrap();
    let codes: Vec<&str> = plan.iter().map(|row| row.code.as_str()).collect();
    assert_eq!(codes, vec!["CODE2", "CODE2", "CODE1"]);
}

#[test]
fn multi_use_per_customer_hands_out_whole_vouchers() {
    let usages = vec![
        usage(1, &[("x@example.com", OfferAssignmentStatus::Assigned)], &[]),
        usage(2, &[], &[]),
        usage(3, &[], &[]),
    ];
    let plan = plan_assignments(
        VoucherType::MultiUsePerCustomer,
        3,
        &usages,
        &emails(&["a@example.com", "b@example.com"]),
    ).unwrap();
    assert_eq!(plan.len(), 6);
    assert!(plan[..3].iter().all(|row| row.code == "CODE2" && row.user_email == "a@example.com"));
    assert!(plan[3..].iter().all(|row| row.code == "CODE3" && row.user_email == "b@example.com"));

    let too_many = emails(&["a@example.com", "b@example.com", "c@example.com"]);
    assert_eq!(plan_assignments(VoucherType::MultiUsePerCustomer, 3, &usages, &too_many), None);
}

#[test]
fn once_per_customer_shares_fresh_codes_only() {
    let usages = vec![
        usage(1, &[("x@example.com", OfferAssignmentStatus::Assigned)], &[]),
        usage(2, &[], &["y@example.com"]),
        usage(3, &[], &[]),
        usage(4, &[], &[]),
        usage(5, &[("z@example.com", OfferAssignmentStatus::Revoked)], &[]),
    ];
    let recipients = emails(&[
        "a@example.com",
        "b@example.com",
        "c@example.com",
        "d@example.com",
        "e@example.com",
        "f@example.com",
    ]);
    let plan = plan_assignments(VoucherType::OncePerCustomer, 2, &usages, &recipients).unwrap();

    let rows: Vec<(&str, &str)> = plan.iter().map(|row| (row.user_email.as_str(), row.code.as_str())).collect();
    assert_eq!(
        rows,
        vec![
            ("a@example.com", "CODE3"),
            ("b@example.com", "CODE3"),
            ("c@example.com", "CODE4"),
            ("d@example.com", "CODE4"),
            ("e@example.com", "CODE5"),
            ("f@example.com", "CODE5"),
        ]
    );

    let mut one_more = recipients.clone();
    one_more.push("g@example.com".to_string());
    assert_eq!(plan_assignments(VoucherType::OncePerCustomer, 2, &usages, &one_more), None);
}

#[test]
fn planned_rows_carry_lowercase_emails() {
    let usages = vec![usage(1, &[], &[])];
    let plan = plan_assignments(VoucherType::MultiUse, 3, &usages, &emails(&["Mixed.Case@Example.com"])).unwrap();
    assert_eq!(plan[0].user_email, "mixed.case@example.com");
}

#[test]
fn resolve_pair_reports_missing_rows() {
    let usages = vec![usage(
        1,
        &[
            ("a@example.com", OfferAssignmentStatus::Assigned),
            ("a@example.com", OfferAssignmentStatus::Revoked),
        ],
        &[],
    )];
    let pair = |email: &str, code: &str| EmailCodePair {
        email: email.to_string(),
        code: code.to_string(),
    };

    assert_eq!(resolve_pair(&usages, &pair("a@example.com", "CODE1")), Ok(vec![OfferAssignmentId(100)]));
    assert_eq!(
        resolve_pair(&usages, &pair("b@example.com", "CODE1")),
        Err("No assignments exist for user b@example.com and code CODE1".to_string())
    );
    assert_eq!(
        resolve_pair(&usages, &pair("a@example.com", "CODE9")),
        Err("Code CODE9 is not associated with this Coupon".to_string())
    );
}

#[test]
fn remind_targets_follow_filter() {
    let usages = vec![
        usage(1, &[("b@example.com", OfferAssignmentStatus::EmailBounced)], &[]),
        usage(
            2,
            &[
                ("a@example.com", OfferAssignmentStatus::Assigned),
                ("c@example.com", OfferAssignmentStatus::PartiallyRedeemed),
            ],
            &["c@example.com"],
        ),
    ];

    let unredeemed: Vec<(String, String, i32)> = remind_targets(&usages, CodeFilter::Unredeemed)
        .into_iter()
        .map(|(pair, remaining)| (pair.email, pair.code, remaining))
        .collect();
    assert_eq!(
        unredeemed,
        vec![
            ("a@example.com".to_string(), "CODE2".to_string(), 1),
            ("b@example.com".to_string(), "CODE1".to_string(), 1),
        ]
    );

    let partial = remind_targets(&usages, CodeFilter::PartiallyRedeemed);
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].0.email, "c@example.com");
    assert!(remind_targets(&usages, CodeFilter::Redeemed).is_empty());
}
