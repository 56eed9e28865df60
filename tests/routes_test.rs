extern crate offers_lib;

use offers_lib::controller::routes::{create_route_parser, Route};
use offers_lib::models::*;

#[test]
fn coupon_action_routes_are_parsed() {
    let router = create_route_parser();
    assert_eq!(router.test("/healthcheck"), Some(Route::Healthcheck));
    assert_eq!(router.test("/coupons/7/assign"), Some(Route::CouponAssign(CouponId(7))));
    assert_eq!(router.test("/coupons/7/revoke"), Some(Route::CouponRevoke(CouponId(7))));
    assert_eq!(router.test("/coupons/7/remind"), Some(Route::CouponRemind(CouponId(7))));
    assert_eq!(router.test("/coupons/7/overview"), Some(Route::CouponOverview(CouponId(7))));
    assert_eq!(router.test("/coupons/7/codes"), Some(Route::CouponCodes(CouponId(7))));
}

#[test]
fn ledger_routes_are_parsed() {
    let router = create_route_parser();
    assert_eq!(router.test("/offer_assignments/summary"), Some(Route::OfferAssignmentsSummary));
    assert_eq!(
        router.test("/offer_assignments/42/email_bounced"),
        Some(Route::OfferAssignmentEmailBounced(OfferAssignmentId(42)))
    );
    assert_eq!(router.test("/vouchers/redeem"), Some(Route::VouchersRedeem));
    assert_eq!(router.test("/vouchers/validate"), Some(Route::VouchersValidate));
    assert_eq!(router.test("/coupons/7/unknown"), None);
}
