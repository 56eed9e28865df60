use uuid::Uuid;

use controller::router::RouteParser;
use models::*;

/// List of all routes with params for the app
#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    Healthcheck,
    Coupons,
    Coupon(CouponId),
    CouponAssign(CouponId),
    CouponRevoke(CouponId),
    CouponRemind(CouponId),
    CouponOverview(CouponId),
    CouponCodes(CouponId),
    CouponCodesCsv(CouponId),
    EnterpriseCouponsOverview(Uuid),
    EnterpriseEmailTemplates(Uuid),
    EnterpriseEmailTemplate(Uuid, EmailTemplateId),
    OfferAssignmentsSummary,
    OfferAssignmentEmailBounced(OfferAssignmentId),
    VouchersRedeem,
    VouchersValidate,
    Payments,
    Payment(String),
    PaymentConfirm(String),
    GatewayPaymentCapture(String),
    GatewayPaymentRefund(String),
    EmbargoCheck,
}

fn coupon_route(params: Vec<&str>, route: fn(CouponId) -> Route) -> Option<Route> {
    params.get(0).and_then(|id| id.parse().ok()).map(route)
}

fn string_route(params: Vec<&str>, route: fn(String) -> Route) -> Option<Route> {
    params.get(0).map(|param| route(param.to_string()))
}

fn enterprise_route(params: Vec<&str>, route: fn(Uuid) -> Route) -> Option<Route> {
    params.get(0).and_then(|uuid| Uuid::parse_str(uuid).ok()).map(route)
}

pub fn create_route_parser() -> RouteParser<Route> {
    let mut router = RouteParser::default();

    // Healthcheck
    router.add_route(r"^/healthcheck$", || Route::Healthcheck);

    // Coupons Routes
    router.add_route(r"^/coupons$", || Route::Coupons);
    router.add_route_with_params(r"^/coupons/(\d+)$", |params| coupon_route(params, Route::Coupon));
    router.add_route_with_params(r"^/coupons/(\d+)/assign$", |params| coupon_route(params, Route::CouponAssign));
    router.add_route_with_params(r"^/coupons/(\d+)/revoke$", |params| coupon_route(params, Route::CouponRevoke));
    router.add_route_with_params(r"^/coupons/(\d+)/remind$", |params| coupon_route(params, Route::CouponRemind));
    router.add_route_with_params(r"^/coupons/(\d+)/overview$", |params| coupon_route(params, Route::CouponOverview));
    router.add_route_with_params(r"^/coupons/(\d+)/codes$", |params| coupon_route(params, Route::CouponCodes));
    router.add_route_with_params(r"^/coupons/(\d+)/codes/csv$", |params| coupon_route(params, Route::CouponCodesCsv));

    // Enterprise Routes
    router.add_route_with_params(r"^/enterprises/([0-9a-fA-F-]+)/coupons/overview$", |params| {
        enterprise_route(params, Route::EnterpriseCouponsOverview)
    });
    router.add_route_with_params(r"^/enterprises/([0-9a-fA-F-]+)/email_templates$", |params| {
        enterprise_route(params, Route::EnterpriseEmailTemplates)
    });
    router.add_route_with_params(r"^/enterprises/([0-9a-fA-F-]+)/email_templates/(\d+)$", |params| {
        if let (Some(uuid), Some(id)) = (params.get(0), params.get(1)) {
            match (Uuid::parse_str(uuid), id.parse::<EmailTemplateId>()) {
                (Ok(uuid), Ok(id)) => Some(Route::EnterpriseEmailTemplate(uuid, id)),
                _ => None,
            }
        } else {
            None
        }
    });

    // Offer assignments Routes
    router.add_route(r"^/offer_assignments/summary$", || Route::OfferAssignmentsSummary);
    router.add_route_with_params(r"^/offer_assignments/(\d+)/email_bounced$", |params| {
        params
            .get(0)
            .and_then(|id| id.parse().ok())
            .map(Route::OfferAssignmentEmailBounced)
    });

    // Vouchers Routes
    router.add_route(r"^/vouchers/redeem$", || Route::VouchersRedeem);
    router.add_route(r"^/vouchers/validate$", || Route::VouchersValidate);

    // Payments Routes
    router.add_route(r"^/payments$", || Route::Payments);
    router.add_route_with_params(r"^/payments/([0-9a-f]{28})$", |params| string_route(params, Route::Payment));
    router.add_route_with_params(r"^/payments/([0-9a-f]{28})/confirm$", |params| {
        string_route(params, Route::PaymentConfirm)
    });
    router.add_route_with_params(r"^/gateway_payments/([A-Za-z0-9_]+)/capture$", |params| {
        string_route(params, Route::GatewayPaymentCapture)
    });
    router.add_route_with_params(r"^/gateway_payments/([A-Za-z0-9_]+)/refund$", |params| {
        string_route(params, Route::GatewayPaymentRefund)
    });
    router.add_route(r"^/embargo/check$", || Route::EmbargoCheck);

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_routes() {
        let router = create_route_parser();
        assert_eq!(router.test("/coupons"), Some(Route::Coupons));
        assert_eq!(router.test("/coupons/12"), Some(Route::Coupon(CouponId(12))));
        assert_eq!(router.test("/coupons/12/codes/csv"), Some(Route::CouponCodesCsv(CouponId(12))));
        assert_eq!(router.test("/coupons/abc"), None);
    }

    #[test]
    fn test_enterprise_routes() {
        let router = create_route_parser();
        let uuid = Uuid::parse_str("a1f4dd4c-1a43-4b6a-8a9d-2b2f1f0e6c7d").unwrap();
        assert_eq!(
            router.test("/enterprises/a1f4dd4c-1a43-4b6a-8a9d-2b2f1f0e6c7d/email_templates/3"),
            Some(Route::EnterpriseEmailTemplate(uuid, EmailTemplateId(3)))
        );
        assert_eq!(router.test("/enterprises/not-a-uuid/email_templates"), None);
    }

    #[test]
    fn test_payment_routes() {
        let router = create_route_parser();
        let txn_id = "3f2c9a6e0d7b4c1e8f5a2b9c6d3e";
        assert_eq!(router.test("/payments"), Some(Route::Payments));
        assert_eq!(router.test(&format!("/payments/{}", txn_id)), Some(Route::Payment(txn_id.to_string())));
        assert_eq!(
            router.test(&format!("/payments/{}/confirm", txn_id)),
            Some(Route::PaymentConfirm(txn_id.to_string()))
        );
        assert_eq!(router.test("/payments/short"), None);
        assert_eq!(
            router.test("/gateway_payments/pay_29QQoUBi66xm2f/refund"),
            Some(Route::GatewayPaymentRefund("pay_29QQoUBi66xm2f".to_string()))
        );
        assert_eq!(router.test("/gateway_payments/pay-1/capture"), None);
        assert_eq!(router.test("/embargo/check"), Some(Route::EmbargoCheck));
    }
}
