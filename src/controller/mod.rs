//! `Controller` is a top layer that handles all http-related
//! stuff like reading bodies, parsing params, forming a response.
//! Basically it provides inputs to `Service` layer and converts outputs
//! of `Service` layer to http responses

pub mod application;
pub mod context;
pub mod router;
pub mod routes;
pub mod types;
pub mod utils;

use std::collections::HashMap;
use std::sync::Arc;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use futures::future;
use futures::Future;
use hyper::server::Request;
use hyper::{Get, Post, Put};
use r2d2::ManageConnection;
use uuid::Uuid;

use self::application::Controller;
use self::context::{DynamicContext, StaticContext};
use self::router::RouteParser;
use self::routes::{create_route_parser, Route};
use self::types::{ControllerFuture, ControllerResponse};
use self::utils::{parse_body, parse_user_id, query_map, query_pairs};
use errors::Error;
use models::*;
use repos::repo_factory::ReposFactory;
use services::*;

/// Controller handles route parsing and calling `Service` layer
pub struct ControllerImpl<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub static_context: StaticContext<T, M, F>,
    pub route_parser: Arc<RouteParser<Route>>,
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > ControllerImpl<T, M, F>
{
    /// Create a new controller based on services
    pub fn new(static_context: StaticContext<T, M, F>) -> Self {
        let route_parser = Arc::new(create_route_parser());
        Self {
            static_context,
            route_parser,
        }
    }
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Controller for ControllerImpl<T, M, F>
{
    /// Handle a request and get future response
    fn call(&self, req: Request) -> ControllerFuture {
        let (method, uri, _, headers, body) = req.deconstruct();
        let user_id = parse_user_id(&headers);
        let dynamic_context = DynamicContext::new(user_id);
        let service = Service::new(self.static_context.clone(), dynamic_context);

        let path = uri.path().to_string();
        let pairs = query_pairs(uri.query());
        let query = query_map(&pairs);

        match (&method, self.route_parser.test(&path)) {
            // GET /healthcheck
            (&Get, Some(Route::Healthcheck)) => Box::new(future::ok(ControllerResponse::Json("\"Ok\"".to_string()))),

            // GET /coupons?enterprise_customer=<uuid>
            (&Get, Some(Route::Coupons)) => match enterprise_param(&query) {
                Ok(enterprise_customer_uuid) => serialize_future!(service.list_coupons(enterprise_customer_uuid)),
                Err(e) => controller_error(e),
            },

            // POST /coupons
            (&Post, Some(Route::Coupons)) => serialize_future!(
                parse_body::<NewCouponPayload>(body).and_then(move |payload| service.create_coupon(payload))
            ),

            // GET /coupons/<coupon_id>
            (&Get, Some(Route::Coupon(coupon_id))) => serialize_future!(service.get_coupon(coupon_id)),

            // PUT /coupons/<coupon_id>
            (&Put, Some(Route::Coupon(coupon_id))) => serialize_future!(
                parse_body::<UpdateCoupon>(body).and_then(move |payload| service.update_coupon(coupon_id, payload))
            ),

            // POST /coupons/<coupon_id>/assign
            (&Post, Some(Route::CouponAssign(coupon_id))) => serialize_future!(
                parse_body::<AssignCodesPayload>(body).and_then(move |payload| service.assign_codes(coupon_id, payload))
            ),

            // POST /coupons/<coupon_id>/revoke
            (&Post, Some(Route::CouponRevoke(coupon_id))) => serialize_future!(
                parse_body::<RevokeCodesPayload>(body).and_then(move |payload| service.revoke_codes(coupon_id, payload))
            ),

            // POST /coupons/<coupon_id>/remind
            (&Post, Some(Route::CouponRemind(coupon_id))) => serialize_future!(
                parse_body::<RemindCodesPayload>(body).and_then(move |payload| service.remind_codes(coupon_id, payload))
            ),

            // GET /coupons/<coupon_id>/overview
            (&Get, Some(Route::CouponOverview(coupon_id))) => serialize_future!(service.overview(coupon_id)),

            // GET /coupons/<coupon_id>/codes?code_filter=<filter>&page=<page>&page_size=<size>
            (&Get, Some(Route::CouponCodes(coupon_id))) => {
                let params = PageParams::from_query(&query);
                let code_filter = query.get("code_filter").cloned();
                serialize_future!(service.code_details(coupon_id, code_filter, params, path, pairs))
            }

            // GET /coupons/<coupon_id>/codes/csv?code_filter=<filter>
            (&Get, Some(Route::CouponCodesCsv(coupon_id))) => {
                let code_filter = query.get("code_filter").cloned();
                Box::new(service.code_details_csv(coupon_id, code_filter).map(ControllerResponse::Csv))
            }

            // GET /enterprises/<uuid>/coupons/overview?filter=active
            (&Get, Some(Route::EnterpriseCouponsOverview(enterprise_customer_uuid))) => match overview_filter(&query) {
                Ok(filter) => serialize_future!(service.enterprise_overview(enterprise_customer_uuid, filter)),
                Err(e) => controller_error(e),
            },

            // GET /enterprises/<uuid>/email_templates?email_type=<type>&active=<bool>
            (&Get, Some(Route::EnterpriseEmailTemplates(enterprise_customer_uuid))) => match template_search(&query) {
                Ok(search) => serialize_future!(service.list_email_templates(enterprise_customer_uuid, search)),
                Err(e) => controller_error(e),
            },

            // POST /enterprises/<uuid>/email_templates
            (&Post, Some(Route::EnterpriseEmailTemplates(enterprise_customer_uuid))) => serialize_future!(
                parse_body::<NewEmailTemplatePayload>(body)
                    .and_then(move |payload| service.create_email_template(enterprise_customer_uuid, payload))
            ),

            // GET /enterprises/<uuid>/email_templates/<template_id>
            (&Get, Some(Route::EnterpriseEmailTemplate(enterprise_customer_uuid, template_id))) => {
                serialize_future!(service.get_email_template(enterprise_customer_uuid, template_id))
            }

            // GET /offer_assignments/summary?email=<email>
            (&Get, Some(Route::OfferAssignmentsSummary)) => match required_param(&query, "email") {
                Ok(email) => serialize_future!(service.offer_assignment_summary(email)),
                Err(e) => controller_error(e),
            },

            // POST /offer_assignments/<assignment_id>/email_bounced
            (&Post, Some(Route::OfferAssignmentEmailBounced(assignment_id))) => serialize_future!(service.email_bounced(assignment_id)),

            // POST /vouchers/redeem
            (&Post, Some(Route::VouchersRedeem)) => serialize_future!(
                parse_body::<RedeemPayload>(body).and_then(move |payload| service.redeem(payload))
            ),

            // GET /vouchers/validate?code=<code>&email=<email>
            (&Get, Some(Route::VouchersValidate)) => match (required_param(&query, "code"), required_param(&query, "email")) {
                (Ok(code), Ok(email)) => serialize_future!(service.validate_voucher(code, email)),
                (Err(e), _) | (_, Err(e)) => controller_error(e),
            },

            // POST /payments
            (&Post, Some(Route::Payments)) => serialize_future!(
                parse_body::<NewPaymentPayload>(body).and_then(move |payload| service.start_payment(payload))
            ),

            // GET /payments/<txn_id>
            (&Get, Some(Route::Payment(txn_id))) => serialize_future!(service.get_payment(txn_id)),

            // POST /payments/<txn_id>/confirm
            (&Post, Some(Route::PaymentConfirm(txn_id))) => serialize_future!(
                parse_body::<ConfirmPaymentPayload>(body).and_then(move |payload| service.confirm_payment(txn_id, payload))
            ),

            // POST /gateway_payments/<payment_id>/capture
            (&Post, Some(Route::GatewayPaymentCapture(payment_id))) => serialize_future!(service.capture_payment(payment_id)),

            // POST /gateway_payments/<payment_id>/refund
            (&Post, Some(Route::GatewayPaymentRefund(payment_id))) => serialize_future!(
                parse_body::<RefundPaymentPayload>(body).and_then(move |payload| service.refund_payment(payment_id, payload))
            ),

            // GET /embargo/check?user=<username>&ip_address=<ip>&course_ids=<id>&course_ids=<id>
            (&Get, Some(Route::EmbargoCheck)) => match embargo_query(&query, &pairs) {
                Ok(embargo_query) => serialize_future!(service.check_embargo(embargo_query)),
                Err(e) => controller_error(e),
            },

            // Fallback
            (m, _) => controller_error(
                format_err!("Request to non existing endpoint in offers microservice! {:?} {:?}", m, path)
                    .context(Error::NotFound)
                    .into(),
            ),
        }
    }
}

fn controller_error(error: FailureError) -> ControllerFuture {
    Box::new(future::err(error))
}

fn required_param(query: &HashMap<String, String>, name: &str) -> Result<String, FailureError> {
    query
        .get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| format_err!("Missing query parameter {}", name).context(Error::Parse).into())
}

fn enterprise_param(query: &HashMap<String, String>) -> Result<Uuid, FailureError> {
    let value = required_param(query, "enterprise_customer")?;
    Uuid::parse_str(&value).map_err(|e| e.context(Error::Parse).into())
}

fn overview_filter(query: &HashMap<String, String>) -> Result<Option<OverviewFilter>, FailureError> {
    match query.get("filter").map(String::as_str) {
        None | Some("") => Ok(None),
        Some("active") => Ok(Some(OverviewFilter::Active)),
        Some(other) => Err(Error::Validate(single_error(
            "filter",
            "invalid_filter",
            format!("Unknown overview filter {}.", other),
        )).into()),
    }
}

fn template_search(query: &HashMap<String, String>) -> Result<EmailTemplateSearch, FailureError> {
    let email_type = match query.get("email_type") {
        Some(value) => Some(
            value
                .parse::<EmailType>()
                .map_err(|e| format_err!("{}", e).context(Error::Parse))?,
        ),
        None => None,
    };
    let active = match query.get("active") {
        Some(value) => Some(value.parse::<bool>().map_err(|e| e.context(Error::Parse))?),
        None => None,
    };
    Ok(EmailTemplateSearch { email_type, active })
}

/// Course ids come as repeated `course_ids` params or a comma separated list.
fn embargo_query(query: &HashMap<String, String>, pairs: &[(String, String)]) -> Result<EmbargoQuery, FailureError> {
    let user = required_param(query, "user")?;
    let ip_address = required_param(query, "ip_address")?;
    let course_ids = pairs
        .iter()
        .filter(|(key, _)| key == "course_ids")
        .flat_map(|(_, value)| value.split(','))
        .map(str::trim)
        .filter(|course_id| !course_id.is_empty())
        .map(str::to_string)
        .collect();
    Ok(EmbargoQuery {
        user,
        ip_address,
        course_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn is_error(err: &FailureError, expected: fn(&Error) -> bool) -> bool {
        err.iter_chain()
            .filter_map(|cause| cause.downcast_ref::<Error>())
            .next()
            .map(expected)
            .unwrap_or(false)
    }

    #[test]
    fn test_enterprise_param() {
        let uuid = "a1f4dd4c-1a43-4b6a-8a9d-2b2f1f0e6c7d";
        assert_eq!(
            enterprise_param(&query(&[("enterprise_customer", uuid)])).unwrap(),
            Uuid::parse_str(uuid).unwrap()
        );
        let err = enterprise_param(&query(&[("enterprise_customer", "nope")])).unwrap_err();
        assert!(is_error(&err, |e| match e {
            Error::Parse => true,
            _ => false,
        }));
        assert!(enterprise_param(&query(&[])).is_err());
    }

    #[test]
    fn test_overview_filter() {
        assert_eq!(overview_filter(&query(&[])).unwrap(), None);
        assert_eq!(overview_filter(&query(&[("filter", "active")])).unwrap(), Some(OverviewFilter::Active));
        let err = overview_filter(&query(&[("filter", "archived")])).unwrap_err();
        assert!(is_error(&err, |e| match e {
            Error::Validate(_) => true,
            _ => false,
        }));
    }

    #[test]
    fn test_template_search() {
        let search = template_search(&query(&[("email_type", "remind"), ("active", "true")])).unwrap();
        assert_eq!(search.email_type, Some(EmailType::Remind));
        assert_eq!(search.active, Some(true));
        assert!(template_search(&query(&[("active", "maybe")])).is_err());
        assert!(template_search(&query(&[("email_type", "spam")])).is_err());
    }

    #[test]
    fn test_required_param_rejects_empty() {
        assert!(required_param(&query(&[("email", "")]), "email").is_err());
        assert_eq!(required_param(&query(&[("email", "a@example.com")]), "email").unwrap(), "a@example.com");
    }

    #[test]
    fn test_embargo_query_collects_course_ids() {
        let pairs = vec![
            ("user".to_string(), "learner".to_string()),
            ("ip_address".to_string(), "10.0.0.1".to_string()),
            ("course_ids".to_string(), "course-v1:edX+A+1T2018".to_string()),
            ("course_ids".to_string(), "course-v1:edX+B+1T2018, course-v1:edX+C+1T2018".to_string()),
        ];
        let parsed = embargo_query(&query_map(&pairs), &pairs).unwrap();
        assert_eq!(parsed.user, "learner");
        assert_eq!(
            parsed.course_ids,
            vec!["course-v1:edX+A+1T2018", "course-v1:edX+B+1T2018", "course-v1:edX+C+1T2018"]
        );

        let anonymous = vec![("ip_address".to_string(), "10.0.0.1".to_string())];
        assert!(embargo_query(&query_map(&anonymous), &anonymous).is_err());
    }
}
