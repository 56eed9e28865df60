//! Usage Services, read-only projections of the assignment ledger:
//! coupon overviews, code details and recipient summaries.
use chrono::Utc;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use r2d2::ManageConnection;
use uuid::Uuid;
use validator::ValidationErrors;

use super::types::ServiceFuture;
use errors::Error;
use models::validation_rules::{normalize_email, single_error};
use models::*;
use repos::{
    OfferAssignmentSearch, OfferAssignmentsRepo, RepoResult, ReposFactory, VoucherApplicationsRepo, VoucherSearch, VouchersRepo,
};
use services::{service_error, Service};

pub const CSV_HEADER: &str = "assigned_to,code,redeem_url,redemptions.total,redemptions.used";

pub trait UsageService {
    /// Usage statistics of one coupon
    fn overview(&self, coupon_id: CouponId) -> ServiceFuture<CouponOverview>;
    /// Usage statistics of every coupon of an enterprise
    fn enterprise_overview(&self, enterprise_customer_uuid: Uuid, filter: Option<OverviewFilter>) -> ServiceFuture<Vec<CouponOverview>>;
    /// One page of codes falling in `code_filter`
    fn code_details(
        &self,
        coupon_id: CouponId,
        code_filter: Option<String>,
        params: PageParams,
        path: String,
        query: Vec<(String, String)>,
    ) -> ServiceFuture<Page<CodeUsage>>;
    /// Every code falling in `code_filter` rendered as csv
    fn code_details_csv(&self, coupon_id: CouponId, code_filter: Option<String>) -> ServiceFuture<String>;
    /// Codes a recipient may still redeem
    fn offer_assignment_summary(&self, user_email: String) -> ServiceFuture<Vec<OfferAssignmentSummary>>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > UsageService for Service<T, M, F>
{
    fn overview(&self, coupon_id: CouponId) -> ServiceFuture<CouponOverview> {
        if let Err(e) = self.authorized_user("view coupon overview") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            coupons_repo
                .get(coupon_id)
                .and_then(|coupon| {
                    let coupon = coupon.ok_or(Error::NotFound)?;
                    let usages = load_usages(&*vouchers_repo, &*assignments_repo, &*applications_repo, coupon.id)?;
                    Ok(CouponOverview::new(&coupon, &usages, Utc::now()))
                }).map_err(|e: FailureError| e.context("Service Usage, overview endpoint error occurred.").into())
        })
    }

    fn enterprise_overview(&self, enterprise_customer_uuid: Uuid, filter: Option<OverviewFilter>) -> ServiceFuture<Vec<CouponOverview>> {
        if let Err(e) = self.authorized_user("view enterprise overview") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            coupons_repo
                .list_for_enterprise(enterprise_customer_uuid)
                .and_then(|coupons| {
                    let now = Utc::now();
                    let mut overviews = vec![];
                    for coupon in coupons {
                        if filter == Some(OverviewFilter::Active) && !coupon.is_available(now) {
                            continue;
                        }
                        let usages = load_usages(&*vouchers_repo, &*assignments_repo, &*applications_repo, coupon.id)?;
                        overviews.push(CouponOverview::new(&coupon, &usages, now));
                    }
                    Ok(overviews)
                }).map_err(|e: FailureError| e.context("Service Usage, enterprise_overview endpoint error occurred.").into())
        })
    }

    fn code_details(
        &self,
        coupon_id: CouponId,
        code_filter: Option<String>,
        params: PageParams,
        path: String,
        query: Vec<(String, String)>,
    ) -> ServiceFuture<Page<CodeUsage>> {
        if let Err(e) = self.authorized_user("view code details") {
            return service_error(e);
        }
        let filter = match parse_code_filter(code_filter) {
            Ok(filter) => filter,
            Err(errors) => return service_error(Error::Validate(errors).into()),
        };
        let repo_factory = self.static_context.repo_factory.clone();
        let config = self.static_context.config.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            let location = PageLocation {
                base_url: config.server.public_url.clone(),
                path,
                query,
            };

            coupons_repo
                .get(coupon_id)
                .and_then(|coupon| {
                    let coupon = coupon.ok_or(Error::NotFound)?;
                    let usages = load_usages(&*vouchers_repo, &*assignments_repo, &*applications_repo, coupon.id)?;
                    let rows = code_usages(&usages, coupon.max_uses, filter, &config.coupons.redeem_url);
                    paginate(rows, params, &location).ok_or_else(|| format_err!("Invalid page.").context(Error::NotFound).into())
                }).map_err(|e: FailureError| e.context("Service Usage, code_details endpoint error occurred.").into())
        })
    }

    fn code_details_csv(&self, coupon_id: CouponId, code_filter: Option<String>) -> ServiceFuture<String> {
        if let Err(e) = self.authorized_user("export code details") {
            return service_error(e);
        }
        let filter = match parse_code_filter(code_filter) {
            Ok(filter) => filter,
            Err(errors) => return service_error(Error::Validate(errors).into()),
        };
        let repo_factory = self.static_context.repo_factory.clone();
        let config = self.static_context.config.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            coupons_repo
                .get(coupon_id)
                .and_then(|coupon| {
                    let coupon = coupon.ok_or(Error::NotFound)?;
                    let usages = load_usages(&*vouchers_repo, &*assignments_repo, &*applications_repo, coupon.id)?;
                    let rows = code_usages(&usages, coupon.max_uses, filter, &config.coupons.redeem_url);
                    Ok(render_csv(&rows))
                }).map_err(|e: FailureError| e.context("Service Usage, code_details_csv endpoint error occurred.").into())
        })
    }

    fn offer_assignment_summary(&self, user_email: String) -> ServiceFuture<Vec<OfferAssignmentSummary>> {
        if let Err(e) = self.authorized_user("view offer assignment summary") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);

            assignments_repo
                .find_by(OfferAssignmentSearch::Email(normalize_email(&user_email)))
                .and_then(|assignments| {
                    let assignments: Vec<OfferAssignment> = assignments.into_iter().filter(|assignment| assignment.is_active()).collect();
                    let mut voucher_ids: Vec<VoucherId> = assignments.iter().map(|assignment| assignment.voucher_id).collect();
                    voucher_ids.sort();
                    voucher_ids.dedup();

                    let vouchers = vouchers_repo.find_by(VoucherSearch::Ids(voucher_ids))?;
                    let mut coupon_ids: Vec<CouponId> = vouchers.iter().map(|voucher| voucher.coupon_id).collect();
                    coupon_ids.sort();
                    coupon_ids.dedup();
                    let coupons = coupons_repo.find_many(coupon_ids)?;

                    Ok(VoucherUsage::group(vouchers, assignments, vec![])
                        .iter()
                        .filter_map(|usage| {
                            coupons
                                .iter()
                                .find(|coupon| coupon.id == usage.voucher.coupon_id)
                                .and_then(|coupon| OfferAssignmentSummary::new(coupon, usage, &user_email))
                        }).collect())
                }).map_err(|e: FailureError| e.context("Service Usage, offer_assignment_summary endpoint error occurred.").into())
        })
    }
}

/// Vouchers of a coupon in id order, each with its assignments and redemptions.
pub fn load_usages(
    vouchers_repo: &dyn VouchersRepo,
    assignments_repo: &dyn OfferAssignmentsRepo,
    applications_repo: &dyn VoucherApplicationsRepo,
    coupon_id: CouponId,
) -> RepoResult<Vec<VoucherUsage>> {
    let vouchers = vouchers_repo.find_by(VoucherSearch::Coupon(coupon_id))?;
    let voucher_ids: Vec<VoucherId> = vouchers.iter().map(|voucher| voucher.id).collect();
    let assignments = assignments_repo.find_by(OfferAssignmentSearch::Vouchers(voucher_ids.clone()))?;
    let applications = applications_repo.find_by_vouchers(voucher_ids)?;
    Ok(VoucherUsage::group(vouchers, assignments, applications))
}

pub fn parse_code_filter(code_filter: Option<String>) -> Result<CodeFilter, ValidationErrors> {
    match code_filter {
        None => Err(single_error("code_filter", "required", "code_filter must be specified".to_string())),
        Some(value) => value
            .parse::<CodeFilter>()
            .map_err(|_| single_error("code_filter", "invalid", format!("Invalid code_filter specified: {}", value))),
    }
}

/// Renders code rows with CRLF line endings, quoting values that need it.
pub fn render_csv(rows: &[CodeUsage]) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");
    for row in rows {
        let fields = [
            csv_field(&row.assigned_to),
            csv_field(&row.code),
            csv_field(&row.redeem_url),
            row.redemptions.total.to_string(),
            row.redemptions.used.to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(|c| c == ',' || c == '"' || c == '\n' || c == '\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
