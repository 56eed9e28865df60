//! Coupons Services, presents CRUD operations with coupons and their vouchers

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use r2d2::ManageConnection;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::types::ServiceFuture;
use errors::Error;
use models::validation_rules::{collect_errors, single_error, validation_error};
use models::*;
use repos::{ReposFactory, VoucherSearch};
use services::usage::load_usages;
use services::{service_error, Service};

pub trait CouponsService {
    /// Creates new coupon with its vouchers
    fn create_coupon(&self, payload: NewCouponPayload) -> ServiceFuture<CouponWithCodes>;
    /// Returns coupons of an enterprise
    fn list_coupons(&self, enterprise_customer_uuid: Uuid) -> ServiceFuture<Vec<Coupon>>;
    /// Returns coupon by id
    fn get_coupon(&self, id_arg: CouponId) -> ServiceFuture<Coupon>;
    /// Update coupon
    fn update_coupon(&self, id_arg: CouponId, payload: UpdateCoupon) -> ServiceFuture<Coupon>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > CouponsService for Service<T, M, F>
{
    /// Creates new coupon with its vouchers
    fn create_coupon(&self, payload: NewCouponPayload) -> ServiceFuture<CouponWithCodes> {
        if let Err(e) = self.authorized_user("create coupon") {
            return service_error(e);
        }
        if let Err(errors) = payload.validate_payload() {
            return service_error(Error::Validate(errors).into());
        }

        let repo_factory = self.static_context.repo_factory.clone();
        let notifications = self.static_context.notifications.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);

            let quantity = payload.quantity;
            let custom_code = payload.code.clone();

            let created = conn
                .transaction::<CouponWithCodes, FailureError, _>(move || {
                    if let Some(ref code) = custom_code {
                        if !vouchers_repo.find_by(VoucherSearch::Code(code.clone()))?.is_empty() {
                            return Err(Error::Validate(single_error("code", "unique", "This code already exists.".to_string())).into());
                        }
                    }

                    let coupon = coupons_repo.create(payload.into())?;
                    let new_vouchers = match custom_code {
                        Some(code) => vec![NewVoucher { coupon_id: coupon.id, code }],
                        None => (0..quantity)
                            .map(|_| NewVoucher {
                                coupon_id: coupon.id,
                                code: generate_voucher_code(),
                            }).collect(),
                    };
                    let codes = vouchers_repo
                        .create_many(new_vouchers)?
                        .into_iter()
                        .map(|voucher| voucher.code)
                        .collect();
                    Ok(CouponWithCodes { coupon, codes })
                }).map_err(|e: FailureError| e.context("Service Coupons, create endpoint error occurred."))?;

            info!("Created coupon {} with {} codes", created.coupon.id, created.codes.len());

            if let Some(ref notify_email) = created.coupon.notify_email {
                let notification = Notification::new(NotificationKind::NewCodes, created.coupon.id, notify_email.clone(), created.codes.clone());
                if let Err(e) = notifications.enqueue(notification) {
                    error!("Failed to enqueue new codes notification for coupon {}: {}", created.coupon.id, e);
                }
            }

            Ok(created)
        })
    }

    /// Returns coupons of an enterprise
    fn list_coupons(&self, enterprise_customer_uuid: Uuid) -> ServiceFuture<Vec<Coupon>> {
        if let Err(e) = self.authorized_user("list coupons") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);

            coupons_repo
                .list_for_enterprise(enterprise_customer_uuid)
                .map_err(|e| e.context("Service Coupons, list endpoint error occurred.").into())
        })
    }

    /// Returns coupon by id
    fn get_coupon(&self, id_arg: CouponId) -> ServiceFuture<Coupon> {
        if let Err(e) = self.authorized_user("get coupon") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);

            coupons_repo
                .get(id_arg)
                .and_then(|coupon| coupon.ok_or_else(|| Error::NotFound.into()))
                .map_err(|e| e.context("Service Coupons, get_coupon endpoint error occurred.").into())
        })
    }

    /// Update coupon
    fn update_coupon(&self, id_arg: CouponId, payload: UpdateCoupon) -> ServiceFuture<Coupon> {
        if let Err(e) = self.authorized_user("update coupon") {
            return service_error(e);
        }
        if let Err(errors) = payload.validate() {
            return service_error(Error::Validate(errors).into());
        }

        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            conn.transaction::<Coupon, FailureError, _>(move || {
                let current = coupons_repo.get_for_update(id_arg)?.ok_or(Error::NotFound)?;
                let usages = load_usages(&*vouchers_repo, &*assignments_repo, &*applications_repo, current.id)?;
                check_update(&current, &payload, &usages).map_err(Error::Validate)?;

                let raised = payload.max_uses.map_or(false, |max_uses| max_uses > current.max_uses);
                let updated = coupons_repo.update(id_arg, payload)?;

                if raised && updated.voucher_type == VoucherType::MultiUsePerCustomer {
                    let top_up = top_up_assignments(&usages, updated.max_uses);
                    debug!("Topping up {} assignments of coupon {}", top_up.len(), updated.id);
                    assignments_repo.create_many(top_up)?;
                }
                Ok(updated)
            }).map_err(|e| e.context("Service Coupons, update endpoint error occurred.").into())
        })
    }
}

/// Rules of an update that depend on the stored coupon and its ledger.
pub fn check_update(current: &Coupon, payload: &UpdateCoupon, usages: &[VoucherUsage]) -> Result<(), ValidationErrors> {
    let mut errors = vec![];

    if let Some(error) = check_max_uses(current.voucher_type, payload.max_uses) {
        errors.push(("max_uses", error));
    } else if let Some(max_uses) = payload.max_uses {
        let taken = usages
            .iter()
            .map(|usage| usage.num_active() + usage.num_redemptions())
            .max()
            .unwrap_or(0);
        if max_uses < taken {
            errors.push((
                "max_uses",
                validation_error(
                    "range",
                    format!("Max uses can not be lower than {} already assigned or redeemed uses.", taken),
                ),
            ));
        }
    }

    let start_at = payload.start_at.unwrap_or(current.start_at);
    let end_at = payload.end_at.unwrap_or(current.end_at);
    if start_at >= end_at {
        errors.push((
            "end_at",
            validation_error("range", "End datetime must be after start datetime.".to_string()),
        ));
    }

    collect_errors(errors)
}

/// New assignments filling every assigned voucher up to `max_uses` for its holder.
pub fn top_up_assignments(usages: &[VoucherUsage], max_uses: i32) -> Vec<NewOfferAssignment> {
    usages
        .iter()
        .filter_map(|usage| usage.active_emails().into_iter().next().map(|email| (usage, email)))
        .flat_map(|(usage, email)| {
            (0..usage.free_slots(max_uses)).map(move |_| NewOfferAssignment {
                voucher_id: usage.voucher.id,
                code: usage.voucher.code.clone(),
                user_email: email.clone(),
                status: OfferAssignmentStatus::Assigned,
            })
        }).collect()
}
