//! Assignments Services, the ledger binding codes to recipient emails:
//! assign, revoke, remind and delivery bounces.
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use r2d2::ManageConnection;

use super::types::ServiceFuture;
use errors::{CouponAction, Error};
use models::validation_rules::{normalize_email, single_error};
use models::*;
use notifications::NotificationsQueue;
use repos::{CouponsRepo, ReposFactory};
use services::usage::load_usages;
use services::{service_error, Service};

pub trait AssignmentsService {
    /// Assigns codes of the coupon to every email, all or nothing
    fn assign_codes(&self, coupon_id: CouponId, payload: AssignCodesPayload) -> ServiceFuture<AssignCodesResponse>;
    /// Revokes active assignments, reporting every pair separately
    fn revoke_codes(&self, coupon_id: CouponId, payload: RevokeCodesPayload) -> ServiceFuture<Vec<ItemResult>>;
    /// Sends reminders to explicit pairs or to every assignment of a bucket
    fn remind_codes(&self, coupon_id: CouponId, payload: RemindCodesPayload) -> ServiceFuture<Vec<ItemResult>>;
    /// Marks an active assignment as bounced
    fn email_bounced(&self, id_arg: OfferAssignmentId) -> ServiceFuture<OfferAssignment>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > AssignmentsService for Service<T, M, F>
{
    fn assign_codes(&self, coupon_id: CouponId, payload: AssignCodesPayload) -> ServiceFuture<AssignCodesResponse> {
        if let Err(e) = self.authorized_user("assign codes") {
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
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            let AssignCodesPayload {
                template,
                template_greeting,
                template_closing,
                emails,
                codes,
            } = payload;
            let emails: Vec<String> = emails.iter().map(|email| normalize_email(email)).collect();

            let assigned = conn
                .transaction::<Vec<OfferAssignment>, FailureError, _>(|| {
                    let coupon = lock_available_coupon(&*coupons_repo, coupon_id, CouponAction::Assignment)?;
                    let usages = load_usages(&*vouchers_repo, &*assignments_repo, &*applications_repo, coupon.id)?;
                    let usages = restrict_to_codes(usages, &codes)?;
                    let planned = plan_assignments(coupon.voucher_type, coupon.max_uses, &usages, &emails).ok_or(Error::NotEnoughCodes)?;
                    assignments_repo.create_many(planned)
                }).map_err(|e: FailureError| e.context("Service Assignments, assign_codes endpoint error occurred."))?;

            info!("Assigned {} offer assignments of coupon {}", assigned.len(), coupon_id);

            let mut offer_assignments = vec![];
            for email in &emails {
                let own: Vec<&OfferAssignment> = assigned.iter().filter(|assignment| &assignment.user_email == email).collect();
                let mut codes: Vec<String> = own.iter().map(|assignment| assignment.code.clone()).collect();
                codes.dedup();
                let notification = Notification::new(NotificationKind::Assign, coupon_id, email.clone(), codes).with_template(
                    template.clone(),
                    template_greeting.as_ref(),
                    template_closing.as_ref(),
                );
                let outcome = dispatch(&notifications, notification);
                offer_assignments.extend(own.into_iter().map(|assignment| AssignedCode {
                    id: assignment.id,
                    code: assignment.code.clone(),
                    user_email: assignment.user_email.clone(),
                    notification: outcome.clone(),
                }));
            }

            Ok(AssignCodesResponse {
                coupon_id,
                offer_assignments,
            })
        })
    }

    fn revoke_codes(&self, coupon_id: CouponId, payload: RevokeCodesPayload) -> ServiceFuture<Vec<ItemResult>> {
        if let Err(e) = self.authorized_user("revoke codes") {
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
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            let RevokeCodesPayload {
                assignments,
                template,
                template_greeting,
                template_closing,
            } = payload;

            let results = conn
                .transaction::<Vec<ItemResult>, FailureError, _>(|| {
                    let coupon = lock_available_coupon(&*coupons_repo, coupon_id, CouponAction::Revoke)?;
                    let usages = load_usages(&*vouchers_repo, &*assignments_repo, &*applications_repo, coupon.id)?;

                    let mut results = vec![];
                    let mut revoked_ids = vec![];
                    for pair in &assignments {
                        let resolved = resolve_pair(&usages, pair).and_then(|ids| {
                            if ids.iter().all(|id| revoked_ids.contains(id)) {
                                Err(no_assignments(pair))
                            } else {
                                Ok(ids)
                            }
                        });
                        match resolved {
                            Ok(ids) => {
                                assignments_repo.set_status(ids.clone(), OfferAssignmentStatus::Revoked)?;
                                revoked_ids.extend(ids);
                                results.push(ItemResult::success(pair));
                            }
                            Err(message) => results.push(ItemResult::failure(pair, message)),
                        }
                    }
                    Ok(results)
                }).map_err(|e: FailureError| e.context("Service Assignments, revoke_codes endpoint error occurred."))?;

            let revoked = results.iter().filter(|result| result.is_success()).count();
            info!("Revoked {} of {} requested assignments of coupon {}", revoked, results.len(), coupon_id);

            let template = match template {
                Some(template) => template,
                None => return Ok(results),
            };
            Ok(results
                .into_iter()
                .map(|mut result| {
                    if result.is_success() {
                        let notification = Notification::new(NotificationKind::Revoke, coupon_id, result.email.clone(), vec![result.code.clone()])
                            .with_template(template.clone(), template_greeting.as_ref(), template_closing.as_ref());
                        result.detail = dispatch(&notifications, notification);
                    }
                    result
                }).collect())
        })
    }

    fn remind_codes(&self, coupon_id: CouponId, payload: RemindCodesPayload) -> ServiceFuture<Vec<ItemResult>> {
        if let Err(e) = self.authorized_user("remind codes") {
            return service_error(e);
        }
        let targets = match payload.validate_payload() {
            Ok(targets) => targets,
            Err(errors) => return service_error(Error::Validate(errors).into()),
        };

        let repo_factory = self.static_context.repo_factory.clone();
        let notifications = self.static_context.notifications.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            let (coupon, usages) = coupons_repo
                .get(coupon_id)
                .and_then(|coupon| {
                    let coupon = coupon.ok_or(Error::NotFound)?;
                    check_available(&coupon, CouponAction::Remind)?;
                    let usages = load_usages(&*vouchers_repo, &*assignments_repo, &*applications_repo, coupon.id)?;
                    Ok((coupon, usages))
                }).map_err(|e: FailureError| e.context("Service Assignments, remind_codes endpoint error occurred."))?;

            let reminders: Vec<(EmailCodePair, Result<i32, String>)> = match targets {
                RemindTargets::Pairs(pairs) => pairs
                    .into_iter()
                    .map(|pair| {
                        let remaining = resolve_pair(&usages, &pair).map(|ids| ids.len() as i32);
                        (pair, remaining)
                    }).collect(),
                RemindTargets::Filter(filter) => remind_targets(&usages, filter)
                    .into_iter()
                    .map(|(pair, remaining)| (pair, Ok(remaining)))
                    .collect(),
            };

            let mut results = vec![];
            for (pair, remaining) in reminders {
                let result = match remaining {
                    Ok(remaining) => {
                        let notification = Notification::new(NotificationKind::Remind, coupon.id, pair.email.clone(), vec![pair.code.clone()])
                            .with_template(
                                payload.template.clone(),
                                payload.template_greeting.as_ref(),
                                payload.template_closing.as_ref(),
                            ).with_redemptions_remaining(remaining);
                        let mut result = ItemResult::success(&pair);
                        result.detail = dispatch(&notifications, notification);
                        result
                    }
                    Err(message) => ItemResult::failure(&pair, message),
                };
                results.push(result);
            }

            info!("Sent {} reminders for coupon {}", results.len(), coupon_id);
            Ok(results)
        })
    }

    fn email_bounced(&self, id_arg: OfferAssignmentId) -> ServiceFuture<OfferAssignment> {
        if let Err(e) = self.authorized_user("report bounced email") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            conn.transaction::<OfferAssignment, FailureError, _>(move || {
                let assignment = assignments_repo
                    .get(id_arg)?
                    .filter(|assignment| assignment.is_active())
                    .ok_or(Error::NotFound)?;
                let mut updated = assignments_repo.set_status(vec![assignment.id], OfferAssignmentStatus::EmailBounced)?;
                updated.pop().ok_or_else(|| format_err!("Offer assignment {} vanished during update", id_arg))
            }).map_err(|e| e.context("Service Assignments, email_bounced endpoint error occurred.").into())
        })
    }
}

/// Locks the coupon row for the rest of the transaction and checks it is open for `action`.
fn lock_available_coupon(coupons_repo: &dyn CouponsRepo, coupon_id: CouponId, action: CouponAction) -> Result<Coupon, FailureError> {
    let coupon = coupons_repo.get_for_update(coupon_id)?.ok_or(Error::NotFound)?;
    check_available(&coupon, action)?;
    Ok(coupon)
}

fn check_available(coupon: &Coupon, action: CouponAction) -> Result<(), Error> {
    if coupon.is_available(Utc::now()) {
        Ok(())
    } else {
        Err(Error::CouponUnavailable(action))
    }
}

/// Keeps only the requested codes; an empty list keeps every voucher.
fn restrict_to_codes(usages: Vec<VoucherUsage>, codes: &[String]) -> Result<Vec<VoucherUsage>, Error> {
    if codes.is_empty() {
        return Ok(usages);
    }
    if let Some(unknown) = codes.iter().find(|code| !usages.iter().any(|usage| &&usage.voucher.code == code)) {
        return Err(Error::Validate(single_error("codes", "association", not_associated(unknown))));
    }
    Ok(usages.into_iter().filter(|usage| codes.contains(&usage.voucher.code)).collect())
}

fn no_assignments(pair: &EmailCodePair) -> String {
    format!("No assignments exist for user {} and code {}", pair.email, pair.code)
}

fn not_associated(code: &str) -> String {
    format!("Code {} is not associated with this Coupon", code)
}

/// Picks one use-slot per email, `None` when capacity falls short.
///
/// Vouchers without active assignments are preferred, then lower ids. A
/// multi-use-per-customer voucher goes to a single email with all of its slots.
pub fn plan_assignments(voucher_type: VoucherType, max_uses: i32, usages: &[VoucherUsage], emails: &[String]) -> Option<Vec<NewOfferAssignment>> {
    let new_row = |usage: &VoucherUsage, email: &String| NewOfferAssignment {
        voucher_id: usage.voucher.id,
        code: usage.voucher.code.clone(),
        user_email: normalize_email(email),
        status: OfferAssignmentStatus::Assigned,
    };

    if voucher_type == VoucherType::MultiUsePerCustomer {
        let fresh: Vec<&VoucherUsage> = usages.iter().filter(|usage| usage.is_fresh()).collect();
        if fresh.len() < emails.len() {
            return None;
        }
        return Some(
            emails
                .iter()
                .zip(fresh)
                .flat_map(|(email, usage)| (0..max_uses).map(move |_| new_row(usage, email)))
                .collect(),
        );
    }

    let mut eligible: Vec<&VoucherUsage> = usages
        .iter()
        .filter(|usage| match voucher_type {
            VoucherType::OncePerCustomer => usage.is_fresh(),
            _ => usage.free_slots(max_uses) > 0,
        }).collect();
    eligible.sort_by_key(|usage| (usage.num_active() > 0, usage.voucher.id));

    let slots = eligible
        .into_iter()
        .flat_map(|usage| (0..usage.free_slots(max_uses)).map(move |_| usage));
    let planned: Vec<NewOfferAssignment> = emails.iter().zip(slots).map(|(email, usage)| new_row(usage, email)).collect();
    if planned.len() < emails.len() {
        None
    } else {
        Some(planned)
    }
}

/// Active assignment ids of a pair, or the failure message reported for it.
pub fn resolve_pair(usages: &[VoucherUsage], pair: &EmailCodePair) -> Result<Vec<OfferAssignmentId>, String> {
    let usage = usages
        .iter()
        .find(|usage| usage.voucher.code == pair.code)
        .ok_or_else(|| not_associated(&pair.code))?;
    let ids: Vec<OfferAssignmentId> = usage.active_assignments_for(&pair.email).map(|assignment| assignment.id).collect();
    if ids.is_empty() {
        Err(no_assignments(pair))
    } else {
        Ok(ids)
    }
}

/// Distinct pairs whose assignments fall in `filter`, sorted by email then code,
/// with the number of active assignments each pair holds.
pub fn remind_targets(usages: &[VoucherUsage], filter: CodeFilter) -> Vec<(EmailCodePair, i32)> {
    let matches = |status: OfferAssignmentStatus| match filter {
        CodeFilter::Unredeemed => status == OfferAssignmentStatus::Assigned || status == OfferAssignmentStatus::EmailBounced,
        CodeFilter::PartiallyRedeemed => status == OfferAssignmentStatus::PartiallyRedeemed,
        CodeFilter::Unassigned | CodeFilter::Redeemed => false,
    };

    let mut targets: BTreeMap<(String, String), i32> = BTreeMap::new();
    for usage in usages {
        for assignment in usage.assignments.iter().filter(|assignment| matches(assignment.status)) {
            let key = (assignment.user_email.clone(), assignment.code.clone());
            let remaining = usage.active_assignments_for(&assignment.user_email).count() as i32;
            targets.insert(key, remaining);
        }
    }
    targets
        .into_iter()
        .map(|((email, code), remaining)| (EmailCodePair { email, code }, remaining))
        .collect()
}

/// Enqueues and reports `success` or the queue failure message.
fn dispatch(notifications: &Arc<dyn NotificationsQueue>, notification: Notification) -> String {
    let recipient = notification.recipient.clone();
    match notifications.enqueue(notification) {
        Ok(()) => ItemDetail::Success.to_string(),
        Err(e) => {
            error!("Failed to enqueue notification for {}: {}", recipient, e);
            e.to_string()
        }
    }
}
