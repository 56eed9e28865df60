//! Redemptions Services, usage events recorded against vouchers
use chrono::{DateTime, Utc};
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use errors::Error;
use models::*;
use repos::{OfferAssignmentSearch, ReposFactory, VoucherSearch};
use services::{service_error, Service};

pub trait RedemptionsService {
    /// Records a redemption of the code by a customer
    fn redeem(&self, payload: RedeemPayload) -> ServiceFuture<VoucherApplication>;
    /// Checks whether the customer may redeem the code
    fn validate_voucher(&self, code: String, email: String) -> ServiceFuture<VoucherValidate>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > RedemptionsService for Service<T, M, F>
{
    fn redeem(&self, payload: RedeemPayload) -> ServiceFuture<VoucherApplication> {
        if let Err(e) = self.authorized_user("redeem voucher") {
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

            conn.transaction::<VoucherApplication, FailureError, _>(move || {
                let voucher = vouchers_repo
                    .find_by(VoucherSearch::Code(payload.code.clone()))?
                    .pop()
                    .ok_or(Error::NotFound)?;
                let coupon = coupons_repo.get_for_update(voucher.coupon_id)?.ok_or(Error::NotFound)?;
                let assignments = assignments_repo.find_by(OfferAssignmentSearch::Vouchers(vec![voucher.id]))?;
                let applications = applications_repo.find_by_vouchers(vec![voucher.id])?;
                let usage = VoucherUsage::group(vec![voucher], assignments, applications)
                    .pop()
                    .ok_or(Error::NotFound)?;

                let outcome = check_voucher(&coupon, &usage, &payload.user_email, Utc::now());
                if outcome != VoucherValidate::Valid {
                    return Err(format_err!("Voucher {} rejected for {}", usage.voucher.code, payload.user_email)
                        .context(Error::Rejected(outcome))
                        .into());
                }

                let application = applications_repo.create(NewVoucherApplication {
                    voucher_id: usage.voucher.id,
                    user_email: normalize_email(&payload.user_email),
                    order_number: payload.order_number.clone(),
                })?;
                vouchers_repo.increment_num_orders(usage.voucher.id)?;

                let held: Vec<OfferAssignmentId> = usage
                    .active_assignments_for(&payload.user_email)
                    .map(|assignment| assignment.id)
                    .collect();
                if let Some((oldest, rest)) = held.split_first() {
                    assignments_repo.set_status(vec![*oldest], OfferAssignmentStatus::Redeemed)?;
                    if coupon.voucher_type == VoucherType::MultiUsePerCustomer && !rest.is_empty() {
                        assignments_repo.set_status(rest.to_vec(), OfferAssignmentStatus::PartiallyRedeemed)?;
                    }
                }

                info!("Voucher {} redeemed by {} for order {}", usage.voucher.code, payload.user_email, payload.order_number);
                Ok(application)
            }).map_err(|e| e.context("Service Redemptions, redeem endpoint error occurred.").into())
        })
    }

    fn validate_voucher(&self, code: String, email: String) -> ServiceFuture<VoucherValidate> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn);
            let vouchers_repo = repo_factory.create_vouchers_repo(&*conn);
            let assignments_repo = repo_factory.create_offer_assignments_repo(&*conn);
            let applications_repo = repo_factory.create_voucher_applications_repo(&*conn);

            vouchers_repo
                .find_by(VoucherSearch::Code(code))
                .and_then(|mut vouchers| {
                    let voucher = vouchers.pop().ok_or(Error::NotFound)?;
                    let coupon = coupons_repo.get(voucher.coupon_id)?.ok_or(Error::NotFound)?;
                    let assignments = assignments_repo.find_by(OfferAssignmentSearch::Vouchers(vec![voucher.id]))?;
                    let applications = applications_repo.find_by_vouchers(vec![voucher.id])?;
                    let usage = VoucherUsage::group(vec![voucher], assignments, applications)
                        .pop()
                        .ok_or(Error::NotFound)?;
                    Ok(check_voucher(&coupon, &usage, &email, Utc::now()))
                }).map_err(|e: FailureError| e.context("Service Redemptions, validate_voucher endpoint error occurred.").into())
        })
    }
}

/// Decides whether `email` may redeem the voucher at `now`.
pub fn check_voucher(coupon: &Coupon, usage: &VoucherUsage, email: &str, now: DateTime<Utc>) -> VoucherValidate {
    if !coupon.is_active || now < coupon.start_at {
        return VoucherValidate::NotActive;
    }
    if now >= coupon.end_at {
        return VoucherValidate::HasExpired;
    }

    let normalized = normalize_email(email);
    let email = normalized.as_str();
    let redeemed_by_email = usage.redemptions_by(email) > 0;
    match coupon.voucher_type {
        VoucherType::SingleUse if usage.num_redemptions() > 0 => return VoucherValidate::AlreadyActivated,
        VoucherType::OncePerCustomer if redeemed_by_email => return VoucherValidate::AlreadyActivated,
        VoucherType::MultiUsePerCustomer => {
            if usage.active_assignments().any(|assignment| normalize_email(&assignment.user_email) != email) {
                return VoucherValidate::AssignedToAnotherCustomer;
            }
        }
        _ => {}
    }

    let holds_assignment = usage.active_assignments_for(email).next().is_some();
    let has_slot = if holds_assignment {
        usage.num_redemptions() < coupon.max_uses
    } else {
        usage.num_redemptions() + usage.num_active() < coupon.max_uses
    };
    if has_slot {
        VoucherValidate::Valid
    } else {
        VoucherValidate::NoActivationsAvailable
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tokio_core::reactor::Core;

    use errors::Error;
    use models::*;
    use notifications::tests::*;
    use repos::repo_factory::tests::*;
    use services::*;

    fn redeem_payload(code: &str, email: &str) -> RedeemPayload {
        RedeemPayload {
            code: code.to_string(),
            user_email: email.to_string(),
            order_number: "EDX-100042".to_string(),
        }
    }

    #[test]
    fn test_redeem_marks_assignment_redeemed() {
        let mut core = Core::new().unwrap();
        let factory = ReposFactoryMock::default();
        let (_, vouchers) = factory.seed_coupon(VoucherType::SingleUse, 1, 1);
        factory.seed_assignment(&vouchers[0], "a@example.com", OfferAssignmentStatus::Assigned);
        let service = create_service(Some(MOCK_USER_ID), factory.clone(), create_notifications_mock());

        let application = core.run(service.redeem(redeem_payload("CODE1", "a@example.com"))).unwrap();
        assert_eq!(application.user_email, "a@example.com");
        assert_eq!(factory.assignments()[0].status, OfferAssignmentStatus::Redeemed);
        assert_eq!(factory.store.lock().unwrap().vouchers[0].num_orders, 1);

        let err = core
            .run(service.redeem(redeem_payload("CODE1", "b@example.com")))
            .unwrap_err();
        let rejected = err.iter_chain().filter_map(|cause| cause.downcast_ref::<Error>()).next();
        match rejected {
            Some(Error::Rejected(VoucherValidate::AlreadyActivated)) => {}
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_redeem_matches_email_ignoring_case() {
        let mut core = Core::new().unwrap();
        let factory = ReposFactoryMock::default();
        let (_, vouchers) = factory.seed_coupon(VoucherType::OncePerCustomer, 5, 1);
        factory.seed_assignment(&vouchers[0], "a@example.com", OfferAssignmentStatus::Assigned);
        let service = create_service(Some(MOCK_USER_ID), factory.clone(), create_notifications_mock());

        let application = core.run(service.redeem(redeem_payload("CODE1", "A@Example.com"))).unwrap();
        assert_eq!(application.user_email, "a@example.com");
        assert_eq!(factory.assignments()[0].status, OfferAssignmentStatus::Redeemed);

        let outcome = core
            .run(service.validate_voucher("CODE1".to_string(), "A@EXAMPLE.COM".to_string()))
            .unwrap();
        assert_eq!(outcome, VoucherValidate::AlreadyActivated);
    }

    #[test]
    fn test_redeem_multi_use_per_customer_partially() {
        let mut core = Core::new().unwrap();
        let factory = ReposFactoryMock::default();
        let (_, vouchers) = factory.seed_coupon(VoucherType::MultiUsePerCustomer, 3, 1);
        for _ in 0..3 {
            factory.seed_assignment(&vouchers[0], "a@example.com", OfferAssignmentStatus::Assigned);
        }
        let service = create_service(Some(MOCK_USER_ID), factory.clone(), create_notifications_mock());

        core.run(service.redeem(redeem_payload("CODE1", "a@example.com"))).unwrap();
        let statuses: Vec<OfferAssignmentStatus> = factory.assignments().iter().map(|a| a.status).collect();
        assert_eq!(
            statuses,
            vec![
                OfferAssignmentStatus::Redeemed,
                OfferAssignmentStatus::PartiallyRedeemed,
                OfferAssignmentStatus::PartiallyRedeemed,
            ]
        );

        let outcome = core.run(service.validate_voucher("CODE1".to_string(), "b@example.com".to_string())).unwrap();
        assert_eq!(outcome, VoucherValidate::AssignedToAnotherCustomer);
    }

    #[test]
    fn test_validate_voucher_outcomes() {
        let mut core = Core::new().unwrap();
        let factory = ReposFactoryMock::default();
        let (coupon, vouchers) = factory.seed_coupon(VoucherType::MultiUse, 2, 1);
        factory.seed_assignment(&vouchers[0], "a@example.com", OfferAssignmentStatus::Assigned);
        factory.seed_application(&vouchers[0], "c@example.com");
        let service = create_service(None, factory.clone(), create_notifications_mock());

        let check = |email: &str, core: &mut Core| core.run(service.validate_voucher("CODE1".to_string(), email.to_string())).unwrap();
        assert_eq!(check("a@example.com", &mut core), VoucherValidate::Valid);
        assert_eq!(check("b@example.com", &mut core), VoucherValidate::NoActivationsAvailable);

        factory.update_coupon(coupon.id, |coupon| coupon.end_at = Utc::now() - Duration::minutes(1));
        assert_eq!(check("a@example.com", &mut core), VoucherValidate::HasExpired);
        factory.update_coupon(coupon.id, |coupon| coupon.is_active = false);
        assert_eq!(check("a@example.com", &mut core), VoucherValidate::NotActive);
    }

    #[test]
    fn test_check_once_per_customer() {
        let factory = ReposFactoryMock::default();
        let (coupon, vouchers) = factory.seed_coupon(VoucherType::OncePerCustomer, 5, 1);
        let application = factory.seed_application(&vouchers[0], "a@example.com");
        let usage = VoucherUsage {
            voucher: vouchers[0].clone(),
            assignments: vec![],
            applications: vec![application],
        };

        assert_eq!(
            check_voucher(&coupon, &usage, "a@example.com", Utc::now()),
            VoucherValidate::AlreadyActivated
        );
        assert_eq!(check_voucher(&coupon, &usage, "b@example.com", Utc::now()), VoucherValidate::Valid);
    }
}
