//! Payments Services, checkout through the payment gateway with a local
//! transaction ledger, plus the embargo check done before checkout.
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use errors::Error;
use models::*;
use payments::{embargo_check, verify_signature};
use repos::{PaymentTransactionSearch, ReposFactory};
use services::{service_error, Service};

pub trait PaymentsService {
    /// Opens a gateway order and records the initiated transaction
    fn start_payment(&self, payload: NewPaymentPayload) -> ServiceFuture<PaymentCheckout>;
    fn get_payment(&self, txn_id: String) -> ServiceFuture<PaymentTransaction>;
    /// Verifies the checkout callback and stores the gateway payment details
    fn confirm_payment(&self, txn_id: String, payload: ConfirmPaymentPayload) -> ServiceFuture<PaymentTransaction>;
    fn capture_payment(&self, gateway_payment_id: String) -> ServiceFuture<PaymentTransaction>;
    fn refund_payment(&self, gateway_payment_id: String, payload: RefundPaymentPayload) -> ServiceFuture<PaymentTransaction>;
    /// Whether the learner may buy the courses, granted when the embargo api fails
    fn check_embargo(&self, query: EmbargoQuery) -> ServiceFuture<EmbargoAccess>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > PaymentsService for Service<T, M, F>
{
    fn start_payment(&self, payload: NewPaymentPayload) -> ServiceFuture<PaymentCheckout> {
        if let Err(e) = self.authorized_user("start payment") {
            return service_error(e);
        }
        if let Err(errors) = payload.validate() {
            return service_error(Error::Validate(errors).into());
        }

        let repo_factory = self.static_context.repo_factory.clone();
        let gateway = self.static_context.payments.gateway.clone();
        let config = self.static_context.config.clone();

        self.spawn_on_pool(move |conn| {
            let transactions_repo = repo_factory.create_payment_transactions_repo(&*conn);
            let currency = payload.currency.clone().unwrap_or_else(|| config.payments.currency.clone());
            let txn_id = PaymentTransaction::generate_txn_id();

            gateway
                .create_order(payload.amount, &currency, &txn_id)
                .and_then(|order| {
                    transactions_repo.create(NewPaymentTransaction {
                        txn_id,
                        user_email: normalize_email(&payload.user_email),
                        order_number: payload.order_number,
                        amount: payload.amount,
                        currency,
                        status: PaymentStatus::Initiated,
                        gateway_order_id: order.id,
                    })
                }).map(|transaction| {
                    info!("Payment {} initiated for order {}", transaction.txn_id, transaction.order_number);
                    PaymentCheckout {
                        txn_id: transaction.txn_id,
                        gateway_order_id: transaction.gateway_order_id,
                        gateway_key: config.payments.key_id.clone(),
                        amount: transaction.amount,
                        currency: transaction.currency,
                        user_email: transaction.user_email,
                    }
                }).map_err(|e: FailureError| e.context("Service Payments, start_payment endpoint error occurred.").into())
        })
    }

    fn get_payment(&self, txn_id: String) -> ServiceFuture<PaymentTransaction> {
        if let Err(e) = self.authorized_user("view payment") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let transactions_repo = repo_factory.create_payment_transactions_repo(&*conn);
            transactions_repo
                .find(PaymentTransactionSearch::TxnId(txn_id))
                .and_then(|transaction| transaction.ok_or_else(|| Error::NotFound.into()))
                .map_err(|e: FailureError| e.context("Service Payments, get_payment endpoint error occurred.").into())
        })
    }

    fn confirm_payment(&self, txn_id: String, payload: ConfirmPaymentPayload) -> ServiceFuture<PaymentTransaction> {
        if let Err(e) = self.authorized_user("confirm payment") {
            return service_error(e);
        }
        if let Err(errors) = payload.validate() {
            return service_error(Error::Validate(errors).into());
        }

        let repo_factory = self.static_context.repo_factory.clone();
        let gateway = self.static_context.payments.gateway.clone();
        let config = self.static_context.config.clone();

        self.spawn_on_pool(move |conn| {
            let transactions_repo = repo_factory.create_payment_transactions_repo(&*conn);
            conn.transaction::<PaymentTransaction, FailureError, _>(move || {
                let transaction = transactions_repo
                    .find_for_update(PaymentTransactionSearch::TxnId(txn_id))?
                    .ok_or(Error::NotFound)?;
                if !verify_signature(
                    &config.payments.key_secret,
                    &transaction.gateway_order_id,
                    &payload.gateway_payment_id,
                    &payload.signature,
                ) {
                    return Err(rejected(&transaction, "Payment signature does not match."));
                }

                let payment = gateway.fetch_payment(&payload.gateway_payment_id)?;
                let status = check_gateway_payment(&transaction, &payment).map_err(|message| rejected(&transaction, &message))?;
                let updated = transactions_repo.update(
                    transaction.id,
                    UpdatePaymentTransaction {
                        status: Some(status),
                        gateway_payment_id: Some(payment.id),
                    },
                )?;
                info!("Payment {} confirmed with status {}", updated.txn_id, updated.status);
                Ok(updated)
            }).map_err(|e| e.context("Service Payments, confirm_payment endpoint error occurred.").into())
        })
    }

    fn capture_payment(&self, gateway_payment_id: String) -> ServiceFuture<PaymentTransaction> {
        if let Err(e) = self.authorized_user("capture payment") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();
        let gateway = self.static_context.payments.gateway.clone();

        self.spawn_on_pool(move |conn| {
            let transactions_repo = repo_factory.create_payment_transactions_repo(&*conn);
            conn.transaction::<PaymentTransaction, FailureError, _>(move || {
                let transaction = transactions_repo
                    .find_for_update(PaymentTransactionSearch::GatewayPaymentId(gateway_payment_id.clone()))?
                    .ok_or(Error::NotFound)?;
                if transaction.status != PaymentStatus::Authorized {
                    let message = format!("Payment in status {} can not be captured.", transaction.status);
                    return Err(rejected(&transaction, &message));
                }

                gateway.capture(&gateway_payment_id, transaction.amount, &transaction.currency)?;
                let updated = transactions_repo.update(
                    transaction.id,
                    UpdatePaymentTransaction {
                        status: Some(PaymentStatus::Captured),
                        ..Default::default()
                    },
                )?;
                info!("Payment {} captured", updated.txn_id);
                Ok(updated)
            }).map_err(|e| e.context("Service Payments, capture_payment endpoint error occurred.").into())
        })
    }

    fn refund_payment(&self, gateway_payment_id: String, payload: RefundPaymentPayload) -> ServiceFuture<PaymentTransaction> {
        if let Err(e) = self.authorized_user("refund payment") {
            return service_error(e);
        }
        if let Err(errors) = payload.validate() {
            return service_error(Error::Validate(errors).into());
        }
        let repo_factory = self.static_context.repo_factory.clone();
        let gateway = self.static_context.payments.gateway.clone();

        self.spawn_on_pool(move |conn| {
            let transactions_repo = repo_factory.create_payment_transactions_repo(&*conn);
            conn.transaction::<PaymentTransaction, FailureError, _>(move || {
                let transaction = transactions_repo
                    .find_for_update(PaymentTransactionSearch::GatewayPaymentId(gateway_payment_id.clone()))?
                    .ok_or(Error::NotFound)?;
                check_refund(&transaction, &payload).map_err(|message| rejected(&transaction, &message))?;

                let refund = gateway.refund(&gateway_payment_id, payload.amount)?;
                info!("Payment {} refunded {} {} as {}", transaction.txn_id, refund.amount, transaction.currency, refund.id);
                if payload.amount < transaction.amount {
                    return Ok(transaction);
                }
                transactions_repo.update(
                    transaction.id,
                    UpdatePaymentTransaction {
                        status: Some(PaymentStatus::Refunded),
                        ..Default::default()
                    },
                )
            }).map_err(|e| e.context("Service Payments, refund_payment endpoint error occurred.").into())
        })
    }

    fn check_embargo(&self, query: EmbargoQuery) -> ServiceFuture<EmbargoAccess> {
        let embargo = self.static_context.payments.embargo.clone();
        Box::new(self.static_context.cpu_pool.spawn_fn(move || {
            let access = embargo_check(&*embargo, &query);
            debug!("Embargo access of {} to {:?}: {}", query.user, query.course_ids, access);
            Ok::<_, FailureError>(EmbargoAccess { access })
        }))
    }
}

fn rejected(transaction: &PaymentTransaction, message: &str) -> FailureError {
    format_err!("Payment {} rejected", transaction.txn_id)
        .context(Error::PaymentRejected(message.to_string()))
        .into()
}

/// Status to store for a gateway payment, or why it does not belong to the transaction.
pub fn check_gateway_payment(transaction: &PaymentTransaction, payment: &GatewayPayment) -> Result<PaymentStatus, String> {
    if let Some(ref order_id) = payment.order_id {
        if order_id != &transaction.gateway_order_id {
            return Err(format!("Payment {} belongs to another order.", payment.id));
        }
    }
    if payment.amount != transaction.amount {
        return Err(format!(
            "Payment amount {} differs from transaction amount {}.",
            payment.amount, transaction.amount
        ));
    }
    if payment.currency != transaction.currency {
        return Err(format!("Payment currency {} differs from {}.", payment.currency, transaction.currency));
    }
    payment.status.parse::<PaymentStatus>()
}

/// Refunds stay within the captured amount and its currency.
pub fn check_refund(transaction: &PaymentTransaction, payload: &RefundPaymentPayload) -> Result<(), String> {
    if transaction.status != PaymentStatus::Captured {
        return Err(format!("Payment in status {} can not be refunded.", transaction.status));
    }
    if payload.amount > transaction.amount {
        return Err(format!(
            "Refund amount {} exceeds payment amount {}.",
            payload.amount, transaction.amount
        ));
    }
    if payload.currency != transaction.currency {
        return Err(format!("Refund currency {} differs from {}.", payload.currency, transaction.currency));
    }
    Ok(())
}
