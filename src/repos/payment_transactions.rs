//! Payment transactions repo, the local record of every gateway payment
use chrono::Utc;
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Fail;

use models::*;
use repos::types::RepoResult;
use schema::payment_transactions::dsl as PaymentTransactions;

/// Lookup keys of a payment transaction
#[derive(Clone, Debug)]
pub enum PaymentTransactionSearch {
    TxnId(String),
    GatewayPaymentId(String),
}

pub struct PaymentTransactionsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
}

pub trait PaymentTransactionsRepo {
    fn create(&self, payload: NewPaymentTransaction) -> RepoResult<PaymentTransaction>;

    fn find(&self, search: PaymentTransactionSearch) -> RepoResult<Option<PaymentTransaction>>;

    /// Same lookup, locking the row until the end of the transaction
    fn find_for_update(&self, search: PaymentTransactionSearch) -> RepoResult<Option<PaymentTransaction>>;

    fn update(&self, id_arg: PaymentTransactionId, payload: UpdatePaymentTransaction) -> RepoResult<PaymentTransaction>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> PaymentTransactionsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T) -> Self {
        Self { db_conn }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> PaymentTransactionsRepo
    for PaymentTransactionsRepoImpl<'a, T>
{
    fn create(&self, payload: NewPaymentTransaction) -> RepoResult<PaymentTransaction> {
        debug!("Create new payment transaction {:?}.", payload);
        let query = diesel::insert_into(PaymentTransactions::payment_transactions).values(&payload);
        query
            .get_result::<PaymentTransaction>(self.db_conn)
            .map_err(|e| e.context(format!("Creates new payment transaction: {:?} error occurred", payload)).into())
    }

    fn find(&self, search: PaymentTransactionSearch) -> RepoResult<Option<PaymentTransaction>> {
        debug!("Find payment transaction by search: {:?}.", search);
        let mut query = PaymentTransactions::payment_transactions.into_boxed();
        query = match search.clone() {
            PaymentTransactionSearch::TxnId(txn_id) => query.filter(PaymentTransactions::txn_id.eq(txn_id)),
            PaymentTransactionSearch::GatewayPaymentId(payment_id) => query.filter(PaymentTransactions::gateway_payment_id.eq(payment_id)),
        };
        query
            .get_result(self.db_conn)
            .optional()
            .map_err(|e| e.context(format!("Find payment transaction by search: {:?} error occurred", search)).into())
    }

    fn find_for_update(&self, search: PaymentTransactionSearch) -> RepoResult<Option<PaymentTransaction>> {
        debug!("Lock payment transaction by search: {:?}.", search);
        let result = match search.clone() {
            PaymentTransactionSearch::TxnId(txn_id) => PaymentTransactions::payment_transactions
                .filter(PaymentTransactions::txn_id.eq(txn_id))
                .for_update()
                .get_result(self.db_conn)
                .optional(),
            PaymentTransactionSearch::GatewayPaymentId(payment_id) => PaymentTransactions::payment_transactions
                .filter(PaymentTransactions::gateway_payment_id.eq(payment_id))
                .for_update()
                .get_result(self.db_conn)
                .optional(),
        };
        result.map_err(|e| e.context(format!("Lock payment transaction by search: {:?} error occurred", search)).into())
    }

    fn update(&self, id_arg: PaymentTransactionId, payload: UpdatePaymentTransaction) -> RepoResult<PaymentTransaction> {
        debug!("Updating payment transaction with id {} and payload {:?}.", id_arg, payload);
        let filtered = PaymentTransactions::payment_transactions.filter(PaymentTransactions::id.eq(id_arg));
        let query = diesel::update(filtered).set((&payload, PaymentTransactions::updated_at.eq(Utc::now())));

        query.get_result::<PaymentTransaction>(self.db_conn).map_err(|e| {
            e.context(format!("Updates payment transaction: id: {}, payload: {:?}, error occurred", id_arg, payload))
                .into()
        })
    }
}
