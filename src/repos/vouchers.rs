//! Vouchers repo, presents operations with db for voucher codes
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Fail;

use models::*;
use repos::types::{insert_batch_size, RepoResult};
use schema::vouchers::dsl as Vouchers;

const NEW_VOUCHER_COLUMNS: usize = 2;

/// Search vouchers
#[derive(Clone, Debug)]
pub enum VoucherSearch {
    Coupon(CouponId),
    Coupons(Vec<CouponId>),
    Code(String),
    Ids(Vec<VoucherId>),
}

pub struct VouchersRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
}

pub trait VouchersRepo {
    /// Creates vouchers in bulk
    fn create_many(&self, payload: Vec<NewVoucher>) -> RepoResult<Vec<Voucher>>;

    /// Search vouchers, ordered by id
    fn find_by(&self, search: VoucherSearch) -> RepoResult<Vec<Voucher>>;

    /// Bumps the redemption counter
    fn increment_num_orders(&self, id_arg: VoucherId) -> RepoResult<Voucher>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> VouchersRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T) -> Self {
        Self { db_conn }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> VouchersRepo for VouchersRepoImpl<'a, T> {
    fn create_many(&self, payload: Vec<NewVoucher>) -> RepoResult<Vec<Voucher>> {
        debug!("Create {} new vouchers.", payload.len());
        let mut created = Vec::with_capacity(payload.len());
        for batch in payload.chunks(insert_batch_size(NEW_VOUCHER_COLUMNS)) {
            let values = diesel::insert_into(Vouchers::vouchers)
                .values(batch)
                .get_results::<Voucher>(self.db_conn)
                .map_err(|e| e.context(format!("Creates {} new vouchers error occurred", batch.len())))?;
            created.extend(values);
        }
        Ok(created)
    }

    fn find_by(&self, search: VoucherSearch) -> RepoResult<Vec<Voucher>> {
        debug!("Get vouchers by search: {:?}.", search);
        let mut query = Vouchers::vouchers.order(Vouchers::id).into_boxed();
        query = match search.clone() {
            VoucherSearch::Coupon(coupon_id) => query.filter(Vouchers::coupon_id.eq(coupon_id)),
            VoucherSearch::Coupons(coupon_ids) => query.filter(Vouchers::coupon_id.eq_any(coupon_ids)),
            VoucherSearch::Code(code) => query.filter(Vouchers::code.eq(code)),
            VoucherSearch::Ids(ids) => query.filter(Vouchers::id.eq_any(ids)),
        };

        query
            .get_results(self.db_conn)
            .map_err(|e| e.context(format!("Search vouchers by {:?} failed.", search)).into())
    }

    fn increment_num_orders(&self, id_arg: VoucherId) -> RepoResult<Voucher> {
        debug!("Increment num orders of voucher {}.", id_arg);
        let filtered = Vouchers::vouchers.filter(Vouchers::id.eq(id_arg));
        let query = diesel::update(filtered).set(Vouchers::num_orders.eq(Vouchers::num_orders + 1));
        query
            .get_result::<Voucher>(self.db_conn)
            .map_err(|e| e.context(format!("Increment num orders of voucher {} error occurred", id_arg)).into())
    }
}
