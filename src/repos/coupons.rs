//! Coupons repo, presents CRUD operations with db for coupons
use chrono::Utc;
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Fail;
use uuid::Uuid;

use models::*;
use repos::types::RepoResult;
use schema::coupons::dsl as Coupons;

/// Coupons repository, responsible for handling coupons
pub struct CouponsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
}

pub trait CouponsRepo {
    /// Creates new coupon
    fn create(&self, payload: NewCoupon) -> RepoResult<Coupon>;

    /// Get coupon
    fn get(&self, id_arg: CouponId) -> RepoResult<Option<Coupon>>;

    /// Get coupon and lock its row until the end of the transaction
    fn get_for_update(&self, id_arg: CouponId) -> RepoResult<Option<Coupon>>;

    /// Get coupons by ids
    fn find_many(&self, ids: Vec<CouponId>) -> RepoResult<Vec<Coupon>>;

    /// Coupons of an enterprise customer
    fn list_for_enterprise(&self, enterprise_customer_uuid: Uuid) -> RepoResult<Vec<Coupon>>;

    /// Update coupon
    fn update(&self, id_arg: CouponId, payload: UpdateCoupon) -> RepoResult<Coupon>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CouponsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T) -> Self {
        Self { db_conn }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CouponsRepo for CouponsRepoImpl<'a, T> {
    fn create(&self, payload: NewCoupon) -> RepoResult<Coupon> {
        debug!("Create new coupon {:?}.", payload);
        let query = diesel::insert_into(Coupons::coupons).values(&payload);
        query
            .get_result::<Coupon>(self.db_conn)
            .map_err(|e| e.context(format!("Creates new coupon: {:?} error occurred", payload)).into())
    }

    fn get(&self, id_arg: CouponId) -> RepoResult<Option<Coupon>> {
        debug!("Find in coupon with id {}.", id_arg);
        let query = Coupons::coupons.filter(Coupons::id.eq(id_arg));
        query
            .get_result(self.db_conn)
            .optional()
            .map_err(|e| e.context(format!("Find coupon by id: {} error occurred", id_arg)).into())
    }

    fn get_for_update(&self, id_arg: CouponId) -> RepoResult<Option<Coupon>> {
        debug!("Lock coupon with id {}.", id_arg);
        let query = Coupons::coupons.filter(Coupons::id.eq(id_arg)).for_update();
        query
            .get_result(self.db_conn)
            .optional()
            .map_err(|e| e.context(format!("Lock coupon by id: {} error occurred", id_arg)).into())
    }

    fn find_many(&self, ids: Vec<CouponId>) -> RepoResult<Vec<Coupon>> {
        debug!("Find coupons with ids {:?}.", ids);
        let query = Coupons::coupons.filter(Coupons::id.eq_any(ids.clone())).order(Coupons::id);
        query
            .get_results(self.db_conn)
            .map_err(|e| e.context(format!("Find coupons by ids: {:?} error occurred", ids)).into())
    }

    fn list_for_enterprise(&self, enterprise_customer_uuid: Uuid) -> RepoResult<Vec<Coupon>> {
        debug!("Find coupons of enterprise customer {}.", enterprise_customer_uuid);
        let query = Coupons::coupons
            .filter(Coupons::enterprise_customer_uuid.eq(enterprise_customer_uuid))
            .order(Coupons::id);
        query.get_results(self.db_conn).map_err(|e| {
            e.context(format!("List coupons of enterprise customer {} error occurred", enterprise_customer_uuid))
                .into()
        })
    }

    fn update(&self, id_arg: CouponId, payload: UpdateCoupon) -> RepoResult<Coupon> {
        debug!("Updating coupon with id {} and payload {:?}.", id_arg, payload);
        let filtered = Coupons::coupons.filter(Coupons::id.eq(id_arg));
        let query = diesel::update(filtered).set((&payload, Coupons::updated_at.eq(Utc::now())));

        query.get_result::<Coupon>(self.db_conn).map_err(|e| {
            e.context(format!("Updates specific coupon: id: {}, payload: {:?}, error occurred", id_arg, payload))
                .into()
        })
    }
}
