//! Voucher applications repo, immutable redemption records
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Fail;

use models::*;
use repos::types::RepoResult;
use schema::voucher_applications::dsl as VoucherApplications;

pub struct VoucherApplicationsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
}

pub trait VoucherApplicationsRepo {
    /// Records a redemption
    fn create(&self, payload: NewVoucherApplication) -> RepoResult<VoucherApplication>;

    /// Redemptions of the given vouchers, ordered by id
    fn find_by_vouchers(&self, voucher_ids: Vec<VoucherId>) -> RepoResult<Vec<VoucherApplication>>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> VoucherApplicationsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T) -> Self {
        Self { db_conn }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> VoucherApplicationsRepo
    for VoucherApplicationsRepoImpl<'a, T>
{
    fn create(&self, payload: NewVoucherApplication) -> RepoResult<VoucherApplication> {
        debug!("Create new voucher application {:?}.", payload);
        let query = diesel::insert_into(VoucherApplications::voucher_applications).values(&payload);
        query
            .get_result::<VoucherApplication>(self.db_conn)
            .map_err(|e| e.context(format!("Creates new voucher application: {:?} error occurred", payload)).into())
    }

    fn find_by_vouchers(&self, voucher_ids: Vec<VoucherId>) -> RepoResult<Vec<VoucherApplication>> {
        debug!("Find voucher applications for vouchers {:?}.", voucher_ids);
        let query = VoucherApplications::voucher_applications
            .filter(VoucherApplications::voucher_id.eq_any(voucher_ids.clone()))
            .order(VoucherApplications::id);
        query
            .get_results(self.db_conn)
            .map_err(|e| e.context(format!("Find voucher applications for vouchers {:?} failed.", voucher_ids)).into())
    }
}
