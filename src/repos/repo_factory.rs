use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;

use repos::*;

pub trait ReposFactory<C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>: Clone + Send + 'static {
    fn create_coupons_repo<'a>(&self, db_conn: &'a C) -> Box<dyn CouponsRepo + 'a>;
    fn create_vouchers_repo<'a>(&self, db_conn: &'a C) -> Box<dyn VouchersRepo + 'a>;
    fn create_offer_assignments_repo<'a>(&self, db_conn: &'a C) -> Box<dyn OfferAssignmentsRepo + 'a>;
    fn create_voucher_applications_repo<'a>(&self, db_conn: &'a C) -> Box<dyn VoucherApplicationsRepo + 'a>;
    fn create_email_templates_repo<'a>(&self, db_conn: &'a C) -> Box<dyn EmailTemplatesRepo + 'a>;
    fn create_payment_transactions_repo<'a>(&self, db_conn: &'a C) -> Box<dyn PaymentTransactionsRepo + 'a>;
}

#[derive(Clone, Default)]
pub struct ReposFactoryImpl;

impl ReposFactoryImpl {
    pub fn new() -> Self {
        ReposFactoryImpl
    }
}

impl<C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> ReposFactory<C> for ReposFactoryImpl {
    fn create_coupons_repo<'a>(&self, db_conn: &'a C) -> Box<dyn CouponsRepo + 'a> {
        Box::new(CouponsRepoImpl::new(db_conn)) as Box<dyn CouponsRepo>
    }
    fn create_vouchers_repo<'a>(&self, db_conn: &'a C) -> Box<dyn VouchersRepo + 'a> {
        Box::new(VouchersRepoImpl::new(db_conn)) as Box<dyn VouchersRepo>
    }
    fn create_offer_assignments_repo<'a>(&self, db_conn: &'a C) -> Box<dyn OfferAssignmentsRepo + 'a> {
        Box::new(OfferAssignmentsRepoImpl::new(db_conn)) as Box<dyn OfferAssignmentsRepo>
    }
    fn create_voucher_applications_repo<'a>(&self, db_conn: &'a C) -> Box<dyn VoucherApplicationsRepo + 'a> {
        Box::new(VoucherApplicationsRepoImpl::new(db_conn)) as Box<dyn VoucherApplicationsRepo>
    }
    fn create_email_templates_repo<'a>(&self, db_conn: &'a C) -> Box<dyn EmailTemplatesRepo + 'a> {
        Box::new(EmailTemplatesRepoImpl::new(db_conn)) as Box<dyn EmailTemplatesRepo>
    }
    fn create_payment_transactions_repo<'a>(&self, db_conn: &'a C) -> Box<dyn PaymentTransactionsRepo + 'a> {
        Box::new(PaymentTransactionsRepoImpl::new(db_conn)) as Box<dyn PaymentTransactionsRepo>
    }
}
