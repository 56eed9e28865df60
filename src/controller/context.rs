//! Contexts handed from the controller to services
use std::marker::PhantomData;
use std::sync::Arc;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use futures_cpupool::CpuPool;
use r2d2::{ManageConnection, Pool};

use config::Config;
use models::UserId;
use notifications::NotificationsQueue;
use payments::PaymentClients;
use repos::repo_factory::ReposFactory;

/// Static context for all app
pub struct StaticContext<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub db_pool: Pool<M>,
    pub cpu_pool: CpuPool,
    pub config: Arc<Config>,
    pub repo_factory: F,
    pub notifications: Arc<dyn NotificationsQueue>,
    pub payments: PaymentClients,
    connection: PhantomData<T>,
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > StaticContext<T, M, F>
{
    /// Create a new static context
    pub fn new(
        db_pool: Pool<M>,
        cpu_pool: CpuPool,
        config: Arc<Config>,
        repo_factory: F,
        notifications: Arc<dyn NotificationsQueue>,
        payments: PaymentClients,
    ) -> Self {
        Self {
            db_pool,
            cpu_pool,
            config,
            repo_factory,
            notifications,
            payments,
            connection: PhantomData,
        }
    }
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Clone for StaticContext<T, M, F>
{
    fn clone(&self) -> Self {
        Self {
            db_pool: self.db_pool.clone(),
            cpu_pool: self.cpu_pool.clone(),
            config: self.config.clone(),
            repo_factory: self.repo_factory.clone(),
            notifications: self.notifications.clone(),
            payments: self.payments.clone(),
            connection: PhantomData,
        }
    }
}

/// Dynamic context for each request
#[derive(Clone, Debug)]
pub struct DynamicContext {
    pub user_id: Option<UserId>,
}

impl DynamicContext {
    /// Create a new dynamic context for each request
    pub fn new(user_id: Option<UserId>) -> Self {
        Self { user_id }
    }
}
