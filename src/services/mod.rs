//! Services is a core layer for the app business logic like
//! validation, capacity accounting, notifications.

pub mod assignments;
pub mod coupons;
pub mod email_templates;
pub mod payments;
pub mod redemptions;
pub mod types;
pub mod usage;

pub use self::assignments::*;
pub use self::coupons::*;
pub use self::email_templates::*;
pub use self::payments::*;
pub use self::redemptions::*;
pub use self::types::*;
pub use self::usage::*;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use futures::future;
use r2d2::{ManageConnection, PooledConnection};

use controller::context::{DynamicContext, StaticContext};
use errors::Error;
use models::UserId;
use repos::repo_factory::ReposFactory;

/// Service
pub struct Service<
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
> {
    pub static_context: StaticContext<T, M, F>,
    pub dynamic_context: DynamicContext,
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Service<T, M, F>
{
    /// Create a new service
    pub fn new(static_context: StaticContext<T, M, F>, dynamic_context: DynamicContext) -> Self {
        Self {
            static_context,
            dynamic_context,
        }
    }

    /// Runs blocking db work on the cpu pool with a pooled connection
    pub fn spawn_on_pool<R, Func>(&self, f: Func) -> ServiceFuture<R>
    where
        Func: FnOnce(PooledConnection<M>) -> Result<R, FailureError> + Send + 'static,
        R: Send + 'static,
    {
        let db_pool = self.static_context.db_pool.clone();
        let cpu_pool = self.static_context.cpu_pool.clone();
        Box::new(cpu_pool.spawn_fn(move || {
            db_pool
                .get()
                .map_err(|e| e.context(Error::Connection).into())
                .and_then(f)
        }))
    }

    /// Current user or a `Forbidden` failure naming the denied action
    pub fn authorized_user(&self, action: &str) -> Result<UserId, FailureError> {
        self.dynamic_context.user_id.ok_or_else(|| {
            format_err!("Denied request to {} for unauthorized user", action)
                .context(Error::Forbidden)
                .into()
        })
    }
}

/// Failed service future shortcut
pub fn service_error<R: 'static>(error: FailureError) -> ServiceFuture<R> {
    Box::new(future::err(error))
}
