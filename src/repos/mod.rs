//! Repos is a module responsible for interacting with postgres db
pub mod coupons;
pub mod email_templates;
pub mod offer_assignments;
pub mod payment_transactions;
pub mod repo_factory;
pub mod types;
pub mod voucher_applications;
pub mod vouchers;

pub use self::coupons::*;
pub use self::email_templates::*;
pub use self::offer_assignments::*;
pub use self::payment_transactions::*;
pub use self::repo_factory::*;
pub use self::types::*;
pub use self::voucher_applications::*;
pub use self::vouchers::*;
