//! Models contains all structures that are used in different
//! modules of the app

pub mod newtypes;
pub mod coupon;
pub mod email_template;
pub mod notification;
pub mod offer_assignment;
pub mod pagination;
pub mod payment;
pub mod usage;
pub mod validation_rules;
pub mod voucher;
pub mod voucher_application;

pub use self::coupon::*;
pub use self::email_template::*;
pub use self::newtypes::*;
pub use self::notification::*;
pub use self::offer_assignment::*;
pub use self::pagination::*;
pub use self::payment::*;
pub use self::usage::*;
pub use self::validation_rules::*;
pub use self::voucher::*;
pub use self::voucher_application::*;
