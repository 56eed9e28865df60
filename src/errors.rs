use std::fmt;

use hyper::StatusCode;
use serde_json;
use validator::ValidationErrors;

use models::VoucherValidate;

/// Maps a domain error to its http answer
pub trait Codeable {
    fn code(&self) -> StatusCode;
    fn payload(&self) -> Option<serde_json::Value>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CouponAction {
    Assignment,
    Revoke,
    Remind,
}

impl fmt::Display for CouponAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            CouponAction::Assignment => "assignment",
            CouponAction::Revoke => "revoke",
            CouponAction::Remind => "remind",
        })
    }
}

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Not found")]
    NotFound,
    #[fail(display = "Parse error")]
    Parse,
    #[fail(display = "Validation error")]
    Validate(ValidationErrors),
    #[fail(display = "Not enough available codes for assignment!")]
    NotEnoughCodes,
    #[fail(display = "Coupon is not available for code {}", _0)]
    CouponUnavailable(CouponAction),
    #[fail(display = "Voucher can not be redeemed")]
    Rejected(VoucherValidate),
    #[fail(display = "Server is refusing to fullfil the request")]
    Forbidden,
    #[fail(display = "R2D2 connection error")]
    Connection,
    #[fail(display = "Notification queue error")]
    Notification,
    #[fail(display = "Payment rejected: {}", _0)]
    PaymentRejected(String),
    #[fail(display = "Payment gateway error")]
    Gateway,
}

impl Codeable for Error {
    fn code(&self) -> StatusCode {
        match *self {
            Error::NotFound => StatusCode::NotFound,
            Error::Validate(_) | Error::NotEnoughCodes | Error::CouponUnavailable(_) | Error::Rejected(_) => StatusCode::BadRequest,
            Error::Parse => StatusCode::UnprocessableEntity,
            Error::Connection | Error::Notification => StatusCode::InternalServerError,
            Error::Forbidden => StatusCode::Forbidden,
            Error::PaymentRejected(_) => StatusCode::BadRequest,
            Error::Gateway => StatusCode::BadGateway,
        }
    }

    fn payload(&self) -> Option<serde_json::Value> {
        match *self {
            Error::Validate(ref errors) => serde_json::to_value(errors).ok(),
            Error::NotEnoughCodes => Some(json!({ "non_field_errors": [self.to_string()] })),
            Error::CouponUnavailable(_) | Error::PaymentRejected(_) => Some(json!({ "error": self.to_string() })),
            Error::Rejected(ref reason) => Some(json!({ "reason": reason })),
            _ => None,
        }
    }
}
