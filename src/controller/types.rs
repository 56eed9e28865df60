use failure::Error as FailureError;
use futures::future::Future;

/// Rendered body of a successful request
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerResponse {
    Json(String),
    Csv(String),
}

pub type ControllerFuture = Box<Future<Item = ControllerResponse, Error = FailureError>>;
