//! Hyper service wrapping a `Controller` and rendering its failures
use failure::Error as FailureError;
use futures::future;
use futures::Future;
use hyper;
use hyper::header::{ContentLength, ContentType};
use hyper::mime;
use hyper::server::{Request, Response, Service};
use hyper::StatusCode;
use sentry::integrations::failure::capture_error;
use serde_json;

use controller::types::{ControllerFuture, ControllerResponse};
use errors::{Codeable, Error};

pub trait Controller {
    fn call(&self, request: Request) -> ControllerFuture;
}

#[derive(Serialize, Debug)]
pub struct ErrorMessage {
    pub code: u16,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

pub struct Application<C: Controller> {
    pub controller: C,
}

impl<C: Controller> Application<C> {
    pub fn new(controller: C) -> Self {
        Self { controller }
    }
}

impl<C: Controller> Service for Application<C> {
    type Request = Request;
    type Response = Response;
    type Error = hyper::Error;
    type Future = Box<Future<Item = Response, Error = hyper::Error>>;

    fn call(&self, req: Request) -> Self::Future {
        debug!("Received request: {} {}", req.method(), req.uri());

        Box::new(self.controller.call(req).then(|res| {
            let response = match res {
                Ok(ControllerResponse::Json(body)) => response_with_body(StatusCode::Ok, ContentType::json(), body),
                Ok(ControllerResponse::Csv(body)) => {
                    let mut response = response_with_body(StatusCode::Ok, ContentType(mime::TEXT_CSV), body);
                    response
                        .headers_mut()
                        .set_raw("Content-Disposition", "attachment; filename=\"codes.csv\"");
                    response
                }
                Err(err) => response_with_error(&err),
            };
            future::ok(response)
        }))
    }
}

fn response_with_body(status: StatusCode, content_type: ContentType, body: String) -> Response {
    Response::new()
        .with_status(status)
        .with_header(ContentLength(body.len() as u64))
        .with_header(content_type)
        .with_body(body)
}

/// Answers with the first domain error of the cause chain, or 500 when there is none.
pub fn response_with_error(err: &FailureError) -> Response {
    let (status, message) = match err.iter_chain().filter_map(|cause| cause.downcast_ref::<Error>()).next() {
        Some(domain_error) => {
            debug!("Request failed: {:?}", err);
            let status = domain_error.code();
            let message = ErrorMessage {
                code: status.as_u16(),
                description: domain_error.to_string(),
                payload: domain_error.payload(),
            };
            (status, message)
        }
        None => {
            error!("Unexpected failure: {:?}", err);
            capture_error(err);
            let status = StatusCode::InternalServerError;
            let message = ErrorMessage {
                code: status.as_u16(),
                description: "Internal server error".to_string(),
                payload: None,
            };
            (status, message)
        }
    };

    let body = serde_json::to_string(&message).unwrap_or_default();
    response_with_body(status, ContentType::json(), body)
}
#[cfg(test)]
mod tests {
    use super::*;

    use futures::Stream;
    use validator::ValidationErrors;

    fn body_of(response: Response) -> serde_json::Value {
        let chunk = response.body().concat2().wait().unwrap();
        serde_json::from_slice(&chunk).unwrap()
    }

    #[test]
    fn test_domain_error_response() {
        let err: FailureError = format_err!("nothing left").context(Error::NotEnoughCodes).into();
        let response = response_with_error(&err);
        assert_eq!(response.status(), StatusCode::BadRequest);
        let body = body_of(response);
        assert_eq!(body["code"], 400);
        assert_eq!(body["payload"]["non_field_errors"][0], "Not enough available codes for assignment!");
    }

    #[test]
    fn test_validation_error_response() {
        let err: FailureError = Error::Validate(ValidationErrors::new()).into();
        assert_eq!(response_with_error(&err).status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_unknown_error_is_internal() {
        let err = format_err!("database exploded");
        let response = response_with_error(&err);
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(body_of(response)["description"], "Internal server error");
    }
}
