use std::collections::HashMap;

use failure::{Error as FailureError, Fail};
use futures::{Future, Stream};
use hyper;
use hyper::header::{Authorization, Headers};
use serde::de::DeserializeOwned;
use serde_json;
use url::form_urlencoded;

use errors::Error;
use models::UserId;

/// Reads the whole body and deserializes it from json
pub fn parse_body<T>(body: hyper::Body) -> Box<Future<Item = T, Error = FailureError>>
where
    T: DeserializeOwned + 'static,
{
    Box::new(
        body.concat2()
            .map_err(|e| e.context(Error::Parse).into())
            .and_then(|chunk| serde_json::from_slice::<T>(&chunk).map_err(|e| e.context(Error::Parse).into())),
    )
}

/// Decoded query pairs in request order
pub fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Decoded query params, the last value of a repeated key wins
pub fn query_map(pairs: &[(String, String)]) -> HashMap<String, String> {
    pairs.iter().cloned().collect()
}

/// User id carried in the `Authorization` header
pub fn parse_user_id(headers: &Headers) -> Option<UserId> {
    headers
        .get::<Authorization<String>>()
        .and_then(|auth| auth.0.trim().parse::<UserId>().ok())
}
