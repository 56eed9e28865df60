//! Country embargo lookups. The check fails open: any error of the embargo
//! api grants access and is only logged.
use std::time::Duration;

use failure::{Error as FailureError, Fail};
use reqwest;
use serde_json;

use config;
use models::EmbargoQuery;

pub trait EmbargoClient: Send + Sync {
    /// Raw answer of the embargo api for a non-empty course list
    fn check(&self, query: &EmbargoQuery) -> Result<bool, FailureError>;
}

#[derive(Deserialize, Debug)]
struct EmbargoResponse {
    #[serde(default = "granted")]
    access: bool,
}

fn granted() -> bool {
    true
}

/// Reads the `access` flag, absent means granted.
pub fn parse_access(body: &str) -> Result<bool, FailureError> {
    serde_json::from_str::<EmbargoResponse>(body)
        .map(|response| response.access)
        .map_err(|e| e.context(format!("Unexpected embargo answer: {}", body)).into())
}

/// Query string of the embargo api, one `course_ids` pair per course.
pub fn query_params(query: &EmbargoQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("user", query.user.clone()), ("ip_address", query.ip_address.clone())];
    params.extend(query.course_ids.iter().map(|course_id| ("course_ids", course_id.clone())));
    params
}

pub fn embargo_check(client: &dyn EmbargoClient, query: &EmbargoQuery) -> bool {
    if query.course_ids.is_empty() {
        return true;
    }
    match client.check(query) {
        Ok(access) => access,
        Err(e) => {
            warn!("Embargo check for {} failed, access granted: {}", query.user, e);
            true
        }
    }
}

pub struct HttpEmbargoClient {
    url: String,
    http_client: reqwest::Client,
}

impl HttpEmbargoClient {
    pub fn new(config: &config::Embargo) -> Result<Self, FailureError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .build()?;
        Ok(Self {
            url: config.url.clone(),
            http_client,
        })
    }
}

impl EmbargoClient for HttpEmbargoClient {
    fn check(&self, query: &EmbargoQuery) -> Result<bool, FailureError> {
        debug!("Embargo check {:?}", query);
        let mut response = self.http_client.get(self.url.as_str()).query(&query_params(query)).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(format_err!("Embargo api answered with status {}", status));
        }
        let body = response.text()?;
        parse_access(&body)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Answers every check with `access`, or fails when it is `None`
    pub struct EmbargoClientMock {
        pub access: Option<bool>,
    }

    impl EmbargoClient for EmbargoClientMock {
        fn check(&self, _query: &EmbargoQuery) -> Result<bool, FailureError> {
            self.access.ok_or_else(|| format_err!("Embargo api is down"))
        }
    }

    fn query(course_ids: &[&str]) -> EmbargoQuery {
        EmbargoQuery {
            user: "learner".to_string(),
            ip_address: "10.0.0.1".to_string(),
            course_ids: course_ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_access() {
        assert_eq!(parse_access(r#"{"access": false}"#).unwrap(), false);
        assert_eq!(parse_access(r#"{"access": true}"#).unwrap(), true);
        assert_eq!(parse_access("{}").unwrap(), true);
        assert!(parse_access("<html>").is_err());
    }

    #[test]
    fn test_embargo_check_fails_open() {
        let denied = EmbargoClientMock { access: Some(false) };
        let broken = EmbargoClientMock { access: None };
        assert!(!embargo_check(&denied, &query(&["course-v1:edX+DemoX+1T2018"])));
        assert!(embargo_check(&broken, &query(&["course-v1:edX+DemoX+1T2018"])));
        assert!(embargo_check(&denied, &query(&[])));
    }

    #[test]
    fn test_query_params_repeat_course_ids() {
        let params = query_params(&query(&["a", "b"]));
        assert_eq!(
            params,
            vec![
                ("user", "learner".to_string()),
                ("ip_address", "10.0.0.1".to_string()),
                ("course_ids", "a".to_string()),
                ("course_ids", "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_unreachable_embargo_api_grants_access() {
        let client = HttpEmbargoClient::new(&config::Embargo {
            url: "http://127.0.0.1:1/api/embargo/v1/course_access/".to_string(),
            timeout_s: 1,
        }).unwrap();
        assert!(client.check(&query(&["a"])).is_err());
        assert!(embargo_check(&client, &query(&["a"])));
    }
}
