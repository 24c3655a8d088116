use serde::Deserialize;

use super::traits::ApiFailure;

const SUCCESS: &str = "success";

/// Top-level envelope of every Reg.ru API v2 response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiResponse {
    pub result: String,
    pub error_code: Option<String>,
    pub error_text: Option<String>,
    pub answer: Option<Answer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub domains: Vec<DomainAnswer>,
}

/// Per-zone part of an answer. Zone calls report success or failure per requested domain
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DomainAnswer {
    pub dname: Option<String>,
    pub result: Option<String>,
    pub error_code: Option<String>,
    pub error_text: Option<String>,
    #[serde(default)]
    pub rrs: Vec<ResourceRecord>,
}

/// A single resource record as listed by `zone/get_resource_records`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceRecord {
    pub subname: String,
    pub rectype: String,
    pub content: String,
}

impl ApiResponse {
    /// Unwrap the answer for the first (and only) requested zone.
    /// The call only counts as successful if both the envelope and the zone entry report success.
    pub fn into_domain(self) -> Result<DomainAnswer, ApiFailure> {
        if self.result != SUCCESS {
            return Err(ApiFailure::Api {
                code: self.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
                text: self.error_text.unwrap_or(self.result),
            });
        }

        let domain = self
            .answer
            .and_then(|a| a.domains.into_iter().next())
            .ok_or_else(|| ApiFailure::Malformed("answer contains no domains".to_string()))?;

        if domain.result.as_deref() == Some(SUCCESS) {
            return Ok(domain);
        }
        Err(ApiFailure::Api {
            code: domain.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
            text: domain.error_text.unwrap_or_else(|| {
                format!(
                    "domain result: {}",
                    domain.result.as_deref().unwrap_or("missing")
                )
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use totems::assert_ok;

    use super::*;

    fn parse(body: &str) -> ApiResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn should_accept_successful_response() {
        let resp = parse(
            r#"{"result":"success","answer":{"domains":[{"dname":"example.com","result":"success"}]}}"#,
        );
        let domain = resp.into_domain();
        assert_ok!(domain);
    }

    #[test]
    fn should_read_resource_records() {
        let resp = parse(
            r#"{
                "result": "success",
                "answer": {
                    "domains": [{
                        "dname": "example.com",
                        "result": "success",
                        "rrs": [
                            {"subname": "@", "rectype": "A", "content": "192.0.2.1", "prio": 0, "state": "A"},
                            {"subname": "_acme-challenge", "rectype": "TXT", "content": "abc", "prio": 0, "state": "A"}
                        ]
                    }]
                }
            }"#,
        );
        let domain = resp.into_domain().unwrap();
        assert_eq!(domain.rrs.len(), 2);
        assert_eq!(domain.rrs[1].subname, "_acme-challenge");
        assert_eq!(domain.rrs[1].rectype, "TXT");
    }

    #[test]
    fn should_report_envelope_error() {
        let resp = parse(
            r#"{"result":"error","error_code":"PASSWORD_AUTH_FAILED","error_text":"Username/password Incorrect"}"#,
        );
        match resp.into_domain() {
            Err(ApiFailure::Api { code, text }) => {
                assert_eq!(code, "PASSWORD_AUTH_FAILED");
                assert_eq!(text, "Username/password Incorrect");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn should_report_domain_error() {
        let resp = parse(
            r#"{"result":"success","answer":{"domains":[{"dname":"example.com","result":"error","error_code":"NO_DOMAIN"}]}}"#,
        );
        assert!(matches!(
            resp.into_domain(),
            Err(ApiFailure::Api { code, .. }) if code == "NO_DOMAIN"
        ));
    }

    #[test]
    fn should_reject_missing_domains() {
        let resp = parse(r#"{"result":"success","answer":{}}"#);
        assert!(matches!(resp.into_domain(), Err(ApiFailure::Malformed(_))));

        let resp = parse(r#"{"result":"success"}"#);
        assert!(matches!(resp.into_domain(), Err(ApiFailure::Malformed(_))));
    }

    #[test]
    fn should_reject_domain_without_result() {
        let resp = parse(r#"{"result":"success","answer":{"domains":[{"dname":"example.com"}]}}"#);
        assert!(matches!(resp.into_domain(), Err(ApiFailure::Api { .. })));
    }
}
