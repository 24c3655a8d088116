#![cfg_attr(test, allow(dead_code))]

use std::time::Duration;

use log::{debug, trace};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{json, Value};

use super::{
    response::{ApiResponse, ResourceRecord},
    traits::ApiFailure,
};
use crate::{config::Credentials, provider::ProviderError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Form fields sent with every API call
#[derive(Serialize)]
struct RequestForm<'a> {
    username: &'a str,
    password: &'a str,
    io_encoding: &'static str,
    show_input_params: u8,
    output_format: &'static str,
    input_format: &'static str,
    input_data: String,
}

/// Internal wrapper around the Reg.ru API v2. Handles authentication, request encoding and response unwrapping
pub struct RegRuWrapper {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl RegRuWrapper {
    // Call a zone function for a single zone. `params` must be a JSON object, the zone is added to it.
    fn zone_call(
        &self,
        function: &str,
        zone: &str,
        mut params: Value,
    ) -> Result<Vec<ResourceRecord>, ApiFailure> {
        params["domains"] = json!([{ "dname": zone }]);
        let url = format!("{}zone/{}", self.base_url, function);
        debug!("POST {} with input {}", url, params);

        let form = RequestForm {
            username: &self.credentials.username,
            password: &self.credentials.password,
            io_encoding: "utf8",
            show_input_params: 1,
            output_format: "json",
            input_format: "json",
            input_data: params.to_string(),
        };
        let response = self.client.post(&url).form(&form).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiFailure::Status(status));
        }
        let body = response.text()?;
        trace!("Response body: {}", body);

        let parsed: ApiResponse =
            serde_json::from_str(&body).map_err(|e| ApiFailure::Malformed(e.to_string()))?;
        Ok(parsed.into_domain()?.rrs)
    }

    pub fn list_records(&self, zone: &str) -> Result<Vec<ResourceRecord>, ApiFailure> {
        self.zone_call("get_resource_records", zone, json!({}))
    }

    pub fn add_txt(&self, zone: &str, subdomain: &str, text: &str) -> Result<(), ApiFailure> {
        self.zone_call(
            "add_txt",
            zone,
            json!({ "subdomain": subdomain, "text": text }),
        )
        .map(|_| ())
    }

    pub fn remove_txt(&self, zone: &str, subdomain: &str, content: &str) -> Result<(), ApiFailure> {
        self.zone_call(
            "remove_record",
            zone,
            json!({ "subdomain": subdomain, "record_type": "TXT", "content": content }),
        )
        .map(|_| ())
    }

    pub fn try_new(credentials: &Credentials, api_url: &str) -> Result<RegRuWrapper, ProviderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Permanent(e.to_string()))?;

        let mut base_url = api_url.to_owned();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(RegRuWrapper {
            client,
            base_url,
            credentials: credentials.to_owned(),
        })
    }
}

#[cfg(test)]
use mockall::mock;

#[cfg(test)]
mock! {
    pub RegRuWrapper {
        pub fn list_records(&self, zone: &str) -> Result<Vec<ResourceRecord>, ApiFailure>;
        pub fn add_txt(&self, zone: &str, subdomain: &str, text: &str) -> Result<(), ApiFailure>;
        pub fn remove_txt(
            &self,
            zone: &str,
            subdomain: &str,
            content: &str,
        ) -> Result<(), ApiFailure>;
        pub fn try_new(credentials: &Credentials, api_url: &str) -> Result<Self, ProviderError>;
    }
}
