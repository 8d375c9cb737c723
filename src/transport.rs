//! HTTP plumbing. [`Transport`] moves bytes; [`ProviderApi`] adds request
//! signing, response-signature verification and status normalisation on top.
//! Nothing here retries.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::logging::{self, RequestId};
use crate::model::envelope;
use crate::model::protocol::{HttpMethod, Protocol};
use crate::model::provider::ProviderKey;
use crate::signature;
use crate::wallet::Wallet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single blocking HTTP exchange. Errors are always [`Error::Transport`].
pub trait Transport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder
            .send()
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| Error::Transport(e.to_string()))?
            .to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// The provider's API as seen through one protocol description.
pub struct ProviderApi<'a, T: Transport + ?Sized, W: Wallet + ?Sized> {
    base_url: &'a str,
    protocol: &'a Protocol,
    transport: &'a T,
    wallet: &'a W,
}

impl<'a, T: Transport + ?Sized, W: Wallet + ?Sized> ProviderApi<'a, T, W> {
    pub fn new(base_url: &'a str, protocol: &'a Protocol, transport: &'a T, wallet: &'a W) -> Self {
        Self {
            base_url,
            protocol,
            transport,
            wallet,
        }
    }

    pub fn protocol(&self) -> &Protocol {
        self.protocol
    }

    /// Unsigned GET. Non-success statuses become [`Error::Provider`]; the
    /// caller verifies the signature, since it may not have a key yet.
    pub fn get(&self, path: &str) -> Result<HttpResponse> {
        let response = self.exchange(HttpMethod::Get, path, Vec::new(), None)?;
        check_status(&response)?;
        Ok(response)
    }

    /// Signed exchange. The payload is encoded canonically, signed by
    /// `commitment_address` when the protocol asks for it, and the response
    /// body is returned only once its signature checks out against
    /// `provider_key`.
    pub fn call<P: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        commitment_address: &str,
        provider_key: &ProviderKey,
        payload: &P,
    ) -> Result<Vec<u8>> {
        let body = envelope::encode(payload, self.protocol.field_naming)?;

        let mut headers = Vec::new();
        if self.protocol.client_signs_request {
            let signature = signature::sign(self.wallet, commitment_address, &body)?;
            headers.push((self.protocol.client_signature_header.clone(), signature));
        }

        let response = self.exchange(method, path, headers, Some(body))?;
        check_status(&response)?;
        self.verify(&response, provider_key)?;
        Ok(response.body)
    }

    /// Check the response's detached signature with `key`.
    pub fn verify(&self, response: &HttpResponse, key: &ProviderKey) -> Result<()> {
        signature::check_server_signature(
            key,
            &response.body,
            response.header(&self.protocol.server_signature_header),
            self.protocol.signature_encoding,
        )
    }

    fn exchange(
        &self,
        method: HttpMethod,
        path: &str,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        let id = RequestId::next();
        logging::log_request(id, method, path);
        let request = HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body,
        };
        let response = self.transport.send(request).map_err(|e| {
            warn!("<-rsp{id} {path} failed: {e}");
            e
        })?;
        logging::log_response(id, response.status, path, &response.body);
        Ok(response)
    }
}

fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(Error::Provider {
            status: response.status,
            body: logging::redact_body(&response.body).trim().to_string(),
        })
    }
}
