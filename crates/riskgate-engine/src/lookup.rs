//! External reputation lookup clients
//!
//! Two HTTP collaborators feed the rule evaluators: an IP intelligence
//! service (ipinfo-style) and a card BIN directory (binlist-style). Each
//! client carries its own request timeout; the evaluators translate any
//! error here into a conservative default score, so a slow or broken
//! lookup can never block the decision pipeline.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const BIN_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// IP intelligence lookup result
#[derive(Debug, Clone, Default)]
pub struct IpIntel {
    /// Owning organization / AS description
    pub org: Option<String>,

    /// Country the address is announced from
    pub country: Option<String>,
}

/// IP intelligence service collaborator
#[async_trait]
pub trait IpIntelligence: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<IpIntel>;
}

/// BIN directory lookup result
#[derive(Debug, Clone, Default)]
pub struct BinInfo {
    /// Issuing country, ISO 3166-1 alpha-2
    pub country: Option<String>,

    /// Card scheme (visa, mastercard, ...)
    pub scheme: Option<String>,
}

/// Card BIN directory collaborator
#[async_trait]
pub trait BinDirectory: Send + Sync {
    async fn lookup(&self, bin: &str) -> Result<BinInfo>;
}

#[derive(Deserialize)]
struct IpInfoResponse {
    #[serde(default)]
    org: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// ipinfo.io client with a hard 5s timeout
pub struct IpInfoClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl IpInfoClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, "https://ipinfo.io")
    }

    /// Point the client at a different base URL (tests)
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(IP_LOOKUP_TIMEOUT)
                .build()
                .unwrap(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl IpIntelligence for IpInfoClient {
    async fn lookup(&self, ip: &str) -> Result<IpIntel> {
        let url = format!("{}/{}/json?token={}", self.base_url, ip, self.token);

        tracing::debug!(ip = %ip, "dispatching IP intelligence lookup");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Lookup(format!("ip intelligence request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Lookup(format!(
                "ip intelligence returned status {}",
                response.status()
            )));
        }

        let body: IpInfoResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Lookup(format!("ip intelligence bad response: {}", e)))?;

        Ok(IpIntel {
            org: body.org,
            country: body.country,
        })
    }
}

#[derive(Deserialize)]
struct BinListCountry {
    #[serde(default)]
    alpha2: Option<String>,
}

#[derive(Deserialize)]
struct BinListResponse {
    #[serde(default)]
    country: Option<BinListCountry>,
    #[serde(default)]
    scheme: Option<String>,
}

/// binlist.net client with a hard 3s timeout
pub struct BinListClient {
    client: reqwest::Client,
    base_url: String,
}

impl BinListClient {
    pub fn new() -> Self {
        Self::with_base_url("https://lookup.binlist.net")
    }

    /// Point the client at a different base URL (tests, self-hosted mirror)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(BIN_LOOKUP_TIMEOUT)
                .build()
                .unwrap(),
            base_url: base_url.into(),
        }
    }
}

impl Default for BinListClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BinDirectory for BinListClient {
    async fn lookup(&self, bin: &str) -> Result<BinInfo> {
        let url = format!("{}/{}", self.base_url, bin);

        tracing::debug!(bin = %bin, "dispatching BIN directory lookup");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Lookup(format!("bin lookup request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Lookup(format!(
                "bin lookup returned status {}",
                response.status()
            )));
        }

        let body: BinListResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Lookup(format!("bin lookup bad response: {}", e)))?;

        Ok(BinInfo {
            country: body.country.and_then(|c| c.alpha2),
            scheme: body.scheme,
        })
    }
}

/// Mock IP intelligence for testing
pub struct MockIpIntelligence {
    response: Option<IpIntel>,
}

impl MockIpIntelligence {
    /// Always resolve to the given organization
    pub fn with_org(org: impl Into<String>) -> Self {
        Self {
            response: Some(IpIntel {
                org: Some(org.into()),
                country: None,
            }),
        }
    }

    /// Always fail the lookup
    pub fn failing() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl IpIntelligence for MockIpIntelligence {
    async fn lookup(&self, _ip: &str) -> Result<IpIntel> {
        match &self.response {
            Some(intel) => Ok(intel.clone()),
            None => Err(EngineError::Lookup("mock failure".to_string())),
        }
    }
}

/// Mock BIN directory for testing
pub struct MockBinDirectory {
    response: Option<BinInfo>,
}

impl MockBinDirectory {
    /// Always resolve to the given issuing country
    pub fn with_country(country: impl Into<String>) -> Self {
        Self {
            response: Some(BinInfo {
                country: Some(country.into()),
                scheme: None,
            }),
        }
    }

    /// Always fail the lookup
    pub fn failing() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl BinDirectory for MockBinDirectory {
    async fn lookup(&self, _bin: &str) -> Result<BinInfo> {
        match &self.response {
            Some(info) => Ok(info.clone()),
            None => Err(EngineError::Lookup("mock failure".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ipinfo_client_parses_org() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/8.8.8.8/json?token=tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"org": "AS15169 Google LLC", "country": "US"}"#)
            .create_async()
            .await;

        let client = IpInfoClient::with_base_url("tok", server.url());
        let intel = client.lookup("8.8.8.8").await.unwrap();

        assert_eq!(intel.org.as_deref(), Some("AS15169 Google LLC"));
        assert_eq!(intel.country.as_deref(), Some("US"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ipinfo_client_maps_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/1.2.3.4/json?token=tok")
            .with_status(503)
            .create_async()
            .await;

        let client = IpInfoClient::with_base_url("tok", server.url());
        let err = client.lookup("1.2.3.4").await.unwrap_err();
        assert!(matches!(err, EngineError::Lookup(_)));
    }

    #[tokio::test]
    async fn test_binlist_client_parses_country() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/411111")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"scheme": "visa", "country": {"alpha2": "GB"}}"#)
            .create_async()
            .await;

        let client = BinListClient::with_base_url(server.url());
        let info = client.lookup("411111").await.unwrap();

        assert_eq!(info.country.as_deref(), Some("GB"));
        assert_eq!(info.scheme.as_deref(), Some("visa"));
    }

    #[tokio::test]
    async fn test_binlist_client_handles_missing_country() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/999999")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"scheme": "visa"}"#)
            .create_async()
            .await;

        let client = BinListClient::with_base_url(server.url());
        let info = client.lookup("999999").await.unwrap();
        assert!(info.country.is_none());
    }
}
