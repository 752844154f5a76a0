use std::{sync::OnceLock, time::Duration};

use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use tradecore::venue::VenueError;

use super::Credentials;
use crate::utils::sign_hmac_sha256;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Signed-request transport for the Binance Spot REST API.
///
/// One pooled HTTP client per instance, created lazily on first use and
/// shared by concurrent requests. The signed query is embedded verbatim in
/// the request URL; handing it to the HTTP client as structured parameters
/// would re-encode it and break the signature.
pub struct BinanceSpotClient {
    url: String,
    client: OnceLock<reqwest::Client>,
}

impl BinanceSpotClient {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: OnceLock::new(),
        }
    }

    fn http(&self) -> &reqwest::Client {
        self.client.get_or_init(|| {
            reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to construct HTTP client")
        })
    }

    pub async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<T, VenueError> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn get_signed<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: &P,
        credentials: &Credentials,
    ) -> Result<T, VenueError> {
        let query = signed_query(params, &credentials.api_secret)?;
        self.request(Method::GET, path, &query, Some(&credentials.api_key))
            .await
    }

    pub async fn post_signed<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: &P,
        credentials: &Credentials,
    ) -> Result<T, VenueError> {
        let query = signed_query(params, &credentials.api_secret)?;
        self.request(Method::POST, path, &query, Some(&credentials.api_key))
            .await
    }

    pub async fn delete_signed<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: &P,
        credentials: &Credentials,
    ) -> Result<T, VenueError> {
        let query = signed_query(params, &credentials.api_secret)?;
        self.request(Method::DELETE, path, &query, Some(&credentials.api_key))
            .await
    }

    /// Key-only endpoints (listen-key management): API key header, no
    /// signature.
    pub async fn post_keyed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
        api_key: &str,
    ) -> Result<T, VenueError> {
        self.request(Method::POST, path, query, Some(api_key)).await
    }

    pub async fn put_keyed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
        api_key: &str,
    ) -> Result<T, VenueError> {
        self.request(Method::PUT, path, query, Some(api_key)).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &str,
        api_key: Option<&str>,
    ) -> Result<T, VenueError> {
        let url = if query.is_empty() {
            format!("{}{}", self.url, path)
        } else {
            format!("{}{}?{}", self.url, path, query)
        };
        let mut req = self
            .http()
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(api_key) = api_key {
            req = req.header(API_KEY_HEADER, api_key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| VenueError::Transient(format!("request failed: {e}")))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| VenueError::Transient(format!("body read failed: {e}")))?;
        classify_status(status, &body)?;
        serde_json::from_str(&body)
            .map_err(|e| VenueError::Transient(format!("decode failed: {e}")))
    }
}

/// Serialize `params`, then append `&signature=HMAC_SHA256(query, secret)`.
/// The parameter struct keeps `timestamp` as its last field, so the venue
/// sees `timestamp` and `signature` as the final two query fields.
pub(crate) fn signed_query<P: Serialize>(
    params: &P,
    api_secret: &str,
) -> Result<String, VenueError> {
    let query = serde_qs::to_string(params)
        .map_err(|e| VenueError::InvalidArgument(format!("unencodable parameters: {e}")))?;
    let signature = sign_hmac_sha256(api_secret, &query);
    Ok(format!("{query}&signature={signature}"))
}

/// Map an HTTP response to the venue error taxonomy. `Ok` for 2xx/3xx.
pub(crate) fn classify_status(status: u16, body: &str) -> Result<(), VenueError> {
    if status < 400 {
        return Ok(());
    }
    if status == 401 {
        return Err(VenueError::Authentication(format!("HTTP {status}")));
    }
    if matches!(status, 403 | 418 | 429) {
        return Err(VenueError::RateLimited(format!("HTTP {status}")));
    }
    if status >= 500 {
        return Err(VenueError::Transient(format!("HTTP {status}")));
    }

    // HTTP 400 carries a venue error body; -2013/-2011 mean the order is
    // gone, everything else is a business rejection.
    match serde_json::from_str::<super::msg::ErrorResponse>(body) {
        Ok(err) if matches!(err.code, -2013 | -2011) => Err(VenueError::NotFound(err.msg)),
        Ok(err) => Err(VenueError::OrderRejected {
            venue_code: err.code,
            reason: err.msg,
        }),
        Err(_) => Err(VenueError::OrderRejected {
            venue_code: -1,
            reason: format!("HTTP {status}"),
        }),
    }
}
