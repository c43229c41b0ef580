//! The WeChat REST endpoints the signature flow consumes.
//!
//! Behind a trait so the service can be exercised without the network; the
//! real implementation is a thin reqwest client over
//! `api.weixin.qq.com/cgi-bin`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use namecard_core::error::WechatError;

/// Upstream token endpoints. One call per method; no retry — a failed fetch
/// propagates upward.
#[async_trait]
pub trait WechatApi: Send + Sync {
    /// `GET cgi-bin/token` — the short-lived API access token.
    async fn fetch_access_token(&self, appid: &str, secret: &str) -> Result<String, WechatError>;

    /// `GET cgi-bin/ticket/getjsapi_ticket` — the JS-SDK ticket.
    async fn fetch_jsapi_ticket(&self, access_token: &str) -> Result<String, WechatError>;
}

/// The production client.
pub struct HttpWechatApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpWechatApi {
    pub fn new() -> Self {
        Self::with_base_url("https://api.weixin.qq.com")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WechatError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| WechatError::Network(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| WechatError::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            error!(body = %body, "Unparseable WeChat API response");
            WechatError::MalformedResponse(e.to_string())
        })
    }
}

impl Default for HttpWechatApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WechatApi for HttpWechatApi {
    async fn fetch_access_token(&self, appid: &str, secret: &str) -> Result<String, WechatError> {
        debug!("Requesting access_token from WeChat API");
        let url = format!("{}/cgi-bin/token", self.base_url);
        let response: TokenResponse = self
            .get_json(
                &url,
                &[
                    ("grant_type", "client_credential"),
                    ("appid", appid),
                    ("secret", secret),
                ],
            )
            .await?;

        match response.access_token {
            Some(token) => Ok(token),
            None => {
                let err = WechatError::Upstream {
                    kind: "access_token".into(),
                    errcode: response.errcode.unwrap_or_default(),
                    errmsg: response.errmsg.unwrap_or_default(),
                };
                error!(error = %err, "Failed to get access_token");
                Err(err)
            }
        }
    }

    async fn fetch_jsapi_ticket(&self, access_token: &str) -> Result<String, WechatError> {
        debug!("Requesting jsapi_ticket from WeChat API");
        let url = format!("{}/cgi-bin/ticket/getjsapi_ticket", self.base_url);
        let response: TicketResponse = self
            .get_json(&url, &[("access_token", access_token), ("type", "jsapi")])
            .await?;

        match response.ticket {
            Some(ticket) => Ok(ticket),
            None => {
                let err = WechatError::Upstream {
                    kind: "jsapi_ticket".into(),
                    errcode: response.errcode.unwrap_or_default(),
                    errmsg: response.errmsg.unwrap_or_default(),
                };
                error!(error = %err, "Failed to get jsapi_ticket");
                Err(err)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    errcode: Option<i64>,
    #[serde(default)]
    errmsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    #[serde(default)]
    ticket: Option<String>,
    #[serde(default)]
    errcode: Option<i64>,
    #[serde(default)]
    errmsg: Option<String>,
}
