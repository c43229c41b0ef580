//! WeChat JS-SDK signature service.
//!
//! The seven-step recipe from the JS-SDK documentation: fetch an
//! access_token, trade it for a jsapi_ticket (both cached for slightly less
//! than their upstream 7200 s lifetime), then SHA1-sign
//! `jsapi_ticket=…&noncestr=…&timestamp=…&url=…` for the page being shared.
//! Any failure along the way surfaces as one error — never partial output.

pub mod api;
pub mod cache;

pub use api::{HttpWechatApi, WechatApi};
pub use cache::TokenCache;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::debug;

use namecard_core::error::WechatError;

const CACHE_KEY_ACCESS_TOKEN: &str = "wechat_access_token";
const CACHE_KEY_JSAPI_TICKET: &str = "wechat_jsapi_ticket";

/// Upstream declares 7200 s; cache a little shorter so we never serve a
/// token that expires mid-use.
const TOKEN_TTL: Duration = Duration::from_secs(7000);

/// The signed configuration the JS-SDK client consumes verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignaturePayload {
    #[serde(rename = "appId")]
    pub app_id: String,

    /// Unix seconds, as a string per the JS-SDK contract.
    pub timestamp: String,

    #[serde(rename = "nonceStr")]
    pub nonce_str: String,

    pub signature: String,

    /// The signed URL, fragment removed.
    pub url: String,
}

/// Computes JS-SDK signatures for page URLs.
pub struct SignatureService {
    appid: Option<String>,
    secret: Option<String>,
    api: Arc<dyn WechatApi>,
    cache: TokenCache,
}

impl SignatureService {
    pub fn new(
        appid: Option<String>,
        secret: Option<String>,
        api: Arc<dyn WechatApi>,
    ) -> Self {
        Self {
            appid,
            secret,
            api,
            cache: TokenCache::new(),
        }
    }

    /// Build the production service from configuration.
    pub fn from_config(config: &namecard_config::WechatConfig) -> Self {
        Self::new(
            config.appid.clone(),
            config.secret.clone(),
            Arc::new(HttpWechatApi::new()),
        )
    }

    /// Sign a page URL.
    ///
    /// Fails immediately when credentials are missing; otherwise runs the
    /// cache-or-fetch chain and signs with a fresh nonce and the current
    /// Unix time.
    pub async fn sign(&self, url: &str) -> Result<SignaturePayload, WechatError> {
        let (appid, secret) = self.credentials()?;

        let ticket = self.jsapi_ticket(appid, secret).await?;

        let nonce_str = fresh_nonce();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let url = strip_fragment(url);
        let signature = sha1_hex(&signature_base(&ticket, &nonce_str, &timestamp, url));

        Ok(SignaturePayload {
            app_id: appid.to_string(),
            timestamp,
            nonce_str,
            signature,
            url: url.to_string(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str), WechatError> {
        match (self.appid.as_deref(), self.secret.as_deref()) {
            (Some(appid), Some(secret)) if !appid.is_empty() && !secret.is_empty() => {
                Ok((appid, secret))
            }
            _ => Err(WechatError::NotConfigured),
        }
    }

    async fn access_token(&self, appid: &str, secret: &str) -> Result<String, WechatError> {
        if let Some(cached) = self.cache.get(CACHE_KEY_ACCESS_TOKEN).await {
            debug!("access_token cache hit");
            return Ok(cached);
        }

        let token = self.api.fetch_access_token(appid, secret).await?;
        self.cache.put(CACHE_KEY_ACCESS_TOKEN, &token, TOKEN_TTL).await;
        Ok(token)
    }

    async fn jsapi_ticket(&self, appid: &str, secret: &str) -> Result<String, WechatError> {
        if let Some(cached) = self.cache.get(CACHE_KEY_JSAPI_TICKET).await {
            debug!("jsapi_ticket cache hit");
            return Ok(cached);
        }

        let access_token = self.access_token(appid, secret).await?;
        let ticket = self.api.fetch_jsapi_ticket(&access_token).await?;
        self.cache.put(CACHE_KEY_JSAPI_TICKET, &ticket, TOKEN_TTL).await;
        Ok(ticket)
    }
}

/// The exact string the JS-SDK mandates, field order included.
pub fn signature_base(ticket: &str, nonce: &str, timestamp: &str, url: &str) -> String {
    format!("jsapi_ticket={ticket}&noncestr={nonce}&timestamp={timestamp}&url={url}")
}

/// SHA1 hex digest, lowercase.
pub fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

/// The JS-SDK signs the URL without its fragment.
fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

fn fresh_nonce() -> String {
    let mut bytes = [0u8; 8];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
