//! HTTP client for the company registry page and the tender API.
//!
//! URL construction is deterministic so the upstream URL doubles as the cache key.

pub mod error;


pub use error::{UpstreamError, UpstreamResult};

use reqwest::Client as HttpClient;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::Config;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const HTML_ACCEPT_LANGUAGE: &str = "zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7";
const JSON_ACCEPT: &str = "application/json";

/// Client for the two upstream domains.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: HttpClient,
    twincn_base: Url,
    pcc_base: Url,
}

impl UpstreamClient {
    /// Creates a client for the given base URLs.
    pub fn new(twincn_base: &str, pcc_base: &str) -> UpstreamResult<Self> {
        Self::with_http_client(HttpClient::new(), twincn_base, pcc_base)
    }

    /// Creates a client from [`Config`] base URLs.
    pub fn from_config(config: &Config) -> UpstreamResult<Self> {
        Self::new(&config.twincn_base_url, &config.pcc_base_url)
    }

    /// Creates a client reusing an existing `reqwest` client.
    pub fn with_http_client(
        http: HttpClient,
        twincn_base: &str,
        pcc_base: &str,
    ) -> UpstreamResult<Self> {
        Ok(Self {
            http,
            twincn_base: parse_base(twincn_base)?,
            pcc_base: parse_base(pcc_base)?,
        })
    }

    /// Cache key for a company page (`twincn:<taxId>`).
    pub fn company_cache_key(tax_id: &str) -> String {
        format!("twincn:{}", tax_id)
    }

    /// `<twincn>/item.aspx?no=<taxId>`
    pub fn company_page_url(&self, tax_id: &str) -> UpstreamResult<Url> {
        let mut url = join(&self.twincn_base, "item.aspx")?;
        url.query_pairs_mut().append_pair("no", tax_id);
        Ok(url)
    }

    /// `<pcc>/api/searchbycompanyid?query=<taxId>&page=<page>`
    pub fn tender_search_url(&self, tax_id: &str, page: u32) -> UpstreamResult<Url> {
        let mut url = join(&self.pcc_base, "api/searchbycompanyid")?;
        url.query_pairs_mut()
            .append_pair("query", tax_id)
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    /// `<pcc>/api/tender?unit_id=<unitId>&job_number=<jobNumber>`
    pub fn tender_detail_url(&self, unit_id: &str, job_number: &str) -> UpstreamResult<Url> {
        let mut url = join(&self.pcc_base, "api/tender")?;
        url.query_pairs_mut()
            .append_pair("unit_id", unit_id)
            .append_pair("job_number", job_number);
        Ok(url)
    }

    /// Fetches a page with browser-like headers and returns the raw HTML.
    pub async fn fetch_html(&self, url: &Url) -> UpstreamResult<String> {
        let resp = self
            .http
            .get(url.clone())
            .headers(browser_headers())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status,
                url: url.to_string(),
            });
        }

        let body = resp.text().await?;
        debug!(url = %url, bytes = body.len(), "Fetched HTML");
        Ok(body)
    }

    /// Fetches a JSON document.
    pub async fn fetch_json(&self, url: &Url) -> UpstreamResult<Value> {
        let resp = self
            .http
            .get(url.clone())
            .header(ACCEPT, JSON_ACCEPT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status,
                url: url.to_string(),
            });
        }

        let bytes = resp.bytes().await?;
        let value = serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!(url = %url, bytes = bytes.len(), "Fetched JSON");
        Ok(value)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(HTML_ACCEPT_LANGUAGE));
    headers.insert(REFERER, HeaderValue::from_static("https://p.twincn.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://p.twincn.com"));
    headers
}

// Relative joins replace the last path segment unless the base ends in '/'.
fn parse_base(value: &str) -> UpstreamResult<Url> {
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{}/", value)
    };
    Url::parse(&normalized).map_err(|e| UpstreamError::InvalidUrl {
        value: value.to_string(),
        source: e,
    })
}

fn join(base: &Url, path: &str) -> UpstreamResult<Url> {
    base.join(path).map_err(|e| UpstreamError::InvalidUrl {
        value: format!("{}{}", base, path),
        source: e,
    })
}
