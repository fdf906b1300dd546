use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{BoardSettings, BulletinSettings, HttpSettings};
use crate::error::FetchError;

/// JSON body of the board's search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub has_next: bool,
}

/// Filters sent to the search endpoint.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub funcao: String,
    pub cidade: String,
}

/// Everything the board pipeline needs from the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn search_page(&self, page: u32, query: &SearchQuery) -> Result<SearchPage, FetchError>;

    async fn detail_page(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed transport for the job board.
pub struct HttpTransport {
    client: reqwest::Client,
    search_url: String,
}

impl HttpTransport {
    pub fn new(http: &HttpSettings, board: &BoardSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&http.user_agent)
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()
            .map_err(|e| FetchError::http(&board.base_url, e))?;
        let search_url = format!(
            "{}/{}",
            board.base_url.trim_end_matches('/'),
            board.search_path.trim_start_matches('/')
        );
        Ok(Self { client, search_url })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn search_page(&self, page: u32, query: &SearchQuery) -> Result<SearchPage, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        let cache_buster = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
            .to_string();

        debug!(page, url = %self.search_url, "fetching search page");
        let body = self
            .client
            .get(&self.search_url)
            .headers(headers)
            .query(&[
                ("page", page.to_string()),
                ("funcao", query.funcao.clone()),
                ("cidade", query.cidade.clone()),
                ("force_pesquisa", "true".to_string()),
                ("_", cache_buster),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FetchError::http(&self.search_url, e))?
            .text()
            .await
            .map_err(|e| FetchError::http(&self.search_url, e))?;

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: self.search_url.clone(),
            source,
        })
    }

    async fn detail_page(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching detail page");
        self.client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FetchError::http(url, e))?
            .text()
            .await
            .map_err(|e| FetchError::http(url, e))
    }
}

/// Download the bulletin PDF. The origin serves a broken certificate chain, so
/// `insecure_origin` turns certificate checks off for this client only.
pub async fn download_bulletin(
    http: &HttpSettings,
    bulletin: &BulletinSettings,
) -> Result<Vec<u8>, FetchError> {
    let url = bulletin.pdf_url.as_str();
    let client = reqwest::Client::builder()
        .user_agent(&http.user_agent)
        .timeout(Duration::from_secs(bulletin.timeout_secs))
        .danger_accept_invalid_certs(bulletin.insecure_origin)
        .build()
        .map_err(|e| FetchError::http(url, e))?;

    if bulletin.insecure_origin {
        info!(url, "certificate verification disabled for bulletin origin");
    }

    let bytes = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| FetchError::http(url, e))?
        .bytes()
        .await
        .map_err(|e| FetchError::http(url, e))?;

    info!(url, bytes = bytes.len(), "downloaded bulletin");
    Ok(bytes.to_vec())
}

/// Page-by-page text extraction, pages joined by newlines.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, FetchError> {
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map(|pages| pages.join("\n"))
            .map_err(|e| FetchError::Pdf(e.to_string()))
    })
    .await
    .map_err(|e| FetchError::Pdf(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_page_defaults() {
        let page: SearchPage = serde_json::from_str(r#"{"html":"<div></div>"}"#).unwrap();
        assert_eq!(page.html, "<div></div>");
        assert!(!page.has_next);
    }

    #[test]
    fn search_page_extra_fields() {
        let page: SearchPage =
            serde_json::from_str(r#"{"html":"","has_next":true,"total":42}"#).unwrap();
        assert!(page.has_next);
    }

    #[tokio::test]
    async fn garbage_pdf_is_an_error() {
        let err = extract_pdf_text(b"not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, FetchError::Pdf(_)));
    }
}
