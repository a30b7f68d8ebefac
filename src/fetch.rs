use futures::future::BoxFuture;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, REFERER},
    Method,
};

use crate::{config::EngineConfig, error::ExtractError, utils};

#[derive(Debug, Clone, Default)]
pub struct FetchRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub referer: Option<&'a str>,
}

impl<'a> FetchRequest<'a> {
    pub fn get(url: &'a str) -> Self {
        Self {
            url,
            ..Default::default()
        }
    }

    /// Bodiless POST, as issued by page scripts calling `fetch(…)`.
    pub fn post(url: &'a str) -> Self {
        Self {
            method: Method::POST,
            url,
            ..Default::default()
        }
    }

    pub fn with_headers(mut self, headers: &'a [(&'a str, &'a str)]) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_referer(mut self, referer: &'a str) -> Self {
        self.referer = Some(referer);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub body: String,
    /// Url after redirects.
    pub final_url: String,
    pub status: u16,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    /// Turns an error status into [`ExtractError::Fetch`].
    pub fn error_for_status(self) -> Result<FetchResponse, ExtractError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ExtractError::Fetch(format!(
                "{} responded with status {}",
                self.final_url, self.status
            )))
        }
    }
}

/// Transport used by resolvers. Timeouts are the implementation's business.
pub trait Fetcher: Send + Sync {
    fn fetch_text<'a>(
        &'a self,
        request: FetchRequest<'a>,
    ) -> BoxFuture<'a, Result<FetchResponse, ExtractError>>;
}

/// [`Fetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        let client = utils::create_client_builder(config).build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> anyhow::Result<FetchResponse> {
        let mut headers = HeaderMap::new();
        for (name, value) in request.headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        if let Some(referer) = request.referer {
            headers.insert(REFERER, HeaderValue::from_str(referer)?);
        }

        let res = self
            .client
            .request(request.method, request.url)
            .headers(headers)
            .send()
            .await?;

        let status = res.status().as_u16();
        let final_url = res.url().to_string();
        let body = res.text().await?;

        Ok(FetchResponse {
            body,
            final_url,
            status,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    fn fetch_text<'a>(
        &'a self,
        request: FetchRequest<'a>,
    ) -> BoxFuture<'a, Result<FetchResponse, ExtractError>> {
        Box::pin(async move { self.fetch(request).await.map_err(ExtractError::fetch) })
    }
}
