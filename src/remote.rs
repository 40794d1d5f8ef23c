//! HTTP client for the dictionary lookup endpoint.

use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

const LOOKUP_PATH: &str = "look_up_dictionary";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Clone, Debug)]
pub struct DictionaryClient {
    client: Client,
    base: Url,
}

impl DictionaryClient {
    /// Any path in `base_url` is kept as a prefix for the lookup endpoint.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("immersion-lookup/", env!("CARGO_PKG_VERSION"))
    }

    /// `GET /look_up_dictionary?keyword=<keyword>` with the keyword encoded.
    pub fn lookup_url(&self, keyword: &str) -> Result<Url, FetchError> {
        let mut url = self.base.join(LOOKUP_PATH)?;
        url.query_pairs_mut().append_pair("keyword", keyword);
        Ok(url)
    }

    /// Fetch the raw JSON body for `keyword`.
    ///
    /// Non-2xx responses fail with [`FetchError::Status`]; the body is not
    /// inspected further.
    #[instrument(skip(self))]
    pub async fn fetch(&self, keyword: &str) -> Result<Value, FetchError> {
        let url = self.lookup_url(keyword)?;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "Dictionary request rejected");
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}
