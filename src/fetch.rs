use std::time::Duration;

use async_trait::async_trait;

/// Transport-level failure of a single GET. HTTP status codes never end up here.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Performs one GET and waits until the response body is fully received.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<(), FetchError>;
}

/// `reqwest`-backed fetcher. Any response, whatever its status, counts as success.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a client with no request deadline unless `timeout` is given.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<(), FetchError> {
        let response = self.client.get(url).send().await?;
        response.bytes().await?;
        Ok(())
    }
}
