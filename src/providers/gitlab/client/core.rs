use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::auth::Token;
use crate::config::{FetchConfig, ProjectRef};
use crate::error::{CiBarError, Result};

pub struct GitLabClient {
    pub client: Client,
    pub api_url: Url,
    token: Token,
    pub(super) per_page: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl GitLabClient {
    /// Creates a client for one GitLab instance.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the HTTP client cannot be built or the base URL is invalid.
    pub fn new(base_url: &str, token: Token, fetch: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gitlab-ci-bar/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .build()
            .map_err(|e| CiBarError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Url::join drops the last path segment unless it ends with a slash
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let api_url = Url::parse(&base)
            .map_err(|e| CiBarError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| CiBarError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
            per_page: fetch.per_page,
            max_retries: fetch.max_retries,
            retry_delay: Duration::from_millis(fetch.retry_delay_ms),
        })
    }

    /// Builds `projects/<id>/<segments..>` with the given query parameters.
    ///
    /// Project paths such as `group/app` are encoded as a single segment.
    pub(super) fn project_url(
        &self,
        project: &ProjectRef,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| CiBarError::Config(format!("Invalid API base URL: {}", self.api_url)))?
            .pop_if_empty()
            .push("projects")
            .push(&project.to_string())
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    /// Appends the private token, after any query string already present.
    pub fn authenticate(&self, mut url: Url) -> Url {
        url.query_pairs_mut()
            .append_pair("private_token", self.token.as_str());
        url
    }

    /// GET a JSON document with retry on transient failures.
    ///
    /// Connection errors, timeouts, 429 and 5xx responses are retried up to
    /// `max_retries` times. Other non-2xx statuses and undecodable bodies fail
    /// immediately.
    pub(super) async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        // Never put the token into errors or logs
        let endpoint = url.path().to_string();
        let url = self.authenticate(url);

        let mut retry_count = 0;
        loop {
            debug!("GET {endpoint}");

            let response = match self.client.get(url.clone()).send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    let e = e.without_url();
                    if retry_count >= self.max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error on {endpoint} ({e}), retrying in {}ms ({}/{})...",
                        self.retry_delay.as_millis(),
                        retry_count + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.without_url().into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= self.max_retries {
                    return Err(CiBarError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: self.max_retries,
                    });
                }

                warn!(
                    "GitLab API error on {endpoint} (status {status}), retrying in {}ms ({}/{})...",
                    self.retry_delay.as_millis(),
                    retry_count + 1,
                    self.max_retries
                );

                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(CiBarError::Api {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            let body = response.text().await.map_err(reqwest::Error::without_url)?;

            return serde_json::from_str(&body)
                .map_err(|source| CiBarError::MalformedResponse { endpoint, source });
        }
    }
}
