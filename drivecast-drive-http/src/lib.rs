use async_trait::async_trait;
use drivecast_core::{CoreError, DriveConfig, DriveItem, DriveSource, Endpoints, FolderPage};
use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "drivecast::drive_http";

/// Connect timeout, kept below the overall request timeout
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Drive backend reached over its HTTP API
pub struct HttpDrive {
    client: ClientWithMiddleware,
    endpoints: Endpoints,
}

impl HttpDrive {
    /// Create a drive client with the given request timeout and retry budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(endpoints: Endpoints, timeout: Duration, max_retries: u32) -> Result<Self, CoreError> {
        // Base client with timeout
        let base_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
            .user_agent(concat!("Drivecast/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, endpoints })
    }

    /// Create a drive client from the `[drive]` config section
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the client cannot be created.
    pub fn from_config(config: &DriveConfig, thumbnail_size: &str) -> Result<Self, CoreError> {
        let endpoints = Endpoints::from_config(config, thumbnail_size)?;
        info!(
            target: LOG_TARGET,
            "Using drive at {} (timeout {}s, {} retries, {} protected routes)",
            config.base_url,
            config.timeout_secs,
            config.max_retries,
            config.protected_routes.len()
        );
        Self::new(endpoints, config.timeout(), config.max_retries)
    }

    /// URL builder used by this client
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn get(&self, url: reqwest::Url) -> Result<Response, CoreError> {
        debug!(target: LOG_TARGET, "GET {}", url);
        Ok(self.client.get(url).send().await?)
    }

    async fn listing(&self, path: &str, next: Option<&str>) -> Result<ListingResponse, CoreError> {
        let url = self.endpoints.listing(path, next)?;
        let response = self.get(url).await?;
        let response = ensure_success(response)?;
        let body = response.text().await?;
        parse_listing(path, &body)
    }
}

/// Body of `GET /api/?path=..`
#[derive(Debug, Default, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    folder: Option<FolderValue>,
    #[serde(default)]
    file: Option<DriveItem>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FolderValue {
    #[serde(default)]
    value: Vec<DriveItem>,
}

fn parse_listing(path: &str, body: &str) -> Result<ListingResponse, CoreError> {
    serde_json::from_str(body).map_err(|e| CoreError::UnexpectedResponse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn into_folder_page(path: &str, listing: ListingResponse) -> Result<FolderPage, CoreError> {
    match listing.folder {
        Some(folder) => Ok(FolderPage::new(folder.value, listing.next)),
        None => Err(CoreError::UnexpectedResponse {
            path: path.to_string(),
            reason: "expected a folder listing".into(),
        }),
    }
}

fn into_item(path: &str, listing: ListingResponse) -> Result<DriveItem, CoreError> {
    match (listing.file, listing.folder) {
        (Some(item), _) => Ok(item),
        (None, Some(_)) => Err(CoreError::UnexpectedResponse {
            path: path.to_string(),
            reason: "path is a folder".into(),
        }),
        (None, None) => Err(CoreError::UnexpectedResponse {
            path: path.to_string(),
            reason: "response has neither file nor folder".into(),
        }),
    }
}

fn ensure_success(response: Response) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        warn!(target: LOG_TARGET, "Drive returned status {} for {}", status, response.url());
        Err(CoreError::HttpStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// Like [`ensure_success`], but a 404 means the file doesn't exist
fn optional_success(response: Response) -> Result<Option<Response>, CoreError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    ensure_success(response).map(Some)
}

#[async_trait]
impl DriveSource for HttpDrive {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_folder_page(&self, folder: &str, next: Option<&str>) -> Result<FolderPage, CoreError> {
        let listing = self.listing(folder, next).await?;
        into_folder_page(folder, listing)
    }

    async fn fetch_item(&self, path: &str) -> Result<DriveItem, CoreError> {
        let listing = self.listing(path, None).await?;
        into_item(path, listing)
    }

    async fn fetch_text(&self, path: &str) -> Result<Option<String>, CoreError> {
        let url = self.endpoints.raw(path)?;
        let Some(response) = optional_success(self.get(url).await?)? else {
            debug!(target: LOG_TARGET, "{} not found", path);
            return Ok(None);
        };
        Ok(Some(response.text().await?))
    }

    async fn fetch_thumbnail(&self, path: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let url = self.endpoints.thumbnail(path)?;
        let Some(response) = optional_success(self.get(url).await?)? else {
            debug!(target: LOG_TARGET, "No thumbnail for {}", path);
            return Ok(None);
        };
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(bytes.to_vec()))
    }
}
