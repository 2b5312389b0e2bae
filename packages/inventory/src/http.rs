//! HTTP client for fetching Inventory documents.
//!
//! Only the command line uses this; library callers hand in bytes they
//! fetched themselves.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::{DEFAULT_MAX_RESPONSE_SIZE, HTTP_TIMEOUT_SECS};
use crate::error::{InventoryError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("inventory-harvester/", env!("CARGO_PKG_VERSION"));

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` configured with timeout and user agent.
pub fn create_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Download a document with the default size limit.
pub fn download_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    download_bytes_limited(client, url, DEFAULT_MAX_RESPONSE_SIZE)
}

/// Download content from a URL with retry logic and a size limit.
///
/// Uses exponential backoff for transient failures (connection errors,
/// timeouts, 5xx responses). Client errors are returned immediately.
///
/// # Arguments
/// * `client` - HTTP client to use
/// * `url` - URL to download from
/// * `max_bytes` - Largest accepted response body
///
/// # Returns
/// Raw bytes of the response body
pub fn download_bytes_limited(client: &Client, url: &str, max_bytes: u64) -> Result<Vec<u8>> {
    let mut last_error: Option<String> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            // Exponential backoff: 500ms, 1000ms
            let delay = RETRY_BASE_DELAY_MS * (1 << (attempt - 1));
            tracing::debug!(attempt, delay_ms = delay, "Retrying after delay");
            thread::sleep(Duration::from_millis(delay));
        }

        match client.get(url).send() {
            Ok(response) => {
                let status = response.status();

                if status.is_server_error() {
                    tracing::warn!(
                        status = %status,
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        "Server error, will retry"
                    );
                    last_error = Some(format!("Server error: {status}"));
                    continue;
                }

                let response = response.error_for_status()?;
                if response.content_length().is_some_and(|len| len > max_bytes) {
                    return Err(too_large(url, max_bytes));
                }

                // Content-Length can be absent or wrong; check what actually arrived
                let bytes = response.bytes()?;
                if bytes.len() as u64 > max_bytes {
                    return Err(too_large(url, max_bytes));
                }

                tracing::debug!(url, bytes = bytes.len(), "Downloaded document");
                return Ok(bytes.to_vec());
            }
            Err(e) => {
                if e.is_connect() || e.is_timeout() {
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        "Connection error, will retry"
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
                return Err(InventoryError::Http(e));
            }
        }
    }

    Err(InventoryError::RetriesExhausted {
        attempts: MAX_RETRIES,
        message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

fn too_large(url: &str, max_bytes: u64) -> InventoryError {
    InventoryError::ResponseTooLarge {
        url: url.to_string(),
        max_bytes,
    }
}
