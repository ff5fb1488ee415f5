//! Shared HTTP plumbing for the ledger, index and relay clients.

use reqwest::Client;
use std::time::Duration;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a client with bounded connect and request timeouts
pub fn build_http_client(request_timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {}", e))
}

/// Render a transport error with its class
pub fn describe_http_error(error: &reqwest::Error) -> String {
    if let Some(status) = error.status() {
        format!("Request failed with status {}: {}", status, error)
    } else if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection error: {}", error)
    } else {
        format!("HTTP error: {}", error)
    }
}

/// Read a non-success response body into an error message
pub async fn describe_status(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    format!("status {}: {}", status, body)
}
