//! Outbound HTTP delivery shared by the alert and push-gateway sinks.
//!
//! Every call goes through a client built with a fixed timeout. There are no
//! retries: a failed call is logged here and returned to the sink.

use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Build a client whose every request is bounded by `timeout`
pub fn build_client(timeout: Duration) -> Result<Client, DeliveryError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

async fn send_request(request: RequestBuilder) -> Result<(String, u16, String), DeliveryError> {
    let response = request.send().await?;
    let status = response.status();
    let host = response.url().host_str().unwrap_or_default().to_string();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok((host, status.as_u16(), body))
}

async fn execute(
    request: RequestBuilder,
    request_data: &str,
    service_name: &str,
) -> Result<String, DeliveryError> {
    let start = Instant::now();

    match send_request(request).await {
        Ok((host, status, body)) => {
            info!(
                service = %service_name,
                total_time_ms = elapsed_ms(start),
                request_host = %host,
                response_status = status,
                "Call to {} was successful",
                service_name
            );
            Ok(body)
        }
        Err(e) => {
            error!(
                service = %service_name,
                total_time_ms = elapsed_ms(start),
                request_data = %request_data,
                error = %e,
                "{} error",
                service_name
            );
            Err(e)
        }
    }
}

/// Send `body` as JSON; any non-2xx response is an error
pub async fn send_json<T: Serialize + ?Sized>(
    client: &Client,
    method: Method,
    url: &str,
    body: &T,
    service_name: &str,
) -> Result<String, DeliveryError> {
    let encoded = serde_json::to_string(body)?;
    let request = client
        .request(method, url)
        .header(CONTENT_TYPE, "application/json")
        .body(encoded.clone());
    execute(request, &encoded, service_name).await
}

/// Send a plain-text body with the given content type
pub async fn send_text(
    client: &Client,
    method: Method,
    url: &str,
    body: String,
    content_type: &str,
    service_name: &str,
) -> Result<String, DeliveryError> {
    let request_data = format!("{} bytes of {}", body.len(), content_type);
    let request = client
        .request(method, url)
        .header(CONTENT_TYPE, content_type)
        .body(body);
    execute(request, &request_data, service_name).await
}
