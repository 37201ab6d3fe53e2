//! HTTP(S) requests to device admin pages. Redirects are not followed (a 302 is an
//! answer in itself) and certificate errors are ignored, since consumer hardware ships
//! self-signed certificates.

use std::time::Duration;

use reqwest::{Client, redirect};
use tracing::debug;

use super::Credentials;

/// Admin login pages fit well inside this
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    body_limit: usize,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            client,
            body_limit: MAX_BODY_BYTES,
        })
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Status of a GET, `None` if nothing came back
    pub async fn status(&self, url: &str, credentials: Option<&Credentials>) -> Option<u16> {
        let mut request = self.client.get(url);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        match request.send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                debug!(url, error = %e, "HTTP request failed");
                None
            }
        }
    }

    /// Body of an unauthenticated GET, cut off after the body limit
    pub async fn body(&self, url: &str) -> Option<String> {
        let mut response = self.client.get(url).send().await.ok()?;
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.ok()? {
            let room = self.body_limit - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(url, limit = self.body_limit, "Body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Some(String::from_utf8_lossy(&body).into_owned())
    }
}
