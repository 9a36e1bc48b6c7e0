//! Portal transport
//!
//! The state machine never touches sockets; it emits requests and consumes
//! responses through [`PortalTransport`]. The production implementation
//! probes reachability with a plain TCP connect and executes requests over
//! reqwest with redirects and its cookie store disabled, so the session jar
//! stays the single cookie authority.

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::PortalConfig;
use crate::suez::http::{HttpRequest, HttpResponse, PortalHost, Verb};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transport closed")]
    Closed,
}

/// Asynchronous socket abstraction the driver runs the protocol over.
#[allow(async_fn_in_trait)]
pub trait PortalTransport {
    /// Ensure the given portal host is reachable.
    async fn connect(&mut self, host: PortalHost) -> Result<(), TransportError>;

    /// Execute one request and wait for the complete response.
    async fn send(&mut self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport over reqwest.
pub struct HttpsTransport {
    config: PortalConfig,
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new(config: PortalConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { config, client })
    }

    fn host_name(&self, host: PortalHost) -> &str {
        match host {
            PortalHost::Login => &self.config.login_host,
            PortalHost::Data => &self.config.data_host,
        }
    }

    fn url_for(&self, request: &HttpRequest) -> String {
        let scheme = if self.config.tls { "https" } else { "http" };
        format!(
            "{scheme}://{}:{}{}",
            self.host_name(request.host),
            self.config.port,
            request.path
        )
    }
}

impl PortalTransport for HttpsTransport {
    async fn connect(&mut self, host: PortalHost) -> Result<(), TransportError> {
        let address = format!("{}:{}", self.host_name(host), self.config.port);
        // Reachability probe only; TLS is negotiated per request.
        match TcpStream::connect(&address).await {
            Ok(_) => {
                debug!(host = %address, "portal reachable");
                Ok(())
            }
            Err(source) => Err(TransportError::Connect {
                host: address,
                source,
            }),
        }
    }

    async fn send(&mut self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request);
        debug!(verb = request.verb.as_str(), %url, "sending request");

        let mut builder = match request.verb {
            Verb::Get => self.client.get(&url),
            Verb::Post => self.client.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
