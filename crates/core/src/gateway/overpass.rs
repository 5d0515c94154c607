use std::{future::Future, pin::Pin};

use reqwest::Client;

use super::Gateway;
use crate::{config::EngineConfig, error::GatewayError};

/// HTTP transport to an Overpass API interpreter.
pub struct OverpassGateway {
    client: Client,
    endpoint: String,
}

impl OverpassGateway {
    pub fn new(config: &EngineConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("zone-core/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(OverpassGateway {
            client,
            endpoint: config.overpass_url.clone(),
        })
    }

    async fn post(&self, query: &str) -> Result<String, GatewayError> {
        tracing::debug!(endpoint = %self.endpoint, bytes = query.len(), "overpass request");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

impl Gateway for OverpassGateway {
    fn fetch<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>> {
        Box::pin(self.post(query))
    }
}
