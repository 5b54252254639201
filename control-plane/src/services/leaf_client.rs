//! reqwest-backed client for the leaf-service fault contract

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::error::{ControlPlaneError, ControlPlaneResult};
use crate::traits::{LeafEndpoint, LeafServiceClient};
use shared::{FaultControlRequest, FaultControlResponse, FaultServiceInfo, FaultStatus};

/// Real leaf client with connect and total timeouts on every call
#[derive(Debug, Clone)]
pub struct HttpLeafClient {
    client: reqwest::Client,
}

impl HttpLeafClient {
    pub fn new(timeout: Duration) -> ControlPlaneResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ControlPlaneError::config(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn url(endpoint: &LeafEndpoint, path: &str) -> ControlPlaneResult<Url> {
        Url::parse(&endpoint.base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| {
                let reason = format!("bad address {}: {e}", endpoint.base_url);
                ControlPlaneError::leaf_transport(&endpoint.service_id, reason)
            })
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &LeafEndpoint,
        response: reqwest::Response,
    ) -> ControlPlaneResult<T> {
        if response.status() != StatusCode::OK {
            return Err(ControlPlaneError::LeafStatusError {
                service_id: endpoint.service_id.clone(),
                status: response.status().as_u16(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| ControlPlaneError::leaf_transport(&endpoint.service_id, e))?;
        shared::decode(&body).map_err(|e| ControlPlaneError::contract(&endpoint.service_id, e))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &LeafEndpoint, path: &str) -> ControlPlaneResult<T> {
        let url = Self::url(endpoint, path)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ControlPlaneError::leaf_transport(&endpoint.service_id, e))?;
        Self::read_json(endpoint, response).await
    }
}

#[async_trait]
impl LeafServiceClient for HttpLeafClient {
    async fn fetch_info(&self, endpoint: &LeafEndpoint) -> ControlPlaneResult<FaultServiceInfo> {
        self.get(endpoint, "/fault/info").await
    }

    async fn fetch_status(&self, endpoint: &LeafEndpoint) -> ControlPlaneResult<FaultStatus> {
        self.get(endpoint, "/fault/status").await
    }

    async fn send_control(
        &self,
        endpoint: &LeafEndpoint,
        request: &FaultControlRequest,
    ) -> ControlPlaneResult<FaultControlResponse> {
        let url = Self::url(endpoint, "/fault/control")?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ControlPlaneError::leaf_transport(&endpoint.service_id, e))?;
        Self::read_json(endpoint, response).await
    }
}
