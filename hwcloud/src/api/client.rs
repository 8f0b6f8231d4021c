use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tfreconcile::{ApiError, ApiResult, ProviderConfig};

use super::common::{ApiErrorResponse, ApiQueryParams};

const AUTH_HEADER: &str = "X-Auth-Token";

/// Huawei Cloud API client shared by every resource of one provider
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    config: ProviderConfig,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ProviderConfig redacts the token
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Client {
    pub fn new(config: &ProviderConfig) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::transport)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                config: config.clone(),
            }),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.inner.config.project_id
    }

    pub fn region(&self) -> &str {
        &self.inner.config.region
    }

    /// Base URL of a service, e.g. `https://vpc.cn-north-4.myhuaweicloud.com`
    pub fn endpoint(&self, service: &str) -> String {
        self.inner.config.endpoint(service)
    }

    /// VPC API operations
    pub fn vpc(&self) -> crate::api::vpc::VpcApi<'_> {
        crate::api::vpc::VpcApi::new(self)
    }

    /// Auto Scaling API operations
    pub fn autoscaling(&self) -> crate::api::autoscaling::AutoscalingApi<'_> {
        crate::api::autoscaling::AutoscalingApi::new(self)
    }

    /// CCE add-on API operations
    pub fn cce(&self) -> crate::api::cce::CceApi<'_> {
        crate::api::cce::CceApi::new(self)
    }

    /// ECS API operations
    pub fn ecs(&self) -> crate::api::ecs::EcsApi<'_> {
        crate::api::ecs::EcsApi::new(self)
    }

    pub async fn get<T: for<'de> Deserialize<'de>>(&self, service: &str, path: &str) -> ApiResult<T> {
        self.execute(Method::GET, service, path, None::<&()>).await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        service: &str,
        path: &str,
        params: &ApiQueryParams,
    ) -> ApiResult<T> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(service, &full_path).await
    }

    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        service: &str,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.execute(Method::POST, service, path, Some(body)).await
    }

    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        service: &str,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.execute(Method::PUT, service, path, Some(body)).await
    }

    pub async fn delete<T: for<'de> Deserialize<'de>>(
        &self,
        service: &str,
        path: &str,
    ) -> ApiResult<T> {
        self.execute(Method::DELETE, service, path, None::<&()>).await
    }

    /// Sends one request. Failures are returned to the caller, never retried
    async fn execute<T, B>(
        &self,
        method: Method,
        service: &str,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.endpoint(service), path);
        tracing::debug!("{} request to: {}", method, url);

        let mut request = self
            .inner
            .http_client
            .request(method, &url)
            .header(AUTH_HEADER, &self.inner.config.auth_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::transport)?;
        if response.status().is_success() {
            self.parse_success_response(response).await
        } else {
            self.handle_error_response(response).await
        }
    }

    /// Parse successful response. An empty body decodes as JSON `null`
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let text = response.text().await.map_err(ApiError::transport)?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::decode(e)
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> ApiResult<T> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let details = serde_json::from_str::<ApiErrorResponse>(&text).unwrap_or_default();
        let message = details.message().unwrap_or(&text).to_string();

        let mut error = ApiError::from_status(status, message);
        if let Some(code) = details.code() {
            error = error.with_code(code);
        }
        Err(error)
    }
}
