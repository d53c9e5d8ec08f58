use futures::future::{FutureExt, LocalBoxFuture};
use gloo_net::http::{Request, RequestBuilder, Response};
use serde_json::Value;

use crate::error::TrackerError;
use crate::services::api_client::{HttpClient, HttpResponse};

/// Cliente HTTP sobre fetch (gloo-net)
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooHttpClient;

fn with_bearer(builder: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
    match bearer {
        Some(token) => builder.header("Authorization", &format!("Bearer {}", token)),
        None => builder,
    }
}

async fn read_response(response: Response) -> Result<HttpResponse, TrackerError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| TrackerError::Network(format!("Read error: {}", e)))?;
    Ok(HttpResponse { status, body })
}

impl HttpClient for GlooHttpClient {
    fn get(&self, url: &str, bearer: Option<&str>) -> LocalBoxFuture<'static, Result<HttpResponse, TrackerError>> {
        let builder = with_bearer(Request::get(url), bearer);
        async move {
            let response = builder
                .send()
                .await
                .map_err(|e| TrackerError::Network(format!("Request error: {}", e)))?;
            read_response(response).await
        }
        .boxed_local()
    }

    fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> LocalBoxFuture<'static, Result<HttpResponse, TrackerError>> {
        let request = with_bearer(Request::post(url), bearer).json(body);
        async move {
            let request = request
                .map_err(|e| TrackerError::Network(format!("Request build error: {}", e)))?;
            let response = request
                .send()
                .await
                .map_err(|e| TrackerError::Network(format!("Request error: {}", e)))?;
            read_response(response).await
        }
        .boxed_local()
    }
}
