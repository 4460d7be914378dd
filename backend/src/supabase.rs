use async_trait::async_trait;
use reqwest::Client;
use shared::backend::BackendError;
use shared::rest::{Method, RestRequest, RestResponse, SupabaseConfig, SupabaseRest, Transport};

pub type SupabaseClient = SupabaseRest<ReqwestTransport>;

pub fn connect(config: SupabaseConfig) -> SupabaseClient {
    SupabaseRest::new(config, ReqwestTransport::default())
}

#[derive(Default, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn send(&self, request: RestRequest) -> Result<RestResponse, BackendError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(RestResponse { status, body })
    }
}
