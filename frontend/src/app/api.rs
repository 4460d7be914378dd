use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder};
use shared::backend::BackendError;
use shared::rest::{Method, RestRequest, RestResponse, SupabaseConfig, SupabaseRest, Transport};

const SUPABASE_URL: Option<&str> = option_env!("GRADENCE_SUPABASE_URL");
const SUPABASE_ANON_KEY: Option<&str> = option_env!("GRADENCE_SUPABASE_ANON_KEY");

pub type BackendApi = SupabaseRest<GlooTransport>;

/// Supabase settings baked in at build time.
pub fn supabase_config() -> Result<SupabaseConfig, BackendError> {
    SupabaseConfig::new(
        SUPABASE_URL.unwrap_or_default(),
        SUPABASE_ANON_KEY.unwrap_or_default(),
    )
}

pub struct GlooTransport;

fn transport_error(err: gloo_net::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

#[async_trait(?Send)]
impl Transport for GlooTransport {
    async fn send(&self, request: RestRequest) -> Result<RestResponse, BackendError> {
        let mut builder: RequestBuilder = match request.method {
            Method::Get => Request::get(&request.url),
            Method::Post => Request::post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let req = match request.body {
            Some(body) => builder.body(body).map_err(transport_error)?,
            None => builder.build().map_err(transport_error)?,
        };

        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        let body = resp.text().await.map_err(transport_error)?;

        Ok(RestResponse { status, body })
    }
}
