//! Request Relay
//!
//! Forwards a single GET to an absolute URL and mirrors the upstream status,
//! headers and body back to the caller.

use axum::body::Body;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use tracing::{error, info};

use crate::config::FetchConfig;
use crate::error::RelayError;
use crate::Result;

/// One-shot GET relay
#[derive(Debug, Clone)]
pub struct RequestRelay {
    client: reqwest::Client,
}

impl RequestRelay {
    /// Create a request relay from configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            // every request stands alone; nothing is kept between them
            .pool_max_idle_per_host(0);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Serve one `/proxy-schema` request.
    ///
    /// A missing `url` is answered without any outbound request. The upstream
    /// response is owned by the streamed body and released with it.
    pub async fn forward(&self, url: Option<&str>) -> Response {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return RelayError::MissingParameter("url").into_response();
        };

        info!("Proxying schema request to: {}", url);

        match self.client.get(url).send().await {
            Ok(upstream) => mirror(upstream),
            Err(e) => {
                let err = RelayError::FetchFailed {
                    url: url.to_string(),
                    source: Box::new(e),
                };
                error!("Error performing proxy request: {}", err);
                err.into_response()
            }
        }
    }
}

/// Copy status, every header value in upstream order, and the body stream
fn mirror(upstream: reqwest::Response) -> Response {
    let status = upstream.status();

    let mut headers = HeaderMap::with_capacity(upstream.headers().len());
    for (name, value) in upstream.headers() {
        headers.append(name.clone(), value.clone());
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_mirror_keeps_repeated_headers_in_order() {
        let upstream = axum::http::Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(SET_COOKIE, "a=1")
            .header(CONTENT_TYPE, "application/json")
            .header(SET_COOKIE, "b=2")
            .header(SET_COOKIE, "c=3")
            .body("{\"missing\":true}")
            .unwrap();

        let response = mirror(reqwest::Response::from(upstream));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2", "c=3"]);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{\"missing\":true}");
    }

    #[tokio::test]
    async fn test_missing_url_is_client_error() {
        let relay = RequestRelay::new(&FetchConfig::default()).unwrap();

        let response = relay.forward(None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = relay.forward(Some("")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unparseable_url_is_gateway_error() {
        let relay = RequestRelay::new(&FetchConfig::default()).unwrap();

        let response = relay.forward(Some("not a url")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_gateway_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let relay = RequestRelay::new(&FetchConfig::default()).unwrap();
        let response = relay
            .forward(Some(&format!("http://{}/schema.json", addr)))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
