//! Integration tests for `/proxy-schema` and the page at `/`

use axum::http::{header::SET_COOKIE, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::get;
use axum::Router;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use toolshop_relay::{AppState, Config, RelayServer};

async fn start_relay(config: Config) -> SocketAddr {
    let state = AppState::from_config(&config).unwrap();
    let server = RelayServer::new("127.0.0.1:0".parse().unwrap(), state);
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(server.serve(listener, std::future::pending()));
    addr
}

/// Upstream answering `/schema.json` with a 404 carrying two cookies
async fn start_upstream(hits: Arc<AtomicUsize>) -> SocketAddr {
    let app = Router::new().route(
        "/schema.json",
        get(move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::NOT_FOUND,
                    AppendHeaders([
                        (SET_COOKIE, "first=1; Path=/"),
                        (SET_COOKIE, "second=2; Path=/"),
                    ]),
                    "no schema here\n",
                )
                    .into_response()
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

fn proxy_url(relay: SocketAddr, target: &str) -> reqwest::Url {
    reqwest::Url::parse_with_params(&format!("http://{}/proxy-schema", relay), &[("url", target)])
        .unwrap()
}

#[tokio::test]
async fn test_upstream_response_mirrored_verbatim() {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = start_upstream(hits.clone()).await;
    let relay = start_relay(Config::default()).await;

    let response = reqwest::get(proxy_url(relay, &format!("http://{}/schema.json", upstream)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let cookies: Vec<_> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies, vec!["first=1; Path=/", "second=2; Path=/"]);
    assert_eq!(response.text().await.unwrap(), "no schema here\n");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_url_makes_no_upstream_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let _upstream = start_upstream(hits.clone()).await;
    let relay = start_relay(Config::default()).await;

    let response = reqwest::get(format!("http://{}/proxy-schema", relay))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("url"));

    let response = reqwest::get(format!("http://{}/proxy-schema?url=", relay))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let relay = start_relay(Config::default()).await;

    let response = reqwest::get(proxy_url(relay, &format!("http://{}/schema.json", closed)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_override_page_served_at_root() {
    let mut page = tempfile::NamedTempFile::new().unwrap();
    page.write_all(b"<h1>local copy</h1>").unwrap();

    let mut config = Config::default();
    config.assets.override_path = Some(page.path().to_path_buf());
    let relay = start_relay(config).await;

    let response = reqwest::get(format!("http://{}/", relay)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(response.text().await.unwrap(), "<h1>local copy</h1>");
}

#[tokio::test]
async fn test_embedded_page_and_unknown_paths() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.assets.override_path = Some(dir.path().join("missing.html"));
    let relay = start_relay(config).await;

    let response = reqwest::get(format!("http://{}/", relay)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.bytes().await.unwrap().as_ref(),
        toolshop_relay::assets::EMBEDDED_PAGE
    );

    let response = reqwest::get(format!("http://{}/toolshop.html", relay))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "404 page not found");
}
