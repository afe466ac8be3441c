//! HTTP integration tests: the in-memory jar backs a real `reqwest::Client`
//! while the session manager inspects and expires what the server set.

mod support;

use std::sync::Arc;

use reqwest::header::COOKIE;
use spcookie_core::{CookieSessionManager, MemoryCookieJar};
use support::socket_guard::start_mock_server_or_skip;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn client_with_jar(jar: Arc<MemoryCookieJar>) -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_provider(jar)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_server_cookies_are_visible_to_manager() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "FedAuth=server-token; Path=/; HttpOnly")
                .append_header("Set-Cookie", "rtFa=refresh; Path=/"),
        )
        .mount(&server)
        .await;

    let jar = Arc::new(MemoryCookieJar::new());
    let client = client_with_jar(jar.clone());
    client
        .get(format!("{}/login", server.uri()))
        .send()
        .await
        .unwrap();

    let manager = CookieSessionManager::new(jar);
    let cookies = manager.get(&server.uri()).await.unwrap();
    assert_eq!(cookies["FedAuth"], "server-token");
    assert_eq!(cookies["rtFa"], "refresh");
}

#[tokio::test]
async fn test_manager_set_cookie_is_sent_by_client() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/web"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let jar = Arc::new(MemoryCookieJar::new());
    let manager = CookieSessionManager::new(jar.clone());
    manager
        .set(&server.uri(), "FedAuth=from-manager; Path=/")
        .await
        .unwrap();

    let client = client_with_jar(jar);
    client
        .get(format!("{}/api/web", server.uri()))
        .send()
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let cookie = requests[0].headers.get(COOKIE).unwrap().to_str().unwrap();
    assert_eq!(cookie, "FedAuth=from-manager");
}

#[tokio::test]
async fn test_remove_by_host_stops_cookies_being_sent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "FedAuth=server-token; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/after"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let jar = Arc::new(MemoryCookieJar::new());
    let client = client_with_jar(jar.clone());
    let manager = CookieSessionManager::new(jar);

    client
        .get(format!("{}/login", server.uri()))
        .send()
        .await
        .unwrap();

    let address = server.address();
    let had_cookies = manager
        .remove_by_host(&format!("{}:{}", address.ip(), address.port()))
        .await
        .unwrap();
    assert!(had_cookies);

    client
        .get(format!("{}/after", server.uri()))
        .send()
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let after = requests
        .iter()
        .find(|request| request.url.path() == "/after")
        .unwrap();
    assert!(after.headers.get(COOKIE).is_none());
}
