//! Common test utilities
//!
//! This module provides shared test helpers and fixtures for all integration tests.

#![allow(dead_code)]

pub mod chrome;

use chaser_pilot::config::Config;
use serde_json::Value;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

/// Configuration pointing at a wiremock discovery endpoint, with fast backoff
pub fn config_for(http: &MockServer) -> Config {
    let addr = http.address();
    let mut config = Config {
        host: addr.ip().to_string(),
        port: addr.port(),
        backoff_base_ms: 10,
        ..Config::default()
    };
    config.timeouts.default_secs = 5;
    config.timeouts.execution_secs = 5;
    config.timeouts.navigation_secs = 5;
    config.timeouts.screenshot_secs = 5;
    config
}

/// Serve `targets` from `/json`
pub async fn mount_targets(http: &MockServer, targets: Value) {
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(targets))
        .mount(http)
        .await;
}

/// `data:` URL for an inline HTML document
pub fn data_url(html: &str) -> String {
    "data:text/html;charset=utf-8,".to_string() + &urlencoding::encode(html)
}

/// Get test HTML content
pub fn get_test_html() -> String {
    r#"
<!DOCTYPE html>
<html>
<head>
    <title>Test Page</title>
</head>
<body>
    <h1 id="title">Hello World</h1>
    <button id="click-me" onclick="document.title = 'clicked'">Click Me</button>
    <label for="text-input">Search</label>
    <input id="text-input" type="text" />
    <div aria-hidden="true"><button>Invisible</button></div>
    <a href="/docs">Documentation</a>
</body>
</html>
    "#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_is_encoded() {
        let url = data_url("<p>a b</p>");
        assert!(url.starts_with("data:text/html;charset=utf-8,"));
        assert!(!url.contains(' '));
        assert!(url.contains("%3Cp%3E"));
    }

    #[tokio::test]
    async fn test_config_targets_mock_server() {
        let http = MockServer::start().await;
        let config = config_for(&http);
        assert_eq!(config.endpoint(), http.uri());
    }
}
