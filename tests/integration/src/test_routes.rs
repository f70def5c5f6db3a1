//! Routing and transport integration tests.

#[cfg(test)]
mod tests {
    use checkgate_core::CheckGateConfig;
    use reqwest::{Method, StatusCode};

    use crate::{TestServer, send_signed, signer};

    #[tokio::test]
    async fn test_should_serve_open_routes_without_signature() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();

        let index = client.get(server.url("/")).send().await.unwrap();
        assert_eq!(index.status(), StatusCode::OK);
        let metadata: serde_json::Value = index.json().await.unwrap();
        assert_eq!(metadata["provider_name"], "CheckGate");

        let health = client.get(server.url("/health")).send().await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        let body: serde_json::Value = health.json().await.unwrap();
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn test_should_add_request_id_and_server_headers() {
        let server = TestServer::start().await;
        let response = reqwest::get(server.url("/config")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["server"], "CheckGate");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_should_answer_404_and_405() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();

        let missing = client.get(server.url("/nope")).send().await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let wrong = client.get(server.url("/checks")).send().await.unwrap();
        assert_eq!(wrong.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(wrong.headers()["allow"], "POST");
    }

    #[tokio::test]
    async fn test_should_reject_oversized_body() {
        let config = CheckGateConfig {
            max_body_bytes: 16,
            ..CheckGateConfig::default()
        };
        let server = TestServer::start_with(config).await;

        let body: &'static [u8] = br#"{"padding": "well over sixteen bytes"}"#;
        let response = send_signed(&server, &signer(), Method::POST, "/checks", body, &[]).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_should_return_400_for_signed_non_json_body() {
        let server = TestServer::start().await;
        let response =
            send_signed(&server, &signer(), Method::POST, "/checks", b"not json", &[]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
