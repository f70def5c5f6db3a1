//! Signature authentication integration tests.

#[cfg(test)]
mod tests {
    use checkgate_auth::freshness::format_http_date;
    use checkgate_auth::{RequestSigner, SignatureAlgorithm, SigningKey};
    use checkgate_core::CheckGateConfig;
    use chrono::{TimeDelta, Utc};
    use reqwest::{Method, StatusCode};

    use crate::{
        ED25519_KEY_ID, KEY_ID, TestServer, ed25519_signing_key, send, send_signed, signed_headers,
        signer,
    };

    const BODY: &[u8] = b"{}";
    const JSON: (&str, &str) = ("content-type", "application/json");

    async fn assert_uniform_401(response: reqwest::Response) {
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));
        assert_eq!(response.text().await.unwrap(), r#"{"error":"unauthorized"}"#);
    }

    #[tokio::test]
    async fn test_should_accept_correctly_signed_check() {
        let server = TestServer::start().await;

        let response = send_signed(&server, &signer(), Method::POST, "/checks", BODY, &[JSON]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["errors"][0]["message"], "Live checks are not supported");
    }

    #[tokio::test]
    async fn test_should_require_credentials() {
        let server = TestServer::start().await;
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());

        let response = send(&server, Method::POST, "/checks", headers, BODY).await;
        assert_uniform_401(response).await;
    }

    #[tokio::test]
    async fn test_should_require_correct_key() {
        let server = TestServer::start().await;
        let wrong = RequestSigner::new(
            KEY_ID,
            SigningKey::hmac(SignatureAlgorithm::HmacSha256, vec![0xA5; 256]),
        );

        let response = send_signed(&server, &wrong, Method::POST, "/checks", BODY, &[JSON]).await;
        assert_uniform_401(response).await;
    }

    #[tokio::test]
    async fn test_should_require_request_target_and_date_coverage() {
        let server = TestServer::start().await;

        let date_only = signer().with_headers(&["date"]);
        let response =
            send_signed(&server, &date_only, Method::POST, "/checks", BODY, &[JSON]).await;
        assert_uniform_401(response).await;

        let no_date = signer().with_headers(&["(request-target)", "digest"]);
        let response = send_signed(&server, &no_date, Method::POST, "/checks", BODY, &[JSON]).await;
        assert_uniform_401(response).await;
    }

    #[tokio::test]
    async fn test_should_require_recent_date() {
        let server = TestServer::start().await;
        let old_date = format_http_date(Utc::now() - TimeDelta::seconds(120));

        let response = send_signed(
            &server,
            &signer(),
            Method::POST,
            "/checks",
            BODY,
            &[JSON, ("date", old_date.as_str())],
        )
        .await;
        assert_uniform_401(response).await;
    }

    #[tokio::test]
    async fn test_should_require_correct_digest() {
        let server = TestServer::start().await;
        let bad_digest = format!("SHA-256={}", "A".repeat(344));

        let response = send_signed(
            &server,
            &signer(),
            Method::POST,
            "/checks",
            BODY,
            &[JSON, ("digest", bad_digest.as_str())],
        )
        .await;
        assert_uniform_401(response).await;
    }

    #[tokio::test]
    async fn test_should_require_digest_coverage_for_body() {
        let server = TestServer::start().await;
        let unbound = signer().with_headers(&["(request-target)", "date"]);

        let response = send_signed(&server, &unbound, Method::POST, "/checks", BODY, &[JSON]).await;
        assert_uniform_401(response).await;
    }

    #[tokio::test]
    async fn test_should_accept_same_fresh_request_twice() {
        let server = TestServer::start().await;
        let headers = signed_headers(&signer(), &Method::POST, "/checks", BODY, &[JSON]);

        let first = send(&server, Method::POST, "/checks", headers.clone(), BODY).await;
        let second = send(&server, Method::POST, "/checks", headers, BODY).await;

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_reject_replay_after_window() {
        let server = TestServer::start().await;
        let headers = signed_headers(&signer(), &Method::POST, "/checks", BODY, &[JSON]);

        let fresh = send(&server, Method::POST, "/checks", headers.clone(), BODY).await;
        assert_eq!(fresh.status(), StatusCode::OK);

        server.clock.advance(120);
        let replay = send(&server, Method::POST, "/checks", headers, BODY).await;
        assert_uniform_401(replay).await;
    }

    #[tokio::test]
    async fn test_should_reject_signature_replayed_to_other_route() {
        let server = TestServer::start().await;
        let headers = signed_headers(&signer(), &Method::GET, "/config", b"", &[]);

        let response = send(&server, Method::POST, "/checks", headers, b"").await;
        assert_uniform_401(response).await;
    }

    #[tokio::test]
    async fn test_should_accept_ed25519_signed_request() {
        let server = TestServer::start().await;
        let ed = RequestSigner::new(ED25519_KEY_ID, SigningKey::ed25519(ed25519_signing_key()));

        let response = send_signed(&server, &ed, Method::GET, "/config", b"", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_enforce_digest_on_bodyless_request_when_always() {
        let config = CheckGateConfig {
            digest_always: true,
            ..CheckGateConfig::default()
        };
        let server = TestServer::start_with(config).await;

        let response = send_signed(&server, &signer(), Method::GET, "/config", b"", &[]).await;
        assert_uniform_401(response).await;
    }
}
