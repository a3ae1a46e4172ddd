//! Tests for the interactive-flow token cache and refresh behavior.

use std::time::{SystemTime, UNIX_EPOCH};

use mockito::{Matcher, Server};
use serde_json::json;

use drive_shell::models::StoredToken;
use drive_shell::Authenticator;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Write an OAuth client secret whose token endpoint points at `token_uri`.
fn write_client_secret(dir: &tempfile::TempDir, token_uri: &str) -> std::path::PathBuf {
    let path = dir.path().join("client_secret.json");
    std::fs::write(
        &path,
        json!({
            "installed": {
                "client_id": "test-client",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": token_uri
            }
        })
        .to_string(),
    )
    .unwrap();
    path
}

fn write_token_cache(
    dir: &tempfile::TempDir,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: u64,
) -> std::path::PathBuf {
    let path = dir.path().join("token.json");
    std::fs::write(
        &path,
        json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "expires_at": expires_at
        })
        .to_string(),
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_valid_cached_token_used_without_any_request() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let token_endpoint = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let secret = write_client_secret(&dir, &format!("{}/token", server.url()));
    let cache = write_token_cache(&dir, "cached-token", Some("refresh"), unix_now() + 3600);

    let auth = Authenticator::installed(&secret, &cache).unwrap();
    let token = auth.get_access_token().await.unwrap();

    assert_eq!(token, "cached-token");
    token_endpoint.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_refreshed_once_and_persisted() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let token_endpoint = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "old-refresh".into()),
            Matcher::UrlEncoded("client_id".into(), "test-client".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "refreshed-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let secret = write_client_secret(&dir, &format!("{}/token", server.url()));
    let cache = write_token_cache(
        &dir,
        "stale-token",
        Some("old-refresh"),
        unix_now().saturating_sub(100),
    );

    let auth = Authenticator::installed(&secret, &cache).unwrap();
    let token = auth.get_access_token().await.unwrap();
    assert_eq!(token, "refreshed-token");

    // A second call is served from memory, not another refresh.
    let token = auth.get_access_token().await.unwrap();
    assert_eq!(token, "refreshed-token");
    token_endpoint.assert_async().await;

    // The refreshed material was written back, refresh token preserved.
    let persisted: StoredToken =
        serde_json::from_str(&std::fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(persisted.access_token, "refreshed-token");
    assert_eq!(persisted.refresh_token, Some("old-refresh".to_string()));
    assert!(persisted.is_valid());
}

#[tokio::test]
async fn test_failed_refresh_reported() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let _token_endpoint = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(json!({"error": "invalid_grant"}).to_string())
        .create_async()
        .await;

    let secret = write_client_secret(&dir, &format!("{}/token", server.url()));
    let cache = write_token_cache(
        &dir,
        "stale-token",
        Some("revoked-refresh"),
        unix_now().saturating_sub(100),
    );

    let auth = Authenticator::installed(&secret, &cache).unwrap();
    let err = auth.get_access_token().await.unwrap_err();
    assert!(format!("{}", err).contains("invalid_grant"));
}
