//! Refresh token rotation, replay rejection and logout.

use auth_service::models::{TokenResponse, UserStatus};
use auth_test_utils::{
    test_hmac_signer, TestAuthServer, TestTokenBuilder, TEST_EMAIL, TEST_ORG_NAME, TEST_PASSWORD,
};
use reqwest::StatusCode;

#[tokio::test]
async fn test_register_login_refresh_replay_scenario() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let t1 = server.login_tokens(TEST_EMAIL, TEST_PASSWORD).await?;

    let first = server.refresh(&t1.refresh_token).await?;
    assert_eq!(first.status(), StatusCode::OK);
    let t2: TokenResponse = first.json().await?;
    assert_ne!(t2.refresh_token, t1.refresh_token);

    let replay = server.refresh(&t1.refresh_token).await?;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    // The rotated token keeps working
    let next = server.refresh(&t2.refresh_token).await?;
    assert_eq!(next.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_refresh_exactly_one_success() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;
    let refresh_token = registered.tokens.refresh_token;

    let attempts = (0..8).map(|_| server.refresh(&refresh_token));
    let responses = futures::future::join_all(attempts).await;

    let mut ok = 0;
    let mut unauthorized = 0;
    for response in responses {
        match response?.status() {
            StatusCode::OK => ok += 1,
            StatusCode::UNAUTHORIZED => unauthorized += 1,
            other => anyhow::bail!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 1, "exactly one concurrent refresh may succeed");
    assert_eq!(unauthorized, 7);

    Ok(())
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let logout = server.logout(&registered.tokens.refresh_token).await?;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let refresh = server.refresh(&registered.tokens.refresh_token).await?;
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);

    // Access tokens are not revoked by logout
    let me = server
        .get_with_token("me", &registered.tokens.access_token)
        .await?;
    assert_eq!(me.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_logout_is_idempotent() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    for _ in 0..2 {
        let response = server.logout(&registered.tokens.refresh_token).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let garbage = server.logout("garbage-token").await?;
    assert_eq!(garbage.status(), StatusCode::NO_CONTENT);

    assert_eq!(server.revocations().len().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_refresh_rejects_access_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let response = server.refresh(&registered.tokens.access_token).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The rejected attempt must not burn the real refresh token
    let response = server.refresh(&registered.tokens.refresh_token).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_refresh_rejects_expired_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let expired = TestTokenBuilder::new()
        .for_user(registered.principal.user_id)
        .in_org(registered.principal.org_id)
        .refresh()
        .issued_at(chrono::Utc::now().timestamp() - 7200)
        .expires_in(-60)
        .sign(&test_hmac_signer());

    let response = server.refresh(&expired).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_refresh_rejected_after_deactivation() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    server
        .users()
        .set_user_status(registered.principal.user_id, UserStatus::Inactive)
        .await;

    let response = server.refresh(&registered.tokens.refresh_token).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_short_access_ttl_is_reported() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn_with(&[("ACCESS_TOKEN_TTL_SECONDS", "120")]).await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    assert_eq!(registered.tokens.expires_in, 120);

    let response = server.refresh(&registered.tokens.refresh_token).await?;
    let rotated: TokenResponse = response.json().await?;
    assert_eq!(rotated.expires_in, 120);

    Ok(())
}
