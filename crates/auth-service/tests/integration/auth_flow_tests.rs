//! Registration, login and principal resolution over HTTP.

use auth_service::models::{CurrentUserResponse, OrganizationResponse, Role, UserStatus};
use auth_test_utils::{
    test_hmac_signer, TestAuthServer, TestTokenBuilder, TokenAssertions, TokenType, TEST_EMAIL,
    TEST_ORG_NAME, TEST_PASSWORD,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn error_code(body: &Value) -> Option<&str> {
    body.pointer("/error/code").and_then(Value::as_str)
}

fn error_message(body: &Value) -> Option<&str> {
    body.pointer("/error/message").and_then(Value::as_str)
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_returns_principal_and_tokens() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    assert_eq!(registered.organization.name, "Acme");
    assert_eq!(registered.organization.slug, "acme");
    assert_eq!(registered.principal.role, Role::Admin);
    assert_eq!(registered.principal.org_id, registered.organization.id);
    assert_eq!(registered.tokens.token_type, "Bearer");

    registered
        .tokens
        .access_token
        .assert_valid_jwt()
        .assert_token_type(TokenType::Access)
        .assert_for_subject(&registered.principal.user_id.to_string())
        .assert_expires_in(1800);
    registered
        .tokens
        .refresh_token
        .assert_valid_jwt()
        .assert_token_type(TokenType::Refresh)
        .assert_expires_in(7 * 86400);

    Ok(())
}

#[tokio::test]
async fn test_register_existing_organization_conflicts() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let response = server
        .post_auth(
            "register",
            &json!({
                "organization_name": "ACME",
                "first_name": "Other",
                "last_name": "Person",
                "email": "other@acme.com",
                "password": TEST_PASSWORD,
            }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await?;
    assert_eq!(error_code(&body), Some("CONFLICT"));

    assert_eq!(server.users().organization_count().await, 1);
    assert_eq!(server.users().user_count().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_register_existing_email_conflicts() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let result = server.register("Globex", "A@ACME.COM", TEST_PASSWORD).await;

    assert!(result.is_err(), "Duplicate email must not register");
    assert_eq!(server.users().organization_count().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_register_validation_errors() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let cases = [
        json!({
            "organization_name": "Acme",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "not-an-email",
            "password": TEST_PASSWORD,
        }),
        json!({
            "organization_name": "A",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": TEST_EMAIL,
            "password": TEST_PASSWORD,
        }),
        json!({
            "organization_name": "Acme",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": TEST_EMAIL,
            "password": "pw",
        }),
    ];

    for case in &cases {
        let response = server.post_auth("register", case).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "case: {case}");
        let body: Value = response.json().await?;
        assert_eq!(error_code(&body), Some("VALIDATION_ERROR"));
    }
    assert_eq!(server.users().organization_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_missing_fields_use_error_envelope() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    for endpoint in ["register", "login", "refresh"] {
        let response = server.post_auth(endpoint, &json!({})).await?;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "endpoint: {endpoint}"
        );
        let body: Value = response.json().await?;
        assert_eq!(error_code(&body), Some("VALIDATION_ERROR"));
    }

    let logout = server.post_auth("logout", &json!({})).await?;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    Ok(())
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_success() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let tokens = server.login_tokens("A@Acme.com", TEST_PASSWORD).await?;

    tokens
        .access_token
        .assert_valid_jwt()
        .assert_for_subject(&registered.principal.user_id.to_string());
    assert_eq!(tokens.expires_in, 1800);

    Ok(())
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let wrong_password = server.login(TEST_EMAIL, "wrong-password").await?;
    let unknown_email = server.login("nobody@acme.com", TEST_PASSWORD).await?;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        wrong_password
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );

    let wrong_body: Value = wrong_password.json().await?;
    let unknown_body: Value = unknown_email.json().await?;
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(error_message(&wrong_body), Some("Invalid email or password"));

    Ok(())
}

#[tokio::test]
async fn test_login_inactive_user_forbidden() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;
    server
        .users()
        .set_user_status(registered.principal.user_id, UserStatus::Inactive)
        .await;

    let response = server.login(TEST_EMAIL, TEST_PASSWORD).await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await?;
    assert_eq!(error_code(&body), Some("ACCOUNT_INACTIVE"));

    Ok(())
}

// ============================================================================
// Current principal
// ============================================================================

#[tokio::test]
async fn test_me_returns_principal_and_profile() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;
    let tokens = server.login_tokens(TEST_EMAIL, TEST_PASSWORD).await?;

    let response = server.get_with_token("me", &tokens.access_token).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let me: CurrentUserResponse = response.json().await?;
    assert_eq!(me.principal.user_id, registered.principal.user_id);
    assert_eq!(me.principal.org_id, registered.principal.org_id);
    assert_eq!(me.user.email, TEST_EMAIL);
    assert_eq!(me.user.role, Role::Admin);
    assert!(me.user.last_login.is_some());

    Ok(())
}

#[tokio::test]
async fn test_organization_endpoint() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register("Acme Recruiting", TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let response = server
        .get_with_token("organization", &registered.tokens.access_token)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let org: OrganizationResponse = response.json().await?;
    assert_eq!(org.id, registered.organization.id);
    assert_eq!(org.slug, "acme-recruiting");

    Ok(())
}

#[tokio::test]
async fn test_deactivated_user_loses_profile_access() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;
    let access_token = &registered.tokens.access_token;

    server
        .users()
        .set_user_status(registered.principal.user_id, UserStatus::Inactive)
        .await;

    for endpoint in ["me", "organization"] {
        let response = server.get_with_token(endpoint, access_token).await?;
        assert_eq!(
            response.status(),
            StatusCode::FORBIDDEN,
            "endpoint: {endpoint}"
        );
        let body: Value = response.json().await?;
        assert_eq!(error_code(&body), Some("ACCOUNT_INACTIVE"));
    }

    Ok(())
}

#[tokio::test]
async fn test_me_rejects_missing_and_malformed_tokens() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let missing = server
        .client()
        .get(format!("{}/api/v1/auth/me", server.url()))
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = server.get_with_token("me", "not.a.jwt").await?;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    let body: Value = garbage.json().await?;
    assert_eq!(error_code(&body), Some("INVALID_TOKEN"));
    assert_eq!(
        error_message(&body),
        Some("The token is invalid or expired")
    );

    Ok(())
}

#[tokio::test]
async fn test_me_rejects_expired_access_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let expired = TestTokenBuilder::new()
        .for_user(registered.principal.user_id)
        .in_org(registered.principal.org_id)
        .issued_at(chrono::Utc::now().timestamp() - 3600)
        .expires_in(-1)
        .sign(&test_hmac_signer());

    let response = server.get_with_token("me", &expired).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_me_rejects_refresh_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;

    let response = server
        .get_with_token("me", &registered.tokens.refresh_token)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_eddsa_signing_end_to_end() -> Result<(), anyhow::Error> {
    let pkcs8 = auth_test_utils::test_ed25519_pkcs8_base64(7)?;
    let server = TestAuthServer::spawn_with(&[
        ("JWT_SIGNING_ALGORITHM", "EdDSA"),
        ("JWT_SIGNING_KEY_PKCS8", &pkcs8),
    ])
    .await?;

    let registered = server
        .register(TEST_ORG_NAME, TEST_EMAIL, TEST_PASSWORD)
        .await?;
    let response = server
        .get_with_token("me", &registered.tokens.access_token)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // A token signed with the HS256 fixture key must not pass
    let forged = TestTokenBuilder::new()
        .for_user(registered.principal.user_id)
        .in_org(registered.principal.org_id)
        .sign(&test_hmac_signer());
    let response = server.get_with_token("me", &forged).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
