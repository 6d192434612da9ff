use payloads::requests;
use reqwest::StatusCode;

use test_helpers::{
    assert_status_code, clerk_details, spawn_app, to_login_credentials,
};

#[tokio::test]
async fn login_refused() -> anyhow::Result<()> {
    let app = spawn_app().await;

    // test a login with an invalid user
    let body = requests::LoginCredentials {
        username: "random".into(),
        password: "random".into(),
    };
    let result = app.client.login(&body).await;

    match result {
        Err(payloads::ClientError::APIError(code, text)) => {
            assert_eq!(code, StatusCode::UNAUTHORIZED);
            assert_eq!(text, "Authentication failed: Invalid credentials");
        }
        _ => {
            panic!("Expected APIError");
        }
    }

    // login check should fail
    let is_logged_in = app.client.login_check().await?;
    assert!(!is_logged_in);

    Ok(())
}

#[tokio::test]
async fn first_user_bootstraps_without_session() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.create_admin_user().await?;

    // check for valid session
    let is_logged_in = app.client.login_check().await?;
    assert!(is_logged_in);

    let profile = app.client.user_profile().await?;
    assert_eq!(profile.username, "alice_admin");
    assert_eq!(profile.role, payloads::Role::Admin);

    Ok(())
}

#[tokio::test]
async fn second_user_requires_admin_session() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.create_admin_user().await?;
    app.client.logout().await?;

    // no session at all
    let result = app.client.create_user(&clerk_details()).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    app.login_admin().await?;
    app.create_clerk_user().await?;

    // a clerk session cannot add users either
    app.login_clerk().await?;
    let another = requests::CreateUser {
        username: "dave_clerk".into(),
        password: "davespw".into(),
        role: payloads::Role::Clerk,
    };
    let result = app.client.create_user(&another).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn invalid_username_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let mut body = requests::CreateUser {
        username: (0..52).map(|_| "X").collect::<String>(),
        password: "a-password".into(),
        role: payloads::Role::Admin,
    };
    let result = app.client.create_user(&body).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    body.username = "7starts_with_digit".into();
    let result = app.client.create_user(&body).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn duplicate_username_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.create_admin_user().await?;

    let duplicate = requests::CreateUser {
        username: "alice_admin".into(),
        password: "other-password".into(),
        role: payloads::Role::Clerk,
    };
    let result = app.client.create_user(&duplicate).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn clerk_session_reports_clerk_role() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.create_users().await?;
    app.login_clerk().await?;

    let profile = app.client.user_profile().await?;
    assert_eq!(profile.username, clerk_details().username);
    assert_eq!(profile.role, payloads::Role::Clerk);

    // and the clerk can log back in with their own credentials
    app.client.logout().await?;
    app.client
        .login(&to_login_credentials(&clerk_details()))
        .await?;

    Ok(())
}
