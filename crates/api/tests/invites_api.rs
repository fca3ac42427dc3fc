//! HTTP-level tests for workspace invites: issuing, viewing, accepting,
//! declining, expiring and cancelling.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, delete_with_cookie, get, get_with_cookie, location, post_form};
use nvoi_core::invites::InviteRole;
use nvoi_db::models::invite::{CreateInvite, WorkspaceInvite};
use nvoi_db::models::user::User;
use nvoi_db::models::workspace::Workspace;
use nvoi_db::repositories::{InviteRepo, WorkspaceRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn workspace_of(pool: &PgPool, user: &User) -> Workspace {
    WorkspaceRepo::first_for_user(pool, user.id)
        .await
        .unwrap()
        .expect("user should have a workspace")
}

/// Issue an invite through the API and return the stored row.
async fn invite_via_api(
    app: axum::Router,
    pool: &PgPool,
    owner: &User,
    email: &str,
    role: &str,
) -> WorkspaceInvite {
    let cookie = common::session_cookie_for(owner);
    let response = post_form(
        app,
        "/app/workspace/invites",
        &[("email", email), ("role", role)],
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);

    let workspace = workspace_of(pool, owner).await;
    InviteRepo::find_pending_for_email(pool, workspace.id, &email.to_lowercase())
        .await
        .unwrap()
        .expect("invite should be pending")
}

// ---------------------------------------------------------------------------
// Issuing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_and_list_invites(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", Some("Olive")).await;
    let cookie = common::session_cookie_for(&owner);
    let app = common::build_test_app(pool.clone());

    let invite = invite_via_api(app.clone(), &pool, &owner, "New.Member@Example.com", "admin").await;
    assert_eq!(invite.email, "new.member@example.com");
    assert_eq!(invite.role, "admin");
    assert_eq!(invite.status, "pending");
    assert_eq!(invite.invited_by_user_id, owner.id);
    assert!(invite.user_id.is_none());
    assert!(invite.expires_at > Utc::now() + Duration::days(6));

    let response = get_with_cookie(app, "/app/workspace/invites", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["workspace"]["label"], "Olive's Workspace");
    assert_eq!(json["invites"].as_array().unwrap().len(), 1);
    assert_eq!(json["invites"][0]["email"], "new.member@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invite_links_existing_account(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", None).await;
    let existing = common::create_user(&pool, "known@example.com", None).await;
    let app = common::build_test_app(pool.clone());

    let invite = invite_via_api(app, &pool, &owner, "known@example.com", "member").await;
    assert_eq!(invite.user_id, Some(existing.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_invite_rejects_bad_input(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", None).await;
    let cookie = common::session_cookie_for(&owner);
    let app = common::build_test_app(pool.clone());

    invite_via_api(app.clone(), &pool, &owner, "dup@example.com", "member").await;

    let cases: [(&[(&str, &str)], &str); 4] = [
        (&[("email", "dup@example.com"), ("role", "member")], "Invite already pending for this email"),
        (&[("email", "x@example.com")], "Email and role are required"),
        (&[("email", "x@example.com"), ("role", "owner")], "Role must be member or admin"),
        (&[("email", "not-an-email"), ("role", "member")], "A valid email address is required"),
    ];
    for (fields, expected) in cases {
        let response = post_form(app.clone(), "/app/workspace/invites", fields, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{expected}");
        let json = body_json(response).await;
        assert_eq!(json["error"], expected);
    }
}

// ---------------------------------------------------------------------------
// Viewing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_view_invite_by_token(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", Some("Olive")).await;
    let app = common::build_test_app(pool.clone());
    let invite = invite_via_api(app.clone(), &pool, &owner, "guest@example.com", "member").await;

    let response = get(app.clone(), &format!("/invite/{}", invite.token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["invite"]["email"], "guest@example.com");
    assert_eq!(json["workspace"]["label"], "Olive's Workspace");
    assert!(json["user"].is_null());

    let response = get(app, "/invite/no-such-token").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invite not found");
}

// ---------------------------------------------------------------------------
// Accepting and declining
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_accept_joins_workspace(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", None).await;
    let app = common::build_test_app(pool.clone());
    let invite = invite_via_api(app.clone(), &pool, &owner, "bob@example.com", "admin").await;

    let bob = common::create_user(&pool, "bob@example.com", None).await;
    let cookie = common::session_cookie_for(&bob);
    let response = post_form(
        app,
        &format!("/invite/{}", invite.token),
        &[("action", "accept")],
        Some(&cookie),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/app");

    assert!(WorkspaceRepo::is_member(&pool, invite.workspace_id, bob.id).await.unwrap());
    let invite = InviteRepo::find_by_id(&pool, invite.id).await.unwrap().unwrap();
    assert_eq!(invite.status, "accepted");
    assert_eq!(invite.user_id, Some(bob.id));
    assert!(invite.accepted_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_accept_requires_matching_email(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", None).await;
    let app = common::build_test_app(pool.clone());
    let invite = invite_via_api(app.clone(), &pool, &owner, "bob@example.com", "member").await;

    let carol = common::create_user(&pool, "carol@example.com", None).await;
    let cookie = common::session_cookie_for(&carol);
    let response = post_form(
        app,
        &format!("/invite/{}", invite.token),
        &[("action", "accept")],
        Some(&cookie),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "This invite was sent to a different email address");
    assert!(!WorkspaceRepo::is_member(&pool, invite.workspace_id, carol.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_anonymous_response_redirects_to_register(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", None).await;
    let app = common::build_test_app(pool.clone());
    let invite = invite_via_api(app.clone(), &pool, &owner, "later@example.com", "member").await;

    let response = post_form(
        app,
        &format!("/invite/{}", invite.token),
        &[("action", "accept")],
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("/auth/register?invite={}", invite.token)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_accepting_expired_invite_marks_it_expired(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", None).await;
    let late = common::create_user(&pool, "late@example.com", None).await;
    let workspace = workspace_of(&pool, &owner).await;
    let invite = InviteRepo::create(
        &pool,
        &CreateInvite {
            workspace_id: workspace.id,
            email: "late@example.com".to_string(),
            user_id: Some(late.id),
            invited_by_user_id: owner.id,
            token: "expired-token".to_string(),
            role: InviteRole::Member,
            expires_at: Utc::now() - Duration::hours(1),
        },
    )
    .await
    .unwrap();
    let app = common::build_test_app(pool.clone());

    let cookie = common::session_cookie_for(&late);
    let response = post_form(
        app,
        "/invite/expired-token",
        &[("action", "accept")],
        Some(&cookie),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invite has expired");

    let invite = InviteRepo::find_by_id(&pool, invite.id).await.unwrap().unwrap();
    assert_eq!(invite.status, "expired");
    assert!(!WorkspaceRepo::is_member(&pool, workspace.id, late.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_decline_only_once(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", None).await;
    let app = common::build_test_app(pool.clone());
    let invite = invite_via_api(app.clone(), &pool, &owner, "nope@example.com", "member").await;

    let nope = common::create_user(&pool, "nope@example.com", None).await;
    let cookie = common::session_cookie_for(&nope);
    let uri = format!("/invite/{}", invite.token);

    let response = post_form(app.clone(), &uri, &[("action", "decline")], Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let stored = InviteRepo::find_by_id(&pool, invite.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "declined");

    let response = post_form(app.clone(), &uri, &[("action", "decline")], Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invite is no longer pending");

    // A declined invite cannot be accepted afterwards either.
    let response = post_form(app, &uri, &[("action", "accept")], Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Cancelling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancel_invite_is_scoped_to_own_workspace(pool: PgPool) {
    let owner = common::create_user(&pool, "owner@example.com", None).await;
    let stranger = common::create_user(&pool, "stranger@example.com", None).await;
    let app = common::build_test_app(pool.clone());
    let invite = invite_via_api(app.clone(), &pool, &owner, "temp@example.com", "member").await;
    let uri = format!("/app/workspace/invites/{}", invite.id);

    let response = delete_with_cookie(app.clone(), &uri, &common::session_cookie_for(&stranger)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let owner_cookie = common::session_cookie_for(&owner);
    let response = delete_with_cookie(app.clone(), &uri, &owner_cookie).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(InviteRepo::find_by_id(&pool, invite.id).await.unwrap().is_none());

    let response = delete_with_cookie(app, &uri, &owner_cookie).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
