use payloads::{MemberId, requests};
use reqwest::StatusCode;
use rust_decimal::{Decimal, dec};
use uuid::Uuid;

use test_helpers::{assert_status_code, member_details, spawn_app};

#[tokio::test]
async fn register_member_requires_login() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let body = requests::RegisterMember {
        details: member_details(0, &app.time_source),
    };
    let result = app.client.register_member(&body).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn register_and_read_member() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let details = member_details(0, &app.time_source);
    let member_id = app
        .client
        .register_member(&requests::RegisterMember {
            details: details.clone(),
        })
        .await?;

    let member = app.client.get_member(&member_id).await?;
    assert_eq!(member.member_id, member_id);
    assert_eq!(member.details.name, details.name);
    assert_eq!(member.details.national_id, details.national_id);
    assert!(member.is_active);
    // no ledger rows yet
    assert_eq!(member.wallet_balance, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn member_numbers_are_sequential() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let ids = app.register_test_members(3).await?;

    let first = app.client.get_member(&ids[0]).await?;
    let third = app.client.get_member(&ids[2]).await?;
    assert_eq!(first.member_number, "M00001");
    assert_eq!(third.member_number, "M00003");

    Ok(())
}

#[tokio::test]
async fn duplicate_national_id_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    app.register_test_member(0).await?;

    // same national id, different name
    let mut details = member_details(0, &app.time_source);
    details.name = "Someone Else".into();
    details.phone = "+254799999999".into();
    let result = app
        .client
        .register_member(&requests::RegisterMember { details })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn invalid_phone_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let mut details = member_details(0, &app.time_source);
    details.phone = "not-a-phone".into();
    let result = app
        .client
        .register_member(&requests::RegisterMember { details })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn unknown_member_is_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let result = app.client.get_member(&MemberId(Uuid::new_v4())).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn list_members_searches_name_and_number() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let ids = app.register_test_members(3).await?;

    // substring of a fixture name, case-insensitive
    let found = app
        .client
        .list_members(&requests::ListMembers {
            search: Some("member 1".into()),
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].member_id, ids[1]);

    // by member number
    let found = app
        .client
        .list_members(&requests::ListMembers {
            search: Some("M00003".into()),
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].member_id, ids[2]);

    // no filter returns everyone
    let all = app
        .client
        .list_members(&requests::ListMembers {
            search: None,
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(all.len(), 3);

    Ok(())
}

#[tokio::test]
async fn update_member_details_and_status() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;

    let mut details = member_details(0, &app.time_source);
    details.name = "Renamed Member".into();
    let updated = app
        .client
        .update_member(&requests::UpdateMember {
            member_id,
            details,
            is_active: false,
        })
        .await?;
    assert_eq!(updated.details.name, "Renamed Member");
    assert!(!updated.is_active);

    // deactivation persists
    let member = app.client.get_member(&member_id).await?;
    assert!(!member.is_active);

    Ok(())
}

#[tokio::test]
async fn residences_create_and_list() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let residence_id = app
        .client
        .create_residence(&requests::CreateResidence {
            name: "Kilimani".into(),
        })
        .await?;
    app.client
        .create_residence(&requests::CreateResidence {
            name: "Westlands".into(),
        })
        .await?;

    let residences = app.client.list_residences().await?;
    assert_eq!(residences.len(), 2);
    assert!(
        residences
            .iter()
            .any(|r| r.residence_id == residence_id && r.name == "Kilimani")
    );

    // a member can be registered into a residence
    let mut details = member_details(0, &app.time_source);
    details.residence_id = Some(residence_id);
    let member_id = app
        .client
        .register_member(&requests::RegisterMember { details })
        .await?;
    let member = app.client.get_member(&member_id).await?;
    assert_eq!(member.details.residence_id, Some(residence_id));

    Ok(())
}

#[tokio::test]
async fn dependants_create_and_list() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;

    app.client
        .create_dependant(&requests::CreateDependant {
            member_id,
            name: "Junior".into(),
            relationship: "child".into(),
        })
        .await?;
    app.client
        .create_dependant(&requests::CreateDependant {
            member_id,
            name: "Spouse".into(),
            relationship: "spouse".into(),
        })
        .await?;

    let dependants = app
        .client
        .list_dependants(&requests::ListDependants { member_id })
        .await?;
    assert_eq!(dependants.len(), 2);
    assert!(dependants.iter().all(|d| d.member_id == member_id));

    // dependants of a nonexistent member are a 404, not an empty list
    let result = app
        .client
        .list_dependants(&requests::ListDependants {
            member_id: MemberId(Uuid::new_v4()),
        })
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn wallet_balance_is_ledger_derived_not_stored() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;
    app.fund_member_wallet(member_id, dec!(250)).await?;

    // corrupt the advisory column; the response must not change
    sqlx::query("UPDATE members SET wallet_balance = 999999 WHERE id = $1")
        .bind(member_id)
        .execute(&app.db_pool)
        .await?;

    let member = app.client.get_member(&member_id).await?;
    assert_eq!(member.wallet_balance, dec!(250));

    Ok(())
}
