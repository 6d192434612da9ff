use payloads::{AccountKind, requests};
use reqwest::StatusCode;
use rust_decimal::dec;

use test_helpers::{assert_status_code, fresh_key, spawn_app};

async fn renewal_row_count(pool: &sqlx::PgPool) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE transaction_type = 'renewal'",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}

#[tokio::test]
async fn collect_fee_is_idempotent_per_key() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;
    let key = fresh_key();

    let body = requests::CollectFee {
        member_id,
        fee_type: AccountKind::Registration,
        amount: None,
        idempotency_key: key,
    };
    let first = app.client.collect_fee(&body).await?;
    // a retry returns the original transaction, not a second charge
    let second = app.client.collect_fee(&body).await?;
    assert_eq!(first.transaction_id, second.transaction_id);

    let balance = app.client.get_wallet_balance(&member_id).await?;
    assert_eq!(balance.balance, dec!(-500));

    Ok(())
}

#[tokio::test]
async fn registration_fee_reactivates_lapsed_member() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;
    let details = test_helpers::member_details(0, &app.time_source);
    app.client
        .update_member(&requests::UpdateMember {
            member_id,
            details,
            is_active: false,
        })
        .await?;

    app.client
        .collect_fee(&requests::CollectFee {
            member_id,
            fee_type: AccountKind::Penalty,
            amount: None,
            idempotency_key: fresh_key(),
        })
        .await?;

    let member = app.client.get_member(&member_id).await?;
    assert!(member.is_active);

    Ok(())
}

#[tokio::test]
async fn arrears_require_an_explicit_amount() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;
    let result = app
        .client
        .collect_fee(&requests::CollectFee {
            member_id,
            fee_type: AccountKind::Arrears,
            amount: None,
            idempotency_key: fresh_key(),
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // with an amount the payment goes through as a debit
    let tx = app
        .client
        .collect_fee(&requests::CollectFee {
            member_id,
            fee_type: AccountKind::Arrears,
            amount: Some(dec!(120)),
            idempotency_key: fresh_key(),
        })
        .await?;
    assert_eq!(tx.amount, dec!(-120));

    Ok(())
}

#[tokio::test]
async fn renewal_run_charges_every_member_once() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    app.register_test_members(3).await?;
    let key = fresh_key();

    let body = requests::CollectRenewalFees {
        amount: None,
        idempotency_key: key,
    };
    let result = app.client.collect_renewal_fees(&body).await?;
    assert_eq!(result.members_charged, 3);
    assert_eq!(result.total_amount, dec!(900));
    assert_eq!(renewal_row_count(&app.db_pool).await?, 3);

    // replaying the same key reports the original run without new rows
    let replay = app.client.collect_renewal_fees(&body).await?;
    assert_eq!(replay.members_charged, 3);
    assert_eq!(replay.total_amount, dec!(900));
    assert_eq!(renewal_row_count(&app.db_pool).await?, 3);

    Ok(())
}

#[tokio::test]
async fn fresh_key_runs_the_renewal_again() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let ids = app.register_test_members(2).await?;

    app.client
        .collect_renewal_fees(&requests::CollectRenewalFees {
            amount: Some(dec!(300)),
            idempotency_key: fresh_key(),
        })
        .await?;
    app.client
        .collect_renewal_fees(&requests::CollectRenewalFees {
            amount: Some(dec!(300)),
            idempotency_key: fresh_key(),
        })
        .await?;

    // two distinct runs double-charge, by design
    assert_eq!(renewal_row_count(&app.db_pool).await?, 4);
    let balance = app.client.get_wallet_balance(&ids[0]).await?;
    assert_eq!(balance.balance, dec!(-600));

    Ok(())
}

#[tokio::test]
async fn renewal_run_is_admin_only() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;
    app.register_test_members(1).await?;

    app.login_clerk().await?;
    let result = app
        .client
        .collect_renewal_fees(&requests::CollectRenewalFees {
            amount: None,
            idempotency_key: fresh_key(),
        })
        .await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);
    assert_eq!(renewal_row_count(&app.db_pool).await?, 0);

    Ok(())
}

#[tokio::test]
async fn transfer_moves_funds_between_wallets() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let ids = app.register_test_members(2).await?;
    app.fund_member_wallet(ids[0], dec!(500)).await?;

    let key = fresh_key();
    let body = requests::CreateTransfer {
        from_member_id: ids[0],
        to_member_id: ids[1],
        amount: dec!(200),
        note: None,
        idempotency_key: key,
    };
    app.client.create_transfer(&body).await?;

    let sender = app.client.get_wallet_balance(&ids[0]).await?;
    let recipient = app.client.get_wallet_balance(&ids[1]).await?;
    assert_eq!(sender.balance, dec!(300));
    assert_eq!(recipient.balance, dec!(200));

    // a replayed key moves nothing further
    app.client.create_transfer(&body).await?;
    let sender = app.client.get_wallet_balance(&ids[0]).await?;
    assert_eq!(sender.balance, dec!(300));

    Ok(())
}

#[tokio::test]
async fn transfer_requires_covering_balance() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let ids = app.register_test_members(2).await?;
    app.fund_member_wallet(ids[0], dec!(100)).await?;

    let result = app
        .client
        .create_transfer(&requests::CreateTransfer {
            from_member_id: ids[0],
            to_member_id: ids[1],
            amount: dec!(101),
            note: None,
            idempotency_key: fresh_key(),
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // balances untouched
    let sender = app.client.get_wallet_balance(&ids[0]).await?;
    assert_eq!(sender.balance, dec!(100));

    Ok(())
}

#[tokio::test]
async fn transfer_to_self_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let ids = app.register_test_members(1).await?;
    app.fund_member_wallet(ids[0], dec!(100)).await?;

    let result = app
        .client
        .create_transfer(&requests::CreateTransfer {
            from_member_id: ids[0],
            to_member_id: ids[0],
            amount: dec!(50),
            note: None,
            idempotency_key: fresh_key(),
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn resolving_suspense_credits_the_member() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;
    let suspense_id =
        app.seed_wrong_mpesa_transaction(dec!(750), "QC33CCCC").await?;

    let key = fresh_key();
    let body = requests::ResolveSuspense {
        suspense_id,
        member_id,
        idempotency_key: key,
    };
    app.client.resolve_suspense(&body).await?;

    let balance = app.client.get_wallet_balance(&member_id).await?;
    assert_eq!(balance.balance, dec!(750));

    // replaying the same key credits nothing further
    app.client.resolve_suspense(&body).await?;
    let balance = app.client.get_wallet_balance(&member_id).await?;
    assert_eq!(balance.balance, dec!(750));

    // a fresh key finds the row already resolved
    let result = app
        .client
        .resolve_suspense(&requests::ResolveSuspense {
            suspense_id,
            member_id,
            idempotency_key: fresh_key(),
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn fund_wallet_is_idempotent_per_key() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;
    let key = fresh_key();

    let body = requests::FundWallet {
        member_id,
        amount: dec!(400),
        mpesa_reference: Some("QD44DDDD".into()),
        idempotency_key: key,
    };
    let first = app.client.fund_wallet(&body).await?;
    let second = app.client.fund_wallet(&body).await?;
    assert_eq!(first.transaction_id, second.transaction_id);

    let balance = app.client.get_wallet_balance(&member_id).await?;
    assert_eq!(balance.balance, dec!(400));

    Ok(())
}

#[tokio::test]
async fn nonpositive_amounts_rejected_everywhere() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;

    let result = app
        .client
        .fund_wallet(&requests::FundWallet {
            member_id,
            amount: dec!(0),
            mpesa_reference: None,
            idempotency_key: fresh_key(),
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    let result = app
        .client
        .collect_fee(&requests::CollectFee {
            member_id,
            fee_type: AccountKind::Penalty,
            amount: Some(dec!(-10)),
            idempotency_key: fresh_key(),
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}
