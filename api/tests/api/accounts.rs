use payloads::{AccountKind, requests, responses};
use rust_decimal::dec;

use test_helpers::{fresh_key, spawn_app};

#[tokio::test]
async fn account_view_totals_cover_whole_partition() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let ids = app.register_test_members(3).await?;
    for member_id in &ids {
        app.client
            .collect_fee(&requests::CollectFee {
                member_id: *member_id,
                fee_type: AccountKind::Registration,
                amount: None,
                idempotency_key: fresh_key(),
            })
            .await?;
        app.time_source.advance(jiff::Span::new().minutes(1));
    }

    // page of one, but the total still spans all three rows
    let view = app
        .client
        .get_account_view(&requests::GetAccountView {
            kind: AccountKind::Registration,
            limit: 1,
            offset: 0,
        })
        .await?;
    assert_eq!(view.kind, AccountKind::Registration);
    assert_eq!(view.total, dec!(-1500));
    assert_eq!(view.transactions.len(), 1);

    Ok(())
}

#[tokio::test]
async fn account_views_partition_by_type() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;
    app.client
        .collect_fee(&requests::CollectFee {
            member_id,
            fee_type: AccountKind::Registration,
            amount: None,
            idempotency_key: fresh_key(),
        })
        .await?;
    app.client
        .collect_fee(&requests::CollectFee {
            member_id,
            fee_type: AccountKind::Penalty,
            amount: Some(dec!(75)),
            idempotency_key: fresh_key(),
        })
        .await?;

    let penalties = app
        .client
        .get_account_view(&requests::GetAccountView {
            kind: AccountKind::Penalty,
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(penalties.total, dec!(-75));
    assert_eq!(penalties.transactions.len(), 1);

    // arrears partition is untouched
    let arrears = app
        .client
        .get_account_view(&requests::GetAccountView {
            kind: AccountKind::Arrears,
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(arrears.total, rust_decimal::Decimal::ZERO);
    assert!(arrears.transactions.is_empty());

    Ok(())
}

#[tokio::test]
async fn suspense_v1_lists_unresolved_wrong_mpesa_rows() -> anyhow::Result<()>
{
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;
    let first = app.seed_wrong_mpesa_transaction(dec!(400), "QA11AAAA").await?;
    app.seed_wrong_mpesa_transaction(dec!(600), "QB22BBBB").await?;

    let view = app
        .client
        .list_suspense(&requests::ListSuspense {
            classifier: payloads::SuspenseClassifier::V1,
        })
        .await?;
    let entries = match view {
        responses::SuspenseView::V1 { entries } => entries,
        other => panic!("expected a V1 view, got {other:?}"),
    };
    assert_eq!(entries.len(), 2);

    // resolving one drops it from the view
    app.client
        .resolve_suspense(&requests::ResolveSuspense {
            suspense_id: first,
            member_id,
            idempotency_key: fresh_key(),
        })
        .await?;

    let view = app
        .client
        .list_suspense(&requests::ListSuspense {
            classifier: payloads::SuspenseClassifier::V1,
        })
        .await?;
    let entries = match view {
        responses::SuspenseView::V1 { entries } => entries,
        other => panic!("expected a V1 view, got {other:?}"),
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mpesa_reference, "QB22BBBB");

    Ok(())
}

#[tokio::test]
async fn suspense_v2_flags_unattributable_descriptions() -> anyhow::Result<()>
{
    let app = spawn_app().await;
    app.create_users().await?;

    let member_id = app.register_test_member(0).await?;

    // "Wallet funding" carries no digit and no member reference, so the
    // heuristic flags it
    app.fund_member_wallet(member_id, dec!(100)).await?;
    app.time_source.advance(jiff::Span::new().minutes(1));

    // a contribution description embeds the case number, and the digit
    // rule disqualifies it
    let case_id = app
        .client
        .create_case(&requests::CreateCase {
            details: payloads::Case {
                affected_member_id: member_id,
                dependant_id: None,
                case_type: payloads::CaseType::Sickness,
                contribution_per_member: dec!(200),
                start_date: app.time_source.now(),
                end_date: app.time_source.now() + jiff::Span::new().hours(24 * 30),
            },
        })
        .await?;
    app.client.activate_case(&case_id).await?;
    app.client
        .collect_contribution(&requests::CollectContribution {
            member_id,
            case_id,
            amount: dec!(200),
            idempotency_key: fresh_key(),
        })
        .await?;

    let view = app
        .client
        .list_suspense(&requests::ListSuspense {
            classifier: payloads::SuspenseClassifier::V2,
        })
        .await?;
    let entries = match view {
        responses::SuspenseView::V2 { entries } => entries,
        other => panic!("expected a V2 view, got {other:?}"),
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].description.as_deref(), Some("Wallet funding"));

    Ok(())
}
