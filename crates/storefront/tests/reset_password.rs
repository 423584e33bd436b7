//! Password-reset lifecycle, end to end against the store.

mod common;

use chrono::{Duration, Utc};

use threadline_storefront::error::AppError;
use threadline_storefront::services::auth::{AccountService, AuthError};
use threadline_storefront::services::reset::PasswordResetFlow;
use threadline_storefront::store::Store;
use threadline_storefront::store::memory::MemoryStore;

use common::{RecordingMailer, signed_up_user, test_config};

#[tokio::test]
async fn reset_rotates_the_password() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::default();
    let config = test_config();
    signed_up_user(&store, "Flo", "flo@example.com").await;

    let flow = PasswordResetFlow::new(&store, &mailer, &config);
    flow.request_reset("flo@example.com").await.expect("request ok");

    let token = mailer.last_token();
    flow.consume_reset(&token, "a brand new password", "a brand new password")
        .await
        .expect("consume ok");

    let accounts = AccountService::new(&store);
    accounts
        .signin("flo@example.com", "a brand new password")
        .await
        .expect("new password works");
    assert!(matches!(
        accounts
            .signin("flo@example.com", "a perfectly fine password")
            .await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn token_validity_is_a_closed_interval() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::default();
    let config = test_config();
    let ctx = signed_up_user(&store, "Flo", "flo@example.com").await;
    let user_id = ctx.user.as_ref().expect("user").id;

    let flow = PasswordResetFlow::new(&store, &mailer, &config);

    // A token whose expiry is a millisecond in the future is valid
    store
        .set_reset_token(user_id, "near-expiry", Utc::now() + Duration::milliseconds(1))
        .await
        .expect("store ok");
    flow.consume_reset("near-expiry", "a brand new password", "a brand new password")
        .await
        .expect("inside the window");

    // One a millisecond in the past is not
    store
        .set_reset_token(user_id, "just-expired", Utc::now() - Duration::milliseconds(1))
        .await
        .expect("store ok");
    assert!(matches!(
        flow.consume_reset("just-expired", "another password!", "another password!")
            .await,
        Err(AppError::ExpiredOrInvalidToken)
    ));
}

#[tokio::test]
async fn consumed_token_cannot_be_replayed() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::default();
    let config = test_config();
    signed_up_user(&store, "Flo", "flo@example.com").await;

    let flow = PasswordResetFlow::new(&store, &mailer, &config);
    flow.request_reset("flo@example.com").await.expect("request ok");
    let token = mailer.last_token();

    flow.consume_reset(&token, "a brand new password", "a brand new password")
        .await
        .expect("first consume ok");

    assert!(matches!(
        flow.consume_reset(&token, "sneaky replay pass", "sneaky replay pass")
            .await,
        Err(AppError::ExpiredOrInvalidToken)
    ));
}

#[tokio::test]
async fn concurrent_consumption_has_exactly_one_winner() {
    const RACERS: usize = 8;

    let store = std::sync::Arc::new(MemoryStore::new());
    let mailer = std::sync::Arc::new(RecordingMailer::default());
    let config = std::sync::Arc::new(test_config());
    signed_up_user(store.as_ref(), "Flo", "flo@example.com").await;

    {
        let flow = PasswordResetFlow::new(store.as_ref(), mailer.as_ref(), &config);
        flow.request_reset("flo@example.com").await.expect("request ok");
    }
    let token = mailer.last_token();

    let mut handles = Vec::with_capacity(RACERS);
    for i in 0..RACERS {
        let store = store.clone();
        let mailer = mailer.clone();
        let config = config.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let flow = PasswordResetFlow::new(store.as_ref(), mailer.as_ref(), &config);
            let password = format!("racer number {i} pass");
            flow.consume_reset(&token, &password, &password).await.is_ok()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.expect("task panicked") {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "the compare-and-clear admits exactly one success");
}

#[tokio::test]
async fn unknown_email_is_reported_and_nothing_is_sent() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::default();
    let config = test_config();

    let flow = PasswordResetFlow::new(&store, &mailer, &config);
    assert!(matches!(
        flow.request_reset("stranger@example.com").await,
        Err(AppError::NotFound(_))
    ));
    assert!(mailer.sent.lock().is_empty());
}
