//! Factor bookkeeping: last-factor protection, duplicates, labels.

mod common;

use auth_core::models::{FactorKind, PASSWORD_CREDENTIAL_ID};
use auth_core::services::NewPasskey;
use auth_core::{CoreError, FactorRequest, PasswordMaterial};
use common::{default_core, register_enabled, OTHER_PASSWORD};

fn passkey(credential_id: &str, label: &str) -> FactorRequest {
    FactorRequest::Passkey(NewPasskey {
        credential_id: credential_id.to_string(),
        label: label.to_string(),
        backup_eligible: Some(true),
        backup_state: Some(false),
    })
}

#[tokio::test]
async fn test_removing_sole_factor_is_denied() {
    let core = default_core();
    let account = register_enabled(&core, "sole@example.com").await;

    // Registration created exactly the password factor.
    let factors = core.service.list_factors(account.account_id).await.unwrap();
    assert_eq!(factors.len(), 1);

    let result = core
        .service
        .remove_factor(account.account_id, PASSWORD_CREDENTIAL_ID)
        .await;
    assert!(matches!(result, Err(CoreError::LastFactorRemovalDenied)));

    // No mutation happened.
    let factors = core.service.list_factors(account.account_id).await.unwrap();
    assert_eq!(factors.len(), 1);
}

#[tokio::test]
async fn test_removing_one_of_two_factors_succeeds() {
    let core = default_core();
    let account = register_enabled(&core, "two@example.com").await;

    core.service
        .add_factor(account.account_id, passkey("cred-1", "Phone"))
        .await
        .unwrap();

    core.service
        .remove_factor(account.account_id, PASSWORD_CREDENTIAL_ID)
        .await
        .unwrap();

    let factors = core.service.list_factors(account.account_id).await.unwrap();
    assert_eq!(factors.len(), 1);
    assert_eq!(factors[0].kind, FactorKind::Passkey);
    assert_eq!(factors[0].credential_id, "cred-1");
}

#[tokio::test]
async fn test_duplicate_passkey_rejected() {
    let core = default_core();
    let account = register_enabled(&core, "dup@example.com").await;

    core.service
        .add_factor(account.account_id, passkey("cred-1", "Phone"))
        .await
        .unwrap();
    let result = core
        .service
        .add_factor(account.account_id, passkey("cred-1", "Phone again"))
        .await;
    assert!(matches!(result, Err(CoreError::DuplicateCredential)));
}

#[tokio::test]
async fn test_second_password_factor_rejected() {
    let core = default_core();
    let account = register_enabled(&core, "pw-dup@example.com").await;

    let result = core
        .service
        .add_factor(
            account.account_id,
            FactorRequest::Password {
                label: "Password".to_string(),
                material: PasswordMaterial::from(OTHER_PASSWORD),
            },
        )
        .await;
    assert!(matches!(result, Err(CoreError::DuplicateCredential)));
}

#[tokio::test]
async fn test_unknown_factor_removal_not_found() {
    let core = default_core();
    let account = register_enabled(&core, "missing@example.com").await;

    let result = core.service.remove_factor(account.account_id, "nope").await;
    assert!(matches!(result, Err(CoreError::FactorNotFound)));
}

#[tokio::test]
async fn test_relabel_factor() {
    let core = default_core();
    let account = register_enabled(&core, "label@example.com").await;

    core.service
        .add_factor(account.account_id, passkey("cred-1", "Phone"))
        .await
        .unwrap();
    core.service
        .relabel_factor(account.account_id, "cred-1", "  Work laptop  ")
        .await
        .unwrap();

    let factors = core.service.list_factors(account.account_id).await.unwrap();
    let renamed = factors.iter().find(|f| f.credential_id == "cred-1").unwrap();
    assert_eq!(renamed.label, "Work laptop");
}

#[tokio::test]
async fn test_invalid_labels_rejected() {
    let core = default_core();
    let account = register_enabled(&core, "badlabel@example.com").await;

    let empty = core
        .service
        .add_factor(account.account_id, passkey("cred-1", "   "))
        .await;
    assert!(matches!(empty, Err(CoreError::InvalidLabel(_))));

    let long = core
        .service
        .add_factor(account.account_id, passkey("cred-2", &"x".repeat(65)))
        .await;
    assert!(matches!(long, Err(CoreError::InvalidLabel(_))));
}

#[tokio::test]
async fn test_factors_listed_in_creation_order() {
    let core = default_core();
    let account = register_enabled(&core, "order@example.com").await;

    core.clock.advance(chrono::Duration::seconds(5));
    core.service
        .add_factor(account.account_id, passkey("cred-1", "Phone"))
        .await
        .unwrap();
    core.clock.advance(chrono::Duration::seconds(5));
    core.service
        .add_factor(account.account_id, passkey("cred-2", "Laptop"))
        .await
        .unwrap();

    let factors = core.service.list_factors(account.account_id).await.unwrap();
    let ids: Vec<&str> = factors.iter().map(|f| f.credential_id.as_str()).collect();
    assert_eq!(ids, vec![PASSWORD_CREDENTIAL_ID, "cred-1", "cred-2"]);
}

#[tokio::test]
async fn test_mark_factor_used_stamps_timestamp() {
    let core = default_core();
    let account = register_enabled(&core, "used@example.com").await;

    core.service
        .add_factor(account.account_id, passkey("cred-1", "Phone"))
        .await
        .unwrap();
    core.service
        .mark_factor_used(account.account_id, "cred-1")
        .await
        .unwrap();

    let factors = core.service.list_factors(account.account_id).await.unwrap();
    let used = factors.iter().find(|f| f.credential_id == "cred-1").unwrap();
    assert!(used.last_used_utc.is_some());
}

#[tokio::test]
async fn test_disabled_account_exempt_from_last_factor_guard() {
    let core = default_core();
    let account = register_enabled(&core, "gone@example.com").await;

    core.service.disable_account(account.account_id).await.unwrap();
    core.service
        .remove_factor(account.account_id, PASSWORD_CREDENTIAL_ID)
        .await
        .unwrap();

    let factors = core.service.list_factors(account.account_id).await.unwrap();
    assert!(factors.is_empty());
}
