use vantra_auth::domain::types::EnrollmentStep;
use vantra_auth::error::AuthServiceError;
use vantra_auth::usecase::enrollment::{
    CompleteEnrollmentUseCase, ConfirmEnrollmentUseCase, DisableTwoFactorUseCase,
    EnableTwoFactorUseCase, ResetEnrollmentUseCase, TwoFactorStatusUseCase,
};
use vantra_auth::usecase::totp::{build_totp, now_unix};

use crate::helpers::{
    MockBackupCodeRepo, MockCredentialRepo, MockTwoFactorCache, TEST_PASSWORD, test_cipher,
    test_credential,
};

struct Fixture {
    credentials: MockCredentialRepo,
    backup_codes: MockBackupCodeRepo,
    cache: MockTwoFactorCache,
    user_id: uuid::Uuid,
}

fn fixture() -> Fixture {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    Fixture {
        credentials: MockCredentialRepo::new(vec![credential]),
        backup_codes: MockBackupCodeRepo::empty(),
        cache: MockTwoFactorCache::empty(),
        user_id,
    }
}

fn enable_usecase(
    f: &Fixture,
) -> EnableTwoFactorUseCase<MockCredentialRepo, MockBackupCodeRepo, MockTwoFactorCache> {
    EnableTwoFactorUseCase {
        credentials: f.credentials.clone(),
        backup_codes: f.backup_codes.clone(),
        cache: f.cache.clone(),
        cipher: test_cipher(),
        issuer: "Vantra".to_owned(),
    }
}

fn confirm_usecase(f: &Fixture) -> ConfirmEnrollmentUseCase<MockCredentialRepo, MockTwoFactorCache> {
    ConfirmEnrollmentUseCase {
        credentials: f.credentials.clone(),
        cache: f.cache.clone(),
        cipher: test_cipher(),
    }
}

fn complete_usecase(
    f: &Fixture,
) -> CompleteEnrollmentUseCase<MockCredentialRepo, MockTwoFactorCache> {
    CompleteEnrollmentUseCase {
        credentials: f.credentials.clone(),
        cache: f.cache.clone(),
    }
}

fn disable_usecase(
    f: &Fixture,
) -> DisableTwoFactorUseCase<MockCredentialRepo, MockBackupCodeRepo, MockTwoFactorCache> {
    DisableTwoFactorUseCase {
        credentials: f.credentials.clone(),
        backup_codes: f.backup_codes.clone(),
        cache: f.cache.clone(),
    }
}

fn status_usecase(f: &Fixture) -> TwoFactorStatusUseCase<MockCredentialRepo, MockTwoFactorCache> {
    TwoFactorStatusUseCase {
        credentials: f.credentials.clone(),
        cache: f.cache.clone(),
    }
}

/// Derive the current code from the base32 secret handed back by `enable`,
/// exactly as an authenticator app would.
fn code_from_base32(secret_base32: &str) -> String {
    let secret = totp_rs::Secret::Encoded(secret_base32.to_owned())
        .to_bytes()
        .unwrap();
    let totp = build_totp(secret, None, "account".to_owned()).unwrap();
    totp.generate(now_unix())
}

#[tokio::test]
async fn should_walk_the_full_enrollment_flow() {
    let f = fixture();

    // verify-password → scan-qr
    let output = enable_usecase(&f)
        .execute(f.user_id, TEST_PASSWORD)
        .await
        .unwrap();
    assert!(output.otpauth_uri.starts_with("otpauth://totp/"));
    assert_eq!(output.backup_codes.len(), 10);

    let status = status_usecase(&f).execute(f.user_id).await.unwrap();
    assert!(!status.enabled);
    assert_eq!(status.step, EnrollmentStep::ScanQr);

    // scan-qr → backup-codes (code verified)
    let code = code_from_base32(&output.secret_base32);
    confirm_usecase(&f).execute(f.user_id, &code).await.unwrap();
    let status = status_usecase(&f).execute(f.user_id).await.unwrap();
    assert_eq!(status.step, EnrollmentStep::BackupCodes);

    // backup-codes → completed
    complete_usecase(&f).execute(f.user_id).await.unwrap();
    let status = status_usecase(&f).execute(f.user_id).await.unwrap();
    assert!(status.enabled);
    assert_eq!(status.step, EnrollmentStep::Completed);

    let credential = f.credentials.handle().lock().unwrap()[0].clone();
    assert!(credential.two_factor_enabled);
    assert!(credential.totp_secret.is_some());
}

#[tokio::test]
async fn should_require_correct_password_to_enable() {
    let f = fixture();
    let result = enable_usecase(&f).execute(f.user_id, "wrong-password").await;
    assert!(
        matches!(result, Err(AuthServiceError::InvalidCredentials)),
        "expected InvalidCredentials, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_enable_when_already_enrolled() {
    let f = fixture();
    let output = enable_usecase(&f)
        .execute(f.user_id, TEST_PASSWORD)
        .await
        .unwrap();
    let code = code_from_base32(&output.secret_base32);
    confirm_usecase(&f).execute(f.user_id, &code).await.unwrap();
    complete_usecase(&f).execute(f.user_id).await.unwrap();

    let result = enable_usecase(&f).execute(f.user_id, TEST_PASSWORD).await;
    assert!(
        matches!(result, Err(AuthServiceError::AlreadyEnrolled)),
        "expected AlreadyEnrolled, got {result:?}"
    );
}

#[tokio::test]
async fn should_keep_flow_at_verify_code_after_wrong_code() {
    let f = fixture();
    enable_usecase(&f)
        .execute(f.user_id, TEST_PASSWORD)
        .await
        .unwrap();

    let result = confirm_usecase(&f).execute(f.user_id, "000000").await;
    assert!(
        matches!(result, Err(AuthServiceError::InvalidCode)),
        "expected InvalidCode, got {result:?}"
    );

    let status = status_usecase(&f).execute(f.user_id).await.unwrap();
    assert_eq!(status.step, EnrollmentStep::VerifyCode);

    // Enrollment is still incomplete; completing now must fail.
    let result = complete_usecase(&f).execute(f.user_id).await;
    assert!(
        matches!(result, Err(AuthServiceError::NotEnrolled)),
        "expected NotEnrolled, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_confirm_and_complete_without_enrollment_in_progress() {
    let f = fixture();

    let result = confirm_usecase(&f).execute(f.user_id, "123456").await;
    assert!(
        matches!(result, Err(AuthServiceError::NotEnrolled)),
        "expected NotEnrolled, got {result:?}"
    );

    let result = complete_usecase(&f).execute(f.user_id).await;
    assert!(
        matches!(result, Err(AuthServiceError::NotEnrolled)),
        "expected NotEnrolled, got {result:?}"
    );
}

#[tokio::test]
async fn should_reset_an_in_progress_enrollment() {
    let f = fixture();
    enable_usecase(&f)
        .execute(f.user_id, TEST_PASSWORD)
        .await
        .unwrap();

    let reset = ResetEnrollmentUseCase {
        credentials: f.credentials.clone(),
        backup_codes: f.backup_codes.clone(),
        cache: f.cache.clone(),
    };
    reset.execute(f.user_id).await.unwrap();

    let status = status_usecase(&f).execute(f.user_id).await.unwrap();
    assert_eq!(status.step, EnrollmentStep::VerifyPassword);

    let credential = f.credentials.handle().lock().unwrap()[0].clone();
    assert!(credential.totp_secret.is_none());
    assert!(f.backup_codes.handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_disable_and_reprovision_with_fresh_secret() {
    let f = fixture();

    let first = enable_usecase(&f)
        .execute(f.user_id, TEST_PASSWORD)
        .await
        .unwrap();
    let code = code_from_base32(&first.secret_base32);
    confirm_usecase(&f).execute(f.user_id, &code).await.unwrap();
    complete_usecase(&f).execute(f.user_id).await.unwrap();

    // Password is the sole gate for disabling.
    let wrong = disable_usecase(&f).execute(f.user_id, "wrong-password").await;
    assert!(
        matches!(wrong, Err(AuthServiceError::InvalidCredentials)),
        "expected InvalidCredentials, got {wrong:?}"
    );

    disable_usecase(&f)
        .execute(f.user_id, TEST_PASSWORD)
        .await
        .unwrap();

    let credential = f.credentials.handle().lock().unwrap()[0].clone();
    assert!(!credential.two_factor_enabled);
    assert!(credential.totp_secret.is_none(), "secret must be erased");
    assert!(f.backup_codes.handle().lock().unwrap().is_empty());

    // Re-enrollment provisions a brand-new secret.
    let second = enable_usecase(&f)
        .execute(f.user_id, TEST_PASSWORD)
        .await
        .unwrap();
    assert_ne!(first.secret_base32, second.secret_base32);
}

#[tokio::test]
async fn should_reject_disable_when_not_enrolled() {
    let f = fixture();
    let result = disable_usecase(&f).execute(f.user_id, TEST_PASSWORD).await;
    assert!(
        matches!(result, Err(AuthServiceError::NotEnrolled)),
        "expected NotEnrolled, got {result:?}"
    );
}
