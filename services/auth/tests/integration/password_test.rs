use chrono::{Duration, Utc};
use uuid::Uuid;

use vantra_auth::domain::types::{ResetToken, Session};
use vantra_auth::error::AuthServiceError;
use vantra_auth::usecase::password::{
    ChangePasswordInput, ChangePasswordUseCase, RequestPasswordResetUseCase, ResetPasswordUseCase,
    verify_password,
};

use crate::helpers::{
    MockCredentialRepo, MockResetTokenRepo, MockSessionRepo, TEST_PASSWORD, test_credential,
};

fn test_session(user_id: Uuid, token: &str) -> Session {
    let now = Utc::now();
    Session {
        token: token.to_owned(),
        user_id,
        ip_address: None,
        user_agent: None,
        created_at: now,
        updated_at: now,
        expires_at: now + Duration::days(30),
    }
}

// ── ChangePasswordUseCase ────────────────────────────────────────────────────

fn change_input(user_id: Uuid, current: &str, new: &str) -> ChangePasswordInput {
    ChangePasswordInput {
        user_id,
        current_token: "tok-current".to_owned(),
        current_password: current.to_owned(),
        new_password: new.to_owned(),
    }
}

#[tokio::test]
async fn should_change_password_and_revoke_other_sessions() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    let credentials = MockCredentialRepo::new(vec![credential]);
    let sessions = MockSessionRepo::new(vec![
        test_session(user_id, "tok-current"),
        test_session(user_id, "tok-other"),
    ]);
    let sessions_handle = sessions.handle();

    let usecase = ChangePasswordUseCase {
        credentials: credentials.clone(),
        sessions,
        revoke_other_sessions: true,
    };
    usecase
        .execute(change_input(user_id, TEST_PASSWORD, "brand-new-password"))
        .await
        .unwrap();

    let stored = credentials.handle().lock().unwrap()[0].clone();
    assert!(verify_password("brand-new-password", &stored.password_hash).unwrap());

    let remaining = sessions_handle.lock().unwrap();
    assert_eq!(remaining.len(), 1, "only the caller's session survives");
    assert_eq!(remaining[0].token, "tok-current");
}

#[tokio::test]
async fn should_keep_other_sessions_when_revocation_disabled() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    let sessions = MockSessionRepo::new(vec![
        test_session(user_id, "tok-current"),
        test_session(user_id, "tok-other"),
    ]);
    let sessions_handle = sessions.handle();

    let usecase = ChangePasswordUseCase {
        credentials: MockCredentialRepo::new(vec![credential]),
        sessions,
        revoke_other_sessions: false,
    };
    usecase
        .execute(change_input(user_id, TEST_PASSWORD, "brand-new-password"))
        .await
        .unwrap();

    assert_eq!(sessions_handle.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn should_require_current_password_reproof() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    let usecase = ChangePasswordUseCase {
        credentials: MockCredentialRepo::new(vec![credential]),
        sessions: MockSessionRepo::empty(),
        revoke_other_sessions: true,
    };

    let result = usecase
        .execute(change_input(user_id, "wrong-password", "brand-new-password"))
        .await;
    assert!(
        matches!(result, Err(AuthServiceError::InvalidCredentials)),
        "expected InvalidCredentials, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_reusing_the_current_password() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    let usecase = ChangePasswordUseCase {
        credentials: MockCredentialRepo::new(vec![credential]),
        sessions: MockSessionRepo::empty(),
        revoke_other_sessions: true,
    };

    let result = usecase
        .execute(change_input(user_id, TEST_PASSWORD, TEST_PASSWORD))
        .await;
    assert!(
        matches!(result, Err(AuthServiceError::PasswordReuse)),
        "expected PasswordReuse, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_weak_new_password() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    let usecase = ChangePasswordUseCase {
        credentials: MockCredentialRepo::new(vec![credential]),
        sessions: MockSessionRepo::empty(),
        revoke_other_sessions: true,
    };

    let result = usecase.execute(change_input(user_id, TEST_PASSWORD, "tiny")).await;
    assert!(
        matches!(result, Err(AuthServiceError::WeakPassword)),
        "expected WeakPassword, got {result:?}"
    );
}

// ── RequestPasswordResetUseCase ──────────────────────────────────────────────

#[tokio::test]
async fn should_create_token_and_outbox_event_for_known_email() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    let reset_tokens = MockResetTokenRepo::empty();
    let tokens_handle = reset_tokens.tokens_handle();
    let events_handle = reset_tokens.events_handle();

    let usecase = RequestPasswordResetUseCase {
        credentials: MockCredentialRepo::new(vec![credential]),
        reset_tokens,
    };
    usecase.execute("Alice@Example.com").await.unwrap();

    let tokens = tokens_handle.lock().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].user_id, user_id);
    assert!(tokens[0].is_valid());

    let events = events_handle.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "password_reset_requested");
    assert_eq!(events[0].payload["email"], "alice@example.com");
}

#[tokio::test]
async fn should_silently_accept_unknown_email() {
    let reset_tokens = MockResetTokenRepo::empty();
    let tokens_handle = reset_tokens.tokens_handle();

    let usecase = RequestPasswordResetUseCase {
        credentials: MockCredentialRepo::empty(),
        reset_tokens,
    };
    // Indistinguishable from the known-email case for the caller.
    usecase.execute("nobody@example.com").await.unwrap();

    assert!(tokens_handle.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_drop_request_when_too_many_tokens_active() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    let reset_tokens = MockResetTokenRepo::empty();
    {
        let tokens_handle = reset_tokens.tokens_handle();
        let mut tokens = tokens_handle.lock().unwrap();
        for _ in 0..3 {
            tokens.push(ResetToken::issue(user_id, Uuid::new_v4().to_string()));
        }
    }
    let tokens_handle = reset_tokens.tokens_handle();

    let usecase = RequestPasswordResetUseCase {
        credentials: MockCredentialRepo::new(vec![credential]),
        reset_tokens,
    };
    usecase.execute("alice@example.com").await.unwrap();

    assert_eq!(tokens_handle.lock().unwrap().len(), 3, "no fourth token");
}

// ── ResetPasswordUseCase ─────────────────────────────────────────────────────

fn reset_usecase(
    credentials: MockCredentialRepo,
    sessions: MockSessionRepo,
    reset_tokens: MockResetTokenRepo,
) -> ResetPasswordUseCase<MockCredentialRepo, MockSessionRepo, MockResetTokenRepo> {
    ResetPasswordUseCase {
        credentials,
        sessions,
        reset_tokens,
    }
}

#[tokio::test]
async fn should_reset_password_and_revoke_every_session() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;
    let credentials = MockCredentialRepo::new(vec![credential]);
    let sessions = MockSessionRepo::new(vec![
        test_session(user_id, "tok-1"),
        test_session(user_id, "tok-2"),
    ]);
    let sessions_handle = sessions.handle();

    let reset_tokens = MockResetTokenRepo::empty();
    let token = ResetToken::issue(user_id, "reset-token-value".to_owned());
    reset_tokens.tokens_handle().lock().unwrap().push(token);

    let usecase = reset_usecase(credentials.clone(), sessions, reset_tokens);
    usecase
        .execute("reset-token-value", "after-reset-password")
        .await
        .unwrap();

    let stored = credentials.handle().lock().unwrap()[0].clone();
    assert!(verify_password("after-reset-password", &stored.password_hash).unwrap());
    assert!(
        sessions_handle.lock().unwrap().is_empty(),
        "reset must force re-login everywhere"
    );
}

#[tokio::test]
async fn should_reject_unknown_or_expired_token() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;

    let reset_tokens = MockResetTokenRepo::empty();
    let mut expired = ResetToken::issue(user_id, "expired-token".to_owned());
    expired.expires_at = Utc::now() - Duration::seconds(1);
    reset_tokens.tokens_handle().lock().unwrap().push(expired);

    let usecase = reset_usecase(
        MockCredentialRepo::new(vec![credential]),
        MockSessionRepo::empty(),
        reset_tokens,
    );

    let result = usecase.execute("expired-token", "after-reset-password").await;
    assert!(
        matches!(result, Err(AuthServiceError::InvalidResetToken)),
        "expected InvalidResetToken, got {result:?}"
    );

    let result = usecase.execute("never-issued", "after-reset-password").await;
    assert!(
        matches!(result, Err(AuthServiceError::InvalidResetToken)),
        "expected InvalidResetToken, got {result:?}"
    );
}

#[tokio::test]
async fn should_consume_reset_token_exactly_once() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;

    let reset_tokens = MockResetTokenRepo::empty();
    let token = ResetToken::issue(user_id, "one-shot-token".to_owned());
    reset_tokens.tokens_handle().lock().unwrap().push(token);

    let usecase = reset_usecase(
        MockCredentialRepo::new(vec![credential]),
        MockSessionRepo::empty(),
        reset_tokens,
    );

    usecase
        .execute("one-shot-token", "after-reset-password")
        .await
        .unwrap();

    let result = usecase.execute("one-shot-token", "another-password-1").await;
    assert!(
        matches!(result, Err(AuthServiceError::InvalidResetToken)),
        "expected InvalidResetToken, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_burn_token_on_weak_password() {
    let credential = test_credential("alice@example.com");
    let user_id = credential.id;

    let reset_tokens = MockResetTokenRepo::empty();
    let token = ResetToken::issue(user_id, "precious-token".to_owned());
    reset_tokens.tokens_handle().lock().unwrap().push(token);

    let usecase = reset_usecase(
        MockCredentialRepo::new(vec![credential]),
        MockSessionRepo::empty(),
        reset_tokens,
    );

    let result = usecase.execute("precious-token", "tiny").await;
    assert!(
        matches!(result, Err(AuthServiceError::WeakPassword)),
        "expected WeakPassword, got {result:?}"
    );

    // The token survives the failed attempt.
    usecase
        .execute("precious-token", "after-reset-password")
        .await
        .unwrap();
}
