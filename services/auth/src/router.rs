use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tower_http::trace::TraceLayer;

use vantra_core::health::{healthz, readyz};
use vantra_core::middleware::request_id_layer;

use crate::handlers::{
    password::{change_password, request_password_reset, reset_password},
    sessions::{list_sessions, revoke_all_sessions, revoke_other_sessions, revoke_session},
    sign_in::{sign_in, verify_two_factor},
    two_factor::{
        complete_two_factor, confirm_two_factor, disable_two_factor, enable_two_factor,
        reset_enrollment, two_factor_status,
    },
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Sign-in
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-in/two-factor", post(verify_two_factor))
        // Two-factor lifecycle
        .route("/auth/two-factor", get(two_factor_status))
        .route("/auth/two-factor", post(complete_two_factor))
        .route("/auth/two-factor", delete(disable_two_factor))
        .route("/auth/two-factor/enrollment", post(enable_two_factor))
        .route("/auth/two-factor/enrollment", patch(confirm_two_factor))
        .route("/auth/two-factor/enrollment", delete(reset_enrollment))
        // Sessions
        .route("/auth/sessions", get(list_sessions))
        .route("/auth/sessions", delete(revoke_all_sessions))
        .route("/auth/sessions/others", delete(revoke_other_sessions))
        .route("/auth/sessions/{token}", delete(revoke_session))
        // Password
        .route("/auth/password", patch(change_password))
        .route("/auth/password/reset", post(request_password_reset))
        .route("/auth/password/reset", patch(reset_password))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
