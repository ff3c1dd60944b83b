use crate::{
    audit::{self, AuditEvent},
    error::AppError,
    idp::{IdpRegistry, IdpSignInPayload, IdpSignUpPayload},
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Sign in against a named identity provider.
///
/// The provider segment of the path is resolved through the startup registry;
/// an unrecognized name is rejected as bad input before any provider logic
/// runs. Every provider-side failure is collapsed into one opaque 401 so the
/// caller can never tell a bad credential from a provider outage.
///
/// ## Responses:
/// - `201 Created`: token set `{accessToken, refreshToken, expiresAt}`.
/// - `400 Bad Request`: unknown provider name.
/// - `401 Unauthorized`: any provider failure, deliberately undifferentiated.
#[post("/{provider}/sign-in")]
pub async fn sign_in(
    pool: web::Data<PgPool>,
    registry: web::Data<IdpRegistry>,
    provider_name: web::Path<String>,
    payload: web::Json<IdpSignInPayload>,
) -> Result<impl Responder, AppError> {
    let provider = registry.resolve(&provider_name)?;

    let token_set = provider.sign_in(payload.into_inner()).await.map_err(|e| {
        log::info!("sign-in via {} rejected: {}", provider.name(), e);
        AppError::Unauthorized("Unauthorized".into())
    })?;

    // Best-effort: emission failure never rolls back the completed auth.
    audit::emit(
        pool.get_ref().clone(),
        AuditEvent::account_signin(provider.name()),
    );

    Ok(HttpResponse::Created().json(token_set))
}

/// Sign up against a named identity provider.
///
/// Same contract as [`sign_in`]: 201 with a token set on success, 400 for an
/// unknown provider, opaque 401 for everything the provider rejects.
#[post("/{provider}/sign-up")]
pub async fn sign_up(
    pool: web::Data<PgPool>,
    registry: web::Data<IdpRegistry>,
    provider_name: web::Path<String>,
    payload: web::Json<IdpSignUpPayload>,
) -> Result<impl Responder, AppError> {
    let provider = registry.resolve(&provider_name)?;

    let token_set = provider.sign_up(payload.into_inner()).await.map_err(|e| {
        log::info!("sign-up via {} rejected: {}", provider.name(), e);
        AppError::Unauthorized("Unauthorized".into())
    })?;

    audit::emit(
        pool.get_ref().clone(),
        AuditEvent::account_signin(provider.name()),
    );

    Ok(HttpResponse::Created().json(token_set))
}
