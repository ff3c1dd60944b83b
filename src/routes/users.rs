use crate::{
    auth::hash_password,
    error::AppError,
    models::user::{
        CreateUserRequest, GetPublicProfilesRequest, OrderStats, PublicProfile, User,
    },
};
use actix_web::{post, web, HttpResponse, Responder};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

const USER_COLUMNS: &str = "id, email, avatar, website, nickname, first_name, middle_name, \
     last_name, locale, birthdate, telegram, twitter, created_at, updated_at";

/// Creates a user account.
///
/// Expects a JSON `CreateUserRequest`: a valid email, a password satisfying
/// the complexity rule, and optional nested profile attributes. Every
/// violated constraint is reported in one aggregated 400 response.
///
/// ## Responses:
/// - `201 Created`: the persisted user (password hash never echoed).
/// - `400 Bad Request`: aggregated field violations, or duplicate email.
/// - `500 Internal Server Error`: database or hashing failures.
#[post("")]
pub async fn create_user(
    pool: web::Data<PgPool>,
    user_data: web::Json<CreateUserRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    user_data.validate()?;
    let input = user_data.into_inner();

    // Check if email already exists
    let existing = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM users WHERE email = $1")
        .bind(&input.email)
        .fetch_optional(&**pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    // Hash password
    let password_hash = hash_password(&input.password)?;

    let attributes = input.attributes.unwrap_or_default();
    // Already validated as ISO, so the parse cannot fail here
    let birthdate: Option<NaiveDate> = attributes
        .birthdate
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, email, password_hash, avatar, website, nickname, first_name, \
         middle_name, last_name, locale, birthdate, telegram, twitter)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.email)
    .bind(password_hash)
    .bind(&attributes.avatar)
    .bind(&attributes.website)
    .bind(&attributes.nickname)
    .bind(&attributes.first_name)
    .bind(&attributes.middle_name)
    .bind(&attributes.last_name)
    .bind(&attributes.locale)
    .bind(birthdate)
    .bind(&attributes.telegram)
    .bind(&attributes.twitter)
    .fetch_one(&**pool)
    .await
    .map_err(|e| match &e {
        // Concurrent registrations can slip past the exists check and hit
        // the unique constraint on email instead
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            AppError::BadRequest("Email already registered".into())
        }
        _ => AppError::from(e),
    })?;

    Ok(HttpResponse::Created().json(user))
}

/// Resolves public profiles for a set of user ids.
///
/// Returns a mapping from id to a reduced projection: id, avatar, social
/// handles, the wallet address joined from the wallets table, and proposal
/// order statistics (total / fulfilled). Ids without a matching user are
/// simply absent from the map; duplicates collapse.
///
/// ## Responses:
/// - `200 OK`: `{<user_id>: PublicProfile, ...}`.
/// - `400 Bad Request`: empty or oversized id list.
#[post("/public-profiles")]
pub async fn public_profiles(
    pool: web::Data<PgPool>,
    request: web::Json<GetPublicProfilesRequest>,
) -> Result<impl Responder, AppError> {
    request.validate()?;
    let ids = &request.ids;

    let rows = sqlx::query_as::<_, (Uuid, Option<String>, Option<String>, Option<String>, Option<String>)>(
        "SELECT u.id, u.avatar, u.telegram, u.twitter, w.address
         FROM users u
         LEFT JOIN wallets w ON w.user_id = u.id
         WHERE u.id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(&**pool)
    .await?;

    let stats = sqlx::query_as::<_, (Uuid, i64, i64)>(
        "SELECT owner_id,
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'fulfilled')
         FROM swap_proposals
         WHERE owner_id = ANY($1)
         GROUP BY owner_id",
    )
    .bind(ids)
    .fetch_all(&**pool)
    .await?;

    let stats_by_owner: HashMap<Uuid, OrderStats> = stats
        .into_iter()
        .map(|(owner_id, orders, completed_orders)| {
            (
                owner_id,
                OrderStats {
                    orders,
                    completed_orders,
                },
            )
        })
        .collect();

    let profiles: HashMap<Uuid, PublicProfile> = rows
        .into_iter()
        .map(|(id, avatar, telegram, twitter, wallet_address)| {
            (
                id,
                PublicProfile {
                    id,
                    avatar,
                    telegram,
                    twitter,
                    wallet_address,
                    orders_stat: stats_by_owner.get(&id).copied().unwrap_or_default(),
                },
            )
        })
        .collect();

    Ok(HttpResponse::Ok().json(profiles))
}
