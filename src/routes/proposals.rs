use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{
        CreateProposalRequest, FulfillProposalRequest, ProposalDetail, ProposalQuery, SwapItem,
        SwapOption, SwapProposal,
    },
};
use actix_web::{get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const PROPOSAL_COLUMNS: &str = "id, owner_id, owner_address, fulfill_by, fulfilled_with_option_id, \
     expired_at, status, note, search_text, created_at, updated_at";

const ASSET_COLUMNS: &str =
    "id, proposal_id, item_type, contract_address, token_id, amount, ordinal, created_at";

// ILIKE treats %, _ and \ as pattern syntax; search terms are literal text
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Retrieves a list of swap proposals, newest first.
///
/// ## Query Parameters:
/// - `search` (optional): term matched against the proposal's derived search
///   text (case-insensitive).
/// - `status` (optional): filters by lifecycle state (e.g. "open", "fulfilled").
/// - `owner_id` (optional): filters by the owning user.
///
/// ## Responses:
/// - `200 OK`: JSON array of `SwapProposal` rows (without child collections).
/// - `500 Internal Server Error`: for database errors.
#[get("")]
#[allow(unused_assignments)]
pub async fn list_proposals(
    pool: web::Data<PgPool>,
    query_params: web::Query<ProposalQuery>,
) -> Result<impl Responder, AppError> {
    let mut sql = format!("SELECT {} FROM swap_proposals", PROPOSAL_COLUMNS);
    let mut param_count = 1;

    let mut conditions: Vec<String> = Vec::new();

    if query_params.search.is_some() {
        conditions.push(format!("search_text ILIKE ${}", param_count));
        param_count += 1;
    }
    if query_params.status.is_some() {
        conditions.push(format!("status = ${}", param_count));
        param_count += 1;
    }
    if query_params.owner_id.is_some() {
        conditions.push(format!("owner_id = ${}", param_count));
        param_count += 1;
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(" ORDER BY created_at DESC");

    let mut query_builder = sqlx::query_as::<_, SwapProposal>(&sql);

    if let Some(search) = &query_params.search {
        query_builder = query_builder.bind(format!("%{}%", escape_like(&search.to_lowercase())));
    }
    if let Some(status) = &query_params.status {
        query_builder = query_builder.bind(status);
    }
    if let Some(owner_id) = query_params.owner_id {
        query_builder = query_builder.bind(owner_id);
    }

    let proposals = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(proposals))
}

/// Retrieves a single proposal aggregate: the proposal row plus its
/// exclusively-owned offered items and counter-offer options, both in
/// creation order.
///
/// ## Responses:
/// - `200 OK`: `ProposalDetail` JSON.
/// - `404 Not Found`: no proposal with the given id.
#[get("/{id}")]
pub async fn get_proposal(
    pool: web::Data<PgPool>,
    proposal_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let id = proposal_id.into_inner();
    let detail = load_detail(&pool, id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

async fn load_detail(pool: &PgPool, id: Uuid) -> Result<ProposalDetail, AppError> {
    let proposal = sqlx::query_as::<_, SwapProposal>(&format!(
        "SELECT {} FROM swap_proposals WHERE id = $1",
        PROPOSAL_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Proposal not found".into()))?;

    let offer_items = sqlx::query_as::<_, SwapItem>(&format!(
        "SELECT {} FROM swap_items WHERE proposal_id = $1 ORDER BY ordinal",
        ASSET_COLUMNS
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    let swap_options = sqlx::query_as::<_, SwapOption>(&format!(
        "SELECT {} FROM swap_options WHERE proposal_id = $1 ORDER BY ordinal",
        ASSET_COLUMNS
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(ProposalDetail {
        proposal,
        offer_items,
        swap_options,
    })
}

/// Creates a new swap proposal for the authenticated user.
///
/// The owner's chain address is resolved from the wallets table at this
/// instant and denormalized onto the proposal; it is never re-derived later.
/// The proposal row and its child items/options are inserted in one
/// transaction, so the aggregate appears atomically.
///
/// ## Responses:
/// - `201 Created`: the created `ProposalDetail`.
/// - `400 Bad Request`: aggregated field violations, or no wallet on record.
/// - `401 Unauthorized`: missing or invalid bearer token.
#[post("")]
pub async fn create_proposal(
    pool: web::Data<PgPool>,
    proposal_data: web::Json<CreateProposalRequest>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    proposal_data.validate()?;

    let wallet = sqlx::query_as::<_, (String,)>("SELECT address FROM wallets WHERE user_id = $1")
        .bind(user.0)
        .fetch_optional(&**pool)
        .await?;
    let owner_address = wallet
        .map(|(address,)| address)
        .ok_or_else(|| AppError::BadRequest("No wallet address on record".into()))?;

    let detail = ProposalDetail::new(proposal_data.into_inner(), user.0, owner_address);

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO swap_proposals (id, owner_id, owner_address, expired_at, status, note, \
         search_text, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(detail.proposal.id)
    .bind(detail.proposal.owner_id)
    .bind(&detail.proposal.owner_address)
    .bind(detail.proposal.expired_at)
    .bind(detail.proposal.status)
    .bind(&detail.proposal.note)
    .bind(&detail.proposal.search_text)
    .bind(detail.proposal.created_at)
    .bind(detail.proposal.updated_at)
    .execute(&mut *tx)
    .await?;

    for item in &detail.offer_items {
        sqlx::query(
            "INSERT INTO swap_items (id, proposal_id, item_type, contract_address, token_id, \
             amount, ordinal, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(item.id)
        .bind(item.proposal_id)
        .bind(item.item_type)
        .bind(&item.contract_address)
        .bind(&item.token_id)
        .bind(item.amount)
        .bind(item.ordinal)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await?;
    }

    for option in &detail.swap_options {
        sqlx::query(
            "INSERT INTO swap_options (id, proposal_id, item_type, contract_address, token_id, \
             amount, ordinal, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(option.id)
        .bind(option.proposal_id)
        .bind(option.item_type)
        .bind(&option.contract_address)
        .bind(&option.token_id)
        .bind(option.amount)
        .bind(option.ordinal)
        .bind(option.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(HttpResponse::Created().json(detail))
}

/// Cancels an open proposal. Only the owner may withdraw it; a proposal that
/// exists but is owned by someone else is reported as not found, so callers
/// cannot probe for other users' proposals.
///
/// The transition is a compare-and-set on status: concurrent cancel/fulfill
/// attempts race on `status = 'open'` and only one wins.
///
/// ## Responses:
/// - `200 OK`: the cancelled proposal row.
/// - `404 Not Found`: absent or not owned by the caller.
/// - `409 Conflict`: the proposal already left the open state.
#[post("/{id}/cancel")]
pub async fn cancel_proposal(
    pool: web::Data<PgPool>,
    proposal_id: web::Path<Uuid>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let id = proposal_id.into_inner();

    let ownership = sqlx::query_as::<_, (Uuid,)>("SELECT owner_id FROM swap_proposals WHERE id = $1")
        .bind(id)
        .fetch_optional(&**pool)
        .await?;
    match ownership {
        Some((owner_id,)) if owner_id == user.0 => {}
        Some(_) | None => {
            return Err(AppError::NotFound(
                "Proposal not found or not owned by user".into(),
            ))
        }
    }

    let updated = sqlx::query_as::<_, SwapProposal>(&format!(
        "UPDATE swap_proposals SET status = 'cancelled', updated_at = now()
         WHERE id = $1 AND status = 'open'
         RETURNING {}",
        PROPOSAL_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&**pool)
    .await?;

    match updated {
        Some(proposal) => Ok(HttpResponse::Ok().json(proposal)),
        // The row exists but the guard failed: it already reached a terminal state
        None => Err(AppError::InvalidState(
            "Proposal is no longer open".into(),
        )),
    }
}

/// Fulfills an open proposal by accepting one of its options.
///
/// The accepted option must belong to this proposal; the caller becomes the
/// counterparty (`fulfill_by`) and cannot be the owner. `fulfill_by` and
/// `fulfilled_with_option_id` are written atomically with the status change,
/// guarded by a compare-and-set on `status = 'open' AND expired_at > now()`,
/// so of two racing accept requests exactly one succeeds and the loser
/// observes a conflict.
///
/// ## Responses:
/// - `200 OK`: the fulfilled proposal row.
/// - `400 Bad Request`: the owner attempting to fulfill their own proposal.
/// - `404 Not Found`: absent proposal, or an option not belonging to it.
/// - `409 Conflict`: already terminal, or past its deadline.
#[post("/{id}/fulfill")]
pub async fn fulfill_proposal(
    pool: web::Data<PgPool>,
    proposal_id: web::Path<Uuid>,
    request: web::Json<FulfillProposalRequest>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let id = proposal_id.into_inner();
    let option_id = request.option_id;

    let proposal = sqlx::query_as::<_, SwapProposal>(&format!(
        "SELECT {} FROM swap_proposals WHERE id = $1",
        PROPOSAL_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Proposal not found".into()))?;

    if proposal.owner_id == user.0 {
        return Err(AppError::BadRequest(
            "Owner cannot fulfill their own proposal".into(),
        ));
    }

    // The accepted option must belong to this proposal instance
    let option_owner = sqlx::query_as::<_, (Uuid,)>(
        "SELECT proposal_id FROM swap_options WHERE id = $1",
    )
    .bind(option_id)
    .fetch_optional(&**pool)
    .await?;
    match option_owner {
        Some((proposal_of_option,)) if proposal_of_option == id => {}
        Some(_) | None => {
            return Err(AppError::NotFound(
                "Option does not belong to this proposal".into(),
            ))
        }
    }

    let updated = sqlx::query_as::<_, SwapProposal>(&format!(
        "UPDATE swap_proposals
         SET status = 'fulfilled', fulfill_by = $2, fulfilled_with_option_id = $3, updated_at = now()
         WHERE id = $1 AND status = 'open' AND expired_at > now()
         RETURNING {}",
        PROPOSAL_COLUMNS
    ))
    .bind(id)
    .bind(user.0)
    .bind(option_id)
    .fetch_optional(&**pool)
    .await?;

    match updated {
        Some(proposal) => Ok(HttpResponse::Ok().json(proposal)),
        // Guard failed: lost the race, already terminal, or past the deadline
        None => Err(AppError::InvalidState(
            "Proposal is no longer open for fulfillment".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn test_escape_like_neutralizes_pattern_syntax() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain token"), "plain token");
    }
}
