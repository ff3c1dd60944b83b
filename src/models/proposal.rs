use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;

/// Lifecycle state of a swap proposal.
/// Corresponds to the `swap_proposal_status` SQL enum.
///
/// `Open` is the only state with outgoing transitions; the other three are
/// terminal. Transitions are monotonic: a proposal never leaves a terminal
/// state.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "swap_proposal_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SwapProposalStatus {
    /// Accepting fulfillment until `expired_at`.
    Open,
    /// A counterparty accepted one of the proposal's options.
    Fulfilled,
    /// Withdrawn by the owner.
    Cancelled,
    /// Passed `expired_at` without fulfillment.
    Expired,
}

/// Kind of tradable unit referenced by an item or option.
/// Corresponds to the `swap_item_kind` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "swap_item_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Nft,
    Token,
}

/// A tradable unit offered within a proposal. Owned exclusively by one
/// proposal and deleted with it (`ON DELETE CASCADE`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SwapItem {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub item_type: ItemKind,
    /// Chain address of the asset contract.
    pub contract_address: String,
    /// Token identifier within the contract, for NFTs.
    pub token_id: Option<String>,
    /// Amount in raw base units.
    pub amount: i64,
    /// Position within the proposal's offered collection.
    pub ordinal: i32,
    pub created_at: DateTime<Utc>,
}

/// A counter-offer choice the owner is willing to accept. Owned exclusively
/// by one proposal and deleted with it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SwapOption {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub item_type: ItemKind,
    pub contract_address: String,
    pub token_id: Option<String>,
    pub amount: i64,
    pub ordinal: i32,
    pub created_at: DateTime<Utc>,
}

/// The proposal aggregate root as persisted in `swap_proposals`.
///
/// Offered items and options live in their own tables and are attached via
/// [`ProposalDetail`]; this struct carries the flat row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SwapProposal {
    /// Unique identifier for the proposal (UUID v4).
    pub id: Uuid,
    /// Identifier of the owning user.
    pub owner_id: Uuid,
    /// Chain address of the owner captured at creation time. Denormalized on
    /// purpose: it is never re-derived from the user's current wallet.
    pub owner_address: String,
    /// Counterparty that fulfilled the proposal, set together with the
    /// transition to `Fulfilled`.
    pub fulfill_by: Option<Uuid>,
    /// The accepted option, set together with the transition to `Fulfilled`.
    /// Always references an option belonging to this proposal.
    pub fulfilled_with_option_id: Option<Uuid>,
    /// Instant at or after which the proposal can no longer be fulfilled.
    pub expired_at: DateTime<Utc>,
    pub status: SwapProposalStatus,
    /// Free-text annotation, defaults to empty.
    pub note: String,
    /// Derived text indexed for full-text lookup; regenerated whenever the
    /// aggregate is written.
    pub search_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input structure for one offered item or asked option.
#[derive(Debug, Serialize, Deserialize)]
pub struct SwapAssetInput {
    pub item_type: ItemKind,
    pub contract_address: String,
    pub token_id: Option<String>,
    pub amount: i64,
}

/// Input structure for creating a swap proposal.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProposalRequest {
    /// Items put up for swap. At least one is required.
    #[validate(length(min = 1, max = 32), custom = "validate_assets")]
    pub offer_items: Vec<SwapAssetInput>,

    /// Counter-offers the owner is willing to accept. At least one is required.
    #[validate(length(min = 1, max = 32), custom = "validate_assets")]
    pub swap_options: Vec<SwapAssetInput>,

    /// Must lie in the future at creation time.
    #[validate(custom = "validate_future_timestamp")]
    pub expired_at: DateTime<Utc>,

    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

fn validate_assets(assets: &[SwapAssetInput]) -> Result<(), ValidationError> {
    for asset in assets {
        if asset.contract_address.is_empty() || asset.contract_address.len() > 128 {
            let mut err = ValidationError::new("contract_address");
            err.message = Some("contract_address must be 1-128 characters".into());
            return Err(err);
        }
        if let Some(token_id) = &asset.token_id {
            if token_id.is_empty() || token_id.len() > 128 {
                let mut err = ValidationError::new("token_id");
                err.message = Some("token_id must be 1-128 characters".into());
                return Err(err);
            }
        }
        if asset.amount < 1 {
            let mut err = ValidationError::new("amount");
            err.message = Some("amount must be at least 1".into());
            return Err(err);
        }
    }
    Ok(())
}

fn validate_future_timestamp(value: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *value <= Utc::now() {
        let mut err = ValidationError::new("future_timestamp");
        err.message = Some("expired_at must be in the future".into());
        return Err(err);
    }
    Ok(())
}

/// Request body for fulfilling a proposal with one of its options.
#[derive(Debug, Serialize, Deserialize)]
pub struct FulfillProposalRequest {
    pub option_id: Uuid,
}

/// Represents query parameters for filtering proposals when listing them.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProposalQuery {
    /// Term matched against the proposal's derived search text.
    pub search: Option<String>,
    pub status: Option<SwapProposalStatus>,
    pub owner_id: Option<Uuid>,
}

/// A proposal together with its exclusively-owned child collections.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProposalDetail {
    #[serde(flatten)]
    pub proposal: SwapProposal,
    pub offer_items: Vec<SwapItem>,
    pub swap_options: Vec<SwapOption>,
}

/// Builds the derived full-text field from the aggregate's content: the note,
/// the owner's address and every referenced contract/token identifier.
pub fn build_search_text(
    note: &str,
    owner_address: &str,
    items: &[SwapItem],
    options: &[SwapOption],
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !note.is_empty() {
        parts.push(note.to_lowercase());
    }
    parts.push(owner_address.to_lowercase());
    for item in items {
        parts.push(item.contract_address.to_lowercase());
        if let Some(token_id) = &item.token_id {
            parts.push(token_id.to_lowercase());
        }
    }
    for option in options {
        parts.push(option.contract_address.to_lowercase());
        if let Some(token_id) = &option.token_id {
            parts.push(token_id.to_lowercase());
        }
    }
    parts.join(" ")
}

impl SwapProposal {
    /// Whether the proposal sits in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status != SwapProposalStatus::Open
    }

    /// Transition `Open -> Fulfilled`.
    ///
    /// The accepted option must belong to this proposal instance, the
    /// proposal must still be open and `now` must precede `expired_at`.
    /// `fulfill_by` and `fulfilled_with_option_id` are set atomically with
    /// the status change.
    pub fn fulfill(
        &mut self,
        option_id: Uuid,
        fulfill_by: Uuid,
        options: &[SwapOption],
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if !options
            .iter()
            .any(|o| o.id == option_id && o.proposal_id == self.id)
        {
            return Err(AppError::NotFound(
                "Option does not belong to this proposal".into(),
            ));
        }
        if self.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Proposal is {:?}, expected open",
                self.status
            )));
        }
        if now >= self.expired_at {
            return Err(AppError::InvalidState("Proposal has expired".into()));
        }
        self.status = SwapProposalStatus::Fulfilled;
        self.fulfill_by = Some(fulfill_by);
        self.fulfilled_with_option_id = Some(option_id);
        self.updated_at = now;
        Ok(())
    }

    /// Transition `Open -> Cancelled`, the owner withdrawing the proposal.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Proposal is {:?}, expected open",
                self.status
            )));
        }
        self.status = SwapProposalStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Transition `Open -> Expired`, driven by the time-based sweep.
    ///
    /// A sweep over an already-terminal proposal is a no-op, not an error;
    /// returns whether the state changed. Sweeping an open proposal before
    /// its deadline is a caller bug and fails.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<bool, AppError> {
        if self.is_terminal() {
            return Ok(false);
        }
        if now < self.expired_at {
            return Err(AppError::InvalidState(
                "Proposal has not reached its deadline".into(),
            ));
        }
        self.status = SwapProposalStatus::Expired;
        self.updated_at = now;
        Ok(true)
    }
}

impl ProposalDetail {
    /// Creates a new open proposal aggregate from `CreateProposalRequest`,
    /// the owner's id and the owner's chain address at this instant.
    /// Child rows get fresh ids, back-references and creation-order ordinals;
    /// `search_text` is derived from the assembled content.
    pub fn new(input: CreateProposalRequest, owner_id: Uuid, owner_address: String) -> Self {
        let now = Utc::now();
        let proposal_id = Uuid::new_v4();

        let offer_items: Vec<SwapItem> = input
            .offer_items
            .into_iter()
            .enumerate()
            .map(|(i, asset)| SwapItem {
                id: Uuid::new_v4(),
                proposal_id,
                item_type: asset.item_type,
                contract_address: asset.contract_address,
                token_id: asset.token_id,
                amount: asset.amount,
                ordinal: i as i32,
                created_at: now,
            })
            .collect();

        let swap_options: Vec<SwapOption> = input
            .swap_options
            .into_iter()
            .enumerate()
            .map(|(i, asset)| SwapOption {
                id: Uuid::new_v4(),
                proposal_id,
                item_type: asset.item_type,
                contract_address: asset.contract_address,
                token_id: asset.token_id,
                amount: asset.amount,
                ordinal: i as i32,
                created_at: now,
            })
            .collect();

        let note = input.note.unwrap_or_default();
        let search_text = build_search_text(&note, &owner_address, &offer_items, &swap_options);

        Self {
            proposal: SwapProposal {
                id: proposal_id,
                owner_id,
                owner_address,
                fulfill_by: None,
                fulfilled_with_option_id: None,
                expired_at: input.expired_at,
                status: SwapProposalStatus::Open,
                note,
                search_text,
                created_at: now,
                updated_at: now,
            },
            offer_items,
            swap_options,
        }
    }
}
