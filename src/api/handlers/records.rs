//! Listing handlers, one per record kind, plus burn lookup by block.
//!
//! Every listing accepts `cursor`, `count` and `filter` query parameters
//! (see [`ListQuery`]) and answers with a [`ListResponse`].

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ListQuery, ListResponse};
use crate::app_state::AppState;
use crate::domain::{
    BurnLedgerEntry, Contract, Delegation, Epoch, Record, RecordKind, RewardClaim, SwapState,
    TokenTransaction, Transaction, WithdrawRequest,
};
use crate::error::IndexError;
use crate::pagination::ListEngine;

async fn list_page<R: Record>(
    engine: &ListEngine<R>,
    state: &AppState,
    query: &ListQuery,
) -> Result<Json<ListResponse<R>>, IndexError> {
    let filter = query.filter()?;
    let count = query.count(state.default_page_size, state.max_page_size);
    let page = engine.list(filter, query.cursor.as_deref(), count).await?;
    Ok(Json(page.into()))
}

macro_rules! list_handler {
    ($name:ident, $engine:ident, $record:ty, $path:literal) => {
        #[doc = concat!("`GET /api/v1", $path, "`: one page of the listing.")]
        ///
        /// # Errors
        ///
        /// Returns [`IndexError`] for a bad cursor, page size or filter, or
        /// a storage failure.
        pub async fn $name(
            State(state): State<AppState>,
            Query(query): Query<ListQuery>,
        ) -> Result<Json<ListResponse<$record>>, IndexError> {
            list_page(&state.index.$engine, &state, &query).await
        }
    };
}

list_handler!(list_transactions, transactions, Transaction, "/transactions");
list_handler!(list_delegations, delegations, Delegation, "/delegations");
list_handler!(list_reward_claims, reward_claims, RewardClaim, "/reward-claims");
list_handler!(
    list_withdraw_requests,
    withdraw_requests,
    WithdrawRequest,
    "/withdraw-requests"
);
list_handler!(list_epochs, epochs, Epoch, "/epochs");
list_handler!(list_contracts, contracts, Contract, "/contracts");
list_handler!(
    list_token_transactions,
    token_transactions,
    TokenTransaction,
    "/token-transactions"
);
list_handler!(list_swaps, swaps, SwapState, "/swaps");
list_handler!(list_burns, burns, BurnLedgerEntry, "/burns");

/// `GET /api/v1/burns/{block}`: burn ledger entry of one block.
///
/// # Errors
///
/// Returns [`IndexError::RecordNotFound`] if nothing was burned in the
/// block, or a storage failure.
pub async fn get_burn(
    State(state): State<AppState>,
    Path(block): Path<u64>,
) -> Result<Json<BurnLedgerEntry>, IndexError> {
    state
        .index
        .burns
        .get(&block)
        .await?
        .map(Json)
        .ok_or_else(|| IndexError::not_found(RecordKind::Burn, block.to_string()))
}

/// Listing routes, relative to `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/delegations", get(list_delegations))
        .route("/reward-claims", get(list_reward_claims))
        .route("/withdraw-requests", get(list_withdraw_requests))
        .route("/epochs", get(list_epochs))
        .route("/contracts", get(list_contracts))
        .route("/token-transactions", get(list_token_transactions))
        .route("/swaps", get(list_swaps))
        .route("/burns", get(list_burns))
        .route("/burns/{block}", get(get_burn))
}
