//! LiquidateUser: route a liquidation into a slab
//!
//! Callable by anyone. The slab itself re-verifies that the target is
//! below maintenance margin; the router forwards the call and folds the
//! realized loss into the portfolio's equity.

use crate::cpi::{cpi_liquidate, LiquidationResponse};
use crate::state::{Portfolio, SlabRegistry};
use percolator_common::*;
use pinocchio::account_info::AccountInfo;

/// Process liquidate_user
#[allow(clippy::too_many_arguments)]
pub fn process_liquidate_user(
    portfolio: &mut Portfolio,
    registry: &SlabRegistry,
    router_authority: &AccountInfo,
    authority_bump: u8,
    slab_program: &AccountInfo,
    slab_state: &AccountInfo,
    target_account_idx: u32,
    instrument_idx: u16,
    qty_limit: u64,
    now_ms: u64,
) -> Result<LiquidationResponse, PercolatorError> {
    if qty_limit == 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    let (_, entry) = registry
        .find_by_state(slab_state.key())
        .ok_or(PercolatorError::Unauthorized)?;
    if &entry.program_id != slab_program.key() {
        return Err(PercolatorError::Unauthorized);
    }

    let resp = cpi_liquidate(
        slab_program,
        slab_state,
        router_authority,
        authority_bump,
        target_account_idx,
        instrument_idx,
        qty_limit,
        now_ms,
    )?;

    // The realized loss and penalty have already settled in slab cash;
    // mirror them into the portfolio's equity view
    let settled = resp.realized_pnl.saturating_sub(resp.penalty as i128);
    portfolio.equity = portfolio.equity.saturating_add(settled);
    portfolio.cash = portfolio.cash.saturating_add(settled);
    portfolio.update_margin(portfolio.im, portfolio.mm, now_ms);

    Ok(resp)
}
