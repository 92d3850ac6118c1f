//! Multi-slab commit: phase two of cross-slab routing
//!
//! Commits every leg inside the same atomic transaction. Each slab's final
//! charge debits that leg's capability; unused ceiling returns to free
//! collateral, exposures and margin re-aggregate, and the caps burn.

use crate::cpi::cpi_commit;
use crate::state::Portfolio;
use crate::instructions::multi_reserve::RouteReservation;
use percolator_common::*;
use pinocchio::{account_info::AccountInfo, pubkey::Pubkey};
use pinocchio_log::log;

/// Aggregate result of a committed route
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteCommitSummary {
    pub route_id: u64,
    pub total_filled: u64,
    pub blended_vwap: u64,
    pub total_fee: u128,
    pub total_debit: u128,
}

/// Commit every leg of a reserved route
#[allow(clippy::too_many_arguments)]
pub fn process_multi_commit(
    portfolio: &mut Portfolio,
    router_authority: &AccountInfo,
    authority_bump: u8,
    user: &Pubkey,
    mint: &Pubkey,
    slab_accounts: &[AccountInfo],
    route: &mut RouteReservation,
    now_ms: u64,
) -> Result<RouteCommitSummary, PercolatorError> {
    if slab_accounts.len() != route.leg_count as usize * 2 {
        return Err(PercolatorError::InvalidArgument);
    }

    let mut total_filled = 0u64;
    let mut weighted = 0u128;
    let mut total_fee = 0u128;
    let mut total_debit = 0u128;
    let mut im_add = 0u128;
    let mut mm_add = 0u128;

    for i in 0..route.leg_count as usize {
        let leg = &mut route.legs[i];
        let slab_program = &slab_accounts[i * 2];
        let slab_state = &slab_accounts[i * 2 + 1];

        let resp = cpi_commit(
            slab_program,
            slab_state,
            router_authority,
            authority_bump,
            leg.hold_id,
            now_ms,
        )?;

        // The slab's final charge consumes the leg capability; anything
        // beyond the authorized ceiling aborts the whole transaction
        leg.cap
            .debit(resp.total_debit, user, slab_state.key(), mint, now_ms)
            .map_err(|e| {
                log!("Error: leg debit exceeds capability");
                e
            })?;
        leg.cap.burn();

        let signed_fill = match leg.side {
            Side::Buy => resp.filled_qty as i64,
            Side::Sell => -(resp.filled_qty as i64),
        };
        portfolio.apply_fill(leg.slab_idx, leg.instrument_idx, signed_fill);

        im_add = im_add.saturating_add(calculate_margin(signed_fill, resp.vwap_px, leg.imr_bps));
        mm_add = mm_add.saturating_add(calculate_margin(signed_fill, resp.vwap_px, leg.mmr_bps));

        total_filled = total_filled.saturating_add(resp.filled_qty);
        weighted = weighted.saturating_add(mul_u64(resp.filled_qty, resp.vwap_px));
        total_fee = total_fee.saturating_add(resp.total_fee);
        total_debit = total_debit.saturating_add(resp.total_debit);
    }

    // Spent amount leaves the portfolio; the unused ceiling unlocks
    portfolio.settle_spend(route.total_max_charge, total_debit);
    portfolio.update_margin(
        portfolio.im.saturating_add(im_add),
        portfolio.mm.saturating_add(mm_add),
        now_ms,
    );

    Ok(RouteCommitSummary {
        route_id: route.route_id,
        total_filled,
        blended_vwap: calculate_vwap(weighted, total_filled),
        total_fee,
        total_debit,
    })
}
