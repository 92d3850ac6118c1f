//! Multi-slab reserve: phase one of cross-slab routing
//!
//! Reserves sequentially on every target slab, then locks the summed
//! charge ceiling out of the portfolio and mints one scoped capability per
//! slab. A short total fill unwinds every hold best-effort and rejects the
//! route.

use crate::cpi::{cpi_cancel, cpi_reserve};
use crate::state::{Cap, Portfolio, SlabRegistry};
use percolator_common::*;
use pinocchio::{account_info::AccountInfo, pubkey::Pubkey};
use pinocchio_log::log;

/// Maximum slabs per route
pub const MAX_SLABS_PER_ROUTE: usize = 8;

/// Per-slab allocation supplied by the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct SlabSplit {
    /// Taker's account index on the slab
    pub account_idx: u32,
    /// Instrument index on the slab
    pub instrument_idx: u16,
    /// Side
    pub side: Side,
    /// Quantity to reserve (1e6 scale)
    pub qty: u64,
    /// Worst acceptable price (1e6 scale)
    pub limit_px: u64,
}

/// One reserved leg of a route
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteLeg {
    /// Registry index of the slab
    pub slab_idx: u16,
    /// Instrument on that slab
    pub instrument_idx: u16,
    /// Side
    pub side: Side,
    /// Hold locked on the slab
    pub hold_id: u64,
    /// Filled quantity
    pub filled_qty: u64,
    /// Leg VWAP
    pub vwap_px: u64,
    /// Charge ceiling for this leg
    pub max_charge: u128,
    /// Hold expiry
    pub expiry_ms: u64,
    /// Margin ratios quoted by the registry
    pub imr_bps: u64,
    pub mmr_bps: u64,
    /// Capability minted for this leg
    pub cap: Cap,
}

/// A fully reserved route, ready for commit
pub struct RouteReservation {
    pub route_id: u64,
    pub leg_count: u8,
    pub legs: [RouteLeg; MAX_SLABS_PER_ROUTE],
    pub total_filled: u64,
    pub blended_vwap: u64,
    pub total_max_charge: u128,
}

/// Reserve across every target slab
#[allow(clippy::too_many_arguments)]
pub fn process_multi_reserve(
    portfolio: &mut Portfolio,
    registry: &SlabRegistry,
    router_authority: &AccountInfo,
    authority_bump: u8,
    user: &Pubkey,
    mint: &Pubkey,
    slab_accounts: &[AccountInfo],
    splits: &[SlabSplit],
    min_fill: u64,
    ttl_ms: u64,
    route_id: u64,
    now_ms: u64,
) -> Result<RouteReservation, PercolatorError> {
    if splits.is_empty() || splits.len() > MAX_SLABS_PER_ROUTE {
        return Err(PercolatorError::InvalidArgument);
    }
    if slab_accounts.len() != splits.len() * 2 {
        return Err(PercolatorError::InvalidArgument);
    }
    if &portfolio.user != user {
        return Err(PercolatorError::Unauthorized);
    }

    let mut legs = [RouteLeg::default(); MAX_SLABS_PER_ROUTE];
    let mut leg_count = 0usize;
    let mut total_filled = 0u64;
    let mut weighted = 0u128;
    let mut total_max_charge = 0u128;

    // Deterministic invocation order: exactly as the caller supplied
    for (i, split) in splits.iter().enumerate() {
        let slab_program = &slab_accounts[i * 2];
        let slab_state = &slab_accounts[i * 2 + 1];

        let (slab_idx, entry) = registry
            .find_by_state(slab_state.key())
            .ok_or(PercolatorError::Unauthorized)?;
        if &entry.program_id != slab_program.key() {
            return Err(PercolatorError::Unauthorized);
        }

        let resp = cpi_reserve(
            slab_program,
            slab_state,
            router_authority,
            authority_bump,
            split.account_idx,
            split.instrument_idx,
            split.side,
            split.qty,
            split.limit_px,
            ttl_ms,
            &[0; 32],
            route_id,
            TimeInForce::GTC,
        )?;

        legs[leg_count] = RouteLeg {
            slab_idx,
            instrument_idx: split.instrument_idx,
            side: split.side,
            hold_id: resp.hold_id,
            filled_qty: resp.filled_qty,
            vwap_px: resp.vwap_px,
            max_charge: resp.max_charge,
            expiry_ms: resp.expiry_ms,
            imr_bps: entry.imr_bps,
            mmr_bps: entry.mmr_bps,
            cap: Cap::new(
                portfolio.router_id,
                route_id,
                *user,
                *slab_state.key(),
                *mint,
                resp.max_charge,
                0,
                now_ms,
                ttl_ms,
                0,
            ),
        };
        leg_count += 1;

        total_filled = total_filled.saturating_add(resp.filled_qty);
        weighted = weighted.saturating_add(mul_u64(resp.filled_qty, resp.vwap_px));
        total_max_charge = total_max_charge.saturating_add(resp.max_charge);
    }

    if total_filled < min_fill || total_filled == 0 {
        log!("Error: route underfilled, unwinding holds");
        unwind_route(&legs[..leg_count], slab_accounts, router_authority, authority_bump);
        return Err(PercolatorError::InsufficientLiquidity);
    }

    // The whole charge ceiling locks out of free collateral before any
    // capability is considered live
    if let Err(e) = portfolio.lock_collateral(total_max_charge) {
        log!("Error: insufficient free collateral for route");
        unwind_route(&legs[..leg_count], slab_accounts, router_authority, authority_bump);
        return Err(e);
    }

    Ok(RouteReservation {
        route_id,
        leg_count: leg_count as u8,
        legs,
        total_filled,
        blended_vwap: calculate_vwap(weighted, total_filled),
        total_max_charge,
    })
}

/// Best-effort cancel of every hold taken so far
pub fn unwind_route(
    legs: &[RouteLeg],
    slab_accounts: &[AccountInfo],
    router_authority: &AccountInfo,
    authority_bump: u8,
) {
    for (i, leg) in legs.iter().enumerate() {
        let slab_program = &slab_accounts[i * 2];
        let slab_state = &slab_accounts[i * 2 + 1];
        let _ = cpi_cancel(
            slab_program,
            slab_state,
            router_authority,
            authority_bump,
            leg.hold_id,
        );
    }
}
