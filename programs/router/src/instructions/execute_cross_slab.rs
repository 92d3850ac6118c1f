//! ExecuteCrossSlab: atomic reserve fan-out followed by commit fan-out
//!
//! Both phases run inside one transaction, so either every slab commits or
//! the host chain rolls the whole route back. No partial commit is ever
//! observable.

use crate::instructions::multi_commit::{process_multi_commit, RouteCommitSummary};
use crate::instructions::multi_reserve::{process_multi_reserve, SlabSplit};
use crate::state::{Portfolio, SlabRegistry};
use percolator_common::*;
use pinocchio::{account_info::AccountInfo, pubkey::Pubkey};

/// Execute a full cross-slab route
#[allow(clippy::too_many_arguments)]
pub fn process_execute_cross_slab(
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
) -> Result<RouteCommitSummary, PercolatorError> {
    let mut route = process_multi_reserve(
        portfolio,
        registry,
        router_authority,
        authority_bump,
        user,
        mint,
        slab_accounts,
        splits,
        min_fill,
        ttl_ms,
        route_id,
        now_ms,
    )?;

    process_multi_commit(
        portfolio,
        router_authority,
        authority_bump,
        user,
        mint,
        slab_accounts,
        &mut route,
        now_ms,
    )
}
