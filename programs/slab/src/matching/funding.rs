//! Funding accrual and mark maintenance
//!
//! Funding accrues continuously in proportion to the mark-index premium.
//! All arithmetic is integer: premium in basis points, elapsed time in
//! milliseconds, rate normalized per hour.

use crate::state::SlabState;
use percolator_common::*;

/// Funding rate clamp (basis points per hour)
const FUNDING_RATE_CAP_BPS: i64 = 500;

const MS_PER_HOUR: i128 = 3_600_000;

/// Refresh the index price, accrue funding since the last update, and
/// re-clamp the mark price into the index band.
pub fn update_funding(
    slab: &mut SlabState,
    instrument_idx: u16,
    index_price: u64,
    now_ms: u64,
) -> Result<(), PercolatorError> {
    if index_price == 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    let mark_bound_bps = slab.header.params.mark_bound_bps;

    let instrument = slab
        .get_instrument_mut(instrument_idx)
        .ok_or(PercolatorError::InvalidArgument)?;

    // Premium of mark over index, in basis points, clamped
    let premium_bps = {
        let diff = (instrument.mark_price as i128) - (index_price as i128);
        let bps = diff * (BPS_DENOM as i128) / (index_price as i128);
        (bps as i64).clamp(-FUNDING_RATE_CAP_BPS, FUNDING_RATE_CAP_BPS)
    };

    // Accrue per-unit funding for the elapsed window at the previous rate
    let elapsed_ms = now_ms.saturating_sub(instrument.last_funding_ts) as i128;
    if elapsed_ms > 0 && instrument.last_funding_ts != 0 {
        let accrual = (index_price as i128) * (instrument.funding_rate as i128) * elapsed_ms
            / ((BPS_DENOM as i128) * MS_PER_HOUR);
        instrument.cum_funding = instrument.cum_funding.saturating_add(accrual);
    }

    instrument.funding_rate = premium_bps;
    instrument.last_funding_ts = now_ms;
    instrument.index_price = index_price;
    instrument.mark_price = clamp_to_band(instrument.mark_price, index_price, mark_bound_bps);

    slab.header.update_timestamp(now_ms);
    slab.header.increment_seqno();

    Ok(())
}
