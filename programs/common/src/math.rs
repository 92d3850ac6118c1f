//! Fixed-point math utilities
//!
//! Prices and quantities carry 6 decimals; every product goes through 128
//! bits before scaling back down.

/// Fixed-point precision (6 decimals)
pub const PRICE_DECIMALS: u32 = 6;
pub const PRICE_MULTIPLIER: u64 = 1_000_000;

/// Basis-point denominator
pub const BPS_DENOM: u128 = 10_000;

/// Raw 128-bit product of two u64 values
#[inline]
pub fn mul_u64(a: u64, b: u64) -> u128 {
    (a as u128) * (b as u128)
}

/// Notional value of qty at price, scaled back to 1e6 money units
#[inline]
pub fn notional(qty: u64, price: u64) -> u128 {
    mul_u64(qty, price) / (PRICE_MULTIPLIER as u128)
}

/// VWAP from the raw price-weighted quantity sum
#[inline]
pub fn calculate_vwap(weighted_sum: u128, total_qty: u64) -> u64 {
    if total_qty == 0 {
        return 0;
    }
    (weighted_sum / (total_qty as u128)) as u64
}

/// Fee on a notional amount at fee_bps
#[inline]
pub fn fee_from_notional(notional: u128, fee_bps: u64) -> u128 {
    notional.saturating_mul(fee_bps as u128) / BPS_DENOM
}

/// Fee with a signed rate; negative rates are rebates, returned as the
/// magnitude (the caller credits instead of debiting)
#[inline]
pub fn fee_from_notional_signed(notional: u128, fee_bps: i64) -> u128 {
    fee_from_notional(notional, fee_bps.unsigned_abs())
}

/// Position PnL: qty * (current - entry), scaled to money units
#[inline]
pub fn calculate_pnl(qty: i64, entry_price: u64, current_price: u64) -> i128 {
    let diff = (current_price as i128) - (entry_price as i128);
    (qty as i128) * diff / (PRICE_MULTIPLIER as i128)
}

/// Funding owed since the snapshot: qty * (cum_now - cum_entry), scaled
#[inline]
pub fn calculate_funding_payment(qty: i64, cum_now: i128, cum_entry: i128) -> i128 {
    (qty as i128) * (cum_now - cum_entry) / (PRICE_MULTIPLIER as i128)
}

/// Margin requirement: |qty| * mark * ratio_bps, scaled to money units
#[inline]
pub fn calculate_margin(qty: i64, mark_price: u64, ratio_bps: u64) -> u128 {
    let value = notional(qty.unsigned_abs(), mark_price);
    value.saturating_mul(ratio_bps as u128) / BPS_DENOM
}

/// Absolute divergence between two prices in basis points of the reference
#[inline]
pub fn divergence_bps(price: u64, reference: u64) -> u128 {
    if reference == 0 {
        return u128::MAX;
    }
    let delta = if price > reference {
        price - reference
    } else {
        reference - price
    };
    mul_u64(delta, 1) * BPS_DENOM / (reference as u128)
}

/// Clamp a price into reference +/- band_bps
#[inline]
pub fn clamp_to_band(price: u64, reference: u64, band_bps: u64) -> u64 {
    let band = (mul_u64(reference, band_bps) / BPS_DENOM) as u64;
    let lo = reference.saturating_sub(band);
    let hi = reference.saturating_add(band);
    price.clamp(lo, hi)
}

/// Check price alignment to tick
#[inline]
pub fn is_tick_aligned(price: u64, tick: u64) -> bool {
    tick != 0 && price % tick == 0
}

/// Check quantity alignment to lot
#[inline]
pub fn is_lot_aligned(qty: u64, lot: u64) -> bool {
    lot != 0 && qty % lot == 0
}
