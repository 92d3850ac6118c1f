//! Unit tests for slab operations
//!
//! The full SlabState is several megabytes, so every fixture heap-allocates
//! it zeroed and initializes in place, the same way the program does over
//! the account bytes.

extern crate alloc;

use alloc::boxed::Box;

use crate::instructions::*;
use crate::matching::book::{best_price, maybe_roll_epoch};
use crate::matching::commit::{cancel, commit, find_reservation};
use crate::matching::funding::update_funding;
use crate::matching::liquidate::liquidate;
use crate::matching::reserve::ReserveResult;
use crate::matching::risk::{calculate_equity, get_position_qty, is_liquidatable};
use crate::state::*;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

const NOW: u64 = 1_000;
const BTC: u16 = 0;
const PX_100: u64 = 100_000_000;
const PX_101: u64 = 101_000_000;
const PX_102: u64 = 102_000_000;
const ONE: u64 = 1_000_000;
const HALF: u64 = 500_000;
const LOT: u64 = 1_000;

fn test_params() -> SlabParams {
    SlabParams {
        imr_bps: 500,
        mmr_bps: 250,
        maker_fee_bps: -5,
        taker_fee_bps: 20,
        batch_ms: 100,
        freeze_levels: 3,
        _padding: [0; 6],
        kill_band_bps: 100,
        arg_tax_bps: 50,
        ttl_max_ms: 120_000,
        cap_ttl_max_ms: 120_000,
        liq_penalty_bps: 500,
        mark_bound_bps: 50,
    }
}

fn user(n: u8) -> Pubkey {
    Pubkey::from([n; 32])
}

fn create_test_slab() -> Box<SlabState> {
    let mut slab = unsafe {
        let layout = alloc::alloc::Layout::new::<SlabState>();
        let ptr = alloc::alloc::alloc_zeroed(layout) as *mut SlabState;
        if ptr.is_null() {
            alloc::alloc::handle_alloc_error(layout);
        }
        Box::from_raw(ptr)
    };

    slab.init(user(1), user(2), test_params(), 0);
    slab.add_instrument(*b"BTC-PERP", 1_000, LOT, LOT, PX_100)
        .unwrap();
    slab
}

fn fund(slab: &mut SlabState, n: u8, cash: i128) -> u32 {
    let idx = slab.find_or_create_account(&user(n)).unwrap();
    slab.get_account_mut(idx).unwrap().cash = cash;
    idx
}

/// Post a live maker order (DLP class posts immediately)
fn seed_order(slab: &mut SlabState, maker: u8, side: Side, px: u64, qty: u64) -> u64 {
    process_place_order(
        slab,
        &user(maker),
        BTC,
        side,
        px,
        qty,
        TimeInForce::GTC,
        MakerClass::Dlp,
        NOW,
    )
    .unwrap()
}

fn do_reserve(
    slab: &mut SlabState,
    account_idx: u32,
    side: Side,
    qty: u64,
    limit_px: u64,
    now: u64,
) -> Result<ReserveResult, PercolatorError> {
    process_reserve(
        slab,
        account_idx,
        BTC,
        side,
        qty,
        limit_px,
        60_000,
        TimeInForce::GTC,
        [0; 32],
        7,
        now,
    )
}

fn find_position(slab: &SlabState, account_idx: u32) -> Option<Position> {
    let mut pos_idx = slab.get_account(account_idx)?.position_head;
    while pos_idx != NIL {
        let pos = slab.positions.get(pos_idx)?;
        if pos.instrument_idx == BTC {
            return Some(*pos);
        }
        pos_idx = pos.next_in_account;
    }
    None
}

/// I1 + I2: every order's reserved_qty equals the slice quantity claimed on
/// it, and every open reservation's qty equals its slice chain total.
fn assert_slice_accounting(slab: &SlabState) {
    for order_idx in 0..slab.orders.capacity() {
        let Some(order) = slab.orders.get(order_idx) else {
            continue;
        };
        let mut claimed = 0u64;
        for slice_idx in 0..slab.slices.capacity() {
            if let Some(slice) = slab.slices.get(slice_idx) {
                if slice.order_idx == order_idx {
                    claimed += slice.qty;
                }
            }
        }
        assert_eq!(order.reserved_qty, claimed, "I1 broken for order {}", order_idx);
    }

    for resv_idx in 0..slab.reservations.capacity() {
        let Some(resv) = slab.reservations.get(resv_idx) else {
            continue;
        };
        if resv.committed {
            continue;
        }
        let mut total = 0u64;
        let mut weighted = 0u128;
        let mut slice_idx = resv.slice_head;
        while slice_idx != NIL {
            let slice = slab.slices.get(slice_idx).unwrap();
            total += slice.qty;
            weighted += mul_u64(slice.qty, slice.price);
            slice_idx = slice.next;
        }
        assert_eq!(resv.qty, total, "I2 qty broken for hold {}", resv.hold_id);
        assert_eq!(
            resv.vwap_px,
            calculate_vwap(weighted, total),
            "I2 vwap broken for hold {}",
            resv.hold_id
        );
    }
}

/// I3: bid prices non-increasing, ask prices non-decreasing, arrival order
/// within a level
fn assert_book_sorted(slab: &SlabState) {
    for (side, head) in [
        (Side::Buy, slab.instruments[BTC as usize].bids_head),
        (Side::Sell, slab.instruments[BTC as usize].asks_head),
    ] {
        let mut curr = head;
        let mut prev: Option<(u64, u64)> = None;
        while curr != NIL {
            let order = slab.orders.get(curr).unwrap();
            if let Some((prev_px, prev_id)) = prev {
                match side {
                    Side::Buy => assert!(order.price <= prev_px, "I3 bid order broken"),
                    Side::Sell => assert!(order.price >= prev_px, "I3 ask order broken"),
                }
                if order.price == prev_px {
                    assert!(order.order_id > prev_id, "I3 arrival order broken");
                }
            }
            prev = Some((order.price, order.order_id));
            curr = order.next;
        }
    }
}

mod reserve_commit {
    use super::*;

    #[test]
    fn basic_fill() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        assert_eq!(resv.filled_qty, ONE);
        assert_eq!(resv.vwap_px, PX_100);
        assert_eq!(resv.max_charge, 100_200_000);
        assert_slice_accounting(&slab);

        let fill = commit(&mut slab, resv.hold_id, NOW + 1).unwrap();
        assert_eq!(fill.filled_qty, ONE);
        assert_eq!(fill.vwap_px, PX_100);
        assert_eq!(fill.notional, 100_000_000);
        assert_eq!(fill.total_fee, 200_000);
        assert_eq!(fill.total_debit, 100_200_000);

        // Maker fully consumed and freed
        assert_eq!(slab.orders.used(), 0);
        assert_eq!(best_price(&slab, BTC, Side::Sell), None);

        let pos = find_position(&slab, taker).unwrap();
        assert_eq!(pos.qty, ONE as i64);
        assert_eq!(pos.entry_px, PX_100);

        // Maker carries the opposite side
        let maker_idx = slab.find_or_create_account(&user(10)).unwrap();
        assert_eq!(get_position_qty(&slab, maker_idx, BTC), -(ONE as i64));

        // Trade recorded
        assert_eq!(slab.trade_count, 1);
        assert_eq!(slab.trades[0].price, PX_100);
        assert_eq!(slab.trades[0].qty, ONE);
        assert_slice_accounting(&slab);
    }

    #[test]
    fn multi_level_walk() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, HALF);
        seed_order(&mut slab, 10, Side::Sell, PX_101, HALF);
        let deep = seed_order(&mut slab, 10, Side::Sell, PX_102, HALF);

        assert_book_sorted(&slab);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        assert_eq!(resv.filled_qty, ONE);
        assert_eq!(resv.vwap_px, 100_500_000);
        assert_eq!(resv.worst_px, PX_101);

        // Third level untouched
        let deep_idx = find_order_by_id(&slab, deep).unwrap();
        assert_eq!(slab.orders.get(deep_idx).unwrap().reserved_qty, 0);
        assert_slice_accounting(&slab);
    }

    #[test]
    fn empty_book_rejects() {
        let mut slab = create_test_slab();
        let taker = fund(&mut slab, 11, 1_000_000_000);

        assert_eq!(
            do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap_err(),
            PercolatorError::InsufficientLiquidity
        );
        assert_eq!(slab.reservations.used(), 0);
        assert_eq!(slab.slices.used(), 0);
    }

    #[test]
    fn full_depth_then_one_more_lot() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        // Exactly the available depth
        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        assert_eq!(resv.filled_qty, ONE);
        cancel(&mut slab, resv.hold_id, NOW).unwrap();

        // One lot more: default policy takes the partial
        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE + LOT, PX_101, NOW).unwrap();
        assert_eq!(resv.filled_qty, ONE);
        cancel(&mut slab, resv.hold_id, NOW).unwrap();

        // Fill-or-kill refuses and leaves the book untouched
        let err = process_reserve(
            &mut slab,
            taker,
            BTC,
            Side::Buy,
            ONE + LOT,
            PX_101,
            60_000,
            TimeInForce::FOK,
            [0; 32],
            7,
            NOW,
        )
        .unwrap_err();
        assert_eq!(err, PercolatorError::InsufficientLiquidity);

        let ask_idx = slab.instruments[BTC as usize].asks_head;
        assert_eq!(slab.orders.get(ask_idx).unwrap().reserved_qty, 0);
        assert_slice_accounting(&slab);
    }

    #[test]
    fn commit_at_expiry_fails_before_expiry_succeeds() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = process_reserve(
            &mut slab,
            taker,
            BTC,
            Side::Buy,
            HALF,
            PX_101,
            10_000,
            TimeInForce::GTC,
            [0; 32],
            7,
            NOW,
        )
        .unwrap();
        assert_eq!(resv.expiry_ms, NOW + 10_000);

        // At exactly expiry_ms the commit is dead
        assert_eq!(
            commit(&mut slab, resv.hold_id, resv.expiry_ms).unwrap_err(),
            PercolatorError::Expired
        );
        // The failed commit released the hold
        assert!(find_reservation(&slab, resv.hold_id).is_none());

        // Fresh hold, one tick earlier: fills
        let resv = process_reserve(
            &mut slab,
            taker,
            BTC,
            Side::Buy,
            HALF,
            PX_101,
            10_000,
            TimeInForce::GTC,
            [0; 32],
            8,
            NOW,
        )
        .unwrap();
        assert!(commit(&mut slab, resv.hold_id, resv.expiry_ms - 1).is_ok());
    }

    #[test]
    fn commit_twice_reports_already_committed() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW + 1).unwrap();

        assert_eq!(
            commit(&mut slab, resv.hold_id, NOW + 2).unwrap_err(),
            PercolatorError::AlreadyCommitted
        );
        assert_eq!(
            cancel(&mut slab, resv.hold_id, NOW + 2).unwrap_err(),
            PercolatorError::AlreadyCommitted
        );
    }

    #[test]
    fn reserve_cancel_restores_book() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        let ask = seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let orders_used = slab.orders.used();
        let resv = do_reserve(&mut slab, taker, Side::Buy, 600_000, PX_101, NOW).unwrap();

        let ask_idx = find_order_by_id(&slab, ask).unwrap();
        assert_eq!(slab.orders.get(ask_idx).unwrap().reserved_qty, 600_000);

        cancel(&mut slab, resv.hold_id, NOW).unwrap();

        assert_eq!(slab.orders.get(ask_idx).unwrap().reserved_qty, 0);
        assert_eq!(slab.orders.used(), orders_used);
        assert_eq!(slab.reservations.used(), 0);
        assert_eq!(slab.slices.used(), 0);
        assert_slice_accounting(&slab);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, HALF, PX_101, NOW).unwrap();
        assert!(cancel(&mut slab, resv.hold_id, NOW).is_ok());
        assert!(cancel(&mut slab, resv.hold_id, NOW).is_ok());
        assert!(cancel(&mut slab, 999_999, NOW).is_ok());
    }

    #[test]
    fn price_time_priority_within_level() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        fund(&mut slab, 12, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);

        // Two makers at one price; the earlier arrival fills first
        let first = seed_order(&mut slab, 10, Side::Sell, PX_100, HALF);
        let second = seed_order(&mut slab, 12, Side::Sell, PX_100, HALF);
        assert_book_sorted(&slab);

        let resv = do_reserve(&mut slab, taker, Side::Buy, HALF, PX_101, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW).unwrap();

        // The first order is consumed, the second untouched
        assert!(find_order_by_id(&slab, first).is_none());
        let idx = find_order_by_id(&slab, second).unwrap();
        assert_eq!(slab.orders.get(idx).unwrap().qty, HALF);
    }

    #[test]
    fn ioc_accepts_partial_fill() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, HALF);

        let resv = process_reserve(
            &mut slab,
            taker,
            BTC,
            Side::Buy,
            ONE,
            PX_101,
            60_000,
            TimeInForce::IOC,
            [0; 32],
            7,
            NOW,
        )
        .unwrap();
        assert_eq!(resv.filled_qty, HALF);
    }

    #[test]
    fn funding_settles_on_partial_reduce() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW).unwrap();

        // 1.0 of funding accrues per unit, then half the position closes
        slab.instruments[BTC as usize].cum_funding = 1_000_000;
        seed_order(&mut slab, 10, Side::Buy, PX_100, HALF);
        let resv = do_reserve(&mut slab, taker, Side::Sell, HALF, PX_100, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW).unwrap();

        // The touch settled funding on the whole old position, and the
        // snapshot advanced so it cannot settle twice
        let cash_after = slab.get_account(taker).unwrap().cash;
        let pos = find_position(&slab, taker).unwrap();
        assert_eq!(pos.qty, HALF as i64);
        assert_eq!(pos.last_funding, 1_000_000);
        // +1.0 funding, -0.25 ARG tax (50 bps of the 50.0 roundtrip)
        assert_eq!(cash_after, 1_000_000_000 + 1_000_000 - 250_000);

        let equity = calculate_equity(&slab, taker).unwrap();
        assert_eq!(equity, cash_after);
    }

    #[test]
    fn split_reserves_match_single_reserve() {
        let mut slab_a = create_test_slab();
        fund(&mut slab_a, 10, 1_000_000_000_000);
        let taker_a = fund(&mut slab_a, 11, 1_000_000_000);
        let ask_a = seed_order(&mut slab_a, 10, Side::Sell, PX_100, ONE);

        let r1 = do_reserve(&mut slab_a, taker_a, Side::Buy, 400_000, PX_101, NOW).unwrap();
        let r2 = do_reserve(&mut slab_a, taker_a, Side::Buy, 600_000, PX_101, NOW).unwrap();
        assert_eq!(r1.filled_qty + r2.filled_qty, ONE);

        let mut slab_b = create_test_slab();
        fund(&mut slab_b, 10, 1_000_000_000_000);
        let taker_b = fund(&mut slab_b, 11, 1_000_000_000);
        let ask_b = seed_order(&mut slab_b, 10, Side::Sell, PX_100, ONE);

        let r = do_reserve(&mut slab_b, taker_b, Side::Buy, ONE, PX_101, NOW).unwrap();
        assert_eq!(r.filled_qty, ONE);
        assert_eq!(r.vwap_px, r2.vwap_px);

        let idx_a = find_order_by_id(&slab_a, ask_a).unwrap();
        let idx_b = find_order_by_id(&slab_b, ask_b).unwrap();
        assert_eq!(
            slab_a.orders.get(idx_a).unwrap().reserved_qty,
            slab_b.orders.get(idx_b).unwrap().reserved_qty
        );
        assert_eq!(slab_a.slices.used(), 2);
        assert_eq!(slab_b.slices.used(), 1);
        assert_slice_accounting(&slab_a);
        assert_slice_accounting(&slab_b);
    }
}

mod anti_toxicity {
    use super::*;

    #[test]
    fn kill_band_blocks_reserve_until_mark_recovers() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        // Mark drifts 2% above index; kill band is 1%
        slab.instruments[BTC as usize].mark_price = PX_102;

        assert_eq!(
            do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap_err(),
            PercolatorError::KillBandBreached
        );

        // Funding update clamps the mark back into the band (100.5)
        update_funding(&mut slab, BTC, PX_100, NOW + 10).unwrap();
        assert_eq!(slab.instruments[BTC as usize].mark_price, 100_500_000);

        assert!(do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW + 10).is_ok());
    }

    #[test]
    fn roundtrip_in_same_epoch_pays_arg_tax() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        let buy = commit(&mut slab, resv.hold_id, NOW).unwrap();
        assert_eq!(buy.total_fee, 200_000);

        seed_order(&mut slab, 10, Side::Buy, PX_100, ONE);
        let resv = do_reserve(&mut slab, taker, Side::Sell, ONE, PX_100, NOW).unwrap();
        let sell = commit(&mut slab, resv.hold_id, NOW).unwrap();

        // 50 bps of the roundtripped 100.0 notional
        assert_eq!(sell.total_fee, 200_000 + 500_000);
        assert_eq!(slab.header.insurance_fund, 500_000);
        assert_eq!(
            slab.get_account(taker).unwrap().cash,
            1_000_000_000 - 500_000
        );
    }

    #[test]
    fn roundtrip_across_epochs_is_untaxed() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW).unwrap();

        seed_order(&mut slab, 10, Side::Buy, PX_100, ONE);
        let resv = do_reserve(&mut slab, taker, Side::Sell, ONE, PX_100, NOW).unwrap();

        // The batch window (100 ms) has passed; the epoch rolls at commit
        let sell = commit(&mut slab, resv.hold_id, NOW + 150).unwrap();
        assert_eq!(sell.total_fee, 200_000);
        assert_eq!(slab.header.insurance_fund, 0);
    }

    #[test]
    fn crossing_regular_order_waits_one_epoch() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        fund(&mut slab, 12, 1_000_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        // Regular order at the best opposing price parks Pending
        let epoch = slab.instruments[BTC as usize].epoch;
        let pending_id = process_place_order(
            &mut slab,
            &user(12),
            BTC,
            Side::Buy,
            PX_100,
            ONE,
            TimeInForce::GTC,
            MakerClass::Regular,
            NOW,
        )
        .unwrap();

        let idx = find_order_by_id(&slab, pending_id).unwrap();
        let order = slab.orders.get(idx).unwrap();
        assert_eq!(order.state, OrderState::Pending);
        assert_eq!(order.eligible_epoch, epoch.wrapping_add(1));
        assert_eq!(best_price(&slab, BTC, Side::Buy), None);

        // Identical order in DLP class posts live immediately
        let dlp_id = process_place_order(
            &mut slab,
            &user(10),
            BTC,
            Side::Buy,
            PX_100,
            ONE,
            TimeInForce::GTC,
            MakerClass::Dlp,
            NOW,
        )
        .unwrap();
        let idx = find_order_by_id(&slab, dlp_id).unwrap();
        assert_eq!(slab.orders.get(idx).unwrap().state, OrderState::Live);
        assert_eq!(best_price(&slab, BTC, Side::Buy), Some(PX_100));
    }

    #[test]
    fn pending_order_promotes_at_next_epoch() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        fund(&mut slab, 12, 1_000_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let pending_id = process_place_order(
            &mut slab,
            &user(12),
            BTC,
            Side::Buy,
            PX_100,
            ONE,
            TimeInForce::GTC,
            MakerClass::Regular,
            NOW,
        )
        .unwrap();

        maybe_roll_epoch(&mut slab, BTC, NOW + 150).unwrap();

        let idx = find_order_by_id(&slab, pending_id).unwrap();
        assert_eq!(slab.orders.get(idx).unwrap().state, OrderState::Live);
        assert_eq!(best_price(&slab, BTC, Side::Buy), Some(PX_100));
        assert_book_sorted(&slab);
    }

    #[test]
    fn reserve_budget_per_epoch() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        for _ in 0..RESERVES_PER_EPOCH_MAX {
            let resv = do_reserve(&mut slab, taker, Side::Buy, LOT, PX_101, NOW).unwrap();
            cancel(&mut slab, resv.hold_id, NOW).unwrap();
        }

        assert_eq!(
            do_reserve(&mut slab, taker, Side::Buy, LOT, PX_101, NOW).unwrap_err(),
            PercolatorError::RateLimited
        );

        // A new epoch resets the budget
        assert!(do_reserve(&mut slab, taker, Side::Buy, LOT, PX_101, NOW + 150).is_ok());
    }
}

mod expiry {
    use super::*;

    #[test]
    fn sweep_reclaims_bounded_batches() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, 64 * LOT);

        let taker = fund(&mut slab, 11, 1_000_000_000);
        for _ in 0..20 {
            process_reserve(
                &mut slab,
                taker,
                BTC,
                Side::Buy,
                LOT,
                PX_101,
                10,
                TimeInForce::GTC,
                [0; 32],
                7,
                NOW,
            )
            .unwrap();
        }
        assert_eq!(slab.reservations.used(), 20);

        // Everything has expired; one entry point reclaims exactly one batch
        // from the cursor onward
        slab.header.sweep_cursor = 0;
        let probe = fund(&mut slab, 12, 1_000_000_000);
        do_reserve(&mut slab, probe, Side::Buy, LOT, PX_101, NOW + 1_000).unwrap();

        assert_eq!(slab.reservations.used(), 20 - EXPIRY_SWEEP_MAX + 1);

        // Subsequent entry points drain the rest
        let mut rounds = 0;
        while slab.reservations.used() > 1 && rounds < 16 {
            slab.header.sweep_cursor = 0;
            let resv = do_reserve(&mut slab, probe, Side::Buy, LOT, PX_101, NOW + 1_000).unwrap();
            cancel(&mut slab, resv.hold_id, NOW + 1_000).unwrap();
            rounds += 1;
        }
        assert_eq!(slab.reservations.used(), 1);
        assert_slice_accounting(&slab);
    }

    #[test]
    fn arena_exhaustion_recovers_after_expiry() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, i128::MAX / 4);
        let depth = (MAX_RESERVATIONS as u64 + 16) * LOT;
        seed_order(&mut slab, 10, Side::Sell, PX_100, depth);

        // Fill the reservation arena from enough accounts to stay inside
        // the per-epoch budget
        let mut account = 0u32;
        let mut made = 0usize;
        let mut key = 20u8;
        while made < MAX_RESERVATIONS {
            if made % (RESERVES_PER_EPOCH_MAX as usize) == 0 {
                account = fund(&mut slab, key, 1_000_000_000);
                key = key.wrapping_add(1);
            }
            process_reserve(
                &mut slab,
                account,
                BTC,
                Side::Buy,
                LOT,
                PX_101,
                10,
                TimeInForce::GTC,
                [0; 32],
                made as u64,
                NOW,
            )
            .unwrap();
            made += 1;
        }
        assert!(slab.reservations.is_full());

        // While nothing has expired the arena is genuinely full
        let probe = fund(&mut slab, 200, 1_000_000_000);
        assert_eq!(
            do_reserve(&mut slab, probe, Side::Buy, LOT, PX_101, NOW).unwrap_err(),
            PercolatorError::ArenaFull
        );

        // After expiry the lazy sweep frees room for new holds
        assert!(do_reserve(&mut slab, probe, Side::Buy, LOT, PX_101, NOW + 1_000).is_ok());
        assert!(slab.reservations.used() < MAX_RESERVATIONS as u32);
    }
}

mod risk_and_funding {
    use super::*;

    #[test]
    fn undercollateralized_order_rejected() {
        let mut slab = create_test_slab();
        // Account exists but holds nothing
        fund(&mut slab, 13, 0);

        let err = process_place_order(
            &mut slab,
            &user(13),
            BTC,
            Side::Buy,
            PX_100,
            ONE,
            TimeInForce::GTC,
            MakerClass::Regular,
            NOW,
        )
        .unwrap_err();
        assert_eq!(err, PercolatorError::InsufficientCollateral);

        // 5% IM on 100.0 notional needs exactly 5.0 of equity
        fund(&mut slab, 13, 5_000_000);
        assert!(process_place_order(
            &mut slab,
            &user(13),
            BTC,
            Side::Buy,
            PX_100,
            ONE,
            TimeInForce::GTC,
            MakerClass::Regular,
            NOW,
        )
        .is_ok());
    }

    #[test]
    fn funding_accrues_at_the_posted_rate() {
        let mut slab = create_test_slab();
        slab.instruments[BTC as usize].last_funding_ts = NOW;
        slab.instruments[BTC as usize].funding_rate = 100;

        // One hour at 100 bps/h over a 100.0 index: 1.0 per unit
        update_funding(&mut slab, BTC, PX_100, NOW + 3_600_000).unwrap();
        assert_eq!(slab.instruments[BTC as usize].cum_funding, 1_000_000);
        // Mark equals index, so the fresh premium rate is zero
        assert_eq!(slab.instruments[BTC as usize].funding_rate, 0);
        assert_eq!(slab.instruments[BTC as usize].last_funding_ts, NOW + 3_600_000);
    }

    #[test]
    fn funding_settles_into_position_equity() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW).unwrap();

        // Accrue 1.0 per unit of cumulative funding
        slab.instruments[BTC as usize].cum_funding = 1_000_000;

        let equity = calculate_equity(&slab, taker).unwrap();
        assert_eq!(equity, 1_000_000_000 + 1_000_000);
    }

    #[test]
    fn liquidation_closes_worst_exposure() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 6_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW).unwrap();
        assert!(!is_liquidatable(&slab, taker).unwrap());

        // Index collapses to 80; the mark clamps down with it
        update_funding(&mut slab, BTC, 80_000_000, NOW + 10).unwrap();
        assert!(is_liquidatable(&slab, taker).unwrap());

        let insurance_before = slab.header.insurance_fund;
        let result = liquidate(&mut slab, taker, ONE, NOW + 20).unwrap();

        assert_eq!(result.closed_qty, ONE);
        assert!(result.penalty > 0);
        assert!(result.realized_pnl < 0);
        assert_eq!(
            slab.header.insurance_fund,
            insurance_before + result.penalty
        );
        assert!(find_position(&slab, taker).is_none());
        assert_eq!(slab.instruments[BTC as usize].open_interest, 0);
    }

    #[test]
    fn healthy_account_cannot_be_liquidated() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW).unwrap();

        assert_eq!(
            liquidate(&mut slab, taker, ONE, NOW).unwrap_err(),
            PercolatorError::InvalidArgument
        );
    }
}

mod orders {
    use super::*;

    #[test]
    fn cancel_order_blocked_while_reserved() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        let ask = seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, HALF, PX_101, NOW).unwrap();

        assert_eq!(
            process_cancel_order(&mut slab, &user(10), ask).unwrap_err(),
            PercolatorError::InvalidArgument
        );

        cancel(&mut slab, resv.hold_id, NOW).unwrap();
        assert!(process_cancel_order(&mut slab, &user(10), ask).is_ok());
        assert_eq!(slab.orders.used(), 0);
    }

    #[test]
    fn cancel_order_requires_owner() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let ask = seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        assert_eq!(
            process_cancel_order(&mut slab, &user(11), ask).unwrap_err(),
            PercolatorError::Unauthorized
        );
    }

    #[test]
    fn modify_shrink_keeps_priority() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        fund(&mut slab, 12, 1_000_000_000_000);
        let first = seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);
        let second = seed_order(&mut slab, 12, Side::Sell, PX_100, ONE);

        let surviving =
            process_modify_order(&mut slab, &user(10), first, PX_100, HALF, NOW).unwrap();
        assert_eq!(surviving, first);

        // Still at the front of the level
        let head = slab.instruments[BTC as usize].asks_head;
        let order = slab.orders.get(head).unwrap();
        assert_eq!(order.order_id, first);
        assert_eq!(order.qty, HALF);

        // A price change is a fresh order behind the same-priced rest
        let moved =
            process_modify_order(&mut slab, &user(10), surviving, PX_100 + 1_000, HALF, NOW)
                .unwrap();
        assert_ne!(moved, first);
        let head = slab.instruments[BTC as usize].asks_head;
        assert_eq!(slab.orders.get(head).unwrap().order_id, second);
        assert_book_sorted(&slab);
    }
}

mod admin {
    use super::*;

    #[test]
    fn halt_blocks_trading_until_resume() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        process_halt_trading(&mut slab).unwrap();
        assert_eq!(
            do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap_err(),
            PercolatorError::Halted
        );
        assert_eq!(
            process_place_order(
                &mut slab,
                &user(10),
                BTC,
                Side::Sell,
                PX_101,
                ONE,
                TimeInForce::GTC,
                MakerClass::Dlp,
                NOW,
            )
            .unwrap_err(),
            PercolatorError::Halted
        );

        process_resume_trading(&mut slab).unwrap();
        assert!(do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).is_ok());
    }

    #[test]
    fn corrupted_slice_freezes_the_slab() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        let ask = seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();

        // Forcibly recycle the maker order out from under the slice
        let ask_idx = find_order_by_id(&slab, ask).unwrap();
        crate::matching::book::remove_order(&mut slab, BTC, ask_idx).unwrap();
        slab.orders.free(ask_idx);

        let err = process_commit_fill(&mut slab, resv.hold_id, NOW, None).unwrap_err();
        assert_eq!(err, PercolatorError::StaleHandle);
        assert!(slab.header.is_frozen());

        // Frozen slab refuses every trading write
        assert_eq!(
            do_reserve(&mut slab, taker, Side::Buy, LOT, PX_101, NOW).unwrap_err(),
            PercolatorError::Halted
        );
    }

    #[test]
    fn reserve_argument_validation() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        seed_order(&mut slab, 10, Side::Sell, PX_100, ONE);

        // Misaligned price
        assert_eq!(
            do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101 + 1, NOW).unwrap_err(),
            PercolatorError::InvalidArgument
        );
        // Misaligned quantity
        assert_eq!(
            do_reserve(&mut slab, taker, Side::Buy, ONE + 1, PX_101, NOW).unwrap_err(),
            PercolatorError::InvalidArgument
        );
        // TTL over the deployment maximum
        assert_eq!(
            process_reserve(
                &mut slab,
                taker,
                BTC,
                Side::Buy,
                ONE,
                PX_101,
                TTL_MAX_MS + 1,
                TimeInForce::GTC,
                [0; 32],
                7,
                NOW,
            )
            .unwrap_err(),
            PercolatorError::InvalidArgument
        );
        // Unknown account
        assert_eq!(
            do_reserve(&mut slab, 4_000, Side::Buy, ONE, PX_101, NOW).unwrap_err(),
            PercolatorError::InvalidArgument
        );
    }

    #[test]
    fn mark_follows_trades_within_the_band() {
        let mut slab = create_test_slab();
        fund(&mut slab, 10, 1_000_000_000_000);
        let taker = fund(&mut slab, 11, 1_000_000_000);
        // 100.4 is inside the 0.5% band around the 100.0 index
        seed_order(&mut slab, 10, Side::Sell, 100_400_000, ONE);

        let resv = do_reserve(&mut slab, taker, Side::Buy, ONE, PX_101, NOW).unwrap();
        commit(&mut slab, resv.hold_id, NOW).unwrap();
        assert_eq!(slab.instruments[BTC as usize].mark_price, 100_400_000);
        assert_eq!(slab.instruments[BTC as usize].open_interest, ONE);
    }
}
