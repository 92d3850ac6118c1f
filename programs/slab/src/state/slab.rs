//! Main slab state: one repr(C) view over the 10 MB account

use super::header::{SlabHeader, SlabParams};
use super::pools::Pool;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Full slab state. Never constructed by value; always a typed view over
/// the borrowed account bytes, initialized in place.
#[repr(C)]
pub struct SlabState {
    /// Header with identity, params, counters
    pub header: SlabHeader,

    /// Account table
    pub accounts: [AccountState; MAX_ACCOUNTS],

    /// Instrument table
    pub instruments: [Instrument; MAX_INSTRUMENTS],
    pub instrument_count: u16,
    pub _padding: [u8; 6],

    /// Order pool
    pub orders: Pool<Order, MAX_ORDERS>,

    /// Position pool
    pub positions: Pool<Position, MAX_POSITIONS>,

    /// Reservation pool
    pub reservations: Pool<Reservation, MAX_RESERVATIONS>,

    /// Slice pool
    pub slices: Pool<Slice, MAX_SLICES>,

    /// Trade ring buffer, oldest overwritten
    pub trades: [Trade; MAX_TRADES],
    pub trade_head: u32,
    pub trade_count: u32,

    /// Aggressor ledger for roundtrip detection
    pub aggressor_ledger: Pool<AggressorEntry, MAX_AGGRESSOR_ENTRIES>,
}

impl SlabState {
    /// Initialize the whole slab in place over zeroed account bytes
    pub fn init(&mut self, authority: Pubkey, router_id: Pubkey, params: SlabParams, bump: u8) {
        self.header.init(authority, router_id, params, bump);
        self.instrument_count = 0;
        self.trade_head = 0;
        self.trade_count = 0;
        self.orders.init();
        self.positions.init();
        self.reservations.init();
        self.slices.init();
        self.aggressor_ledger.init();
        for account in self.accounts.iter_mut() {
            account.active = false;
        }
    }

    /// Get instrument by index
    pub fn get_instrument(&self, idx: u16) -> Option<&Instrument> {
        if idx < self.instrument_count {
            Some(&self.instruments[idx as usize])
        } else {
            None
        }
    }

    /// Get mutable instrument by index
    pub fn get_instrument_mut(&mut self, idx: u16) -> Option<&mut Instrument> {
        if idx < self.instrument_count {
            Some(&mut self.instruments[idx as usize])
        } else {
            None
        }
    }

    /// Add an instrument to the table
    pub fn add_instrument(
        &mut self,
        symbol: [u8; 8],
        tick: u64,
        lot: u64,
        min_order: u64,
        initial_px: u64,
    ) -> Result<u16, PercolatorError> {
        if (self.instrument_count as usize) >= MAX_INSTRUMENTS {
            return Err(PercolatorError::ArenaFull);
        }
        if tick == 0 || lot == 0 {
            return Err(PercolatorError::InvalidArgument);
        }

        let idx = self.instrument_count;
        self.instruments[idx as usize] = Instrument {
            symbol,
            tick,
            lot,
            min_order,
            index_price: initial_px,
            mark_price: initial_px,
            funding_rate: 0,
            cum_funding: 0,
            last_funding_ts: 0,
            open_interest: 0,
            bids_head: NIL,
            asks_head: NIL,
            bids_pending_head: NIL,
            asks_pending_head: NIL,
            epoch: 1,
            index: idx,
            halted: false,
            _padding: [0; 3],
            batch_open_ms: 0,
        };
        self.instrument_count += 1;

        Ok(idx)
    }

    /// Record trade in the ring buffer
    pub fn record_trade(&mut self, trade: Trade) {
        let idx = self.trade_head as usize;
        self.trades[idx] = trade;
        self.trade_head = (self.trade_head + 1) % (MAX_TRADES as u32);
        if (self.trade_count as usize) < MAX_TRADES {
            self.trade_count += 1;
        }
    }

    /// Get account by index
    pub fn get_account(&self, idx: u32) -> Option<&AccountState> {
        if (idx as usize) < MAX_ACCOUNTS && self.accounts[idx as usize].active {
            Some(&self.accounts[idx as usize])
        } else {
            None
        }
    }

    /// Get mutable account by index
    pub fn get_account_mut(&mut self, idx: u32) -> Option<&mut AccountState> {
        if (idx as usize) < MAX_ACCOUNTS && self.accounts[idx as usize].active {
            Some(&mut self.accounts[idx as usize])
        } else {
            None
        }
    }

    /// Find an account by key, or claim the first inactive slot
    pub fn find_or_create_account(&mut self, pubkey: &Pubkey) -> Result<u32, PercolatorError> {
        for i in 0..MAX_ACCOUNTS {
            if self.accounts[i].active && &self.accounts[i].key == pubkey {
                return Ok(i as u32);
            }
        }

        for i in 0..MAX_ACCOUNTS {
            if !self.accounts[i].active {
                self.accounts[i] = AccountState {
                    key: *pubkey,
                    cash: 0,
                    im: 0,
                    mm: 0,
                    position_head: NIL,
                    index: i as u32,
                    reserve_epoch: 0,
                    _padding0: 0,
                    reserves_in_epoch: 0,
                    active: true,
                    frozen: false,
                    _padding: [0; 6],
                };
                return Ok(i as u32);
            }
        }

        Err(PercolatorError::ArenaFull)
    }

    /// Freeze the slab and surface the violation that caused it.
    /// Every subsequent non-admin write fails Halted until Resume.
    pub fn halt_with(&mut self, err: PercolatorError) -> PercolatorError {
        self.header.freeze();
        err
    }

    /// Reject writes while frozen
    pub fn fail_if_frozen(&self) -> Result<(), PercolatorError> {
        if self.header.is_frozen() {
            return Err(PercolatorError::Halted);
        }
        Ok(())
    }
}

// The whole state must fit the 10 MB account
const _: () = {
    const SLAB_SIZE: usize = core::mem::size_of::<SlabState>();
    const MAX_SIZE: usize = 10 * 1024 * 1024;

    if SLAB_SIZE > MAX_SIZE {
        panic!("SlabState exceeds 10 MB limit");
    }
};
