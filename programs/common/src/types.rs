//! Common types shared between the Router and Slab programs

use pinocchio::pubkey::Pubkey;

/// Maximum number of slabs in the registry
pub const MAX_SLABS: usize = 256;

/// Maximum number of instruments per slab
pub const MAX_INSTRUMENTS: usize = 16;

/// Maximum number of accounts per slab
pub const MAX_ACCOUNTS: usize = 4_096;

/// Maximum number of orders per slab
pub const MAX_ORDERS: usize = 16_384;

/// Maximum number of positions per slab
pub const MAX_POSITIONS: usize = 16_384;

/// Maximum number of reservations per slab
pub const MAX_RESERVATIONS: usize = 4_096;

/// Maximum number of slices per slab
pub const MAX_SLICES: usize = 16_384;

/// Maximum number of trades in the ring buffer
pub const MAX_TRADES: usize = 8_192;

/// Maximum aggressor ledger entries (shared pool, not per account)
pub const MAX_AGGRESSOR_ENTRIES: usize = 4_096;

/// Maximum TTL for reservations (2 minutes in milliseconds)
pub const TTL_MAX_MS: u64 = 120_000;

/// Maximum TTL for capabilities (2 minutes in milliseconds)
pub const CAP_TTL_MAX_MS: u64 = 120_000;

/// Expired reservations reclaimed per entry point, at most
pub const EXPIRY_SWEEP_MAX: u32 = 8;

/// Per-account reservation budget per batch epoch
pub const RESERVES_PER_EPOCH_MAX: u32 = 64;

/// Sentinel for empty intrusive-list links
pub const NIL: u32 = u32::MAX;

/// Order side
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// The side a taker on `self` trades against
    pub fn contra(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Time in force; on Reserve this selects the partial-fill policy
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeInForce {
    #[default]
    GTC = 0,
    IOC = 1,
    FOK = 2,
}

/// Maker class
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MakerClass {
    /// Regular maker - crossing orders wait one batch epoch
    #[default]
    Regular = 0,
    /// Designated LP - posts live immediately
    Dlp = 1,
}

/// Order state
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderState {
    #[default]
    Live = 0,
    Pending = 1,
}

/// Arena handle: slot index plus the generation observed at allocation.
/// Dereference fails with StaleHandle once the slot is recycled.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Handle {
    pub idx: u32,
    pub gen: u32,
}

/// Account state tracked within a slab
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccountState {
    /// Account pubkey
    pub key: Pubkey,
    /// Local cash balance (signed, 1e6 scale)
    pub cash: i128,
    /// Cached initial margin requirement
    pub im: u128,
    /// Cached maintenance margin requirement
    pub mm: u128,
    /// Head of position linked list
    pub position_head: u32,
    /// Account index
    pub index: u32,
    /// Epoch of the last reservation (rate limiting)
    pub reserve_epoch: u16,
    /// Padding
    pub _padding0: u16,
    /// Reservations made in reserve_epoch
    pub reserves_in_epoch: u32,
    /// Account active flag
    pub active: bool,
    /// Frozen flag (admin action)
    pub frozen: bool,
    /// Padding
    pub _padding: [u8; 6],
}

/// Instrument definition and per-instrument market state
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Instrument {
    /// Instrument symbol (8 bytes, e.g. "BTC-PERP")
    pub symbol: [u8; 8],
    /// Tick size (minimum price increment, 1e6 scale)
    pub tick: u64,
    /// Lot size (minimum quantity increment, 1e6 scale)
    pub lot: u64,
    /// Minimum order quantity
    pub min_order: u64,
    /// Index price from the external feed
    pub index_price: u64,
    /// Mark price (last trade clamped to index +/- mark band)
    pub mark_price: u64,
    /// Current funding rate (basis points per hour)
    pub funding_rate: i64,
    /// Cumulative funding per unit of position (1e6 scale)
    pub cum_funding: i128,
    /// Last funding timestamp (ms)
    pub last_funding_ts: u64,
    /// Open interest (sum of long position qty)
    pub open_interest: u64,
    /// Live bids head
    pub bids_head: u32,
    /// Live asks head
    pub asks_head: u32,
    /// Pending bids head
    pub bids_pending_head: u32,
    /// Pending asks head
    pub asks_pending_head: u32,
    /// Current batch epoch
    pub epoch: u16,
    /// Instrument index
    pub index: u16,
    /// Halted flag (instrument-level)
    pub halted: bool,
    /// Padding
    pub _padding: [u8; 3],
    /// Batch open timestamp (ms)
    pub batch_open_ms: u64,
}

/// Order in the book
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Order {
    /// Order ID (monotonic)
    pub order_id: u64,
    /// Account index
    pub account_idx: u32,
    /// Instrument index
    pub instrument_idx: u16,
    /// Order side
    pub side: Side,
    /// Time in force
    pub tif: TimeInForce,
    /// Maker class
    pub maker_class: MakerClass,
    /// Order state
    pub state: OrderState,
    /// Epoch at which a pending order becomes matchable
    pub eligible_epoch: u16,
    /// Creation timestamp (ms)
    pub created_ms: u64,
    /// Price (1e6 scale)
    pub price: u64,
    /// Remaining quantity
    pub qty: u64,
    /// Quantity locked by open reservations
    pub reserved_qty: u64,
    /// Original quantity
    pub qty_orig: u64,
    /// Next order in book
    pub next: u32,
    /// Previous order in book
    pub prev: u32,
    /// Next in freelist
    pub next_free: u32,
    /// Slot generation
    pub gen: u32,
    /// Used flag
    pub used: bool,
    /// Padding
    pub _padding: [u8; 7],
}

/// Position per (account, instrument)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    /// Account index
    pub account_idx: u32,
    /// Instrument index
    pub instrument_idx: u16,
    /// Padding
    pub _padding: u16,
    /// Signed quantity (positive = long)
    pub qty: i64,
    /// Entry VWAP price
    pub entry_px: u64,
    /// Funding snapshot at last touch
    pub last_funding: i128,
    /// Next position for this account
    pub next_in_account: u32,
    /// Next in freelist
    pub next_free: u32,
    /// Slot generation
    pub gen: u32,
    /// Used flag
    pub used: bool,
    /// Padding
    pub _padding2: [u8; 3],
}

/// Slice: one reservation's claim on one maker order
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Slice {
    /// Owning reservation index
    pub resv_idx: u32,
    /// Maker order index
    pub order_idx: u32,
    /// Maker order generation at reserve time
    pub order_gen: u32,
    /// Padding
    pub _padding0: u32,
    /// Quantity claimed
    pub qty: u64,
    /// Maker price captured at reserve time (1e6 scale)
    pub price: u64,
    /// Next slice in reservation
    pub next: u32,
    /// Next in freelist
    pub next_free: u32,
    /// Slot generation
    pub gen: u32,
    /// Used flag
    pub used: bool,
    /// Padding
    pub _padding: [u8; 3],
}

/// Reservation hold
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Reservation {
    /// Unique hold ID
    pub hold_id: u64,
    /// Route ID from the router
    pub route_id: u64,
    /// Account index
    pub account_idx: u32,
    /// Instrument index
    pub instrument_idx: u16,
    /// Side
    pub side: Side,
    /// Partial-fill policy captured from the instruction
    pub tif: TimeInForce,
    /// Reserved (filled) quantity
    pub qty: u64,
    /// VWAP of reserved slices
    pub vwap_px: u64,
    /// Worst price in the reservation
    pub worst_px: u64,
    /// Charge ceiling: notional + taker fee (1e6 scale)
    pub max_charge: u128,
    /// Commitment hash supplied by the router
    pub commitment_hash: [u8; 32],
    /// Expiry timestamp (ms)
    pub expiry_ms: u64,
    /// Head of slice linked list
    pub slice_head: u32,
    /// Next in freelist
    pub next_free: u32,
    /// Slot generation
    pub gen: u32,
    /// Used flag
    pub used: bool,
    /// Committed flag
    pub committed: bool,
    /// Padding
    pub _padding: [u8; 2],
}

/// Trade record in the ring buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Trade {
    /// Timestamp (ms)
    pub ts: u64,
    /// Maker order ID
    pub maker_order_id: u64,
    /// Taker account index
    pub taker_account_idx: u32,
    /// Instrument index
    pub instrument_idx: u16,
    /// Side from the taker perspective
    pub side: Side,
    /// Padding
    pub _padding: u8,
    /// Price (1e6 scale)
    pub price: u64,
    /// Quantity (1e6 scale)
    pub qty: u64,
}

/// Aggressor ledger entry for roundtrip detection
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AggressorEntry {
    /// Account index
    pub account_idx: u32,
    /// Instrument index
    pub instrument_idx: u16,
    /// Batch epoch this entry tracks
    pub epoch: u16,
    /// Buy quantity this epoch
    pub buy_qty: u64,
    /// Sell quantity this epoch
    pub sell_qty: u64,
    /// Buy notional this epoch (1e6 scale)
    pub buy_notional: u128,
    /// Sell notional this epoch (1e6 scale)
    pub sell_notional: u128,
    /// Next in freelist
    pub next_free: u32,
    /// Slot generation
    pub gen: u32,
    /// Used flag
    pub used: bool,
    /// Padding
    pub _padding: [u8; 7],
}

// The pooled regions must fit the 10 MB slab account alongside the header
const _: () = {
    const fn check_size() {
        let total = 0
            + (MAX_ACCOUNTS * core::mem::size_of::<AccountState>())
            + (MAX_INSTRUMENTS * core::mem::size_of::<Instrument>())
            + (MAX_ORDERS * core::mem::size_of::<Order>())
            + (MAX_POSITIONS * core::mem::size_of::<Position>())
            + (MAX_RESERVATIONS * core::mem::size_of::<Reservation>())
            + (MAX_SLICES * core::mem::size_of::<Slice>())
            + (MAX_TRADES * core::mem::size_of::<Trade>())
            + (MAX_AGGRESSOR_ENTRIES * core::mem::size_of::<AggressorEntry>());

        const MAX_SLAB_SIZE: usize = 10 * 1024 * 1024;
        if total > MAX_SLAB_SIZE {
            panic!("Slab pools exceed 10 MB");
        }
    }
    check_size();
};
