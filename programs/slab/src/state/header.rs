//! Slab header: identity, configuration surface, counters

use pinocchio::pubkey::Pubkey;

/// Per-deployment configuration parameters
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SlabParams {
    /// Initial margin ratio (basis points)
    pub imr_bps: u64,
    /// Maintenance margin ratio (basis points)
    pub mmr_bps: u64,
    /// Maker fee (basis points, negative = rebate)
    pub maker_fee_bps: i64,
    /// Taker fee (basis points)
    pub taker_fee_bps: u64,
    /// Batch window duration (milliseconds)
    pub batch_ms: u64,
    /// Top levels frozen against the contra queue
    pub freeze_levels: u16,
    /// Padding
    pub _padding: [u8; 6],
    /// Kill band: max |mark - index| divergence (basis points)
    pub kill_band_bps: u64,
    /// Aggressor roundtrip tax (basis points)
    pub arg_tax_bps: u64,
    /// Maximum reservation TTL (milliseconds)
    pub ttl_max_ms: u64,
    /// Maximum capability TTL (milliseconds)
    pub cap_ttl_max_ms: u64,
    /// Liquidation penalty (basis points)
    pub liq_penalty_bps: u64,
    /// Mark price clamp around index (basis points)
    pub mark_bound_bps: u64,
}

impl SlabParams {
    pub const LEN: usize = core::mem::size_of::<Self>();
}

/// Slab header at offset 0 of the 10 MB account
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SlabHeader {
    /// Magic bytes ("PERC")
    pub magic: u32,
    /// Schema version
    pub version: u16,
    /// PDA bump seed
    pub bump: u8,
    /// Flags (bit 0 = global freeze)
    pub flags: u8,
    /// Slab authority (admin operations)
    pub authority: Pubkey,
    /// Router program ID (commit authorization)
    pub router_id: Pubkey,
    /// Configuration surface
    pub params: SlabParams,
    /// Next order ID (monotonic)
    pub next_order_id: u64,
    /// Next hold ID (monotonic)
    pub next_hold_id: u64,
    /// Sequence counter, bumped on every book mutation
    pub seqno: u64,
    /// Host-supplied timestamp cache (ms)
    pub now_cache: u64,
    /// Round-robin cursor for the expiry sweep
    pub sweep_cursor: u32,
    /// Padding
    pub _padding: u32,
    /// Insurance fund balance (1e6 scale)
    pub insurance_fund: u128,
}

const FLAG_FROZEN: u8 = 1 << 0;

impl SlabHeader {
    pub const MAGIC: u32 = 0x5045_5243;
    pub const VERSION: u16 = 1;
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Initialize the header in place
    pub fn init(&mut self, authority: Pubkey, router_id: Pubkey, params: SlabParams, bump: u8) {
        self.magic = Self::MAGIC;
        self.version = Self::VERSION;
        self.bump = bump;
        self.flags = 0;
        self.authority = authority;
        self.router_id = router_id;
        self.params = params;
        self.next_order_id = 1;
        self.next_hold_id = 1;
        self.seqno = 0;
        self.now_cache = 0;
        self.sweep_cursor = 0;
        self._padding = 0;
        self.insurance_fund = 0;
    }

    /// Validate magic and version
    pub fn validate(&self) -> bool {
        self.magic == Self::MAGIC && self.version == Self::VERSION
    }

    pub fn is_frozen(&self) -> bool {
        self.flags & FLAG_FROZEN != 0
    }

    pub fn freeze(&mut self) {
        self.flags |= FLAG_FROZEN;
    }

    pub fn resume(&mut self) {
        self.flags &= !FLAG_FROZEN;
    }

    /// Take the next order ID
    pub fn next_order_id(&mut self) -> u64 {
        let id = self.next_order_id;
        self.next_order_id = self.next_order_id.wrapping_add(1);
        id
    }

    /// Take the next hold ID
    pub fn next_hold_id(&mut self) -> u64 {
        let id = self.next_hold_id;
        self.next_hold_id = self.next_hold_id.wrapping_add(1);
        id
    }

    /// Bump the sequence counter; the single publish point for state changes
    pub fn increment_seqno(&mut self) -> u64 {
        self.seqno = self.seqno.wrapping_add(1);
        self.seqno
    }

    /// Update the timestamp cache
    pub fn update_timestamp(&mut self, ts: u64) {
        self.now_cache = ts;
    }
}
