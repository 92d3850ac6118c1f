//! Fill receipt account written by CommitFill
//!
//! The router reads the receipt after the CPI; together with the return-data
//! slot it is the fixed-size result channel for fills.

/// Fill receipt, one per route
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FillReceipt {
    /// Magic ("FRCT")
    pub magic: u32,
    /// Padding
    pub _padding: u32,
    /// Slab seqno captured when the fill executed
    pub seqno: u64,
    /// Hold ID that produced the fill
    pub hold_id: u64,
    /// Total filled quantity
    pub filled_qty: u64,
    /// VWAP of the fills (1e6 scale)
    pub vwap_px: u64,
    /// Notional value (1e6 scale)
    pub notional: u128,
    /// Total fees charged, ARG tax included
    pub total_fee: u128,
    /// Escrow debit: notional + taker fee
    pub total_debit: u128,
}

impl FillReceipt {
    pub const MAGIC: u32 = 0x4652_4354;
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Zero the receipt, stamping the magic
    pub fn init(&mut self) {
        *self = FillReceipt {
            magic: Self::MAGIC,
            _padding: 0,
            seqno: 0,
            hold_id: 0,
            filled_qty: 0,
            vwap_px: 0,
            notional: 0,
            total_fee: 0,
            total_debit: 0,
        };
    }

    pub fn validate(&self) -> bool {
        self.magic == Self::MAGIC
    }

    /// Record a fill result
    pub fn write(
        &mut self,
        seqno: u64,
        hold_id: u64,
        filled_qty: u64,
        vwap_px: u64,
        notional: u128,
        total_fee: u128,
        total_debit: u128,
    ) {
        self.seqno = seqno;
        self.hold_id = hold_id;
        self.filled_qty = filled_qty;
        self.vwap_px = vwap_px;
        self.notional = notional;
        self.total_fee = total_fee;
        self.total_debit = total_debit;
    }
}
