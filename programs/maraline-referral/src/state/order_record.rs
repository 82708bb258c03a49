use anchor_lang::prelude::*;

/// Completed storefront order, mirrored from the order store
///
/// `referral_processed` guarantees at-most-once bonus processing.
///
/// PDA Seeds: ["order_v1", order_ref]
#[account]
#[derive(Default)]
pub struct OrderRecord {
    /// Stable per-order reference key from the order store
    pub order_ref: [u8; 32],

    /// Buyer Member PDA
    pub buyer: Pubkey,

    /// Order total (kuruş)
    pub total: u64,

    /// Service fee / commission recorded against the order (kuruş)
    pub service_fee: u64,

    pub referral_processed: bool,

    pub recorded_at: i64,

    /// 0 until processed
    pub processed_at: i64,

    /// PDA bump seed
    pub bump: u8,
}

impl OrderRecord {
    /// Account size: 32 + 32 + 8 + 8 + 1 + 8 + 8 + 1 = 98 bytes
    pub const LEN: usize = 32 + 32 + 8 + 8 + 1 + 8 + 8 + 1;
}
