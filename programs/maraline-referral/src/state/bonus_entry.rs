use anchor_lang::prelude::*;
use crate::constants::MAX_DESCRIPTION_LEN;

/// Immutable record of one bonus payout
///
/// Keyed by the order, so at most one entry can ever exist per order.
///
/// PDA Seeds: ["bonus_v1", order_record]
#[account]
#[derive(Default)]
pub struct BonusEntry {
    /// Sponsor Member PDA credited
    pub sponsor: Pubkey,

    /// Buyer Member PDA whose order produced the bonus
    pub buyer: Pubkey,

    /// OrderRecord PDA
    pub order: Pubkey,

    /// Amount credited after the earnings cap
    pub amount: u64,

    /// Amount computed by the bonus policy before the cap
    pub requested_amount: u64,

    pub created_at: i64,

    pub description: String,

    /// PDA bump seed
    pub bump: u8,
}

impl BonusEntry {
    /// Account size calculation:
    /// - sponsor, buyer, order: 96 bytes
    /// - amount, requested_amount, created_at: 24 bytes
    /// - description: 4 + MAX_DESCRIPTION_LEN bytes
    /// - bump: 1 byte
    /// Total: 189 bytes
    pub const LEN: usize = 32 * 3 + 8 * 3 + 4 + MAX_DESCRIPTION_LEN + 1;
}
