use anchor_lang::prelude::*;

/// Lookup entry from an invitation code to its owner
///
/// PDA Seeds: ["code_v1", CODE] with CODE uppercase
#[account]
#[derive(Default)]
pub struct ReferralCode {
    pub code: [u8; 8],

    /// Member PDA owning the code
    pub member: Pubkey,

    pub created_at: i64,

    /// PDA bump seed
    pub bump: u8,
}

impl ReferralCode {
    /// Account size: 8 + 32 + 8 + 1 = 49 bytes
    pub const LEN: usize = 8 + 32 + 8 + 1;
}
