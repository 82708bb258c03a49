use anchor_lang::prelude::*;

/// Which contact channel a claim reserves
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContactKind {
    #[default]
    Email,
    Phone,
}

/// Uniqueness reservation for one normalized email or phone
///
/// The PDA address is derived from the contact digest, so an existing
/// claim account is the "already registered" answer.
///
/// PDA Seeds: ["email_v1", digest] or ["phone_v1", digest]
#[account]
#[derive(Default)]
pub struct ContactClaim {
    pub kind: ContactKind,

    /// Member holding this contact
    pub member: Pubkey,

    /// sha256 of the normalized contact value
    pub digest: [u8; 32],

    pub claimed_at: i64,

    /// PDA bump seed
    pub bump: u8,
}

impl ContactClaim {
    /// Account size: 1 + 32 + 32 + 8 + 1 = 74 bytes
    pub const LEN: usize = 1 + 32 + 32 + 8 + 1;
}
