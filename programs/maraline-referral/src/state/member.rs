use anchor_lang::prelude::*;

/// Privilege level of a member
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MemberRole {
    #[default]
    Member,
    /// Elevated: bypasses the sponsor activity gate, admin-tier capacity,
    /// optionally exempt from the earnings cap
    Admin,
}

/// A registered storefront participant and its referral attributes
///
/// `sponsor` is the single source of truth for the referral tree; the
/// sponsor's ReferralRoster is a derived index over it.
///
/// PDA Seeds: ["member_v1", owner]
#[account]
#[derive(Default)]
pub struct Member {
    /// Participant wallet (identity handle)
    pub owner: Pubkey,

    /// Sponsor's Member PDA. None only for root members. Never changes.
    pub sponsor: Option<Pubkey>,

    /// Own invitation code, assigned once at creation
    pub referral_code: [u8; 8],

    /// sha256 of the normalized email
    pub email_digest: [u8; 32],

    /// sha256 of the normalized phone (05XXXXXXXXX)
    pub phone_digest: [u8; 32],

    pub role: MemberRole,

    /// Manually controlled: others may register with this member's code
    pub is_referral_code_active: bool,

    /// Derived: total_spend >= activity threshold
    pub has_met_referral_threshold: bool,

    /// Overrides the configured capacity when set and > 0
    pub special_referral_limit: Option<u32>,

    /// Reserved
    pub used_backup_referral: bool,

    /// Orders recorded against this member
    pub order_count: u32,

    /// Direct referrals currently held (mirrors roster length)
    pub referral_count: u32,

    /// Lifetime spend (kuruş)
    pub total_spend: u64,

    /// Lifetime bonus earned (kuruş)
    pub total_earned: u64,

    /// Bonus earned in `earnings_month`
    pub monthly_earned: u64,

    /// Calendar month of `monthly_earned` (year * 12 + month0)
    pub earnings_month: u32,

    /// Bonus realized as store credit (lifetime)
    pub total_realized_earnings: u64,

    pub registered_at: i64,

    pub updated_at: i64,

    /// PDA bump seed
    pub bump: u8,
}

impl Member {
    /// Account size calculation:
    /// - owner: 32 bytes
    /// - sponsor: 33 bytes (Option<Pubkey>)
    /// - referral_code: 8 bytes
    /// - email_digest, phone_digest: 64 bytes
    /// - role + 2 flags: 3 bytes
    /// - special_referral_limit: 5 bytes (Option<u32>)
    /// - used_backup_referral: 1 byte
    /// - order_count, referral_count: 8 bytes
    /// - total_spend, total_earned, monthly_earned: 24 bytes
    /// - earnings_month: 4 bytes
    /// - total_realized_earnings: 8 bytes
    /// - registered_at, updated_at: 16 bytes
    /// - bump: 1 byte
    /// Total: 207 bytes
    pub const LEN: usize = 32 + 33 + 8 + 32 * 2 + 3 + 5 + 1 + 4 * 2 + 8 * 3 + 4 + 8 + 8 * 2 + 1;

    pub fn is_elevated(&self) -> bool {
        self.role == MemberRole::Admin
    }

    /// Active for inviting: manual activation AND spend threshold
    pub fn is_active_sponsor(&self) -> bool {
        self.is_referral_code_active && self.has_met_referral_threshold
    }

    /// May be deleted to free the sponsor's slot.
    /// Members holding referrals or admin rights are never evicted, which
    /// keeps every remaining sponsor reference pointing at a live member.
    pub fn is_evictable(&self) -> bool {
        !self.has_met_referral_threshold
            && self.order_count == 0
            && self.referral_count == 0
            && !self.is_elevated()
    }
}
