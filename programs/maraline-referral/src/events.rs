use anchor_lang::prelude::*;

// ══════════════════════════════════════════════════════════════════════════════
// CONFIG EVENTS
// ══════════════════════════════════════════════════════════════════════════════

/// Emitted when the referral config is created
#[event]
pub struct ConfigInitialized {
    pub authority: Pubkey,
    pub general_referral_limit: u32,
    pub admin_referral_limit: u32,
    pub timestamp: i64,
}

/// Emitted when policy parameters change
#[event]
pub struct ConfigUpdated {
    pub general_referral_limit: u32,
    pub admin_referral_limit: u32,
    pub activity_threshold: u64,
    pub earnings_cap: u64,
    pub timestamp: i64,
}

/// Emitted when authority transfer is proposed (two-step transfer)
#[event]
pub struct AuthorityTransferProposed {
    pub current_authority: Pubkey,
    pub proposed_authority: Pubkey,
    pub timestamp: i64,
}

/// Emitted when authority transfer is completed
#[event]
pub struct AuthorityTransferred {
    pub old_authority: Pubkey,
    pub new_authority: Pubkey,
    pub timestamp: i64,
}

// ══════════════════════════════════════════════════════════════════════════════
// MEMBERSHIP EVENTS
// ══════════════════════════════════════════════════════════════════════════════

/// Emitted when a member is admitted under a sponsor (or as a root member)
#[event]
pub struct MemberRegistered {
    pub member: Pubkey,
    pub owner: Pubkey,
    pub sponsor: Option<Pubkey>,
    pub referral_code: [u8; 8],
    pub sponsor_occupancy: u32,
    pub sponsor_limit: u32,
    pub timestamp: i64,
}

/// Consumed by the off-chain notifier to send the confirmation email.
/// Delivery failures never affect the registration.
#[event]
pub struct EmailConfirmationRequested {
    pub member: Pubkey,
    pub owner: Pubkey,
    pub email_digest: [u8; 32],
    pub timestamp: i64,
}

/// Emitted when an inactive referral is evicted to free a sponsor slot
#[event]
pub struct MemberEvicted {
    pub member: Pubkey,
    pub owner: Pubkey,
    pub sponsor: Pubkey,
    pub registered_at: i64,
    pub timestamp: i64,
}

/// Emitted when a member's role changes
#[event]
pub struct MemberRoleChanged {
    pub member: Pubkey,
    pub is_admin: bool,
    pub timestamp: i64,
}

/// Emitted when a member's referral code is manually (de)activated
#[event]
pub struct ReferralCodeStatusChanged {
    pub member: Pubkey,
    pub is_active: bool,
    pub timestamp: i64,
}

/// Emitted when a member's special referral limit changes
#[event]
pub struct SpecialReferralLimitChanged {
    pub member: Pubkey,
    pub limit: Option<u32>,
    pub timestamp: i64,
}

/// Emitted when a member crosses the activity threshold in either direction
#[event]
pub struct ActivityStatusChanged {
    pub member: Pubkey,
    pub has_met_threshold: bool,
    pub total_spend: u64,
    pub timestamp: i64,
}

// ══════════════════════════════════════════════════════════════════════════════
// ORDER & BONUS EVENTS
// ══════════════════════════════════════════════════════════════════════════════

/// Emitted when the order store records a completed order
#[event]
pub struct OrderRecorded {
    pub order: Pubkey,
    pub buyer: Pubkey,
    pub total: u64,
    pub service_fee: u64,
    pub timestamp: i64,
}

/// Emitted once per order when referral processing completes
#[event]
pub struct OrderProcessed {
    pub order: Pubkey,
    pub buyer: Pubkey,
    pub sponsor: Option<Pubkey>,
    pub bonus_paid: u64,
    pub timestamp: i64,
}

/// Emitted when a sponsor is credited
#[event]
pub struct BonusCredited {
    pub sponsor: Pubkey,
    pub order: Pubkey,
    pub amount: u64,
    pub total_earned: u64,
    pub timestamp: i64,
}

/// Emitted when the earnings cap reduced the bonus
#[event]
pub struct BonusCapped {
    pub sponsor: Pubkey,
    pub order: Pubkey,
    pub requested: u64,
    pub applied: u64,
    pub timestamp: i64,
}
