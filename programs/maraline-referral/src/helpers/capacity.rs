use anchor_lang::prelude::*;
use crate::constants::MAX_ROSTER_SIZE;
use crate::errors::ErrorCode;
use crate::state::{Member, ReferralConfig, ReferralRoster};

/// Capacity snapshot of one sponsor
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityView {
    /// Effective direct-referral limit
    pub limit: u32,

    /// Direct referrals currently held
    pub occupied: u32,

    /// A free slot exists without eviction
    pub can_admit: bool,

    /// Sponsor passes the activity gate (always true for admins)
    pub sponsor_active: bool,

    /// Oldest evictable referral, when the sponsor is full and one exists
    pub reclaim_candidate: Option<Pubkey>,
}

/// Effective referral limit
///
/// Precedence: special limit (> 0), then admin-tier limit for admins
/// (general limit when admin-tier is 0), then the general limit.
pub fn effective_limit(sponsor: &Member, config: &ReferralConfig) -> u32 {
    let limit = match sponsor.special_referral_limit {
        Some(special) if special > 0 => special,
        _ if sponsor.is_elevated() && config.admin_referral_limit > 0 => config.admin_referral_limit,
        _ => config.general_referral_limit,
    };
    limit.min(MAX_ROSTER_SIZE)
}

/// Admins bypass the gate; everyone else must be manually activated AND
/// have met the spend threshold.
pub fn check_sponsor_gate(sponsor: &Member) -> Result<()> {
    if sponsor.is_elevated() {
        return Ok(());
    }
    require!(sponsor.is_active_sponsor(), ErrorCode::SponsorNotActive);
    Ok(())
}

pub fn resolve_capacity(
    sponsor: &Member,
    roster: &ReferralRoster,
    config: &ReferralConfig,
) -> CapacityView {
    let limit = effective_limit(sponsor, config);
    let occupied = roster.occupancy();

    CapacityView {
        limit,
        occupied,
        can_admit: occupied < limit,
        sponsor_active: check_sponsor_gate(sponsor).is_ok(),
        reclaim_candidate: None,
    }
}

/// Walk the roster oldest first and return the index of the first evictable child
///
/// `lookup` resolves a roster entry to the child's Member state. The walk
/// stops with RosterAccountMissing at the first child it cannot see: every
/// older child must be proven ineligible before a younger one is chosen.
pub fn find_reclaim_candidate<'a, F>(roster: &ReferralRoster, mut lookup: F) -> Result<Option<usize>>
where
    F: FnMut(&Pubkey) -> Option<&'a Member>,
{
    for (index, entry) in roster.children.iter().enumerate() {
        let child = lookup(&entry.member).ok_or(ErrorCode::RosterAccountMissing)?;

        #[cfg(feature = "verbose")]
        msg!(
            "Roster walk #{}: {} met_threshold={} orders={}",
            index, entry.member, child.has_met_referral_threshold, child.order_count
        );

        if child.is_evictable() {
            return Ok(Some(index));
        }
    }
    Ok(None)
}
