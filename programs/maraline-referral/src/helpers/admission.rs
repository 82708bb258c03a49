use anchor_lang::prelude::*;
use crate::errors::ErrorCode;
use crate::helpers::capacity::*;
use crate::state::{Member, ReferralConfig, ReferralRoster, RosterEntry};

/// Where the new member's slot comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotPlan {
    /// Sponsor has room
    Free,
    /// Sponsor is full; evict the referral at `index`
    Reclaim { index: usize, member: Pubkey },
}

/// Decide how a registration attaches to its sponsor
///
/// `candidate` is the eviction target the caller proposes (None when it
/// expects a free slot or knows of no evictable referral). When the sponsor
/// is full the proposal must be exactly the oldest evictable referral.
/// A proposal no longer on the roster was already reclaimed by a competing
/// admission and yields CapacityExhausted, never a second eviction attempt.
pub fn plan_admission<'a, F>(
    sponsor: &Member,
    roster: &ReferralRoster,
    config: &ReferralConfig,
    candidate: Option<Pubkey>,
    lookup: F,
) -> Result<(CapacityView, SlotPlan)>
where
    F: FnMut(&Pubkey) -> Option<&'a Member>,
{
    check_sponsor_gate(sponsor)?;

    let mut view = resolve_capacity(sponsor, roster, config);
    if view.can_admit {
        require!(candidate.is_none(), ErrorCode::EvictionNotRequired);
        return Ok((view, SlotPlan::Free));
    }

    let proposed = candidate.ok_or(ErrorCode::CapacityExhausted)?;
    require!(roster.position(&proposed).is_some(), ErrorCode::CapacityExhausted);

    let index = find_reclaim_candidate(roster, lookup)?.ok_or(ErrorCode::CapacityExhausted)?;
    let oldest = roster.children[index].member;
    require_keys_eq!(oldest, proposed, ErrorCode::InvalidEvictionCandidate);

    view.reclaim_candidate = Some(oldest);
    Ok((view, SlotPlan::Reclaim { index, member: oldest }))
}

/// Apply a plan to the sponsor roster: evict (if planned), re-check the
/// occupancy against `limit`, then append the newcomer.
///
/// Returns the evicted entry. Any error leaves the caller's instruction
/// failed, which discards the eviction as well.
pub fn apply_admission(
    roster: &mut ReferralRoster,
    plan: SlotPlan,
    limit: u32,
    entry: RosterEntry,
) -> Result<Option<RosterEntry>> {
    let evicted = match plan {
        SlotPlan::Free => None,
        SlotPlan::Reclaim { index, member } => {
            let held = roster
                .children
                .get(index)
                .map(|e| e.member)
                .ok_or(ErrorCode::InvalidEvictionCandidate)?;
            require_keys_eq!(held, member, ErrorCode::InvalidEvictionCandidate);
            Some(roster.evict_at(index)?)
        }
    };

    require!(roster.occupancy() < limit, ErrorCode::CapacityExhausted);
    roster.push(entry)?;

    Ok(evicted)
}
