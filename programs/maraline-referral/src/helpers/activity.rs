use anchor_lang::prelude::*;
use crate::errors::ErrorCode;
use crate::state::Member;

/// Recompute `has_met_referral_threshold` from `total_spend`.
/// Returns true when the flag flipped. `is_referral_code_active` is never touched.
pub fn reevaluate(member: &mut Member, activity_threshold: u64) -> bool {
    let met = member.total_spend >= activity_threshold;
    let changed = met != member.has_met_referral_threshold;
    member.has_met_referral_threshold = met;
    changed
}

/// Add spend and re-run the evaluator
pub fn record_spend(member: &mut Member, amount: u64, activity_threshold: u64) -> Result<bool> {
    member.total_spend = member
        .total_spend
        .checked_add(amount)
        .ok_or(ErrorCode::MathOverflow)?;
    Ok(reevaluate(member, activity_threshold))
}
