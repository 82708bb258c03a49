use crate::state::{BonusMode, Member, ReferralConfig};

/// Bonus computed by the configured policy, raised to the minimum floor.
/// The earnings cap is applied separately.
pub fn compute_bonus(config: &ReferralConfig, service_fee: u64) -> u64 {
    let policy_amount = match config.bonus_mode {
        BonusMode::Fixed => config.fixed_bonus,
        BonusMode::MatchDistributedBonus => service_fee,
    };

    #[cfg(feature = "verbose")]
    anchor_lang::prelude::msg!(
        "Bonus policy {:?}: amount={}, floor={}",
        config.bonus_mode, policy_amount, config.min_bonus
    );

    policy_amount.max(config.min_bonus)
}

pub fn is_cap_exempt(sponsor: &Member, config: &ReferralConfig) -> bool {
    config.admin_cap_exempt && sponsor.is_elevated()
}

/// Remaining room under the lifetime cap (0 once reached or exceeded)
pub fn cap_headroom(total_earned: u64, earnings_cap: u64) -> u64 {
    earnings_cap.saturating_sub(total_earned)
}

/// Clamp a bonus so the sponsor's lifetime total never passes the cap
pub fn apply_earnings_cap(requested: u64, sponsor: &Member, config: &ReferralConfig) -> u64 {
    if is_cap_exempt(sponsor, config) {
        return requested;
    }
    requested.min(cap_headroom(sponsor.total_earned, config.earnings_cap))
}

/// Calendar month of a unix timestamp (UTC) as `year * 12 + month0`
///
/// Civil-from-days conversion on the proleptic Gregorian calendar.
pub fn month_index(unix_timestamp: i64) -> u32 {
    let days = unix_timestamp.div_euclid(86_400);

    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    (year * 12 + (month - 1)).clamp(0, u32::MAX as i64) as u32
}

/// Format a kuruş amount as (lira, kuruş) for readable logs
pub fn format_kurus(amount: u64) -> (u64, u64) {
    const KURUS_PER_LIRA: u64 = 100;
    (amount / KURUS_PER_LIRA, amount % KURUS_PER_LIRA)
}
