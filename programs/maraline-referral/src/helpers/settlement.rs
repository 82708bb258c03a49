use anchor_lang::prelude::*;
use crate::errors::ErrorCode;
use crate::helpers::activity::record_spend;
use crate::helpers::math::*;
use crate::state::{Member, OrderRecord, ReferralConfig};

/// Outcome of processing one order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Order was already processed; nothing changed
    pub already_processed: bool,

    /// Bonus computed by the policy before the cap (0 without sponsor)
    pub requested: u64,

    /// Bonus credited to the sponsor
    pub applied: u64,

    /// Buyer crossed the activity threshold in either direction
    pub buyer_activity_changed: bool,
}

impl Settlement {
    pub fn was_capped(&self) -> bool {
        self.applied < self.requested
    }
}

/// Apply an order's spend and sponsor bonus
///
/// Every new value is computed before anything is written, so an overflow
/// leaves buyer, sponsor, order and config untouched. The caller persists
/// the ledger entry when `applied > 0`; the instruction commits both or
/// neither.
pub fn settle_order(
    order: &mut OrderRecord,
    buyer: &mut Member,
    sponsor: Option<&mut Member>,
    config: &mut ReferralConfig,
    now: i64,
) -> Result<Settlement> {
    if order.referral_processed {
        return Ok(Settlement { already_processed: true, ..Settlement::default() });
    }

    let (requested, applied) = match sponsor.as_deref() {
        Some(s) => {
            let requested = compute_bonus(config, order.service_fee);
            (requested, apply_earnings_cap(requested, s, config))
        }
        None => (0, 0),
    };

    let orders_processed = config
        .total_orders_processed
        .checked_add(1)
        .ok_or(ErrorCode::MathOverflow)?;
    let bonus_paid = config
        .total_bonus_paid
        .checked_add(applied)
        .ok_or(ErrorCode::MathOverflow)?;

    let month = month_index(now);
    let credit = match sponsor.as_deref() {
        Some(s) if applied > 0 => {
            let monthly_base = if s.earnings_month == month { s.monthly_earned } else { 0 };
            Some((
                s.total_earned.checked_add(applied).ok_or(ErrorCode::MathOverflow)?,
                monthly_base.checked_add(applied).ok_or(ErrorCode::MathOverflow)?,
                s.total_realized_earnings.checked_add(applied).ok_or(ErrorCode::MathOverflow)?,
            ))
        }
        _ => None,
    };

    // First write; leaves the buyer untouched when it fails
    let buyer_activity_changed = record_spend(buyer, order.total, config.activity_threshold)?;
    buyer.updated_at = now;

    if let (Some(s), Some((total_earned, monthly_earned, realized))) = (sponsor, credit) {
        s.total_earned = total_earned;
        s.monthly_earned = monthly_earned;
        s.earnings_month = month;
        s.total_realized_earnings = realized;
        s.updated_at = now;
    }

    order.referral_processed = true;
    order.processed_at = now;

    config.total_orders_processed = orders_processed;
    config.total_bonus_paid = bonus_paid;

    Ok(Settlement {
        already_processed: false,
        requested,
        applied,
        buyer_activity_changed,
    })
}

/// Ledger description naming the source order
pub fn bonus_description(order_ref: &[u8; 32]) -> String {
    let hex: String = order_ref[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("Referral bonus for order {}", hex)
}
