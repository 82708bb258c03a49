use anchor_lang::prelude::*;
use crate::constants::*;
use crate::errors::ErrorCode;

/// How the sponsor bonus for a qualifying order is computed
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BonusMode {
    /// A configured constant per order
    #[default]
    Fixed,
    /// Equal to the service fee already recorded against the order
    MatchDistributedBonus,
}

/// Global referral policy and statistics
///
/// Only one ReferralConfig exists per program instance. Every instruction
/// receives it as an input account, so policy is an injected value rather
/// than ambient state.
///
/// PDA Seeds: ["referral_config_v1"]
#[account]
#[derive(Default)]
pub struct ReferralConfig {
    /// Current authority (order store + administration)
    pub authority: Pubkey,

    /// Two-step authority transfer: proposed new authority
    pub pending_authority: Option<Pubkey>,

    /// Direct referral slots for an ordinary sponsor
    pub general_referral_limit: u32,

    /// Direct referral slots for an admin sponsor (0 = use general limit)
    pub admin_referral_limit: u32,

    /// Cumulative spend at which a member counts as active
    pub activity_threshold: u64,

    /// Bonus computation policy
    pub bonus_mode: BonusMode,

    /// Bonus per order under BonusMode::Fixed
    pub fixed_bonus: u64,

    /// Minimum bonus floor applied before the cap
    pub min_bonus: u64,

    /// Lifetime earnings ceiling per member
    pub earnings_cap: u64,

    /// Admin sponsors ignore the earnings cap
    pub admin_cap_exempt: bool,

    /// Members currently registered
    pub total_members: u64,

    /// Referrals evicted to free sponsor slots (lifetime)
    pub total_evictions: u64,

    /// Orders that completed referral processing (lifetime)
    pub total_orders_processed: u64,

    /// Bonus credited to sponsors (lifetime)
    pub total_bonus_paid: u64,

    /// Timestamp when the config was created
    pub initialized_at: i64,

    /// PDA bump seed
    pub bump: u8,
}

impl ReferralConfig {
    /// Account size calculation:
    /// - authority: 32 bytes
    /// - pending_authority: 33 bytes (Option<Pubkey>)
    /// - 2 u32 limits: 8 bytes
    /// - activity_threshold: 8 bytes
    /// - bonus_mode: 1 byte
    /// - fixed_bonus, min_bonus, earnings_cap: 24 bytes
    /// - admin_cap_exempt: 1 byte
    /// - 4 u64 counters + initialized_at: 40 bytes
    /// - bump: 1 byte
    /// Total: 148 bytes
    pub const LEN: usize = 32 + 33 + 4 * 2 + 8 + 1 + 8 * 3 + 1 + 8 * 5 + 1;

    /// Overwrite the policy fields. Statistics are untouched.
    pub fn apply_params(&mut self, params: &ConfigParams) -> Result<()> {
        params.validate()?;
        self.general_referral_limit = params.general_referral_limit;
        self.admin_referral_limit = params.admin_referral_limit;
        self.activity_threshold = params.activity_threshold;
        self.bonus_mode = params.bonus_mode;
        self.fixed_bonus = params.fixed_bonus;
        self.min_bonus = params.min_bonus;
        self.earnings_cap = params.earnings_cap;
        self.admin_cap_exempt = params.admin_cap_exempt;
        Ok(())
    }
}

/// Policy parameters accepted by initialize_config / update_config
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigParams {
    pub general_referral_limit: u32,
    pub admin_referral_limit: u32,
    pub activity_threshold: u64,
    pub bonus_mode: BonusMode,
    pub fixed_bonus: u64,
    pub min_bonus: u64,
    pub earnings_cap: u64,
    pub admin_cap_exempt: bool,
}

impl Default for ConfigParams {
    fn default() -> Self {
        Self {
            general_referral_limit: DEFAULT_GENERAL_REFERRAL_LIMIT,
            admin_referral_limit: DEFAULT_ADMIN_REFERRAL_LIMIT,
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            bonus_mode: BonusMode::Fixed,
            fixed_bonus: DEFAULT_FIXED_BONUS,
            min_bonus: DEFAULT_MIN_BONUS,
            earnings_cap: DEFAULT_EARNINGS_CAP,
            admin_cap_exempt: true,
        }
    }
}

impl ConfigParams {
    pub fn validate(&self) -> Result<()> {
        require!(
            self.general_referral_limit > 0 && self.general_referral_limit <= MAX_ROSTER_SIZE,
            ErrorCode::InvalidParameter
        );
        require!(
            self.admin_referral_limit <= MAX_ROSTER_SIZE,
            ErrorCode::InvalidParameter
        );
        require!(self.earnings_cap > 0, ErrorCode::InvalidParameter);
        require!(self.min_bonus <= self.earnings_cap, ErrorCode::InvalidParameter);
        Ok(())
    }
}
