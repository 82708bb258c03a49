// ══════════════════════════════════════════════════════════════════════════════
// PDA SEEDS
// ══════════════════════════════════════════════════════════════════════════════

/// Referral config PDA seed (singleton)
pub const REFERRAL_CONFIG_SEED: &[u8] = b"referral_config_v1";

/// Member PDA seed: ["member_v1", owner_wallet]
pub const MEMBER_SEED: &[u8] = b"member_v1";

/// Referral roster PDA seed: ["roster_v1", member_pda]
pub const ROSTER_SEED: &[u8] = b"roster_v1";

/// Email claim PDA seed: ["email_v1", sha256(normalized_email)]
pub const EMAIL_CLAIM_SEED: &[u8] = b"email_v1";

/// Phone claim PDA seed: ["phone_v1", sha256(normalized_phone)]
pub const PHONE_CLAIM_SEED: &[u8] = b"phone_v1";

/// Referral code PDA seed: ["code_v1", CODE]
pub const REFERRAL_CODE_SEED: &[u8] = b"code_v1";

/// Order record PDA seed: ["order_v1", order_ref]
pub const ORDER_SEED: &[u8] = b"order_v1";

/// Bonus ledger entry PDA seed: ["bonus_v1", order_record_pda]
pub const BONUS_ENTRY_SEED: &[u8] = b"bonus_v1";

// ══════════════════════════════════════════════════════════════════════════════
// REFERRAL CODES
// ══════════════════════════════════════════════════════════════════════════════

/// Referral code length in characters
pub const REFERRAL_CODE_LEN: usize = 8;

/// Code alphabet: 32 symbols, no 0/O/1/I lookalikes
pub const REFERRAL_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Domain separator mixed into code derivation
pub const REFERRAL_CODE_DOMAIN: &[u8] = b"maraline-code";

/// Candidate codes tried per registration before giving up
/// 40 bits of code space - a second collision is already vanishingly rare
pub const MAX_CODE_ATTEMPTS: u8 = 4;

// ══════════════════════════════════════════════════════════════════════════════
// CONTACT VALIDATION
// ══════════════════════════════════════════════════════════════════════════════

/// Maximum email length accepted (RFC 5321 path limit)
pub const MAX_EMAIL_LEN: usize = 254;

/// Normalized Turkish mobile number length: 05XXXXXXXXX
pub const PHONE_LEN: usize = 11;

/// Turkish country calling code
pub const TR_COUNTRY_CODE: &str = "90";

// ══════════════════════════════════════════════════════════════════════════════
// CAPACITY DEFAULTS
// ══════════════════════════════════════════════════════════════════════════════

/// Hard ceiling on direct referrals held by one roster account
/// Bounds roster account space and the eviction walk
pub const MAX_ROSTER_SIZE: u32 = 32;

/// Default general referral limit per sponsor
pub const DEFAULT_GENERAL_REFERRAL_LIMIT: u32 = 10;

/// Default admin-tier referral limit (0 = fall back to general limit)
pub const DEFAULT_ADMIN_REFERRAL_LIMIT: u32 = 32;

// ══════════════════════════════════════════════════════════════════════════════
// BONUS DEFAULTS (amounts in kuruş, 1 TRY = 100 kuruş)
// ══════════════════════════════════════════════════════════════════════════════

/// Default cumulative spend for a member to count as active (1000 TRY)
pub const DEFAULT_ACTIVITY_THRESHOLD: u64 = 100_000;

/// Default fixed bonus per qualifying order (200 TRY)
pub const DEFAULT_FIXED_BONUS: u64 = 20_000;

/// Default minimum bonus floor (0 = no floor)
pub const DEFAULT_MIN_BONUS: u64 = 0;

/// Default lifetime earnings cap per member (20000 TRY)
pub const DEFAULT_EARNINGS_CAP: u64 = 2_000_000;

/// Maximum bonus ledger description length (bytes)
pub const MAX_DESCRIPTION_LEN: usize = 64;
