use anchor_lang::prelude::*;

/// Maraline Referral Error Codes
///
/// Validation errors are user-correctable and surface to the storefront form.
/// Capacity errors are business outcomes. The rest are invariant violations.
#[error_code]
pub enum ErrorCode {
    // Registration validation
    #[msg("Email already registered")]
    DuplicateEmail,

    #[msg("Phone already registered")]
    DuplicatePhone,

    #[msg("Phone must be a Turkish mobile number (05XXXXXXXXX)")]
    InvalidPhoneFormat,

    #[msg("Invalid email address")]
    InvalidEmailFormat,

    #[msg("Unknown referral code")]
    UnknownReferralCode,

    #[msg("Terms must be accepted")]
    TermsNotAccepted,

    #[msg("Invalid parameter")]
    InvalidParameter,

    // Sponsor capacity
    #[msg("Sponsor referral code is not active")]
    SponsorNotActive,

    #[msg("Sponsor has no free referral slot")]
    CapacityExhausted,

    #[msg("Eviction not allowed - sponsor has a free slot")]
    EvictionNotRequired,

    #[msg("Eviction candidate is not the oldest inactive referral")]
    InvalidEvictionCandidate,

    #[msg("Roster member account missing or out of order")]
    RosterAccountMissing,

    #[msg("Roster is full")]
    RosterFull,

    // Invariants
    #[msg("Sponsor account does not match referral code")]
    SponsorMismatch,

    #[msg("No free referral code candidate")]
    ReferralCodeSpaceExhausted,

    #[msg("Account does not match expected address")]
    InvalidAccountAddress,

    #[msg("Invalid account owner")]
    InvalidAccountOwner,

    #[msg("Order does not belong to buyer")]
    OrderMismatch,

    #[msg("Arithmetic overflow")]
    MathOverflow,

    // Admin operations
    #[msg("Unauthorized")]
    UnauthorizedAccess,

    #[msg("No pending authority transfer")]
    NoPendingAuthorityTransfer,
}
