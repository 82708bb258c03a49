use anchor_lang::prelude::*;
use anchor_lang::solana_program::hash::hashv;
use crate::constants::*;
use crate::errors::ErrorCode;
use crate::state::ContactKind;

/// Trim and lowercase an email, rejecting obviously malformed input
pub fn normalize_email(input: &str) -> Result<String> {
    let email = input.trim().to_lowercase();

    require!(
        !email.is_empty() && email.len() <= MAX_EMAIL_LEN,
        ErrorCode::InvalidEmailFormat
    );
    require!(
        !email.chars().any(|c| c.is_whitespace() || c.is_control()),
        ErrorCode::InvalidEmailFormat
    );

    let mut parts = email.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    require!(parts.next().is_none(), ErrorCode::InvalidEmailFormat);
    require!(!local.is_empty(), ErrorCode::InvalidEmailFormat);
    require!(
        domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        ErrorCode::InvalidEmailFormat
    );
    require!(!domain.contains(".."), ErrorCode::InvalidEmailFormat);

    Ok(email)
}

/// Normalize a Turkish mobile number to 05XXXXXXXXX
///
/// Accepts +90 / 0090 / 90 / 0 prefixes or a bare 5XXXXXXXXX, with the usual
/// separators (spaces, dashes, dots, parentheses).
pub fn normalize_phone(input: &str) -> Result<String> {
    let trimmed = input.trim();
    require!(
        trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '.' | '(' | ')')),
        ErrorCode::InvalidPhoneFormat
    );

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    let national: &str = if let Some(rest) = digits.strip_prefix("00").and_then(|d| d.strip_prefix(TR_COUNTRY_CODE)) {
        rest
    } else if digits.len() == PHONE_LEN + 1 {
        digits.strip_prefix(TR_COUNTRY_CODE).unwrap_or(digits.as_str())
    } else if digits.len() == PHONE_LEN {
        digits.strip_prefix('0').unwrap_or(digits.as_str())
    } else {
        digits.as_str()
    };

    // national significant number: 5XXXXXXXXX
    require!(
        national.len() == PHONE_LEN - 1 && national.starts_with('5'),
        ErrorCode::InvalidPhoneFormat
    );

    Ok(format!("0{}", national))
}

/// Seed prefix of the claim PDA for a contact kind
pub fn claim_seed(kind: ContactKind) -> &'static [u8] {
    match kind {
        ContactKind::Email => EMAIL_CLAIM_SEED,
        ContactKind::Phone => PHONE_CLAIM_SEED,
    }
}

/// Digest of a normalized contact value, domain-separated by kind
pub fn contact_digest(kind: ContactKind, normalized: &str) -> [u8; 32] {
    hashv(&[claim_seed(kind), normalized.as_bytes()]).to_bytes()
}

pub fn find_claim_address(kind: ContactKind, digest: &[u8; 32]) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[claim_seed(kind), digest.as_ref()], &crate::ID)
}
