use anchor_lang::prelude::*;
use anchor_lang::solana_program::hash::hashv;
use crate::constants::*;

/// Derive the `attempt`-th referral code candidate for a new member
///
/// 40 bits of sha256(domain || owner || attempt) mapped onto the 32-symbol
/// alphabet, 5 bits per character. Deterministic so the client can derive
/// the candidate PDAs it must pass in.
pub fn derive_referral_code(owner: &Pubkey, attempt: u8) -> [u8; REFERRAL_CODE_LEN] {
    let digest = hashv(&[REFERRAL_CODE_DOMAIN, owner.as_ref(), &[attempt]]).to_bytes();

    let bits = digest[..5]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | *byte as u64);

    let mut code = [0u8; REFERRAL_CODE_LEN];
    for (i, slot) in code.iter_mut().enumerate() {
        let shift = 35 - 5 * i as u32;
        *slot = REFERRAL_CODE_ALPHABET[((bits >> shift) & 0x1f) as usize];
    }
    code
}

/// Case-insensitive form of a user-typed code, None when it cannot match any code
pub fn normalize_referral_code(input: &str) -> Option<[u8; REFERRAL_CODE_LEN]> {
    let trimmed = input.trim();
    if trimmed.len() != REFERRAL_CODE_LEN {
        return None;
    }

    let mut code = [0u8; REFERRAL_CODE_LEN];
    for (slot, byte) in code.iter_mut().zip(trimmed.bytes()) {
        if !byte.is_ascii_alphanumeric() {
            return None;
        }
        *slot = byte.to_ascii_uppercase();
    }
    Some(code)
}

pub fn find_code_address(code: &[u8; REFERRAL_CODE_LEN]) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REFERRAL_CODE_SEED, code.as_ref()], &crate::ID)
}

/// Readable form for logs
pub fn code_to_string(code: &[u8; REFERRAL_CODE_LEN]) -> String {
    String::from_utf8_lossy(code).into_owned()
}
