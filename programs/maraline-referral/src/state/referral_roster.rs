use anchor_lang::prelude::*;
use crate::constants::MAX_ROSTER_SIZE;
use crate::errors::ErrorCode;

/// One direct referral held by a sponsor
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RosterEntry {
    /// Child Member PDA
    pub member: Pubkey,

    /// Child registration timestamp
    pub registered_at: i64,
}

impl RosterEntry {
    pub const LEN: usize = 32 + 8;
}

/// Direct referrals of one sponsor, oldest first
///
/// Adjacency index over `Member::sponsor`. Entries are appended at
/// admission and removed only by eviction, so vector order is registration
/// order and `children.len()` is the sponsor's occupancy.
///
/// PDA Seeds: ["roster_v1", sponsor_member]
#[account]
#[derive(Default)]
pub struct ReferralRoster {
    /// Member PDA this roster belongs to
    pub sponsor: Pubkey,

    /// Direct referrals in registration order
    pub children: Vec<RosterEntry>,

    /// Referrals ever admitted (lifetime)
    pub total_admitted: u64,

    /// Referrals evicted (lifetime)
    pub total_evicted: u64,

    /// PDA bump seed
    pub bump: u8,
}

impl ReferralRoster {
    /// Account size calculation:
    /// - sponsor: 32 bytes
    /// - children: 4 + 40 * MAX_ROSTER_SIZE bytes
    /// - total_admitted, total_evicted: 16 bytes
    /// - bump: 1 byte
    /// Total: 1333 bytes
    pub const LEN: usize = 32 + 4 + RosterEntry::LEN * MAX_ROSTER_SIZE as usize + 8 * 2 + 1;

    pub fn occupancy(&self) -> u32 {
        self.children.len() as u32
    }

    pub fn position(&self, member: &Pubkey) -> Option<usize> {
        self.children.iter().position(|entry| entry.member == *member)
    }

    pub fn push(&mut self, entry: RosterEntry) -> Result<()> {
        require!(self.occupancy() < MAX_ROSTER_SIZE, ErrorCode::RosterFull);
        self.children.push(entry);
        self.total_admitted = self.total_admitted.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        Ok(())
    }

    /// Remove the entry at `index`, keeping the remaining order intact
    pub fn evict_at(&mut self, index: usize) -> Result<RosterEntry> {
        require!(index < self.children.len(), ErrorCode::InvalidEvictionCandidate);
        let entry = self.children.remove(index);
        self.total_evicted = self.total_evicted.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        Ok(entry)
    }
}
