use anchor_lang::prelude::*;
use crate::constants::*;
use crate::errors::ErrorCode;
use crate::state::*;

// ACCOUNTS - Instruction account validation structs

#[derive(Accounts)]
pub struct InitializeConfig<'info> {
    #[account(
        init,
        payer = authority,
        space = 8 + ReferralConfig::LEN,
        seeds = [REFERRAL_CONFIG_SEED],
        bump
    )]
    pub config: Account<'info, ReferralConfig>,
    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct AdminControl<'info> {
    #[account(
        mut,
        seeds = [REFERRAL_CONFIG_SEED],
        bump = config.bump,
        constraint = authority.key() == config.authority @ ErrorCode::UnauthorizedAccess
    )]
    pub config: Account<'info, ReferralConfig>,
    pub authority: Signer<'info>,
}

/// AcceptAuthority - second step of the authority transfer, signed by the proposed key
#[derive(Accounts)]
pub struct AcceptAuthority<'info> {
    #[account(mut, seeds = [REFERRAL_CONFIG_SEED], bump = config.bump)]
    pub config: Account<'info, ReferralConfig>,
    pub new_authority: Signer<'info>,
}

/// RegisterRootMember - seed member without sponsor (tree root)
///
/// remaining_accounts: referral code candidate PDAs for attempts 0..n
#[derive(Accounts)]
pub struct RegisterRootMember<'info> {
    #[account(
        mut,
        seeds = [REFERRAL_CONFIG_SEED],
        bump = config.bump,
        constraint = authority.key() == config.authority @ ErrorCode::UnauthorizedAccess
    )]
    pub config: Box<Account<'info, ReferralConfig>>,
    #[account(
        init,
        payer = authority,
        space = 8 + Member::LEN,
        seeds = [MEMBER_SEED, owner.key().as_ref()],
        bump
    )]
    pub member: Box<Account<'info, Member>>,
    #[account(
        init,
        payer = authority,
        space = 8 + ReferralRoster::LEN,
        seeds = [ROSTER_SEED, member.key().as_ref()],
        bump
    )]
    pub roster: Box<Account<'info, ReferralRoster>>,
    /// CHECK: Email claim PDA - address derived from the normalized email and verified in the handler
    #[account(mut)]
    pub email_claim: UncheckedAccount<'info>,
    /// CHECK: Phone claim PDA - address derived from the normalized phone and verified in the handler
    #[account(mut)]
    pub phone_claim: UncheckedAccount<'info>,
    /// CHECK: Wallet of the new member, identity handle only
    pub owner: UncheckedAccount<'info>,
    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

/// RegisterMember - admission under a sponsor's referral code
///
/// SECURITY NOTES:
/// - sponsor_code: PDA of the normalized code, verified in the handler, and
///   its `member` must be sponsor_member.
/// - evicted_*: present only when the sponsor is full. Unchecked so that a
///   registration racing for an already reclaimed slot reaches the capacity
///   check. The handler proves evicted_member is the oldest evictable
///   referral (roster prefix walk) and that every evicted account belongs
///   to it before closing them.
///
/// remaining_accounts: `code_candidates` referral code candidate PDAs,
/// followed by the Member accounts of the sponsor roster prefix (oldest
/// first) when an eviction is requested.
#[derive(Accounts)]
pub struct RegisterMember<'info> {
    #[account(mut, seeds = [REFERRAL_CONFIG_SEED], bump = config.bump)]
    pub config: Box<Account<'info, ReferralConfig>>,
    #[account(
        init,
        payer = owner,
        space = 8 + Member::LEN,
        seeds = [MEMBER_SEED, owner.key().as_ref()],
        bump
    )]
    pub member: Box<Account<'info, Member>>,
    #[account(
        init,
        payer = owner,
        space = 8 + ReferralRoster::LEN,
        seeds = [ROSTER_SEED, member.key().as_ref()],
        bump
    )]
    pub roster: Box<Account<'info, ReferralRoster>>,
    /// CHECK: Email claim PDA - verified in the handler
    #[account(mut)]
    pub email_claim: UncheckedAccount<'info>,
    /// CHECK: Phone claim PDA - verified in the handler
    #[account(mut)]
    pub phone_claim: UncheckedAccount<'info>,
    /// CHECK: ReferralCode PDA of the code the registrant typed - verified in the handler
    pub sponsor_code: UncheckedAccount<'info>,
    #[account(
        mut,
        seeds = [MEMBER_SEED, sponsor_member.owner.as_ref()],
        bump = sponsor_member.bump
    )]
    pub sponsor_member: Box<Account<'info, Member>>,
    #[account(
        mut,
        seeds = [ROSTER_SEED, sponsor_member.key().as_ref()],
        bump = sponsor_roster.bump
    )]
    pub sponsor_roster: Box<Account<'info, ReferralRoster>>,
    /// CHECK: Member being evicted - loaded and checked against the roster in the handler
    #[account(mut)]
    pub evicted_member: Option<UncheckedAccount<'info>>,
    /// CHECK: ReferralRoster of the evicted member - loaded and checked in the handler
    #[account(mut)]
    pub evicted_roster: Option<UncheckedAccount<'info>>,
    /// CHECK: Email ContactClaim of the evicted member - loaded and checked in the handler
    #[account(mut)]
    pub evicted_email_claim: Option<UncheckedAccount<'info>>,
    /// CHECK: Phone ContactClaim of the evicted member - loaded and checked in the handler
    #[account(mut)]
    pub evicted_phone_claim: Option<UncheckedAccount<'info>>,
    /// CHECK: ReferralCode of the evicted member - loaded and checked in the handler
    #[account(mut)]
    pub evicted_code: Option<UncheckedAccount<'info>>,
    /// CHECK: Receives the rent of the evicted accounts - must equal the evicted member's owner
    #[account(mut)]
    pub evicted_owner: Option<UncheckedAccount<'info>>,
    #[account(mut)]
    pub owner: Signer<'info>,
    pub system_program: Program<'info, System>,
}

/// MemberAdmin - authority-only changes to one member, roster attached for capacity checks
#[derive(Accounts)]
pub struct MemberAdmin<'info> {
    #[account(
        seeds = [REFERRAL_CONFIG_SEED],
        bump = config.bump,
        constraint = authority.key() == config.authority @ ErrorCode::UnauthorizedAccess
    )]
    pub config: Box<Account<'info, ReferralConfig>>,
    #[account(
        mut,
        seeds = [MEMBER_SEED, member.owner.as_ref()],
        bump = member.bump
    )]
    pub member: Box<Account<'info, Member>>,
    #[account(seeds = [ROSTER_SEED, member.key().as_ref()], bump = roster.bump)]
    pub roster: Box<Account<'info, ReferralRoster>>,
    pub authority: Signer<'info>,
}

/// RecordOrder - order store mirrors a completed order
#[derive(Accounts)]
#[instruction(order_ref: [u8; 32])]
pub struct RecordOrder<'info> {
    #[account(
        seeds = [REFERRAL_CONFIG_SEED],
        bump = config.bump,
        constraint = authority.key() == config.authority @ ErrorCode::UnauthorizedAccess
    )]
    pub config: Box<Account<'info, ReferralConfig>>,
    #[account(
        init,
        payer = authority,
        space = 8 + OrderRecord::LEN,
        seeds = [ORDER_SEED, order_ref.as_ref()],
        bump
    )]
    pub order: Box<Account<'info, OrderRecord>>,
    #[account(
        mut,
        seeds = [MEMBER_SEED, buyer.owner.as_ref()],
        bump = buyer.bump
    )]
    pub buyer: Box<Account<'info, Member>>,
    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

/// ProcessOrder - permissionless crank, idempotent per order
///
/// sponsor must be the buyer's sponsor (None for root buyers).
/// bonus_entry is the ["bonus_v1", order] PDA, required when a bonus is paid.
#[derive(Accounts)]
pub struct ProcessOrder<'info> {
    #[account(mut, seeds = [REFERRAL_CONFIG_SEED], bump = config.bump)]
    pub config: Box<Account<'info, ReferralConfig>>,
    #[account(
        mut,
        seeds = [ORDER_SEED, order.order_ref.as_ref()],
        bump = order.bump
    )]
    pub order: Box<Account<'info, OrderRecord>>,
    #[account(
        mut,
        seeds = [MEMBER_SEED, buyer.owner.as_ref()],
        bump = buyer.bump,
        constraint = order.buyer == buyer.key() @ ErrorCode::OrderMismatch
    )]
    pub buyer: Box<Account<'info, Member>>,
    #[account(mut)]
    pub sponsor: Option<Box<Account<'info, Member>>>,
    /// CHECK: Bonus ledger PDA - verified and created in the handler
    #[account(mut)]
    pub bonus_entry: Option<UncheckedAccount<'info>>,
    #[account(mut)]
    pub payer: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct ReevaluateMember<'info> {
    #[account(seeds = [REFERRAL_CONFIG_SEED], bump = config.bump)]
    pub config: Box<Account<'info, ReferralConfig>>,
    #[account(
        mut,
        seeds = [MEMBER_SEED, member.owner.as_ref()],
        bump = member.bump
    )]
    pub member: Box<Account<'info, Member>>,
}

/// ResolveSponsorCapacity - read-only capacity view
///
/// remaining_accounts: roster prefix Member accounts, needed only to name
/// a reclaim candidate for a full sponsor.
#[derive(Accounts)]
pub struct ResolveSponsorCapacity<'info> {
    #[account(seeds = [REFERRAL_CONFIG_SEED], bump = config.bump)]
    pub config: Box<Account<'info, ReferralConfig>>,
    #[account(seeds = [MEMBER_SEED, sponsor_member.owner.as_ref()], bump = sponsor_member.bump)]
    pub sponsor_member: Box<Account<'info, Member>>,
    #[account(seeds = [ROSTER_SEED, sponsor_member.key().as_ref()], bump = sponsor_roster.bump)]
    pub sponsor_roster: Box<Account<'info, ReferralRoster>>,
}

// INSTRUCTION ARGUMENTS

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegisterMemberArgs {
    /// Raw email as typed; normalized on-chain
    pub email: String,
    /// Raw phone as typed; normalized on-chain
    pub phone: String,
    /// Sponsor referral code as typed (case-insensitive)
    pub sponsor_code: String,
    pub accepted_terms: bool,
    /// Referral code candidate PDAs at the head of remaining_accounts
    pub code_candidates: u8,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegisterRootMemberArgs {
    pub email: String,
    pub phone: String,
    pub role: MemberRole,
    pub code_candidates: u8,
}
