use anchor_lang::prelude::*;

pub mod constants;
pub mod contexts;
pub mod errors;
pub mod events;
pub mod helpers;
pub mod state;

pub use constants::*;
pub use contexts::*;
pub use errors::ErrorCode;
pub use events::*;
pub use helpers::*;
pub use state::*;

#[cfg(test)]
mod formal_verification;

declare_id!("FEXnZEiXcMXKTZDnMUH7FhVHzSfjpoGXV3F9LADPsYLQ");

/// Digests and PDA bumps of a registrant's verified, still-free contacts
struct VerifiedContacts {
    email_digest: [u8; 32],
    email_bump: u8,
    phone_digest: [u8; 32],
    phone_bump: u8,
}

/// Check a claim PDA address and that nobody holds it yet. Returns the bump.
fn check_contact_free(
    claim: &AccountInfo,
    kind: ContactKind,
    digest: &[u8; 32],
    taken: ErrorCode,
) -> Result<u8> {
    let (expected, bump) = find_claim_address(kind, digest);
    require_keys_eq!(claim.key(), expected, ErrorCode::InvalidAccountAddress);
    if is_initialized(claim) {
        return Err(taken.into());
    }
    Ok(bump)
}

/// Normalize and uniqueness-check email then phone (extracted to reduce stack usage)
#[inline(never)]
fn verify_contacts(
    email_claim: &AccountInfo,
    phone_claim: &AccountInfo,
    email: &str,
    phone: &str,
) -> Result<VerifiedContacts> {
    let email = normalize_email(email)?;
    let email_digest = contact_digest(ContactKind::Email, &email);
    let email_bump = check_contact_free(email_claim, ContactKind::Email, &email_digest, ErrorCode::DuplicateEmail)?;

    let phone = normalize_phone(phone)?;
    let phone_digest = contact_digest(ContactKind::Phone, &phone);
    let phone_bump = check_contact_free(phone_claim, ContactKind::Phone, &phone_digest, ErrorCode::DuplicatePhone)?;

    #[cfg(feature = "verbose")]
    msg!("Contacts verified: email_claim={}, phone_claim={}", email_claim.key(), phone_claim.key());

    Ok(VerifiedContacts { email_digest, email_bump, phone_digest, phone_bump })
}

/// Create and write one ContactClaim PDA (extracted to reduce stack usage)
#[inline(never)]
#[allow(clippy::too_many_arguments)]
fn create_contact_claim<'info>(
    payer: &AccountInfo<'info>,
    claim: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    kind: ContactKind,
    digest: &[u8; 32],
    bump: u8,
    member: Pubkey,
    now: i64,
) -> Result<()> {
    let bump_seed = [bump];
    let seeds: &[&[u8]] = &[claim_seed(kind), digest.as_ref(), &bump_seed];
    create_pda_account(payer, claim, system_program, 8 + ContactClaim::LEN, seeds)?;
    write_account(
        claim,
        &ContactClaim { kind, member, digest: *digest, claimed_at: now, bump },
    )
}

/// Take the first unused referral code among the candidate PDAs (attempt order)
#[inline(never)]
fn select_referral_code(owner: &Pubkey, candidates: &[AccountInfo]) -> Result<(usize, [u8; REFERRAL_CODE_LEN], u8)> {
    for (attempt, info) in candidates.iter().enumerate() {
        let code = derive_referral_code(owner, attempt as u8);
        let (expected, bump) = find_code_address(&code);
        require_keys_eq!(info.key(), expected, ErrorCode::InvalidAccountAddress);

        if !is_initialized(info) {
            return Ok((attempt, code, bump));
        }
        msg!("Referral code {} taken, retrying", code_to_string(&code));
    }
    err!(ErrorCode::ReferralCodeSpaceExhausted)
}

/// Create and write the ReferralCode PDA of a new member
#[inline(never)]
fn create_referral_code<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    code: [u8; REFERRAL_CODE_LEN],
    bump: u8,
    member: Pubkey,
    now: i64,
) -> Result<()> {
    let bump_seed = [bump];
    let seeds: &[&[u8]] = &[REFERRAL_CODE_SEED, code.as_ref(), &bump_seed];
    create_pda_account(payer, target, system_program, 8 + ReferralCode::LEN, seeds)?;
    write_account(target, &ReferralCode { code, member, created_at: now, bump })
}

/// Resolve the typed sponsor code to its ReferralCode PDA and match it to the sponsor
#[inline(never)]
fn resolve_sponsor_code(code_account: &AccountInfo, typed: &str, sponsor: &Pubkey) -> Result<()> {
    let code = normalize_referral_code(typed).ok_or(ErrorCode::UnknownReferralCode)?;
    let (expected, _) = find_code_address(&code);
    require_keys_eq!(code_account.key(), expected, ErrorCode::InvalidAccountAddress);
    require!(is_initialized(code_account), ErrorCode::UnknownReferralCode);

    let entry = load_account::<ReferralCode>(code_account)?;
    require_keys_eq!(entry.member, *sponsor, ErrorCode::SponsorMismatch);

    #[cfg(feature = "verbose")]
    msg!("Sponsor code {} -> {}", code_to_string(&code), sponsor);

    Ok(())
}

/// Member accounts of a roster prefix, passed as remaining accounts
fn load_roster_prefix(accounts: &[AccountInfo]) -> Result<Vec<(Pubkey, Member)>> {
    accounts
        .iter()
        .map(|info| Ok((*info.key, load_account::<Member>(info)?)))
        .collect()
}

/// Fresh member fields shared by root and sponsored registration
#[allow(clippy::too_many_arguments)]
fn init_member(
    member: &mut Member,
    owner: Pubkey,
    sponsor: Option<Pubkey>,
    referral_code: [u8; REFERRAL_CODE_LEN],
    contacts: &VerifiedContacts,
    role: MemberRole,
    now: i64,
    bump: u8,
) {
    member.owner = owner;
    member.sponsor = sponsor;
    member.referral_code = referral_code;
    member.email_digest = contacts.email_digest;
    member.phone_digest = contacts.phone_digest;
    member.role = role;
    member.is_referral_code_active = false;
    member.has_met_referral_threshold = false;
    member.special_referral_limit = None;
    member.used_backup_referral = false;
    member.registered_at = now;
    member.updated_at = now;
    member.bump = bump;
}

/// Account info of an optional eviction account, required once an eviction is planned
fn evicted_info<'info>(account: &Option<UncheckedAccount<'info>>) -> Result<AccountInfo<'info>> {
    Ok(account
        .as_ref()
        .ok_or(ErrorCode::InvalidEvictionCandidate)?
        .to_account_info())
}

/// Verify every evicted account belongs to the evicted roster entry, then
/// close them all to the evicted owner. Returns the evicted owner wallet.
#[inline(never)]
fn close_evicted(accounts: &RegisterMember, entry: &RosterEntry) -> Result<Pubkey> {
    let member_info = evicted_info(&accounts.evicted_member)?;
    let member_key = member_info.key();
    require_keys_eq!(member_key, entry.member, ErrorCode::InvalidEvictionCandidate);
    let member = load_account::<Member>(&member_info)?;
    require!(member.is_evictable(), ErrorCode::InvalidEvictionCandidate);

    let roster_info = evicted_info(&accounts.evicted_roster)?;
    let roster = load_account::<ReferralRoster>(&roster_info)?;
    require_keys_eq!(roster.sponsor, member_key, ErrorCode::InvalidEvictionCandidate);
    require!(roster.children.is_empty(), ErrorCode::InvalidEvictionCandidate);

    let email_info = evicted_info(&accounts.evicted_email_claim)?;
    let email = load_account::<ContactClaim>(&email_info)?;
    require_keys_eq!(email.member, member_key, ErrorCode::InvalidEvictionCandidate);
    require!(
        email.kind == ContactKind::Email && email.digest == member.email_digest,
        ErrorCode::InvalidEvictionCandidate
    );

    let phone_info = evicted_info(&accounts.evicted_phone_claim)?;
    let phone = load_account::<ContactClaim>(&phone_info)?;
    require_keys_eq!(phone.member, member_key, ErrorCode::InvalidEvictionCandidate);
    require!(
        phone.kind == ContactKind::Phone && phone.digest == member.phone_digest,
        ErrorCode::InvalidEvictionCandidate
    );

    let code_info = evicted_info(&accounts.evicted_code)?;
    let code = load_account::<ReferralCode>(&code_info)?;
    require_keys_eq!(code.member, member_key, ErrorCode::InvalidEvictionCandidate);
    require!(code.code == member.referral_code, ErrorCode::InvalidEvictionCandidate);

    let recipient = evicted_info(&accounts.evicted_owner)?;
    require_keys_eq!(recipient.key(), member.owner, ErrorCode::InvalidAccountAddress);

    for info in [&roster_info, &email_info, &phone_info, &code_info, &member_info] {
        close_account(info, &recipient)?;
    }

    Ok(member.owner)
}

/// Create the ledger entry for a credited bonus (extracted to reduce stack usage)
#[inline(never)]
fn write_bonus_entry<'info>(
    accounts: &ProcessOrder<'info>,
    sponsor: Pubkey,
    settlement: &Settlement,
    now: i64,
) -> Result<()> {
    let order_key = accounts.order.key();
    let entry_info = accounts
        .bonus_entry
        .as_ref()
        .ok_or(ErrorCode::InvalidAccountAddress)?
        .to_account_info();

    let (expected, bump) =
        Pubkey::find_program_address(&[BONUS_ENTRY_SEED, order_key.as_ref()], &crate::ID);
    require_keys_eq!(entry_info.key(), expected, ErrorCode::InvalidAccountAddress);

    let bump_seed = [bump];
    create_pda_account(
        &accounts.payer.to_account_info(),
        &entry_info,
        &accounts.system_program.to_account_info(),
        8 + BonusEntry::LEN,
        &[BONUS_ENTRY_SEED, order_key.as_ref(), &bump_seed],
    )?;

    write_account(
        &entry_info,
        &BonusEntry {
            sponsor,
            buyer: accounts.buyer.key(),
            order: order_key,
            amount: settlement.applied,
            requested_amount: settlement.requested,
            created_at: now,
            description: bonus_description(&accounts.order.order_ref),
            bump,
        },
    )
}

/// Reject a capacity change that would leave the member holding more
/// referrals than its new effective limit
fn require_limit_covers(member: &Member, roster: &ReferralRoster, config: &ReferralConfig) -> Result<()> {
    require!(
        effective_limit(member, config) >= roster.occupancy(),
        ErrorCode::InvalidParameter
    );
    Ok(())
}

#[program]
pub mod maraline_referral {
    use super::*;

    pub fn initialize_config(ctx: Context<InitializeConfig>, params: ConfigParams) -> Result<()> {
        let config = &mut ctx.accounts.config;
        let clock = Clock::get()?;

        config.authority = ctx.accounts.authority.key();
        config.pending_authority = None;
        config.apply_params(&params)?;
        config.total_members = 0;
        config.total_evictions = 0;
        config.total_orders_processed = 0;
        config.total_bonus_paid = 0;
        config.initialized_at = clock.unix_timestamp;
        config.bump = ctx.bumps.config;

        emit!(ConfigInitialized {
            authority: config.authority,
            general_referral_limit: config.general_referral_limit,
            admin_referral_limit: config.admin_referral_limit,
            timestamp: clock.unix_timestamp,
        });

        msg!("Referral config initialized, authority {}", config.authority);
        Ok(())
    }

    /// Lowering a limit never evicts: sponsors above the new limit simply
    /// cannot admit until their occupancy drops.
    pub fn update_config(ctx: Context<AdminControl>, params: ConfigParams) -> Result<()> {
        let config = &mut ctx.accounts.config;
        config.apply_params(&params)?;

        emit!(ConfigUpdated {
            general_referral_limit: config.general_referral_limit,
            admin_referral_limit: config.admin_referral_limit,
            activity_threshold: config.activity_threshold,
            earnings_cap: config.earnings_cap,
            timestamp: Clock::get()?.unix_timestamp,
        });

        msg!(
            "Config updated: limits {}/{}, threshold {}, mode {:?}",
            config.general_referral_limit, config.admin_referral_limit,
            config.activity_threshold, config.bonus_mode
        );
        Ok(())
    }

    pub fn propose_authority(ctx: Context<AdminControl>, new_authority: Pubkey) -> Result<()> {
        require!(new_authority != Pubkey::default(), ErrorCode::InvalidParameter);

        let config = &mut ctx.accounts.config;
        config.pending_authority = Some(new_authority);

        emit!(AuthorityTransferProposed {
            current_authority: config.authority,
            proposed_authority: new_authority,
            timestamp: Clock::get()?.unix_timestamp,
        });
        Ok(())
    }

    pub fn accept_authority(ctx: Context<AcceptAuthority>) -> Result<()> {
        let config = &mut ctx.accounts.config;
        let pending = config.pending_authority.ok_or(ErrorCode::NoPendingAuthorityTransfer)?;
        require_keys_eq!(pending, ctx.accounts.new_authority.key(), ErrorCode::UnauthorizedAccess);

        let old_authority = config.authority;
        config.authority = pending;
        config.pending_authority = None;

        emit!(AuthorityTransferred {
            old_authority,
            new_authority: pending,
            timestamp: Clock::get()?.unix_timestamp,
        });

        msg!("Authority transferred {} -> {}", old_authority, pending);
        Ok(())
    }

    /// Seed member without sponsor. Authority pays and signs.
    pub fn register_root_member<'info>(
        ctx: Context<'_, '_, 'info, 'info, RegisterRootMember<'info>>,
        args: RegisterRootMemberArgs,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let owner_key = ctx.accounts.owner.key();
        let member_key = ctx.accounts.member.key();

        let slots = args.code_candidates as usize;
        require!(
            slots > 0 && slots <= MAX_CODE_ATTEMPTS as usize && slots <= ctx.remaining_accounts.len(),
            ErrorCode::InvalidParameter
        );

        let contacts = verify_contacts(
            &ctx.accounts.email_claim,
            &ctx.accounts.phone_claim,
            &args.email,
            &args.phone,
        )?;
        let (attempt, code, code_bump) = select_referral_code(&owner_key, &ctx.remaining_accounts[..slots])?;

        let payer = ctx.accounts.authority.to_account_info();
        let system_program = ctx.accounts.system_program.to_account_info();
        create_contact_claim(
            &payer, &ctx.accounts.email_claim.to_account_info(), &system_program,
            ContactKind::Email, &contacts.email_digest, contacts.email_bump, member_key, now,
        )?;
        create_contact_claim(
            &payer, &ctx.accounts.phone_claim.to_account_info(), &system_program,
            ContactKind::Phone, &contacts.phone_digest, contacts.phone_bump, member_key, now,
        )?;
        create_referral_code(
            &payer, &ctx.remaining_accounts[attempt], &system_program,
            code, code_bump, member_key, now,
        )?;

        init_member(
            &mut ctx.accounts.member,
            owner_key, None, code, &contacts, args.role, now, ctx.bumps.member,
        );

        let roster = &mut ctx.accounts.roster;
        roster.sponsor = member_key;
        roster.bump = ctx.bumps.roster;

        let config = &mut ctx.accounts.config;
        config.total_members = config.total_members.checked_add(1).ok_or(ErrorCode::MathOverflow)?;

        emit!(MemberRegistered {
            member: member_key,
            owner: owner_key,
            sponsor: None,
            referral_code: code,
            sponsor_occupancy: 0,
            sponsor_limit: 0,
            timestamp: now,
        });
        emit!(EmailConfirmationRequested {
            member: member_key,
            owner: owner_key,
            email_digest: contacts.email_digest,
            timestamp: now,
        });

        msg!("Root member {} registered, code {}", member_key, code_to_string(&code));
        Ok(())
    }

    /// Admission under a sponsor's referral code
    ///
    /// Gates run in order: contacts, sponsor code, capacity (with eviction
    /// plan), terms. Nothing is written before all of them pass.
    pub fn register_member<'info>(
        ctx: Context<'_, '_, 'info, 'info, RegisterMember<'info>>,
        args: RegisterMemberArgs,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let owner_key = ctx.accounts.owner.key();
        let member_key = ctx.accounts.member.key();
        let sponsor_key = ctx.accounts.sponsor_member.key();

        let slots = args.code_candidates as usize;
        require!(
            slots > 0 && slots <= MAX_CODE_ATTEMPTS as usize && slots <= ctx.remaining_accounts.len(),
            ErrorCode::InvalidParameter
        );
        let (code_accounts, prefix_accounts) = ctx.remaining_accounts.split_at(slots);

        // 1. Email and phone
        let contacts = verify_contacts(
            &ctx.accounts.email_claim,
            &ctx.accounts.phone_claim,
            &args.email,
            &args.phone,
        )?;

        // 2. Sponsor by referral code
        resolve_sponsor_code(&ctx.accounts.sponsor_code, &args.sponsor_code, &sponsor_key)?;

        // 3. Capacity
        let prefix = load_roster_prefix(prefix_accounts)?;
        let candidate = ctx.accounts.evicted_member.as_ref().map(|m| m.key());
        // A member closed by a competing admission has no state left to load
        let evicted_snapshot: Option<(Pubkey, Member)> = match ctx.accounts.evicted_member.as_ref() {
            Some(info) if is_initialized(info) => Some((info.key(), load_account::<Member>(info)?)),
            _ => None,
        };

        let (view, plan) = plan_admission(
            &ctx.accounts.sponsor_member,
            &ctx.accounts.sponsor_roster,
            &ctx.accounts.config,
            candidate,
            |key| {
                prefix
                    .iter()
                    .chain(evicted_snapshot.iter())
                    .find(|(k, _)| k == key)
                    .map(|(_, m)| m)
            },
        )?;

        #[cfg(feature = "verbose")]
        msg!("Capacity {}/{}, plan {:?}", view.occupied, view.limit, plan);

        // 4. Terms
        require!(args.accepted_terms, ErrorCode::TermsNotAccepted);

        let (attempt, code, code_bump) = select_referral_code(&owner_key, code_accounts)?;

        // All gates passed: evict (if planned), re-check, append
        let evicted = apply_admission(
            &mut ctx.accounts.sponsor_roster,
            plan,
            view.limit,
            RosterEntry { member: member_key, registered_at: now },
        )?;

        if let Some(entry) = evicted {
            let evicted_owner = close_evicted(&ctx.accounts, &entry)?;

            let config = &mut ctx.accounts.config;
            config.total_members = config.total_members.saturating_sub(1);
            config.total_evictions = config.total_evictions.checked_add(1).ok_or(ErrorCode::MathOverflow)?;

            emit!(MemberEvicted {
                member: entry.member,
                owner: evicted_owner,
                sponsor: sponsor_key,
                registered_at: entry.registered_at,
                timestamp: now,
            });
            msg!("Evicted inactive referral {} from sponsor {}", entry.member, sponsor_key);
        }

        let occupancy = ctx.accounts.sponsor_roster.occupancy();
        let sponsor = &mut ctx.accounts.sponsor_member;
        sponsor.referral_count = occupancy;
        sponsor.updated_at = now;

        let payer = ctx.accounts.owner.to_account_info();
        let system_program = ctx.accounts.system_program.to_account_info();
        create_contact_claim(
            &payer, &ctx.accounts.email_claim.to_account_info(), &system_program,
            ContactKind::Email, &contacts.email_digest, contacts.email_bump, member_key, now,
        )?;
        create_contact_claim(
            &payer, &ctx.accounts.phone_claim.to_account_info(), &system_program,
            ContactKind::Phone, &contacts.phone_digest, contacts.phone_bump, member_key, now,
        )?;
        create_referral_code(
            &payer, &code_accounts[attempt], &system_program,
            code, code_bump, member_key, now,
        )?;

        init_member(
            &mut ctx.accounts.member,
            owner_key, Some(sponsor_key), code, &contacts, MemberRole::Member, now, ctx.bumps.member,
        );

        let roster = &mut ctx.accounts.roster;
        roster.sponsor = member_key;
        roster.bump = ctx.bumps.roster;

        let config = &mut ctx.accounts.config;
        config.total_members = config.total_members.checked_add(1).ok_or(ErrorCode::MathOverflow)?;

        emit!(MemberRegistered {
            member: member_key,
            owner: owner_key,
            sponsor: Some(sponsor_key),
            referral_code: code,
            sponsor_occupancy: occupancy,
            sponsor_limit: view.limit,
            timestamp: now,
        });
        emit!(EmailConfirmationRequested {
            member: member_key,
            owner: owner_key,
            email_digest: contacts.email_digest,
            timestamp: now,
        });

        msg!(
            "Member {} registered under {} ({}/{}), code {}",
            member_key, sponsor_key, occupancy, view.limit, code_to_string(&code)
        );
        Ok(())
    }

    /// assignRole. Demotion is refused while the member holds more
    /// referrals than the member-tier limit allows.
    pub fn set_member_role(ctx: Context<MemberAdmin>, role: MemberRole) -> Result<()> {
        let member = &mut ctx.accounts.member;
        member.role = role;
        member.updated_at = Clock::get()?.unix_timestamp;
        require_limit_covers(member, &ctx.accounts.roster, &ctx.accounts.config)?;

        emit!(MemberRoleChanged {
            member: member.key(),
            is_admin: member.is_elevated(),
            timestamp: member.updated_at,
        });

        msg!("Member {} role set to {:?}", member.key(), role);
        Ok(())
    }

    /// Manual activation of a member's referral code
    pub fn set_referral_code_active(ctx: Context<MemberAdmin>, is_active: bool) -> Result<()> {
        let member = &mut ctx.accounts.member;
        member.is_referral_code_active = is_active;
        member.updated_at = Clock::get()?.unix_timestamp;

        emit!(ReferralCodeStatusChanged {
            member: member.key(),
            is_active,
            timestamp: member.updated_at,
        });

        msg!("Referral code of {} active={}", member.key(), is_active);
        Ok(())
    }

    /// None (or 0) falls back to the configured limits
    pub fn set_special_referral_limit(ctx: Context<MemberAdmin>, limit: Option<u32>) -> Result<()> {
        require!(
            limit.map_or(true, |l| l <= MAX_ROSTER_SIZE),
            ErrorCode::InvalidParameter
        );

        let member = &mut ctx.accounts.member;
        member.special_referral_limit = limit;
        member.updated_at = Clock::get()?.unix_timestamp;
        require_limit_covers(member, &ctx.accounts.roster, &ctx.accounts.config)?;

        emit!(SpecialReferralLimitChanged {
            member: member.key(),
            limit,
            timestamp: member.updated_at,
        });
        Ok(())
    }

    /// Order store mirrors a completed order. Counting it here is what makes
    /// a buyer ineligible for eviction.
    pub fn record_order(
        ctx: Context<RecordOrder>,
        order_ref: [u8; 32],
        total: u64,
        service_fee: u64,
    ) -> Result<()> {
        require!(service_fee <= total, ErrorCode::InvalidParameter);
        let now = Clock::get()?.unix_timestamp;

        let buyer = &mut ctx.accounts.buyer;
        buyer.order_count = buyer.order_count.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        buyer.updated_at = now;

        let order = &mut ctx.accounts.order;
        order.order_ref = order_ref;
        order.buyer = buyer.key();
        order.total = total;
        order.service_fee = service_fee;
        order.referral_processed = false;
        order.recorded_at = now;
        order.processed_at = 0;
        order.bump = ctx.bumps.order;

        emit!(OrderRecorded {
            order: order.key(),
            buyer: order.buyer,
            total,
            service_fee,
            timestamp: now,
        });

        let (lira, kurus) = format_kurus(total);
        msg!("Order {} recorded for {}: {}.{:02} TRY", order.key(), order.buyer, lira, kurus);
        Ok(())
    }

    /// Referral processing of one order. Idempotent: a processed order is a no-op.
    pub fn process_order(ctx: Context<ProcessOrder>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let accounts = &mut *ctx.accounts;
        let order_key = accounts.order.key();
        let buyer_key = accounts.buyer.key();

        if accounts.order.referral_processed {
            msg!("Order {} already processed, skipping", order_key);
            return Ok(());
        }

        let sponsor_key = match accounts.buyer.sponsor {
            Some(expected) => {
                let sponsor = accounts.sponsor.as_ref().ok_or(ErrorCode::SponsorMismatch)?;
                require_keys_eq!(sponsor.key(), expected, ErrorCode::SponsorMismatch);
                Some(expected)
            }
            None => {
                require!(accounts.sponsor.is_none(), ErrorCode::SponsorMismatch);
                None
            }
        };

        let settlement = settle_order(
            &mut accounts.order,
            &mut accounts.buyer,
            accounts.sponsor.as_deref_mut().map(|s| &mut **s),
            &mut accounts.config,
            now,
        )?;

        if let Some(sponsor) = sponsor_key {
            if settlement.applied > 0 {
                write_bonus_entry(accounts, sponsor, &settlement, now)?;

                let total_earned = accounts.sponsor.as_ref().map_or(0, |s| s.total_earned);
                emit!(BonusCredited {
                    sponsor,
                    order: order_key,
                    amount: settlement.applied,
                    total_earned,
                    timestamp: now,
                });

                let (lira, kurus) = format_kurus(settlement.applied);
                msg!("Bonus {}.{:02} TRY credited to {}", lira, kurus, sponsor);
            }

            if settlement.was_capped() {
                emit!(BonusCapped {
                    sponsor,
                    order: order_key,
                    requested: settlement.requested,
                    applied: settlement.applied,
                    timestamp: now,
                });
                msg!("Bonus capped: requested {}, applied {}", settlement.requested, settlement.applied);
            }
        }

        if settlement.buyer_activity_changed {
            emit!(ActivityStatusChanged {
                member: buyer_key,
                has_met_threshold: accounts.buyer.has_met_referral_threshold,
                total_spend: accounts.buyer.total_spend,
                timestamp: now,
            });
        }

        emit!(OrderProcessed {
            order: order_key,
            buyer: buyer_key,
            sponsor: sponsor_key,
            bonus_paid: settlement.applied,
            timestamp: now,
        });

        msg!("Order {} processed, bonus {}", order_key, settlement.applied);
        Ok(())
    }

    /// Re-run the activity evaluator, e.g. after the threshold changed
    pub fn reevaluate_member(ctx: Context<ReevaluateMember>) -> Result<()> {
        let threshold = ctx.accounts.config.activity_threshold;
        let member = &mut ctx.accounts.member;

        if reevaluate(member, threshold) {
            member.updated_at = Clock::get()?.unix_timestamp;
            emit!(ActivityStatusChanged {
                member: member.key(),
                has_met_threshold: member.has_met_referral_threshold,
                total_spend: member.total_spend,
                timestamp: member.updated_at,
            });
            msg!("Member {} threshold status -> {}", member.key(), member.has_met_referral_threshold);
        }
        Ok(())
    }

    /// Read-only capacity view, returned to simulating clients
    pub fn resolve_sponsor_capacity(ctx: Context<ResolveSponsorCapacity>) -> Result<CapacityView> {
        let sponsor = &ctx.accounts.sponsor_member;
        let roster = &ctx.accounts.sponsor_roster;
        let mut view = resolve_capacity(sponsor, roster, &ctx.accounts.config);

        if !view.can_admit && !ctx.remaining_accounts.is_empty() {
            let prefix = load_roster_prefix(ctx.remaining_accounts)?;
            let found = find_reclaim_candidate(roster, |key| {
                prefix.iter().find(|(k, _)| k == key).map(|(_, m)| m)
            })?;
            view.reclaim_candidate = found.map(|index| roster.children[index].member);
        }

        msg!(
            "Sponsor {}: {}/{} active={} reclaim={:?}",
            sponsor.key(), view.occupied, view.limit, view.sponsor_active, view.reclaim_candidate
        );
        Ok(view)
    }
}
