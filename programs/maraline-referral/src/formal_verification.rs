// ============================================================================
// FORMAL VERIFICATION & PROPERTY-BASED TESTS
// ============================================================================
//
// Run with: cargo test --lib formal_verification
//
// This module implements:
// 1. An in-memory registry model whose operations call the same engine
//    functions as the instruction handlers, committed all-or-nothing
// 2. Core invariants (uniqueness, capacity, no orphan, idempotent bonus,
//    earnings cap, eviction safety)
// 3. End-to-end scenarios
// 4. Deterministic fuzzing over long operation sequences
// ============================================================================

#[cfg(test)]
mod formal_tests {
    use std::collections::BTreeMap;

    use anchor_lang::prelude::*;
    use crate::constants::*;
    use crate::errors::ErrorCode;
    use crate::helpers::*;
    use crate::state::*;

    // ========================================================================
    // SECTION 1: REGISTRY MODEL
    // ========================================================================

    /// Program state as a set of maps keyed like the PDAs
    #[derive(Clone, Default)]
    struct Registry {
        config: ReferralConfig,
        members: BTreeMap<Pubkey, Member>,
        rosters: BTreeMap<Pubkey, ReferralRoster>,
        emails: BTreeMap<[u8; 32], Pubkey>,
        phones: BTreeMap<[u8; 32], Pubkey>,
        codes: BTreeMap<[u8; REFERRAL_CODE_LEN], Pubkey>,
        orders: BTreeMap<[u8; 32], OrderRecord>,
        ledger: BTreeMap<[u8; 32], BonusEntry>,
        /// Members removed by eviction, as they were when removed
        evicted: Vec<Member>,
        /// Admission sequence number per member
        admitted_seq: BTreeMap<Pubkey, u64>,
        next_seq: u64,
        clock: i64,
    }

    fn member_address(owner: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[MEMBER_SEED, owner.as_ref()], &crate::ID).0
    }

    impl Registry {
        fn new(params: ConfigParams) -> Self {
            let mut config = ReferralConfig::default();
            config.apply_params(&params).unwrap();
            Self { config, clock: 1_700_000_000, ..Self::default() }
        }

        /// One instruction: all effects commit or none do
        fn transact<T>(&mut self, op: impl FnOnce(&mut Registry) -> Result<T>) -> Result<T> {
            let mut draft = self.clone();
            let out = op(&mut draft)?;
            *self = draft;
            Ok(out)
        }

        fn tick(&mut self) -> i64 {
            self.clock += 60;
            self.clock
        }

        fn code_of(&self, member: &Pubkey) -> String {
            code_to_string(&self.members[member].referral_code)
        }

        /// What a client learns from resolve_sponsor_capacity before submitting
        fn reclaim_candidate(&self, sponsor: &Pubkey) -> Option<Pubkey> {
            let roster = &self.rosters[sponsor];
            let view = resolve_capacity(&self.members[sponsor], roster, &self.config);
            if view.can_admit {
                return None;
            }
            find_reclaim_candidate(roster, |key| self.members.get(key))
                .ok()
                .flatten()
                .map(|index| roster.children[index].member)
        }

        fn insert_member(
            &mut self,
            owner: Pubkey,
            sponsor: Option<Pubkey>,
            email_digest: [u8; 32],
            phone_digest: [u8; 32],
            role: MemberRole,
        ) -> Result<Pubkey> {
            let key = member_address(&owner);
            require!(!self.members.contains_key(&key), ErrorCode::InvalidAccountAddress);

            let code = (0..MAX_CODE_ATTEMPTS)
                .map(|attempt| derive_referral_code(&owner, attempt))
                .find(|code| !self.codes.contains_key(code))
                .ok_or(ErrorCode::ReferralCodeSpaceExhausted)?;

            let now = self.clock;
            let member = Member {
                owner,
                sponsor,
                referral_code: code,
                email_digest,
                phone_digest,
                role,
                registered_at: now,
                updated_at: now,
                ..Member::default()
            };

            self.members.insert(key, member);
            self.rosters.insert(key, ReferralRoster { sponsor: key, ..ReferralRoster::default() });
            self.emails.insert(email_digest, key);
            self.phones.insert(phone_digest, key);
            self.codes.insert(code, key);
            self.admitted_seq.insert(key, self.next_seq);
            self.next_seq += 1;
            self.config.total_members += 1;
            Ok(key)
        }

        fn contacts(&self, email: &str, phone: &str) -> Result<([u8; 32], [u8; 32])> {
            let email_digest = contact_digest(ContactKind::Email, &normalize_email(email)?);
            require!(!self.emails.contains_key(&email_digest), ErrorCode::DuplicateEmail);
            let phone_digest = contact_digest(ContactKind::Phone, &normalize_phone(phone)?);
            require!(!self.phones.contains_key(&phone_digest), ErrorCode::DuplicatePhone);
            Ok((email_digest, phone_digest))
        }

        fn register_root(&mut self, owner: Pubkey, email: &str, phone: &str, role: MemberRole) -> Result<Pubkey> {
            self.tick();
            self.transact(|r| {
                let (email_digest, phone_digest) = r.contacts(email, phone)?;
                r.insert_member(owner, None, email_digest, phone_digest, role)
            })
        }

        /// register_member: contacts, sponsor code, capacity, terms, then writes
        fn register(
            &mut self,
            owner: Pubkey,
            email: &str,
            phone: &str,
            sponsor_code: &str,
            accepted_terms: bool,
            candidate: Option<Pubkey>,
        ) -> Result<Pubkey> {
            self.tick();
            self.transact(|r| {
                let (email_digest, phone_digest) = r.contacts(email, phone)?;

                let code = normalize_referral_code(sponsor_code).ok_or(ErrorCode::UnknownReferralCode)?;
                let sponsor_key = *r.codes.get(&code).ok_or(ErrorCode::UnknownReferralCode)?;

                let sponsor = r.members[&sponsor_key].clone();
                let mut roster = r.rosters[&sponsor_key].clone();
                let (view, plan) =
                    plan_admission(&sponsor, &roster, &r.config, candidate, |key| r.members.get(key))?;

                require!(accepted_terms, ErrorCode::TermsNotAccepted);

                let key = member_address(&owner);
                let evicted = apply_admission(
                    &mut roster,
                    plan,
                    view.limit,
                    RosterEntry { member: key, registered_at: r.clock },
                )?;

                if let Some(entry) = evicted {
                    r.evict(&entry.member)?;
                }

                let occupancy = roster.occupancy();
                r.rosters.insert(sponsor_key, roster);
                let sponsor = r.members.get_mut(&sponsor_key).ok_or(ErrorCode::SponsorMismatch)?;
                sponsor.referral_count = occupancy;

                r.insert_member(owner, Some(sponsor_key), email_digest, phone_digest, MemberRole::Member)
            })
        }

        /// Close the evicted member together with its claims, code and roster
        fn evict(&mut self, key: &Pubkey) -> Result<()> {
            let member = self.members.remove(key).ok_or(ErrorCode::InvalidEvictionCandidate)?;
            require!(member.is_evictable(), ErrorCode::InvalidEvictionCandidate);
            let roster = self.rosters.remove(key).ok_or(ErrorCode::InvalidEvictionCandidate)?;
            require!(roster.children.is_empty(), ErrorCode::InvalidEvictionCandidate);

            self.emails.remove(&member.email_digest);
            self.phones.remove(&member.phone_digest);
            self.codes.remove(&member.referral_code);
            self.admitted_seq.remove(key);
            self.config.total_members -= 1;
            self.config.total_evictions += 1;
            self.evicted.push(member);
            Ok(())
        }

        fn record_order(&mut self, order_ref: [u8; 32], buyer: &Pubkey, total: u64, service_fee: u64) -> Result<()> {
            let now = self.tick();
            self.transact(|r| {
                require!(service_fee <= total, ErrorCode::InvalidParameter);
                require!(!r.orders.contains_key(&order_ref), ErrorCode::InvalidAccountAddress);
                let member = r.members.get_mut(buyer).ok_or(ErrorCode::OrderMismatch)?;
                member.order_count += 1;
                r.orders.insert(
                    order_ref,
                    OrderRecord { order_ref, buyer: *buyer, total, service_fee, recorded_at: now, ..OrderRecord::default() },
                );
                Ok(())
            })
        }

        fn process_order(&mut self, order_ref: [u8; 32]) -> Result<Settlement> {
            let now = self.tick();
            self.transact(|r| {
                let mut order = r.orders.get(&order_ref).cloned().ok_or(ErrorCode::OrderMismatch)?;
                let mut buyer = r.members[&order.buyer].clone();
                let mut sponsor = buyer.sponsor.map(|key| (key, r.members[&key].clone()));

                let settlement = settle_order(
                    &mut order,
                    &mut buyer,
                    sponsor.as_mut().map(|(_, m)| m),
                    &mut r.config,
                    now,
                )?;
                if settlement.already_processed {
                    return Ok(settlement);
                }

                if let Some((key, member)) = sponsor {
                    if settlement.applied > 0 {
                        require!(!r.ledger.contains_key(&order_ref), ErrorCode::InvalidAccountAddress);
                        r.ledger.insert(
                            order_ref,
                            BonusEntry {
                                sponsor: key,
                                buyer: order.buyer,
                                amount: settlement.applied,
                                requested_amount: settlement.requested,
                                created_at: now,
                                description: bonus_description(&order_ref),
                                ..BonusEntry::default()
                            },
                        );
                    }
                    r.members.insert(key, member);
                }
                r.members.insert(order.buyer, buyer);
                r.orders.insert(order_ref, order);
                Ok(settlement)
            })
        }

        fn activate(&mut self, key: &Pubkey) {
            let member = self.members.get_mut(key).unwrap();
            member.is_referral_code_active = true;
            member.total_spend = member.total_spend.max(self.config.activity_threshold);
            reevaluate(member, self.config.activity_threshold);
        }

        // --------------------------------------------------------------------
        // Invariant checks
        // --------------------------------------------------------------------

        fn assert_unique_identities(&self) {
            assert_eq!(self.emails.len(), self.members.len(), "email claims != members");
            assert_eq!(self.phones.len(), self.members.len(), "phone claims != members");
            assert_eq!(self.codes.len(), self.members.len(), "codes != members");
            for (key, member) in &self.members {
                assert_eq!(self.emails.get(&member.email_digest), Some(key));
                assert_eq!(self.phones.get(&member.phone_digest), Some(key));
                assert_eq!(self.codes.get(&member.referral_code), Some(key));
            }
        }

        fn assert_capacity(&self) {
            for (key, roster) in &self.rosters {
                let member = &self.members[key];
                assert!(
                    roster.occupancy() <= effective_limit(member, &self.config),
                    "sponsor {} holds {} > limit",
                    key, roster.occupancy()
                );
                assert_eq!(member.referral_count, roster.occupancy());

                let children = self.members.values().filter(|m| m.sponsor == Some(*key)).count();
                assert_eq!(children as u32, roster.occupancy(), "roster out of sync with sponsor references");

                let times: Vec<i64> = roster.children.iter().map(|c| c.registered_at).collect();
                assert!(times.windows(2).all(|w| w[0] <= w[1]), "roster not oldest first");
            }
        }

        fn assert_no_orphans(&self) {
            for (key, member) in &self.members {
                if let Some(sponsor) = member.sponsor {
                    assert!(self.members.contains_key(&sponsor), "member {} orphaned", key);
                    assert!(self.admitted_seq[&sponsor] < self.admitted_seq[key]);
                    assert!(self.members[&sponsor].registered_at <= member.registered_at);
                }
            }
        }

        fn assert_eviction_safety(&self) {
            for member in &self.evicted {
                assert_eq!(member.order_count, 0);
                assert!(!member.has_met_referral_threshold);
                assert!(!member.is_elevated());
            }
        }

        fn assert_earnings_cap(&self) {
            for member in self.members.values() {
                if !is_cap_exempt(member, &self.config) {
                    assert!(member.total_earned <= self.config.earnings_cap);
                }
            }
        }

        fn assert_ledger_matches_earnings(&self) {
            for (key, member) in &self.members {
                let credited: u64 = self.ledger.values().filter(|e| e.sponsor == *key).map(|e| e.amount).sum();
                assert_eq!(credited, member.total_earned, "ledger != earnings for {}", key);
            }
        }

        fn assert_all(&self) {
            self.assert_unique_identities();
            self.assert_capacity();
            self.assert_no_orphans();
            self.assert_eviction_safety();
            self.assert_earnings_cap();
            self.assert_ledger_matches_earnings();
        }
    }

    fn error_number<T>(result: Result<T>) -> u32 {
        match result {
            Err(anchor_lang::error::Error::AnchorError(e)) => e.error_code_number,
            _ => u32::MAX,
        }
    }

    fn params(general: u32) -> ConfigParams {
        ConfigParams {
            general_referral_limit: general,
            admin_referral_limit: 0,
            activity_threshold: 100_000,
            bonus_mode: BonusMode::Fixed,
            fixed_bonus: 200,
            min_bonus: 0,
            earnings_cap: 20_000,
            admin_cap_exempt: true,
        }
    }

    fn phone(n: u32) -> String {
        format!("0532{:07}", n)
    }

    fn email(n: u32) -> String {
        format!("user{}@maraline.com", n)
    }

    fn order_ref(n: u32) -> [u8; 32] {
        let mut r = [0u8; 32];
        r[..4].copy_from_slice(&n.to_le_bytes());
        r
    }

    /// Registry with one active (non-admin) root sponsor
    fn with_sponsor(general: u32) -> (Registry, Pubkey) {
        let mut registry = Registry::new(params(general));
        let sponsor = registry
            .register_root(Pubkey::new_unique(), "sponsor@maraline.com", "05550000000", MemberRole::Member)
            .unwrap();
        registry.activate(&sponsor);
        (registry, sponsor)
    }

    // ========================================================================
    // SECTION 2: CORE INVARIANTS
    // ========================================================================

    mod invariants {
        use super::*;

        /// INV-1: Uniqueness
        /// code, normalized email and normalized phone are unique across the registry
        #[test]
        fn inv1_identities_unique() {
            let (mut registry, sponsor) = with_sponsor(MAX_ROSTER_SIZE);
            let code = registry.code_of(&sponsor);

            for n in 0..20 {
                registry.register(Pubkey::new_unique(), &email(n), &phone(n), &code, true, None).unwrap();
            }

            // Case / prefix variants of existing contacts are duplicates
            let dup_email = registry.register(Pubkey::new_unique(), "USER3@Maraline.com", &phone(99), &code, true, None);
            assert_eq!(error_number(dup_email), u32::from(ErrorCode::DuplicateEmail));

            let dup_phone = registry.register(Pubkey::new_unique(), &email(99), "+90 (532) 000-0004", &code, true, None);
            assert_eq!(error_number(dup_phone), u32::from(ErrorCode::DuplicatePhone));

            registry.assert_unique_identities();
            assert_eq!(registry.members.len(), 21);
        }

        /// INV-2: Capacity
        /// occupancy(S) <= effective_limit(S) for every sponsor, at every step
        #[test]
        fn inv2_capacity_never_exceeded() {
            let (mut registry, sponsor) = with_sponsor(3);
            let code = registry.code_of(&sponsor);

            for n in 0..10 {
                let candidate = registry.reclaim_candidate(&sponsor);
                let _ = registry.register(Pubkey::new_unique(), &email(n), &phone(n), &code, true, candidate);
                registry.assert_capacity();
            }
            assert_eq!(registry.rosters[&sponsor].occupancy(), 3);
        }

        /// INV-3: No orphan admission
        /// every non-root member's sponsor exists and was admitted strictly before it
        #[test]
        fn inv3_no_orphans() {
            let (mut registry, root) = with_sponsor(2);
            let root_code = registry.code_of(&root);

            let a = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &root_code, true, None).unwrap();
            registry.activate(&a);
            let a_code = registry.code_of(&a);
            registry.register(Pubkey::new_unique(), &email(2), &phone(2), &a_code, true, None).unwrap();

            // `a` now holds a referral, so it can never be reclaimed from root
            registry.register(Pubkey::new_unique(), &email(3), &phone(3), &root_code, true, None).unwrap();
            assert_eq!(registry.reclaim_candidate(&root), registry.rosters[&root].children.get(1).map(|c| c.member));

            let candidate = registry.reclaim_candidate(&root);
            registry.register(Pubkey::new_unique(), &email(4), &phone(4), &root_code, true, candidate).unwrap();

            assert!(registry.members.contains_key(&a));
            registry.assert_no_orphans();
        }

        /// INV-4: Idempotent bonus
        /// processing an order any number of times yields one ledger entry and one balance delta
        #[test]
        fn inv4_idempotent_bonus() {
            let (mut registry, sponsor) = with_sponsor(5);
            let code = registry.code_of(&sponsor);
            let buyer = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            registry.record_order(order_ref(1), &buyer, 5_000, 100).unwrap();

            for _ in 0..5 {
                registry.process_order(order_ref(1)).unwrap();
            }

            assert_eq!(registry.ledger.len(), 1);
            assert_eq!(registry.members[&sponsor].total_earned, 200);
            assert_eq!(registry.members[&buyer].total_spend, 5_000);
            assert_eq!(registry.config.total_orders_processed, 1);
        }

        /// INV-5: Earnings cap
        /// total_earned <= earnings_cap for every non-exempt member
        #[test]
        fn inv5_earnings_cap() {
            let mut p = params(5);
            p.fixed_bonus = 7_000;
            p.earnings_cap = 20_000;
            let mut registry = Registry::new(p);
            let sponsor = registry
                .register_root(Pubkey::new_unique(), "s@maraline.com", "05559999999", MemberRole::Member)
                .unwrap();
            registry.activate(&sponsor);
            let code = registry.code_of(&sponsor);
            let buyer = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();

            let mut applied = Vec::new();
            for n in 0..5 {
                registry.record_order(order_ref(n), &buyer, 1_000, 0).unwrap();
                applied.push(registry.process_order(order_ref(n)).unwrap().applied);
            }

            assert_eq!(applied, vec![7_000, 7_000, 6_000, 0, 0]);
            assert_eq!(registry.members[&sponsor].total_earned, 20_000);
            // Zero credits leave no ledger entry
            assert_eq!(registry.ledger.len(), 3);
            registry.assert_earnings_cap();
            registry.assert_ledger_matches_earnings();
        }

        /// INV-5b: Cap exemption applies to admins only when configured
        #[test]
        fn inv5b_admin_cap_exemption() {
            let mut p = params(5);
            p.fixed_bonus = 15_000;
            let mut registry = Registry::new(p);
            let admin = registry
                .register_root(Pubkey::new_unique(), "admin@maraline.com", "05551234567", MemberRole::Admin)
                .unwrap();
            let code = registry.code_of(&admin);
            let buyer = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();

            for n in 0..3 {
                registry.record_order(order_ref(n), &buyer, 1_000, 0).unwrap();
                registry.process_order(order_ref(n)).unwrap();
            }
            assert_eq!(registry.members[&admin].total_earned, 45_000);
        }

        /// INV-6: Eviction safety
        /// a member with an order or a met threshold is never reclaimed
        #[test]
        fn inv6_eviction_safety() {
            let (mut registry, sponsor) = with_sponsor(2);
            let code = registry.code_of(&sponsor);

            let ordered = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            let spender = registry.register(Pubkey::new_unique(), &email(2), &phone(2), &code, true, None).unwrap();
            registry.record_order(order_ref(1), &ordered, 10, 0).unwrap();
            registry.members.get_mut(&spender).unwrap().total_spend = 100_000;
            reevaluate(registry.members.get_mut(&spender).unwrap(), 100_000);

            // Neither child is eligible, whatever the client proposes
            for forced in [Some(ordered), Some(spender), None] {
                let result = registry.register(Pubkey::new_unique(), &email(3), &phone(3), &code, true, forced);
                assert_eq!(error_number(result), u32::from(ErrorCode::CapacityExhausted));
            }
            assert!(registry.members.contains_key(&ordered));
            assert!(registry.members.contains_key(&spender));
            assert!(registry.evicted.is_empty());
        }

        /// INV-7: Failed admission leaves no trace
        #[test]
        fn inv7_failed_admission_is_atomic() {
            let (mut registry, sponsor) = with_sponsor(1);
            let code = registry.code_of(&sponsor);
            let first = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();

            let before_members = registry.members.len();
            let before_evictions = registry.config.total_evictions;

            // Eviction is planned but terms are missing: nothing is evicted
            let result = registry.register(Pubkey::new_unique(), &email(2), &phone(2), &code, false, Some(first));
            assert_eq!(error_number(result), u32::from(ErrorCode::TermsNotAccepted));
            assert!(registry.members.contains_key(&first));
            assert_eq!(registry.members.len(), before_members);
            assert_eq!(registry.config.total_evictions, before_evictions);
            registry.assert_all();
        }
    }

    // ========================================================================
    // SECTION 3: SCENARIOS
    // ========================================================================

    mod scenarios {
        use super::*;

        /// A: limit 2, empty roster, three clients submit from the same view.
        /// The runtime serializes them on the sponsor roster: two are admitted,
        /// the third observes CapacityExhausted.
        #[test]
        fn scenario_a_capacity_race() {
            let (mut registry, sponsor) = with_sponsor(2);
            let code = registry.code_of(&sponsor);

            // Every client saw a free slot, so none proposes an eviction
            let candidates: Vec<Option<Pubkey>> = (0..3).map(|_| registry.reclaim_candidate(&sponsor)).collect();
            assert!(candidates.iter().all(Option::is_none));

            let results: Vec<_> = (0..3u32)
                .map(|n| registry.register(Pubkey::new_unique(), &email(n), &phone(n), &code, true, candidates[n as usize]))
                .collect();

            assert!(results[0].is_ok());
            assert!(results[1].is_ok());
            assert_eq!(error_number(results.into_iter().nth(2).unwrap()), u32::from(ErrorCode::CapacityExhausted));
            assert_eq!(registry.rosters[&sponsor].occupancy(), 2);
            registry.assert_all();
        }

        /// B: limit 2, oldest child inactive without orders: the newcomer is
        /// admitted, the old child deleted, occupancy stays 2.
        #[test]
        fn scenario_b_reclaim_inactive_child() {
            let (mut registry, sponsor) = with_sponsor(2);
            let code = registry.code_of(&sponsor);

            let idle = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            let buyer = registry.register(Pubkey::new_unique(), &email(2), &phone(2), &code, true, None).unwrap();
            registry.record_order(order_ref(1), &buyer, 500, 0).unwrap();

            let candidate = registry.reclaim_candidate(&sponsor);
            assert_eq!(candidate, Some(idle));

            let newcomer = registry
                .register(Pubkey::new_unique(), &email(3), &phone(3), &code, true, candidate)
                .unwrap();

            assert!(!registry.members.contains_key(&idle));
            let roster = &registry.rosters[&sponsor];
            assert_eq!(roster.occupancy(), 2);
            assert_eq!(roster.children[0].member, buyer);
            assert_eq!(roster.children[1].member, newcomer);
            assert_eq!(registry.config.total_evictions, 1);

            registry.assert_all();

            // The evicted contacts are free again; the newcomer is now the reclaimable one
            let candidate = registry.reclaim_candidate(&sponsor);
            assert_eq!(candidate, Some(newcomer));
            let returning = registry
                .register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, candidate)
                .unwrap();
            assert!(registry.members.contains_key(&returning));
            assert_eq!(registry.config.total_evictions, 2);
            registry.assert_all();
        }

        /// Two clients simulate against the same full roster and both propose
        /// the oldest inactive child. The first reclaims it; the second finds
        /// its candidate gone and is refused without a second eviction.
        #[test]
        fn scenario_reclaim_race_second_is_exhausted() {
            let (mut registry, sponsor) = with_sponsor(2);
            let code = registry.code_of(&sponsor);

            let idle = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            let buyer = registry.register(Pubkey::new_unique(), &email(2), &phone(2), &code, true, None).unwrap();
            registry.record_order(order_ref(1), &buyer, 500, 0).unwrap();

            let first_view = registry.reclaim_candidate(&sponsor);
            let second_view = registry.reclaim_candidate(&sponsor);
            assert_eq!(first_view, Some(idle));
            assert_eq!(second_view, Some(idle));

            let winner = registry
                .register(Pubkey::new_unique(), &email(3), &phone(3), &code, true, first_view)
                .unwrap();
            let loser = registry.register(Pubkey::new_unique(), &email(4), &phone(4), &code, true, second_view);

            assert_eq!(error_number(loser), u32::from(ErrorCode::CapacityExhausted));
            let roster = &registry.rosters[&sponsor];
            assert_eq!(roster.occupancy(), 2);
            assert_eq!(roster.children[1].member, winner);
            // The winner is evictable now, but the loser never touches it
            assert!(registry.members.contains_key(&winner));
            assert_eq!(registry.config.total_evictions, 1);
            registry.assert_all();
        }

        /// Lowering the general limit evicts nobody. A sponsor left above the
        /// new limit admits no one, even with a reclaimable child, until its
        /// occupancy drops below the limit.
        #[test]
        fn scenario_lowered_limit_blocks_admission() {
            let (mut registry, sponsor) = with_sponsor(3);
            let code = registry.code_of(&sponsor);
            for n in 0..3 {
                registry.register(Pubkey::new_unique(), &email(n), &phone(n), &code, true, None).unwrap();
            }

            let lowered = params(1);
            registry.transact(|r| r.config.apply_params(&lowered)).unwrap();
            assert_eq!(registry.rosters[&sponsor].occupancy(), 3);

            let candidate = registry.reclaim_candidate(&sponsor);
            assert!(candidate.is_some());
            let result = registry.register(Pubkey::new_unique(), &email(9), &phone(9), &code, true, candidate);

            assert_eq!(error_number(result), u32::from(ErrorCode::CapacityExhausted));
            assert_eq!(registry.rosters[&sponsor].occupancy(), 3);
            assert_eq!(registry.config.total_evictions, 0);
        }

        /// C: limit 2, both children active or with orders: refused.
        #[test]
        fn scenario_c_no_reclaimable_child() {
            let (mut registry, sponsor) = with_sponsor(2);
            let code = registry.code_of(&sponsor);

            let active = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            let buyer = registry.register(Pubkey::new_unique(), &email(2), &phone(2), &code, true, None).unwrap();
            registry.activate(&active);
            registry.record_order(order_ref(1), &buyer, 500, 0).unwrap();

            assert_eq!(registry.reclaim_candidate(&sponsor), None);
            let result = registry.register(Pubkey::new_unique(), &email(3), &phone(3), &code, true, None);
            assert_eq!(error_number(result), u32::from(ErrorCode::CapacityExhausted));
            assert_eq!(registry.rosters[&sponsor].occupancy(), 2);
            registry.assert_all();
        }

        /// D: order of 1000 processed twice under Fixed=200: sponsor earns 200.
        #[test]
        fn scenario_d_retry_pays_once() {
            let (mut registry, sponsor) = with_sponsor(2);
            let code = registry.code_of(&sponsor);
            let buyer = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            registry.record_order(order_ref(7), &buyer, 1_000, 0).unwrap();

            let first = registry.process_order(order_ref(7)).unwrap();
            let retry = registry.process_order(order_ref(7)).unwrap();

            assert_eq!(first.applied, 200);
            assert!(retry.already_processed);
            assert_eq!(registry.members[&sponsor].total_earned, 200);
            assert_eq!(registry.ledger.len(), 1);
            registry.assert_all();
        }

        /// E: total_earned 19900, cap 20000, bonus 300: clamped to 100.
        #[test]
        fn scenario_e_cap_clamp() {
            let mut p = params(2);
            p.fixed_bonus = 300;
            let mut registry = Registry::new(p);
            let sponsor = registry
                .register_root(Pubkey::new_unique(), "s@maraline.com", "05550000001", MemberRole::Member)
                .unwrap();
            registry.activate(&sponsor);
            let code = registry.code_of(&sponsor);
            let buyer = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            registry.members.get_mut(&sponsor).unwrap().total_earned = 19_900;

            registry.record_order(order_ref(1), &buyer, 1_000, 0).unwrap();
            let settlement = registry.process_order(order_ref(1)).unwrap();

            assert_eq!(settlement.requested, 300);
            assert_eq!(settlement.applied, 100);
            assert_eq!(registry.members[&sponsor].total_earned, 20_000);
            assert_eq!(registry.ledger[&order_ref(1)].amount, 100);
            assert_eq!(registry.ledger[&order_ref(1)].requested_amount, 300);
        }

        /// F: +905551112233, 905551112233 and 05551112233 are one phone.
        #[test]
        fn scenario_f_phone_variants_are_duplicates() {
            let (mut registry, sponsor) = with_sponsor(5);
            let code = registry.code_of(&sponsor);

            registry.register(Pubkey::new_unique(), &email(1), "+905551112233", &code, true, None).unwrap();
            for (n, variant) in ["905551112233", "05551112233"].iter().enumerate() {
                let result = registry.register(Pubkey::new_unique(), &email(10 + n as u32), variant, &code, true, None);
                assert_eq!(error_number(result), u32::from(ErrorCode::DuplicatePhone));
            }
        }

        /// Gate order: contacts before sponsor code, capacity before terms
        #[test]
        fn scenario_gate_order() {
            let (mut registry, sponsor) = with_sponsor(1);
            let code = registry.code_of(&sponsor);
            let child = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            registry.record_order(order_ref(1), &child, 10, 0).unwrap();

            let bad_phone_and_code = registry.register(Pubkey::new_unique(), &email(2), "12345", "NOPE", false, None);
            assert_eq!(error_number(bad_phone_and_code), u32::from(ErrorCode::InvalidPhoneFormat));

            let unknown_code = registry.register(Pubkey::new_unique(), &email(2), &phone(2), "ZZZZZZZZ", false, None);
            assert_eq!(error_number(unknown_code), u32::from(ErrorCode::UnknownReferralCode));

            let full_and_no_terms = registry.register(Pubkey::new_unique(), &email(2), &phone(2), &code, false, None);
            assert_eq!(error_number(full_and_no_terms), u32::from(ErrorCode::CapacityExhausted));
        }

        /// Referral code lookup ignores case
        #[test]
        fn scenario_lowercase_code() {
            let (mut registry, sponsor) = with_sponsor(2);
            let code = registry.code_of(&sponsor).to_lowercase();
            assert!(registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).is_ok());
        }

        /// Sponsors need both manual activation and the spend threshold
        #[test]
        fn scenario_inactive_sponsor() {
            let mut registry = Registry::new(params(2));
            let sponsor = registry
                .register_root(Pubkey::new_unique(), "s@maraline.com", "05550000002", MemberRole::Member)
                .unwrap();
            let code = registry.code_of(&sponsor);

            let result = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None);
            assert_eq!(error_number(result), u32::from(ErrorCode::SponsorNotActive));

            registry.members.get_mut(&sponsor).unwrap().is_referral_code_active = true;
            let result = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None);
            assert_eq!(error_number(result), u32::from(ErrorCode::SponsorNotActive));

            registry.activate(&sponsor);
            assert!(registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).is_ok());
        }

        /// Buyer crosses the threshold through its own order; sponsor spend is untouched
        #[test]
        fn scenario_order_activates_buyer() {
            let (mut registry, sponsor) = with_sponsor(2);
            let code = registry.code_of(&sponsor);
            let buyer = registry.register(Pubkey::new_unique(), &email(1), &phone(1), &code, true, None).unwrap();
            let sponsor_spend = registry.members[&sponsor].total_spend;

            registry.record_order(order_ref(1), &buyer, 100_000, 0).unwrap();
            let settlement = registry.process_order(order_ref(1)).unwrap();

            assert!(settlement.buyer_activity_changed);
            assert!(registry.members[&buyer].has_met_referral_threshold);
            assert!(!registry.members[&buyer].is_referral_code_active);
            assert_eq!(registry.members[&sponsor].total_spend, sponsor_spend);
        }
    }

    // ========================================================================
    // SECTION 4: FUZZING
    // ========================================================================

    mod fuzzing {
        use super::*;

        /// xorshift64: deterministic, reproducible sequences
        struct Rng(u64);

        impl Rng {
            fn next(&mut self) -> u64 {
                self.0 ^= self.0 << 13;
                self.0 ^= self.0 >> 7;
                self.0 ^= self.0 << 17;
                self.0
            }

            fn below(&mut self, n: u64) -> u64 {
                self.next() % n
            }
        }

        /// FUZZ-1: random registrations, orders, activations and retries;
        /// every invariant holds after every step
        #[test]
        fn fuzz1_operation_sequences() {
            for seed in [0x9e37_79b9_7f4a_7c15u64, 0xdead_beef, 42] {
                let mut rng = Rng(seed);
                let mut p = params(3);
                p.fixed_bonus = 1_500;
                p.earnings_cap = 5_000;
                p.activity_threshold = 2_000;
                let mut registry = Registry::new(p);

                let root = registry
                    .register_root(Pubkey::new_unique(), "root@maraline.com", "05550000000", MemberRole::Admin)
                    .unwrap();
                let mut next_contact = 1u32;
                let mut next_order = 1u32;
                let mut orders: Vec<[u8; 32]> = Vec::new();

                for _ in 0..120 {
                    let keys: Vec<Pubkey> = registry.members.keys().copied().collect();
                    let pick = keys[rng.below(keys.len() as u64) as usize];

                    match rng.below(6) {
                        0 | 1 => {
                            let sponsor = if rng.below(3) == 0 { root } else { pick };
                            let code = registry.code_of(&sponsor);
                            let candidate = registry.reclaim_candidate(&sponsor);
                            let n = next_contact;
                            next_contact += 1;
                            let _ = registry.register(Pubkey::new_unique(), &email(n), &phone(n), &code, rng.below(8) != 0, candidate);
                        }
                        2 => {
                            let total = rng.below(3_000);
                            let reference = order_ref(next_order);
                            next_order += 1;
                            if registry.record_order(reference, &pick, total, total / 10).is_ok() {
                                orders.push(reference);
                            }
                        }
                        3 | 4 => {
                            if !orders.is_empty() {
                                let reference = orders[rng.below(orders.len() as u64) as usize];
                                registry.process_order(reference).unwrap();
                            }
                        }
                        _ => {
                            let member = registry.members.get_mut(&pick).unwrap();
                            member.is_referral_code_active = true;
                        }
                    }

                    registry.assert_all();
                }

                let processed = registry.orders.values().filter(|o| o.referral_processed).count() as u64;
                assert_eq!(registry.config.total_orders_processed, processed);
                let paid: u64 = registry.ledger.values().map(|e| e.amount).sum();
                assert_eq!(registry.config.total_bonus_paid, paid);
                assert_eq!(registry.config.total_members, registry.members.len() as u64);
            }
        }

        /// FUZZ-2: cap arithmetic over boundary values
        #[test]
        fn fuzz2_cap_boundaries() {
            let caps = [1u64, 100, 20_000, u64::MAX];
            let earned = [0u64, 1, 99, 100, 19_900, 20_000, u64::MAX - 1, u64::MAX];
            let bonuses = [0u64, 1, 300, 20_000, u64::MAX];

            for cap in caps {
                let mut config = ReferralConfig::default();
                config.earnings_cap = cap;
                for total_earned in earned {
                    let sponsor = Member { total_earned, ..Member::default() };
                    for bonus in bonuses {
                        let applied = apply_earnings_cap(bonus, &sponsor, &config);
                        assert!(applied <= bonus);
                        if total_earned <= cap {
                            assert!(total_earned + applied <= cap);
                        } else {
                            assert_eq!(applied, 0);
                        }
                    }
                }
            }
        }

        /// FUZZ-3: phone normalization is idempotent and always 05XXXXXXXXX
        #[test]
        fn fuzz3_phone_normalization_fixpoint() {
            let mut rng = Rng(7);
            for _ in 0..500 {
                let national = format!("5{:09}", rng.below(1_000_000_000));
                let variants = [
                    format!("0{}", national),
                    format!("90{}", national),
                    format!("+90{}", national),
                    format!("0090{}", national),
                    format!("+90 ({}) {}-{}", &national[..3], &national[3..6], &national[6..]),
                    national.clone(),
                ];
                for variant in &variants {
                    let normalized = normalize_phone(variant).unwrap();
                    assert_eq!(normalized, format!("0{}", national));
                    assert_eq!(normalize_phone(&normalized).unwrap(), normalized);
                }
            }
        }
    }
}
