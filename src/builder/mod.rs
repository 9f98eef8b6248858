use crate::contract::{CapSet, ContractRef};
use crate::tx::{CallArg, TxBatch};

/// One referral-reward bracket.
///
/// `stake` is the minimum staked amount (base units) qualifying for the
/// bracket; thresholds must be unique and strictly increasing across a
/// table. `share_pct` is the referral reward share, `fee_discount_pct` the
/// borrow-fee discount for referred users. The on-chain module enforces the
/// percentage ranges, not this layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier {
    pub stake: u64,
    pub share_pct: u64,
    pub fee_discount_pct: u64,
}

impl Tier {
    pub const fn new(stake: u64, share_pct: u64, fee_discount_pct: u64) -> Self {
        Self {
            stake,
            share_pct,
            fee_discount_pct,
        }
    }
}

/// Contract action emitted per row of a tier table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TierAction {
    AddTier,
    RemoveTier,
    /// Degenerate batch of size one: the table collapses to a single
    /// version number.
    SetVersion(u64),
}

/// Emits admin entry-function calls for the referral contract into a batch.
///
/// The capability generation is picked once at construction; every emitted
/// call references the matching capability object and `_v2`-suffixed target
/// where applicable.
pub struct ReferralTxBuilder<'a> {
    cref: &'a ContractRef,
    caps: CapSet,
}

impl<'a> ReferralTxBuilder<'a> {
    pub fn new(cref: &'a ContractRef, caps: CapSet) -> Self {
        Self { cref, caps }
    }

    pub fn add_referral_tier(&self, tx: &mut TxBatch, tier: Tier) {
        tx.move_call(
            self.cref.admin_target(self.caps, "add_referral_tier"),
            vec![
                CallArg::Object(self.cref.capability(self.caps)),
                CallArg::Object(self.cref.referral_tiers),
                CallArg::U64(tier.stake),
                CallArg::U64(tier.share_pct),
                CallArg::U64(tier.fee_discount_pct),
            ],
        );
    }

    pub fn remove_referral_tier(&self, tx: &mut TxBatch, stake: u64) {
        tx.move_call(
            self.cref.admin_target(self.caps, "remove_referral_tier"),
            vec![
                CallArg::Object(self.cref.capability(self.caps)),
                CallArg::Object(self.cref.referral_tiers),
                CallArg::U64(stake),
            ],
        );
    }

    pub fn set_contract_version(&self, tx: &mut TxBatch, version: u64) {
        tx.move_call(
            self.cref.admin_target(self.caps, "set_contract_version"),
            vec![
                CallArg::Object(self.cref.capability(self.caps)),
                CallArg::Object(self.cref.version_object),
                CallArg::U64(version),
            ],
        );
    }

    /// Burn the V1 capability and mint its V2 replacement. Always targets
    /// the un-suffixed entry function with the V1 capability as input; the
    /// returned handle is the minted V2 capability object.
    pub fn upgrade_admin_cap(&self, tx: &mut TxBatch) -> CallArg {
        tx.move_call(
            format!("{}::admin::upgrade_admin_cap", self.cref.package_id),
            vec![CallArg::Object(self.cref.admin_cap)],
        )
    }

    /// Authorize a package upgrade against the held upgrade capability.
    pub fn authorize_upgrade(&self, tx: &mut TxBatch) -> CallArg {
        tx.move_call(
            format!("{}::package::authorize_upgrade", self.cref.package_id),
            vec![CallArg::Object(self.cref.upgrade_cap)],
        )
    }

    /// Append one call per row of `rows`, in row order.
    ///
    /// `RemoveTier` uses only the stake threshold of each row. `SetVersion`
    /// ignores the rows entirely and appends exactly one call carrying the
    /// version number. Calling this twice appends twice; nothing is
    /// deduplicated.
    pub fn append_for_each(&self, tx: &mut TxBatch, rows: &[Tier], action: TierAction) {
        match action {
            TierAction::AddTier => {
                for tier in rows {
                    self.add_referral_tier(tx, *tier);
                }
            }
            TierAction::RemoveTier => {
                for tier in rows {
                    self.remove_referral_tier(tx, tier.stake);
                }
            }
            TierAction::SetVersion(version) => {
                self.set_contract_version(tx, version);
            }
        }
    }

    /// Replace the whole tier table: remove every `old` row (old order),
    /// then add every `new` row (new order), never interleaved.
    ///
    /// The ordering keeps a partially-applied transaction inspectable by
    /// hand: the table is left unchanged, partially removed, or partially
    /// removed plus partially added. Atomicity itself comes from whatever
    /// all-or-nothing semantics the chain's execution provides.
    pub fn migrate_tiers(&self, tx: &mut TxBatch, old: &[Tier], new: &[Tier]) {
        self.append_for_each(tx, old, TierAction::RemoveTier);
        self.append_for_each(tx, new, TierAction::AddTier);
    }
}

#[cfg(test)]
mod tests {
    use crate::contract::tests::sample;
    use crate::tx::Instruction;

    use super::*;

    fn calls(tx: &TxBatch) -> Vec<(String, Vec<CallArg>)> {
        tx.instructions()
            .iter()
            .map(|inst| match inst {
                Instruction::MoveCall { target, args } => (target.clone(), args.clone()),
                other => panic!("expected move call, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn add_tier_emits_one_call_per_row_in_table_order() {
        let cref = sample();
        let builder = ReferralTxBuilder::new(&cref, CapSet::V1);
        let table = [Tier::new(0, 10, 10), Tier::new(100, 15, 10)];

        let mut tx = TxBatch::new();
        builder.append_for_each(&mut tx, &table, TierAction::AddTier);

        let calls = calls(&tx);
        assert_eq!(calls.len(), 2);
        for (i, (target, args)) in calls.iter().enumerate() {
            assert!(target.ends_with("::admin::add_referral_tier"));
            assert_eq!(args[0], CallArg::Object(cref.admin_cap));
            assert_eq!(args[1], CallArg::Object(cref.referral_tiers));
            assert_eq!(args[2], CallArg::U64(table[i].stake));
        }
        assert_eq!(calls[0].1[2], CallArg::U64(0));
        assert_eq!(calls[1].1[2], CallArg::U64(100));
    }

    #[test]
    fn remove_tier_carries_only_the_threshold() {
        let cref = sample();
        let builder = ReferralTxBuilder::new(&cref, CapSet::V2);
        let mut tx = TxBatch::new();
        builder.append_for_each(&mut tx, &[Tier::new(1_000, 20, 14)], TierAction::RemoveTier);

        let calls = calls(&tx);
        assert_eq!(calls.len(), 1);
        let (target, args) = &calls[0];
        assert!(target.ends_with("::admin::remove_referral_tier_v2"));
        assert_eq!(
            args,
            &vec![
                CallArg::Object(cref.admin_cap_v2),
                CallArg::Object(cref.referral_tiers),
                CallArg::U64(1_000),
            ]
        );
    }

    #[test]
    fn set_version_appends_exactly_one_call_regardless_of_rows() {
        let cref = sample();
        let builder = ReferralTxBuilder::new(&cref, CapSet::V2);
        let unrelated_table = [Tier::new(0, 10, 10), Tier::new(100, 15, 10)];

        let mut tx = TxBatch::new();
        builder.append_for_each(&mut tx, &unrelated_table, TierAction::SetVersion(5));

        let calls = calls(&tx);
        assert_eq!(calls.len(), 1);
        let (target, args) = &calls[0];
        assert!(target.ends_with("::admin::set_contract_version_v2"));
        assert_eq!(args[1], CallArg::Object(cref.version_object));
        assert_eq!(args[2], CallArg::U64(5));
    }

    #[test]
    fn migrate_puts_all_removes_strictly_before_all_adds() {
        let cref = sample();
        let builder = ReferralTxBuilder::new(&cref, CapSet::V2);
        let old = [Tier::new(0, 10, 10), Tier::new(100, 15, 10)];
        let new = [Tier::new(0, 5, 5)];

        let mut tx = TxBatch::new();
        builder.migrate_tiers(&mut tx, &old, &new);

        let calls = calls(&tx);
        assert_eq!(calls.len(), 3);
        assert!(calls[0].0.ends_with("remove_referral_tier_v2"));
        assert_eq!(calls[0].1[2], CallArg::U64(0));
        assert!(calls[1].0.ends_with("remove_referral_tier_v2"));
        assert_eq!(calls[1].1[2], CallArg::U64(100));
        assert!(calls[2].0.ends_with("add_referral_tier_v2"));
        assert_eq!(
            &calls[2].1[2..],
            &[CallArg::U64(0), CallArg::U64(5), CallArg::U64(5)]
        );
    }

    #[test]
    fn double_append_duplicates_instead_of_deduplicating() {
        let cref = sample();
        let builder = ReferralTxBuilder::new(&cref, CapSet::V1);
        let table = [Tier::new(0, 10, 10)];

        let mut tx = TxBatch::new();
        builder.append_for_each(&mut tx, &table, TierAction::AddTier);
        builder.append_for_each(&mut tx, &table, TierAction::AddTier);
        assert_eq!(tx.instructions().len(), 2);
        assert_eq!(tx.instructions()[0], tx.instructions()[1]);
    }

    #[test]
    fn upgrade_admin_cap_targets_v1_and_returns_the_minted_cap_handle() {
        let cref = sample();
        // capability generation of the builder is irrelevant for the upgrade
        let builder = ReferralTxBuilder::new(&cref, CapSet::V2);
        let mut tx = TxBatch::new();
        let minted = builder.upgrade_admin_cap(&mut tx);
        assert_eq!(minted, CallArg::CallResult(0));
        let calls = calls(&tx);
        assert!(calls[0].0.ends_with("::admin::upgrade_admin_cap"));
        assert_eq!(calls[0].1, vec![CallArg::Object(cref.admin_cap)]);
    }
}
