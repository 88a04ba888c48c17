use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_core::{AccountId, Aggregate, AggregateRoot, DomainError, DomainResult, Money, TransactionId};
use ledger_events::Event;

use crate::events::{
    AccountCreated, AccountCredited, AccountDebited, AccountEvent, CancelReason,
    MoneyTransferCancelled, MoneyTransferSucceeded, MoneyTransferred,
};
use crate::transaction::{Transaction, TransactionKind, TransactionState};

/// Opening balance of every account, in minor units (1000.00).
pub const INITIAL_BALANCE_MINOR: i64 = 100_000;

/// Result of attempting to debit an account.
///
/// A rejected debit is an expected business outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Debited,
    Rejected(CancelReason),
}

/// Aggregate root: Account.
///
/// Never stored directly; rebuilt from the account's stream with
/// [`ledger_core::replay`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    full_name: String,
    balance: Money,
    reserved: BTreeMap<TransactionId, Money>,
    transactions: BTreeMap<TransactionId, Transaction>,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
    version: u64,
}

impl Account {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Amounts held per in-flight transaction (negative on the issuer side).
    pub fn reserved(&self) -> &BTreeMap<TransactionId, Money> {
        &self.reserved
    }

    pub fn transactions(&self) -> &BTreeMap<TransactionId, Transaction> {
        &self.transactions
    }

    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    /// Whether `AccountCreated` has been applied.
    pub fn is_created(&self) -> bool {
        self.version > 0
    }

    /// Reserve `event.transfer.value` out of the balance, all-or-nothing.
    ///
    /// Leaves the account untouched and returns `Rejected` when the balance
    /// would go negative.
    pub fn debit(&mut self, event: &AccountDebited) -> DebitOutcome {
        let value = event.transfer.value;
        if (self.balance - value).is_negative() {
            return DebitOutcome::Rejected(CancelReason::BalanceTooLow);
        }

        let id = event.transfer.transaction_id;
        self.last_updated_at = event.occurred_at;
        self.balance -= value;
        self.reserved.insert(id, -value);
        self.advance_transaction(id, TransactionState::Pending, event.occurred_at);
        DebitOutcome::Debited
    }

    fn apply_created(&mut self, event: &AccountCreated) -> DomainResult<()> {
        if self.is_created() {
            return Err(DomainError::invariant(format!(
                "account {} already created",
                self.id
            )));
        }
        self.id = event.aggregate_id;
        self.full_name = event.full_name.clone();
        self.balance = Money::from_minor(INITIAL_BALANCE_MINOR);
        self.reserved.clear();
        self.transactions.clear();
        self.created_at = event.occurred_at;
        self.last_updated_at = event.occurred_at;
        Ok(())
    }

    fn apply_transferred(&mut self, event: &MoneyTransferred) -> DomainResult<()> {
        let t = &event.transfer;
        if self.transactions.contains_key(&t.transaction_id) {
            return Err(DomainError::invariant(format!(
                "transaction {} recorded twice on account {}",
                t.transaction_id, self.id
            )));
        }

        let (value, kind) = if event.aggregate_id == t.from_id {
            (-t.value, TransactionKind::Outgoing)
        } else {
            (t.value, TransactionKind::Incoming)
        };

        self.last_updated_at = event.occurred_at;
        self.transactions.insert(
            t.transaction_id,
            Transaction {
                transaction_id: t.transaction_id,
                from_id: t.from_id,
                to_id: t.to_id,
                value,
                state: TransactionState::New,
                kind,
                created_at: event.occurred_at,
                last_updated_at: event.occurred_at,
            },
        );
        Ok(())
    }

    fn apply_debited(&mut self, event: &AccountDebited) -> DomainResult<()> {
        match self.debit(event) {
            DebitOutcome::Debited => Ok(()),
            DebitOutcome::Rejected(reason) => Err(DomainError::invariant(format!(
                "stored debit of {} for transaction {} rejected on account {} ({reason})",
                event.transfer.value, event.transfer.transaction_id, self.id
            ))),
        }
    }

    fn apply_credited(&mut self, event: &AccountCredited) {
        let id = event.transfer.transaction_id;
        self.last_updated_at = event.occurred_at;
        self.reserved.insert(id, event.transfer.value);
        self.advance_transaction(id, TransactionState::Pending, event.occurred_at);
    }

    fn apply_succeeded(&mut self, event: &MoneyTransferSucceeded) {
        let t = &event.transfer;
        self.last_updated_at = event.occurred_at;
        self.advance_transaction(t.transaction_id, TransactionState::Succeeded, event.occurred_at);

        // The issuer's reservation was already taken out of the balance by the debit.
        if let Some(reserved) = self.reserved.remove(&t.transaction_id) {
            if event.aggregate_id == t.to_id {
                self.balance += reserved;
            }
        }
    }

    fn apply_cancelled(&mut self, event: &MoneyTransferCancelled) {
        let t = &event.transfer;
        self.last_updated_at = event.occurred_at;

        if event.aggregate_id == t.to_id {
            self.reserved.remove(&t.transaction_id);
        } else if let Some(reserved) = self.reserved.remove(&t.transaction_id) {
            self.balance -= reserved;
        }

        self.advance_transaction(t.transaction_id, TransactionState::Cancelled, event.occurred_at);
    }

    fn advance_transaction(&mut self, id: TransactionId, next: TransactionState, at: DateTime<Utc>) {
        if let Some(tx) = self.transactions.get_mut(&id) {
            tx.advance(next, at);
        }
    }

    fn ensure_stream(&self, event: &AccountEvent) -> DomainResult<()> {
        if !self.is_created() {
            return Err(DomainError::invariant(format!(
                "{} applied before account.created on {}",
                event.event_type(),
                event.aggregate_id()
            )));
        }
        if event.aggregate_id() != self.id {
            return Err(DomainError::invariant(format!(
                "{} for {} applied to account {}",
                event.event_type(),
                event.aggregate_id(),
                self.id
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Account {
    type Event = AccountEvent;

    fn apply(&mut self, event: &Self::Event) -> DomainResult<()> {
        if !matches!(event, AccountEvent::AccountCreated(_)) {
            self.ensure_stream(event)?;
        }

        match event {
            AccountEvent::AccountCreated(e) => self.apply_created(e)?,
            AccountEvent::MoneyTransferred(e) => self.apply_transferred(e)?,
            AccountEvent::AccountDebited(e) => self.apply_debited(e)?,
            AccountEvent::AccountCredited(e) => self.apply_credited(e),
            AccountEvent::MoneyTransferSucceeded(e) => self.apply_succeeded(e),
            AccountEvent::MoneyTransferCancelled(e) => self.apply_cancelled(e),
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ledger_core::replay;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use crate::events::TransferDetails;

    fn at(offset_secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap()
    }

    fn money(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount)
    }

    fn transfer_of(value: Money) -> TransferDetails {
        TransferDetails {
            from_id: AccountId::new(),
            to_id: AccountId::new(),
            transaction_id: TransactionId::new(),
            value,
        }
    }

    fn created(id: AccountId, t: i64) -> AccountEvent {
        AccountEvent::AccountCreated(AccountCreated {
            aggregate_id: id,
            full_name: "Sam Willis".to_string(),
            occurred_at: at(t),
        })
    }

    fn transferred(id: AccountId, transfer: TransferDetails, t: i64) -> AccountEvent {
        AccountEvent::MoneyTransferred(MoneyTransferred {
            aggregate_id: id,
            transfer,
            occurred_at: at(t),
        })
    }

    fn debited(transfer: TransferDetails, t: i64) -> AccountEvent {
        AccountEvent::AccountDebited(AccountDebited {
            aggregate_id: transfer.from_id,
            transfer,
            occurred_at: at(t),
        })
    }

    fn credited(transfer: TransferDetails, t: i64) -> AccountEvent {
        AccountEvent::AccountCredited(AccountCredited {
            aggregate_id: transfer.to_id,
            transfer,
            occurred_at: at(t),
        })
    }

    fn succeeded(id: AccountId, transfer: TransferDetails, t: i64) -> AccountEvent {
        AccountEvent::MoneyTransferSucceeded(MoneyTransferSucceeded {
            aggregate_id: id,
            transfer,
            occurred_at: at(t),
        })
    }

    fn cancelled(id: AccountId, transfer: TransferDetails, t: i64) -> AccountEvent {
        AccountEvent::MoneyTransferCancelled(MoneyTransferCancelled {
            aggregate_id: id,
            transfer,
            reason: CancelReason::BalanceTooLow,
            occurred_at: at(t),
        })
    }

    fn rebuild(events: &[AccountEvent]) -> Account {
        replay(events).unwrap()
    }

    #[test]
    fn account_created_opens_with_initial_balance() {
        let id = AccountId::new();
        let account = rebuild(&[created(id, 0)]);

        assert_eq!(account.id(), &id);
        assert_eq!(account.full_name(), "Sam Willis");
        assert_eq!(account.balance(), money(dec!(1000.00)));
        assert_eq!(account.balance().to_string(), "1000.00");
        assert!(account.transactions().is_empty());
        assert!(account.reserved().is_empty());
        assert_eq!(account.created_at(), account.last_updated_at());
        assert_eq!(account.version(), 1);
    }

    #[test]
    fn outgoing_transfer_is_recorded_negated() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[created(t.from_id, 0), transferred(t.from_id, t, 1)]);

        let tx = account.transaction(t.transaction_id).unwrap();
        assert_eq!(tx.kind, TransactionKind::Outgoing);
        assert_eq!(tx.value, money(dec!(-10)));
        assert_eq!(tx.state, TransactionState::New);
        assert_eq!(tx.created_at, at(1));
        assert_eq!(account.balance(), money(dec!(1000)));
        assert!(account.reserved().is_empty());
        assert_eq!(account.last_updated_at(), at(1));
    }

    #[test]
    fn incoming_transfer_is_recorded_positive() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[created(t.to_id, 0), transferred(t.to_id, t, 1)]);

        let tx = account.transaction(t.transaction_id).unwrap();
        assert_eq!(tx.kind, TransactionKind::Incoming);
        assert_eq!(tx.value, money(dec!(10)));
        assert_eq!(tx.state, TransactionState::New);
    }

    #[test]
    fn debit_reserves_funds_and_marks_pending() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[
            created(t.from_id, 0),
            transferred(t.from_id, t, 1),
            debited(t, 2),
        ]);

        assert_eq!(account.balance(), money(dec!(990)));
        assert_eq!(account.reserved().get(&t.transaction_id), Some(&money(dec!(-10))));
        let tx = account.transaction(t.transaction_id).unwrap();
        assert_eq!(tx.state, TransactionState::Pending);
        assert_eq!(tx.last_updated_at, at(2));
        assert_eq!(account.last_updated_at(), at(2));
    }

    #[test]
    fn debit_without_transaction_only_reserves() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[created(t.from_id, 0), debited(t, 1)]);

        assert_eq!(account.balance(), money(dec!(990)));
        assert!(account.transactions().is_empty());
        assert_eq!(account.reserved().len(), 1);
    }

    #[test]
    fn rejected_debit_leaves_account_untouched() {
        let t = transfer_of(money(dec!(1000.01)));
        let mut account = rebuild(&[created(t.from_id, 0), transferred(t.from_id, t, 1)]);
        let before = account.clone();

        let AccountEvent::AccountDebited(event) = debited(t, 2) else {
            unreachable!()
        };
        assert_eq!(
            account.debit(&event),
            DebitOutcome::Rejected(CancelReason::BalanceTooLow)
        );
        assert_eq!(account, before);
    }

    #[test]
    fn debit_of_entire_balance_is_allowed() {
        let t = transfer_of(money(dec!(1000)));
        let account = rebuild(&[created(t.from_id, 0), debited(t, 1)]);
        assert_eq!(account.balance(), Money::zero());
    }

    #[test]
    fn credit_reserves_without_touching_balance() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[
            created(t.to_id, 0),
            transferred(t.to_id, t, 1),
            credited(t, 2),
        ]);

        assert_eq!(account.balance(), money(dec!(1000)));
        assert_eq!(account.reserved().get(&t.transaction_id), Some(&money(dec!(10))));
        assert_eq!(
            account.transaction(t.transaction_id).unwrap().state,
            TransactionState::Pending
        );
    }

    #[test]
    fn success_on_issuer_keeps_debit_and_releases_reservation() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[
            created(t.from_id, 0),
            transferred(t.from_id, t, 1),
            debited(t, 2),
            succeeded(t.from_id, t, 3),
        ]);

        assert_eq!(account.balance(), money(dec!(990)));
        assert!(account.reserved().is_empty());
        let tx = account.transaction(t.transaction_id).unwrap();
        assert_eq!(tx.state, TransactionState::Succeeded);
        assert_eq!(tx.last_updated_at, at(3));
    }

    #[test]
    fn success_on_receiver_credits_reservation() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[
            created(t.to_id, 0),
            transferred(t.to_id, t, 1),
            credited(t, 2),
            succeeded(t.to_id, t, 3),
        ]);

        assert_eq!(account.balance(), money(dec!(1010)));
        assert!(account.reserved().is_empty());
        assert_eq!(
            account.transaction(t.transaction_id).unwrap().state,
            TransactionState::Succeeded
        );
    }

    #[test]
    fn success_without_reservation_only_finalizes_state() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[
            created(t.from_id, 0),
            transferred(t.from_id, t, 1),
            succeeded(t.from_id, t, 2),
        ]);

        assert_eq!(account.balance(), money(dec!(1000)));
        assert_eq!(
            account.transaction(t.transaction_id).unwrap().state,
            TransactionState::Succeeded
        );
    }

    #[test]
    fn cancel_before_debit_changes_nothing_but_state() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[
            created(t.from_id, 0),
            transferred(t.from_id, t, 1),
            cancelled(t.from_id, t, 2),
        ]);

        assert_eq!(account.balance(), money(dec!(1000)));
        assert!(account.reserved().is_empty());
        let tx = account.transaction(t.transaction_id).unwrap();
        assert_eq!(tx.state, TransactionState::Cancelled);
        assert_eq!(tx.last_updated_at, at(2));
    }

    #[test]
    fn cancel_after_debit_restores_exact_balance() {
        let t = transfer_of(money(dec!(123.45)));
        let account = rebuild(&[
            created(t.from_id, 0),
            transferred(t.from_id, t, 1),
            debited(t, 2),
            cancelled(t.from_id, t, 3),
        ]);

        assert_eq!(account.balance(), money(dec!(1000.00)));
        assert!(account.reserved().is_empty());
        assert_eq!(
            account.transaction(t.transaction_id).unwrap().state,
            TransactionState::Cancelled
        );
    }

    #[test]
    fn cancel_on_receiver_drops_reservation_without_crediting() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[
            created(t.to_id, 0),
            transferred(t.to_id, t, 1),
            credited(t, 2),
            cancelled(t.to_id, t, 3),
        ]);

        assert_eq!(account.balance(), money(dec!(1000)));
        assert!(account.reserved().is_empty());
        assert_eq!(
            account.transaction(t.transaction_id).unwrap().state,
            TransactionState::Cancelled
        );
    }

    #[test]
    fn terminal_state_never_regresses() {
        let t = transfer_of(money(dec!(10)));
        let account = rebuild(&[
            created(t.from_id, 0),
            transferred(t.from_id, t, 1),
            debited(t, 2),
            succeeded(t.from_id, t, 3),
            cancelled(t.from_id, t, 4),
        ]);

        assert_eq!(account.balance(), money(dec!(990)));
        let tx = account.transaction(t.transaction_id).unwrap();
        assert_eq!(tx.state, TransactionState::Succeeded);
        assert_eq!(tx.last_updated_at, at(3));
    }

    #[test]
    fn replay_rejects_overdrawing_stored_debit() {
        let t = transfer_of(money(dec!(1500)));
        let err = replay::<Account, _>(&[created(t.from_id, 0), debited(t, 1)]).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn replay_rejects_malformed_streams() {
        let t = transfer_of(money(dec!(10)));

        let before_created = replay::<Account, _>(&[transferred(t.from_id, t, 0)]);
        assert!(matches!(before_created, Err(DomainError::InvariantViolation(_))));

        let twice = replay::<Account, _>(&[created(t.from_id, 0), created(t.from_id, 1)]);
        assert!(matches!(twice, Err(DomainError::InvariantViolation(_))));

        let foreign = replay::<Account, _>(&[created(t.from_id, 0), credited(t, 1)]);
        assert!(matches!(foreign, Err(DomainError::InvariantViolation(_))));

        let duplicate = replay::<Account, _>(&[
            created(t.from_id, 0),
            transferred(t.from_id, t, 1),
            transferred(t.from_id, t, 2),
        ]);
        assert!(matches!(duplicate, Err(DomainError::InvariantViolation(_))));
    }

    /// Drive one transfer the way the saga does, appending to two in-memory streams.
    fn simulate_transfer(
        issuer: &mut Vec<AccountEvent>,
        receiver: &mut Vec<AccountEvent>,
        t: TransferDetails,
        clock: &mut i64,
    ) {
        let mut tick = || {
            *clock += 1;
            *clock
        };

        issuer.push(transferred(t.from_id, t, tick()));
        let mut state = rebuild(issuer);
        let debit = debited(t, tick());
        let AccountEvent::AccountDebited(ref debit_event) = debit else {
            unreachable!()
        };

        match state.debit(debit_event) {
            DebitOutcome::Debited => {
                issuer.push(debit);
                receiver.push(transferred(t.to_id, t, tick()));
                receiver.push(credited(t, tick()));
                issuer.push(succeeded(t.from_id, t, tick()));
                receiver.push(succeeded(t.to_id, t, tick()));
            }
            DebitOutcome::Rejected(_) => {
                issuer.push(cancelled(t.from_id, t, tick()));
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of transfers in either direction, replay is
        /// deterministic, balances never go negative, money is conserved and no
        /// reservation outlives its transaction.
        #[test]
        fn transfers_conserve_money(
            moves in prop::collection::vec((any::<bool>(), 1i64..60_000i64), 1..40)
        ) {
            let (a, b) = (AccountId::new(), AccountId::new());
            let mut a_events = vec![created(a, 0)];
            let mut b_events = vec![created(b, 0)];
            let mut clock = 0;

            for (a_to_b, minor) in moves {
                let (from_id, to_id) = if a_to_b { (a, b) } else { (b, a) };
                let t = TransferDetails {
                    from_id,
                    to_id,
                    transaction_id: TransactionId::new(),
                    value: Money::from_minor(minor),
                };
                if a_to_b {
                    simulate_transfer(&mut a_events, &mut b_events, t, &mut clock);
                } else {
                    simulate_transfer(&mut b_events, &mut a_events, t, &mut clock);
                }

                let (sa, sb) = (rebuild(&a_events), rebuild(&b_events));
                prop_assert!(!sa.balance().is_negative());
                prop_assert!(!sb.balance().is_negative());
            }

            let (sa, sb) = (rebuild(&a_events), rebuild(&b_events));
            prop_assert_eq!(&sa, &rebuild(&a_events));
            prop_assert_eq!(&sb, &rebuild(&b_events));
            prop_assert_eq!(sa.balance() + sb.balance(), Money::from_minor(2 * INITIAL_BALANCE_MINOR));
            prop_assert!(sa.reserved().is_empty());
            prop_assert!(sb.reserved().is_empty());
            prop_assert!(sa.transactions().values().all(|tx| tx.state.is_terminal()));
        }
    }
}
