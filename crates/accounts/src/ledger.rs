//! The in-memory account ledger.
//!
//! Owns every account exclusively; all mutation goes through the operations
//! below, which drive the `Account` aggregate's handle/apply cycle. State
//! lives for one process run and is dropped at exit.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use minibank_core::{AccountNumber, Aggregate, Event, LedgerError, LedgerResult, TransactionId};

use crate::account::{
    Account, AccountCommand, AccountEvent, Deposit, OpenAccount, SetPin, TransactionRecord,
    Withdraw,
};
use crate::pin::Pin;

/// First account number handed out by [`Ledger::open_next_account`].
const FIRST_ACCOUNT_NUMBER: u64 = 1001;

/// Apply freshly decided events to an account, logging each one.
fn apply_events(account: &mut Account, events: &[AccountEvent]) {
    for event in events {
        debug!(event = event.event_type(), "applying event");
        account.apply(event);
    }
}

/// In-memory store of all accounts, keyed by account number.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    accounts: HashMap<AccountNumber, Account>,
    issued: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn contains(&self, number: &AccountNumber) -> bool {
        self.accounts.contains_key(number)
    }

    /// Open an account under a caller-chosen number.
    ///
    /// Fails with `Validation` for an underage or blank-named holder and for
    /// a number already in use; on failure nothing is inserted.
    pub fn open_account(
        &mut self,
        number: AccountNumber,
        holder_name: &str,
        holder_age: u8,
        initial_pin: Option<Pin>,
    ) -> LedgerResult<AccountNumber> {
        if self.accounts.contains_key(&number) {
            return Err(LedgerError::validation("account number already in use"));
        }

        let mut account = Account::empty(number.clone());
        let cmd = AccountCommand::Open(OpenAccount {
            number: number.clone(),
            holder_name: holder_name.to_string(),
            holder_age,
            initial_pin,
            transaction_id: TransactionId::new(),
            occurred_at: Utc::now(),
        });
        let events = account.handle(&cmd)?;
        apply_events(&mut account, &events);

        let pin_set = account.pin_is_set();
        self.accounts.insert(number.clone(), account);
        info!(account = %number, pin_set, "account opened");
        Ok(number)
    }

    /// Open an account under the next sequential number (1001, 1002, ...).
    ///
    /// Skips numbers already taken by caller-chosen openings; a rejected
    /// opening does not burn a number.
    pub fn open_next_account(
        &mut self,
        holder_name: &str,
        holder_age: u8,
        initial_pin: Option<Pin>,
    ) -> LedgerResult<AccountNumber> {
        while self
            .accounts
            .contains_key(&AccountNumber::new((FIRST_ACCOUNT_NUMBER + self.issued).to_string()))
        {
            self.issued += 1;
        }
        let number = AccountNumber::new((FIRST_ACCOUNT_NUMBER + self.issued).to_string());
        let number = self.open_account(number, holder_name, holder_age, initial_pin)?;
        self.issued += 1;
        Ok(number)
    }

    /// Set or update the PIN for an account. Overwrites any previous hash.
    pub fn set_pin(&mut self, number: &AccountNumber, pin: Pin) -> LedgerResult<()> {
        let account = self
            .accounts
            .get_mut(number)
            .ok_or(LedgerError::NotFound)?;
        let cmd = AccountCommand::SetPin(SetPin {
            number: number.clone(),
            pin,
            occurred_at: Utc::now(),
        });
        let events = account.handle(&cmd)?;
        apply_events(account, &events);
        info!(account = %number, "pin updated");
        Ok(())
    }

    /// Whether `pin` authorizes `number`.
    ///
    /// Total: unknown accounts and accounts with no PIN set are both `false`.
    pub fn authenticate(&self, number: &AccountNumber, pin: &Pin) -> bool {
        self.accounts
            .get(number)
            .is_some_and(|account| account.verify_pin(pin))
    }

    /// Deposit into an account. Requires the PIN; returns the new balance.
    pub fn deposit(
        &mut self,
        number: &AccountNumber,
        pin: &Pin,
        amount: i64,
    ) -> LedgerResult<i64> {
        let account = self.authorized_mut(number, pin)?;
        let cmd = AccountCommand::Deposit(Deposit {
            number: number.clone(),
            amount,
            transaction_id: TransactionId::new(),
            occurred_at: Utc::now(),
        });
        let events = account.handle(&cmd)?;
        apply_events(account, &events);
        debug!(account = %number, amount, balance = account.balance(), "deposit");
        Ok(account.balance())
    }

    /// Withdraw from an account. Requires the PIN; returns the new balance.
    pub fn withdraw(
        &mut self,
        number: &AccountNumber,
        pin: &Pin,
        amount: i64,
    ) -> LedgerResult<i64> {
        let account = self.authorized_mut(number, pin)?;
        let cmd = AccountCommand::Withdraw(Withdraw {
            number: number.clone(),
            amount,
            transaction_id: TransactionId::new(),
            occurred_at: Utc::now(),
        });
        let events = account.handle(&cmd)?;
        apply_events(account, &events);
        debug!(account = %number, amount, balance = account.balance(), "withdrawal");
        Ok(account.balance())
    }

    /// Current balance. Requires the PIN.
    pub fn balance(&self, number: &AccountNumber, pin: &Pin) -> LedgerResult<i64> {
        Ok(self.authorized(number, pin)?.balance())
    }

    /// Full transaction history in insertion order. Requires the PIN.
    ///
    /// Read-only and repeatable: identical results until the next mutation.
    pub fn history(
        &self,
        number: &AccountNumber,
        pin: &Pin,
    ) -> LedgerResult<&[TransactionRecord]> {
        Ok(self.authorized(number, pin)?.transactions())
    }

    fn authorized(&self, number: &AccountNumber, pin: &Pin) -> LedgerResult<&Account> {
        let account = self.accounts.get(number).ok_or(LedgerError::NotFound)?;
        if !account.verify_pin(pin) {
            warn!(account = %number, "authentication failed");
            return Err(LedgerError::Auth);
        }
        Ok(account)
    }

    fn authorized_mut(
        &mut self,
        number: &AccountNumber,
        pin: &Pin,
    ) -> LedgerResult<&mut Account> {
        let account = self.accounts.get_mut(number).ok_or(LedgerError::NotFound)?;
        if !account.verify_pin(pin) {
            warn!(account = %number, "authentication failed");
            return Err(LedgerError::Auth);
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::TransactionKind;
    use proptest::prelude::*;

    fn pin(raw: &str) -> Pin {
        Pin::parse(raw).unwrap()
    }

    fn ledger_with_alice() -> (Ledger, AccountNumber) {
        let mut ledger = Ledger::new();
        let number = ledger
            .open_account("alice".into(), "Alice", 20, Some(pin("1234")))
            .unwrap();
        (ledger, number)
    }

    #[test]
    fn deposit_then_overdraft_scenario() {
        let (mut ledger, alice) = ledger_with_alice();
        assert_eq!(ledger.balance(&alice, &pin("1234")).unwrap(), 0);

        assert_eq!(ledger.deposit(&alice, &pin("1234"), 100).unwrap(), 100);
        assert_eq!(ledger.withdraw(&alice, &pin("1234"), 40).unwrap(), 60);

        let err = ledger.withdraw(&alice, &pin("1234"), 1000).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                balance: 60,
                requested: 1000
            }
        );
        assert_eq!(ledger.balance(&alice, &pin("1234")).unwrap(), 60);
    }

    #[test]
    fn underage_holder_is_rejected_and_absent() {
        let mut ledger = Ledger::new();
        let err = ledger
            .open_account("bob".into(), "Bob", 16, None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(!ledger.contains(&"bob".into()));
        assert!(ledger.is_empty());
    }

    #[test]
    fn duplicate_account_number_is_rejected() {
        let (mut ledger, _) = ledger_with_alice();
        let err = ledger
            .open_account("alice".into(), "Other Alice", 30, None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn sequential_numbers_start_at_1001_and_skip_failures() {
        let mut ledger = Ledger::new();
        let first = ledger.open_next_account("Sai", 22, Some(pin("1234"))).unwrap();
        assert_eq!(first.as_str(), "1001");

        // A rejected opening must not burn the number.
        assert!(ledger.open_next_account("Ravi", 15, None).is_err());

        let second = ledger.open_next_account("Priya", 40, None).unwrap();
        assert_eq!(second.as_str(), "1002");
    }

    #[test]
    fn sequential_numbers_skip_caller_chosen_collisions() {
        let mut ledger = Ledger::new();
        ledger
            .open_account("1001".into(), "Manual Holder", 40, None)
            .unwrap();

        let next = ledger.open_next_account("Sai", 22, None).unwrap();
        assert_eq!(next.as_str(), "1002");
    }

    #[test]
    fn deposit_that_would_overflow_is_rejected() {
        let (mut ledger, alice) = ledger_with_alice();
        assert_eq!(
            ledger.deposit(&alice, &pin("1234"), i64::MAX).unwrap(),
            i64::MAX
        );

        let err = ledger.deposit(&alice, &pin("1234"), 1).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger.balance(&alice, &pin("1234")).unwrap(), i64::MAX);
        // Only the opening and the first deposit were recorded.
        assert_eq!(ledger.history(&alice, &pin("1234")).unwrap().len(), 2);
    }

    #[test]
    fn authenticate_is_false_without_a_pin() {
        let mut ledger = Ledger::new();
        let number = ledger.open_next_account("Sai", 22, None).unwrap();

        assert!(!ledger.authenticate(&number, &pin("1234")));
        // Guarded operations refuse outright.
        assert_eq!(
            ledger.deposit(&number, &pin("1234"), 100).unwrap_err(),
            LedgerError::Auth
        );
    }

    #[test]
    fn authenticate_is_false_for_unknown_accounts() {
        let ledger = Ledger::new();
        assert!(!ledger.authenticate(&"ghost".into(), &pin("1234")));
    }

    #[test]
    fn wrong_pin_is_rejected_everywhere() {
        let (mut ledger, alice) = ledger_with_alice();
        let wrong = pin("0000");

        assert!(!ledger.authenticate(&alice, &wrong));
        assert_eq!(ledger.balance(&alice, &wrong).unwrap_err(), LedgerError::Auth);
        assert_eq!(ledger.history(&alice, &wrong).unwrap_err(), LedgerError::Auth);
        assert_eq!(
            ledger.deposit(&alice, &wrong, 100).unwrap_err(),
            LedgerError::Auth
        );
        assert_eq!(
            ledger.withdraw(&alice, &wrong, 100).unwrap_err(),
            LedgerError::Auth
        );
    }

    #[test]
    fn set_pin_enables_and_rotates_access() {
        let mut ledger = Ledger::new();
        let number = ledger.open_next_account("Sai", 22, None).unwrap();

        ledger.set_pin(&number, pin("1234")).unwrap();
        assert!(ledger.authenticate(&number, &pin("1234")));

        ledger.set_pin(&number, pin("4321")).unwrap();
        assert!(ledger.authenticate(&number, &pin("4321")));
        assert!(!ledger.authenticate(&number, &pin("1234")));
    }

    #[test]
    fn set_pin_on_unknown_account_is_not_found() {
        let mut ledger = Ledger::new();
        assert_eq!(
            ledger.set_pin(&"ghost".into(), pin("1234")).unwrap_err(),
            LedgerError::NotFound
        );
    }

    #[test]
    fn unknown_account_operations_are_not_found() {
        let mut ledger = Ledger::new();
        let ghost: AccountNumber = "ghost".into();
        assert_eq!(
            ledger.deposit(&ghost, &pin("1234"), 100).unwrap_err(),
            LedgerError::NotFound
        );
        assert_eq!(
            ledger.balance(&ghost, &pin("1234")).unwrap_err(),
            LedgerError::NotFound
        );
        assert_eq!(
            ledger.history(&ghost, &pin("1234")).unwrap_err(),
            LedgerError::NotFound
        );
    }

    #[test]
    fn deposit_then_withdraw_round_trips_balance() {
        let (mut ledger, alice) = ledger_with_alice();
        ledger.deposit(&alice, &pin("1234"), 250).unwrap();
        let before = ledger.balance(&alice, &pin("1234")).unwrap();

        ledger.deposit(&alice, &pin("1234"), 75).unwrap();
        ledger.withdraw(&alice, &pin("1234"), 75).unwrap();

        assert_eq!(ledger.balance(&alice, &pin("1234")).unwrap(), before);
    }

    #[test]
    fn history_records_call_order_and_is_repeatable() {
        let (mut ledger, alice) = ledger_with_alice();
        ledger.deposit(&alice, &pin("1234"), 100).unwrap();
        ledger.withdraw(&alice, &pin("1234"), 40).unwrap();
        // Failed operations leave no trace.
        let _ = ledger.withdraw(&alice, &pin("1234"), 1000);

        let kinds: Vec<TransactionKind> = ledger
            .history(&alice, &pin("1234"))
            .unwrap()
            .iter()
            .map(|record| record.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Opened,
                TransactionKind::Deposit,
                TransactionKind::Withdrawal
            ]
        );
        assert_eq!(
            ledger.history(&alice, &pin("1234")).unwrap(),
            ledger.history(&alice, &pin("1234")).unwrap()
        );

        let amounts: Vec<i64> = ledger
            .history(&alice, &pin("1234"))
            .unwrap()
            .iter()
            .map(|record| record.amount)
            .collect();
        assert_eq!(amounts, vec![0, 100, 40]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of deposit/withdraw attempts the
        /// balance is never negative, equals the sum of successful
        /// operations, and the history length is 1 (opening) plus the number
        /// of successful operations.
        #[test]
        fn balance_never_negative_and_history_counts_successes(
            ops in prop::collection::vec((any::<bool>(), -100i64..10_000i64), 0..48)
        ) {
            let mut ledger = Ledger::new();
            let number = ledger
                .open_next_account("Prop Holder", 33, Some(Pin::parse("1234").unwrap()))
                .unwrap();
            let pin = Pin::parse("1234").unwrap();

            let mut expected_balance = 0i64;
            let mut successes = 0usize;

            for (is_deposit, amount) in ops {
                let result = if is_deposit {
                    ledger.deposit(&number, &pin, amount)
                } else {
                    ledger.withdraw(&number, &pin, amount)
                };

                match result {
                    Ok(balance) => {
                        expected_balance += if is_deposit { amount } else { -amount };
                        successes += 1;
                        prop_assert_eq!(balance, expected_balance);
                    }
                    Err(_) => {
                        // Failed operation must leave the balance untouched.
                        prop_assert_eq!(
                            ledger.balance(&number, &pin).unwrap(),
                            expected_balance
                        );
                    }
                }

                prop_assert!(ledger.balance(&number, &pin).unwrap() >= 0);
            }

            prop_assert_eq!(
                ledger.history(&number, &pin).unwrap().len(),
                1 + successes
            );
        }
    }
}
