use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use minibank_core::{
    AccountNumber, Aggregate, AggregateRoot, Entity, Event, LedgerError, TransactionId,
};

use crate::pin::{Pin, PinHash};

/// Minimum holder age at account opening. Checked once, never re-verified.
pub const MINIMUM_HOLDER_AGE: u8 = 18;

/// Kind of event recorded in an account's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Opened,
    Deposit,
    Withdrawal,
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransactionKind::Opened => f.write_str("account opened"),
            TransactionKind::Deposit => f.write_str("deposit"),
            TransactionKind::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

/// One immutable history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub kind: TransactionKind,
    /// Amount in minor units (cents). Zero for `Opened`.
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

impl Entity for TransactionRecord {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: one customer account.
///
/// # Invariants
/// - Balance is never negative after any applied event.
/// - History is append-only; insertion order is call order.
/// - The stored PIN is only ever a hash; setting a PIN is not a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    number: AccountNumber,
    holder_name: String,
    holder_age: u8,
    balance: i64,
    pin_hash: Option<PinHash>,
    transactions: Vec<TransactionRecord>,
    version: u64,
    opened: bool,
}

impl Account {
    /// Empty, not-yet-opened aggregate instance.
    pub fn empty(number: AccountNumber) -> Self {
        Self {
            number,
            holder_name: String::new(),
            holder_age: 0,
            balance: 0,
            pin_hash: None,
            transactions: Vec::new(),
            version: 0,
            opened: false,
        }
    }

    pub fn number(&self) -> &AccountNumber {
        &self.number
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn holder_age(&self) -> u8 {
        self.holder_age
    }

    /// Current balance in minor units.
    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn pin_is_set(&self) -> bool {
        self.pin_hash.is_some()
    }

    /// Full history, insertion order.
    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    /// Whether `pin` authorizes this account.
    ///
    /// An account with no PIN set cannot be authorized by any PIN.
    pub fn verify_pin(&self, pin: &Pin) -> bool {
        self.pin_hash.as_ref().is_some_and(|hash| hash.matches(pin))
    }
}

impl AggregateRoot for Account {
    type Id = AccountNumber;

    fn id(&self) -> &Self::Id {
        &self.number
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenAccount.
#[derive(Debug, Clone)]
pub struct OpenAccount {
    pub number: AccountNumber,
    pub holder_name: String,
    pub holder_age: u8,
    pub initial_pin: Option<Pin>,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetPin (set or overwrite).
#[derive(Debug, Clone)]
pub struct SetPin {
    pub number: AccountNumber,
    pub pin: Pin,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Deposit.
#[derive(Debug, Clone)]
pub struct Deposit {
    pub number: AccountNumber,
    pub amount: i64,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Withdraw.
#[derive(Debug, Clone)]
pub struct Withdraw {
    pub number: AccountNumber,
    pub amount: i64,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum AccountCommand {
    Open(OpenAccount),
    SetPin(SetPin),
    Deposit(Deposit),
    Withdraw(Withdraw),
}

/// Event: AccountOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOpened {
    pub number: AccountNumber,
    pub holder_name: String,
    pub holder_age: u8,
    pub initial_pin_hash: Option<PinHash>,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PinUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinUpdated {
    pub number: AccountNumber,
    pub pin_hash: PinHash,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MoneyDeposited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyDeposited {
    pub number: AccountNumber,
    pub amount: i64,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MoneyWithdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyWithdrawn {
    pub number: AccountNumber,
    pub amount: i64,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    Opened(AccountOpened),
    PinUpdated(PinUpdated),
    Deposited(MoneyDeposited),
    Withdrawn(MoneyWithdrawn),
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::Opened(_) => "accounts.account.opened",
            AccountEvent::PinUpdated(_) => "accounts.account.pin_updated",
            AccountEvent::Deposited(_) => "accounts.account.money_deposited",
            AccountEvent::Withdrawn(_) => "accounts.account.money_withdrawn",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::Opened(e) => e.occurred_at,
            AccountEvent::PinUpdated(e) => e.occurred_at,
            AccountEvent::Deposited(e) => e.occurred_at,
            AccountEvent::Withdrawn(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::Opened(e) => {
                self.number = e.number.clone();
                self.holder_name = e.holder_name.clone();
                self.holder_age = e.holder_age;
                self.balance = 0;
                self.pin_hash = e.initial_pin_hash.clone();
                self.transactions.push(TransactionRecord {
                    id: e.transaction_id,
                    kind: TransactionKind::Opened,
                    amount: 0,
                    occurred_at: e.occurred_at,
                });
                self.opened = true;
            }
            AccountEvent::PinUpdated(e) => {
                // Not a transaction: PIN changes leave no history entry.
                self.pin_hash = Some(e.pin_hash.clone());
            }
            AccountEvent::Deposited(e) => {
                self.balance += e.amount;
                self.transactions.push(TransactionRecord {
                    id: e.transaction_id,
                    kind: TransactionKind::Deposit,
                    amount: e.amount,
                    occurred_at: e.occurred_at,
                });
            }
            AccountEvent::Withdrawn(e) => {
                self.balance -= e.amount;
                self.transactions.push(TransactionRecord {
                    id: e.transaction_id,
                    kind: TransactionKind::Withdrawal,
                    amount: e.amount,
                    occurred_at: e.occurred_at,
                });
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Open(cmd) => self.handle_open(cmd),
            AccountCommand::SetPin(cmd) => self.handle_set_pin(cmd),
            AccountCommand::Deposit(cmd) => self.handle_deposit(cmd),
            AccountCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
        }
    }
}

impl Account {
    fn ensure_opened(&self) -> Result<(), LedgerError> {
        if !self.opened {
            return Err(LedgerError::not_found());
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenAccount) -> Result<Vec<AccountEvent>, LedgerError> {
        if self.opened {
            return Err(LedgerError::validation("account already open"));
        }

        if cmd.holder_name.trim().is_empty() {
            return Err(LedgerError::validation("holder name cannot be empty"));
        }

        if cmd.holder_age < MINIMUM_HOLDER_AGE {
            return Err(LedgerError::validation(
                "holder must be 18 or older to open an account",
            ));
        }

        Ok(vec![AccountEvent::Opened(AccountOpened {
            number: cmd.number.clone(),
            holder_name: cmd.holder_name.trim().to_string(),
            holder_age: cmd.holder_age,
            initial_pin_hash: cmd.initial_pin.as_ref().map(Pin::hash),
            transaction_id: cmd.transaction_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_pin(&self, cmd: &SetPin) -> Result<Vec<AccountEvent>, LedgerError> {
        self.ensure_opened()?;

        Ok(vec![AccountEvent::PinUpdated(PinUpdated {
            number: cmd.number.clone(),
            pin_hash: cmd.pin.hash(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deposit(&self, cmd: &Deposit) -> Result<Vec<AccountEvent>, LedgerError> {
        self.ensure_opened()?;

        if cmd.amount <= 0 {
            return Err(LedgerError::validation("deposit amount must be positive"));
        }

        if self.balance.checked_add(cmd.amount).is_none() {
            return Err(LedgerError::validation("deposit would overflow balance"));
        }

        Ok(vec![AccountEvent::Deposited(MoneyDeposited {
            number: cmd.number.clone(),
            amount: cmd.amount,
            transaction_id: cmd.transaction_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &Withdraw) -> Result<Vec<AccountEvent>, LedgerError> {
        self.ensure_opened()?;

        if cmd.amount <= 0 {
            return Err(LedgerError::validation(
                "withdrawal amount must be positive",
            ));
        }

        if cmd.amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                balance: self.balance,
                requested: cmd.amount,
            });
        }

        Ok(vec![AccountEvent::Withdrawn(MoneyWithdrawn {
            number: cmd.number.clone(),
            amount: cmd.amount,
            transaction_id: cmd.transaction_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
