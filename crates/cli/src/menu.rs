//! The interactive menu loop.
//!
//! Generic over its reader/writer so tests can drive it with scripted input.

use std::io::{BufRead, Write};

use anyhow::Result;

use minibank_accounts::{Ledger, Pin, MINIMUM_HOLDER_AGE};
use minibank_core::AccountNumber;

use crate::money::{format_amount, parse_amount};

/// Run the menu loop until the user exits or the input ends.
pub fn run<R: BufRead, W: Write>(ledger: &mut Ledger, input: &mut R, out: &mut W) -> Result<()> {
    loop {
        print_menu(out)?;
        let Some(choice) = read_line(input)? else {
            break;
        };
        match choice.as_str() {
            "1" => open_account(ledger, input, out)?,
            "2" => set_pin(ledger, input, out)?,
            "3" => deposit(ledger, input, out)?,
            "4" => withdraw(ledger, input, out)?,
            "5" => view_balance(ledger, input, out)?,
            "6" => view_history(ledger, input, out)?,
            "7" => {
                writeln!(out, "Goodbye!")?;
                break;
            }
            other => writeln!(out, "Invalid choice {other:?}. Enter 1-7.")?,
        }
    }
    Ok(())
}

fn print_menu<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{}", "-".repeat(50))?;
    writeln!(out, "Welcome to minibank (PIN-secured)")?;
    writeln!(out, "1. Open new account (optionally set PIN now)")?;
    writeln!(out, "2. Set / update PIN")?;
    writeln!(out, "3. Deposit (requires PIN)")?;
    writeln!(out, "4. Withdraw (requires PIN)")?;
    writeln!(out, "5. View balance (requires PIN)")?;
    writeln!(out, "6. View transaction history (requires PIN)")?;
    writeln!(out, "7. Exit")?;
    writeln!(out, "{}", "-".repeat(50))?;
    write!(out, "Enter your choice (1-7): ")?;
    out.flush()?;
    Ok(())
}

/// Read one trimmed line; `None` means the input ended.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> Result<Option<String>> {
    write!(out, "{text}")?;
    out.flush()?;
    read_line(input)
}

/// Account-opening flow: re-prompts on invalid or underage input, cancels
/// with 'c' at the name prompt.
fn open_account<R: BufRead, W: Write>(
    ledger: &mut Ledger,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    loop {
        writeln!(out, "(Enter 'c' at the name prompt to cancel)")?;
        let Some(name) = prompt(input, out, "Full name: ")? else {
            return Ok(());
        };
        if name.eq_ignore_ascii_case("c") {
            writeln!(out, "Account opening cancelled.")?;
            return Ok(());
        }

        let Some(age_raw) = prompt(input, out, "Age: ")? else {
            return Ok(());
        };
        let Ok(age) = age_raw.parse::<u8>() else {
            writeln!(out, "Invalid age; enter a whole number.")?;
            continue;
        };
        if age < MINIMUM_HOLDER_AGE {
            writeln!(out, "You must be 18 or older to open an account.")?;
            continue;
        }

        let Some(answer) = prompt(input, out, "Set a 4-digit PIN now? (y/n): ")? else {
            return Ok(());
        };
        let initial_pin = if answer.eq_ignore_ascii_case("y") {
            match read_new_pin(input, out)? {
                Some(pin) => Some(pin),
                None => return Ok(()),
            }
        } else {
            None
        };
        let pin_was_set = initial_pin.is_some();

        match ledger.open_next_account(&name, age, initial_pin) {
            Ok(number) => {
                if pin_was_set {
                    writeln!(out, "Account opened: {number} (PIN set)")?;
                } else {
                    writeln!(out, "Account opened: {number} (no PIN set; use option 2)")?;
                }
                return Ok(());
            }
            Err(err) => writeln!(out, "Error: {err}")?,
        }
    }
}

/// Ask for a new PIN twice until both entries match and parse.
fn read_new_pin<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Option<Pin>> {
    loop {
        let Some(first) = prompt(input, out, "Enter 4-digit PIN: ")? else {
            return Ok(None);
        };
        let Some(second) = prompt(input, out, "Confirm PIN: ")? else {
            return Ok(None);
        };
        if first != second {
            writeln!(out, "PINs do not match. Try again.")?;
            continue;
        }
        match Pin::parse(&first) {
            Ok(pin) => return Ok(Some(pin)),
            Err(err) => writeln!(out, "Error: {err}")?,
        }
    }
}

fn set_pin<R: BufRead, W: Write>(ledger: &mut Ledger, input: &mut R, out: &mut W) -> Result<()> {
    let Some(number) = prompt(input, out, "Account number: ")? else {
        return Ok(());
    };
    let Some(pin) = read_new_pin(input, out)? else {
        return Ok(());
    };
    match ledger.set_pin(&AccountNumber::from(number), pin) {
        Ok(()) => writeln!(out, "PIN set/updated.")?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(())
}

/// Shared prompt for the PIN-guarded operations.
fn read_credentials<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
) -> Result<Option<(AccountNumber, Pin)>> {
    let Some(number) = prompt(input, out, "Account number: ")? else {
        return Ok(None);
    };
    let Some(raw_pin) = prompt(input, out, "4-digit PIN: ")? else {
        return Ok(None);
    };
    match Pin::parse(&raw_pin) {
        Ok(pin) => Ok(Some((AccountNumber::from(number), pin))),
        Err(err) => {
            writeln!(out, "Error: {err}")?;
            Ok(None)
        }
    }
}

fn deposit<R: BufRead, W: Write>(ledger: &mut Ledger, input: &mut R, out: &mut W) -> Result<()> {
    let Some((number, pin)) = read_credentials(input, out)? else {
        return Ok(());
    };
    let Some(raw) = prompt(input, out, "Amount to deposit: ")? else {
        return Ok(());
    };
    let Some(amount) = parse_amount(&raw) else {
        writeln!(out, "Invalid amount; use e.g. 12.34")?;
        return Ok(());
    };
    match ledger.deposit(&number, &pin, amount) {
        Ok(balance) => writeln!(
            out,
            "Deposited {}. New balance: {}",
            format_amount(amount),
            format_amount(balance)
        )?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(())
}

fn withdraw<R: BufRead, W: Write>(ledger: &mut Ledger, input: &mut R, out: &mut W) -> Result<()> {
    let Some((number, pin)) = read_credentials(input, out)? else {
        return Ok(());
    };
    let Some(raw) = prompt(input, out, "Amount to withdraw: ")? else {
        return Ok(());
    };
    let Some(amount) = parse_amount(&raw) else {
        writeln!(out, "Invalid amount; use e.g. 12.34")?;
        return Ok(());
    };
    match ledger.withdraw(&number, &pin, amount) {
        Ok(balance) => writeln!(
            out,
            "Withdrew {}. New balance: {}",
            format_amount(amount),
            format_amount(balance)
        )?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(())
}

fn view_balance<R: BufRead, W: Write>(
    ledger: &mut Ledger,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let Some((number, pin)) = read_credentials(input, out)? else {
        return Ok(());
    };
    match ledger.balance(&number, &pin) {
        Ok(balance) => writeln!(out, "Current balance: {}", format_amount(balance))?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(())
}

fn view_history<R: BufRead, W: Write>(
    ledger: &mut Ledger,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let Some((number, pin)) = read_credentials(input, out)? else {
        return Ok(());
    };
    let Some(as_json) = prompt(input, out, "Output as JSON? (y/n): ")? else {
        return Ok(());
    };
    match ledger.history(&number, &pin) {
        Ok(records) if as_json.eq_ignore_ascii_case("y") => {
            writeln!(out, "{}", serde_json::to_string_pretty(records)?)?;
        }
        Ok(records) => {
            writeln!(out, "Transaction history for {number}:")?;
            for record in records {
                writeln!(
                    out,
                    "  {} - {}: {}",
                    record.occurred_at.format("%Y-%m-%d %H:%M:%S"),
                    record.kind,
                    format_amount(record.amount)
                )?;
            }
        }
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(())
}
