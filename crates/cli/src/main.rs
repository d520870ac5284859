//! minibank — PIN-secured banking simulator on an in-memory ledger.

use anyhow::Result;

use minibank_accounts::{Ledger, Pin};
use minibank_cli::menu;

fn main() -> Result<()> {
    minibank_observability::init();

    let mut ledger = Ledger::new();
    if std::env::var("MINIBANK_SEED_DEMO").is_ok() {
        seed_demo(&mut ledger)?;
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    menu::run(&mut ledger, &mut stdin.lock(), &mut stdout.lock())
}

/// Preload one account with a bit of history, for interactive exploration.
fn seed_demo(ledger: &mut Ledger) -> Result<()> {
    let pin = Pin::parse("1234")?;
    let number = ledger.open_next_account("Demo Holder", 30, Some(pin.clone()))?;
    ledger.deposit(&number, &pin, 50_000)?;
    ledger.withdraw(&number, &pin, 12_500)?;
    tracing::info!(account = %number, "seeded demo account (PIN 1234)");
    Ok(())
}
