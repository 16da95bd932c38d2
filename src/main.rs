use std::{error::Error, fs, path::PathBuf, process};

use clap::{Parser, Subcommand};

use votemint::ledger::{DECIMALS, NAME, SCALE, SYMBOL};
use votemint::{Amount, Ledger, LedgerSnapshot};

#[derive(Parser)]
#[command(name = "votemint", version, about = "Capped governance-grant ledger")]
struct Cli {
    /// Ledger state file
    #[arg(long, global = true, default_value = "votemint.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new ledger state file with one seed owner and a fixed cap
    Init {
        #[arg(long)]
        owner: String,
        /// Cap in whole credits (or base units with --base-units)
        #[arg(long)]
        cap: Amount,
        /// Treat amounts as raw base units instead of whole credits
        #[arg(long)]
        base_units: bool,
    },
    /// Mint an amount to a recipient
    Grant {
        #[arg(long)]
        from: String,
        recipient: String,
        amount: Amount,
        #[arg(long)]
        base_units: bool,
    },
    /// Mint the same amount to every listed recipient, all-or-nothing
    Multigrant {
        #[arg(long)]
        from: String,
        #[arg(long)]
        amount: Amount,
        #[arg(long)]
        base_units: bool,
        #[arg(required = true)]
        recipients: Vec<String>,
    },
    /// Authorize another account as owner
    AddOwner {
        #[arg(long)]
        from: String,
        account: String,
    },
    /// Revoke another owner (an owner cannot remove itself)
    RemoveOwner {
        #[arg(long)]
        from: String,
        account: String,
    },
    /// Query owner membership
    IsOwner { account: String },
    /// Query an account balance
    Balance { account: String },
    /// Print ledger summary and integrity digest
    Show,
    /// Recheck the state file's digest and accounting invariants
    Verify,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Init {
            owner,
            cap,
            base_units,
        } => {
            if cli.state.exists() {
                return Err(format!("state file {} already exists", cli.state.display()).into());
            }
            let ledger = Ledger::new(owner, to_base_units(cap, base_units)?);
            save(&cli.state, &ledger)?;
            println!(
                "initialized {} ({}) cap={} → {}",
                NAME,
                SYMBOL,
                format_amount(ledger.cap()),
                cli.state.display()
            );
        }
        Command::Grant {
            from,
            recipient,
            amount,
            base_units,
        } => {
            let mut ledger = load(&cli.state)?;
            let amount = to_base_units(amount, base_units)?;
            ledger.grant(&from, &recipient, amount)?;
            save(&cli.state, &ledger)?;
            println!(
                "granted {} to {} (total {} / cap {})",
                format_amount(amount),
                recipient,
                format_amount(ledger.total_granted()),
                format_amount(ledger.cap())
            );
        }
        Command::Multigrant {
            from,
            amount,
            base_units,
            recipients,
        } => {
            let mut ledger = load(&cli.state)?;
            let amount = to_base_units(amount, base_units)?;
            ledger.multigrant(&from, &recipients, amount)?;
            save(&cli.state, &ledger)?;
            println!(
                "granted {} to each of {} recipients (total {} / cap {})",
                format_amount(amount),
                recipients.len(),
                format_amount(ledger.total_granted()),
                format_amount(ledger.cap())
            );
        }
        Command::AddOwner { from, account } => {
            let mut ledger = load(&cli.state)?;
            ledger.add_owner(&from, &account)?;
            save(&cli.state, &ledger)?;
            println!("{account} is now an owner");
        }
        Command::RemoveOwner { from, account } => {
            let mut ledger = load(&cli.state)?;
            ledger.remove_owner(&from, &account)?;
            save(&cli.state, &ledger)?;
            println!("{account} is no longer an owner");
        }
        Command::IsOwner { account } => {
            let ledger = load(&cli.state)?;
            println!("{}", ledger.is_owner(&account));
        }
        Command::Balance { account } => {
            let ledger = load(&cli.state)?;
            println!("{}", format_amount(ledger.balance_of(&account)));
        }
        Command::Show => {
            let ledger = load(&cli.state)?;
            let snapshot = ledger.snapshot();
            println!("{} ({}), {} decimals", snapshot.name, snapshot.symbol, DECIMALS);
            println!(
                "cap {} | granted {}",
                format_amount(snapshot.cap),
                format_amount(snapshot.total_granted)
            );
            println!("owners:");
            for owner in ledger.owners().iter() {
                println!("  {owner}");
            }
            println!("balances:");
            for (account, amount) in ledger.balances() {
                println!("  {account}  {}", format_amount(*amount));
            }
            println!("events: {}", ledger.events().len());
            println!("merkle root: {}", hex::encode(snapshot.merkle_root));
        }
        Command::Verify => {
            // load() already recomputes the digest and invariants
            let ledger = load(&cli.state)?;
            println!(
                "ok: {} accounts, {} owners, root {}",
                ledger.balances().len(),
                ledger.owners().len(),
                hex::encode(ledger.snapshot().merkle_root)
            );
        }
    }
    Ok(())
}

fn load(path: &PathBuf) -> Result<Ledger, Box<dyn Error>> {
    let bytes = fs::read(path)
        .map_err(|err| format!("cannot read state file {}: {err}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)?;
    Ok(Ledger::from_snapshot(snapshot)?)
}

fn save(path: &PathBuf, ledger: &Ledger) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_vec_pretty(&ledger.snapshot())?;
    fs::write(path, json)
        .map_err(|err| format!("cannot write state file {}: {err}", path.display()))?;
    Ok(())
}

fn to_base_units(amount: Amount, base_units: bool) -> Result<Amount, Box<dyn Error>> {
    if base_units {
        return Ok(amount);
    }
    amount
        .checked_mul(SCALE)
        .ok_or_else(|| format!("amount {amount} credits does not fit in base units").into())
}

fn format_amount(base: Amount) -> String {
    let whole = base / SCALE;
    let frac = base % SCALE;
    if frac == 0 {
        format!("{whole} {SYMBOL}")
    } else {
        let frac = format!("{frac:018}");
        format!("{whole}.{} {SYMBOL}", frac.trim_end_matches('0'))
    }
}
