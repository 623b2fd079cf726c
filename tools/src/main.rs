//! desk-runner: headless driver for the Shift Desk policy core.
//!
//! Usage:
//!   desk-runner --data-dir ./data                 print the current rate card
//!   desk-runner --policy 2023-09                  print a specific version
//!   desk-runner --db desk.db --ipc-mode           JSON commands on stdin

use anyhow::Result;
use rust_decimal::Decimal;
use shiftdesk_core::{
    command::DeskCommand,
    config::{PenaltyRule, PolicyCatalog, PolicyVersion},
    engine::DeskEngine,
    pricing::rate_for_days,
    store::DeskStore,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");

    let catalog = load_catalog(data_dir)?;

    if !ipc_mode {
        let policy = match flag_value(&args, "--policy") {
            Some(version) => catalog.get(version)?,
            None => catalog.current(),
        };
        println!("Shift Desk desk-runner");
        println!("  data_dir:  {data_dir}");
        let versions: Vec<&str> = catalog.versions().map(|p| p.version.as_str()).collect();
        println!("  versions:  {}", versions.join(", "));
        println!();
        print_rate_card(policy)?;
        return Ok(());
    }

    let store = DeskStore::open(db)?;
    store.migrate()?;
    let engine = DeskEngine::new(catalog, store);
    run_ipc_loop(&engine)
}

fn load_catalog(data_dir: &str) -> Result<PolicyCatalog> {
    let path = format!("{data_dir}/policies/policy_versions.json");
    if Path::new(&path).exists() {
        PolicyCatalog::load(data_dir)
    } else {
        log::warn!("{path} not found, using the built-in policy");
        Ok(PolicyCatalog::standard())
    }
}

fn run_ipc_loop(engine: &DeskEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<DeskCommand>(&buffer) {
            Ok(cmd) => match cmd.execute(engine) {
                Ok(reply) => serde_json::to_value(&reply)?,
                Err(e) => {
                    log::warn!("command failed: {e}");
                    serde_json::json!({ "error": e.to_string() })
                }
            },
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };

        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_rate_card(policy: &PolicyVersion) -> Result<()> {
    println!("=== RATE CARD (policy {}, {:?}) ===", policy.version, policy.interpolation);
    for days in 0..=15 {
        let (tier, rate) = rate_for_days(policy, days)?;
        let suffix = if days == 15 { "+" } else { "" };
        println!("  {days:>2}{suffix:<1} days  {:<13} ${rate}/h", tier.as_str());
    }

    for (label, schedule) in [
        ("PHARMACIST", &policy.pharmacist_penalties),
        ("EMPLOYER", &policy.employer_penalties),
    ] {
        println!();
        println!("=== {label} CANCELLATIONS ===");
        for band in &schedule.bands {
            let terms = match &band.rule {
                PenaltyRule::Flat { penalty, compensation } => {
                    format!("penalty ${penalty}, counterparty ${compensation}")
                }
                PenaltyRule::ShareOfPay { rate, flat_fee, compensation_share } => {
                    let mut terms = format!("{}% of pay", (*rate * Decimal::ONE_HUNDRED).normalize());
                    if *flat_fee > Decimal::ZERO {
                        terms.push_str(&format!(" + ${flat_fee}"));
                    }
                    format!(
                        "{terms}, counterparty gets {}% of the pay share",
                        (*compensation_share * Decimal::ONE_HUNDRED).normalize()
                    )
                }
            };
            println!("  >= {:>3}h  {terms}", band.min_notice_hours);
        }
    }

    let r = &policy.reputation;
    println!();
    println!("=== REPUTATION BANDS ===");
    println!(
        "  excellent < {}  good < {}  fair < {}  poor <= {}  review above",
        r.excellent_below, r.good_below, r.fair_below, r.poor_up_to
    );
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
