use anyhow::{Context, Result};
use bestkept::config::{DEFAULT_HIST_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD};
use bestkept::history::{self, HistoryAction, HistoryRecord};
use bestkept::{actions, scan, Group, ScanConfig, ScanOutcome};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bestkept", version, about = "Find near-duplicate images and review each group")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory to scan
    #[arg(short, long, value_name = "DIR")]
    path: PathBuf,

    /// Maximum Hamming distance between fingerprints (0..=10)
    #[arg(short, long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: u32,

    /// Minimum histogram correlation (0.0..=1.0)
    #[arg(long, default_value_t = DEFAULT_HIST_THRESHOLD)]
    hist_threshold: f64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find and list duplicate groups
    Scan {
        #[command(flatten)]
        args: ScanArgs,
        /// Print groups as JSON
        #[arg(long)]
        json: bool,
    },

    /// Step through duplicate groups and resolve each one interactively
    Review {
        #[command(flatten)]
        args: ScanArgs,
        /// Directory to move backed-up duplicates into (default: `<dir>/backup`)
        #[arg(long, value_name = "DIR")]
        backup_dir: Option<PathBuf>,
    },

    /// Move every duplicate (all but each group's first image) into backup
    Cull {
        #[command(flatten)]
        args: ScanArgs,
        /// Only show what would be moved
        #[arg(long)]
        dry_run: bool,
        /// Directory to move duplicates into (default: `<dir>/backup`)
        #[arg(long, value_name = "DIR")]
        backup_dir: Option<PathBuf>,
    },

    /// Permanently delete every duplicate (all but each group's first image)
    Delete {
        #[command(flatten)]
        args: ScanArgs,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Work with the action history
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List recorded actions
    List {
        /// Directory containing the photos
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
    },

    /// Restore moved files to their original locations
    Restore {
        /// Directory containing the photos
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Restore a specific record index (as shown by `history list`)
        #[arg(long, conflicts_with = "all")]
        record: Option<usize>,
        /// Restore all moved records
        #[arg(long, conflicts_with = "record")]
        all: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan { args, json } => cmd_scan(args, json),
        Commands::Review { args, backup_dir } => cmd_review(args, backup_dir),
        Commands::Cull {
            args,
            dry_run,
            backup_dir,
        } => cmd_cull(args, dry_run, backup_dir),
        Commands::Delete { args, yes } => cmd_delete(args, yes),
        Commands::History { command } => match command {
            HistoryCmd::List { path } => cmd_history_list(&path),
            HistoryCmd::Restore { path, record, all } => cmd_history_restore(&path, record, all),
        },
    }
}

fn run_scan(args: &ScanArgs) -> Result<ScanOutcome> {
    let config = ScanConfig {
        similarity_threshold: args.threshold,
        hist_threshold: args.hist_threshold,
        ..Default::default()
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Scanning {} for duplicates…", args.path.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let cancel = AtomicBool::new(false);
    let outcome = scan(&args.path, &config, &cancel);
    spinner.finish_and_clear();

    let outcome = outcome.with_context(|| format!("scan of {} failed", args.path.display()))?;
    for warning in &outcome.warnings {
        eprintln!("⚠️  {warning}");
    }
    Ok(outcome)
}

fn print_groups(groups: &[Group]) {
    println!("Found {} duplicate group(s):", groups.len());
    for (i, group) in groups.iter().enumerate() {
        println!(" Group {}:", i + 1);
        for member in group.members() {
            println!("   ▶ {}", member.display());
        }
    }
}

fn cmd_scan(args: ScanArgs, json: bool) -> Result<()> {
    let outcome = run_scan(&args)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.groups)?);
    } else if outcome.groups.is_empty() {
        println!("No duplicates found.");
    } else {
        print_groups(&outcome.groups);
    }
    Ok(())
}

fn cmd_review(args: ScanArgs, backup_dir: Option<PathBuf>) -> Result<()> {
    let outcome = run_scan(&args)?;
    if outcome.groups.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }

    let backup_dir = backup_dir.unwrap_or_else(|| args.path.join("backup"));
    let total = outcome.groups.len();

    for (i, group) in outcome.groups.iter().enumerate() {
        println!("\n✨ Group {}/{}:", i + 1, total);
        for (j, member) in group.members().iter().enumerate() {
            println!("   [{}] {}", j, member.display());
        }

        let choice = Select::new()
            .with_prompt("Action")
            .items(&[
                "Keep first & delete rest",
                "Delete selected",
                "Move rest to backup",
                "Skip",
                "Quit",
            ])
            .default(3)
            .interact()?;

        match choice {
            0 => {
                let deleted = actions::delete_rest(group)?;
                history::append(
                    &args.path,
                    &HistoryRecord::deleted(group.representative(), &deleted),
                )?;
                println!("   🗑️  Deleted {} file(s)", deleted.len());
            }
            1 => {
                let labels: Vec<String> = group
                    .members()
                    .iter()
                    .map(|m| m.display().to_string())
                    .collect();
                let selected = MultiSelect::new()
                    .with_prompt("Select images to delete")
                    .items(&labels)
                    .interact()?;
                if selected.is_empty() {
                    println!("   Nothing selected; skipping.");
                    continue;
                }
                let deleted = actions::delete_selected(group, &selected)?;
                history::append(
                    &args.path,
                    &HistoryRecord::deleted(group.representative(), &deleted),
                )?;
                println!("   🗑️  Deleted {} file(s)", deleted.len());
            }
            2 => {
                let moved = actions::move_rest_to_backup(group, &backup_dir)?;
                history::append(
                    &args.path,
                    &HistoryRecord::moved(group.representative(), &moved, &backup_dir),
                )?;
                println!(
                    "   📦 Moved {} file(s) to {}",
                    moved.len(),
                    backup_dir.display()
                );
            }
            3 => println!("   Skipped."),
            _ => break,
        }
    }

    println!(
        "\n✅ Review complete; history recorded in {}",
        history::history_path(&args.path).display()
    );
    Ok(())
}

fn cmd_cull(args: ScanArgs, dry_run: bool, backup_dir: Option<PathBuf>) -> Result<()> {
    let outcome = run_scan(&args)?;
    if outcome.groups.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }

    let backup_dir = backup_dir.unwrap_or_else(|| args.path.join("backup"));
    for (i, group) in outcome.groups.iter().enumerate() {
        println!("\n✨ Group {}:", i + 1);
        println!("   🏆 Keeping → {}", group.representative().display());
        if dry_run {
            for dup in &group.members()[1..] {
                println!(
                    "   📦 [dry-run] MOVE {} → {}",
                    dup.display(),
                    backup_dir.display()
                );
            }
            continue;
        }
        let moved = actions::move_rest_to_backup(group, &backup_dir)?;
        history::append(
            &args.path,
            &HistoryRecord::moved(group.representative(), &moved, &backup_dir),
        )?;
        for dup in &moved {
            println!("   📦 Moved {} → {}", dup.display(), backup_dir.display());
        }
    }

    if dry_run {
        println!("\n⚠️  Dry-run only; no files were changed.");
    } else {
        println!(
            "\n✅ Recorded history in {}",
            history::history_path(&args.path).display()
        );
    }
    Ok(())
}

fn cmd_delete(args: ScanArgs, yes: bool) -> Result<()> {
    let outcome = run_scan(&args)?;
    if outcome.groups.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }

    let doomed: usize = outcome.groups.iter().map(|g| g.len() - 1).sum();
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Permanently delete {doomed} duplicate file(s)?"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted; nothing deleted.");
            return Ok(());
        }
    }

    for (i, group) in outcome.groups.iter().enumerate() {
        println!("\n✨ Group {}:", i + 1);
        println!("   🏆 Keeping → {}", group.representative().display());
        let deleted = actions::delete_rest(group)?;
        history::append(
            &args.path,
            &HistoryRecord::deleted(group.representative(), &deleted),
        )?;
        for dup in &deleted {
            println!("   🗑️  Deleted {}", dup.display());
        }
    }

    println!(
        "\n✅ Recorded history in {}",
        history::history_path(&args.path).display()
    );
    Ok(())
}

fn cmd_history_list(path: &PathBuf) -> Result<()> {
    let records = history::load(path)?;
    if records.is_empty() {
        println!("No history recorded.");
        return Ok(());
    }

    println!("🗂️  Action history:");
    for (i, record) in records.iter().enumerate() {
        println!(
            "[{}] {}\n     kept: {}\n     removed: {:?}\n     action: {:?}\n",
            i, record.timestamp, record.kept, record.removed, record.action
        );
    }
    Ok(())
}

fn cmd_history_restore(path: &PathBuf, record: Option<usize>, all: bool) -> Result<()> {
    let records = history::load(path)?;
    let movable: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.action == HistoryAction::Moved)
        .map(|(i, _)| i)
        .collect();

    if movable.is_empty() {
        anyhow::bail!("no 'moved' history records to restore");
    }

    let restore_indices: Vec<usize> = if all {
        movable
    } else {
        let idx = record.unwrap_or(*movable.last().unwrap());
        if !movable.contains(&idx) {
            anyhow::bail!("record {idx} does not exist or is not a restorable move");
        }
        vec![idx]
    };

    for &i in &restore_indices {
        let record = &records[i];
        println!(
            "🔄 Restoring {} file(s) from record {}…",
            record.removed.len(),
            record.timestamp
        );
        let restored = history::restore_record(record)?;
        println!("🔄 Restored {} file(s)", restored);
    }

    let remaining: Vec<HistoryRecord> = records
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !restore_indices.contains(i))
        .map(|(_, r)| r)
        .collect();
    history::rewrite(path, &remaining)?;
    println!(
        "🧹 Updated history, removed {} record(s)",
        restore_indices.len()
    );
    Ok(())
}
