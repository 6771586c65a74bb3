pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::import_legacy::ImportLegacyArgs;
use commands::movement::{CreateArgs, DecideArgs};

#[derive(Debug, Parser)]
#[command(
    name = "staffmove",
    about = "Staff movement requests and their approval chains",
    long_about = "Create, submit and decide staff movement requests, and operate the backing database.",
    after_help = "Examples:\n  staffmove doctor --json\n  staffmove pending --validator p-3\n  staffmove decide mv-1 --validator p-3 --decision approve"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo staff directory and movements")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Validate config, DB connectivity, schema and HR validator presence")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create a movement request as a draft, or submit it with --submit")]
    Create(CreateArgs),
    #[command(about = "Submit a draft and build its validation chain")]
    Submit {
        movement_id: String,
        #[arg(long, help = "Personnel id of the requester")]
        actor: String,
    },
    #[command(about = "Approve or reject the step currently assigned to a validator")]
    Decide(DecideArgs),
    #[command(about = "Withdraw a pending movement")]
    Cancel {
        movement_id: String,
        #[arg(long, help = "Personnel id of the requester")]
        actor: String,
    },
    #[command(about = "Show one movement with its validation chain")]
    Show { movement_id: String },
    #[command(about = "List movements created by a requester, newest first")]
    Mine {
        #[arg(long)]
        requester: String,
    },
    #[command(about = "List movements waiting on a validator, oldest first")]
    Pending {
        #[arg(long)]
        validator: String,
    },
    #[command(about = "Counts by status and type plus what awaits a decision")]
    Stats {
        #[arg(long)]
        personnel: String,
    },
    #[command(about = "List notifications for a recipient")]
    Notifications {
        #[arg(long)]
        recipient: String,
        #[arg(long, help = "Only unread notifications")]
        unread: bool,
    },
    #[command(about = "Mark one notification as read")]
    MarkRead {
        notification_id: String,
        #[arg(long)]
        recipient: String,
    },
    #[command(about = "Import staff and movements exported by the previous tooling")]
    ImportLegacy(ImportLegacyArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Create(args) => commands::movement::create(args),
        Command::Submit { movement_id, actor } => commands::movement::submit(movement_id, actor),
        Command::Decide(args) => commands::movement::decide(args),
        Command::Cancel { movement_id, actor } => commands::movement::cancel(movement_id, actor),
        Command::Show { movement_id } => commands::movement::show(movement_id),
        Command::Mine { requester } => commands::movement::mine(requester),
        Command::Pending { validator } => commands::movement::pending(validator),
        Command::Stats { personnel } => commands::movement::stats(personnel),
        Command::Notifications { recipient, unread } => {
            commands::notifications::list(recipient, unread)
        }
        Command::MarkRead { notification_id, recipient } => {
            commands::notifications::mark_read(notification_id, recipient)
        }
        Command::ImportLegacy(args) => commands::import_legacy::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
