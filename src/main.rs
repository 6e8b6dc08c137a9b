//! # fo - Field Operations CLI
//!
//! Dispatch service jobs to technicians and walk them through
//! To Do → In Progress → Review → Done from the terminal.
//!
//! ## Key Features
//!
//! - **Owner-gated workflow**: only the assigned technician starts and submits a job
//! - **Geofenced submission**: field staff must be within the configured radius of the site
//! - **Admin review**: approve, send back, or force-finish any open job
//! - **Reschedule requests**: technicians ask for a new date, admins grant or decline
//! - **Task board**: four-column TUI over the jobs you can see
//!
//! ## Quick Start
//!
//! ```bash
//! # The first employee can be added without --as
//! fo staff add boss "Meera" --department Operations --admin
//! fo --as boss staff add tech-1 "Ravi" --department Service
//!
//! # Dispatch a job with a site location
//! fo --as boss dispatch "Install ventilator" --to tech-1 --due friday --lat 12.9716 --lng 77.5946
//!
//! # Work it as the technician
//! export FIELDOPS_USER=tech-1
//! fo start 1
//! fo submit 1 --lat 12.9720 --lng 77.5950
//!
//! # Review it
//! fo --as boss approve 1
//! ```
//!
//! Data is stored in `~/.fieldops/fieldops.json`; settings in `~/.fieldops/config.toml`.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fieldops::cli::Cli;
use fieldops::cmd::*;
use fieldops::error::Result;
use fieldops::workflow::Command;

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return Ok(());
    }

    let mut session = Session::open(&cli)?;

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Dispatch { title, assigned_to, due, priority, desc, lat, lng, checklist } =>
            cmd_dispatch(&mut session, title, assigned_to, due, priority, desc, lat, lng, checklist),

        Commands::List { status, mine, sort, limit } => cmd_list(&session, status, mine, sort, limit),

        Commands::View { id } => cmd_view(&mut session, id),

        Commands::Start { id } => cmd_transition(&mut session, id, Command::Start, None),

        Commands::Submit { id, lat, lng } => cmd_submit(&mut session, id, lat, lng),

        Commands::Approve { id } => cmd_transition(&mut session, id, Command::Approve, None),

        Commands::Reject { id } => cmd_transition(&mut session, id, Command::Reject, None),

        Commands::Finish { id, yes } => cmd_finish(&mut session, id, yes),

        Commands::RequestMove { id, reason } =>
            cmd_transition(&mut session, id, Command::RequestMove { reason }, None),

        Commands::ApproveMove { id, due } => cmd_approve_move(&mut session, id, due),

        Commands::RejectMove { id } => cmd_transition(&mut session, id, Command::RejectMove, None),

        Commands::Check { action } => cmd_check(&mut session, action),

        Commands::Archive { id } => cmd_archive(&mut session, id),

        Commands::Staff { action } => cmd_staff(&mut session, action),

        Commands::Inbox { limit } => cmd_inbox(&session, limit),

        Commands::Board { lat, lng, track } => cmd_board(session, lat, lng, track),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
