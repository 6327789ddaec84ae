use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use log::{error, warn};
use rezervari_server::cli;
use rezervari_server::cli_error::CliError;
use std::path::PathBuf;

fn main() {
    let args = CliArgs::parse();
    let dotenv_result = dotenv();

    let env = env_logger::Env::new().filter_or(
        "RUST_LOG",
        match args.global_opts.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    );
    env_logger::Builder::from_env(env).init();
    if let Err(e) = dotenv_result {
        warn!("Could not read .env file: {}", e);
    }

    if let Err(e) = run_command(args.command) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn run_command(command: Command) -> Result<(), CliError> {
    match command {
        Command::Serve { skip_migration_check } => {
            if !skip_migration_check {
                cli::database_migration::check_migration_state()?;
            }
            rezervari_server::web::serve()
        }
        Command::MigrateDatabase => cli::database_migration::run_migrations(),
        Command::LoadLocations { path } => cli::file_io::load_locations_from_file(&path),
        Command::ExportLocations { path } => cli::file_io::export_locations_to_file(&path),
        Command::Member(member_command) => match member_command {
            MemberCommand::List => cli::manage_members::print_member_list(),
            MemberCommand::Create { role } => cli::manage_members::create_member(role.as_deref()),
            MemberCommand::SetPassword { email } => {
                cli::manage_members::set_member_password(&email)
            }
        },
    }
}

/// Table reservations for a sports club: web application and administration tools
#[derive(Debug, Parser)]
#[clap(name = "rezervari", version)]
pub struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the web application
    Serve {
        /// Start even if database migrations are pending
        #[clap(long)]
        skip_migration_check: bool,
    },
    /// Apply all pending database schema migrations
    MigrateDatabase,
    /// Create or update locations and their tables from a JSON file
    LoadLocations {
        /// The path of the JSON file to read from
        path: PathBuf,
    },
    /// Export all locations and their tables to a JSON file
    ExportLocations {
        /// The path of the JSON file to write to
        path: PathBuf,
    },
    /// Manage member accounts
    #[clap(subcommand)]
    Member(MemberCommand),
}

#[derive(Debug, Subcommand)]
enum MemberCommand {
    /// List all members
    List,
    /// Interactively create a new member
    Create {
        /// Role of the new member (member, coach or founder). Queried if not given.
        #[clap(long)]
        role: Option<String>,
    },
    /// Interactively set a new password for a member
    SetPassword {
        /// Email address of the member
        email: String,
    },
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Verbosity level (can be specified multiple times)
    #[clap(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,
}
