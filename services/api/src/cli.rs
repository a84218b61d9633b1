use crate::server;
use clap::{Args, Parser, Subcommand};
use lead_desk::error::AppError;
use lead_desk::staff::{PasswordHash, PasswordHashError, PasswordHasher};

#[derive(Parser, Debug)]
#[command(
    name = "Lead Desk",
    about = "Run the lead intake and processing service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print a stored-format hash for a password, e.g. to pre-provision accounts
    HashPassword(HashPasswordArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct HashPasswordArgs {
    /// Plaintext password to hash
    pub(crate) password: String,
    /// Argon2 memory cost in KiB; defaults to the service default
    #[arg(long)]
    pub(crate) memory_kib: Option<u32>,
    /// Argon2 pass count; defaults to the service default
    #[arg(long)]
    pub(crate) passes: Option<u32>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::HashPassword(args) => {
            println!("{}", hash_password(&args)?.as_str());
            Ok(())
        }
    }
}

fn hash_password(args: &HashPasswordArgs) -> Result<PasswordHash, PasswordHashError> {
    let defaults = PasswordHasher::default();
    let hasher = PasswordHasher::new(
        args.memory_kib.unwrap_or(defaults.memory_kib()),
        args.passes.unwrap_or(defaults.passes()),
    );
    hasher.hash(&args.password)
}
