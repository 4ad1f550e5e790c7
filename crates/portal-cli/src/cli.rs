use clap::{ArgGroup, Args, Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Portal database CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run database migrations
    Migrate,
    /// Grant table and function privileges to the application role
    GrantRole(GrantRoleArgs),
    /// Insert fixture users, layers and cards
    Seed,
    /// Check database connectivity
    Health,
    /// List cards visible to a user (or to an admin)
    Cards(CardsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GrantRoleArgs {
    /// Role name; defaults to PORTAL_DB_APP_ROLE
    pub role: Option<String>,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("scope").required(true).args(["user", "admin"])))]
pub struct CardsArgs {
    /// Acting user id
    #[arg(long)]
    pub user: Option<String>,
    /// Bypass row filtering
    #[arg(long)]
    pub admin: bool,
    /// Restrict to these layers (user scope only)
    #[arg(long = "layer")]
    pub layers: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub enum RunMode {
    Migrate,
    GrantRole(GrantRoleArgs),
    Seed,
    Health,
    Cards(CardsArgs),
}

pub fn parse_args() -> RunMode {
    Cli::parse().into_run_mode()
}

impl Cli {
    fn into_run_mode(self) -> RunMode {
        match self.command {
            Command::Migrate => RunMode::Migrate,
            Command::GrantRole(args) => RunMode::GrantRole(args),
            Command::Seed => RunMode::Seed,
            Command::Health => RunMode::Health,
            Command::Cards(args) => RunMode::Cards(args),
        }
    }
}
