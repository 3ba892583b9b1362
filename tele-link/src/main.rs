//! tele-link - Link Telegram groups to a team
//!
//! Each subcommand is one step of the link flow and prints a JSON response.
//! State between steps lives in a session file named by `--session`.

use clap::{Parser, Subcommand};
use libtelecast::logging::LoggingConfig;
use libtelecast::service::TelecastService;
use libtelecast::{Account, AccountStatus, ActionResponse, Config, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "tele-link")]
#[command(version)]
#[command(about = "Link Telegram groups to a team")]
#[command(long_about = r#"Link Telegram groups to a team through a bot token.

WORKFLOW:
    1. Add your bot to the groups you want to link and post one message in each
    2. tele-link token <BOT_TOKEN>       verify the token and keep it in the session
    3. tele-link profiles                list groups the bot has seen
    4. tele-link save --team 1 --id <ID> link the selected groups

EXAMPLES:
    # Start over, forgetting any previous token
    tele-link start

    # Check a token (also read from TELECAST_BOT_TOKEN)
    tele-link token 123456:ABC-DEF

    # Pick group ids with jq
    tele-link profiles | jq -r '.result[].id'

    # Link two groups to team 7
    tele-link save --team 7 --id -1001234 --id -1005678

    # Linked groups of team 7
    tele-link accounts --team 7

EXIT CODES:
    0 - Success
    1 - Error (no group found, quota reached, provider or database failure)
    2 - Token rejected by Telegram
    3 - Invalid input
"#)]
struct Cli {
    /// Session key shared by the steps of one link flow
    #[arg(short, long, default_value = "default", env = "TELECAST_SESSION", global = true)]
    session: String,

    /// Configuration file (defaults to ~/.config/telecast/config.toml)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new link flow
    Start,

    /// Verify a bot token and keep it in the session
    Token {
        #[arg(env = "TELECAST_BOT_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// List the groups the session's bot has received messages from
    Profiles,

    /// Link the selected groups to a team
    Save {
        /// Team that owns the linked accounts
        #[arg(short, long)]
        team: i64,

        /// Group id to link (repeatable)
        #[arg(long = "id", value_name = "ID", allow_hyphen_values = true)]
        ids: Vec<String>,
    },

    /// Show the groups linked to a team
    Accounts {
        #[arg(short, long)]
        team: i64,
    },
}

/// Account row as printed by `accounts`; the bot token stays out of the output
#[derive(Debug, Serialize)]
struct AccountSummary {
    id: i64,
    ids: String,
    pid: String,
    name: String,
    username: String,
    avatar: String,
    url: String,
    active: bool,
    created: i64,
    changed: i64,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            ids: account.ids.clone(),
            pid: account.pid.clone(),
            name: account.name.clone(),
            username: account.username.clone(),
            avatar: account.avatar.clone(),
            url: account.url.clone(),
            active: account.status == AccountStatus::Active,
            created: account.created,
            changed: account.changed,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    match run(cli).await {
        Ok(response) => print_response(&response),
        Err(e) => {
            print_response(&ActionResponse::from_error(&e));
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load_or_default(),
    }
}

async fn run(cli: Cli) -> Result<ActionResponse> {
    let config = load_config(cli.config.as_ref())?;
    let service = TelecastService::from_config(config).await?;
    let linking = service.linking();
    let mut session = linking.sessions().load(&cli.session)?;

    debug!("Running {:?} in session {}", cli.command, cli.session);

    match cli.command {
        Command::Start => {
            linking.start(&mut session)?;
            Ok(ActionResponse::success("Success"))
        }
        Command::Token { token } => {
            linking.token(&mut session, &token).await?;
            Ok(ActionResponse::success("Success"))
        }
        Command::Profiles => {
            let profiles = linking.list_profiles(&mut session).await?;
            Ok(ActionResponse::success("Success").with_result(&profiles))
        }
        Command::Save { team, ids } => {
            let linked = linking.save(&mut session, &ids, team).await?;
            Ok(ActionResponse::success("Success")
                .with_result(&serde_json::json!({ "linked": linked })))
        }
        Command::Accounts { team } => {
            let accounts = linking.list_accounts(team).await?;
            let summaries: Vec<AccountSummary> = accounts.iter().map(AccountSummary::from).collect();
            Ok(ActionResponse::success("Success").with_result(&summaries))
        }
    }
}

fn print_response(response: &ActionResponse) {
    match serde_json::to_string(response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to encode response: {}", e),
    }
}
