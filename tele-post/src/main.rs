//! tele-post - Publish to linked Telegram groups

use clap::{Parser, Subcommand};
use libtelecast::logging::LoggingConfig;
use libtelecast::service::publishing::PostRequest;
use libtelecast::service::TelecastService;
use libtelecast::{ActionResponse, Config, PostType, Result, TelecastError};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tele-post")]
#[command(version)]
#[command(about = "Publish to linked Telegram groups")]
#[command(long_about = r#"Publish to a Telegram group linked with tele-link.

EXAMPLES:
    # Text post; {a|b} groups pick one alternative at random
    tele-post send --team 7 --account 3 --type text --caption "{Hello|Hi} everyone"

    # Caption from stdin
    echo "Release notes" | tele-post send --team 7 --account 3 --type text --caption -

    # Photo with a caption sent as a follow-up message
    tele-post send --team 7 --account 3 --type photo --media ./banner.png --caption "New banner"

    # Link post
    tele-post send --team 7 --account 3 --type link --caption "Read more" --link https://example.com

    # Recorded attempts
    tele-post history --team 7 --account 3 --limit 5

EXIT CODES:
    0 - Posted (or scheduled)
    1 - Telegram rejected the post or could not be reached
        (a rejected token also deactivates the account)
    3 - Invalid input (unknown account, missing media)
"#)]
struct Cli {
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
    /// Publish a post through a linked account
    Send {
        /// Team that owns the account
        #[arg(short, long)]
        team: i64,

        /// Account row id
        #[arg(short, long)]
        account: i64,

        /// Post type
        #[arg(long = "type", default_value = "text")]
        #[arg(value_parser = ["photo", "video", "link", "text"])]
        post_type: String,

        /// Caption or message text ("-" reads stdin)
        #[arg(long, default_value = "")]
        caption: String,

        /// Media file or URL (repeatable; photo and video posts use the first)
        #[arg(short, long)]
        media: Vec<String>,

        /// Link appended to the caption of a link post
        #[arg(short, long)]
        link: Option<String>,

        /// Scheduling options as a JSON object
        #[arg(long, value_name = "JSON")]
        advance: Option<String>,

        /// Accept the post for later delivery without sending it now
        #[arg(long)]
        schedule: bool,
    },

    /// Show recorded publish attempts of an account
    History {
        #[arg(short, long)]
        team: i64,

        #[arg(short, long)]
        account: i64,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    match run(cli).await {
        Ok(response) => {
            print_response(&response);
            if !response.is_success() {
                std::process::exit(1);
            }
        }
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
    let publishing = service.publishing();

    match cli.command {
        Command::Send {
            team,
            account,
            post_type,
            caption,
            media,
            link,
            advance,
            schedule,
        } => {
            let post_type: PostType = post_type.parse()?;
            let account = publishing.account(team, account).await?;

            let mut request = PostRequest::new(post_type, account, read_caption(caption)?);
            request.medias = media;
            request.link = link;
            request.advance = parse_advance(advance.as_deref())?;
            request.is_schedule = schedule;

            publishing.post(request).await
        }
        Command::History {
            team,
            account,
            limit,
        } => {
            let account = publishing.account(team, account).await?;
            let records = publishing.history(account.id, limit).await?;
            Ok(ActionResponse::success("Success").with_result(&records))
        }
    }
}

fn read_caption(caption: String) -> Result<String> {
    if caption != "-" {
        return Ok(caption);
    }

    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer).map_err(|e| {
        TelecastError::Validation(format!("Failed to read caption from stdin: {}", e))
    })?;
    Ok(buffer.trim_end().to_string())
}

fn parse_advance(advance: Option<&str>) -> Result<serde_json::Value> {
    match advance {
        None => Ok(serde_json::Value::Null),
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            TelecastError::Validation(format!("Invalid --advance JSON: {}", e))
        }),
    }
}

fn print_response(response: &ActionResponse) {
    match serde_json::to_string(response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to encode response: {}", e),
    }
}
