use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use smashstats_client::{ClientConfig, SessionConfig, SmashStatsClient, UploadSession};
use smashstats_core::prelude::*;
use smashstats_fs::{
    FileSystemStorage, ReplayDumpParser, resolve_games_directory, resolve_replay_directory,
};
use smashstats_queue::{Progress, Settings, SyncContext};
use std::path::PathBuf;
use tracing::{info, warn};

type App = SyncContext<ReplayDumpParser, FileSystemStorage>;

#[derive(Parser)]
#[command(name = "smashstats")]
#[command(about = "Convert replays into match stats and sync them to SmashStats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server URL
    #[arg(short, long, env = "SMASHSTATS_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Upload socket URL (defaults to the server URL with a ws scheme)
    #[arg(long, env = "SMASHSTATS_SOCKET_URL")]
    socket_url: Option<String>,

    /// Public site URL used for player links
    #[arg(long, env = "SMASHSTATS_FRONTEND_URL")]
    frontend_url: Option<String>,

    /// Folder holding replay files
    #[arg(long, env = "SMASHSTATS_SLP_DIR")]
    slp_dir: Option<PathBuf>,

    /// Folder converted games are written to
    #[arg(long, env = "SMASHSTATS_GAME_DIR")]
    game_dir: Option<PathBuf>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Count replays and how many are not converted yet
    Scan,
    /// Convert every new replay
    Process,
    /// List participant codes by number of games
    Codes,
    /// Select the code to upload games for
    Select { code: String },
    /// Upload games for the selected code
    Upload,
    /// Check the server and report the last error
    Status,
    /// Print the public page of the selected code
    Link,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let settings_path = cli
        .settings
        .clone()
        .or_else(Settings::default_path)
        .context("No config directory for the settings file")?;
    let mut settings = Settings::load(&settings_path).await;

    let mut config = ClientConfig::new(&cli.url);
    if let Some(socket_url) = &cli.socket_url {
        config = config.with_socket_url(socket_url);
    }
    if let Some(frontend_url) = &cli.frontend_url {
        config = config.with_frontend_url(frontend_url);
    }
    let client = SmashStatsClient::new(config);

    let mut context = open_context(&cli, &mut settings).await;
    if let Some(code) = settings.selected_code() {
        context.select_code(code);
    }

    match cli.command {
        Commands::Scan => {
            require_source(&settings)?;
            let summary = context.scan().await?;
            println!(
                "📂 {} replays, {} not converted yet",
                summary.slp_count, summary.new_slp_count
            );
        }
        Commands::Process => {
            require_source(&settings)?;
            let summary = context.scan().await?;
            println!("🔄 Converting {} new replays...", summary.new_slp_count);
            let total = process_all(&mut context).await;
            context.flush().await?;
            println!("✅ Converted {total} replays.");
        }
        Commands::Codes => {
            let codes = context.codes_by_frequency().await?;
            if codes.is_empty() {
                println!("No converted games yet. Run `smashstats process` first.");
            }
            for (code, games) in codes {
                println!("{code:>12}  {games} games");
            }
        }
        Commands::Select { code } => {
            if resolve_code(&code).is_none() {
                bail!("'{code}' is not a valid player code");
            }
            context.select_code(code.as_str());
            let games = context.games_for_code(&code).await?;
            settings.selected_player_code = code.clone();
            settings.save(&settings_path).await?;
            println!("🎮 Selected {code} ({games} games)");
        }
        Commands::Upload => {
            upload(&mut context, &client).await?;
            settings.code_keys = context.credentials().keys().clone();
            settings.save(&settings_path).await?;
        }
        Commands::Status => {
            if context.connection_status(client.ping().await) {
                println!("🌐 Server at {} is reachable", client.config().server_url);
            }
            if let Some(selected) = context.selected_code().await? {
                println!("🎮 {} ({} games)", selected.code, selected.games);
            }
        }
        Commands::Link => {
            let selected = context
                .selected_code()
                .await?
                .context("No player code selected")?;
            let credential = context
                .credentials()
                .get(&selected.code)
                .context("No upload key for this code yet. Run `smashstats upload` first.")?;
            match client.player_link(&credential.id).await? {
                Some(link) => println!("🔗 {link}"),
                None => println!("No games uploaded for {} yet.", selected.code),
            }
        }
    }

    if let Some(error) = context.errors().take() {
        eprintln!("⚠️  {error}");
    }

    Ok(())
}

/// Resolves both directories, remembers them in the settings and loads the
/// index.
async fn open_context(cli: &Cli, settings: &mut Settings) -> App {
    let configured_source = cli.slp_dir.as_deref().or(settings.slp_directory.as_deref());
    settings.slp_directory = resolve_replay_directory(configured_source);

    let configured_games = cli.game_dir.clone().or_else(|| settings.game_directory.clone());
    let games = match resolve_games_directory(configured_games.as_deref()).await {
        Ok(games) => {
            settings.game_directory = Some(games.clone());
            games
        }
        Err(e) => {
            warn!("Games directory unavailable: {e}");
            configured_games.unwrap_or_default()
        }
    };
    info!(games = %games.display(), "Using games directory");

    SyncContext::open(
        ReplayDumpParser,
        FileSystemStorage::new(games),
        settings.slp_directory.clone().unwrap_or_default(),
    )
    .await
}

fn require_source(settings: &Settings) -> anyhow::Result<()> {
    if settings.slp_directory.is_none() {
        bail!("No replay folder found. Pass --slp-dir or set SMASHSTATS_SLP_DIR.");
    }
    Ok(())
}

async fn process_all(context: &mut App) -> usize {
    let mut restart = true;
    let mut total = 0;
    loop {
        match context.process_next(restart).await {
            Ok(Progress::Finished { .. }) => break,
            Ok(progress) => {
                total = progress.total().unwrap_or(total);
                info!(
                    done = total,
                    avg_time_taken = progress.avg_time_taken(),
                    "Converted replay"
                );
            }
            Err(e) => warn!("Replay not saved: {e}"),
        }
        restart = false;
    }
    total
}

async fn upload(context: &mut App, client: &SmashStatsClient) -> anyhow::Result<()> {
    let Some((credential, count)) = context.prepare_upload(client).await? else {
        println!("✅ Nothing to upload.");
        return Ok(());
    };

    let socket_url = client.config().socket_url.clone();
    let mut session = UploadSession::connect(&socket_url, credential, SessionConfig::default())
        .await
        .context("Unable to verify upload key with server")?;
    info!(count, "Upload started");
    println!("🚀 Uploading {count} games...");

    let mut restart = true;
    let mut uploaded = 0;
    loop {
        match context.upload_next(&mut session, restart).await {
            Ok(Progress::Finished { .. }) => break,
            Ok(progress) => uploaded = progress.total().unwrap_or(uploaded),
            Err(e) => warn!("Upload dropped: {e}"),
        }
        restart = false;
        if !session.is_connected() {
            warn!("Upload connection lost");
            break;
        }
    }
    session.close().await;
    context.flush().await?;

    println!("✅ Uploaded {uploaded} of {count} games.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_select() {
        let cli = Cli::try_parse_from(["smashstats", "--slp-dir", "/replays", "select", "ABC#123"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Select { ref code } if code == "ABC#123"));
        assert_eq!(cli.slp_dir.as_deref(), Some(std::path::Path::new("/replays")));
    }
}
