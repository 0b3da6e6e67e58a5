//! # Convert and Upload Example
//!
//! Converts two synthetic replay dumps and uploads them to in-process stand-ins
//! for the stats service.
//!
//! ## Usage
//!
//! ```sh
//! cargo run --example convert_and_upload --features "full"
//! ```

use smashstats::fs::ensure_games_directory;
use smashstats::mock::MockBehavior;
use smashstats::prelude::*;
use tokio::fs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Replays
    let base = std::env::temp_dir().join("smashstats_demo");
    let _ = fs::remove_dir_all(&base).await;
    let source = base.join("Slippi");
    fs::create_dir_all(&source).await?;
    for (name, fixture) in [
        ("Game_20230620T202154.slp", ReplayFixture::two_player(["ABC#123", "XYZ#987"])),
        (
            "Game_20230620T203012.slp",
            ReplayFixture::two_player(["ABC#123", "XYZ#987"]).winner(1),
        ),
    ] {
        fs::write(source.join(name), fixture.to_json()?).await?;
    }
    let games = ensure_games_directory(&base).await?;

    // Don't use these in production! They stand in for the real service.
    let api = MockApi::new();
    let server_url = api.serve().await?;
    let upload_server = AcceptAllServer::start(MockBehavior::default()).await?;
    let client =
        SmashStatsClient::new(ClientConfig::new(server_url).with_socket_url(upload_server.url()));

    let mut context =
        SyncContext::open(ReplayDumpParser, FileSystemStorage::new(games), &source).await;

    let summary = context.scan().await?;
    println!("Found {} replays, {} new", summary.slp_count, summary.new_slp_count);

    let mut restart = true;
    while !context.process_next(restart).await?.is_finished() {
        restart = false;
    }

    let Some((credential, count)) = context.prepare_upload(&client).await? else {
        println!("Nothing to upload");
        return Ok(());
    };
    let id = credential.id.clone();

    let mut session = UploadSession::connect(
        &client.config().socket_url,
        credential,
        SessionConfig::default(),
    )
    .await?;
    println!("Uploading {count} games...");

    let mut restart = true;
    while !context.upload_next(&mut session, restart).await?.is_finished() {
        restart = false;
    }
    session.close().await;
    context.flush().await?;
    println!("Server received {} games", upload_server.uploads().len());

    // The stand-in only reports uploads it has been told about.
    api.mark_uploaded(id.as_str());
    if let Some(link) = client.player_link(&id).await? {
        println!("Player page: {link}");
    }

    Ok(())
}
