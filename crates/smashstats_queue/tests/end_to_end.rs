use anyhow::Result;
use bytes::Bytes;
use smashstats_core::prelude::*;
use smashstats_fs::{FileSystemStorage, ensure_games_directory};
use smashstats_mock::{InMemoryParser, ReplayFixture};
use smashstats_queue::{
    CONNECTION_ERROR, GAMES_DIRECTORY_ERROR, Progress, QueueError, SyncContext,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const HOME: &str = "ABC#123";
const AWAY: &str = "XYZ#987";

/// Acks every upload, echoing its hash.
struct RecordingSink {
    authenticated: bool,
    uploads: Vec<UploadGame>,
}

impl RecordingSink {
    fn new(authenticated: bool) -> Self {
        Self {
            authenticated,
            uploads: Vec::new(),
        }
    }
}

impl UploadSink for RecordingSink {
    type Error = std::io::Error;

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn upload(&mut self, game: UploadGame) -> Result<UploadAck, std::io::Error> {
        let ack = UploadAck {
            hash: game.hash.clone(),
            file_name: game.file_name.clone(),
            success: true,
        };
        self.uploads.push(game);
        Ok(ack)
    }
}

#[derive(Clone, Default)]
struct CountingIssuer {
    calls: Arc<AtomicUsize>,
}

impl CredentialIssuer for CountingIssuer {
    type Error = std::io::Error;

    async fn issue_credential(&self, code: &str) -> Result<UploadCredential, std::io::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(UploadCredential::new(
            format!("{code}-0123456789abcdef0123456789ab"),
            "abcd1234",
        ))
    }
}

struct Workspace {
    _tmp: tempfile::TempDir,
    source: PathBuf,
    storage: FileSystemStorage,
    parser: InMemoryParser,
}

async fn workspace() -> Result<Workspace> {
    let tmp = tempfile::tempdir()?;
    let source = tmp.path().join("Slippi");
    std::fs::create_dir_all(&source)?;
    let games = ensure_games_directory(tmp.path()).await?;
    Ok(Workspace {
        source,
        storage: FileSystemStorage::new(games),
        parser: InMemoryParser::new(),
        _tmp: tmp,
    })
}

fn add_replay(workspace: &Workspace, file_name: &str, fixture: ReplayFixture) -> Result<()> {
    std::fs::write(workspace.source.join(file_name), b"")?;
    workspace.parser.insert(file_name, fixture.build());
    Ok(())
}

async fn read_record(storage: &FileSystemStorage, stem: &str) -> Result<serde_json::Value> {
    Ok(serde_json::from_slice(&storage.read_record(stem).await?)?)
}

async fn process_all(
    context: &mut SyncContext<InMemoryParser, FileSystemStorage>,
) -> Result<usize> {
    let mut restart = true;
    let mut total = 0;
    while let Some(count) = context.process_next(restart).await?.total() {
        restart = false;
        total = count;
    }
    Ok(total)
}

#[tokio::test]
async fn scan_process_and_upload() -> Result<()> {
    let ws = workspace().await?;
    add_replay(&ws, "Game_20230620T202154.slp", ReplayFixture::two_player([HOME, AWAY]))?;
    add_replay(
        &ws,
        "Game_20230620T203000.slp",
        ReplayFixture::two_player([HOME, AWAY]).duration_seconds(10),
    )?;
    std::fs::write(ws.source.join("notes.txt"), b"not a replay")?;

    let mut context = SyncContext::open(ws.parser.clone(), ws.storage.clone(), &ws.source).await;
    assert!(context.errors().take().is_none());

    let summary = context.scan().await?;
    assert_eq!((summary.slp_count, summary.new_slp_count), (2, 2));

    let first = context.process_next(true).await?;
    assert_eq!(serde_json::to_value(&first)?["totalProcessed"], 1);
    assert_eq!(context.process_next(false).await?.total(), Some(2));
    assert!(context.process_next(false).await?.is_finished());

    let long = read_record(&ws.storage, "Game_20230620T202154").await?;
    let short = read_record(&ws.storage, "Game_20230620T203000").await?;
    assert_eq!(long["isValid"], true);
    assert_eq!(short["isValid"], false);
    assert_eq!(short["durationSeconds"], 10);

    let rescan = context.scan().await?;
    assert_eq!((rescan.slp_count, rescan.new_slp_count), (2, 0));

    let selected = context.selected_code().await?.expect("a code");
    assert_eq!((selected.code.as_str(), selected.games), (HOME, 2));

    // Short games are uploaded too; validity does not gate eligibility.
    let issuer = CountingIssuer::default();
    let (credential, count) = context.prepare_upload(&issuer).await?.expect("eligible games");
    assert_eq!(count, 2);
    assert!(credential.is_complete());

    let mut sink = RecordingSink::new(true);
    let mut restart = true;
    let mut last = Progress::finished();
    loop {
        let progress = context.upload_next(&mut sink, restart).await?;
        restart = false;
        if progress.is_finished() {
            break;
        }
        last = progress;
    }
    assert_eq!(serde_json::to_value(&last)?["totalUploaded"], 2);
    assert_eq!(sink.uploads.len(), 2);
    assert!(sink.uploads.iter().all(|game| game.game_obj.verify_hash()));

    assert!(context.index().eligible_for_upload(HOME).is_empty());
    assert_eq!(context.index().eligible_for_upload(AWAY).len(), 2);

    // Upload status and credentials survive a restart.
    let mut reopened = SyncContext::open(ws.parser.clone(), ws.storage.clone(), &ws.source).await;
    reopened.select_code(HOME);
    assert_eq!(reopened.load_eligible().await?, 0);
    assert!(reopened.prepare_upload(&issuer).await?.is_none());
    assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    assert!(reopened.credentials().get(HOME).is_some());
    Ok(())
}

#[tokio::test]
async fn corrupt_replays_are_stored_empty_and_not_retried() -> Result<()> {
    let ws = workspace().await?;
    std::fs::write(ws.source.join("Broken.slp"), b"")?;
    ws.parser.insert_corrupt("Broken.slp");
    add_replay(
        &ws,
        "NoStart.slp",
        ReplayFixture::two_player([HOME, AWAY]).without_start_time(),
    )?;

    let mut context = SyncContext::open(ws.parser.clone(), ws.storage.clone(), &ws.source).await;
    context.scan().await?;
    assert_eq!(process_all(&mut context).await?, 2);

    assert_eq!(&ws.storage.read_record("Broken").await?[..], b"{}");
    let entry = context.index().entry("NoStart").expect("entry");
    assert!(entry.players.is_empty());
    assert_eq!(entry.hash, None);
    assert!(context.index().eligible_for_upload(HOME).is_empty());

    assert_eq!(context.scan().await?.new_slp_count, 0);
    Ok(())
}

#[tokio::test]
async fn one_sided_games_are_never_eligible() -> Result<()> {
    let ws = workspace().await?;
    add_replay(&ws, "Game_1.slp", ReplayFixture::two_player([HOME, "X"]))?;

    let mut context = SyncContext::open(ws.parser.clone(), ws.storage.clone(), &ws.source).await;
    context.scan().await?;
    process_all(&mut context).await?;

    assert_eq!(context.codes_by_frequency().await?, vec![(HOME.to_string(), 1)]);
    context.select_code(HOME);
    assert_eq!(context.load_eligible().await?, 0);
    Ok(())
}

#[tokio::test]
async fn unauthenticated_or_tampered_uploads_are_dropped() -> Result<()> {
    let ws = workspace().await?;
    add_replay(&ws, "Game_1.slp", ReplayFixture::two_player([HOME, AWAY]))?;
    add_replay(&ws, "Game_2.slp", ReplayFixture::two_player([HOME, AWAY]).winner(1))?;

    let mut context = SyncContext::open(ws.parser.clone(), ws.storage.clone(), &ws.source).await;
    context.scan().await?;
    process_all(&mut context).await?;
    context.select_code(HOME);
    assert_eq!(context.load_eligible().await?, 2);

    // Game_2 is popped first.
    let mut tampered = read_record(&ws.storage, "Game_2").await?;
    tampered["hash"] = "0000000000".into();
    ws.storage
        .write_record("Game_2", Bytes::from(serde_json::to_vec(&tampered)?))
        .await?;

    let mut sink = RecordingSink::new(true);
    let result = context.upload_next(&mut sink, true).await;
    assert!(matches!(result, Err(QueueError::HashMismatch { .. })));
    assert!(sink.uploads.is_empty());

    let mut offline = RecordingSink::new(false);
    let result = context.upload_next(&mut offline, false).await;
    assert!(matches!(result, Err(QueueError::NotAuthenticated)));
    assert!(offline.uploads.is_empty());

    assert!(context.upload_next(&mut sink, false).await?.is_finished());
    assert_eq!(context.index().eligible_for_upload(HOME).len(), 2);
    Ok(())
}

#[tokio::test]
async fn invalid_games_directory_is_reported() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let storage = FileSystemStorage::new(tmp.path().join("Elsewhere"));
    let mut context = SyncContext::open(InMemoryParser::new(), storage, tmp.path()).await;

    assert_eq!(context.errors().take().as_deref(), Some(GAMES_DIRECTORY_ERROR));
    assert_eq!(context.scan().await?.slp_count, 0);
    assert!(context.flush().await.is_err());
    assert!(context.errors().take().is_some());
    assert!(!tmp.path().join("Elsewhere").exists());
    Ok(())
}

#[tokio::test]
async fn failed_connectivity_check_is_reported() -> Result<()> {
    let ws = workspace().await?;
    let context = SyncContext::open(ws.parser.clone(), ws.storage.clone(), &ws.source).await;

    assert!(context.connection_status(Ok::<(), std::io::Error>(())));
    assert!(context.errors().is_empty());

    let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    assert!(!context.connection_status(Err(refused)));
    assert_eq!(context.errors().take().as_deref(), Some(CONNECTION_ERROR));
    Ok(())
}
