use anyhow::Result;
use smashstats_client::{
    ClientConfig, SessionConfig, SessionError, SessionState, SmashStatsClient, UploadSession,
};
use smashstats_core::normalize::normalize;
use smashstats_core::prelude::*;
use smashstats_mock::{AcceptAllServer, MockApi, MockBehavior, ReplayFixture, credential_for_code};

fn upload_game(file_name: &str) -> Result<UploadGame> {
    let converted = normalize(&ReplayFixture::two_player(["ABC#123", "XYZ#987"]).build())?;
    let hash = converted.hash().unwrap_or_default().to_string();
    Ok(UploadGame {
        game_obj: converted.record,
        hash,
        file_name: file_name.to_string(),
    })
}

fn credential() -> UploadCredential {
    let (id, key) = credential_for_code("ABC#123");
    UploadCredential::new(key, id)
}

#[tokio::test]
async fn uploads_and_receives_ack() -> Result<()> {
    let server = AcceptAllServer::start(MockBehavior::default()).await?;
    let mut session =
        UploadSession::connect(&server.url(), credential(), SessionConfig::default()).await?;
    assert!(session.is_authenticated());

    let game = upload_game("Game_20230620T202154")?;
    let hash = game.hash.clone();
    let ack = session.upload(game).await?;
    assert!(ack.success);
    assert_eq!(ack.hash, hash);
    assert_eq!(ack.file_name, "Game_20230620T202154");
    assert_eq!(session.state(), &SessionState::Ready);

    session.close().await;
    assert!(!session.is_connected());

    let received = server.received();
    assert!(matches!(received[0], ClientMessage::Authenticate(_)));
    assert_eq!(server.uploads().len(), 1);
    Ok(())
}

#[tokio::test]
async fn rejected_credential_is_reported() -> Result<()> {
    let server = AcceptAllServer::start(MockBehavior {
        validate: false,
        ..Default::default()
    })
    .await?;
    let result = UploadSession::connect(&server.url(), credential(), SessionConfig::default()).await;
    assert!(matches!(result, Err(SessionError::AuthenticationRejected)));
    assert!(server.uploads().is_empty());
    Ok(())
}

#[tokio::test]
async fn dropped_connection_fails_the_upload() -> Result<()> {
    let server = AcceptAllServer::start(MockBehavior {
        close_on_upload: true,
        ..Default::default()
    })
    .await?;
    let mut session =
        UploadSession::connect(&server.url(), credential(), SessionConfig::default()).await?;

    let result = session.upload(upload_game("Game_1")?).await;
    assert!(matches!(
        result,
        Err(SessionError::Closed) | Err(SessionError::Transport(_))
    ));
    assert_eq!(session.state(), &SessionState::Disconnected);
    assert!(!session.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn http_api_issues_credentials_and_links() -> Result<()> {
    let api = MockApi::new();
    let url = api.serve().await?;
    let client = SmashStatsClient::new(ClientConfig::new(&url).with_frontend_url("https://stats.test"));

    client.ping().await?;

    let credential = client.request_credential("ABC#123").await?;
    assert!(credential.is_complete());
    assert_eq!(credential.key.len(), 36);
    assert_eq!(credential.id.len(), 8);
    assert_eq!(api.issued(), vec!["ABC#123".to_string()]);

    assert_eq!(client.player_link(&credential.id).await?, None);
    api.mark_uploaded(credential.id.clone());
    assert_eq!(
        client.player_link(&credential.id).await?,
        Some(format!("https://stats.test/{}", credential.id))
    );
    assert_eq!(client.player_link("short").await?, None);

    assert!(client.request_credential("AB").await.is_err());
    Ok(())
}
