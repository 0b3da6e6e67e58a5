//! JSON text messages exchanged over the persistent upload connection.
//!
//! Every message is `{"status": ..., "payload": ...}`.

use crate::metadata::UploadCredential;
use crate::record::StatsRecord;
use serde::{Deserialize, Serialize};

/// Messages sent by this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Authenticate(UploadCredential),
    UploadGame(UploadGame),
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    Authenticate(AuthenticateResponse),
    UploadGame(UploadAck),
    Heartbeat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGame {
    pub game_obj: StatsRecord,
    pub hash: String,
    /// Replay file stem; the server echoes it back in the ack.
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    pub validated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAck {
    pub hash: String,
    pub file_name: String,
    pub success: bool,
}

impl ClientMessage {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn authenticate_wire_shape() {
        let msg = ClientMessage::Authenticate(UploadCredential::new("k-1", "abcd1234"));
        let value: serde_json::Value = serde_json::from_str(&msg.to_text().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"status": "AUTHENTICATE", "payload": {"key": "k-1", "id": "abcd1234"}})
        );
    }

    #[test]
    fn parses_server_messages() {
        let auth = ServerMessage::from_text(r#"{"status":"AUTHENTICATE","payload":{"validated":true}}"#)
            .unwrap();
        assert_eq!(
            auth,
            ServerMessage::Authenticate(AuthenticateResponse { validated: true })
        );

        let ack = ServerMessage::from_text(
            r#"{"status":"UPLOAD_GAME","payload":{"hash":"abc","fileName":"Game_1","success":false}}"#,
        )
        .unwrap();
        assert_eq!(
            ack,
            ServerMessage::UploadGame(UploadAck {
                hash: "abc".into(),
                file_name: "Game_1".into(),
                success: false,
            })
        );

        assert_eq!(
            ServerMessage::from_text(r#"{"status":"HEARTBEAT"}"#).unwrap(),
            ServerMessage::Heartbeat
        );
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(ServerMessage::from_text(r#"{"status":"NOPE","payload":{}}"#).is_err());
        assert!(ServerMessage::from_text("not json").is_err());
    }
}
