use mockito::Server;
use nad_spotify::{Credentials, SpotifyClient};
use nad_tui::{spotify, Severity, SpotifyCommand, UiMessage};

fn client(server: &Server) -> SpotifyClient {
    let creds = Credentials {
        access_token: Some("t".into()),
        ..Credentials::default()
    };
    SpotifyClient::with_base_urls(creds, server.url(), server.url())
}

#[tokio::test]
async fn device_refresh_becomes_a_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/me/player/devices")
        .with_status(200)
        .with_body(r#"{"devices":[{"id":"nad","name":"NAD T 758","type":"AVR","is_active":true}]}"#)
        .create_async()
        .await;

    let messages = spotify::execute(&client(&server), SpotifyCommand::RefreshDevices).await;
    match messages.as_slice() {
        [UiMessage::SpotifyDevices(devices)] => {
            assert_eq!(devices.len(), 1);
            assert_eq!(devices[0].id.as_deref(), Some("nad"));
        }
        other => panic!("unexpected messages: {other:?}"),
    }
}

#[tokio::test]
async fn transfer_reports_success_and_reloads_devices() {
    let mut server = Server::new_async().await;
    let transfer = server
        .mock("PUT", "/v1/me/player")
        .match_body(mockito::Matcher::Json(serde_json::json!({
            "device_ids": ["nad"],
            "play": true
        })))
        .with_status(204)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/me/player/devices")
        .with_status(200)
        .with_body(r#"{"devices":[]}"#)
        .create_async()
        .await;

    let messages =
        spotify::execute(&client(&server), SpotifyCommand::Transfer("nad".into())).await;
    transfer.assert_async().await;
    assert!(matches!(
        messages.as_slice(),
        [
            UiMessage::Note { severity: Severity::Success, .. },
            UiMessage::SpotifyDevices(_)
        ]
    ));
}

#[tokio::test]
async fn api_failure_becomes_an_error_note() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/me/player/next")
        .with_status(404)
        .with_body(r#"{"error":{"status":404,"message":"No active device found"}}"#)
        .create_async()
        .await;

    let messages = spotify::execute(&client(&server), SpotifyCommand::Next).await;
    match messages.as_slice() {
        [UiMessage::Note { severity, text }] => {
            assert_eq!(*severity, Severity::Error);
            assert!(text.contains("No active device found"));
        }
        other => panic!("unexpected messages: {other:?}"),
    }
}
