//! Settings panels for the external services (Twilio, Mattermost, Google
//! Voice) plus maintenance mode.
//!
//! Each integration is a single config row: load it (secrets come back
//! masked), test entered credentials without saving, save separately.

use log::{info, warn};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::api::client::ApiClient;
use crate::api::envelope::Envelope;
use crate::api::models::{ConnectionTest, GoogleVoiceConfig, MaintenanceStatus, MattermostConfig, TwilioConfig};
use crate::error::{ConsoleError, Result};
use crate::form::{FieldKind, FieldSpec};

const MAINTENANCE_FILE: &str = "api/maintenance.php";

/// True for the placeholder a server sends instead of a stored secret.
pub fn is_masked(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && s.chars().all(|c| matches!(c, '*' | '•' | '●'))
}

pub trait IntegrationConfig: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAME: &'static str;
    const FILE: &'static str;
    /// Fields the server masks and that must not be echoed back.
    const SECRETS: &'static [&'static str];
    const FIELDS: &'static [FieldSpec];
}

impl IntegrationConfig for TwilioConfig {
    const NAME: &'static str = "Twilio";
    const FILE: &'static str = "api/twilio.php";
    const SECRETS: &'static [&'static str] = &["auth_token"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("account_sid", "Account SID", FieldKind::Text).required(),
        FieldSpec::new("auth_token", "Auth token", FieldKind::Secret),
        FieldSpec::new("phone_number", "Phone number", FieldKind::Text).required(),
        FieldSpec::new("webhook_url", "Webhook URL", FieldKind::Text),
        FieldSpec::new("rate_limit_per_minute", "Rate limit (per minute)", FieldKind::Number),
        FieldSpec::new("enabled", "Enabled", FieldKind::Toggle),
        FieldSpec::new("sms_enabled", "SMS", FieldKind::Toggle),
        FieldSpec::new("voice_enabled", "Voice", FieldKind::Toggle),
    ];
}

impl IntegrationConfig for MattermostConfig {
    const NAME: &'static str = "Mattermost";
    const FILE: &'static str = "api/mattermost-integration.php";
    const SECRETS: &'static [&'static str] = &["bot_token"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("server_url", "Server URL", FieldKind::Text).required(),
        FieldSpec::new("bot_token", "Bot token", FieldKind::Secret),
        FieldSpec::new("team_id", "Team ID", FieldKind::Text),
        FieldSpec::new("default_channel", "Default channel", FieldKind::Text),
        FieldSpec::new("webhook_url", "Incoming webhook URL", FieldKind::Text),
        FieldSpec::new("rate_limit_per_minute", "Rate limit (per minute)", FieldKind::Number),
        FieldSpec::new("enabled", "Enabled", FieldKind::Toggle),
        FieldSpec::new("notify_missed_calls", "Notify missed calls", FieldKind::Toggle),
        FieldSpec::new("notify_voicemail", "Notify voicemail", FieldKind::Toggle),
    ];
}

impl IntegrationConfig for GoogleVoiceConfig {
    const NAME: &'static str = "Google Voice";
    const FILE: &'static str = "modules/google-voice.php";
    const SECRETS: &'static [&'static str] = &["client_secret", "refresh_token"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("client_id", "OAuth client ID", FieldKind::Text).required(),
        FieldSpec::new("client_secret", "OAuth client secret", FieldKind::Secret),
        FieldSpec::new("refresh_token", "Refresh token", FieldKind::Secret),
        FieldSpec::new("phone_number", "Google Voice number", FieldKind::Text),
        FieldSpec::new("enabled", "Enabled", FieldKind::Toggle),
        FieldSpec::new("sync_sms", "Sync SMS", FieldKind::Toggle),
        FieldSpec::new("sync_voicemail", "Sync voicemail", FieldKind::Toggle),
    ];
}

/// Serializes `config` with masked or blank secrets removed, so the server
/// keeps what it has stored.
pub fn outgoing<C: IntegrationConfig>(config: &C) -> Result<Value> {
    let mut body = serde_json::to_value(config)?;
    if let Some(map) = body.as_object_mut() {
        for key in C::SECRETS {
            let drop = map.get(*key).and_then(Value::as_str).is_some_and(|s| s.trim().is_empty() || is_masked(s));
            if drop {
                map.remove(*key);
            }
        }
    }
    Ok(body)
}

pub async fn load_config<C: IntegrationConfig>(client: &ApiClient) -> Result<C> {
    let env = client.call(Method::GET, C::FILE, "config", None, &[], None).await?;
    env.decode(&["config", "settings"])
}

/// "Test Connection" with the entered, unsaved values. A logical failure
/// is a result to display, not an error.
pub async fn test_connection<C: IntegrationConfig>(client: &ApiClient, config: &C) -> Result<ConnectionTest> {
    let body = outgoing(config)?;
    match client.call(Method::POST, C::FILE, "test", None, &[], Some(&body)).await {
        Ok(env) => Ok(ConnectionTest {
            success: true,
            message: env.message().unwrap_or("Connection successful").to_string(),
        }),
        Err(ConsoleError::Api(message)) => {
            warn!("{} connection test failed: {message}", C::NAME);
            Ok(ConnectionTest { success: false, message })
        }
        Err(e) => Err(e),
    }
}

pub async fn save_config<C: IntegrationConfig>(client: &ApiClient, config: &C) -> Result<Envelope> {
    let body = outgoing(config)?;
    let env = client.call(Method::POST, C::FILE, "save", None, &[], Some(&body)).await?;
    info!("{} settings saved", C::NAME);
    Ok(env)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmsRequest {
    pub to: String,
    pub body: String,
}

impl SmsRequest {
    pub fn validate(&self) -> Result<()> {
        if self.to.trim().is_empty() || self.body.trim().is_empty() {
            return Err(ConsoleError::precondition("Please enter a recipient and a message."));
        }
        Ok(())
    }
}

/// "Send SMS" through Twilio; blank fields never reach the server.
pub async fn send_sms(client: &ApiClient, sms: &SmsRequest) -> Result<Envelope> {
    sms.validate()?;
    let body = json!({"to": sms.to.trim(), "body": sms.body});
    client.call(Method::POST, TwilioConfig::FILE, "send_sms", None, &[], Some(&body)).await
}

pub async fn maintenance_status(client: &ApiClient) -> Result<MaintenanceStatus> {
    let env = client.call(Method::GET, MAINTENANCE_FILE, "status", None, &[], None).await?;
    env.decode(&["maintenance", "status"])
}

pub async fn set_maintenance(client: &ApiClient, enabled: bool, message: &str) -> Result<MaintenanceStatus> {
    let body = json!({"enabled": enabled, "message": message.trim()});
    let env = client.call(Method::POST, MAINTENANCE_FILE, "toggle", None, &[], Some(&body)).await?;
    info!("maintenance mode {}", if enabled { "enabled" } else { "disabled" });
    let mut status: MaintenanceStatus = env.decode(&["maintenance", "status"])?;
    // Some builds answer with a bare `{success: true}`.
    if env.body().get("enabled").is_none() && env.body().get("maintenance").is_none() {
        status.enabled = enabled;
        status.message = message.trim().to_string();
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(uri: &str) -> ApiClient {
        ApiClient::new(uri, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn masks_are_recognized() {
        assert!(is_masked("********"));
        assert!(is_masked("••••••"));
        assert!(!is_masked(""));
        assert!(!is_masked("ab**"));
    }

    #[test]
    fn masked_secrets_are_not_echoed() {
        let cfg = TwilioConfig { account_sid: "AC123".into(), auth_token: "••••".into(), ..Default::default() };
        let body = outgoing(&cfg).unwrap();
        assert_eq!(body["account_sid"], "AC123");
        assert!(body.get("auth_token").is_none());

        let cfg = TwilioConfig { auth_token: "new-token".into(), ..Default::default() };
        assert_eq!(outgoing(&cfg).unwrap()["auth_token"], "new-token");
    }

    #[tokio::test]
    async fn load_reads_config_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/mattermost-integration.php"))
            .and(query_param("path", "config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "config": {"server_url": "https://chat.example.com", "bot_token": "********", "enabled": "1"}
            })))
            .mount(&server)
            .await;

        let cfg: MattermostConfig = load_config(&test_client(&server.uri())).await.unwrap();
        assert_eq!(cfg.server_url, "https://chat.example.com");
        assert!(cfg.enabled);
        assert!(is_masked(&cfg.bot_token));
    }

    #[tokio::test]
    async fn failed_test_is_a_result_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/modules/google-voice.php"))
            .and(query_param("path", "test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "error": "invalid_client"
            })))
            .mount(&server)
            .await;

        let cfg = GoogleVoiceConfig { client_id: "abc".into(), ..Default::default() };
        let result = test_connection(&test_client(&server.uri()), &cfg).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "invalid_client");
    }

    #[tokio::test]
    async fn successful_test_sends_unsaved_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("path", "test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Authenticated"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST")).and(query_param("path", "save")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let cfg = TwilioConfig { account_sid: "AC1".into(), auth_token: "tok".into(), ..Default::default() };
        let result = test_connection(&test_client(&server.uri()), &cfg).await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "Authenticated");
    }

    #[tokio::test]
    async fn empty_sms_is_blocked_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let client = test_client(&server.uri());
        let no_body = SmsRequest { to: "+15551234567".into(), body: "  ".into() };
        let no_to = SmsRequest { to: "".into(), body: "hi".into() };
        assert!(send_sms(&client, &no_body).await.unwrap_err().is_precondition());
        assert!(send_sms(&client, &no_to).await.unwrap_err().is_precondition());
    }

    #[tokio::test]
    async fn sms_is_posted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/twilio.php"))
            .and(query_param("path", "send_sms"))
            .and(body_json(json!({"to": "+15551234567", "body": "Your voicemail is full"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "sid": "SM1"})))
            .expect(1)
            .mount(&server)
            .await;

        let sms = SmsRequest { to: " +15551234567 ".into(), body: "Your voicemail is full".into() };
        send_sms(&test_client(&server.uri()), &sms).await.unwrap();
    }

    #[tokio::test]
    async fn maintenance_toggle_falls_back_to_requested_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/maintenance.php"))
            .and(query_param("path", "toggle"))
            .and(body_json(json!({"enabled": true, "message": "Upgrading"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let status = set_maintenance(&test_client(&server.uri()), true, " Upgrading ").await.unwrap();
        assert!(status.enabled);
        assert_eq!(status.message, "Upgrading");
    }

    #[tokio::test]
    async fn maintenance_toggle_reports_unreadable_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/maintenance.php"))
            .and(query_param("path", "toggle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("toggled")))
            .mount(&server)
            .await;

        let err = set_maintenance(&test_client(&server.uri()), false, "").await.unwrap_err();
        assert!(matches!(err, crate::error::ConsoleError::Decode(_)));
    }
}
