use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client as HttpClient, Method};
use serde_json::{Value, json};
use url::Url;

use crate::api::envelope::{Envelope, error_message};
use crate::api::models::{
    AnnouncementAnalytics, ExtensionStatus, QueueMember, QueueWallboard, VoicemailSettings,
};
use crate::api::resources::{Resource, Verb};
use crate::app::AppState;
use crate::bulk::BulkAction;
use crate::error::{ConsoleError, Result};

const AUTH_FILE: &str = "api/auth.php";
const STATUS_KEYS: &[&str] = &["statuses", "extensions"];

/// Thin client for the FlexPBX `/api/*.php` endpoints.
///
/// Every call is `<file>?path=<action>[&id=<id>]` and answers with the
/// `{success, ...}` envelope.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base: Url,
    token: Option<String>,
}

/// Module lifecycle actions; modules are never deleted from the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleAction {
    Install,
    Enable,
    Disable,
}

impl ModuleAction {
    fn path(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;
        Ok(Self { http, base: Self::base_url(base_url)?, token: None })
    }

    pub fn from_state(state: &AppState) -> Result<Self> {
        if state.base_url.trim().is_empty() {
            return Err(ConsoleError::Config("no server URL configured".into()));
        }
        let client = Self::new(&state.base_url, state.request_timeout())?;
        Ok(client.with_token(state.token.clone()))
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Site root with a trailing slash; a pasted `.../api` suffix is dropped
    /// so endpoint files resolve against the install directory.
    fn base_url(input: &str) -> Result<Url> {
        let normalized = crate::utils::normalize_url(input);
        let mut trimmed = normalized.trim_end_matches('/');
        if let Some(stripped) = trimmed.strip_suffix("/api") {
            trimmed = stripped;
        }
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }

    pub fn endpoint_url(&self, file: &str, action: &str, id: Option<&str>, extra: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base.join(file.trim_start_matches('/'))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("path", action);
            if let Some(id) = id {
                query.append_pair("id", id);
            }
            for (k, v) in extra {
                query.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    /// Sends one request and decodes the envelope. Non-2xx responses still
    /// surface the server's `error`/`message` when the body carries one.
    pub async fn call(
        &self,
        method: Method,
        file: &str,
        action: &str,
        id: Option<&str>,
        extra: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Envelope> {
        let url = self.endpoint_url(file, action, id, extra)?;
        debug!("{method} {file}?path={action}");
        let mut req = self.with_auth(self.http.request(method, url));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text).ok().and_then(|v| error_message(&v));
            warn!("{file}?path={action} returned HTTP {status}");
            return Err(match message {
                Some(m) => ConsoleError::Api(m),
                None => ConsoleError::Http { status: status.as_u16(), body: text },
            });
        }
        if text.trim().is_empty() {
            return Envelope::parse(Value::Object(Default::default()));
        }
        Envelope::parse(serde_json::from_str(&text)?)
    }

    /// Logs in and returns the API token when the server issues one. The
    /// PHP session cookie is kept by the client either way.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Option<String>> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ConsoleError::precondition("Please enter username and password."));
        }
        let body = json!({"username": username, "password": password});
        let env = self.call(Method::POST, AUTH_FILE, "login", None, &[], Some(&body)).await?;
        let token = ["token", "accessToken", "session_token"]
            .iter()
            .find_map(|k| env.body().get(*k).and_then(Value::as_str))
            .map(str::to_string);
        info!("logged in to {} as {username}", self.base);
        self.token = token.clone();
        Ok(token)
    }

    /// Cheap authenticated request; returns the HTTP status.
    pub async fn ping(&self) -> Result<u16> {
        let url = self.endpoint_url(AUTH_FILE, "check", None, &[])?;
        let resp = self.with_auth(self.http.get(url)).send().await?;
        Ok(resp.status().as_u16())
    }

    pub async fn list<R: Resource>(&self, offset: Option<usize>) -> Result<Vec<R>> {
        let offset = offset.map(|o| o.to_string());
        let extra: Vec<(&str, &str)> = offset.iter().map(|o| ("offset", o.as_str())).collect();
        let env = self.call(Method::GET, R::ENDPOINT.file, "list", None, &extra, None).await?;
        Ok(env.list(&[R::ENDPOINT.list_key]))
    }

    pub async fn create<R: Resource>(&self, payload: &Value) -> Result<Envelope> {
        if !R::ENDPOINT.creatable {
            return Err(ConsoleError::precondition(format!("{} cannot be created here", R::TITLE)));
        }
        self.call(Method::POST, R::ENDPOINT.file, "create", None, &[], Some(payload)).await
    }

    pub async fn update<R: Resource>(&self, id: &str, payload: &Value) -> Result<Envelope> {
        let verb = R::ENDPOINT
            .update_verb
            .ok_or_else(|| ConsoleError::precondition(format!("{} cannot be edited here", R::TITLE)))?;
        self.call(verb.method(), R::ENDPOINT.file, "update", Some(id), &[], Some(payload)).await
    }

    pub async fn delete<R: Resource>(&self, id: &str) -> Result<Envelope> {
        if !R::ENDPOINT.deletable {
            return Err(ConsoleError::precondition(format!("{} cannot be deleted here", R::TITLE)));
        }
        self.call(Verb::Delete.method(), R::ENDPOINT.file, "delete", Some(id), &[], None).await
    }

    /// One aggregate `bulk_*` call for the given ids.
    pub async fn bulk<R: Resource>(&self, action: BulkAction, ids: &[String]) -> Result<Envelope> {
        if ids.is_empty() {
            return Err(ConsoleError::precondition(format!("Select at least one {} first.", R::NOUN)));
        }
        let body = crate::bulk::payload(R::ENDPOINT.bulk_key, ids);
        info!("{} on {} {}(s)", action.path(), ids.len(), R::NOUN);
        self.call(Method::POST, R::ENDPOINT.file, action.path(), None, &[], Some(&body)).await
    }

    pub async fn migrate_users(&self, ids: &[String], target_department: &str) -> Result<Envelope> {
        if ids.is_empty() {
            return Err(ConsoleError::precondition("Select at least one user to migrate."));
        }
        if target_department.trim().is_empty() {
            return Err(ConsoleError::precondition("Choose a target department."));
        }
        let mut body = crate::bulk::payload("users", ids);
        body["target_department"] = Value::from(target_department.trim());
        self.call(Method::POST, "api/user-migration.php", "bulk_migrate", None, &[], Some(&body)).await
    }

    /// Presence of every extension, keyed by extension number.
    pub async fn extension_statuses(&self) -> Result<Vec<(String, ExtensionStatus)>> {
        let env = self.call(Method::GET, "api/extensions.php", "status", None, &[], None).await?;
        if let Some(rows) = env.find_list(STATUS_KEYS) {
            return Ok(rows
                .iter()
                .filter_map(|row| {
                    let ext = row.get("extension").or_else(|| row.get("number"))?;
                    let status = row.get("status").map(crate::api::models::lenient::text).unwrap_or_default();
                    Some((crate::api::models::lenient::text(ext), ExtensionStatus::parse(&status)))
                })
                .collect());
        }
        // `{"statuses": {"2001": "online", ...}}`
        let map = env.object(STATUS_KEYS);
        Ok(map
            .as_object()
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), ExtensionStatus::parse(&crate::api::models::lenient::text(v))))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn queue_members(&self, queue: &str) -> Result<Vec<QueueMember>> {
        let env = self.call(Method::GET, "api/call-queues.php", "members", Some(queue), &[], None).await?;
        Ok(env.list(&["members"]))
    }

    pub async fn add_queue_member(&self, queue: &str, extension: &str, penalty: u32) -> Result<Envelope> {
        if extension.trim().is_empty() {
            return Err(ConsoleError::precondition("Choose an extension to add."));
        }
        let body = json!({"extension": extension, "penalty": penalty});
        self.call(Method::POST, "api/call-queues.php", "add_member", Some(queue), &[], Some(&body)).await
    }

    pub async fn remove_queue_member(&self, queue: &str, extension: &str) -> Result<Envelope> {
        let body = json!({"extension": extension});
        self.call(Method::POST, "api/call-queues.php", "remove_member", Some(queue), &[], Some(&body)).await
    }

    pub async fn pause_queue_member(&self, queue: &str, extension: &str, paused: bool, reason: Option<&str>) -> Result<Envelope> {
        let body = json!({"extension": extension, "paused": paused, "reason": reason.unwrap_or_default()});
        self.call(Method::POST, "api/call-queues.php", "pause_member", Some(queue), &[], Some(&body)).await
    }

    /// "Apply Configuration": regenerate and reload the queue config.
    pub async fn apply_queue_config(&self) -> Result<Envelope> {
        self.call(Method::POST, "api/call-queues.php", "apply_config", None, &[], None).await
    }

    pub async fn queue_wallboard(&self, queue: &str) -> Result<QueueWallboard> {
        if queue.trim().is_empty() {
            return Err(ConsoleError::precondition("Select a queue first."));
        }
        let env = self.call(Method::GET, "api/call-queues.php", "wallboard", Some(queue), &[], None).await?;
        env.decode(&["wallboard", "stats"])
    }

    pub async fn module_action(&self, key: &str, action: ModuleAction) -> Result<Envelope> {
        self.call(Method::POST, "api/modules.php", action.path(), Some(key), &[], None).await
    }

    pub async fn announcement_analytics(&self) -> Result<AnnouncementAnalytics> {
        let env = self.call(Method::GET, "api/announcements.php", "analytics", None, &[], None).await?;
        env.decode(&["analytics"])
    }

    pub async fn voicemail_settings(&self) -> Result<VoicemailSettings> {
        let env = self.call(Method::GET, "api/voicemail.php", "settings", None, &[], None).await?;
        env.decode(&["settings"])
    }

    pub async fn save_voicemail_settings(&self, settings: &VoicemailSettings) -> Result<Envelope> {
        let body = serde_json::to_value(settings)?;
        self.call(Method::POST, "api/voicemail.php", "settings", None, &[], Some(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{CallQueue, Extension, Module};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(uri: &str) -> ApiClient {
        ApiClient::new(uri, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_url_drops_api_suffix_and_keeps_subdirectory() {
        let client = test_client("pbx.example.com/flexpbx/api/");
        assert_eq!(client.base().as_str(), "https://pbx.example.com/flexpbx/");
        let url = client.endpoint_url("api/call-queues.php", "update", Some("600"), &[]).unwrap();
        assert_eq!(url.as_str(), "https://pbx.example.com/flexpbx/api/call-queues.php?path=update&id=600");
    }

    #[test]
    fn ids_are_query_encoded() {
        let client = test_client("https://pbx.example.com");
        let url = client.endpoint_url("api/help-articles.php", "delete", Some("a&b=c"), &[]).unwrap();
        assert_eq!(url.query(), Some("path=delete&id=a%26b%3Dc"));
    }

    #[tokio::test]
    async fn list_decodes_queues() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/call-queues.php"))
            .and(query_param("path", "list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "queues": [
                    {"queue_number": "600", "name": "Support", "strategy": "ringall"},
                    {"queue_number": 601, "name": "Sales", "strategy": "rrmemory"}
                ]
            })))
            .mount(&server)
            .await;

        let queues = test_client(&server.uri()).list::<CallQueue>(None).await.unwrap();
        assert_eq!(queues.len(), 2);
        assert_eq!(queues[1].queue_number, "601");
    }

    #[tokio::test]
    async fn logical_failure_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/extensions.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "error": "Database unavailable"
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).list::<Extension>(None).await.unwrap_err();
        assert_eq!(err.to_string(), "Database unavailable");
    }

    #[tokio::test]
    async fn http_error_without_json_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).list::<Extension>(None).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Http { status: 502, .. }), "got: {err}");
    }

    #[tokio::test]
    async fn http_error_with_json_uses_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"success": false, "message": "Admins only"})))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).delete::<Extension>("2001").await.unwrap_err();
        assert_eq!(err.to_string(), "Admins only");
    }

    #[tokio::test]
    async fn login_token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth.php"))
            .and(query_param("path", "login"))
            .and(body_json(json!({"username": "admin", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "token": "tok-1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/modules.php"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "modules": []})))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server.uri());
        let token = client.login("admin", "secret").await.unwrap();
        assert_eq!(token.as_deref(), Some("tok-1"));
        assert!(client.list::<Module>(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offset_is_passed_for_load_more() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("path", "list"))
            .and(query_param("offset", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server.uri()).list::<Extension>(Some(50)).await.unwrap();
    }

    #[tokio::test]
    async fn modules_cannot_be_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let err = test_client(&server.uri()).delete::<Module>("billing").await.unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn statuses_accept_list_or_map() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("path", "status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "statuses": {"2001": "online", "2002": "busy"}
            })))
            .mount(&server)
            .await;

        let mut statuses = test_client(&server.uri()).extension_statuses().await.unwrap();
        statuses.sort();
        assert_eq!(
            statuses,
            vec![("2001".to_string(), ExtensionStatus::Online), ("2002".to_string(), ExtensionStatus::Busy)]
        );
    }

    #[tokio::test]
    async fn empty_status_list_means_no_extensions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("path", "status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "statuses": []})))
            .mount(&server)
            .await;

        let statuses = test_client(&server.uri()).extension_statuses().await.unwrap();
        assert!(statuses.is_empty());
    }

    #[tokio::test]
    async fn wallboard_requires_a_queue() {
        let client = test_client("http://127.0.0.1:9");
        let err = client.queue_wallboard("").await.unwrap_err();
        assert_eq!(err.to_string(), "Select a queue first.");
    }

    #[tokio::test]
    async fn pause_member_posts_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("path", "pause_member"))
            .and(query_param("id", "600"))
            .and(body_json(json!({"extension": "2001", "paused": true, "reason": "lunch"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server.uri()).pause_queue_member("600", "2001", true, Some("lunch")).await.unwrap();
    }
}
