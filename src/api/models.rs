use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Decoders for the loosely typed values the PHP endpoints emit: numbers as
/// strings, booleans as `0/1` or `"yes"`, comma separated lists.
pub(crate) mod lenient {
    use super::*;

    pub fn truthy(v: &Value) -> bool {
        match v {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            ),
            _ => false,
        }
    }

    pub fn text(v: &Value) -> String {
        match v {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    pub fn number(v: &Value) -> u32 {
        match v {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(0),
            Value::String(s) => s.trim().parse::<f64>().map(|f| f.max(0.0) as u32).unwrap_or(0),
            Value::Bool(b) => *b as u32,
            _ => 0,
        }
    }

    pub fn list(v: &Value) -> Vec<String> {
        match v {
            Value::Array(items) => items
                .iter()
                .map(text)
                .filter(|s| !s.trim().is_empty())
                .collect(),
            Value::String(s) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(truthy(&Value::deserialize(d)?))
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(text(&Value::deserialize(d)?))
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let s = text(&Value::deserialize(d)?);
        Ok(if s.trim().is_empty() { None } else { Some(s) })
    }

    pub fn u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(number(&Value::deserialize(d)?))
    }

    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(list(&Value::deserialize(d)?))
    }

    /// `YYYY-MM-DD HH:MM:SS` as stored by MySQL, also accepting RFC 3339 and
    /// the `datetime-local` input format.
    pub mod datetime {
        use super::*;
        use chrono::DateTime;
        use serde::Serializer;

        pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

        pub fn parse(s: &str) -> Option<NaiveDateTime> {
            let s = s.trim();
            if s.is_empty() || s.starts_with("0000-00-00") {
                return None;
            }
            NaiveDateTime::parse_from_str(s, FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_utc()))
        }

        pub fn serialize<S: Serializer>(v: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
            match v {
                Some(dt) => s.serialize_str(&dt.format(FORMAT).to_string()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
            Ok(parse(&text(&Value::deserialize(d)?)))
        }
    }
}

/// Presence of a phone as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionStatus {
    Online,
    Busy,
    Away,
    Offline,
    #[default]
    Unknown,
}

impl ExtensionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "online" | "available" | "registered" | "idle" | "not_inuse" => Self::Online,
            "busy" | "inuse" | "in_use" | "ringing" | "oncall" | "on_call" => Self::Busy,
            "away" | "dnd" | "paused" => Self::Away,
            "offline" | "unavailable" | "unregistered" => Self::Offline,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Busy => "busy",
            Self::Away => "away",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }
}

impl<'de> Deserialize<'de> for ExtensionStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Self::parse(&lenient::text(&Value::deserialize(d)?)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, deserialize_with = "lenient::bool")]
    pub outbound_calls: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub international: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub call_recording: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub voicemail_access: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub admin_portal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoicemailOptions {
    #[serde(default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub attach_audio: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardingRules {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub always: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub busy: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub no_answer: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub unavailable: Option<String>,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub ring_timeout: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    #[serde(rename = "extension", alias = "number", default, deserialize_with = "lenient::string")]
    pub number: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub department: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub device_type: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub codecs: Vec<String>,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
    #[serde(default)]
    pub status: ExtensionStatus,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub voicemail: VoicemailOptions,
    #[serde(default)]
    pub forwarding: ForwardingRules,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Extension {
    fn default() -> Self {
        Self {
            number: String::new(),
            display_name: String::new(),
            username: String::new(),
            department: String::new(),
            device_type: "sip".into(),
            codecs: vec!["ulaw".into(), "alaw".into(), "g722".into()],
            enabled: true,
            status: ExtensionStatus::Unknown,
            permissions: Permissions { outbound_calls: true, voicemail_access: true, ..Default::default() },
            voicemail: VoicemailOptions { enabled: true, ..Default::default() },
            forwarding: ForwardingRules { ring_timeout: 20, ..Default::default() },
            extra: BTreeMap::new(),
        }
    }
}

/// Asterisk queue ring strategies offered in the queue form.
pub const QUEUE_STRATEGIES: &[&str] = &[
    "ringall", "leastrecent", "fewestcalls", "random", "rrmemory", "rrordered", "linear", "wrandom",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallQueue {
    #[serde(alias = "number", default, deserialize_with = "lenient::string")]
    pub queue_number: String,
    #[serde(alias = "queue_name", default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub strategy: String,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub timeout: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub retry: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub max_wait_time: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub max_callers: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub announce_frequency: u32,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub announce_position: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub announce_holdtime: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub music_on_hold: String,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub member_count: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for CallQueue {
    fn default() -> Self {
        Self {
            queue_number: String::new(),
            name: String::new(),
            strategy: "ringall".into(),
            timeout: 15,
            retry: 5,
            max_wait_time: 300,
            max_callers: 10,
            announce_frequency: 60,
            announce_position: true,
            announce_holdtime: false,
            music_on_hold: "default".into(),
            enabled: true,
            member_count: 0,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueMember {
    #[serde(default, deserialize_with = "lenient::string")]
    pub extension: String,
    #[serde(alias = "member_name", default, deserialize_with = "lenient::string")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub penalty: u32,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub paused: bool,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub paused_reason: Option<String>,
    #[serde(default)]
    pub status: ExtensionStatus,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub calls_taken: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitingCall {
    #[serde(alias = "callerid", default, deserialize_with = "lenient::string")]
    pub caller_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub caller_name: String,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub position: u32,
    #[serde(alias = "wait", default, deserialize_with = "lenient::u32")]
    pub wait_time: u32,
}

/// Supervisor wallboard snapshot for one queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueWallboard {
    #[serde(default, deserialize_with = "lenient::u32")]
    pub calls_waiting: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub agents_available: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub agents_busy: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub agents_paused: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub avg_wait_time: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub longest_wait_time: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub calls_completed: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub calls_abandoned: u32,
    #[serde(default)]
    pub members: Vec<QueueMember>,
    #[serde(default)]
    pub waiting_calls: Vec<WaitingCall>,
}

pub const ANNOUNCEMENT_TYPES: &[&str] = &["info", "warning", "critical", "maintenance", "feature"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(rename = "type", alias = "announcement_type", default, deserialize_with = "lenient::string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub priority: u32,
    #[serde(default, with = "lenient::datetime")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default, with = "lenient::datetime")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub target_roles: Vec<String>,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub show_banner: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub show_popup: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub dismissible: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub view_count: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub dismiss_count: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Announcement {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            content: String::new(),
            kind: "info".into(),
            priority: 0,
            start_date: None,
            end_date: None,
            target_roles: vec!["all".into()],
            show_banner: true,
            show_popup: false,
            dismissible: true,
            is_active: true,
            view_count: 0,
            dismiss_count: 0,
            extra: BTreeMap::new(),
        }
    }
}

impl Announcement {
    /// Active flag set and `now` inside the optional start/end window.
    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        self.is_active
            && self.start_date.is_none_or(|start| start <= now)
            && self.end_date.is_none_or(|end| now <= end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementStat {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(alias = "view_count", default, deserialize_with = "lenient::u32")]
    pub views: u32,
    #[serde(alias = "dismiss_count", default, deserialize_with = "lenient::u32")]
    pub dismissals: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementAnalytics {
    #[serde(default, deserialize_with = "lenient::u32")]
    pub total_views: u32,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub total_dismissals: u32,
    #[serde(alias = "announcements", default)]
    pub per_announcement: Vec<AnnouncementStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mailbox {
    #[serde(alias = "number", default, deserialize_with = "lenient::string")]
    pub mailbox: String,
    #[serde(alias = "fullname", default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(alias = "password", default, deserialize_with = "lenient::string")]
    pub pin: String,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
    #[serde(alias = "new_count", default, deserialize_with = "lenient::u32")]
    pub new_messages: u32,
    #[serde(alias = "old_count", default, deserialize_with = "lenient::u32")]
    pub old_messages: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self {
            mailbox: String::new(),
            name: String::new(),
            email: String::new(),
            pin: String::new(),
            enabled: true,
            new_messages: 0,
            old_messages: 0,
            extra: BTreeMap::new(),
        }
    }
}

/// Global voicemail toggles applied as defaults to every mailbox.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoicemailSettings {
    #[serde(default, deserialize_with = "lenient::bool")]
    pub email_notification: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub attach_audio: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub delete_after_email: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub transcription: bool,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub max_message_seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelpArticle {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(alias = "key", default, deserialize_with = "lenient::string")]
    pub help_key: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(alias = "body", default, deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub page_context: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub keywords: Vec<String>,
    #[serde(alias = "published", default, deserialize_with = "lenient::bool")]
    pub is_published: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(alias = "key", default, deserialize_with = "lenient::string")]
    pub module_key: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(alias = "requires", default, deserialize_with = "lenient::strings")]
    pub dependencies: Vec<String>,
    #[serde(alias = "is_installed", default, deserialize_with = "lenient::bool")]
    pub installed: bool,
    #[serde(alias = "is_enabled", default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default, deserialize_with = "lenient::string")]
    pub account_sid: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub auth_token: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub webhook_url: String,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub sms_enabled: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub voice_enabled: bool,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MattermostConfig {
    #[serde(default, deserialize_with = "lenient::string")]
    pub server_url: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub bot_token: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub team_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub default_channel: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub webhook_url: String,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub notify_missed_calls: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub notify_voicemail: bool,
    #[serde(default, deserialize_with = "lenient::u32")]
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleVoiceConfig {
    #[serde(default, deserialize_with = "lenient::string")]
    pub client_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub client_secret: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub refresh_token: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub sync_sms: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub sync_voicemail: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceStatus {
    #[serde(alias = "maintenance_mode", default, deserialize_with = "lenient::bool")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub allowed_roles: Vec<String>,
}

/// Outcome of a "Test Connection" press.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTest {
    #[serde(default, deserialize_with = "lenient::bool")]
    pub success: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extension_decodes_php_style_values() {
        let ext: Extension = serde_json::from_value(json!({
            "extension": 2001,
            "display_name": "Front Desk",
            "department": "sales",
            "codecs": "ulaw, g722",
            "enabled": "1",
            "status": "InUse",
            "permissions": {"international": 0, "outbound_calls": "yes"},
            "secret_hash": "abc"
        }))
        .unwrap();

        assert_eq!(ext.number, "2001");
        assert_eq!(ext.codecs, vec!["ulaw", "g722"]);
        assert!(ext.enabled);
        assert_eq!(ext.status, ExtensionStatus::Busy);
        assert!(ext.permissions.outbound_calls);
        assert!(!ext.permissions.international);
        assert_eq!(ext.extra.get("secret_hash"), Some(&json!("abc")));
    }

    #[test]
    fn extension_keeps_unknown_fields_on_reserialize() {
        let ext: Extension = serde_json::from_value(json!({
            "extension": "2001",
            "sip_secret_hint": "last rotated 2026-01-01"
        }))
        .unwrap();
        let back = serde_json::to_value(&ext).unwrap();
        assert_eq!(back["extension"], "2001");
        assert_eq!(back["sip_secret_hint"], "last rotated 2026-01-01");
    }

    #[test]
    fn queue_accepts_alternate_keys() {
        let q: CallQueue = serde_json::from_value(json!({
            "number": "600",
            "queue_name": "Support",
            "strategy": "rrmemory",
            "max_wait_time": "120"
        }))
        .unwrap();
        assert_eq!(q.queue_number, "600");
        assert_eq!(q.name, "Support");
        assert_eq!(q.max_wait_time, 120);
        assert!(!q.enabled);
    }

    #[test]
    fn announcement_window() {
        let a: Announcement = serde_json::from_value(json!({
            "id": 7,
            "title": "Planned outage",
            "type": "maintenance",
            "is_active": 1,
            "start_date": "2026-10-01 00:00:00",
            "end_date": "2026-10-31T23:59:00",
            "target_roles": ["admin", "supervisor"]
        }))
        .unwrap();
        let inside = lenient::datetime::parse("2026-10-19 12:00:00").unwrap();
        let after = lenient::datetime::parse("2026-11-02 08:00:00").unwrap();
        assert_eq!(a.kind, "maintenance");
        assert!(a.is_live(inside));
        assert!(!a.is_live(after));
    }

    #[test]
    fn zero_dates_are_treated_as_unset() {
        let a: Announcement = serde_json::from_value(json!({
            "start_date": "0000-00-00 00:00:00",
            "end_date": null
        }))
        .unwrap();
        assert_eq!(a.start_date, None);
        assert_eq!(a.end_date, None);
    }

    #[test]
    fn status_parsing_falls_back_to_unknown() {
        assert_eq!(ExtensionStatus::parse("Registered"), ExtensionStatus::Online);
        assert_eq!(ExtensionStatus::parse("dnd"), ExtensionStatus::Away);
        assert_eq!(ExtensionStatus::parse("UNAVAILABLE"), ExtensionStatus::Offline);
        assert_eq!(ExtensionStatus::parse("???"), ExtensionStatus::Unknown);
    }

    #[test]
    fn wallboard_nested_structure() {
        let wb: QueueWallboard = serde_json::from_value(json!({
            "calls_waiting": "2",
            "agents_available": 3,
            "agents_busy": 1,
            "agents_paused": 1,
            "avg_wait_time": 42.6,
            "members": [{"extension": "2001", "member_name": "Ann", "paused": "1", "paused_reason": "lunch"}],
            "waiting_calls": [{"callerid": "+15551234", "position": 1, "wait": 65}]
        }))
        .unwrap();
        assert_eq!(wb.calls_waiting, 2);
        assert_eq!(wb.avg_wait_time, 42);
        assert!(wb.members[0].paused);
        assert_eq!(wb.members[0].paused_reason.as_deref(), Some("lunch"));
        assert_eq!(wb.waiting_calls[0].caller_id, "+15551234");
        assert_eq!(wb.waiting_calls[0].wait_time, 65);
    }
}
