//! Per-resource knowledge: which PHP file serves it, which verbs it takes,
//! how its rows are searched, rendered and edited.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::models::{
    ANNOUNCEMENT_TYPES, Announcement, CallQueue, Extension, HelpArticle, Mailbox, Module,
    QUEUE_STRATEGIES,
};
use crate::form::{FieldKind, FieldSpec};

/// Endpoint table for one resource class.
///
/// The server is treated as a black box: some files take `PUT` for updates,
/// others `POST ...?path=update&id=`. The table records what each expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub file: &'static str,
    /// Key the list may be wrapped under besides `data`/`items`.
    pub list_key: &'static str,
    /// Key of the id array in `bulk_*` bodies.
    pub bulk_key: &'static str,
    pub update_verb: Option<Verb>,
    pub creatable: bool,
    pub deletable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
        }
    }
}

pub trait Resource: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    const ENDPOINT: Endpoint;
    /// Page title, e.g. "Extensions".
    const TITLE: &'static str;
    /// Singular noun used in prompts ("Select at least one extension").
    const NOUN: &'static str;
    const COLUMNS: &'static [&'static str];
    /// Extra page level buttons next to "New".
    const PAGE_ACTIONS: &'static [&'static str] = &[];
    /// Dropdown facets offered by the page: (facet name, label).
    const FACETS: &'static [(&'static str, &'static str)] = &[];
    const FIELDS: &'static [FieldSpec];

    /// Unique key, also used as the `id` query parameter.
    fn id(&self) -> &str;

    /// Concatenated free-text fields the search box matches against.
    fn search_text(&self) -> String;

    /// Value of an equality facet (department, category, status, ...).
    fn facet(&self, _name: &str) -> Option<String> {
        None
    }

    fn cells(&self) -> Vec<String>;

    fn status_dot(&self) -> Option<crate::api::models::ExtensionStatus> {
        None
    }
}

fn yes_no(b: bool) -> String {
    if b { "Yes".into() } else { "No".into() }
}

fn enabled_label(b: bool) -> String {
    if b { "Enabled".into() } else { "Disabled".into() }
}

impl Resource for Extension {
    const ENDPOINT: Endpoint = Endpoint {
        file: "api/extensions.php",
        list_key: "extensions",
        bulk_key: "extensions",
        update_verb: Some(Verb::Put),
        creatable: true,
        deletable: true,
    };
    const TITLE: &'static str = "Extensions";
    const NOUN: &'static str = "extension";
    const COLUMNS: &'static [&'static str] = &["Extension", "Name", "Department", "Device", "Status", "State"];
    const PAGE_ACTIONS: &'static [&'static str] = &["Migrate Users"];
    const FACETS: &'static [(&'static str, &'static str)] =
        &[("department", "Department"), ("status", "Status"), ("device_type", "Device")];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("extension", "Extension", FieldKind::Text).required(),
        FieldSpec::new("display_name", "Display name", FieldKind::Text).required(),
        FieldSpec::new("username", "Username", FieldKind::Text).required(),
        FieldSpec::new("department", "Department", FieldKind::Text),
        FieldSpec::new("device_type", "Device type", FieldKind::Choice(&["sip", "pjsip", "webrtc", "iax2"])),
        FieldSpec::new("codecs", "Codecs", FieldKind::List),
        FieldSpec::new("enabled", "Enabled", FieldKind::Toggle),
        FieldSpec::new("permissions.outbound_calls", "Outbound calls", FieldKind::Toggle),
        FieldSpec::new("permissions.international", "International", FieldKind::Toggle),
        FieldSpec::new("permissions.call_recording", "Call recording", FieldKind::Toggle),
        FieldSpec::new("permissions.voicemail_access", "Voicemail access", FieldKind::Toggle),
        FieldSpec::new("permissions.admin_portal", "Admin portal", FieldKind::Toggle),
        FieldSpec::new("voicemail.enabled", "Voicemail", FieldKind::Toggle),
        FieldSpec::new("voicemail.email", "Voicemail email", FieldKind::Text),
        FieldSpec::new("voicemail.attach_audio", "Attach audio", FieldKind::Toggle),
        FieldSpec::new("forwarding.always", "Forward always", FieldKind::Text),
        FieldSpec::new("forwarding.busy", "Forward when busy", FieldKind::Text),
        FieldSpec::new("forwarding.no_answer", "Forward on no answer", FieldKind::Text),
        FieldSpec::new("forwarding.unavailable", "Forward when unavailable", FieldKind::Text),
        FieldSpec::new("forwarding.ring_timeout", "Ring timeout (s)", FieldKind::Number),
    ];

    fn id(&self) -> &str {
        &self.number
    }

    fn search_text(&self) -> String {
        format!("{} {} {} {}", self.number, self.display_name, self.username, self.department)
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "department" => Some(self.department.clone()),
            "status" => Some(self.status.as_str().to_string()),
            "device_type" => Some(self.device_type.clone()),
            _ => None,
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.number.clone(),
            self.display_name.clone(),
            self.department.clone(),
            self.device_type.clone(),
            self.status.as_str().to_string(),
            enabled_label(self.enabled),
        ]
    }

    fn status_dot(&self) -> Option<crate::api::models::ExtensionStatus> {
        Some(self.status)
    }
}

impl Resource for CallQueue {
    const ENDPOINT: Endpoint = Endpoint {
        file: "api/call-queues.php",
        list_key: "queues",
        bulk_key: "queues",
        update_verb: Some(Verb::Post),
        creatable: true,
        deletable: true,
    };
    const TITLE: &'static str = "Manage Queues";
    const NOUN: &'static str = "queue";
    const COLUMNS: &'static [&'static str] = &["Queue", "Name", "Strategy", "Members", "Max wait", "State"];
    const PAGE_ACTIONS: &'static [&'static str] = &["Apply Configuration"];
    const FACETS: &'static [(&'static str, &'static str)] = &[("strategy", "Strategy")];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("queue_number", "Queue number", FieldKind::Text).required(),
        FieldSpec::new("name", "Name", FieldKind::Text).required(),
        FieldSpec::new("strategy", "Strategy", FieldKind::Choice(QUEUE_STRATEGIES)).required(),
        FieldSpec::new("timeout", "Ring timeout (s)", FieldKind::Number),
        FieldSpec::new("retry", "Retry (s)", FieldKind::Number),
        FieldSpec::new("max_wait_time", "Max wait (s)", FieldKind::Number),
        FieldSpec::new("max_callers", "Max callers", FieldKind::Number),
        FieldSpec::new("announce_frequency", "Announce every (s)", FieldKind::Number),
        FieldSpec::new("announce_position", "Announce position", FieldKind::Toggle),
        FieldSpec::new("announce_holdtime", "Announce hold time", FieldKind::Toggle),
        FieldSpec::new("music_on_hold", "Music on hold", FieldKind::Text),
        FieldSpec::new("enabled", "Enabled", FieldKind::Toggle),
    ];

    fn id(&self) -> &str {
        &self.queue_number
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.queue_number, self.name, self.strategy)
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "strategy" => Some(self.strategy.clone()),
            _ => None,
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.queue_number.clone(),
            self.name.clone(),
            self.strategy.clone(),
            self.member_count.to_string(),
            crate::render::format_duration(self.max_wait_time),
            enabled_label(self.enabled),
        ]
    }
}

impl Resource for Announcement {
    const ENDPOINT: Endpoint = Endpoint {
        file: "api/announcements.php",
        list_key: "announcements",
        bulk_key: "announcements",
        update_verb: Some(Verb::Put),
        creatable: true,
        deletable: true,
    };
    const TITLE: &'static str = "Announcements";
    const NOUN: &'static str = "announcement";
    const COLUMNS: &'static [&'static str] = &["Title", "Type", "Priority", "Audience", "Views", "Dismissed", "Active", "Live"];
    const PAGE_ACTIONS: &'static [&'static str] = &["Analytics"];
    const FACETS: &'static [(&'static str, &'static str)] = &[("type", "Type"), ("active", "Active")];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("title", "Title", FieldKind::Text).required(),
        FieldSpec::new("content", "Content (HTML)", FieldKind::Multiline).required(),
        FieldSpec::new("type", "Type", FieldKind::Choice(ANNOUNCEMENT_TYPES)),
        FieldSpec::new("priority", "Priority", FieldKind::Number),
        FieldSpec::new("start_date", "Starts", FieldKind::DateTime),
        FieldSpec::new("end_date", "Ends", FieldKind::DateTime),
        FieldSpec::new("target_roles", "Target roles", FieldKind::List),
        FieldSpec::new("show_banner", "Show banner", FieldKind::Toggle),
        FieldSpec::new("show_popup", "Show popup", FieldKind::Toggle),
        FieldSpec::new("dismissible", "Dismissible", FieldKind::Toggle),
        FieldSpec::new("is_active", "Active", FieldKind::Toggle),
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "type" => Some(self.kind.clone()),
            "active" => Some(yes_no(self.is_active)),
            _ => None,
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.kind.clone(),
            self.priority.to_string(),
            self.target_roles.join(", "),
            self.view_count.to_string(),
            self.dismiss_count.to_string(),
            yes_no(self.is_active),
            yes_no(self.is_live(chrono::Local::now().naive_local())),
        ]
    }
}

impl Resource for Mailbox {
    const ENDPOINT: Endpoint = Endpoint {
        file: "api/voicemail.php",
        list_key: "mailboxes",
        bulk_key: "mailboxes",
        update_verb: Some(Verb::Put),
        creatable: true,
        deletable: true,
    };
    const TITLE: &'static str = "Voicemail";
    const NOUN: &'static str = "mailbox";
    const COLUMNS: &'static [&'static str] = &["Mailbox", "Name", "Email", "New", "Old", "State"];
    const PAGE_ACTIONS: &'static [&'static str] = &["Global Settings"];
    const FACETS: &'static [(&'static str, &'static str)] = &[("enabled", "State")];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("mailbox", "Mailbox", FieldKind::Text).required(),
        FieldSpec::new("name", "Name", FieldKind::Text).required(),
        FieldSpec::new("email", "Email", FieldKind::Text),
        FieldSpec::new("pin", "PIN", FieldKind::Secret),
        FieldSpec::new("enabled", "Enabled", FieldKind::Toggle),
    ];

    fn id(&self) -> &str {
        &self.mailbox
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.mailbox, self.name, self.email)
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "enabled" => Some(enabled_label(self.enabled)),
            _ => None,
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.mailbox.clone(),
            self.name.clone(),
            self.email.clone(),
            self.new_messages.to_string(),
            self.old_messages.to_string(),
            enabled_label(self.enabled),
        ]
    }
}

/// Global voicemail toggles, edited from the Voicemail page.
pub const VOICEMAIL_SETTINGS_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("email_notification", "Email notification", FieldKind::Toggle),
    FieldSpec::new("attach_audio", "Attach audio", FieldKind::Toggle),
    FieldSpec::new("delete_after_email", "Delete after email", FieldKind::Toggle),
    FieldSpec::new("transcription", "Transcription", FieldKind::Toggle),
    FieldSpec::new("max_message_seconds", "Max message length (s)", FieldKind::Number),
];

impl Resource for HelpArticle {
    const ENDPOINT: Endpoint = Endpoint {
        file: "api/help-articles.php",
        list_key: "articles",
        bulk_key: "articles",
        update_verb: Some(Verb::Post),
        creatable: true,
        deletable: true,
    };
    const TITLE: &'static str = "Help Articles";
    const NOUN: &'static str = "article";
    const COLUMNS: &'static [&'static str] = &["Key", "Title", "Category", "Page", "Published"];
    const FACETS: &'static [(&'static str, &'static str)] =
        &[("category", "Category"), ("published", "Published")];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("help_key", "Key", FieldKind::Text).required(),
        FieldSpec::new("title", "Title", FieldKind::Text).required(),
        FieldSpec::new("category", "Category", FieldKind::Text).required(),
        FieldSpec::new("content", "Body (HTML)", FieldKind::Multiline),
        FieldSpec::new("page_context", "Page", FieldKind::Text),
        FieldSpec::new("keywords", "Keywords", FieldKind::List),
        FieldSpec::new("is_published", "Published", FieldKind::Toggle),
    ];

    fn id(&self) -> &str {
        if self.id.is_empty() { &self.help_key } else { &self.id }
    }

    fn search_text(&self) -> String {
        format!("{} {} {} {}", self.help_key, self.title, self.content, self.keywords.join(" "))
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "category" => Some(self.category.clone()),
            "published" => Some(yes_no(self.is_published)),
            _ => None,
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.help_key.clone(),
            self.title.clone(),
            self.category.clone(),
            self.page_context.clone(),
            yes_no(self.is_published),
        ]
    }
}

impl Resource for Module {
    const ENDPOINT: Endpoint = Endpoint {
        file: "api/modules.php",
        list_key: "modules",
        bulk_key: "modules",
        update_verb: None,
        creatable: false,
        deletable: false,
    };
    const TITLE: &'static str = "Modules";
    const NOUN: &'static str = "module";
    const COLUMNS: &'static [&'static str] = &["Module", "Name", "Version", "Category", "Requires", "Installed", "State"];
    const FACETS: &'static [(&'static str, &'static str)] = &[("category", "Category"), ("installed", "Installed")];
    const FIELDS: &'static [FieldSpec] = &[];

    fn id(&self) -> &str {
        &self.module_key
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.module_key, self.name, self.category)
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "category" => Some(self.category.clone()),
            "installed" => Some(yes_no(self.installed)),
            _ => None,
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.module_key.clone(),
            self.name.clone(),
            self.version.clone(),
            self.category.clone(),
            self.dependencies.join(", "),
            yes_no(self.installed),
            enabled_label(self.enabled),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_match_columns() {
        assert_eq!(Extension::default().cells().len(), Extension::COLUMNS.len());
        assert_eq!(CallQueue::default().cells().len(), CallQueue::COLUMNS.len());
        assert_eq!(Announcement::default().cells().len(), Announcement::COLUMNS.len());
        assert_eq!(Mailbox::default().cells().len(), Mailbox::COLUMNS.len());
        assert_eq!(HelpArticle::default().cells().len(), HelpArticle::COLUMNS.len());
        assert_eq!(Module::default().cells().len(), Module::COLUMNS.len());
    }

    #[test]
    fn update_verbs_follow_each_endpoint() {
        assert_eq!(Extension::ENDPOINT.update_verb, Some(Verb::Put));
        assert_eq!(CallQueue::ENDPOINT.update_verb, Some(Verb::Post));
        assert_eq!(Module::ENDPOINT.update_verb, None);
        assert!(!Module::ENDPOINT.deletable);
    }

    #[test]
    fn expired_announcement_is_active_but_not_live() {
        let a: Announcement = serde_json::from_value(serde_json::json!({
            "id": 7, "title": "Old outage", "is_active": 1, "end_date": "2020-01-01 00:00:00"
        }))
        .unwrap();
        let cells = a.cells();
        assert_eq!(cells[6], yes_no(true));
        assert_eq!(cells[7], yes_no(false));
    }

    #[test]
    fn help_article_falls_back_to_key_for_id() {
        let a = HelpArticle { help_key: "queues.strategy".into(), ..Default::default() };
        assert_eq!(a.id(), "queues.strategy");
    }
}
