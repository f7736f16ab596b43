//! Create/edit drafts behind the modal dialogs.
//!
//! A draft holds the text of every field as the user sees it. Nothing is
//! sent until [`FormDraft::submit`], which refuses to issue a request while
//! required fields are blank. Field keys may be dotted (`permissions.international`)
//! and are folded into nested objects in the payload.

use std::collections::BTreeMap;

use log::{debug, info};
use serde_json::{Map, Value};

use crate::api::client::ApiClient;
use crate::api::envelope::Envelope;
use crate::api::models::lenient;
use crate::api::resources::Resource;
use crate::error::{ConsoleError, Result};
use crate::integrations::is_masked;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Multiline,
    Number,
    Toggle,
    Choice(&'static [&'static str]),
    /// PINs and passwords; left out of the payload when untouched.
    Secret,
    /// Comma separated in the form, a JSON array on the wire.
    List,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { key, label, kind, required: false }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    Edit(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

#[derive(Debug, Clone)]
pub struct FormDraft {
    mode: DraftMode,
    fields: &'static [FieldSpec],
    values: BTreeMap<&'static str, FieldValue>,
    /// Serialized entry the draft started from; fields outside the form
    /// ride along untouched.
    base: Value,
}

impl FormDraft {
    /// "New": every field reset to the resource's defaults.
    pub fn create<R: Resource>() -> Result<Self> {
        let base = serde_json::to_value(R::default())?;
        Ok(Self::from_base(DraftMode::Create, R::FIELDS, base))
    }

    /// "Edit": fields populated from a cached entry.
    pub fn edit<R: Resource>(item: &R) -> Result<Self> {
        let base = serde_json::to_value(item)?;
        Ok(Self::from_base(DraftMode::Edit(item.id().to_string()), R::FIELDS, base))
    }

    /// Draft over a single settings row (integrations, global toggles).
    pub fn settings<T: serde::Serialize>(fields: &'static [FieldSpec], current: &T) -> Result<Self> {
        let base = serde_json::to_value(current)?;
        Ok(Self::from_base(DraftMode::Edit(String::new()), fields, base))
    }

    /// Payload decoded back into a typed settings row.
    pub fn to_typed<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_payload()?)?)
    }

    fn from_base(mode: DraftMode, fields: &'static [FieldSpec], base: Value) -> Self {
        let values = fields
            .iter()
            .map(|spec| {
                let raw = lookup(&base, spec.key);
                let value = match spec.kind {
                    FieldKind::Toggle => FieldValue::Flag(raw.is_some_and(lenient::truthy)),
                    FieldKind::List => {
                        FieldValue::Text(raw.map(lenient::list).unwrap_or_default().join(", "))
                    }
                    _ => FieldValue::Text(raw.map(lenient::text).unwrap_or_default()),
                };
                (spec.key, value)
            })
            .collect();
        Self { mode, fields, values, base }
    }

    pub fn mode(&self) -> &DraftMode {
        &self.mode
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn text(&self, key: &str) -> &str {
        match self.values.get(key) {
            Some(FieldValue::Text(s)) => s,
            _ => "",
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(FieldValue::Flag(true)))
    }

    pub fn set_text(&mut self, key: &str, value: impl Into<String>) {
        if let Some(slot) = self.values.get_mut(key) {
            *slot = FieldValue::Text(value.into());
        }
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        if let Some(slot) = self.values.get_mut(key) {
            *slot = FieldValue::Flag(value);
        }
    }

    /// Labels of required fields that are still blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|spec| spec.required && spec.kind != FieldKind::Toggle)
            .filter(|spec| self.text(spec.key).trim().is_empty())
            .map(|spec| spec.label)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConsoleError::precondition(format!("Please fill in: {}", missing.join(", "))))
        }
    }

    /// Folds the fields over the base entry into one JSON body.
    pub fn to_payload(&self) -> Result<Value> {
        self.validate()?;
        let mut payload = self.base.clone();
        if !payload.is_object() {
            payload = Value::Object(Map::new());
        }
        for spec in self.fields {
            let text = self.text(spec.key).trim();
            let value = match spec.kind {
                FieldKind::Toggle => Value::Bool(self.flag(spec.key)),
                FieldKind::Number if text.is_empty() => Value::from(0),
                FieldKind::Number => text.parse::<u64>().map(Value::from).map_err(|_| {
                    ConsoleError::precondition(format!("{} must be a whole number", spec.label))
                })?,
                FieldKind::List => Value::from(lenient::list(&Value::from(text))),
                FieldKind::DateTime if text.is_empty() => Value::Null,
                FieldKind::DateTime => match lenient::datetime::parse(text) {
                    Some(dt) => Value::from(dt.format(lenient::datetime::FORMAT).to_string()),
                    None => {
                        return Err(ConsoleError::precondition(format!(
                            "{} is not a valid date",
                            spec.label
                        )));
                    }
                },
                FieldKind::Secret if text.is_empty() || is_masked(text) => {
                    remove_path(&mut payload, spec.key);
                    continue;
                }
                FieldKind::Text if text.is_empty() && is_optional_path(spec.key) => Value::Null,
                _ => Value::from(text.to_string()),
            };
            insert_path(&mut payload, spec.key, value);
        }
        Ok(payload)
    }

    /// Create via POST, edit via the resource's update verb.
    pub async fn submit<R: Resource>(&self, client: &ApiClient) -> Result<Envelope> {
        let payload = self.to_payload()?;
        match &self.mode {
            DraftMode::Create => {
                info!("creating {}", R::NOUN);
                client.create::<R>(&payload).await
            }
            DraftMode::Edit(id) => {
                debug!("updating {} {id}", R::NOUN);
                client.update::<R>(id, &payload).await
            }
        }
    }
}

/// Forwarding targets are `null` rather than `""` when cleared.
fn is_optional_path(key: &str) -> bool {
    key.starts_with("forwarding.")
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, part| node.get(part))
}

fn insert_path(root: &mut Value, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else { return };
    let mut node = root;
    for part in parts {
        let map = match node {
            Value::Object(map) => map,
            other => {
                *other = Value::Object(Map::new());
                match other {
                    Value::Object(map) => map,
                    _ => return,
                }
            }
        };
        node = map.entry(part).or_insert_with(|| Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.to_string(), value);
    }
}

fn remove_path(root: &mut Value, path: &str) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else { return };
    let mut node = root;
    for part in parts {
        match node.get_mut(part) {
            Some(next) => node = next,
            None => return,
        }
    }
    if let Value::Object(map) = node {
        map.remove(last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Announcement, CallQueue, Extension, Mailbox};
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_extension() -> Extension {
        serde_json::from_value(json!({
            "extension": "2001",
            "display_name": "Front Desk",
            "username": "frontdesk",
            "department": "sales",
            "permissions": {"outbound_calls": true, "international": false},
            "forwarding": {"busy": "2002"},
            "provisioning_mac": "00:11:22:33:44:55"
        }))
        .unwrap()
    }

    #[test]
    fn new_draft_starts_from_defaults() {
        let draft = FormDraft::create::<CallQueue>().unwrap();
        assert_eq!(draft.mode(), &DraftMode::Create);
        assert_eq!(draft.text("strategy"), "ringall");
        assert_eq!(draft.text("timeout"), "15");
        assert!(draft.flag("enabled"));
        assert_eq!(draft.text("queue_number"), "");
    }

    #[test]
    fn edit_draft_is_populated_from_entry() {
        let draft = FormDraft::edit(&sample_extension()).unwrap();
        assert_eq!(draft.mode(), &DraftMode::Edit("2001".into()));
        assert_eq!(draft.text("display_name"), "Front Desk");
        assert_eq!(draft.text("forwarding.busy"), "2002");
        assert!(draft.flag("permissions.outbound_calls"));
        assert!(!draft.flag("permissions.international"));
    }

    #[test]
    fn payload_nests_dotted_fields_and_keeps_unknown_ones() {
        let mut draft = FormDraft::edit(&sample_extension()).unwrap();
        draft.set_flag("permissions.international", true);
        draft.set_text("codecs", "g722, ulaw,");
        draft.set_text("forwarding.busy", "");

        let payload = draft.to_payload().unwrap();
        assert_eq!(payload["permissions"]["international"], json!(true));
        assert_eq!(payload["permissions"]["outbound_calls"], json!(true));
        assert_eq!(payload["codecs"], json!(["g722", "ulaw"]));
        assert_eq!(payload["forwarding"]["busy"], Value::Null);
        assert_eq!(payload["provisioning_mac"], json!("00:11:22:33:44:55"));
    }

    #[test]
    fn missing_required_fields_are_reported_by_label() {
        let mut draft = FormDraft::create::<Extension>().unwrap();
        draft.set_text("extension", "2005");
        let err = draft.to_payload().unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(err.to_string(), "Please fill in: Display name, Username");
    }

    #[test]
    fn number_fields_must_parse() {
        let mut draft = FormDraft::create::<CallQueue>().unwrap();
        draft.set_text("queue_number", "600");
        draft.set_text("name", "Support");
        draft.set_text("timeout", "fifteen");
        let err = draft.to_payload().unwrap_err();
        assert_eq!(err.to_string(), "Ring timeout (s) must be a whole number");
    }

    #[test]
    fn masked_secret_is_not_sent_back() {
        let mailbox = Mailbox { mailbox: "2001".into(), name: "Ann".into(), pin: "****".into(), ..Default::default() };
        let draft = FormDraft::edit(&mailbox).unwrap();
        let payload = draft.to_payload().unwrap();
        assert!(payload.get("pin").is_none());

        let mut draft = FormDraft::edit(&mailbox).unwrap();
        draft.set_text("pin", "4321");
        assert_eq!(draft.to_payload().unwrap()["pin"], json!("4321"));
    }

    #[test]
    fn dates_are_normalized_to_mysql_format() {
        let mut draft = FormDraft::create::<Announcement>().unwrap();
        draft.set_text("title", "Holiday hours");
        draft.set_text("content", "<p>Closed Monday</p>");
        draft.set_text("start_date", "2026-12-24T17:00");
        let payload = draft.to_payload().unwrap();
        assert_eq!(payload["start_date"], json!("2026-12-24 17:00:00"));
        assert_eq!(payload["end_date"], Value::Null);
        assert_eq!(payload["target_roles"], json!(["all"]));
    }

    #[test]
    fn settings_draft_round_trips_to_typed_row() {
        use crate::api::models::TwilioConfig;
        use crate::integrations::IntegrationConfig;

        let current = TwilioConfig {
            account_sid: "AC1".into(),
            auth_token: "****".into(),
            phone_number: "+15550100".into(),
            ..Default::default()
        };
        let mut draft = FormDraft::settings(TwilioConfig::FIELDS, &current).unwrap();
        draft.set_flag("sms_enabled", true);
        let cfg: TwilioConfig = draft.to_typed().unwrap();
        assert_eq!(cfg.account_sid, "AC1");
        assert!(cfg.sms_enabled);
        assert_eq!(cfg.auth_token, "");
    }

    #[tokio::test]
    async fn blank_required_field_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), std::time::Duration::from_secs(5)).unwrap();
        let draft = FormDraft::create::<CallQueue>().unwrap();
        let err = draft.submit::<CallQueue>(&client).await.unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn edit_submits_with_the_resource_update_verb() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(query_param("path", "update"))
            .and(query_param("id", "2001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), std::time::Duration::from_secs(5)).unwrap();
        let draft = FormDraft::edit(&sample_extension()).unwrap();
        draft.submit::<Extension>(&client).await.unwrap();
    }
}
