//! Per-page view-model: the cached list, its load/submit state and the
//! user's filter and selection.

use log::{debug, warn};

use crate::api::client::ApiClient;
use crate::api::resources::Resource;
use crate::bulk::Selection;
use crate::error::{ConsoleError, Result};
use crate::filter::Filter;
use crate::render::Table;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageState {
    #[default]
    Idle,
    Loading,
    Loaded,
    LoadError(String),
    Submitting,
    SubmitError(String),
}

impl PageState {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::Submitting)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::LoadError(e) | Self::SubmitError(e) => Some(e),
            _ => None,
        }
    }
}

/// Identifies one in-flight load. Only the most recent ticket may write to
/// the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    append: bool,
}

impl LoadTicket {
    /// Offset for "load more", `None` for a full reload.
    pub fn offset(&self, loaded: usize) -> Option<usize> {
        self.append.then_some(loaded)
    }

    /// Requests the rows this ticket stands for; `loaded` is the cache size
    /// when the ticket was issued.
    pub async fn fetch<R: Resource>(self, client: &ApiClient, loaded: usize) -> Result<Vec<R>> {
        client.list::<R>(self.offset(loaded)).await
    }
}

#[derive(Debug, Clone)]
pub struct ResourceStore<R: Resource> {
    items: Vec<R>,
    state: PageState,
    generation: u64,
    filter: Filter,
    selection: Selection,
}

impl<R: Resource> Default for ResourceStore<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            state: PageState::Idle,
            generation: 0,
            filter: Filter::default(),
            selection: Selection::default(),
        }
    }
}

impl<R: Resource> ResourceStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn visible(&self) -> Vec<&R> {
        self.filter.apply(&self.items)
    }

    /// Ids to send to a bulk endpoint: checked rows that are on screen.
    pub fn checked_ids(&self) -> Vec<String> {
        let visible = self.visible();
        self.selection.checked_in(visible.iter().map(|item| item.id()))
    }

    pub fn render(&self) -> Table {
        Table::build(&self.visible(), &self.selection)
    }

    /// `Idle|Loaded|LoadError|SubmitError → Loading`. Any older ticket
    /// still in flight becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.begin(false)
    }

    /// Like [`begin_load`](Self::begin_load) but the result is appended.
    pub fn begin_load_more(&mut self) -> LoadTicket {
        self.begin(true)
    }

    fn begin(&mut self, append: bool) -> LoadTicket {
        self.generation += 1;
        self.state = PageState::Loading;
        LoadTicket { generation: self.generation, append }
    }

    /// Applies a load result. Returns `false` and changes nothing when a
    /// newer load was started after this ticket was issued.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Vec<R>>) -> bool {
        if ticket.generation != self.generation {
            debug!("dropping stale {} response", R::NOUN);
            return false;
        }
        match result {
            Ok(items) => {
                if ticket.append {
                    self.items.extend(items);
                } else {
                    self.items = items;
                }
                let ids: Vec<String> = self.items.iter().map(|i| i.id().to_string()).collect();
                self.selection.retain(ids.iter().map(String::as_str));
                self.state = PageState::Loaded;
            }
            Err(e) => {
                warn!("loading {} failed: {e}", R::TITLE);
                self.state = PageState::LoadError(e.to_string());
            }
        }
        true
    }

    /// Updates one cached entry in place (poller patches) without touching
    /// the page state.
    pub fn patch(&mut self, id: &str, f: impl FnOnce(&mut R)) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    /// Drops the cache; the next activation loads from scratch.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.items.clear();
        self.selection.clear();
        self.state = PageState::Idle;
    }

    /// `Loaded|SubmitError → Submitting`. Refused while another request of
    /// this page is outstanding.
    pub fn begin_submit(&mut self) -> Result<()> {
        if self.state.is_busy() {
            return Err(ConsoleError::precondition("Please wait for the current request to finish."));
        }
        self.state = PageState::Submitting;
        Ok(())
    }

    pub fn finish_submit<T>(&mut self, result: &Result<T>) {
        self.state = match result {
            Ok(_) => PageState::Loaded,
            Err(e) => PageState::SubmitError(e.to_string()),
        };
    }

    /// Checked rows that are on screen; refused when there are none.
    pub fn bulk_ids(&self) -> Result<Vec<String>> {
        let ids = self.checked_ids();
        if ids.is_empty() {
            return Err(ConsoleError::precondition(format!("Select at least one {} first.", R::NOUN)));
        }
        Ok(ids)
    }

    /// [`bulk_ids`](Self::bulk_ids) plus the `Submitting` transition.
    pub fn begin_bulk(&mut self) -> Result<Vec<String>> {
        let ids = self.bulk_ids()?;
        self.begin_submit()?;
        Ok(ids)
    }

    /// A successful bulk action clears the selection.
    pub fn finish_bulk<T>(&mut self, result: &Result<T>) {
        self.finish_submit(result);
        if result.is_ok() {
            self.selection.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{CallQueue, Extension};
    use crate::bulk::BulkAction;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn queue(number: &str, name: &str) -> CallQueue {
        CallQueue { queue_number: number.into(), name: name.into(), ..Default::default() }
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut store = ResourceStore::<CallQueue>::new();
        let first = store.begin_load();
        let second = store.begin_load();

        assert!(store.finish_load(second, Ok(vec![queue("600", "Fresh")])));
        assert!(!store.finish_load(first, Ok(vec![queue("600", "Stale"), queue("601", "Stale")])));

        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].name, "Fresh");
        assert_eq!(store.state(), &PageState::Loaded);
    }

    #[test]
    fn load_error_keeps_server_message() {
        let mut store = ResourceStore::<CallQueue>::new();
        let ticket = store.begin_load();
        store.finish_load(ticket, Err(ConsoleError::Api("Asterisk is not running".into())));
        assert_eq!(store.state(), &PageState::LoadError("Asterisk is not running".into()));
        assert_eq!(store.state().error(), Some("Asterisk is not running"));
    }

    #[test]
    fn invalidate_resets_to_idle_and_orphans_inflight_loads() {
        let mut store = ResourceStore::<CallQueue>::new();
        let ticket = store.begin_load();
        store.invalidate();
        assert!(!store.finish_load(ticket, Ok(vec![queue("600", "Support")])));
        assert_eq!(store.state(), &PageState::Idle);
        assert!(store.items().is_empty());
    }

    #[test]
    fn load_more_appends() {
        let mut store = ResourceStore::<CallQueue>::new();
        let t = store.begin_load();
        store.finish_load(t, Ok(vec![queue("600", "A")]));
        let t = store.begin_load_more();
        assert_eq!(t.offset(store.items().len()), Some(1));
        store.finish_load(t, Ok(vec![queue("601", "B")]));
        assert_eq!(store.items().len(), 2);
    }

    #[test]
    fn submit_is_refused_while_loading() {
        let mut store = ResourceStore::<CallQueue>::new();
        store.begin_load();
        assert!(store.begin_submit().unwrap_err().is_precondition());
    }

    #[test]
    fn submit_transitions() {
        let mut store = ResourceStore::<CallQueue>::new();
        let t = store.begin_load();
        store.finish_load(t, Ok(vec![]));
        store.begin_submit().unwrap();
        assert_eq!(store.state(), &PageState::Submitting);
        store.finish_submit::<()>(&Err(ConsoleError::Api("Duplicate queue".into())));
        assert_eq!(store.state(), &PageState::SubmitError("Duplicate queue".into()));
        store.begin_submit().unwrap();
        store.finish_submit(&Ok(()));
        assert_eq!(store.state(), &PageState::Loaded);
    }

    #[test]
    fn checked_ids_ignore_filtered_out_rows() {
        let mut store = ResourceStore::<Extension>::new();
        let t = store.begin_load();
        store.finish_load(
            t,
            Ok(vec![
                Extension { number: "2001".into(), department: "sales".into(), ..Default::default() },
                Extension { number: "2002".into(), department: "support".into(), ..Default::default() },
                Extension { number: "2003".into(), department: "sales".into(), ..Default::default() },
            ]),
        );
        store.selection_mut().set("2001", true);
        store.selection_mut().set("2002", true);
        store.selection_mut().set("2003", true);
        store.filter_mut().set_facet("department", Some("sales"));
        assert_eq!(store.checked_ids(), vec!["2001", "2003"]);
    }

    async fn reload<R: Resource>(store: &mut ResourceStore<R>, client: &ApiClient) {
        let ticket = store.begin_load();
        let result = ticket.fetch::<R>(client, store.items().len()).await;
        assert!(store.finish_load(ticket, result));
    }

    #[tokio::test]
    async fn bulk_sends_exactly_the_checked_rows_then_reloads() {
        let server = MockServer::start().await;
        let rows = json!({"success": true, "extensions": [
            {"extension": "2001"}, {"extension": "2002"}, {"extension": "2003"}
        ]});
        Mock::given(method("GET"))
            .and(query_param("path", "list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&rows))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(query_param("path", "bulk_disable"))
            .and(body_json(json!({"extensions": ["2001", "2003"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "updated": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let mut store = ResourceStore::<Extension>::new();
        reload(&mut store, &client).await;
        store.selection_mut().set("2003", true);
        store.selection_mut().set("2001", true);

        let ids = store.begin_bulk().unwrap();
        assert_eq!(store.state(), &PageState::Submitting);
        let result = client.bulk::<Extension>(BulkAction::Disable, &ids).await;
        store.finish_bulk(&result);
        assert!(result.is_ok());
        assert!(store.checked_ids().is_empty());
        reload(&mut store, &client).await;
        assert_eq!(store.state(), &PageState::Loaded);
    }

    #[test]
    fn bulk_with_nothing_checked_is_refused_before_submitting() {
        let mut store = ResourceStore::<Extension>::new();
        let err = store.begin_bulk().unwrap_err();
        assert_eq!(err.to_string(), "Select at least one extension first.");
        assert_eq!(store.state(), &PageState::Idle);
    }

    #[test]
    fn failed_bulk_keeps_the_selection() {
        let mut store = ResourceStore::<Extension>::new();
        let t = store.begin_load();
        store.finish_load(t, Ok(vec![Extension { number: "2001".into(), ..Default::default() }]));
        store.selection_mut().set("2001", true);
        store.begin_bulk().unwrap();
        store.finish_bulk::<()>(&Err(ConsoleError::Api("Extension 2001 is in use".into())));
        assert_eq!(store.checked_ids(), vec!["2001"]);
        assert_eq!(store.state().error(), Some("Extension 2001 is in use"));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_the_error_variant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("path", "list"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let mut store = ResourceStore::<CallQueue>::new();
        let ticket = store.begin_load();
        let result = ticket.fetch::<CallQueue>(&client, 0).await;
        assert!(matches!(result, Err(ConsoleError::Http { status: 502, .. })));
        store.finish_load(ticket, result);
        assert!(matches!(store.state(), PageState::LoadError(_)));
    }

    #[tokio::test]
    async fn reload_with_same_response_renders_identically() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("path", "list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": [
                {"queue_number": "600", "name": "Support", "strategy": "ringall"},
                {"queue_number": "601", "name": "Sales", "strategy": "rrmemory"}
            ]})))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let mut store = ResourceStore::<CallQueue>::new();
        reload(&mut store, &client).await;
        let first = store.render();
        reload(&mut store, &client).await;
        assert_eq!(store.render(), first);
    }
}
