//! Scripted stand-in for the SEI portal
//!
//! `FakePortal` implements `Browser` over an in-memory model of the portal:
//! a login page, the control page with its unit dropdown and paginated record
//! list, and record views with the two nested frames. Every call is logged so
//! tests can assert on what the crawler did.

use async_trait::async_trait;
use sei_harvester::browser::{Browser, BrowserError, BrowserResult, Cookie, OptionChoice};
use sei_harvester::config::{parse_config, Config};
use sei_harvester::crawler::selectors::*;
use sei_harvester::session::{FileKvStore, SessionStore};
use sei_harvester::storage::{
    CommitStep, ProcessRecord, RecordStore, StorageError, StorageResult, StoredRecord,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

pub const ENTRY_URL: &str = "https://sei.test/sip/login.php?sigla_orgao_sistema=GOV-PI&sigla_sistema=SEI";
pub const LIST_URL: &str = "https://sei.test/sei/controlador.php?acao=procedimento_controlar";
pub const ORGANIZATION: &str = "SESAPI-PI";
pub const USERNAME: &str = "robot@sei.test";
pub const PASSWORD: &str = "s3cret";
pub const SESSION_TOKEN: &str = "valid-session";

/// URL of the detail view of record `id`
pub fn record_url(id: u32) -> String {
    format!(
        "https://sei.test/sei/controlador.php?acao=procedimento_trabalhar&id_procedimento={}",
        id
    )
}

/// One record of a unit's list
#[derive(Debug, Clone)]
pub struct FakeRecord {
    pub id: u32,
    pub label: String,
    pub tooltip: String,
    /// Cells of the history table's second row; `None` for no history table
    /// and an empty row for a table with only its header
    pub history: Option<Vec<String>>,
    /// Whether the detail view ever shows the document tree frame
    pub tree_frame: bool,
}

impl FakeRecord {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            label: format!("00012.{:06}/2026-11", id),
            tooltip: format!("return infraTooltipMostrar('Processo','Assunto {}');", id),
            history: Some(vec![
                "19/10/2026 14:32".to_string(),
                "SESAPI-GAB".to_string(),
                "maria.silva".to_string(),
                format!("Recebido {}", id),
                id.to_string(),
            ]),
            tree_frame: true,
        }
    }

    pub fn without_history(mut self) -> Self {
        self.history = None;
        self
    }

    pub fn with_header_only_history(mut self) -> Self {
        self.history = Some(Vec::new());
        self
    }

    pub fn without_tree_frame(mut self) -> Self {
        self.tree_frame = false;
        self
    }
}

/// One organizational unit
#[derive(Debug, Clone)]
pub struct FakeUnit {
    pub value: String,
    pub label: String,
    /// List pages; `None` when the unit shows no record list at all
    pub pages: Option<Vec<Vec<FakeRecord>>>,
}

impl FakeUnit {
    pub fn with_pages(ordinal: usize, pages: Vec<Vec<FakeRecord>>) -> Self {
        Self {
            value: unit_value(ordinal),
            label: format!("UNIT-{}", ordinal),
            pages: Some(pages),
        }
    }

    pub fn without_list(ordinal: usize) -> Self {
        Self {
            value: unit_value(ordinal),
            label: format!("UNIT-{}", ordinal),
            pages: None,
        }
    }
}

pub fn unit_value(ordinal: usize) -> String {
    format!("1100{:04}", ordinal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Blank,
    Login,
    Control,
    Record(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Top,
    Tree,
    Content,
}

#[derive(Debug)]
struct PortalState {
    page: Page,
    frame: Frame,
    authenticated: bool,
    username: String,
    password: String,
    organization: String,
    selected_unit: Option<usize>,
    page_index: usize,
    progress_open: bool,
    cookies: Vec<Cookie>,
    closed: bool,
    calls: Vec<String>,
    goto_failures: HashMap<String, u32>,
}

/// In-memory portal driven through the `Browser` trait
#[derive(Debug)]
pub struct FakePortal {
    units: Vec<FakeUnit>,
    records: HashMap<u32, FakeRecord>,
    landing_works: bool,
    unreadable_page: Option<usize>,
    state: Mutex<PortalState>,
}

impl FakePortal {
    pub fn new(units: Vec<FakeUnit>) -> Self {
        let records = units
            .iter()
            .filter_map(|unit| unit.pages.as_ref())
            .flatten()
            .flatten()
            .map(|record| (record.id, record.clone()))
            .collect();

        Self {
            units,
            records,
            landing_works: true,
            unreadable_page: None,
            state: Mutex::new(PortalState {
                page: Page::Blank,
                frame: Frame::Top,
                authenticated: false,
                username: String::new(),
                password: String::new(),
                organization: String::new(),
                selected_unit: None,
                page_index: 0,
                progress_open: false,
                cookies: Vec::new(),
                closed: false,
                calls: Vec::new(),
                goto_failures: HashMap::new(),
            }),
        }
    }

    /// Makes the control page come up without a unit selector
    pub fn without_landing(mut self) -> Self {
        self.landing_works = false;
        self
    }

    /// Makes reading the record list fail whenever page `index` is shown
    pub fn with_unreadable_page(mut self, index: usize) -> Self {
        self.unreadable_page = Some(index);
        self
    }

    /// Makes the next `times` navigations to `url` fail
    pub fn fail_goto(self, url: &str, times: u32) -> Self {
        self.lock().goto_failures.insert(url.to_string(), times);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap()
    }

    fn current_pages(&self, state: &PortalState) -> Option<&Vec<Vec<FakeRecord>>> {
        state
            .selected_unit
            .and_then(|index| self.units[index].pages.as_ref())
    }

    fn has_next_page(&self, state: &PortalState) -> bool {
        state.page == Page::Control
            && self
                .current_pages(state)
                .map(|pages| state.page_index + 1 < pages.len())
                .unwrap_or(false)
    }

    fn matches(&self, state: &PortalState, selector: &str) -> bool {
        match (state.page, state.frame) {
            (Page::Login, Frame::Top) => matches!(
                selector,
                LOGIN_SUBMIT | USERNAME_INPUT | PASSWORD_INPUT | ORGANIZATION_SELECT
            ),
            (Page::Control, Frame::Top) => match selector {
                UNIT_SELECT => self.landing_works,
                RECORD_LIST_TABLE => self.current_pages(state).is_some(),
                NEXT_PAGE => self.has_next_page(state),
                _ => false,
            },
            (Page::Record(id), Frame::Top) => match selector {
                TREE_FRAME => self
                    .records
                    .get(&id)
                    .map(|record| record.tree_frame)
                    .unwrap_or(false),
                CONTENT_FRAME => state.progress_open,
                _ => false,
            },
            (Page::Record(_), Frame::Tree) => selector == PROGRESS_TRIGGER,
            (Page::Record(id), Frame::Content) => {
                selector == HISTORY_TABLE
                    && self
                        .records
                        .get(&id)
                        .map(|record| record.history.is_some())
                        .unwrap_or(false)
            }
            _ => false,
        }
    }

    fn unit_select_html(&self) -> String {
        let options: String = self
            .units
            .iter()
            .map(|unit| format!(r#"<option value="{}">{}</option>"#, unit.value, unit.label))
            .collect();
        format!(r#"<select id="selInfraUnidades">{}</select>"#, options)
    }

    fn list_table_html(&self, state: &PortalState) -> String {
        let rows: String = self
            .current_pages(state)
            .and_then(|pages| pages.get(state.page_index))
            .map(|records| {
                records
                    .iter()
                    .map(|record| {
                        format!(
                            r#"<tr><td><input type="checkbox"></td><td></td><td><a href="controlador.php?acao=procedimento_trabalhar&amp;id_procedimento={}" onmouseover="{}">{}</a></td></tr>"#,
                            record.id, record.tooltip, record.label
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        format!(
            r#"<table id="tblProcessosRecebidos"><tbody><tr><th></th><th></th><th>Processo</th></tr>{}</tbody></table>"#,
            rows
        )
    }

    fn history_table_html(cells: &[String]) -> String {
        let row: String = if cells.is_empty() {
            String::new()
        } else {
            let tds: String = cells.iter().map(|c| format!("<td> {} </td>", c)).collect();
            format!("<tr>{}</tr>", tds)
        };
        format!(
            r#"<table id="tblHistorico"><tbody><tr><th>Data/Hora</th><th>Unidade</th></tr>{}</tbody></table>"#,
            row
        )
    }
}

#[async_trait]
impl Browser for FakePortal {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("goto:{}", url));

        if let Some(remaining) = state.goto_failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_CONNECTION_RESET".to_string(),
                });
            }
        }

        state.frame = Frame::Top;
        state.progress_open = false;

        if url == ENTRY_URL || url == LIST_URL {
            state.page = if state.authenticated {
                Page::Control
            } else {
                Page::Login
            };
            state.page_index = 0;
            return Ok(());
        }

        let record = self
            .records
            .values()
            .find(|record| record_url(record.id) == url)
            .map(|record| record.id);

        match record {
            Some(id) if state.authenticated => {
                state.page = Page::Record(id);
                Ok(())
            }
            _ => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "404".to_string(),
            }),
        }
    }

    async fn current_url(&self) -> BrowserResult<String> {
        let state = self.lock();
        Ok(match state.page {
            Page::Blank => "about:blank".to_string(),
            Page::Login => ENTRY_URL.to_string(),
            Page::Control => LIST_URL.to_string(),
            Page::Record(id) => record_url(id),
        })
    }

    async fn exists(&self, selector: &str) -> BrowserResult<bool> {
        let state = self.lock();
        Ok(self.matches(&state, selector))
    }

    async fn is_visible(&self, selector: &str) -> BrowserResult<bool> {
        let state = self.lock();
        Ok(self.matches(&state, selector))
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("click:{}", selector));

        if !self.matches(&state, selector) {
            return Err(BrowserError::NoSuchElement {
                selector: selector.to_string(),
            });
        }

        match selector {
            LOGIN_SUBMIT => {
                if state.username == USERNAME
                    && state.password == PASSWORD
                    && state.organization == ORGANIZATION
                {
                    state.authenticated = true;
                    state.cookies = vec![Cookie::new("PHPSESSID", SESSION_TOKEN)];
                    state.page = Page::Control;
                }
            }
            PROGRESS_TRIGGER => state.progress_open = true,
            NEXT_PAGE => state.page_index += 1,
            _ => {}
        }

        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("fill:{}", selector));

        match (state.page, selector) {
            (Page::Login, USERNAME_INPUT) => state.username = text.to_string(),
            (Page::Login, PASSWORD_INPUT) => state.password = text.to_string(),
            _ => {
                return Err(BrowserError::NoSuchElement {
                    selector: selector.to_string(),
                })
            }
        }
        Ok(())
    }

    async fn select_option(&self, selector: &str, choice: OptionChoice<'_>) -> BrowserResult<()> {
        let mut state = self.lock();

        match (state.page, selector, choice) {
            (Page::Login, ORGANIZATION_SELECT, OptionChoice::Label(label)) => {
                state.calls.push(format!("select:{}:{}", selector, label));
                state.organization = label.to_string();
                Ok(())
            }
            (Page::Control, UNIT_SELECT, OptionChoice::Value(value)) => {
                state.calls.push(format!("select:{}:{}", selector, value));
                let index = self
                    .units
                    .iter()
                    .position(|unit| unit.value == value)
                    .ok_or_else(|| BrowserError::NoSuchOption {
                        selector: selector.to_string(),
                        choice: choice.to_string(),
                    })?;
                state.selected_unit = Some(index);
                state.page_index = 0;
                Ok(())
            }
            _ => Err(BrowserError::NoSuchElement {
                selector: selector.to_string(),
            }),
        }
    }

    async fn outer_html(&self, selector: &str) -> BrowserResult<Option<String>> {
        let state = self.lock();
        if !self.matches(&state, selector) {
            return Ok(None);
        }

        if selector == RECORD_LIST_TABLE && self.unreadable_page == Some(state.page_index) {
            return Err(BrowserError::Protocol(
                "stale element reference".to_string(),
            ));
        }

        Ok(match (state.page, selector) {
            (Page::Control, UNIT_SELECT) => Some(self.unit_select_html()),
            (Page::Control, RECORD_LIST_TABLE) => Some(self.list_table_html(&state)),
            (Page::Record(id), HISTORY_TABLE) => self
                .records
                .get(&id)
                .and_then(|record| record.history.as_deref())
                .map(Self::history_table_html),
            _ => None,
        })
    }

    async fn enter_frame(&self, selector: &str) -> BrowserResult<()> {
        let mut state = self.lock();
        if state.frame != Frame::Top || !self.matches(&state, selector) {
            return Err(BrowserError::NoSuchElement {
                selector: selector.to_string(),
            });
        }

        state.frame = match selector {
            TREE_FRAME => Frame::Tree,
            _ => Frame::Content,
        };
        Ok(())
    }

    async fn leave_frames(&self) -> BrowserResult<()> {
        self.lock().frame = Frame::Top;
        Ok(())
    }

    async fn cookies(&self) -> BrowserResult<Vec<Cookie>> {
        Ok(self.lock().cookies.clone())
    }

    async fn add_cookies(&self, cookies: &[Cookie]) -> BrowserResult<()> {
        let mut state = self.lock();
        state.calls.push("add_cookies".to_string());

        if cookies
            .iter()
            .any(|c| c.name == "PHPSESSID" && c.value == SESSION_TOKEN)
        {
            state.authenticated = true;
        }
        state.cookies.extend_from_slice(cookies);
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        let mut state = self.lock();
        state.calls.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}

/// Builds a validated config pointing into `dir`
pub fn test_config(dir: &TempDir, extra: &str) -> Config {
    let toml = format!(
        r#"
[portal]
entry-url = "{entry}"
organization = "{org}"

[credentials]
username = "{user}"
password = "{password}"

[crawl]
{extra}

[output]
database-path = "{db}"
cookie-dir = "{cookies}"
print-records = false
"#,
        entry = ENTRY_URL,
        org = ORGANIZATION,
        user = USERNAME,
        password = PASSWORD,
        extra = extra,
        db = dir.path().join("processos.db").display(),
        cookies = dir.path().join("cookie_storage").display(),
    );

    parse_config(&toml).unwrap()
}

/// Opens the session store configured in `config`
pub fn session_store(config: &Config) -> SessionStore {
    SessionStore::new(FileKvStore::open(std::path::Path::new(&config.output.cookie_dir)).unwrap())
}

/// Record store that fails the `nth` commit (counting from 1) and passes
/// everything else through
pub struct FailingCommitStore<S> {
    inner: S,
    fail_on: usize,
    commits: usize,
}

impl<S: RecordStore> FailingCommitStore<S> {
    pub fn new(inner: S, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            commits: 0,
        }
    }
}

impl<S: RecordStore> RecordStore for FailingCommitStore<S> {
    fn clear(&mut self) -> StorageResult<()> {
        self.inner.clear()
    }

    fn commit(&mut self, record: &ProcessRecord) -> StorageResult<()> {
        self.commits += 1;
        if self.commits == self.fail_on {
            return Err(StorageError::Commit {
                step: CommitStep::Insert,
                source: rusqlite::Error::InvalidQuery,
            });
        }
        self.inner.commit(record)
    }

    fn finish(&mut self) -> StorageResult<u64> {
        self.inner.finish()
    }

    fn count(&self) -> StorageResult<u64> {
        self.inner.count()
    }

    fn staged_count(&self) -> StorageResult<u64> {
        self.inner.staged_count()
    }

    fn records(&self) -> StorageResult<Vec<StoredRecord>> {
        self.inner.records()
    }
}
