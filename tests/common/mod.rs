//! 测试用的假门户：按门牌号决定每条记录的表现
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use paytax_lookup::config::{AdmissionMode, Config};
use paytax_lookup::error::{AutomationError, AutomationResult, StoreError, StoreResult};
use paytax_lookup::infrastructure::{AutomationSession, FrameHandle, SessionFactory};
use paytax_lookup::models::{parse_address_line, WorkRecord};
use paytax_lookup::services::locators;
use paytax_lookup::store::{MemoryStore, RecordStore};

/// 某个门牌号在门户上的表现
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    Match { owner: String, book_page: String },
    NoRows,
    NoFrame,
    BadDetail,
    /// 点击"完成"按钮时找不到元素
    FinishMissing,
    /// 提交搜索时浏览器断开
    SessionDies,
}

impl Behavior {
    pub fn matched(owner: &str, book_page: &str) -> Self {
        Behavior::Match {
            owner: owner.to_string(),
            book_page: book_page.to_string(),
        }
    }
}

/// 共享的门户状态和计数器
pub struct FakePortal {
    behaviors: HashMap<String, Behavior>,
    latency: Duration,
    fail_open: bool,
    opened: AtomicUsize,
    closed: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    searches: Mutex<Vec<(String, String)>>,
}

impl FakePortal {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            latency: Duration::from_millis(1),
            fail_open: false,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, house_number: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(house_number.to_string(), behavior);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_to_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// 没有登记的门牌号一律匹配成功
    pub fn behavior_for(&self, house_number: &str) -> Behavior {
        self.behaviors.get(house_number).cloned().unwrap_or_else(|| {
            Behavior::matched(
                &format!("Owner {}", house_number),
                &format!("{}/1 * 2021-05-01", house_number),
            )
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// 每次提交搜索时输入框里的内容
    pub fn searches(&self) -> Vec<(String, String)> {
        self.searches.lock().unwrap().clone()
    }
}

pub struct FakeFactory {
    pub portal: Arc<FakePortal>,
}

impl FakeFactory {
    pub fn new(portal: FakePortal) -> Self {
        Self {
            portal: Arc::new(portal),
        }
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open_session(&self) -> AutomationResult<Box<dyn AutomationSession>> {
        if self.portal.fail_open {
            return Err(AutomationError::Launch("no browser".to_string()));
        }
        self.portal.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.portal.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.portal.max_active.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakeSession::new(Arc::clone(&self.portal))))
    }
}

/// 一个假浏览器页面
///
/// 输入框内容跨导航保留，只有先全选再输入才会覆盖；
/// 报表 frame 在展开详情后改名，旧句柄随之失效。
pub struct FakeSession {
    portal: Arc<FakePortal>,
    fields: HashMap<String, String>,
    selected: Option<String>,
    submitted: Option<Behavior>,
    report_open: bool,
    frame_generation: usize,
    detail_expanded: bool,
    dead: bool,
    closed: bool,
}

impl FakeSession {
    fn new(portal: Arc<FakePortal>) -> Self {
        Self {
            portal,
            fields: HashMap::new(),
            selected: None,
            submitted: None,
            report_open: false,
            frame_generation: 0,
            detail_expanded: false,
            dead: false,
            closed: false,
        }
    }

    async fn step(&self) -> AutomationResult<()> {
        tokio::time::sleep(self.portal.latency).await;
        if self.dead {
            return Err(AutomationError::SessionLost("browser gone".to_string()));
        }
        Ok(())
    }

    fn frame_name(&self) -> String {
        format!("bobjid_viewer_{}", self.frame_generation)
    }

    fn check_frame(&self, frame: &FrameHandle) -> AutomationResult<()> {
        if frame.name() != self.frame_name() {
            return Err(AutomationError::FrameLost(frame.name().to_string()));
        }
        Ok(())
    }

    fn field(&self, locator: &str) -> String {
        self.fields.get(locator).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl AutomationSession for FakeSession {
    async fn navigate(&mut self, _url: &str) -> AutomationResult<()> {
        self.step().await?;
        self.submitted = None;
        self.report_open = false;
        self.detail_expanded = false;
        Ok(())
    }

    async fn click(&mut self, locator: &str) -> AutomationResult<()> {
        self.step().await?;
        if locator == locators::SUBMIT_SEARCH {
            let house = self.field(locators::HOUSE_NUMBER_FIELD);
            let street = self.field(locators::STREET_FIELD);
            self.portal
                .searches
                .lock()
                .unwrap()
                .push((house.clone(), street));
            let behavior = self.portal.behavior_for(&house);
            if behavior == Behavior::SessionDies {
                self.dead = true;
                return Err(AutomationError::SessionLost("browser crashed".to_string()));
            }
            self.submitted = Some(behavior);
        } else if locator == locators::FINISH {
            if self.submitted == Some(Behavior::FinishMissing) {
                return Err(AutomationError::LocatorNotFound(locator.to_string()));
            }
            self.report_open = true;
        }
        Ok(())
    }

    async fn select_all(&mut self, locator: &str) -> AutomationResult<()> {
        self.step().await?;
        self.selected = Some(locator.to_string());
        Ok(())
    }

    async fn type_text(
        &mut self,
        locator: &str,
        text: &str,
        _per_char_delay: Duration,
    ) -> AutomationResult<()> {
        self.step().await?;
        let replace = self.selected.take().as_deref() == Some(locator);
        let field = self.fields.entry(locator.to_string()).or_default();
        if replace {
            field.clear();
        }
        field.push_str(text);
        Ok(())
    }

    async fn read_document(&mut self) -> AutomationResult<String> {
        self.step().await?;
        let rows = match &self.submitted {
            Some(Behavior::NoRows) | None => String::new(),
            Some(_) => "<tr><td>match</td></tr><tr><td>match rear</td></tr>".to_string(),
        };
        Ok(format!(
            r#"<html><body><table id="objWP_reportparameterstyle_ESearchManager1_Web_CO_SearchPanel1_grdResult">{}</table></body></html>"#,
            rows
        ))
    }

    async fn find_frame_by_name_part(&mut self, part: &str) -> AutomationResult<Option<FrameHandle>> {
        self.step().await?;
        if !self.report_open || self.submitted == Some(Behavior::NoFrame) {
            return Ok(None);
        }
        let name = self.frame_name();
        Ok(name.contains(part).then(|| FrameHandle::new(name)))
    }

    async fn click_in_frame(&mut self, frame: &FrameHandle, locator: &str) -> AutomationResult<()> {
        self.step().await?;
        self.check_frame(frame)?;
        if locator == locators::DETAIL_EXPAND {
            self.detail_expanded = true;
            self.frame_generation += 1;
        }
        Ok(())
    }

    async fn read_frame_document(&mut self, frame: &FrameHandle) -> AutomationResult<String> {
        self.step().await?;
        self.check_frame(frame)?;
        if !self.detail_expanded {
            return Err(AutomationError::Script("detail not expanded".to_string()));
        }
        let (owner, book_page) = match &self.submitted {
            Some(Behavior::Match { owner, book_page }) => (owner.clone(), book_page.clone()),
            _ => ("Somebody".to_string(), "no delimiter here".to_string()),
        };
        Ok(format!(
            r#"<html><body><div id="Ownername1">&nbsp;{}</div><div id="bookpage1">{}</div></body></html>"#,
            owner, book_page
        ))
    }

    async fn close(&mut self) -> AutomationResult<()> {
        if !self.closed {
            self.closed = true;
            self.portal.closed.fetch_add(1, Ordering::SeqCst);
            self.portal.active.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// 对指定身份的写入总是失败的存储
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing_id: i64,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn fetch_unprocessed(&self, offset: usize, limit: usize) -> StoreResult<Vec<WorkRecord>> {
        self.inner.fetch_unprocessed(offset, limit).await
    }

    async fn upsert_outcome(&self, record: &WorkRecord) -> StoreResult<()> {
        if record.id == Some(self.failing_id) {
            return Err(StoreError::write(record.id, "disk full"));
        }
        self.inner.upsert_outcome(record).await
    }

    async fn insert_many(&self, records: &[WorkRecord]) -> StoreResult<Vec<i64>> {
        self.inner.insert_many(records).await
    }
}

/// 不做任何等待的配置
pub fn fast_config() -> Config {
    Config {
        portal_url: "https://portal.test/search".to_string(),
        fetch_offset: 0,
        type_delay_ms: 0,
        settle_scale: 0.0,
        heartbeat_interval_ms: 10,
        admission_mode: AdmissionMode::Pooled,
        ..Config::default()
    }
}

pub fn address_lines(n: usize) -> Vec<WorkRecord> {
    (1..=n)
        .map(|i| parse_address_line(&format!("{} Main St", i)))
        .collect()
}

/// 写入存储并返回带身份的记录
pub async fn seeded_store(records: &[WorkRecord]) -> (Arc<MemoryStore>, Vec<WorkRecord>) {
    let store = Arc::new(MemoryStore::new());
    let ids = store.insert_many(records).await.unwrap();
    let with_ids = records
        .iter()
        .cloned()
        .zip(ids)
        .map(|(r, id)| r.with_id(id))
        .collect();
    (store, with_ids)
}
