//! In-memory [`Remote`] double for planner tests
//!
//! Models an Alist server closely enough for the planner: a tree of
//! absolute paths, envelope-style errors, per-call counters and queued
//! failure injection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio::sync::Notify;
use url::Url;

use crate::api::{ApiError, Item, PutData};
use crate::remote::Remote;

const RAW_PREFIX: &str = "http://mock.invalid/d";

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub is_dir: bool,
    pub data: Bytes,
    pub modified: DateTime<Utc>,
    pub md5: Option<String>,
}

#[derive(Default)]
struct MockState {
    entries: BTreeMap<String, MockEntry>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, VecDeque<ApiError>>,
    token: Option<String>,
    hashes_in_listing: bool,
    recursive_move_missing: bool,
    upload_returns_data: bool,
    list_gates: HashMap<String, Arc<ListGate>>,
    download_ranges: Vec<Option<Range<u64>>>,
}

/// Pauses one listing after the server has answered it, before the
/// answer reaches the caller
#[derive(Default)]
pub struct ListGate {
    /// Notified once the listing has been read
    pub reached: Notify,
    /// Lets the listing return
    pub release: Notify,
}

pub struct MockRemote {
    endpoint: Url,
    state: Mutex<MockState>,
}

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "mock-token";

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

fn within(path: &str, root: &str) -> bool {
    path == root || root == "/" || path.starts_with(&format!("{}/", root))
}

fn not_found() -> ApiError {
    ApiError::api(500, "failed get storage: object not found")
}

impl MockRemote {
    pub fn new() -> Self {
        Self::with_endpoint("http://mock.invalid/")
    }

    pub fn with_endpoint(endpoint: &str) -> Self {
        let mut state = MockState::default();
        state.entries.insert("/".to_string(), Self::dir_entry());
        Self {
            endpoint: Url::parse(endpoint).expect("valid mock endpoint"),
            state: Mutex::new(state),
        }
    }

    fn dir_entry() -> MockEntry {
        MockEntry {
            is_dir: true,
            data: Bytes::new(),
            modified: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            md5: None,
        }
    }

    /// Create a directory and any missing parents
    pub fn add_dir(&self, path: &str) {
        let mut state = self.state.lock();
        Self::mkdir_all(&mut state, path);
    }

    pub fn add_file(&self, path: &str, data: &[u8], md5: Option<&str>) {
        let mut state = self.state.lock();
        Self::mkdir_all(&mut state, parent_of(path));
        state.entries.insert(
            path.to_string(),
            MockEntry {
                is_dir: false,
                data: Bytes::copy_from_slice(data),
                modified: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                md5: md5.map(str::to_string),
            },
        );
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().entries.contains_key(path)
    }

    pub fn entry(&self, path: &str) -> Option<MockEntry> {
        self.state.lock().entries.get(path).cloned()
    }

    /// Number of `call` invocations so far, failed ones included
    pub fn calls(&self, call: &'static str) -> usize {
        self.state.lock().calls.get(call).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    pub fn reset_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Make the next `call` fail with `err`
    pub fn fail_next(&self, call: &'static str, err: ApiError) {
        self.state
            .lock()
            .failures
            .entry(call)
            .or_default()
            .push_back(err);
    }

    pub fn fail_next_status(&self, call: &'static str, status: StatusCode) {
        self.fail_next(call, ApiError::HttpStatus(status, status.to_string()));
    }

    pub fn set_hashes_in_listing(&self, on: bool) {
        self.state.lock().hashes_in_listing = on;
    }

    /// Answer `recursive_move` the way servers without the route do
    pub fn set_recursive_move_missing(&self, missing: bool) {
        self.state.lock().recursive_move_missing = missing;
    }

    pub fn set_upload_returns_data(&self, on: bool) {
        self.state.lock().upload_returns_data = on;
    }

    /// Hold the next listing of `path` until the returned gate is released
    pub fn gate_list(&self, path: &str) -> Arc<ListGate> {
        let gate = Arc::new(ListGate::default());
        self.state
            .lock()
            .list_gates
            .insert(path.to_string(), gate.clone());
        gate
    }

    /// Range requested by each download so far
    pub fn download_ranges(&self) -> Vec<Option<Range<u64>>> {
        self.state.lock().download_ranges.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    fn mkdir_all(state: &mut MockState, path: &str) {
        let mut current = String::from("/");
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = join(&current, segment);
            state
                .entries
                .entry(current.clone())
                .or_insert_with(Self::dir_entry);
        }
    }

    /// Count the call and pop any injected failure
    fn enter(&self, call: &'static str) -> Result<parking_lot::MutexGuard<'_, MockState>, ApiError> {
        let mut state = self.state.lock();
        *state.calls.entry(call).or_default() += 1;
        if let Some(err) = state.failures.get_mut(call).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }

    fn item(state: &MockState, path: &str, entry: &MockEntry, with_hash: bool) -> Item {
        Item {
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            size: entry.data.len() as i64,
            is_dir: entry.is_dir,
            modified: entry.modified,
            hash_info: if with_hash || state.hashes_in_listing {
                entry.md5.clone()
            } else {
                None
            },
            raw_url: (!entry.is_dir).then(|| format!("{}{}", RAW_PREFIX, path)),
        }
    }

    fn listing(&self, path: &str) -> Result<(Vec<Item>, Option<Arc<ListGate>>), ApiError> {
        let mut state = self.enter("list")?;
        match state.entries.get(path) {
            Some(entry) if entry.is_dir => {}
            _ => return Err(not_found()),
        }
        let items = state
            .entries
            .iter()
            .filter(|(key, _)| key.as_str() != "/" && key.as_str() != path && parent_of(key) == path)
            .map(|(key, entry)| Self::item(&state, key, entry, false))
            .collect();
        let gate = state.list_gates.remove(path);
        Ok((items, gate))
    }

    fn relocate(state: &mut MockState, src: &str, dst: &str) {
        let moved: Vec<String> = state
            .entries
            .keys()
            .filter(|key| within(key, src))
            .cloned()
            .collect();
        for key in moved {
            if let Some(entry) = state.entries.remove(&key) {
                let new_key = format!("{}{}", dst, &key[src.len()..]);
                state.entries.insert(new_key, entry);
            }
        }
    }

    fn transfer(&self, call: &'static str, src_dir: &str, dst_dir: &str, names: &[String], keep_source: bool) -> Result<(), ApiError> {
        let mut state = self.enter(call)?;
        match state.entries.get(dst_dir) {
            Some(entry) if entry.is_dir => {}
            _ => return Err(not_found()),
        }
        for name in names {
            let src = join(src_dir, name);
            let dst = join(dst_dir, name);
            if !state.entries.contains_key(&src) {
                return Err(not_found());
            }
            if state.entries.contains_key(&dst) {
                return Err(ApiError::api(403, format!("file [{}] exists", name)));
            }
            if keep_source {
                let copied: Vec<(String, MockEntry)> = state
                    .entries
                    .iter()
                    .filter(|(key, _)| within(key, &src))
                    .map(|(key, entry)| (format!("{}{}", dst, &key[src.len()..]), entry.clone()))
                    .collect();
                state.entries.extend(copied);
            } else {
                Self::relocate(&mut state, &src, &dst);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Remote for MockRemote {
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn set_token(&self, token: Option<String>) {
        self.state.lock().token = token;
    }

    async fn ping(&self) -> Result<(), ApiError> {
        self.enter("ping")?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        self.enter("login")?;
        if username == USERNAME && password == PASSWORD {
            Ok(TOKEN.to_string())
        } else {
            Err(ApiError::api(400, "password is incorrect or you have no permission"))
        }
    }

    async fn whoami(&self) -> Result<String, ApiError> {
        let state = self.enter("whoami")?;
        match state.token.as_deref() {
            Some(TOKEN) => Ok(USERNAME.to_string()),
            _ => Err(ApiError::api(401, "token is invalidated")),
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<Item>, ApiError> {
        let (items, gate) = self.listing(path)?;
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        Ok(items)
    }

    async fn get_info(&self, path: &str) -> Result<Item, ApiError> {
        let state = self.enter("get_info")?;
        let entry = state.entries.get(path).ok_or_else(not_found)?;
        Ok(Self::item(&state, path, entry, true))
    }

    async fn mkdir(&self, path: &str) -> Result<(), ApiError> {
        let mut state = self.enter("mkdir")?;
        if state.entries.contains_key(path) {
            return Err(ApiError::api(409, "file already exists"));
        }
        Self::mkdir_all(&mut state, path);
        Ok(())
    }

    async fn remove(&self, dir: &str, names: &[String]) -> Result<(), ApiError> {
        let mut state = self.enter("remove")?;
        for name in names {
            let target = join(dir, name);
            state.entries.retain(|key, _| !within(key, &target) || key == "/");
        }
        Ok(())
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<(), ApiError> {
        let mut state = self.enter("rename")?;
        if !state.entries.contains_key(path) {
            return Err(not_found());
        }
        let dst = join(parent_of(path), new_name);
        if state.entries.contains_key(&dst) {
            return Err(ApiError::api(403, "file exists"));
        }
        Self::relocate(&mut state, path, &dst);
        Ok(())
    }

    async fn move_items(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<(), ApiError> {
        self.transfer("move", src_dir, dst_dir, names, false)
    }

    async fn copy_items(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<(), ApiError> {
        self.transfer("copy", src_dir, dst_dir, names, true)
    }

    async fn recursive_move(&self, src_dir: &str, dst_dir: &str, _overwrite: bool) -> Result<(), ApiError> {
        let mut state = self.enter("recursive_move")?;
        if state.recursive_move_missing {
            return Err(ApiError::HttpStatus(StatusCode::NOT_FOUND, "404 page not found".into()));
        }
        if !state.entries.contains_key(src_dir) {
            return Err(not_found());
        }
        if state.entries.contains_key(dst_dir) {
            return Err(ApiError::api(403, "destination exists"));
        }
        Self::mkdir_all(&mut state, parent_of(dst_dir));
        Self::relocate(&mut state, src_dir, dst_dir);
        Ok(())
    }

    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        modified: Option<DateTime<Utc>>,
    ) -> Result<Option<PutData>, ApiError> {
        let mut state = self.enter("upload")?;
        Self::mkdir_all(&mut state, parent_of(path));
        let previous_md5 = state.entries.get(path).and_then(|e| e.md5.clone());
        state.entries.insert(
            path.to_string(),
            MockEntry {
                is_dir: false,
                data: body,
                modified: modified
                    .map(|m| Utc.timestamp_opt(m.timestamp(), 0).unwrap())
                    .unwrap_or_else(|| Utc.timestamp_opt(1_700_000_500, 0).unwrap()),
                // Content changed, the server recomputes lazily
                md5: previous_md5.map(|_| "recomputed".to_string()),
            },
        );
        Ok(state.upload_returns_data.then(PutData::default))
    }

    async fn download(&self, raw_url: &str, range: Option<Range<u64>>) -> Result<Bytes, ApiError> {
        let mut state = self.enter("download")?;
        state.download_ranges.push(range.clone());
        let path = raw_url.strip_prefix(RAW_PREFIX).ok_or_else(not_found)?;
        let data = state
            .entries
            .get(path)
            .map(|entry| entry.data.clone())
            .ok_or_else(|| ApiError::HttpStatus(StatusCode::NOT_FOUND, String::new()))?;
        Ok(match range {
            Some(range) => crate::api::client::slice_range(data, range),
            None => data,
        })
    }
}
