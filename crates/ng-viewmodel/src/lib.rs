// SPDX-License-Identifier: MIT OR Apache-2.0
//! Refresh-trigger and polling-backoff state machine wrapped around the pure
//! index loader.
//!
//! [`ViewModel`] is the only stateful component in the crate graph: it
//! remembers the last projected [`ng_core::LoadState`]/[`ng_core::Banner`],
//! a consecutive-failure counter, and the index file's last-observed
//! write-time, and uses them to decide whether a given trigger should
//! actually re-run [`ng_index::load`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

use ng_core::{Banner, BannerSeverity, LoadResult, LoadState};
use ng_index::FileReader;
use std::path::PathBuf;
use std::time::SystemTime;

/// Holds the projected state for one workspace and decides, per trigger,
/// whether to reload.
pub struct ViewModel<R: FileReader> {
    reader: R,
    workspace_root: PathBuf,
    last_known_good: Vec<ng_core::JobRow>,
    state: LoadState,
    banner: Banner,
    consecutive_failures: u32,
    backoff_threshold: u32,
    suspended: bool,
    focused: bool,
    last_poll_mtime: Option<SystemTime>,
}

impl<R: FileReader> ViewModel<R> {
    /// Builds a view model with no prior state. Call [`ViewModel::on_start`]
    /// to run the initial load.
    pub fn new(reader: R, workspace_root: impl Into<PathBuf>, backoff_threshold: u32) -> Self {
        Self {
            reader,
            workspace_root: workspace_root.into(),
            last_known_good: Vec::new(),
            state: LoadState::Loading,
            banner: Banner::none(),
            consecutive_failures: 0,
            backoff_threshold: backoff_threshold.max(1),
            suspended: false,
            focused: false,
            last_poll_mtime: None,
        }
    }

    /// The currently projected presentation state.
    #[must_use]
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// The currently projected banner.
    #[must_use]
    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    /// `true` once timer polling has backed off after repeated failures.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Process-start trigger: always reloads.
    pub fn on_start(&mut self) {
        self.resume_and_reload();
    }

    /// Window-focus-gained trigger: always reloads, and resumes polling if
    /// it had been suspended by the failure backoff.
    pub fn on_focus_gained(&mut self) {
        self.focused = true;
        self.resume_and_reload();
    }

    /// Records a focus-lost transition. Timer polls are suppressed while
    /// unfocused; this does not itself trigger a reload.
    pub fn on_focus_lost(&mut self) {
        self.focused = false;
    }

    /// Explicit user-requested refresh: always reloads, and resumes polling
    /// if it had been suspended.
    pub fn on_explicit_refresh(&mut self) {
        self.resume_and_reload();
    }

    /// Optional timer-poll trigger. A no-op unless the window is
    /// focused/visible, polling is not suspended, and the index file's
    /// last-write-time has advanced since the last successful poll.
    pub fn on_timer_tick(&mut self) {
        if !self.focused || self.suspended {
            return;
        }
        let index_path = self.workspace_root.join(ng_index::INDEX_RELATIVE_PATH);
        let current_mtime = self.reader.mtime(&index_path).ok();
        let advanced = match (current_mtime, self.last_poll_mtime) {
            (Some(current), Some(previous)) => current != previous,
            _ => true,
        };
        if !advanced {
            return;
        }
        self.reload();
        self.last_poll_mtime = current_mtime;
    }

    /// Resets the failure counter and un-suspends polling before reloading,
    /// per the focus-gained/explicit-refresh recovery rule.
    fn resume_and_reload(&mut self) {
        self.consecutive_failures = 0;
        self.suspended = false;
        self.reload();
        let index_path = self.workspace_root.join(ng_index::INDEX_RELATIVE_PATH);
        self.last_poll_mtime = self.reader.mtime(&index_path).ok();
    }

    fn reload(&mut self) {
        let result: LoadResult = ng_index::load(&self.reader, &self.workspace_root, &self.last_known_good);
        self.apply(result);
    }

    /// Updates counters and, only on an actual change, the displayed
    /// state/banner — avoiding flicker when a poll re-derives an identical
    /// projection.
    fn apply(&mut self, result: LoadResult) {
        match result.banner.severity {
            BannerSeverity::Warning => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.backoff_threshold {
                    self.suspended = true;
                }
            }
            BannerSeverity::None | BannerSeverity::Info => {
                self.consecutive_failures = 0;
            }
        }
        if result.state != self.state {
            self.state = result.state;
        }
        if result.banner != self.banner {
            self.banner = result.banner;
        }
        self.last_known_good = result.last_known_good;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_index::PathKind;
    use std::collections::HashMap;
    use std::io;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeReader {
        dirs: Mutex<HashMap<String, ()>>,
        files: Mutex<HashMap<String, (Vec<u8>, SystemTime)>>,
    }

    impl FakeReader {
        fn with_dir(self, path: &str) -> Self {
            self.dirs.lock().unwrap().insert(path.to_string(), ());
            self
        }

        fn put_file(&self, path: &str, contents: &[u8], mtime: SystemTime) {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), (contents.to_vec(), mtime));
        }
    }

    impl FileReader for &FakeReader {
        fn kind(&self, path: &Path) -> PathKind {
            let key = path.to_string_lossy().replace('\\', "/");
            if self.files.lock().unwrap().contains_key(&key) {
                PathKind::File
            } else if self.dirs.lock().unwrap().contains_key(&key) {
                PathKind::Directory
            } else {
                PathKind::Missing
            }
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            let key = path.to_string_lossy().replace('\\', "/");
            self.files
                .lock()
                .unwrap()
                .get(&key)
                .map(|(bytes, _)| bytes.clone())
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        fn len(&self, path: &Path) -> io::Result<u64> {
            self.read(path).map(|b| b.len() as u64)
        }

        fn mtime(&self, path: &Path) -> io::Result<SystemTime> {
            let key = path.to_string_lossy().replace('\\', "/");
            self.files
                .lock()
                .unwrap()
                .get(&key)
                .map(|(_, mtime)| *mtime)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    const INDEX_PATH: &str = "/ws/.codecomfy/outputs/index.json";
    const VALID_DOC: &[u8] =
        br#"{"schema_version":"0.1","items":[{"job_id":"j1","created_at":"2026-01-01T00:00:00Z","kind":"image","files":[{"path":"a.png","sha256":"aa"}],"seed":1}]}"#;

    fn epoch(n: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(n)
    }

    #[test]
    fn on_start_loads_and_sets_list_state() {
        let fake = FakeReader::default().with_dir("/ws");
        fake.put_file(INDEX_PATH, VALID_DOC, epoch(1));
        let mut vm = ViewModel::new(&fake, "/ws", 3);
        vm.on_start();
        assert!(vm.state().items().is_some());
    }

    #[test]
    fn timer_tick_is_suppressed_while_unfocused() {
        let fake = FakeReader::default().with_dir("/ws");
        fake.put_file(INDEX_PATH, VALID_DOC, epoch(1));
        let mut vm = ViewModel::new(&fake, "/ws", 3);
        vm.on_start();
        vm.on_timer_tick();
        assert!(matches!(vm.state(), LoadState::List { .. }));
    }

    #[test]
    fn timer_tick_skips_reload_when_mtime_unchanged() {
        let fake = FakeReader::default().with_dir("/ws");
        fake.put_file(INDEX_PATH, VALID_DOC, epoch(1));
        let mut vm = ViewModel::new(&fake, "/ws", 3);
        vm.on_focus_gained();
        let after_first = vm.last_known_good.clone();

        // Same mtime: a tick must not re-read at all, even if the
        // underlying bytes were (hypothetically) different.
        fake.put_file(INDEX_PATH, b"{broken", epoch(1));
        vm.on_timer_tick();
        assert_eq!(vm.last_known_good, after_first);
        assert!(matches!(vm.state(), LoadState::List { .. }));
    }

    #[test]
    fn timer_tick_reloads_when_mtime_advances() {
        let fake = FakeReader::default().with_dir("/ws");
        fake.put_file(INDEX_PATH, VALID_DOC, epoch(1));
        let mut vm = ViewModel::new(&fake, "/ws", 3);
        vm.on_focus_gained();

        fake.put_file(INDEX_PATH, b"{broken", epoch(2));
        vm.on_timer_tick();
        assert_eq!(vm.banner().severity, BannerSeverity::Warning);
    }

    #[test]
    fn backoff_suspends_after_threshold_failures() {
        let fake = FakeReader::default().with_dir("/ws");
        fake.put_file(INDEX_PATH, b"{broken", epoch(1));
        let mut vm = ViewModel::new(&fake, "/ws", 2);
        vm.on_focus_gained();
        assert!(!vm.is_suspended());

        fake.put_file(INDEX_PATH, b"{broken", epoch(2));
        vm.on_timer_tick();
        assert!(vm.is_suspended());
    }

    #[test]
    fn explicit_refresh_resumes_from_backoff_and_resets_counter() {
        let fake = FakeReader::default().with_dir("/ws");
        fake.put_file(INDEX_PATH, b"{broken", epoch(1));
        let mut vm = ViewModel::new(&fake, "/ws", 1);
        vm.on_focus_gained();
        assert!(vm.is_suspended());

        fake.put_file(INDEX_PATH, VALID_DOC, epoch(2));
        vm.on_explicit_refresh();
        assert!(!vm.is_suspended());
        assert!(matches!(vm.state(), LoadState::List { .. }));
    }

    #[test]
    fn successful_load_resets_failure_counter() {
        let fake = FakeReader::default().with_dir("/ws");
        fake.put_file(INDEX_PATH, b"{broken", epoch(1));
        let mut vm = ViewModel::new(&fake, "/ws", 3);
        vm.on_focus_gained();
        assert_eq!(vm.consecutive_failures, 1);

        fake.put_file(INDEX_PATH, VALID_DOC, epoch(2));
        vm.on_explicit_refresh();
        assert_eq!(vm.consecutive_failures, 0);
    }
}
