//! File-system watcher (`spec.md` §4.7).
//!
//! Grounded on `notify` for raw OS events, driving a single background
//! thread that owns per-path debounce deadlines and one set-once batch
//! deadline — the non-resetting batch-timer semantics `spec.md` §9 calls
//! out as deliberate. Include patterns are compiled to `regex::Regex`
//! (`spec.md` §4.7's explicit requirement); the indexer's own directory scan
//! uses `globset` instead, which is the coarser, already-idiomatic choice for
//! a one-shot walk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher as NotifyWatcherTrait};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::indexer::Indexer;

/// Compiles `**`/`*`/`?` include globs into regexes matched against a
/// `/`-normalized relative path.
pub struct IncludeMatcher {
    patterns: Vec<Regex>,
}

impl IncludeMatcher {
    pub fn new(globs: &[String]) -> Self {
        let patterns = globs.iter().filter_map(|g| Regex::new(&glob_to_regex(g)).ok()).collect();
        Self { patterns }
    }

    pub fn matches(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(relative_path))
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '[' | ']' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    out
}

#[derive(Debug, Clone, Copy)]
struct FileSnapshot {
    mtime: std::time::SystemTime,
    size: u64,
    line_count: u32,
}

/// Owns the debounce/batch state for one watch session. [`Watcher::run`]
/// drives it against real filesystem events and timers; tests call the
/// internal `on_event`/`fire_debounce_timers` steps directly to exercise the
/// debounce/batch logic synchronously.
pub struct Watcher {
    config: Config,
    matcher: IncludeMatcher,
    debounce_deadlines: HashMap<PathBuf, Instant>,
    batch_deadline: Option<Instant>,
    pending: Vec<PathBuf>,
    snapshots: HashMap<PathBuf, FileSnapshot>,
}

impl Watcher {
    pub fn new(config: Config) -> Self {
        let matcher = IncludeMatcher::new(&config.include);
        Self {
            config,
            matcher,
            debounce_deadlines: HashMap::new(),
            batch_deadline: None,
            pending: Vec::new(),
            snapshots: HashMap::new(),
        }
    }

    fn relative_path(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.config.root_dir)
            .ok()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
    }

    fn excluded(&self, relative: &str) -> bool {
        let exclude_matcher = IncludeMatcher::new(&self.config.exclude);
        !self.config.exclude.is_empty() && exclude_matcher.matches(relative)
    }

    /// Handle one raw filesystem event, updating debounce state. Invoked
    /// from [`Watcher::run`]'s event loop; called directly in tests so they
    /// can drive debounce/batch behavior without real timers.
    fn on_event(&mut self, event: notify::Event) {
        use notify::EventKind;
        match event.kind {
            EventKind::Remove(_) => {
                for path in event.paths {
                    self.handle_removal(&path);
                }
            }
            EventKind::Create(_) | EventKind::Modify(_) => {
                for path in event.paths {
                    self.handle_change(&path);
                }
            }
            _ => {}
        }
    }

    fn handle_removal(&mut self, path: &Path) {
        let Some(relative) = self.relative_path(path) else { return };
        self.snapshots.remove(path);
        self.pending.push(PathBuf::from(format!("__removed__:{relative}")));
        debug!(path = %relative, "queued removal");
    }

    fn handle_change(&mut self, path: &Path) {
        if !path.is_file() {
            return;
        }
        let Some(relative) = self.relative_path(path) else { return };
        if self.excluded(&relative) || !self.matcher.matches(&relative) {
            return;
        }

        self.debounce_deadlines.insert(path.to_path_buf(), Instant::now() + Duration::from_millis(self.config.debounce_ms));
    }

    /// Fire any debounce timers that have elapsed, applying the
    /// change-threshold test, then arm the batch timer if anything newly
    /// qualified.
    fn fire_debounce_timers(&mut self) {
        let now = Instant::now();
        let ready: Vec<PathBuf> = self
            .debounce_deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        for path in ready {
            self.debounce_deadlines.remove(&path);
            if self.passes_change_threshold(&path) {
                self.pending.push(path);
                if self.batch_deadline.is_none() {
                    self.batch_deadline = Some(now + Duration::from_secs(self.config.batch_interval_minutes * 60));
                }
            }
        }
    }

    fn passes_change_threshold(&mut self, path: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else { return true };
        let Ok(content) = std::fs::read_to_string(path) else { return true };
        let new_lines = content.lines().count() as u32;
        let new_snapshot = FileSnapshot {
            mtime: metadata.modified().unwrap_or(std::time::SystemTime::now()),
            size: metadata.len(),
            line_count: new_lines,
        };

        let known = self.snapshots.get(path).copied();
        self.snapshots.insert(path.to_path_buf(), new_snapshot);

        match known {
            Some(old) => {
                let delta = (new_lines as i64 - old.line_count as i64).unsigned_abs() as u32;
                if delta < self.config.min_change_lines {
                    debug!(path = %path.display(), delta, "below change threshold, dropping");
                    return false;
                }
                true
            }
            None => true,
        }
    }

    fn batch_ready(&self) -> bool {
        self.batch_deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    /// Drain the pending set and reindex each path, including removals.
    /// Safe to call on shutdown to flush whatever is still queued.
    pub fn flush(&mut self, indexer: &mut Indexer) -> Result<()> {
        let drained: Vec<PathBuf> = self.pending.drain(..).collect();
        self.batch_deadline = None;

        for path in drained {
            let as_str = path.to_string_lossy();
            if let Some(relative) = as_str.strip_prefix("__removed__:") {
                match indexer.store().get_file_by_path(relative)? {
                    Some(file) => {
                        indexer.store().delete_file(file.id)?;
                        info!(path = relative, "removed from index");
                    }
                    None => {
                        let removed = indexer.store().delete_directory(relative)?;
                        if removed > 0 {
                            info!(path = relative, removed, "removed directory subtree from index");
                        }
                    }
                }
                continue;
            }

            match indexer.index_file(&path) {
                Ok(_) => info!(path = %path.display(), "reindexed"),
                Err(err) => warn!(path = %path.display(), error = %err, "reindex failed"),
            }
        }
        Ok(())
    }

    /// Run the watch loop on the calling thread until `stop` signals, using
    /// a real `notify` watcher and a short polling interval to drive the
    /// debounce/batch timers (`spec.md` §4.7's "independent timers" model).
    pub fn run(&mut self, indexer: &mut Indexer, stop: &std::sync::atomic::AtomicBool) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut notify_watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })?;
        notify_watcher.watch(&self.config.root_dir, RecursiveMode::Recursive)?;

        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            while let Ok(event) = rx.try_recv() {
                self.on_event(event);
            }
            self.fire_debounce_timers();
            if self.batch_ready() {
                self.flush(indexer)?;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        self.flush(indexer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_to_regex_matches_double_star() {
        let matcher = IncludeMatcher::new(&["**/*.rs".to_string()]);
        assert!(matcher.matches("src/lib.rs"));
        assert!(matcher.matches("a/b/c/lib.rs"));
        assert!(!matcher.matches("src/lib.py"));
    }

    #[test]
    fn glob_to_regex_matches_single_star_within_segment() {
        let matcher = IncludeMatcher::new(&["src/*.rs".to_string()]);
        assert!(matcher.matches("src/lib.rs"));
        assert!(!matcher.matches("src/sub/lib.rs"));
    }

    #[test]
    fn batch_timer_is_set_once_not_reset() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::new(tmp.path().to_path_buf(), tmp.path().join("db.sqlite"));
        let mut watcher = Watcher::new(config);

        let path = tmp.path().join("a.rs");
        watcher.debounce_deadlines.insert(path.clone(), Instant::now());
        watcher.fire_debounce_timers();
        let first_deadline = watcher.batch_deadline;
        assert!(first_deadline.is_some());

        std::thread::sleep(Duration::from_millis(5));
        let path2 = tmp.path().join("b.rs");
        watcher.debounce_deadlines.insert(path2, Instant::now());
        watcher.fire_debounce_timers();
        assert_eq!(watcher.batch_deadline, first_deadline, "enqueuing again must not reset the armed batch timer");
    }
}
