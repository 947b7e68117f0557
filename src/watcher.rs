//! Filesystem watcher: debounced rebuilds with content-hash suppression of
//! spurious editor-save events, tracked via a mutex-guarded `WatcherState`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use colored::*;
use notify::{raw_watcher, Op, RawEvent, RecursiveMode, Watcher};
use openssl::hash::{Hasher, MessageDigest};

use crate::generator::{generate, is_ignored_path};

/// Minimum interval between the end of one triggered rebuild and the start
/// of the next, to collapse bursts of editor-save events into one build.
const DEBOUNCE: Duration = Duration::from_millis(300);

struct WatcherState {
    is_building: bool,
    needs_rebuild: bool,
    last_trigger: Option<Instant>,
    hashes: HashMap<PathBuf, Vec<u8>>,
}

/// Runs an initial full build of `source_dir` into `output_dir`, then
/// watches `source_dir` recursively until interrupted with Ctrl-C.
pub fn watch(source_dir: &Path, output_dir: &Path) -> notify::Result<()> {
    if let Err(e) = generate(source_dir, output_dir) {
        eprintln!("{} {}", "error:".red().bold(), e);
    }

    println!(
        "{} watching {} for changes (Ctrl-C to stop)",
        "watch:".cyan().bold(),
        source_dir.display()
    );

    let (tx, rx) = channel();
    let mut watcher = raw_watcher(tx)?;
    watcher.watch(source_dir, RecursiveMode::Recursive)?;

    let state = Arc::new(Mutex::new(WatcherState {
        is_building: false,
        needs_rebuild: false,
        last_trigger: None,
        hashes: HashMap::new(),
    }));

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = running.clone();
    ctrlc::set_handler(move || running_handler.store(false, Ordering::SeqCst))
        .map_err(|e| notify::Error::Generic(e.to_string()))?;

    let source_owned = source_dir.to_path_buf();
    let output_owned = output_dir.to_path_buf();

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => handle_event(event, &state, &output_owned, &source_owned),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    println!("{}", "watch: stopped".cyan().bold());
    Ok(())
}

fn handle_event(event: RawEvent, state: &Arc<Mutex<WatcherState>>, output_dir: &Path, source_dir: &Path) {
    let (path, op) = match event {
        RawEvent { path: Some(path), op: Ok(op), .. } => (path, op),
        _ => return,
    };

    if is_ignored_path(&path, output_dir) {
        return;
    }

    // Deletions/renames are never hash-gated: there is no content left to
    // hash, and the site no longer containing a file is itself the change.
    if op.contains(Op::REMOVE) || op.contains(Op::RENAME) {
        forget_hash(state, &path);
        println!("{} {}", "removed:".yellow().bold(), path.display());
        request_build(state, source_dir.to_path_buf(), output_dir.to_path_buf());
        return;
    }

    if op.contains(Op::CREATE) || op.contains(Op::WRITE) {
        if !path.is_file() || !content_changed(state, &path) {
            return;
        }
        println!("{} {}", "changed:".yellow().bold(), path.display());
        request_build(state, source_dir.to_path_buf(), output_dir.to_path_buf());
    }
}

fn content_changed(state: &Arc<Mutex<WatcherState>>, path: &Path) -> bool {
    let digest = match hash_file(path) {
        Ok(d) => d,
        Err(_) => return false,
    };

    let mut s = state.lock().unwrap();
    let changed = s.hashes.get(path) != Some(&digest);
    if changed {
        s.hashes.insert(path.to_path_buf(), digest);
    }
    changed
}

fn forget_hash(state: &Arc<Mutex<WatcherState>>, path: &Path) {
    state.lock().unwrap().hashes.remove(path);
}

fn hash_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let content = fs::read(path)?;
    let mut hasher = Hasher::new(MessageDigest::md5()).unwrap();
    hasher.update(&content).unwrap();
    Ok(hasher.finish().unwrap().to_vec())
}

/// Implements the protocol from the concurrency model: debounce, fold
/// concurrent triggers into `needs_rebuild`, and never run two builds at
/// once.
fn request_build(state: &Arc<Mutex<WatcherState>>, source_dir: PathBuf, output_dir: PathBuf) {
    let mut should_spawn = false;
    {
        let mut s = state.lock().unwrap();
        if s.is_building {
            s.needs_rebuild = true;
        } else if s.last_trigger.map(|t| t.elapsed() < DEBOUNCE).unwrap_or(false) {
            s.needs_rebuild = true;
        } else {
            s.is_building = true;
            s.last_trigger = Some(Instant::now());
            should_spawn = true;
        }
    }

    if should_spawn {
        spawn_build(state.clone(), source_dir, output_dir);
    }
}

fn spawn_build(state: Arc<Mutex<WatcherState>>, source_dir: PathBuf, output_dir: PathBuf) {
    thread::spawn(move || loop {
        if let Err(e) = generate(&source_dir, &output_dir) {
            eprintln!("{} {}", "error:".red().bold(), e);
        }

        let mut s = state.lock().unwrap();
        if s.needs_rebuild {
            s.needs_rebuild = false;
            s.last_trigger = Some(Instant::now());
            drop(s);
            continue;
        }

        s.is_building = false;
        break;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> Arc<Mutex<WatcherState>> {
        Arc::new(Mutex::new(WatcherState {
            is_building: false,
            needs_rebuild: false,
            last_trigger: None,
            hashes: HashMap::new(),
        }))
    }

    #[test]
    fn content_changed_detects_first_sighting_and_true_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.html");
        fs::write(&path, "one").unwrap();

        let state = empty_state();

        assert!(content_changed(&state, &path));
        assert!(!content_changed(&state, &path));

        fs::write(&path, "two").unwrap();
        assert!(content_changed(&state, &path));
    }

    #[test]
    fn request_build_folds_concurrent_trigger_into_flag() {
        let state = empty_state();
        state.lock().unwrap().is_building = true;

        request_build(&state, PathBuf::from("/src"), PathBuf::from("/out"));

        let s = state.lock().unwrap();
        assert!(s.needs_rebuild);
    }

    #[test]
    fn deletion_event_triggers_rebuild_without_hash_check() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("build");
        let deleted_path = dir.path().join("gone.html");
        // the file does not exist on disk: a hash-gated check would always
        // fail here, which is exactly the bug this test guards against.
        assert!(!deleted_path.exists());

        let state = empty_state();
        let event = RawEvent { path: Some(deleted_path), op: Ok(Op::REMOVE), cookie: None };

        handle_event(event, &state, &output, dir.path());

        let s = state.lock().unwrap();
        assert!(s.is_building);
    }

    #[test]
    fn create_event_with_unreadable_path_does_not_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("build");
        let missing_path = dir.path().join("missing.html");

        let state = empty_state();
        let event = RawEvent { path: Some(missing_path), op: Ok(Op::CREATE), cookie: None };

        handle_event(event, &state, &output, dir.path());

        let s = state.lock().unwrap();
        assert!(!s.is_building);
    }

    #[test]
    fn ignored_path_is_never_dispatched() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("build");
        let ignored_path = output.join("already-built.html");

        let state = empty_state();
        let event = RawEvent { path: Some(ignored_path), op: Ok(Op::REMOVE), cookie: None };

        handle_event(event, &state, &output, dir.path());

        let s = state.lock().unwrap();
        assert!(!s.is_building);
    }
}
