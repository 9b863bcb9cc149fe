use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use crate::policy::qtable::PolicyEntry;

// ============================================================================
// Store contract
// ============================================================================

/// Key-value persistence for learned policy values, keyed by
/// `stateHash|actionKey`, plus the dangerous-pattern set.
///
/// The engine treats any implementation as an eventually-durable cache:
/// the in-memory Q table is authoritative during a run, and writes are
/// idempotent by key so losing the most recent one is harmless.
pub trait PolicyStore {
    fn get(&self, key: &str) -> Option<PolicyEntry>;

    fn upsert(&mut self, key: &str, entry: PolicyEntry);

    fn increment_visits(&mut self, key: &str);

    fn get_or_default(&self, key: &str) -> PolicyEntry {
        self.get(key).unwrap_or_default()
    }

    fn add_dangerous(&mut self, pattern: &str);

    fn dangerous_patterns(&self) -> Vec<String>;

    /// Remembered best strategy for a target package, if any.
    fn best_strategy(&self, package: &str) -> Option<String>;

    fn set_best_strategy(&mut self, package: &str, strategy: &str);
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    entries: HashMap<String, PolicyEntry>,
    dangerous: HashSet<String>,
    best_strategies: HashMap<String, String>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &PolicyEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best_strategies(&self) -> impl Iterator<Item = (&String, &String)> {
        self.best_strategies.iter()
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get(&self, key: &str) -> Option<PolicyEntry> {
        self.entries.get(key).copied()
    }

    fn upsert(&mut self, key: &str, entry: PolicyEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn increment_visits(&mut self, key: &str) {
        self.entries.entry(key.to_string()).or_default().visits += 1;
    }

    fn add_dangerous(&mut self, pattern: &str) {
        self.dangerous.insert(pattern.to_string());
    }

    fn dangerous_patterns(&self) -> Vec<String> {
        self.dangerous.iter().cloned().collect()
    }

    fn best_strategy(&self, package: &str) -> Option<String> {
        self.best_strategies.get(package).cloned()
    }

    fn set_best_strategy(&mut self, package: &str, strategy: &str) {
        self.best_strategies
            .insert(package.to_string(), strategy.to_string());
    }
}

// ============================================================================
// Async JSONL persistence
// ============================================================================

/// One persisted record. Replayed last-wins on load, so appending the same
/// key repeatedly is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyRecord {
    Entry { key: String, q: f64, visits: u32 },
    Dangerous { pattern: String },
    BestStrategy { package: String, strategy: String },
}

/// Fire-and-forget handle feeding the background writer thread. Persistence
/// happens off the control-loop thread; a crash mid-write loses at most the
/// most recent record.
pub struct PolicyWriter {
    sender: Option<Sender<PolicyRecord>>,
    handle: Option<JoinHandle<()>>,
}

impl PolicyWriter {
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let (sender, receiver): (Sender<PolicyRecord>, Receiver<PolicyRecord>) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path);
            let mut file = match file {
                Ok(f) => f,
                Err(e) => {
                    eprintln!(
                        "Warning: could not open policy file '{}': {}",
                        path.display(),
                        e
                    );
                    // Drain and drop so senders never block
                    for _ in receiver {}
                    return;
                }
            };
            for record in receiver {
                match serde_json::to_string(&record) {
                    Ok(json) => {
                        if let Err(e) = writeln!(file, "{}", json) {
                            eprintln!("Warning: policy write failed: {}", e);
                        }
                    }
                    Err(e) => eprintln!("Warning: policy serialize failed: {}", e),
                }
            }
        });

        Self { sender: Some(sender), handle: Some(handle) }
    }

    pub fn record(&self, record: PolicyRecord) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(record);
        }
    }

    /// Close the channel and wait for the writer to flush.
    pub fn shutdown(mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PolicyWriter {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Load a JSONL policy file into an in-memory store, last record wins.
/// Missing file yields an empty store; malformed lines are skipped.
pub fn load_policy_file(path: &Path) -> InMemoryPolicyStore {
    let mut store = InMemoryPolicyStore::new();
    let Ok(file) = std::fs::File::open(path) else {
        return store;
    };
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        let Ok(record) = serde_json::from_str::<PolicyRecord>(&line) else {
            continue;
        };
        match record {
            PolicyRecord::Entry { key, q, visits } => {
                store.upsert(&key, PolicyEntry { q, visits, feedback: 0.0 });
            }
            PolicyRecord::Dangerous { pattern } => store.add_dangerous(&pattern),
            PolicyRecord::BestStrategy { package, strategy } => {
                store.set_best_strategy(&package, &strategy)
            }
        }
    }
    store
}
