//! Deduplicating reporter
//!
//! Notices are rendered by the configured renderers and delivered to the
//! configured log function once per distinct message. No lock is held while
//! a renderer or the log function runs, so either may call back into a
//! shadow surface.

use crate::config::{ConfigPatch, ShadowConfig};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

static GLOBAL: Lazy<Arc<Reporter>> = Lazy::new(|| Arc::new(Reporter::new()));

/// An operation is exposed under a different name by the candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameNotice {
    /// Operation name as called
    pub name: String,
    /// Name on the reference surface
    pub old_name: String,
    /// Name on the candidate surface
    pub new_name: String,
    /// Reference version
    pub old_version: String,
    /// Candidate version
    pub new_version: String,
}

/// Reference and candidate disagreed on a call
///
/// `args`, `old_result` and `new_result` are rendered and truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DivergenceNotice {
    pub name: String,
    pub args: String,
    pub old_result: String,
    pub new_result: String,
    pub old_version: String,
    pub new_version: String,
}

/// Default rename template
#[must_use]
pub fn render_rename_text(notice: &RenameNotice) -> String {
    format!(
        "shadow: Method renamed\n  v{} => {}\n  v{} => {}",
        notice.old_version, notice.old_name, notice.new_version, notice.new_name
    )
}

/// Default divergence template
#[must_use]
pub fn render_divergence_text(notice: &DivergenceNotice) -> String {
    format!(
        "shadow: {}({})\n  v{} => {}\n  v{} => {}",
        notice.name,
        notice.args,
        notice.old_version,
        notice.old_result,
        notice.new_version,
        notice.new_result
    )
}

/// Rename notice as a JSON object
#[must_use]
pub fn render_rename_json(notice: &RenameNotice) -> String {
    to_json("rename", notice)
}

/// Divergence notice as a JSON object
#[must_use]
pub fn render_divergence_json(notice: &DivergenceNotice) -> String {
    to_json("divergence", notice)
}

fn to_json<T: Serialize>(event: &str, notice: &T) -> String {
    #[derive(Serialize)]
    struct Tagged<'a, T> {
        event: &'a str,
        #[serde(flatten)]
        notice: &'a T,
    }

    serde_json::to_string(&Tagged { event, notice })
        .unwrap_or_else(|e| format!("{{\"event\":\"{event}\",\"error\":\"{e}\"}}"))
}

struct SeenMessages {
    messages: IndexSet<String>,
    capacity: Option<usize>,
}

impl SeenMessages {
    /// Record `message`; false if it was already present
    fn insert(&mut self, message: &str) -> bool {
        if self.messages.contains(message) {
            return false;
        }
        if let Some(capacity) = self.capacity {
            while self.messages.len() >= capacity {
                if self.messages.shift_remove_index(0).is_none() {
                    break;
                }
            }
        }
        self.messages.insert(message.to_string());
        true
    }
}

/// Owns reporting configuration and the set of delivered messages
pub struct Reporter {
    config: RwLock<ShadowConfig>,
    seen: Mutex<SeenMessages>,
}

impl Reporter {
    /// Reporter with default configuration and unbounded dedup
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ShadowConfig::default())
    }

    /// Reporter with the given configuration
    #[must_use]
    pub fn with_config(config: ShadowConfig) -> Self {
        Self {
            config: RwLock::new(config),
            seen: Mutex::new(SeenMessages {
                messages: IndexSet::new(),
                capacity: None,
            }),
        }
    }

    /// Reporter remembering at most `capacity` messages, oldest evicted first
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let reporter = Self::new();
        reporter.seen.lock().capacity = Some(capacity.max(1));
        reporter
    }

    /// Process-wide reporter
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Merge `patch` and return the resulting configuration
    pub fn configure(&self, patch: ConfigPatch) -> ShadowConfig {
        let mut config = self.config.write();
        config.merge(patch);
        config.clone()
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> ShadowConfig {
        self.config.read().clone()
    }

    /// Deliver `message` unless it was delivered before
    ///
    /// Returns whether the message was delivered.
    pub fn log(&self, message: &str) -> bool {
        let fresh = self.seen.lock().insert(message);
        if !fresh {
            trace!(len = message.len(), "suppressed duplicate message");
            return false;
        }
        let log = Arc::clone(&self.config.read().log);
        log(message);
        true
    }

    /// Render and deliver a rename notice
    pub fn report_rename(&self, notice: &RenameNotice) -> bool {
        let render = Arc::clone(&self.config.read().render_rename);
        self.log(&render(notice))
    }

    /// Render and deliver a divergence notice
    pub fn report_divergence(&self, notice: &DivergenceNotice) -> bool {
        let render = Arc::clone(&self.config.read().render_divergence);
        self.log(&render(notice))
    }

    /// Forget every delivered message
    pub fn reset(&self) {
        self.seen.lock().messages.clear();
    }

    /// Number of remembered messages
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.lock().messages.len()
    }

    /// Dedup bound, if any
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.seen.lock().capacity
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seen = self.seen.lock();
        f.debug_struct("Reporter")
            .field("seen", &seen.messages.len())
            .field("capacity", &seen.capacity)
            .finish_non_exhaustive()
    }
}
