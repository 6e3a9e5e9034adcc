//! Reporting configuration
//!
//! [`ShadowConfig`] is the full configuration held by a
//! [`Reporter`](crate::report::Reporter). [`ConfigPatch`] is a partial update:
//! fields left unset keep their current value when merged.

use crate::compare::{Comparability, DefaultComparability};
use crate::render::DEFAULT_MAX_WIDTH;
use crate::report::{self, DivergenceNotice, RenameNotice, Reporter};
use std::fmt;
use std::io::Write as _;
use std::sync::Arc;

/// Message destination
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Rename message renderer
pub type RenameRenderer = Arc<dyn Fn(&RenameNotice) -> String + Send + Sync>;

/// Divergence message renderer
pub type DivergenceRenderer = Arc<dyn Fn(&DivergenceNotice) -> String + Send + Sync>;

/// Reporting configuration
#[derive(Clone)]
pub struct ShadowConfig {
    /// Receives each distinct rendered message once
    pub log: LogFn,

    /// Renders rename notices
    pub render_rename: RenameRenderer,

    /// Renders divergence notices
    pub render_divergence: DivergenceRenderer,

    /// Decides which results are worth comparing
    pub comparability: Arc<dyn Comparability>,

    /// Width bound for rendered arguments and results
    pub max_width: usize,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            log: Arc::new(log_to_stdout),
            render_rename: Arc::new(report::render_rename_text),
            render_divergence: Arc::new(report::render_divergence_text),
            comparability: Arc::new(DefaultComparability),
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

impl ShadowConfig {
    /// Apply the fields set in `patch`
    pub fn merge(&mut self, patch: ConfigPatch) {
        if let Some(log) = patch.log {
            self.log = log;
        }
        if let Some(render) = patch.render_rename {
            self.render_rename = render;
        }
        if let Some(render) = patch.render_divergence {
            self.render_divergence = render;
        }
        if let Some(comparability) = patch.comparability {
            self.comparability = comparability;
        }
        if let Some(width) = patch.max_width {
            self.max_width = width;
        }
    }
}

impl fmt::Debug for ShadowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowConfig")
            .field("max_width", &self.max_width)
            .finish_non_exhaustive()
    }
}

fn log_to_stdout(message: &str) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{message}");
}

fn log_to_tracing(message: &str) {
    tracing::warn!(target: "shadow", "{message}");
}

/// Partial configuration update
///
/// ```
/// use shadow_core::ConfigPatch;
///
/// let patch = ConfigPatch::new()
///     .with_max_width(120)
///     .with_log(|message| eprintln!("{message}"));
/// assert!(!patch.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct ConfigPatch {
    log: Option<LogFn>,
    render_rename: Option<RenameRenderer>,
    render_divergence: Option<DivergenceRenderer>,
    comparability: Option<Arc<dyn Comparability>>,
    max_width: Option<usize>,
}

impl ConfigPatch {
    /// Empty patch (merging it changes nothing)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderers that emit notices as single-line JSON objects
    #[must_use]
    pub fn json() -> Self {
        Self::new()
            .with_render_rename(report::render_rename_json)
            .with_render_divergence(report::render_divergence_json)
    }

    /// Deliver messages as `tracing` warnings instead of stdout lines
    #[must_use]
    pub fn tracing() -> Self {
        Self::new().with_log(log_to_tracing)
    }

    /// Set message destination
    #[must_use]
    pub fn with_log<F>(mut self, log: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log = Some(Arc::new(log));
        self
    }

    /// Set rename renderer
    #[must_use]
    pub fn with_render_rename<F>(mut self, render: F) -> Self
    where
        F: Fn(&RenameNotice) -> String + Send + Sync + 'static,
    {
        self.render_rename = Some(Arc::new(render));
        self
    }

    /// Set divergence renderer
    #[must_use]
    pub fn with_render_divergence<F>(mut self, render: F) -> Self
    where
        F: Fn(&DivergenceNotice) -> String + Send + Sync + 'static,
    {
        self.render_divergence = Some(Arc::new(render));
        self
    }

    /// Set comparability predicate
    #[must_use]
    pub fn with_comparability<C>(mut self, comparability: C) -> Self
    where
        C: Comparability + 'static,
    {
        self.comparability = Some(Arc::new(comparability));
        self
    }

    /// Set rendering width
    #[must_use]
    pub fn with_max_width(mut self, max_width: usize) -> Self {
        self.max_width = Some(max_width);
        self
    }

    /// Combine two patches; fields set in `other` win
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.log = other.log.or(self.log);
        self.render_rename = other.render_rename.or(self.render_rename);
        self.render_divergence = other.render_divergence.or(self.render_divergence);
        self.comparability = other.comparability.or(self.comparability);
        self.max_width = other.max_width.or(self.max_width);
        self
    }

    /// Whether no field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_none()
            && self.render_rename.is_none()
            && self.render_divergence.is_none()
            && self.comparability.is_none()
            && self.max_width.is_none()
    }
}

impl fmt::Debug for ConfigPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigPatch")
            .field("log", &self.log.is_some())
            .field("render_rename", &self.render_rename.is_some())
            .field("render_divergence", &self.render_divergence.is_some())
            .field("comparability", &self.comparability.is_some())
            .field("max_width", &self.max_width)
            .finish()
    }
}

/// Merge `patch` into the process-wide reporter and return the result
pub fn configure(patch: ConfigPatch) -> ShadowConfig {
    Reporter::global().configure(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use parking_lot::Mutex;

    #[test]
    fn empty_patch_keeps_config() {
        let mut config = ShadowConfig::default();
        config.merge(ConfigPatch::new());
        assert_eq!(config.max_width, DEFAULT_MAX_WIDTH);
        assert!(!config.comparability.is_comparable(&Value::Undefined));
    }

    #[test]
    fn patch_overrides_only_set_fields() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut config = ShadowConfig::default();
        config.merge(
            ConfigPatch::new()
                .with_log(move |m| sink.lock().push(m.to_string()))
                .with_max_width(20),
        );

        (config.log)("hello");
        assert_eq!(*seen.lock(), vec!["hello".to_string()]);
        assert_eq!(config.max_width, 20);
        assert!(config.comparability.is_comparable(&Value::from(1)));
    }

    #[test]
    fn later_patch_wins() {
        let patch = ConfigPatch::new()
            .with_max_width(10)
            .and(ConfigPatch::new().with_max_width(30));
        let mut config = ShadowConfig::default();
        config.merge(patch);
        assert_eq!(config.max_width, 30);
    }

    #[test]
    fn presets_set_expected_fields() {
        let json = ConfigPatch::json();
        assert!(json.render_rename.is_some() && json.render_divergence.is_some());
        assert!(json.log.is_none());

        assert!(ConfigPatch::tracing().log.is_some());
        assert!(ConfigPatch::new().is_empty());
    }

    #[test]
    fn comparability_accepts_closures() {
        let mut config = ShadowConfig::default();
        config.merge(ConfigPatch::new().with_comparability(|_: &Value| true));
        assert!(config.comparability.is_comparable(&Value::Undefined));
    }
}
