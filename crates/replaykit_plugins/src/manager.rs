//! Plugin trait and failure-isolating dispatch.

use crate::events::{
    CaptureEndEvent, CaptureStartEvent, CaptureStepEvent, DiffEndEvent, DiffStartEvent,
    ReplayEndEvent, ReplayStartEvent,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

/// The lifecycle plugin API version hosts implement
pub const PLUGIN_API_VERSION: &str = "1.0";

/// Plugin result type
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors raised while registering plugins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// Plugin declared an API major incompatible with the host
    #[error("plugin '{plugin}' declares API version {declared}, host supports {supported}")]
    IncompatibleApiVersion {
        /// Plugin name
        plugin: String,
        /// Version the plugin declared
        declared: String,
        /// Version the host supports
        supported: String,
    },
}

impl PluginError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::IncompatibleApiVersion { .. } => "plugin_api_incompatible",
        }
    }
}

/// Lifecycle plugin interface (API v1.x). All hooks default to no-ops.
pub trait LifecyclePlugin: Send + Sync {
    /// Unique plugin name, used in diagnostics
    fn name(&self) -> &str;

    /// API version this plugin was built against
    fn api_version(&self) -> &str {
        PLUGIN_API_VERSION
    }

    /// A capture scope opened
    fn on_capture_start(&self, _event: &CaptureStartEvent) {}

    /// A step was appended
    fn on_capture_step(&self, _event: &CaptureStepEvent) {}

    /// A capture scope finalized
    fn on_capture_end(&self, _event: &CaptureEndEvent) {}

    /// A replay operation started
    fn on_replay_start(&self, _event: &ReplayStartEvent) {}

    /// A replay operation finished
    fn on_replay_end(&self, _event: &ReplayEndEvent) {}

    /// A diff operation started
    fn on_diff_start(&self, _event: &DiffStartEvent) {}

    /// A diff operation finished
    fn on_diff_end(&self, _event: &DiffEndEvent) {}
}

/// One recorded plugin failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDiagnostic {
    /// Failing plugin name
    pub plugin: String,
    /// Hook that failed
    pub hook: String,
    /// Panic payload rendered as text
    pub message: String,
}

/// Dispatches lifecycle events to registered plugins, isolating failures.
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn LifecyclePlugin>>,
    diagnostics: Mutex<Vec<PluginDiagnostic>>,
}

impl PluginManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin after checking API compatibility.
    ///
    /// # Errors
    ///
    /// Rejects plugins whose declared API major differs from the host's.
    pub fn register(&mut self, plugin: Box<dyn LifecyclePlugin>) -> PluginResult<()> {
        let declared = plugin.api_version().to_string();
        if api_major(&declared) != api_major(PLUGIN_API_VERSION) {
            return Err(PluginError::IncompatibleApiVersion {
                plugin: plugin.name().to_string(),
                declared,
                supported: PLUGIN_API_VERSION.to_string(),
            });
        }
        self.plugins.push(plugin);
        Ok(())
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Snapshot of recorded plugin failures.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<PluginDiagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Dispatch `on_capture_start`.
    pub fn capture_start(&self, event: &CaptureStartEvent) {
        self.dispatch("capture_start", |plugin| plugin.on_capture_start(event));
    }

    /// Dispatch `on_capture_step`.
    pub fn capture_step(&self, event: &CaptureStepEvent) {
        self.dispatch("capture_step", |plugin| plugin.on_capture_step(event));
    }

    /// Dispatch `on_capture_end`.
    pub fn capture_end(&self, event: &CaptureEndEvent) {
        self.dispatch("capture_end", |plugin| plugin.on_capture_end(event));
    }

    /// Dispatch `on_replay_start`.
    pub fn replay_start(&self, event: &ReplayStartEvent) {
        self.dispatch("replay_start", |plugin| plugin.on_replay_start(event));
    }

    /// Dispatch `on_replay_end`.
    pub fn replay_end(&self, event: &ReplayEndEvent) {
        self.dispatch("replay_end", |plugin| plugin.on_replay_end(event));
    }

    /// Dispatch `on_diff_start`.
    pub fn diff_start(&self, event: &DiffStartEvent) {
        self.dispatch("diff_start", |plugin| plugin.on_diff_start(event));
    }

    /// Dispatch `on_diff_end`.
    pub fn diff_end(&self, event: &DiffEndEvent) {
        self.dispatch("diff_end", |plugin| plugin.on_diff_end(event));
    }

    fn dispatch<F: Fn(&dyn LifecyclePlugin)>(&self, hook: &str, deliver: F) {
        for plugin in &self.plugins {
            let outcome = catch_unwind(AssertUnwindSafe(|| deliver(plugin.as_ref())));
            if let Err(payload) = outcome {
                let message = panic_message(payload.as_ref());
                self.diagnostics
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(PluginDiagnostic {
                        plugin: plugin.name().to_string(),
                        hook: hook.to_string(),
                        message,
                    });
            }
        }
    }
}

fn api_major(version: &str) -> Option<&str> {
    version.split('.').next()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "plugin panicked".to_string()
    }
}
