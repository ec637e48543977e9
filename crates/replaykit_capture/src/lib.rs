//! Run-scoped capture for ReplayKit.
//!
//! A capture scope owns one run: it assigns gap-free step ids, applies
//! redaction before anything is retained, computes step hashes, and
//! enforces the interception policy at every boundary. Scopes are
//! first-class handles; a thread-local stack provides optional
//! current-scope sugar.

pub mod boundary;
pub mod demo;
pub mod env;
pub mod error;
pub mod policy;
pub mod scope;
pub mod stream;

pub use boundary::{HttpRequest, HttpResponse};
pub use demo::{build_demo_run, build_demo_run_with, DEMO_RUN_ID, DEMO_TIMESTAMP};
pub use env::{default_environment_fingerprint, default_runtime_versions, utc_now_iso};
pub use error::{CaptureError, CaptureResult};
pub use policy::{Boundary, InterceptionPolicy};
pub use scope::{current_scope, enter_scope, CaptureScope, ScopeGuard};
pub use stream::assemble_stream_output;
