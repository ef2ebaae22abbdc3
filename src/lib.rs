//! # Live Sandbox
//!
//! A live-coding pipeline built on deno_core: a set of independently
//! edited source fragments becomes one runnable program on every edit,
//! executed in an isolated, disposable realm that can never hang or
//! corrupt the host.
//!
//! Pipeline, per edit:
//!
//! 1. **Resolve** - `import "name"` lines in the entry fragment are
//!    replaced with the named fragment's code, or with cached remote
//!    dependency text (fetched asynchronously, at most once per URL).
//! 2. **Guard** - every recognized loop gets an iteration cap so runaway
//!    code raises instead of spinning forever.
//! 3. **Run** - the bundle executes in a fresh V8 isolate whose only
//!    capability surface is a logging sink and a drawing surface.
//!
//! ## Isolation guarantees
//!
//! - **No filesystem access** from user code
//! - **No network access** from user code; remote dependencies are fetched
//!   by the host out-of-band and inlined as text
//! - **No environment access**
//! - **Errors never escape the realm**: failures land in the realm's error
//!   region, the host keeps running
//! - **Bounded iteration**: guarded loops raise after the configured cap
//!
//! ## Usage
//!
//! ```rust,ignore
//! use live_sandbox::{Fragment, FragmentSet, Playground, PlaygroundConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut playground = Playground::new(PlaygroundConfig::default());
//!     let fragments = FragmentSet::new(vec![
//!         Fragment::new("index", "import \"helpers\"\nlog(double(2))"),
//!         Fragment::new("helpers", "function double(x){return x*2}"),
//!     ]).unwrap();
//!
//!     let output = playground.update(&fragments).await.unwrap();
//!     println!("{}", output.logs.join("\n")); // "4"
//! }
//! ```

mod blobs;
mod cache;
mod executor;
mod fragment;
mod loop_guard;
mod ops;
mod playground;
mod resolver;

pub use blobs::{Blob, BlobHandle, BlobStore};
pub use cache::{DependencyCache, RemoteDependency};
pub use executor::{create_realm, RealmOutput, SandboxConfig, SandboxExecutor};
pub use fragment::{Fragment, FragmentSet, ENTRY_FRAGMENT};
pub use loop_guard::{instrument_loops, DEFAULT_MAX_ITERATIONS, LOOP_LIMIT_MESSAGE};
pub use ops::{DrawCommand, DrawSurface, ErrorRegion, LogRegion, Viewport};
pub use playground::{Playground, PlaygroundConfig};
pub use resolver::{is_remote_url, resolve_imports};
