//! Sandbox executor - runs a bundle in a fresh, disposable V8 realm.
//!
//! Each run packages the bundle and the harness into a self-contained
//! document, publishes document and script through the blob store, and
//! executes the script in a brand new isolate. The previous run's two
//! handles are revoked first, so exactly one document handle and one
//! script handle are live per executor at any time.
//!
//! The bundle is executed directly as a script resource, never embedded in
//! a quoted template: user code needs no escaping, whatever quote
//! characters it contains.

use crate::blobs::{Blob, BlobHandle, BlobStore};
use crate::ops::{sandbox_harness, DrawCommand, DrawSurface, ErrorRegion, LogRegion, Viewport};
use anyhow::{anyhow, Error, Result};
use deno_core::{JsRuntime, PollEventLoopOptions, RuntimeOptions};
use serde::Serialize;

/// Configuration for one executor instance.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Dimensions the drawing surface is sized to.
    pub viewport: Viewport,
    /// Maximum heap size in bytes (default: 64MB, None = unlimited)
    pub max_heap_size: Option<usize>,
    /// Maximum wall-clock time for one run in milliseconds (None =
    /// unlimited). The loop guard bounds iteration counts, not the cost of
    /// one iteration; this bounds everything else.
    pub timeout_ms: Option<u64>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            max_heap_size: Some(64 * 1024 * 1024), // 64MB default
            timeout_ms: Some(5_000),
        }
    }
}

/// What one run left behind in the realm's output regions.
#[derive(Debug, Clone, Serialize)]
pub struct RealmOutput {
    pub logs: Vec<String>,
    pub error: ErrorRegion,
    pub draw_commands: Vec<DrawCommand>,
    /// Blob URL of the document the user observes.
    pub document_url: String,
}

pub struct SandboxExecutor {
    config: SandboxConfig,
    blobs: BlobStore,
    document: Option<BlobHandle>,
    script: Option<BlobHandle>,
}

impl SandboxExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            blobs: BlobStore::new(),
            document: None,
            script: None,
        }
    }

    /// Run `bundle` in a fresh realm, superseding the previous one.
    ///
    /// Evaluation failures do not fail the call: they land in the output's
    /// error region, which becomes visible. `Err` is reserved for host-side
    /// problems such as realm construction failing.
    pub async fn run(&mut self, bundle: &str) -> Result<RealmOutput> {
        // Release the previous realm's handles before installing new ones.
        if let Some(handle) = self.script.take() {
            self.blobs.revoke(&handle);
        }
        if let Some(handle) = self.document.take() {
            self.blobs.revoke(&handle);
        }

        let mut realm = create_realm(&self.config)?;

        let script = self.blobs.create(bundle, "text/javascript");
        let document = self.blobs.create(
            compose_document(script.url(), self.config.viewport),
            "text/html",
        );

        execute_guarded(&mut realm, bundle, self.config.timeout_ms).await;

        let output = {
            let state = realm.op_state();
            let state = state.borrow();
            RealmOutput {
                logs: state.borrow::<LogRegion>().entries.clone(),
                error: state.borrow::<ErrorRegion>().clone(),
                draw_commands: state.borrow::<DrawSurface>().commands.clone(),
                document_url: document.url().to_string(),
            }
        };

        self.script = Some(script);
        self.document = Some(document);

        Ok(output)
    }

    /// The document currently shown to the user, if any run happened yet.
    pub fn document(&self) -> Option<&Blob> {
        self.document
            .as_ref()
            .and_then(|handle| self.blobs.get(handle.url()))
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }
}

/// Build a fresh isolated realm wired with the harness capability surface.
pub fn create_realm(config: &SandboxConfig) -> Result<JsRuntime, Error> {
    // Configure V8 heap limits if specified
    let create_params = config
        .max_heap_size
        .map(|max_bytes| deno_core::v8::Isolate::create_params().heap_limits(0, max_bytes));

    let mut realm = JsRuntime::new(RuntimeOptions {
        extensions: vec![sandbox_harness::init_ops_and_esm(config.viewport)],
        create_params,
        ..Default::default()
    });

    // Add near-heap-limit callback to gracefully handle OOM
    if config.max_heap_size.is_some() {
        realm.add_near_heap_limit_callback(|current, initial| {
            // Don't increase the limit - let V8 terminate instead of crash
            tracing::warn!(
                current_mb = current / (1024 * 1024),
                initial_mb = initial / (1024 * 1024),
                "realm near heap limit"
            );
            current
        });
    }

    Ok(realm)
}

/// Failure boundary: any evaluation error is written into the realm's
/// error region and made visible; nothing propagates to the host.
async fn execute_guarded(realm: &mut JsRuntime, bundle: &str, timeout_ms: Option<u64>) {
    let result = match timeout_ms {
        Some(ms) => {
            // Get a handle to terminate execution if needed
            let isolate_handle = realm.v8_isolate().thread_safe_handle();

            let timeout_handle = tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                isolate_handle.terminate_execution();
            });

            let result = evaluate(realm, bundle).await;

            // Cancel the timeout task if we finished in time
            timeout_handle.abort();

            match result {
                // V8 termination can manifest as various errors
                Err(e) if e.to_string().contains("terminated") => {
                    Err(anyhow!("Run timed out after {}ms", ms))
                }
                other => other,
            }
        }
        None => evaluate(realm, bundle).await,
    };

    if let Err(e) = result {
        let state = realm.op_state();
        let mut state = state.borrow_mut();
        state.borrow_mut::<ErrorRegion>().show(e.to_string());
    }
}

async fn evaluate(realm: &mut JsRuntime, bundle: &str) -> Result<()> {
    realm.execute_script("<sandbox>", bundle.to_string())?;

    // Run event loop to settle any promises the bundle created
    realm.run_event_loop(PollEventLoopOptions::default()).await?;
    Ok(())
}

/// Self-contained document combining the harness regions and the script
/// resource, referenced by URL.
fn compose_document(script_url: &str, viewport: Viewport) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Sandbox</title>
<style>
*{{box-sizing:border-box}}
body,html{{margin:0;padding:0;width:100%;height:100%}}
#err{{color:tomato;padding:10px;display:none;position:absolute}}
#logs{{padding:10px;position:absolute}}
</style>
</head>
<body>
<span id="logs"></span>
<div id="err"></div>
<canvas id="sandbox" width="{width}" height="{height}"></canvas>
<script src="{script_url}"></script>
</body>
</html>
"#,
        width = viewport.width,
        height = viewport.height,
    )
}
