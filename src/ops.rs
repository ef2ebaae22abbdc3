//! Realm capability surface - the only ops user code can reach.
//!
//! The harness (`src/harness.js`) is the sole caller: user programs see a
//! `log(...)` function and an ambient `canvas`/`ctx` pair, nothing else.
//! Everything a program does lands in one of the regions below, which the
//! executor reads back out of op state after the run.

use deno_core::{op2, OpState};
use serde::{Deserialize, Serialize};

/// Designated output region the logging sink writes into, one entry per
/// call.
#[derive(Debug, Default, Clone, Serialize)]
pub struct LogRegion {
    pub entries: Vec<String>,
}

impl LogRegion {
    /// Region text as the user would see it.
    pub fn text(&self) -> String {
        self.entries.join("\n")
    }
}

/// Designated error region; stays hidden until the first failure.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ErrorRegion {
    pub visible: bool,
    pub text: String,
}

impl ErrorRegion {
    pub fn show(&mut self, message: impl Into<String>) {
        self.visible = true;
        self.text = message.into();
    }
}

/// Dimensions the drawing surface is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// One recorded 2-D context call (or property assignment, as `set:name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawCommand {
    pub op: String,
    pub args: Vec<serde_json::Value>,
}

/// Drawing surface - an ordered command log standing in for a canvas.
#[derive(Debug, Default, Clone)]
pub struct DrawSurface {
    pub commands: Vec<DrawCommand>,
}

#[op2(fast)]
pub fn op_log_write(state: &mut OpState, #[string] line: &str) {
    if let Some(region) = state.try_borrow_mut::<LogRegion>() {
        region.entries.push(line.to_string());
    }
}

#[op2]
pub fn op_draw_command(
    state: &mut OpState,
    #[string] name: &str,
    #[serde] args: Vec<serde_json::Value>,
) {
    if let Some(surface) = state.try_borrow_mut::<DrawSurface>() {
        surface.commands.push(DrawCommand {
            op: name.to_string(),
            args,
        });
    }
}

#[op2]
#[serde]
pub fn op_viewport_size(state: &mut OpState) -> Viewport {
    state.try_borrow::<Viewport>().copied().unwrap_or_default()
}

deno_core::extension!(
    sandbox_harness,
    ops = [op_log_write, op_draw_command, op_viewport_size],
    esm_entry_point = "ext:sandbox_harness/harness.js",
    esm = ["ext:sandbox_harness/harness.js" = "src/harness.js"],
    options = { viewport: Viewport },
    state = |state, options| {
        state.put(options.viewport);
        state.put(LogRegion::default());
        state.put(ErrorRegion::default());
        state.put(DrawSurface::default());
    },
);
