//! Live Sandbox CLI
//!
//! Single-shot mode:
//!   live-sandbox <fragments.json>
//!
//! Server mode (persistent process, one rebuild per stdin line):
//!   live-sandbox --server
//!
//! Protocol (server mode):
//!   Request (stdin), one JSON fragment array per line:
//!     [{"name":"index","code":"log(1)"}]
//!
//!   Response (stdout):
//!     Status:Ok
//!     Length:123
//!
//!     {"logs":["1"],"error":{"visible":false,"text":""},...}
//!
//!   Error response (malformed request):
//!     Status:Error
//!     Length:42
//!
//!     fragment set has no 'index' entry fragment

use anyhow::{anyhow, Result};
use live_sandbox::{Fragment, FragmentSet, Playground, PlaygroundConfig};
use std::io::{BufRead, Write};

fn print_usage() {
    eprintln!("Live Sandbox - live-coding playground pipeline");
    eprintln!();
    eprintln!("Single-shot mode:");
    eprintln!("  live-sandbox <fragments.json>");
    eprintln!();
    eprintln!("Server mode (persistent process):");
    eprintln!("  live-sandbox --server");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  live-sandbox ./sketch.json");
    eprintln!("  live-sandbox --server");
}

/// Run one fragment file through the pipeline and print the log region.
async fn run_single_shot(fragments_path: &str) -> Result<()> {
    let fragments = FragmentSet::load(fragments_path)?;

    let mut playground = Playground::new(PlaygroundConfig::default());
    let output = playground.update(&fragments).await?;

    if output.error.visible {
        eprintln!("[ERROR] {}", output.error.text);
    }
    if !output.draw_commands.is_empty() {
        eprintln!(
            "[live-sandbox] {} draw commands recorded",
            output.draw_commands.len()
        );
    }

    println!("{}", output.logs.join("\n"));

    Ok(())
}

/// Run in server mode: every stdin line is one edit of the fragment set.
/// Cache and executor persist across edits, so remote dependencies are
/// fetched once and realm handles are recycled run to run.
async fn run_server() -> Result<()> {
    let mut playground = Playground::new(PlaygroundConfig::default());

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut reader = stdin.lock();

    eprintln!("[live-sandbox] Server ready, reading from stdin...");

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            // EOF - stdin closed, exit gracefully
            break;
        }

        let request = line.trim();
        if request.is_empty() {
            continue;
        }

        let fragments: Vec<Fragment> = match serde_json::from_str(request) {
            Ok(fragments) => fragments,
            Err(e) => {
                write_response(&mut stdout, false, &format!("Invalid fragment JSON: {e}"))?;
                continue;
            }
        };

        let set = match FragmentSet::new(fragments) {
            Ok(set) => set,
            Err(e) => {
                write_response(&mut stdout, false, &e.to_string())?;
                continue;
            }
        };

        match playground.update(&set).await {
            Ok(output) => {
                let body = serde_json::to_string(&output)?;
                write_response(&mut stdout, true, &body)?;
            }
            Err(e) => {
                write_response(&mut stdout, false, &e.to_string())?;
            }
        }
    }

    eprintln!("[live-sandbox] Server shutting down");
    Ok(())
}

/// Write response in length-prefixed protocol
fn write_response(stdout: &mut std::io::Stdout, ok: bool, body: &str) -> Result<()> {
    let status = if ok { "Ok" } else { "Error" };

    writeln!(stdout, "Status:{}", status)?;
    writeln!(stdout, "Length:{}", body.len())?;
    writeln!(stdout)?; // Empty line separator
    write!(stdout, "{}", body)?;
    stdout.flush()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Protocol output owns stdout; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Err(anyhow!("Missing required arguments"));
    }

    if args[1] == "--server" {
        return run_server().await;
    }

    run_single_shot(&args[1]).await
}
