//! Bridge Runtime
//!
//! Minimal binary that boots a script context with the bridge installed.
//!
//! ```bash
//! bridge                                  # demo script
//! bridge game.js --settings bridge.json
//! ```

use anyhow::{Context, Result};
use bridge_core::StructRegistry;
use bridge_script::{MarshalSettings, ScriptRuntime, ScriptValue};
use clap::Parser;
use std::path::PathBuf;

const DEMO_SCRIPT: &str = r#"
const rect = bridgeConvert("{CGRect}", { origin: [10, 20], size: { width: 300 } });
print("rect", rect);
print("CGRect is", bridgeSizeOf("{CGRect}"), "bytes:", bridgeExplain("{CGRect}"));
print("clamped byte", bridgeConvert("C", 300));
print("call frame", bridgeCall("v@:{CGPoint}d", null, "moveTo:duration:", 1, 2, 0.25));
try {
    bridgeConvert("s", 1e6);
} catch (e) {
    print("caught", e.name, e.message);
}
"#;

/// Field layouts of the CoreGraphics geometry structs.
fn core_graphics(name: &str) -> Option<String> {
    let encoding = match name {
        "CGPoint" => "{CGPoint=\"x\"d\"y\"d}",
        "CGSize" => "{CGSize=\"width\"d\"height\"d}",
        "CGRect" => "{CGRect=\"origin\"{CGPoint}\"size\"{CGSize}}",
        "CGVector" => "{CGVector=\"dx\"d\"dy\"d}",
        "_NSRange" => "{_NSRange=\"location\"Q\"length\"Q}",
        _ => return None,
    };
    Some(encoding.to_string())
}

/// Run scripts against the value bridge
#[derive(Parser, Debug)]
#[command(name = "bridge")]
#[command(version)]
struct Args {
    /// Script to run; a short demo runs when omitted
    script: Option<PathBuf>,

    /// JSON marshalling settings
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Bridge v{}", bridge_core::VERSION);
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => MarshalSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => MarshalSettings::default(),
    };
    tracing::debug!(?settings, "marshal settings");

    StructRegistry::global().set_resolver(core_graphics);

    let runtime = ScriptRuntime::with_settings(settings)?;
    runtime.install_print()?;
    runtime.install_bridge()?;

    match &args.script {
        Some(path) => {
            tracing::info!("Running {}", path.display());
            runtime.execute_file(path)?;
        }
        None => {
            runtime.execute(DEMO_SCRIPT)?;

            let values: Vec<ScriptValue> = vec![ScriptValue::Null, "setFrame:".into(), 0.into(), 0.into(), 640.into(), 480.into()];
            let frame = runtime.call_with_arguments("v@:{CGRect}", &values)?;
            tracing::info!(frame = ?frame[2], "native frame argument");
        }
    }

    let collected = runtime.collect();
    tracing::info!(collected, "Runtime finished");
    Ok(())
}
