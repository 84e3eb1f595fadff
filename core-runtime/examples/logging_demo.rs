//! Logging system demonstration
//!
//! Shows the output formats and the host sink mirroring used by the
//! playback core.
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_playback=trace"
//! ```

use bridge_traits::{LogLevel, LoggerSink, RecordingLogger};
use core_runtime::logging::{init_logging, redact_url, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let sink = Arc::new(RecordingLogger::new(LogLevel::Warn));
    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_logger_sink(sink.clone() as Arc<dyn LoggerSink>);

    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(err) = init_logging(config) {
        eprintln!("failed to initialize logging: {}", err);
        return;
    }

    info!(format = ?format, "Logging initialized");

    let url = "https://cdn.example.com/tracks/42.mp3?Signature=abc";
    async {
        info!(track_id = "42", url = %redact_url(url), "Loading track");
        debug!(generation = 3u64, "Stale load completion dropped");
        warn!(error = "engine timeout", "Position poll failed");
        error!(track_id = "42", "Load failed");
    }
    .instrument(info_span!("play", session_id = "demo"))
    .await;

    tokio::task::yield_now().await;

    println!("\nHost sink received {} entries:", sink.entries().len());
    for entry in sink.entries() {
        println!("  [{:?}] {} {:?}", entry.level, entry.message, entry.fields);
    }
}
