use std::{env, ffi::OsString};

use facade_utils::{init_logging, Config, Pipeline};
use tokio::io::{self, AsyncReadExt};
use tracing::error;

/// Reads the whole submission from standard input, a read error keeps
/// whatever was received before it.
async fn read_submission() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = io::stdin().read_to_end(&mut buffer).await {
        error!(error = %e, received = buffer.len(), "Failed to read message from stdin");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Converts the process arguments to text, arguments that are not valid
/// Unicode are kept with their invalid sequences replaced.
fn collect_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

#[tokio::main]
async fn main() {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration, using defaults: {e}");
        Config::default()
    });
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{e}");
    }

    let raw = read_submission().await;
    let args = collect_args(env::args_os().skip(1));

    // Submitters only expect the message to be accepted, delivery
    // problems are recorded in the logs and the exit status stays zero.
    let pipeline = Pipeline::from_config(&config, args);
    pipeline.submit(&raw).settle().await;
}
