//! callctl loopback harness entry point.

use std::sync::Arc;

use callctl_core::clock::SystemClock;
use callctl_core::command::Command;
use callctl_core::transport::Transport;
use callctl_dispatch::dispatcher::Dispatcher;
use callctl_loopback::config::LoopbackConfig;
use callctl_loopback::echo::{EchoTransport, serve_echo};
use callctl_loopback::error::AppError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting callctl loopback harness");

    // Read configuration from environment.
    let config = LoopbackConfig::from_env()?;

    // Wire the dispatcher to the echo server.
    let (transport, inbound) = EchoTransport::channel();
    let transport: Arc<dyn Transport<String>> = Arc::new(transport);
    let dispatcher: Arc<Dispatcher<String, String>> = Arc::new(Dispatcher::new(
        transport,
        Arc::new(SystemClock),
        config.dispatch,
    ));
    let server = tokio::spawn(serve_echo(
        inbound,
        Arc::clone(&dispatcher),
        config.echo_delay,
    ));

    // Each caller blocks on its own response, off the async workers.
    let callers: Vec<_> = (0..config.commands)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::task::spawn_blocking(move || {
                let command = Arc::new(Command::new(format!("ask #{i}")));
                dispatcher
                    .execute_and_await(&command)
                    .map(|response| (command.request_id().clone(), response))
            })
        })
        .collect();

    let mut failures = 0_usize;
    for caller in callers {
        match caller.await? {
            Ok((request_id, response)) => {
                tracing::info!(%request_id, %response, "command complete");
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(error = %err, retryable = err.is_retryable(), "command failed");
            }
        }
    }

    let pending = serde_json::to_string(&dispatcher.pending_snapshot())
        .unwrap_or_else(|e| format!("<unserializable: {e}>"));
    tracing::info!(failures, %pending, "Loopback run finished");

    server.abort();
    Ok(())
}
