use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result},
    clap::Args,
    hookrelay_common::InboundMessage,
    hookrelay_config::HookrelayConfig,
    hookrelay_gateway::Gateway,
    hookrelay_relay::CommandReply,
    tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    tokio_util::{sync::CancellationToken, task::TaskTracker},
    tracing::{info, warn},
};

#[derive(Args)]
pub struct RunArgs {
    /// JSON-lines file of chat events. Reads stdin when omitted.
    #[arg(long, short)]
    input: Option<PathBuf>,
}

/// Counters reported when intake stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub dispatched: usize,
    pub skipped: usize,
}

pub async fn handle_run(config: HookrelayConfig, args: RunArgs) -> Result<()> {
    let gateway = Arc::new(Gateway::from_config(&config).await?);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight messages");
            on_signal.cancel();
        }
    });

    let stats = match args.input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            relay_lines(Arc::clone(&gateway), BufReader::new(file), cancel).await?
        },
        None => {
            relay_lines(
                Arc::clone(&gateway),
                BufReader::new(tokio::io::stdin()),
                cancel,
            )
            .await?
        },
    };

    gateway.shutdown().await;
    info!(
        dispatched = stats.dispatched,
        skipped = stats.skipped,
        "intake finished"
    );
    Ok(())
}

/// Dispatch every JSON line from `reader` until EOF or cancellation.
///
/// Listener events run concurrently. An admin command first waits for every
/// earlier event to finish, then runs inline, so each event sees the settings
/// in effect where it appears in the input. Waits for all spawned work before
/// returning.
pub async fn relay_lines<R>(
    gateway: Arc<Gateway>,
    reader: R,
    cancel: CancellationToken,
) -> Result<RunStats>
where
    R: AsyncBufRead + Unpin,
{
    let tracker = TaskTracker::new();
    let mut lines = reader.lines();
    let mut stats = RunStats::default();
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            line = lines.next_line() => line.context("reading input")?,
        };
        let Some(line) = line else {
            break;
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let message: InboundMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed event");
                stats.skipped += 1;
                continue;
            },
        };
        stats.dispatched += 1;

        if gateway.parse_command(&message.content).is_some() {
            tracker.close();
            tracker.wait().await;
            tracker.reopen();
            let replies = gateway.dispatch(&message).await;
            print_replies(&message, &replies);
        } else {
            let gateway = Arc::clone(&gateway);
            tracker.spawn(async move {
                gateway.dispatch(&message).await;
            });
        }
    }

    tracker.close();
    tracker.wait().await;
    Ok(stats)
}

fn print_replies(message: &InboundMessage, replies: &[CommandReply]) {
    for reply in replies {
        println!("[{}] {reply}", message.channel_id);
    }
}
