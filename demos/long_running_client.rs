// ABOUTME: Long-running SMPP transceiver example with keep-alive, periodic sends and receipt counting
// ABOUTME: Shows how to watch session state and shut down cleanly on timeout or connection loss

//! # Long-Running SMPP Transceiver
//!
//! This example binds once and then:
//!
//! * lets the session's keep-alive task send enquire_link in the background
//! * optionally sends a message every `--sms-interval` seconds
//! * counts delivery receipts arriving on the listener
//! * stops when the run duration elapses or the session drops
//!
//! ## Usage
//!
//! ```bash
//! # Keep-alive only
//! cargo run --example long_running_client -- --system-id test --password secret
//!
//! # With periodic SMS sending
//! cargo run --example long_running_client -- \
//!   --system-id test --password secret \
//!   --to 447700900123 --from Sender \
//!   --sms-interval 120
//!
//! # Custom keep-alive settings
//! cargo run --example long_running_client -- \
//!   --system-id test --password secret \
//!   --keep-alive-interval 60 \
//!   --keep-alive-timeout 15 \
//!   --max-failures 5 \
//!   --run-duration 600
//! ```

use argh::FromArgs;
use smpp_session::client::{ClientBuilder, KeepAliveConfig, SessionState};
use smpp_session::datatypes::{CommandId, CommandStatus};
use smpp_session::{DeliveryReceipt, Frame};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Long-running SMPP transceiver with keep-alive
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname of IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// keep-alive interval in seconds (default: 30)
    #[argh(option)]
    keep_alive_interval: Option<u64>,

    /// keep-alive timeout in seconds (default: 10)
    #[argh(option)]
    keep_alive_timeout: Option<u64>,

    /// maximum consecutive failures before considering connection dead (default: 3)
    #[argh(option)]
    max_failures: Option<u32>,

    /// how long to run the client in seconds (default: 300, i.e., 5 minutes)
    #[argh(option)]
    run_duration: Option<u64>,

    /// interval between SMS sends in seconds (default: 60)
    #[argh(option)]
    sms_interval: Option<u64>,

    /// the recipient telephone number (optional - no SMS sent if not provided)
    #[argh(option, short = 't')]
    to: Option<String>,

    /// the telephone number that the message will be from (optional)
    #[argh(option, short = 'f')]
    from: Option<String>,
}

#[tokio::main]
async fn main() -> smpp_session::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let run_duration = Duration::from_secs(cli_args.run_duration.unwrap_or(300));
    let sms_interval = Duration::from_secs(cli_args.sms_interval.unwrap_or(60));

    let mut keep_alive = KeepAliveConfig::new(Duration::from_secs(
        cli_args.keep_alive_interval.unwrap_or(30),
    ));
    if let Some(timeout) = cli_args.keep_alive_timeout {
        keep_alive = keep_alive.with_timeout(Duration::from_secs(timeout));
    }
    if let Some(max_failures) = cli_args.max_failures {
        keep_alive = keep_alive.with_max_failures(max_failures);
    }

    let receipts = Arc::new(AtomicUsize::new(0));
    let receipt_counter = receipts.clone();

    info!("Starting long-running SMPP client");
    info!("Connecting to {host}:{port}");
    info!("Will run for {} seconds", run_duration.as_secs());

    let send_to = cli_args.to.zip(cli_args.from);
    let mut session = ClientBuilder::new(host, port)
        .credentials(
            cli_args.system_id.unwrap_or_default(),
            cli_args.password.unwrap_or_default(),
        )
        .keep_alive(keep_alive)
        .configure(|config| config.with_delivery_receipts(send_to.is_some()))
        .on(CommandId::DeliverSm, move |frame: &Frame| {
            if let Frame::DeliverSm(deliver) = frame {
                match DeliveryReceipt::from_deliver_sm(deliver) {
                    Ok(receipt) => {
                        receipt_counter.fetch_add(1, Ordering::Relaxed);
                        info!(message_id = %receipt.message_id, "Delivery receipt");
                    }
                    Err(_) => debug!(from = %deliver.source_addr, "Mobile originated message"),
                }
            }
            CommandStatus::Ok
        })
        .bind()
        .await
        .inspect_err(|e| error!("Connect/bind failed: {e}"))?;

    info!("Connected and bound successfully");

    let mut states = session.subscribe_state();
    let mut sms_timer = send_to.as_ref().map(|_| interval(sms_interval));

    let start_time = Instant::now();
    let mut message_count = 0;
    let mut connection_lost = false;

    info!("Entering main loop");

    loop {
        tokio::select! {
            _ = sleep(run_duration.saturating_sub(start_time.elapsed())) => {
                info!("Run duration elapsed, shutting down");
                break;
            }

            _ = states.wait_for(|state| *state == SessionState::Disconnected) => {
                connection_lost = true;
                break;
            }

            _ = async {
                match sms_timer.as_mut() {
                    Some(timer) => {
                        timer.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            } => {
                if let Some((to, from)) = &send_to {
                    message_count += 1;
                    let text = format!("Test message #{message_count} from long-running client");
                    match session.send_message(from, to, &text).await {
                        Ok(sequence_numbers) => info!(
                            "Message {} submitted as {} segment(s), {} request(s) in flight",
                            message_count,
                            sequence_numbers.len(),
                            session.pending_requests()
                        ),
                        Err(e) => error!("Failed to send message {message_count}: {e}"),
                    }
                }
            }
        }
    }

    if connection_lost {
        match session.wait_closed().await {
            Ok(()) => info!("SMSC closed the session"),
            Err(e) => error!("Session lost: {e}"),
        }
    } else if let Err(e) = session.unbind().await {
        warn!("Unbind failed: {e}");
    }

    info!("Final statistics:");
    info!("  Total SMS messages sent: {message_count}");
    info!("  Delivery receipts received: {}", receipts.load(Ordering::Relaxed));
    info!("Client ran for {:.1} seconds", start_time.elapsed().as_secs_f64());

    Ok(())
}
