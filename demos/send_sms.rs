// ABOUTME: Example application that binds as a transceiver, sends one SMS and waits for its receipt
// ABOUTME: Shows ClientBuilder, per-segment submit tracking and a deliver_sm handler feeding a channel

use argh::FromArgs;
use smpp_session::client::{ClientBuilder, KeepAliveConfig};
use smpp_session::datatypes::{CommandId, CommandStatus};
use smpp_session::{DeliveryReceipt, Frame, Segmenter, TargetEncoding};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Example application to show the simplest case of sending an SMS message
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

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: String,

    /// seconds to wait for delivery receipts after submitting (default: 0)
    #[argh(option, default = "0")]
    wait_receipts: u64,
}

#[tokio::main]
async fn main() -> smpp_session::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let want_receipts = cli_args.wait_receipts > 0;

    let (receipts_tx, mut receipts_rx) = mpsc::unbounded_channel();
    let mut session = ClientBuilder::new(host.as_str(), port)
        .credentials(
            cli_args.system_id.unwrap_or_default(),
            cli_args.password.unwrap_or_default(),
        )
        .keep_alive(KeepAliveConfig::new(Duration::from_secs(30)))
        .configure(|config| config.with_delivery_receipts(want_receipts))
        .on(CommandId::DeliverSm, move |frame: &Frame| {
            if let Frame::DeliverSm(deliver) = frame {
                match DeliveryReceipt::from_deliver_sm(deliver) {
                    Ok(receipt) => {
                        let _ = receipts_tx.send(receipt.message_id);
                    }
                    Err(e) => eprintln!("Unparseable deliver_sm: {e}"),
                }
            }
            CommandStatus::Ok
        })
        .bind()
        .await
        .inspect_err(|e| eprintln!("Connection/bind failed: {e}"))?;

    println!("Connected to {host}:{port} and bound as transceiver");

    let message = Segmenter::new().segment(&cli_args.message, TargetEncoding::Auto)?;
    println!(
        "Sending {} segment(s) as {}",
        message.len(),
        message.data_coding
    );

    let mut message_ids = Vec::with_capacity(message.len());
    for segment in message.iter() {
        let pending = session
            .submit_tracked(&cli_args.from, &cli_args.to, segment, want_receipts)
            .await?;
        match session.message_id(pending).await {
            Ok(id) => {
                println!("Segment accepted, message ID: {id}");
                message_ids.push(id);
            }
            Err(e) => {
                eprintln!("Failed to send message: {e}");
                let _ = session.unbind().await;
                return Err(e.into());
            }
        }
    }

    if want_receipts {
        let deadline = tokio::time::sleep(Duration::from_secs(cli_args.wait_receipts));
        tokio::pin!(deadline);
        while !message_ids.is_empty() {
            tokio::select! {
                _ = &mut deadline => {
                    println!("Gave up waiting for {} receipt(s)", message_ids.len());
                    break;
                }
                Some(id) = receipts_rx.recv() => {
                    println!("Delivery receipt for {id}");
                    message_ids.retain(|pending| *pending != id);
                }
            }
        }
    }

    if let Err(e) = session.unbind().await {
        eprintln!("Warning: Unbind failed: {e}");
    }
    Ok(())
}
