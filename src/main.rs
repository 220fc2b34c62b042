use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use padbridge::config::{self, AppConfig};
use padbridge::controller::device::parse_vid_pid;
use padbridge::keyboard::layout::BuiltinLayout;
use padbridge::keyboard::scan::SCAN_ESC;
use padbridge::keyboard::translator::{InputKey, KeyData, KeyState};
use padbridge::session::actor::ActorTiming;
use padbridge::session::{Context, DeviceSession, LoggingHooks, NullTransport, SessionActor, SessionHandle};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEVICE_ENV: &str = "PADBRIDGE_DEVICE";
const DEFAULT_DEVICE: &str = "045E:028E";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    // Konfiguration vor dem Logging lesen, damit das Level greift
    let config_path = config::config_path()?;
    let loaded = AppConfig::read(&config_path).await;
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level())
        .unwrap_or(Level::INFO);
    setup_logging(level);
    let app_config = AppConfig::resolve(loaded, &config_path).await;

    let context = Context::from_config(&app_config);

    let selector = std::env::var(DEVICE_ENV).unwrap_or_else(|_| DEFAULT_DEVICE.to_string());
    let (vendor_id, product_id) =
        parse_vid_pid(&selector).map_err(|e| eyre!("Invalid {}: {}", DEVICE_ENV, e))?;
    let device = context
        .classifier
        .classify(vendor_id, product_id)
        .cloned()
        .ok_or_else(|| eyre!("Device {:04X}:{:04X} is not supported", vendor_id, product_id))?;
    info!("Using device {}", device);

    let session = DeviceSession::new(&context, device.kind, &BuiltinLayout);
    let shutdown = CancellationToken::new();
    let (handle, actor_task) = SessionActor::spawn(
        session,
        Box::new(NullTransport),
        Box::new(LoggingHooks),
        ActorTiming::from_config(&app_config),
        shutdown.clone(),
    );

    let (escape_tx, escape_rx) = mpsc::channel(8);
    let escape = KeyData {
        key: InputKey {
            scan_code: SCAN_ESC,
            unicode_char: 0,
        },
        state: KeyState::default(),
    };
    handle.register_notify(escape, escape_tx).await?;

    let reader = tokio::spawn(read_reports(handle.clone(), shutdown.clone()));
    let consumer = tokio::spawn(consume(handle, escape_rx, shutdown.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }

    if let Err(e) = reader.await {
        warn!("Report reader ended abnormally: {}", e);
    }
    if let Err(e) = consumer.await {
        warn!("Consumer ended abnormally: {}", e);
    }
    actor_task
        .await
        .map_err(|e| eyre!("Session actor failed: {}", e))?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    Ok(())
}

fn setup_logging(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// Hex report per line, e.g. `00 0e 01 00 ...`. `error` and `stall` simulate
/// a failed transfer.
fn parse_report_line(line: &str) -> Result<Vec<u8>> {
    let digits: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || !digits.is_ascii() || digits.len() % 2 != 0 {
        return Err(eyre!("Expected an even number of hex digits, got {:?}", line));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| eyre!("Invalid hex byte {:?}: {}", &digits[i..i + 2], e))
        })
        .collect()
}

async fn read_reports(handle: SessionHandle, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let result = match line {
            Ok(Some(line)) => match line.trim() {
                "" => continue,
                "error" => handle.transport_error(false).await,
                "stall" => handle.transport_error(true).await,
                report => match parse_report_line(report) {
                    Ok(data) => handle.submit_report(data).await,
                    Err(e) => {
                        warn!("Skipping input line: {}", e);
                        continue;
                    }
                },
            },
            Ok(None) => {
                info!("Report input closed");
                shutdown.cancel();
                break;
            }
            Err(e) => {
                error!("Failed to read report input: {}", e);
                shutdown.cancel();
                break;
            }
        };
        if let Err(e) = result {
            error!("Session unavailable: {}", e);
            break;
        }
    }
}

async fn consume(
    handle: SessionHandle,
    mut escape_rx: mpsc::Receiver<KeyData>,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(_) = escape_rx.recv() => info!("Escape notification"),
            _ = interval.tick() => {
                if let Err(e) = poll_once(&handle).await {
                    error!("Polling stopped: {}", e);
                    break;
                }
            }
        }
    }
    debug!("Consumer finished");
}

async fn poll_once(handle: &SessionHandle) -> Result<()> {
    while let Some(data) = handle.read_key().await? {
        info!(
            "[{}] key scan={:#04x} char={:?} shift={:?} toggle={:?}",
            Local::now().format("%H:%M:%S.%3f"),
            data.key.scan_code,
            data.character(),
            data.state.shift,
            data.state.toggle
        );
    }
    if let Some(pointer) = handle.read_pointer().await? {
        info!(
            "[{}] pointer dx={} dy={} dz={} buttons(l/r/m)={}/{}/{}",
            Local::now().format("%H:%M:%S.%3f"),
            pointer.relative_x,
            pointer.relative_y,
            pointer.relative_z,
            pointer.left_button,
            pointer.right_button,
            pointer.middle_button
        );
    }
    Ok(())
}
