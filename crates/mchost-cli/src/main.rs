//! `mchost`: talk to a MeshCore companion radio over serial or TCP.

mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use mchost_client::{ChunkProgress, Companion, CompanionConfig, Event, RequestOptions, TcpTransport};
use mchost_protocol::{ChannelMessage, DirectMessage, IncomingMessage};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{resolve_link, FileConfig, Link, LinkOverrides};
use crate::error::CliError;

const LISTEN_POLL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "mchost", version, about = "Host for MeshCore companion radios")]
struct Cli {
    /// Serial device of the radio.
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "tcp")]
    serial: Option<String>,

    /// TCP bridge of the radio.
    #[arg(long, global = true, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Serial baud rate.
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reply deadline for each command, in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial devices that look like radios.
    Ports,

    /// Show node identity, firmware and battery.
    Info,

    /// List stored contacts.
    Contacts {
        /// Only contacts modified after this Unix time.
        #[arg(long)]
        since: Option<u32>,
    },

    /// Send a direct message; long text is split into chunks.
    Send {
        /// Recipient key or key prefix (at least 6 bytes), as hex.
        prefix: String,
        text: String,
    },

    /// Send a message to a channel slot.
    Channel { index: u8, text: String },

    /// Drain the radio's offline message queue.
    Sync,

    /// Print events until Ctrl-C.
    Listen,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("mchost: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    if let Command::Ports = cli.command {
        return list_ports();
    }

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let link = resolve_link(
        &file,
        &LinkOverrides {
            serial: cli.serial.clone(),
            tcp: cli.tcp.clone(),
            baud: cli.baud,
        },
    )?;
    let mut companion_config = file.companion;
    if let Some(ms) = cli.timeout_ms {
        companion_config.command_timeout_ms = ms;
    }

    let companion = open(link, companion_config)?;
    let me = companion.connect(&RequestOptions::default())?;
    info!(name = %me.node_name, key = %me.public_key.prefix(), "connected");

    let result = match cli.command {
        Command::Ports => list_ports(),
        Command::Info => show_info(&companion),
        Command::Contacts { since } => list_contacts(&companion, since),
        Command::Send { prefix, text } => send_direct(&companion, &prefix, &text),
        Command::Channel { index, text } => send_channel(&companion, index, &text),
        Command::Sync => sync_messages(&companion).map(|_| ExitCode::SUCCESS),
        Command::Listen => listen(&companion),
    };

    if let Err(e) = companion.close() {
        debug!(error = %e, "close failed");
    }
    result
}

fn open(link: Link, config: CompanionConfig) -> Result<Companion, CliError> {
    match link {
        Link::Tcp(tcp) => {
            debug!(address = %tcp.address, "using tcp link");
            Ok(Companion::new(TcpTransport::new(tcp), config))
        }
        #[cfg(unix)]
        Link::Serial(serial) => {
            debug!(path = %serial.path, baud = serial.baud_rate, "using serial link");
            Ok(Companion::new(
                mchost_client::SerialTransport::new(serial),
                config,
            ))
        }
        #[cfg(not(unix))]
        Link::Serial(_) => Err(CliError::SerialUnsupported),
    }
}

fn list_ports() -> Result<ExitCode, CliError> {
    let ports = mchost_client::list_serial_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{}", port.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn show_info(companion: &Companion) -> Result<ExitCode, CliError> {
    let options = RequestOptions::default();
    if let Some(me) = companion.self_info() {
        println!("Name:        {}", me.node_name);
        println!("Public key:  {}", me.public_key);
        println!(
            "Radio:       {:.3} MHz, BW {:.1} kHz, SF{}, CR{}",
            me.frequency_mhz(),
            me.bandwidth_khz(),
            me.spreading_factor,
            me.coding_rate
        );
        println!("TX power:    {} dBm (max {})", me.tx_power_dbm, me.max_tx_power_dbm);
    }

    match companion.query_device(&options) {
        Ok(device) => {
            println!("Firmware:    {} ({})", device.firmware_version, device.build_date);
            println!("Hardware:    {}", device.manufacturer);
            println!("Max contacts: {}", device.max_contacts());
        }
        Err(e) => warn!(error = %e, "device query failed"),
    }
    match companion.get_battery(&options) {
        Ok(battery) => println!("Battery:     {:.2} V", battery.battery_volts()),
        Err(e) => warn!(error = %e, "battery query failed"),
    }
    match companion.get_device_time(&options) {
        Ok(secs) => println!("Clock:       {}", format_time(secs)),
        Err(e) => warn!(error = %e, "clock query failed"),
    }
    Ok(ExitCode::SUCCESS)
}

fn list_contacts(companion: &Companion, since: Option<u32>) -> Result<ExitCode, CliError> {
    let contacts = companion.get_contacts(since, &RequestOptions::default())?;
    println!("{:<12} {:<4} {:>5} {:<32} {}", "PREFIX", "TYPE", "PATH", "NAME", "LAST ADVERT");
    for contact in &contacts {
        let path = if contact.has_direct_path() {
            contact.out_path_len.to_string()
        } else {
            "flood".to_string()
        };
        println!(
            "{:<12} {:<4} {:>5} {:<32} {}",
            contact.public_key.prefix().to_hex(),
            contact.contact_type,
            path,
            contact.name,
            format_time(contact.last_advert_timestamp)
        );
    }
    println!("{} contact(s)", contacts.len());
    Ok(ExitCode::SUCCESS)
}

fn report_progress(progress: ChunkProgress) {
    match progress {
        ChunkProgress::Sending { index, total } if total > 1 => {
            eprintln!("sending part {}/{}", index + 1, total)
        }
        ChunkProgress::Sent {
            index,
            total,
            success: false,
        } => eprintln!("part {}/{} failed", index + 1, total),
        _ => {}
    }
}

fn send_direct(companion: &Companion, prefix: &str, text: &str) -> Result<ExitCode, CliError> {
    let recipient = hex::decode(prefix)?;
    let all_sent = companion
        .message_sender()
        .send_direct(&recipient, text, report_progress)?;
    Ok(exit_for(all_sent))
}

fn send_channel(companion: &Companion, index: u8, text: &str) -> Result<ExitCode, CliError> {
    let all_sent = companion
        .message_sender()
        .send_channel(index, text, report_progress)?;
    Ok(exit_for(all_sent))
}

fn exit_for(all_sent: bool) -> ExitCode {
    if all_sent {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn sync_messages(companion: &Companion) -> Result<usize, CliError> {
    let mut count = 0;
    while let Some(message) = companion.sync_next_message(&RequestOptions::default())? {
        match message {
            IncomingMessage::Direct(msg) => print_direct(&msg),
            IncomingMessage::Channel(msg) => print_channel(&msg),
        }
        count += 1;
    }
    debug!(count, "offline queue drained");
    Ok(count)
}

fn listen(companion: &Companion) -> Result<ExitCode, CliError> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))?;

    let events = companion.subscribe();
    sync_messages(companion)?;
    eprintln!("listening, Ctrl-C to stop");

    while running.load(Ordering::SeqCst) {
        let Ok(event) = events.recv_timeout(LISTEN_POLL) else {
            continue;
        };
        companion.discard_queued_messages();
        match event {
            Event::DirectMessage(msg) => print_direct(&msg),
            Event::ChannelMessage(msg) => print_channel(&msg),
            Event::MessageWaiting => {
                sync_messages(companion)?;
            }
            Event::Advert(key) => println!("advert from {}", key.prefix()),
            Event::PathUpdated(key) => println!("path updated for {}", key.prefix()),
            Event::SendConfirmed {
                ack_hash,
                trip_time_ms,
            } => println!("ack {:08x} after {} ms", ack_hash, trip_time_ms),
            Event::Error(reason) => {
                eprintln!("link lost: {}", reason);
                return Ok(ExitCode::FAILURE);
            }
            Event::Disconnected => break,
            other => debug!(?other, "event"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_direct(msg: &DirectMessage) {
    println!(
        "[{}] {}: {}{}",
        format_time(msg.timestamp),
        msg.sender_prefix,
        msg.text,
        snr_suffix(msg.snr())
    );
}

fn print_channel(msg: &ChannelMessage) {
    println!(
        "[{}] #{} {}: {}{}",
        format_time(msg.timestamp),
        msg.channel_idx,
        msg.sender.as_deref().unwrap_or("?"),
        msg.text,
        snr_suffix(msg.snr())
    );
}

fn snr_suffix(snr: Option<f32>) -> String {
    snr.map(|snr| format!(" (SNR {:.1} dB)", snr))
        .unwrap_or_default()
}

fn format_time(secs: u32) -> String {
    chrono::DateTime::from_timestamp(i64::from(secs), 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}
