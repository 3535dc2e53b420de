use clap::Parser;
use comfy_table::{Cell, Table};
use lanventory::{DeviceStatus, DiscoveryEngine};
use std::fs::File;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// lanventory: LAN inventory scanner.
///
/// Probes every host in a CIDR range for reachability, open ports,
/// MAC/vendor and hostnames, then prints the device table.
#[derive(Debug, Parser)]
#[command(name = "lanventory", version)]
struct Cli {
    /// CIDR range to scan (e.g. 192.168.1.0/24).
    cidr: String,

    /// Number of concurrent scanning workers.
    #[arg(long, default_value_t = 50)]
    workers: usize,

    /// Enable debug mode (writes debug.log and the per-scan report.log).
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.debug {
        let log_file = match File::create("debug.log") {
            Ok(file) => file,
            Err(err) => {
                eprintln!("error opening debug.log: {err}");
                return ExitCode::FAILURE;
            }
        };
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(Mutex::new(log_file))
            .with_ansi(false)
            .init();
    }

    let engine = match DiscoveryEngine::new(cli.debug) {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = engine.scan(&cli.cidr, cli.workers) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let Some((mut device_rx, mut done_rx)) = engine.results() else {
        eprintln!("error: results stream already taken");
        return ExitCode::FAILURE;
    };

    // Ctrl-C cancels the scan; the engine still drains to a clean finish.
    let stopper = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            changed = done_rx.changed() => {
                if changed.is_err() || *done_rx.borrow() {
                    break;
                }
            }
            device = device_rx.recv() => {
                // The stream is a low-latency notification channel; the
                // final table reads the device map instead.
                if let Some(device) = device {
                    eprint!("\rfound {}                    ", device.ip);
                }
            }
            _ = ticker.tick() => {
                let stats = engine.stats();
                eprint!(
                    "\rscanned {}/{} ({} up)   ",
                    stats.scanned, stats.total, stats.discovered
                );
            }
        }
    }
    eprintln!();

    let devices = engine.devices();
    let mut table = Table::new();
    table.set_header(vec![
        "IP", "Hostname", "mDNS Name", "MAC", "Vendor", "Type", "Ports",
    ]);
    let mut up_count = 0usize;
    for device in &devices {
        if device.status != DeviceStatus::Up {
            continue;
        }
        up_count += 1;
        let dash = |s: &str| {
            if s.is_empty() {
                "—".to_string()
            } else {
                s.to_string()
            }
        };
        table.add_row(vec![
            Cell::new(device.ip.to_string()),
            Cell::new(dash(&device.hostnames.join(", "))),
            Cell::new(dash(&device.mdns_name)),
            Cell::new(dash(&device.mac)),
            Cell::new(dash(&device.vendor)),
            Cell::new(device.device_type.to_string()),
            Cell::new(
                device
                    .open_ports
                    .iter()
                    .map(|port| port.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]);
    }
    println!("{table}");
    println!(
        "{up_count} devices up out of {} addresses scanned",
        devices.len()
    );

    ExitCode::SUCCESS
}
