use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use device_link::{
    available_ports, DeviceLink, LinkConfig, TokioSerialConnector, DEFAULT_BAUD_RATE,
    DEFAULT_SETTLE_DELAY,
};
use gateway_api::{translator, ApiContext};
use pose::{classify, extension_states, PoseSample};
use shared::{error::ApiException, protocol::ConnectRequest};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: &str = "/dev/tty.usbserial-210";

#[derive(Parser, Debug)]
#[command(about = "Bench tools for the serial hand")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports the OS reports.
    Ports,
    /// Send one command line and print any acknowledgement.
    Send {
        #[arg(long, default_value = DEFAULT_PORT)]
        port: String,
        #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
        baud: u32,
        #[arg(long, default_value_t = 500)]
        ack_ms: u64,
        token: String,
    },
    /// Run every gesture, then move each servo to 90 degrees.
    Diagnose {
        #[arg(long, default_value = DEFAULT_PORT)]
        port: String,
        #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
        baud: u32,
        /// Time given to each motion before the next command.
        #[arg(long, default_value_t = 2000)]
        pause_ms: u64,
    },
    /// Classify a pose JSON file offline.
    Classify { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Ports => {
            let ports = available_ports().context("failed to enumerate serial ports")?;
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                println!("{port}");
            }
        }
        Command::Send {
            port,
            baud,
            ack_ms,
            token,
        } => {
            let api = ApiContext {
                link: Arc::new(open_link(Duration::from_millis(ack_ms))),
                candidates: vec![port.clone()],
                default_baud_rate: baud,
            };
            gateway_api::connect(
                &api,
                ConnectRequest {
                    port: Some(port),
                    baud_rate: Some(baud),
                },
            )
            .await
            .map_err(ApiException::from)?;
            let response = gateway_api::send_raw(&api, &token)
                .await
                .map_err(ApiException::from)?;
            println!("{}", response.message);
            print_acknowledgements(&response.acknowledgements);
            api.link.disconnect().await;
        }
        Command::Diagnose {
            port,
            baud,
            pause_ms,
        } => diagnose(&port, baud, Duration::from_millis(pause_ms)).await?,
        Command::Classify { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("'{}' is not valid JSON", file.display()))?;
            let sample = PoseSample::from_json(&payload);
            let result = classify(&sample);
            if let Some(states) = extension_states(&sample) {
                for (finger, extended) in states {
                    println!("{finger:>6}: {}", if extended { "extended" } else { "bent" });
                }
            }
            println!("{} ({:.2})", result.label, result.confidence);
        }
    }

    Ok(())
}

fn open_link(ack_window: Duration) -> DeviceLink {
    DeviceLink::new(
        Arc::new(TokioSerialConnector::default()),
        LinkConfig {
            settle_delay: DEFAULT_SETTLE_DELAY,
            ack_window,
        },
    )
}

async fn diagnose(port: &str, baud: u32, pause: Duration) -> Result<()> {
    let link = open_link(Duration::from_secs(1));
    link.connect(port, baud).await?;
    println!("connected to {port} at {baud} baud");

    let mut steps: Vec<String> = ["RESET", "ROCK", "PAPER", "SCISSORS"]
        .into_iter()
        .map(str::to_string)
        .collect();
    for index in 0..translator::SERVO_COUNT {
        steps.push(translator::servo(index, 90)?.into_string());
    }

    let mut faults = 0usize;
    for step in &steps {
        println!("\n> {step}");
        let receipt = link.send_command(step).await?;
        print_acknowledgements(&receipt.acknowledgements);
        for line in receipt.diagnostics() {
            faults += 1;
            println!("  !! fault reported: {line}");
        }
        tokio::time::sleep(pause).await;
    }

    link.disconnect().await;
    println!("\ndiagnostic finished, {faults} fault line(s)");
    Ok(())
}

fn print_acknowledgements(lines: &[String]) {
    if lines.is_empty() {
        println!("  (no acknowledgement)");
    }
    for line in lines {
        println!("  < {line}");
    }
}
