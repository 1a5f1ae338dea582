use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use i2cbus::{BusConfig, BusHandle, I2cDev, LockRegistry, Transferred};
use tracing_subscriber::EnvFilter;

mod hex;

#[cfg(not(target_os = "linux"))]
compile_error!("i2cbus-tool needs the Linux i2c-dev interface");

#[derive(Parser)]
#[command(author, version, about = "Talk to I2C devices over /dev/i2c-N")]
struct Cli {
    #[command(flatten)]
    target: Target,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Target {
    /// Bus index (N in /dev/i2c-N)
    #[arg(short, long, default_value_t = 1)]
    bus: usize,

    /// Slave address, e.g. 0x48
    #[arg(short, long, value_parser = hex::parse_address)]
    address: u16,

    /// Number of buses the lock table covers
    #[arg(long, default_value_t = i2cbus::DEFAULT_MAX_BUSES)]
    max_buses: usize,

    /// Device path prefix, followed by the bus index
    #[arg(long, default_value = "/dev/i2c-")]
    prefix: String,
}

#[derive(Subcommand)]
enum Command {
    /// Write bytes to the device
    Write {
        /// Payload, e.g. "01 02 ff"
        #[arg(value_parser = hex::parse_payload)]
        data: hex::Payload,
    },
    /// Read bytes from the device
    Read {
        /// Number of bytes to read
        #[arg(short, long, default_value_t = 1)]
        len: usize,
    },
    /// Write, wait, then read under one bus lock
    Xfer {
        /// Payload, e.g. "01 02 ff"
        #[arg(value_parser = hex::parse_payload)]
        data: hex::Payload,

        /// Number of bytes to read back
        #[arg(short, long, default_value_t = 1)]
        len: usize,

        /// Delay between the write and the read, in microseconds
        #[arg(short, long, default_value_t = 0)]
        delay_us: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let target = &cli.target;
    let config = BusConfig::new().with_max_buses(target.max_buses);
    let registry = LockRegistry::new(config);
    let transport = I2cDev::with_prefix(target.prefix.as_str());

    let mut handle =
        BusHandle::open(&registry, &transport, target.bus, target.address)?;
    tracing::info!(
        device = %transport.device_path(target.bus),
        address = target.address,
        "opened"
    );

    match &cli.command {
        Command::Write { data } => {
            let written = handle.write(&data.0)?;
            report(&written);
            println!("wrote {} bytes", written.len());
        }
        Command::Read { len } => {
            let mut buf = vec![0u8; *len];
            let read = handle.read(&mut buf)?;
            report(&read);
            println!("{}", hex::format_bytes(&buf[..read.len()]));
        }
        Command::Xfer { data, len, delay_us } => {
            let mut buf = vec![0u8; *len];
            let delay = Duration::from_micros(*delay_us);
            let result = handle.transfer(&data.0, &mut buf, delay)?;
            report(&result);
            if result.is_complete() {
                println!("{}", hex::format_bytes(&buf));
            }
        }
    }

    handle.close()?;
    Ok(())
}

fn report(transferred: &Transferred) {
    if let Some(short) = transferred.short() {
        eprintln!("short transfer: {short:?}");
    }
}
