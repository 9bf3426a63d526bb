//! Keeps a clock synchronized with a NTP server and prints it
//!
//! You can run the `timesync` example in the terminal:
//!
//! ```
//! cargo run -p example-timesync
//! ```
//!
//! That will poll `pool.ntp.org` every 60 seconds and print the projected time once
//! per second. Options available:
//! - `-s`/`--server` - NTP server (default: `pool.ntp.org`)
//! - `-p`/`--port` - NTP server port (default: `123`)
//! - `-l`/`--local-port` - local UDP port (default: `1337`)
//! - `-o`/`--offset` - time offset in seconds added to the printed time (default: `0`)
//! - `-i`/`--interval` - update interval in milliseconds (default: `60000`)
//! - `-n`/`--iterations` - number of printed lines before exiting (default: run forever)
//!
//! So, command in the terminal with all options involved:
//!
//! ```
//! cargo run -p example-timesync --features log -- -s time.google.com -p 123 -l 0 -o 3600 -i 10000 -n 30
//! ```
use ntpclock::config::{
    DEFAULT_LOCAL_PORT, DEFAULT_SERVER, DEFAULT_TIME_OFFSET, DEFAULT_UPDATE_INTERVAL_MS, NTP_PORT,
};
use ntpclock::{ClientConfig, NtpClient, StdClock};
use ntpclock_net_std::UdpTransport;

use std::thread;
use std::time::Duration;

use clap::Parser;

#[derive(Parser)]
#[command(name = "timesync")]
#[command(version)]
struct Cli {
    /// NTP server hostname
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    server: String,

    /// NTP server port
    #[arg(short, long, default_value_t = NTP_PORT)]
    port: u16,

    /// Local UDP port
    #[arg(short, long, default_value_t = DEFAULT_LOCAL_PORT)]
    local_port: u16,

    /// Time offset in seconds, e.g. a timezone
    #[arg(short, long, default_value_t = DEFAULT_TIME_OFFSET, allow_hyphen_values = true)]
    offset: i32,

    /// Minimum time between two synchronizations in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_UPDATE_INTERVAL_MS)]
    interval: u32,

    /// NTP version sent in requests; servers answer with the same version
    #[arg(short = 'v', long, default_value_t = 4)]
    request_version: u8,

    /// Number of printed lines before exiting
    #[arg(short = 'n', long)]
    iterations: Option<u64>,
}

fn main() {
    let cli = Cli::parse();

    #[cfg(feature = "log")]
    if cfg!(debug_assertions) {
        simple_logger::init_with_level(log::Level::Trace).unwrap();
    } else {
        simple_logger::init_with_level(log::Level::Info).unwrap();
    }

    let config = ClientConfig::new(&cli.server)
        .with_server_port(cli.port)
        .with_local_port(cli.local_port)
        .with_time_offset(cli.offset)
        .with_update_interval(cli.interval)
        .with_request_version(cli.request_version);
    let mut client = NtpClient::new(config, UdpTransport::new(), StdClock::new());
    let mut printed = 0u64;

    while cli.iterations.is_none_or(|limit| printed < limit) {
        if !client.update() {
            eprintln!("Unable to receive time from: {}:{}", cli.server, cli.port);
        }

        if client.is_synchronized() {
            println!(
                "{} ({} s since epoch)",
                client.formatted_date(None),
                client.current_epoch_seconds()
            );
            printed += 1;
        }

        thread::sleep(Duration::from_secs(1));
    }

    client.stop();
}
