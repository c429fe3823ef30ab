use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;

use wisunbrd::app::{Config, Ctxt};
use wisunbrd::bus::Bus;
use wisunbrd::ctl::{self, ControlService};
use wisunbrd::net::tun::MemTun;
use wisunbrd::rcp::Rcp;

/// Wi-SUN FAN border router daemon.
#[derive(Parser, Debug)]
#[command(name = "wisunbrd", version, about)]
struct Args {
    /// Serial device connected to the RCP.
    #[arg(short = 'u', long, value_name = "DEVICE")]
    device: Option<PathBuf>,

    /// UART baudrate.
    #[arg(short = 'b', long, default_value_t = 115200)]
    baudrate: u32,

    /// Local socket of an RCP simulator, instead of a serial device.
    #[arg(long, value_name = "PATH", conflicts_with = "device")]
    rcp_socket: Option<PathBuf>,

    /// Network interface of the TUN collaborator.
    #[arg(short = 't', long, default_value = "tun0")]
    tun_device: String,

    /// Wi-SUN network name.
    #[arg(short = 'n', long, default_value = "Wi-SUN Network")]
    network_name: String,

    /// Regulatory domain (NA, EU, JP, ...).
    #[arg(short = 'd', long, default_value = "EU")]
    domain: String,

    /// FAN 1.1 channel plan ID.
    #[arg(long, default_value_t = 32)]
    chan_plan_id: u8,

    /// PAN identifier.
    #[arg(long, default_value_t = 0xffff, value_parser = clap::value_parser!(u16))]
    pan_id: u16,

    /// Key storage directory.
    #[arg(long, default_value = "/var/lib/wisunbrd")]
    storage: PathBuf,

    /// Control API socket path (defaults to the bus location).
    #[arg(long, value_name = "PATH")]
    control_socket: Option<PathBuf>,

    /// Print the radio configurations supported by the RCP and exit.
    #[arg(long)]
    list_rf_configs: bool,
}

fn domain_value(name: &str) -> anyhow::Result<u8> {
    use wisunbrd::ws::regdb::reg_domain::*;
    Ok(match name.to_ascii_uppercase().as_str() {
        "WW" => WW,
        "NA" => NA,
        "JP" => JP,
        "EU" => EU,
        "CN" => CN,
        "IN" => IN,
        "BZ" => BZ,
        "KR" => KR,
        other => bail!("unknown regulatory domain {:?}", other),
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = Config {
        uart_dev: args.device.clone(),
        uart_baudrate: args.baudrate,
        rcp_socket: args.rcp_socket.clone(),
        tun_dev: args.tun_device,
        ws_name: args.network_name,
        ws_domain: domain_value(&args.domain)?,
        ws_chan_plan_id: args.chan_plan_id,
        ws_pan_id: args.pan_id,
        storage_prefix: args.storage,
        ctl_socket: args.control_socket,
        ..Default::default()
    };

    let bus = match (&config.uart_dev, &config.rcp_socket) {
        (Some(device), _) => Bus::open_uart(device, config.uart_baudrate)
            .context("open the RCP serial device")?,
        (None, Some(path)) => Bus::open_socket(path).context("connect to the RCP socket")?,
        (None, None) => bail!("either --device or --rcp-socket is required"),
    };
    let mut rcp = Rcp::new(bus);

    if args.list_rf_configs {
        // capability exchange only, no radio configuration
        rcp.req_reset(false)?;
        loop {
            for event in rcp.receive()? {
                if let wisunbrd::rcp::RcpEvent::Reset = event {
                    rcp.set_host_api(wisunbrd::hif::HOST_API_VERSION)?;
                    rcp.req_radio_list()?;
                }
            }
            if rcp.has_radio_list {
                for rail in &rcp.rail_configs {
                    println!(
                        "{}: chan0 {} kHz, spacing {} kHz, {} channels, phy mode {}",
                        rail.index,
                        rail.chan0_freq_khz,
                        rail.chan_spacing_khz,
                        rail.chan_count,
                        rail.rail_phy_mode_id
                    );
                }
                return Ok(());
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }

    let ctl_path = config
        .ctl_socket
        .clone()
        .unwrap_or_else(ctl::default_socket_path);
    let ctl = ControlService::bind(&ctl_path)?;

    let mut ctxt = Ctxt::new(config, rcp, Box::new(MemTun::default()), Some(ctl));
    info!("wisunbrd starting");
    let result = ctxt.run();
    ctxt.shutdown();
    result.map_err(Into::into)
}
