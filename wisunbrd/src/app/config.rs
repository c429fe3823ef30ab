//! Static daemon configuration. Filled once at startup (command line &
//! configuration file parsing live outside the core) and never modified
//! afterwards.

use std::path::PathBuf;

use arrayvec::ArrayVec;

use crate::hif::Regulation;
use crate::ws::neigh::Eui64;
use crate::ws::FhssConfig;

/// A group key preset from the configuration.
#[derive(Clone, Copy, Debug)]
pub struct KeyPreset {
    pub key: [u8; 16],
    /// Install even when the slot is already populated from storage.
    pub force: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Serial device of the RCP, when driven over UART.
    pub uart_dev: Option<PathBuf>,
    pub uart_baudrate: u32,
    /// Local socket of the RCP, when driven over IPC.
    pub rcp_socket: Option<PathBuf>,

    pub tun_dev: String,

    /// Network name (at most 32 bytes of UTF-8).
    pub ws_name: String,
    pub ws_size: String,
    pub ws_domain: u8,
    pub ws_class: u8,
    pub ws_chan_plan_id: u8,
    pub ws_phy_mode_id: u8,
    pub ws_mode: u32,
    pub ws_phy_op_modes: ArrayVec<u8, 15>,
    pub ws_regional_regulation: Regulation,
    pub ws_allowed_channels: [u8; 32],
    pub ws_pan_id: u16,
    pub ws_fan_version: u8,
    pub pan_size: u16,
    pub tx_power_dbm: i8,

    pub uc_dwell_interval_ms: u8,
    pub bc_dwell_interval_ms: u8,
    pub bc_interval_ms: u32,
    pub lfn_bc_interval_ms: u32,
    pub lfn_bc_sync_period: u8,
    pub enable_lfn: bool,

    pub ws_gtk: [Option<KeyPreset>; 4],
    pub ws_lgtk: [Option<KeyPreset>; 3],

    pub ws_allowed_mac_addresses: Vec<Eui64>,
    pub ws_denied_mac_addresses: Vec<Eui64>,

    pub storage_prefix: PathBuf,
    /// Control API socket; `None` picks the default bus location.
    pub ctl_socket: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            uart_dev: None,
            uart_baudrate: 115200,
            rcp_socket: None,
            tun_dev: "tun0".into(),
            ws_name: "Wi-SUN Network".into(),
            ws_size: "SMALL".into(),
            ws_domain: crate::ws::regdb::reg_domain::EU,
            ws_class: 0,
            ws_chan_plan_id: 32,
            ws_phy_mode_id: 0,
            ws_mode: 0,
            ws_phy_op_modes: ArrayVec::new(),
            ws_regional_regulation: Regulation::None,
            ws_allowed_channels: [0xff; 32],
            ws_pan_id: 0xffff,
            ws_fan_version: 1,
            pan_size: 0,
            tx_power_dbm: 14,
            uc_dwell_interval_ms: 255,
            bc_dwell_interval_ms: 255,
            bc_interval_ms: 1020,
            lfn_bc_interval_ms: 60_000,
            lfn_bc_sync_period: 5,
            enable_lfn: true,
            ws_gtk: [None; 4],
            ws_lgtk: [None; 3],
            ws_allowed_mac_addresses: Vec::new(),
            ws_denied_mac_addresses: Vec::new(),
            storage_prefix: PathBuf::from("/var/lib/wisunbrd"),
            ctl_socket: None,
        }
    }
}

impl Config {
    /// Derives the FHSS configuration handed to the RCP and the neighbor
    /// engine.
    pub fn fhss_config(&self) -> FhssConfig {
        FhssConfig {
            regulation: self.ws_regional_regulation,
            reg_domain: self.ws_domain,
            op_class: self.ws_class,
            chan_plan_id: self.ws_chan_plan_id,
            chan_mask_custom: self.ws_allowed_channels,
            uc_dwell_interval_ms: self.uc_dwell_interval_ms,
            bc_dwell_interval_ms: self.bc_dwell_interval_ms,
            bc_interval_ms: self.bc_interval_ms,
            lfn_bc_interval_ms: self.lfn_bc_interval_ms,
            lfn_bc_sync_period: self.lfn_bc_sync_period,
            bsi: 0, // drawn at startup
            async_frag_duration_ms: 500,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fhss_config_resolves_default_plan() {
        let config = Config::default();
        let fhss = config.fhss_config();
        let (_, count) = fhss.chan_mask();
        assert_eq!(69, count);
    }
}
