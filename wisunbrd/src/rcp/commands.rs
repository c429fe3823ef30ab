//! Encoders for the host → RCP command set.

use crate::error::Result;
use crate::hif::{cmd, ApiVersion, FhssType, ModeSwitchType, Regulation};
use crate::wire::WireWriter;
use crate::ws::neigh::{Eui64, FhssData};
use crate::ws::FhssConfig;

use super::Rcp;

/// One entry of the rate list attached to a TX request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RateInfo {
    pub phy_mode_id: u8,
    pub tx_attempts: u8,
    pub tx_power_dbm: i8,
}

fn cmd_writer(command: u8) -> WireWriter {
    let mut writer = WireWriter::new();
    writer.push_u8(command);
    writer
}

fn push_fhss_data(writer: &mut WireWriter, fhss_data: &FhssData) {
    writer.push_u8(fhss_data.uc_chan_func as u8);
    writer.push_le16(fhss_data.uc_chan_fixed);
    writer.push_data(&fhss_data.uc_channel_list);
    writer.push_le16(fhss_data.uc_chan_count);
    writer.push_le64(fhss_data.ffn.utt_rx_tstamp_us);
    writer.push_le32(fhss_data.ffn.ufsi);
    writer.push_u8(fhss_data.ffn.uc_dwell_interval_ms);
    writer.push_le64(fhss_data.lfn.lutt_rx_tstamp_us);
    writer.push_le16(fhss_data.lfn.uc_slot_number);
    writer.push_le32(fhss_data.lfn.uc_interval_offset_ms);
    writer.push_le32(fhss_data.lfn.uc_listen_interval_ms);
}

fn push_fhss_config(writer: &mut WireWriter, cfg: &FhssConfig) {
    let (mask, count) = cfg.chan_mask();
    writer.push_data(&mask);
    writer.push_le16(count);
    writer.push_u8(cfg.uc_dwell_interval_ms);
    writer.push_u8(cfg.bc_dwell_interval_ms);
    writer.push_le32(cfg.bc_interval_ms);
    writer.push_le32(cfg.lfn_bc_interval_ms);
    writer.push_u8(cfg.lfn_bc_sync_period);
    writer.push_le16(cfg.bsi);
    writer.push_le32(cfg.async_frag_duration_ms);
}

impl Rcp {
    /// Restarts the RCP firmware, optionally into its bootloader.
    pub fn req_reset(&mut self, bootload: bool) -> Result<()> {
        let mut writer = cmd_writer(cmd::REQ_RESET);
        writer.push_bool(bootload);
        self.bus.send_frame(writer.as_slice())
    }

    /// Announces the API version implemented by this host.
    pub fn set_host_api(&mut self, host_api_version: ApiVersion) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_HOST_API);
        writer.push_le32(host_api_version.0);
        self.bus.send_frame(writer.as_slice())
    }

    /// Queues a data frame for transmission.
    #[allow(clippy::too_many_arguments)]
    pub fn req_data_tx(
        &mut self,
        frame: &[u8],
        handle: u8,
        fhss_type: FhssType,
        fhss_data: Option<&FhssData>,
        frame_counters_min: Option<&[u32; 7]>,
        rate_list: Option<&[RateInfo; 4]>,
        ms_mode: ModeSwitchType,
    ) -> Result<()> {
        let mut writer = cmd_writer(cmd::REQ_DATA_TX);
        writer.push_u8(handle);
        writer.push_u8(fhss_type as u8);
        writer.push_counted(frame);
        writer.push_u8(ms_mode as u8);
        match fhss_data {
            Some(fhss_data) => {
                writer.push_bool(true);
                push_fhss_data(&mut writer, fhss_data);
            }
            None => writer.push_bool(false),
        }
        match frame_counters_min {
            Some(counters) => {
                writer.push_bool(true);
                for counter in counters {
                    writer.push_le32(*counter);
                }
            }
            None => writer.push_bool(false),
        }
        match rate_list {
            Some(rates) => {
                writer.push_bool(true);
                for rate in rates {
                    writer.push_u8(rate.phy_mode_id);
                    writer.push_u8(rate.tx_attempts);
                    writer.push_i8(rate.tx_power_dbm);
                }
            }
            None => writer.push_bool(false),
        }
        self.bus.send_frame(writer.as_slice())
    }

    /// Cancels an outstanding TX; the RCP answers with a final
    /// confirmation whose status is `Aborted`.
    pub fn req_data_tx_abort(&mut self, handle: u8) -> Result<()> {
        let mut writer = cmd_writer(cmd::REQ_DATA_TX_ABORT);
        writer.push_u8(handle);
        self.bus.send_frame(writer.as_slice())
    }

    pub fn req_radio_enable(&mut self) -> Result<()> {
        self.bus.send_frame(cmd_writer(cmd::REQ_RADIO_ENABLE).as_slice())
    }

    pub fn req_radio_list(&mut self) -> Result<()> {
        self.bus.send_frame(cmd_writer(cmd::REQ_RADIO_LIST).as_slice())
    }

    pub fn set_radio(&mut self, radioconf_index: u8, ofdm_mcs: u8, enable_ms: bool) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_RADIO);
        writer.push_u8(radioconf_index);
        writer.push_u8(ofdm_mcs);
        writer.push_bool(enable_ms);
        self.bus.send_frame(writer.as_slice())
    }

    pub fn set_radio_regulation(&mut self, regulation: Regulation) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_RADIO_REGULATION);
        writer.push_u8(regulation as u8);
        self.bus.send_frame(writer.as_slice())
    }

    pub fn set_radio_tx_power(&mut self, power_dbm: i8) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_RADIO_TX_POWER);
        writer.push_i8(power_dbm);
        self.bus.send_frame(writer.as_slice())
    }

    pub fn set_fhss_uc(&mut self, cfg: &FhssConfig) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_FHSS_UC);
        push_fhss_config(&mut writer, cfg);
        self.bus.send_frame(writer.as_slice())
    }

    pub fn set_fhss_ffn_bc(&mut self, cfg: &FhssConfig) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_FHSS_FFN_BC);
        push_fhss_config(&mut writer, cfg);
        self.bus.send_frame(writer.as_slice())
    }

    pub fn set_fhss_lfn_bc(&mut self, cfg: &FhssConfig) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_FHSS_LFN_BC);
        push_fhss_config(&mut writer, cfg);
        self.bus.send_frame(writer.as_slice())
    }

    pub fn set_fhss_async(&mut self, cfg: &FhssConfig) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_FHSS_ASYNC);
        push_fhss_config(&mut writer, cfg);
        self.bus.send_frame(writer.as_slice())
    }

    /// Installs (or clears) a group key slot on the radio.
    pub fn set_sec_key(
        &mut self,
        key_index: u8,
        key: &[u8; 16],
        frame_counter: u32,
    ) -> Result<()> {
        debug_assert!((1..=7).contains(&key_index));
        let mut writer = cmd_writer(cmd::SET_SEC_KEY);
        writer.push_u8(key_index);
        writer.push_data(key);
        writer.push_le32(frame_counter);
        self.bus.send_frame(writer.as_slice())
    }

    pub fn set_filter_pan_id(&mut self, pan_id: u16) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_FILTER_PANID);
        writer.push_le16(pan_id);
        self.bus.send_frame(writer.as_slice())
    }

    /// Replaces the source address filter. `allow` selects between an
    /// allow-list and a deny-list; clearing the filter is expressed by an
    /// empty list with the polarity the caller wants to end up permissive.
    pub fn set_filter_src64(&mut self, eui64_list: &[Eui64], allow: bool) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_FILTER_SRC64);
        writer.push_bool(allow);
        writer.push_u8(eui64_list.len() as u8);
        for eui64 in eui64_list {
            writer.push_data(eui64);
        }
        self.bus.send_frame(writer.as_slice())
    }

    pub fn set_filter_dst64(&mut self, eui64: &Eui64) -> Result<()> {
        let mut writer = cmd_writer(cmd::SET_FILTER_DST64);
        writer.push_data(eui64);
        self.bus.send_frame(writer.as_slice())
    }
}

#[cfg(test)]
mod test {
    use super::super::test_support::*;
    use super::*;
    use crate::hif::HOST_API_VERSION;
    use crate::wire::WireReader;

    #[test]
    fn set_host_api_encoding() {
        let (mut rcp, mut fake) = rcp_pair();
        rcp.set_host_api(HOST_API_VERSION).unwrap();
        let (id, params) = fake.recv_cmd().unwrap();
        assert_eq!(cmd::SET_HOST_API, id);
        let mut reader = WireReader::new(&params);
        assert_eq!(HOST_API_VERSION.0, reader.pop_le32().unwrap());
        assert_eq!(0, reader.remaining());
    }

    #[test]
    fn set_sec_key_encoding() {
        let (mut rcp, mut fake) = rcp_pair();
        rcp.set_sec_key(3, &[0x5a; 16], 77).unwrap();
        let (id, params) = fake.recv_cmd().unwrap();
        assert_eq!(cmd::SET_SEC_KEY, id);
        let mut reader = WireReader::new(&params);
        assert_eq!(3, reader.pop_u8().unwrap());
        assert_eq!([0x5a; 16], reader.pop_fixed::<16>().unwrap());
        assert_eq!(77, reader.pop_le32().unwrap());
    }

    #[test]
    fn filter_src64_encoding() {
        let (mut rcp, mut fake) = rcp_pair();
        rcp.set_filter_src64(&[[1; 8], [2; 8]], true).unwrap();
        let (id, params) = fake.recv_cmd().unwrap();
        assert_eq!(cmd::SET_FILTER_SRC64, id);
        let mut reader = WireReader::new(&params);
        assert!(reader.pop_bool().unwrap());
        assert_eq!(2, reader.pop_u8().unwrap());
        assert_eq!([1; 8], reader.pop_fixed::<8>().unwrap());
        assert_eq!([2; 8], reader.pop_fixed::<8>().unwrap());
    }

    #[test]
    fn data_tx_with_fhss_and_counters() {
        let (mut rcp, mut fake) = rcp_pair();
        let fhss = FhssData {
            uc_chan_count: 17,
            ..Default::default()
        };
        rcp.req_data_tx(
            &[0xde, 0xad],
            42,
            FhssType::FfnUc,
            Some(&fhss),
            Some(&[5; 7]),
            None,
            ModeSwitchType::Phy,
        )
        .unwrap();
        let (id, params) = fake.recv_cmd().unwrap();
        assert_eq!(cmd::REQ_DATA_TX, id);
        let mut reader = WireReader::new(&params);
        assert_eq!(42, reader.pop_u8().unwrap());
        assert_eq!(FhssType::FfnUc as u8, reader.pop_u8().unwrap());
        assert_eq!(&[0xde, 0xad], reader.pop_counted().unwrap());
        assert_eq!(ModeSwitchType::Phy as u8, reader.pop_u8().unwrap());
        assert!(reader.pop_bool().unwrap()); // fhss block present
    }

    #[test]
    fn fhss_config_encoding_counts_channels() {
        let (mut rcp, mut fake) = rcp_pair();
        rcp.set_fhss_uc(&FhssConfig::default()).unwrap();
        let (id, params) = fake.recv_cmd().unwrap();
        assert_eq!(cmd::SET_FHSS_UC, id);
        let mut reader = WireReader::new(&params);
        let _mask = reader.pop_fixed::<32>().unwrap();
        // default config resolves the EU plan 32 (69 channels)
        assert_eq!(69, reader.pop_le16().unwrap());
    }
}
