//! Host side of the RCP protocol: command encoding, indication decoding,
//! and the capability state negotiated at reset.

mod commands;
pub use commands::RateInfo;

use log::{debug, warn};

use crate::bus::Bus;
use crate::error::{Error, Result};
use crate::hif::{cmd, ApiVersion, HifStatus};
use crate::wire::WireReader;
use crate::ws::neigh::Eui64;

/// One radio configuration supported by the RCP.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RailConfig {
    pub index: u32,
    pub chan0_freq_khz: u32,
    pub chan_spacing_khz: u32,
    pub chan_count: u16,
    pub rail_phy_mode_id: u8,
    pub phy_mode_group: u8,
}

/// A received data frame with its radio metadata.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RxInd {
    pub frame: Vec<u8>,
    pub timestamp_us: u64,
    pub rx_power_dbm: i8,
    pub lqi: u8,
    pub channel: u16,
}

/// Final report for an outstanding TX handle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxCnf {
    pub handle: u8,
    pub status: HifStatus,
    /// Acknowledgment frame bytes, empty when none was received.
    pub frame: Vec<u8>,
    pub timestamp_us: u64,
}

/// Decoded RCP → host traffic.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RcpEvent {
    /// The RCP (re)started and announced its capabilities.
    Reset,
    /// The radio configuration list arrived.
    RadioList,
    DataRx(RxInd),
    DataCnf(TxCnf),
    /// The RCP hit an unrecoverable condition.
    Fatal { code: u16, message: String },
}

/// Host-side RCP state.
pub struct Rcp {
    pub(crate) bus: Bus,
    pub has_reset: bool,
    pub has_radio_list: bool,
    pub version_api: ApiVersion,
    pub version_fw: ApiVersion,
    pub version_label: String,
    pub eui64: Eui64,
    pub rail_configs: Vec<RailConfig>,
}

impl Rcp {
    pub fn new(bus: Bus) -> Rcp {
        Rcp {
            bus,
            has_reset: false,
            has_radio_list: false,
            version_api: ApiVersion::default(),
            version_fw: ApiVersion::default(),
            version_label: String::new(),
            eui64: [0; 8],
            rail_configs: Vec::new(),
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Drains the bus and decodes every complete frame, in arrival order.
    pub fn receive(&mut self) -> Result<Vec<RcpEvent>> {
        if !self.bus.fill()? {
            return Err(Error::Fatal("bus closed by the RCP".into()));
        }
        let mut events = Vec::new();
        while let Some(payload) = self.bus.next_frame() {
            match self.decode(&payload) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => (),
                Err(err) => warn!("rcp: drop indication: {}", err),
            }
        }
        Ok(events)
    }

    fn decode(&mut self, payload: &[u8]) -> Result<Option<RcpEvent>> {
        let mut reader = WireReader::new(payload);
        let command = reader.pop_u8()?;
        match command {
            cmd::IND_RESET => self.decode_reset(&mut reader).map(Some),
            cmd::IND_FATAL => {
                let code = reader.pop_le16()?;
                let message = reader.pop_str()?;
                Ok(Some(RcpEvent::Fatal { code, message }))
            }
            cmd::CNF_RADIO_LIST => self.decode_radio_list(&mut reader).map(Some),
            cmd::IND_DATA_RX => {
                let timestamp_us = reader.pop_le64()?;
                let rx_power_dbm = reader.pop_i8()?;
                let lqi = reader.pop_u8()?;
                let channel = reader.pop_le16()?;
                let frame = reader.pop_counted()?.to_vec();
                Ok(Some(RcpEvent::DataRx(RxInd {
                    frame,
                    timestamp_us,
                    rx_power_dbm,
                    lqi,
                    channel,
                })))
            }
            cmd::CNF_DATA_TX => {
                let handle = reader.pop_u8()?;
                let status = HifStatus::from_u8(reader.pop_u8()?);
                let timestamp_us = reader.pop_le64()?;
                let frame = reader.pop_counted()?.to_vec();
                Ok(Some(RcpEvent::DataCnf(TxCnf {
                    handle,
                    status,
                    frame,
                    timestamp_us,
                })))
            }
            other => {
                warn!("rcp: unknown command 0x{:02x}", other);
                Ok(None)
            }
        }
    }

    fn decode_reset(&mut self, reader: &mut WireReader) -> Result<RcpEvent> {
        self.version_api = ApiVersion(reader.pop_le32()?);
        self.version_fw = ApiVersion(reader.pop_le32()?);
        self.version_label = reader.pop_str()?;
        self.eui64 = reader.pop_fixed::<8>()?;
        self.has_reset = true;
        debug!(
            "rcp: reset, api {} fw {} ({})",
            self.version_api, self.version_fw, self.version_label
        );
        Ok(RcpEvent::Reset)
    }

    fn decode_radio_list(&mut self, reader: &mut WireReader) -> Result<RcpEvent> {
        let count = reader.pop_u8()? as usize;
        let mut rail_configs = Vec::with_capacity(count);
        for index in 0..count {
            rail_configs.push(RailConfig {
                index: index as u32,
                chan0_freq_khz: reader.pop_le32()?,
                chan_spacing_khz: reader.pop_le32()?,
                chan_count: reader.pop_le16()?,
                rail_phy_mode_id: reader.pop_u8()?,
                phy_mode_group: reader.pop_u8()?,
            });
        }
        self.rail_configs = rail_configs;
        self.has_radio_list = true;
        Ok(RcpEvent::RadioList)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::wire::WireWriter;
    use std::os::unix::net::UnixStream;

    /// An in-process stand-in for the radio side of the bus.
    pub struct FakeRcp {
        pub bus: Bus,
    }

    pub fn rcp_pair() -> (Rcp, FakeRcp) {
        let (host, radio) = UnixStream::pair().unwrap();
        host.set_nonblocking(true).unwrap();
        radio.set_nonblocking(true).unwrap();
        (
            Rcp::new(Bus::new(Box::new(host))),
            FakeRcp {
                bus: Bus::new(Box::new(radio)),
            },
        )
    }

    impl FakeRcp {
        pub fn send_reset(&mut self, api: ApiVersion, eui64: Eui64) {
            let mut writer = WireWriter::new();
            writer.push_u8(cmd::IND_RESET);
            writer.push_le32(api.0);
            writer.push_le32(ApiVersion::new(2, 3, 0).0);
            writer.push_str("fake-rcp");
            writer.push_data(&eui64);
            self.bus.send_frame(writer.as_slice()).unwrap();
        }

        pub fn send_rx_ind(&mut self, frame: &[u8], timestamp_us: u64, rx_power_dbm: i8, lqi: u8) {
            let mut writer = WireWriter::new();
            writer.push_u8(cmd::IND_DATA_RX);
            writer.push_le64(timestamp_us);
            writer.push_i8(rx_power_dbm);
            writer.push_u8(lqi);
            writer.push_le16(0);
            writer.push_counted(frame);
            self.bus.send_frame(writer.as_slice()).unwrap();
        }

        pub fn send_tx_cnf(&mut self, handle: u8, status: HifStatus, ack: &[u8]) {
            let mut writer = WireWriter::new();
            writer.push_u8(cmd::CNF_DATA_TX);
            writer.push_u8(handle);
            writer.push_u8(status.to_u8());
            writer.push_le64(1000);
            writer.push_counted(ack);
            self.bus.send_frame(writer.as_slice()).unwrap();
        }

        /// The next command frame the host sent, as `(id, parameters)`.
        pub fn recv_cmd(&mut self) -> Option<(u8, Vec<u8>)> {
            self.bus.fill().unwrap();
            let payload = self.bus.next_frame()?;
            Some((payload[0], payload[1..].to_vec()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::test_support::*;
    use super::*;

    #[test]
    fn reset_fills_capabilities() {
        let (mut rcp, mut fake) = rcp_pair();
        fake.send_reset(ApiVersion::new(2, 1, 3), [7; 8]);
        let events = rcp.receive().unwrap();
        assert_eq!(vec![RcpEvent::Reset], events);
        assert!(rcp.has_reset);
        assert_eq!(ApiVersion::new(2, 1, 3), rcp.version_api);
        assert_eq!([7; 8], rcp.eui64);
        assert_eq!("fake-rcp", rcp.version_label);
    }

    #[test]
    fn rx_ind_order_preserved() {
        let (mut rcp, mut fake) = rcp_pair();
        fake.send_rx_ind(&[1], 100, -70, 200);
        fake.send_rx_ind(&[2], 200, -71, 201);
        let events = rcp.receive().unwrap();
        assert_eq!(2, events.len());
        match (&events[0], &events[1]) {
            (RcpEvent::DataRx(first), RcpEvent::DataRx(second)) => {
                assert_eq!(vec![1], first.frame);
                assert_eq!(100, first.timestamp_us);
                assert_eq!(-70, first.rx_power_dbm);
                assert_eq!(vec![2], second.frame);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn tx_cnf_with_ack() {
        let (mut rcp, mut fake) = rcp_pair();
        fake.send_tx_cnf(9, HifStatus::Success, &[0xaa, 0xbb]);
        let events = rcp.receive().unwrap();
        match &events[0] {
            RcpEvent::DataCnf(cnf) => {
                assert_eq!(9, cnf.handle);
                assert_eq!(HifStatus::Success, cnf.status);
                assert_eq!(vec![0xaa, 0xbb], cnf.frame);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unknown_command_skipped() {
        let (mut rcp, mut fake) = rcp_pair();
        fake.bus.send_frame(&[0xee, 1, 2, 3]).unwrap();
        fake.send_reset(ApiVersion::new(2, 0, 0), [1; 8]);
        let events = rcp.receive().unwrap();
        assert_eq!(vec![RcpEvent::Reset], events);
    }
}
