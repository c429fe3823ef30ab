//! The orchestrator: owns the root context, the poll loop and the
//! startup/shutdown sequences. All layers are reached through the single
//! [`Ctxt`] handle; the only ambient state is the immutable regulatory
//! database and the PAN-ID compression table.

pub mod config;

use std::time::Instant;

use log::{debug, info, trace, warn};
use rand::Rng;

use wisunparse::{
    wh_ie_sub_id, wp_ie_sub_id_long, wp_ie_sub_id_short, payload_ie_id, Addr, DataFrame,
    DataRequest, HeaderIeIter, LndIe, LusIe, NestedIeIter, NrIe, PayloadIeIter, PomIe,
    SecurityLevel, UsIe, UttIe, LuttIe, frame_type,
};

use crate::ctl::{api, wire, ControlService};
use crate::error::{Error, Result};
use crate::hif::{FhssType, HifStatus, ModeSwitchType, HOST_API_VERSION, RCP_API_MIN_VERSION};
use crate::net::ipv6::{Ipv6Addr, NdCache};
use crate::net::rpl::RplRoot;
use crate::net::tun::TunCollab;
use crate::rcp::{RateInfo, Rcp, RcpEvent, RxInd, TxCnf};
use crate::storage::KeyStorage;
use crate::ws::ie_list::IeCustomList;
use crate::ws::mngt;
use crate::ws::neigh::{self, Eui64, NeighTable};
use crate::ws::pan::PanInfo;
use crate::ws::FhssConfig;

pub use config::Config;

/// Seconds between PAN advertisement & configuration transmissions.
const PAN_ADVERT_PERIOD_S: u32 = 15;

/// The root context threaded through every layer.
pub struct Ctxt {
    pub config: Config,
    pub fhss_config: FhssConfig,
    pub rcp: Rcp,
    pub pan: PanInfo,
    pub neigh_table: NeighTable,
    pub ie_custom: IeCustomList,
    pub rpl: RplRoot,
    pub nd_cache: NdCache,
    pub tun: Box<dyn TunCollab>,
    pub storage: KeyStorage,
    pub ctl: Option<ControlService>,
    pub mcast_groups: Vec<Ipv6Addr>,
    tx_handle_next: u8,
    advert_countdown: u32,
    radio_configured: bool,
    started: Instant,
}

/// A transmission request from an upper layer.
#[derive(Clone, Copy, Debug)]
pub struct DataReqExt<'a> {
    pub dst: Option<Eui64>,
    pub fhss_type: FhssType,
    pub ack_request: bool,
    pub security: Option<(SecurityLevel, u8)>,
    pub header_ies: Option<&'a [u8]>,
    pub payload_ies: &'a [&'a [u8]],
    pub rate_list: Option<&'a [RateInfo; 4]>,
    pub ms_mode: ModeSwitchType,
}

impl Ctxt {
    pub fn new(
        config: Config,
        rcp: Rcp,
        tun: Box<dyn TunCollab>,
        ctl: Option<ControlService>,
    ) -> Ctxt {
        let mut fhss_config = config.fhss_config();
        fhss_config.bsi = rand::thread_rng().gen();
        let storage = KeyStorage::new(&config.storage_prefix);
        let pan = PanInfo {
            pan_id: config.ws_pan_id,
            fan_version: config.ws_fan_version,
            network_name: config.ws_name.clone(),
            pan_size: config.pan_size,
            phy_op_modes: config.ws_phy_op_modes.clone(),
            phy_mode_id: config.ws_phy_mode_id,
            chan_plan_id: config.ws_chan_plan_id,
            ..Default::default()
        };
        Ctxt {
            config,
            fhss_config,
            rcp,
            pan,
            neigh_table: NeighTable::new(),
            ie_custom: IeCustomList::default(),
            rpl: RplRoot::default(),
            nd_cache: NdCache::default(),
            tun,
            storage,
            ctl,
            mcast_groups: Vec::new(),
            tx_handle_next: 0,
            advert_countdown: PAN_ADVERT_PERIOD_S,
            radio_configured: false,
            started: Instant::now(),
        }
    }

    /// Monotonic seconds since startup; the clock every expiration field
    /// is compared against.
    pub fn now_s(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn emit_property_changed(&mut self, name: &str) {
        if let Some(ctl) = &mut self.ctl {
            ctl.emit_property_changed(name);
        }
    }

    pub fn emit_keys_changed(&mut self) {
        for name in ["Gtks", "Gaks", "Lgtks", "Lgaks"] {
            self.emit_property_changed(name);
        }
    }

    fn next_tx_handle(&mut self) -> u8 {
        self.tx_handle_next = self.tx_handle_next.wrapping_add(1);
        self.tx_handle_next
    }

    /// Key indices currently enabled on the radio, as a bitmask.
    fn key_index_mask(&self) -> u8 {
        let mut mask = 0;
        for slot in 0..crate::ws::pan::GTK_NUM {
            if self.pan.gtk(slot).is_some() {
                mask |= 1 << (slot + 1);
            }
        }
        for slot in 0..crate::ws::pan::LGTK_NUM {
            if self.pan.lgtk(slot).is_some() {
                mask |= 1 << (slot + crate::ws::pan::GTK_NUM + 1);
            }
        }
        mask
    }

    /// Handles one decoded RCP event.
    pub fn handle_rcp_event(&mut self, event: RcpEvent) -> Result<()> {
        match event {
            RcpEvent::Reset => {
                if self.rcp.version_api < RCP_API_MIN_VERSION {
                    return Err(Error::Fatal(format!(
                        "RCP API {} is too old (need >= {})",
                        self.rcp.version_api, RCP_API_MIN_VERSION
                    )));
                }
                info!(
                    "connected to RCP {} (API {})",
                    self.rcp.version_label, self.rcp.version_api
                );
                self.rcp.set_host_api(HOST_API_VERSION)?;
                self.rcp.req_radio_list()?;
                Ok(())
            }
            RcpEvent::RadioList => self.configure_radio(),
            RcpEvent::DataRx(ind) => {
                self.on_rx_ind(&ind);
                Ok(())
            }
            RcpEvent::DataCnf(cnf) => {
                self.on_tx_cnf(&cnf);
                Ok(())
            }
            RcpEvent::Fatal { code, message } => Err(Error::Fatal(format!(
                "RCP failure {}: {}",
                code, message
            ))),
        }
    }

    /// Applies the radio & security configuration once the capability
    /// exchange completed.
    fn configure_radio(&mut self) -> Result<()> {
        let params = self.fhss_config.chan_params().ok_or_else(|| {
            Error::Fatal(format!(
                "no channel plan for domain {} class {} plan {}",
                self.fhss_config.reg_domain, self.fhss_config.op_class,
                self.fhss_config.chan_plan_id
            ))
        })?;
        let rail_index = self
            .rcp
            .rail_configs
            .iter()
            .find(|rail| {
                rail.chan0_freq_khz == params.chan0_freq_khz
                    && rail.chan_spacing_khz == params.chan_spacing_khz
                    && rail.chan_count == params.chan_count
            })
            .map(|rail| rail.index)
            .ok_or_else(|| {
                Error::Fatal("the RCP supports no radio configuration for this plan".into())
            })?;

        self.rcp.set_radio(
            rail_index as u8,
            0,
            !self.pan.phy_op_modes.is_empty(),
        )?;
        self.rcp
            .set_radio_regulation(self.fhss_config.regulation)?;
        self.rcp.set_radio_tx_power(self.config.tx_power_dbm)?;
        let fhss_config = self.fhss_config.clone();
        self.rcp.set_fhss_uc(&fhss_config)?;
        self.rcp.set_fhss_ffn_bc(&fhss_config)?;
        self.rcp.set_fhss_lfn_bc(&fhss_config)?;
        self.rcp.set_fhss_async(&fhss_config)?;
        self.rcp.set_filter_pan_id(self.pan.pan_id)?;

        if !self.config.ws_allowed_mac_addresses.is_empty() {
            let list = self.config.ws_allowed_mac_addresses.clone();
            self.rcp.set_filter_src64(&list, true)?;
        } else if !self.config.ws_denied_mac_addresses.is_empty() {
            let list = self.config.ws_denied_mac_addresses.clone();
            self.rcp.set_filter_src64(&list, false)?;
        }

        for preset in self.config.ws_gtk.into_iter().flatten() {
            let key_index = self.pan.install_gtk(preset.key)?;
            self.rcp.set_sec_key(key_index, &preset.key, 0)?;
        }
        for preset in self.config.ws_lgtk.into_iter().flatten() {
            let key_index = self.pan.install_lgtk(preset.key)?;
            self.rcp.set_sec_key(key_index, &preset.key, 0)?;
        }

        self.rcp.req_radio_enable()?;
        self.radio_configured = true;
        info!("radio configured & enabled");
        Ok(())
    }

    /// The receive data path: parse, neighbor & FHSS updates, PAN
    /// management IE consumption.
    pub fn on_rx_ind(&mut self, ind: &RxInd) {
        let frame = match DataFrame::parse_ind(&ind.frame, self.pan.pan_id) {
            Ok(frame) => frame,
            Err(err) => {
                trace!("drop 15.4: {} ({})", err.class(), err);
                return;
            }
        };
        let Some(src) = frame.src_addr.ext().copied() else {
            trace!("ignore 15.4: no source address");
            return;
        };
        let secured = frame.security.is_some();
        let now_s = self.now_s();

        let mut new_neighbor = false;
        if self.neigh_table.get(&src).is_none() {
            if !secured {
                trace!("ignore 15.4: unsecured frame from unknown neighbor");
                return;
            }
            self.neigh_table.add(
                &src,
                None,
                self.config.tx_power_dbm,
                self.key_index_mask(),
                now_s,
            );
            new_neighbor = true;
        }

        // decode the Wi-SUN IEs up front, the neighbor entry is borrowed
        // mutably below
        let mut utt: Option<UttIe> = None;
        let mut lutt: Option<LuttIe> = None;
        let mut nr: Option<NrIe> = None;
        let mut lus: Option<LusIe> = None;
        let mut lnd: Option<LndIe> = None;
        for ie in HeaderIeIter::new(frame.ie.header) {
            let Ok(ie) = ie else { break };
            let Some((sub_id, content)) = ie.wisun_sub_ie() else {
                continue;
            };
            match sub_id {
                wh_ie_sub_id::UTT => utt = UttIe::from_slice(content).ok(),
                wh_ie_sub_id::LUTT => lutt = LuttIe::from_slice(content).ok(),
                wh_ie_sub_id::NR => nr = NrIe::from_slice(content).ok(),
                wh_ie_sub_id::LUS => lus = LusIe::from_slice(content).ok(),
                wh_ie_sub_id::LND => lnd = LndIe::from_slice(content).ok(),
                _ => (),
            }
        }
        let mut us: Option<UsIe> = None;
        let mut pom: Option<PomIe> = None;
        for ie in PayloadIeIter::new(frame.ie.payload) {
            let Ok(ie) = ie else { break };
            if ie.id != payload_ie_id::WP {
                continue;
            }
            for nested in NestedIeIter::new(ie.content) {
                let Ok(nested) = nested else { break };
                match (nested.sub_id, nested.long) {
                    (wp_ie_sub_id_long::US, true) => us = UsIe::from_slice(nested.content).ok(),
                    (wp_ie_sub_id_short::POM, false) => {
                        pom = PomIe::from_slice(nested.content).ok()
                    }
                    _ => (),
                }
            }
        }

        let fhss_config = self.fhss_config.clone();
        let our_eui64 = self.rcp.eui64;
        let mut role_changed = false;
        {
            let neigh = match self.neigh_table.get_mut(&src) {
                Some(neigh) => neigh,
                None => return,
            };

            if frame.frame_type == frame_type::DATA {
                if let Some(dsn) = frame.seq_number {
                    if !neigh::duplicate_packet_check(neigh, dsn, ind.timestamp_us) {
                        trace!("drop 15.4: duplicate frame");
                        return;
                    }
                }
            }

            if secured {
                neigh.rx_power_dbm = ind.rx_power_dbm as i32;
                neigh.lqi = ind.lqi as i32;
            } else {
                neigh.rx_power_dbm_unsecured = ind.rx_power_dbm as i32;
                neigh.lqi_unsecured = ind.lqi as i32;
            }
            neigh.last_rx_tstamp_us = ind.timestamp_us;

            if let Some(sec) = &frame.security {
                let slot = &mut neigh.frame_counter_min[(sec.key_index.clamp(1, 7) - 1) as usize];
                if *slot == u32::MAX || sec.frame_counter >= *slot {
                    *slot = sec.frame_counter.saturating_add(1);
                }
            }

            if let Some(utt) = &utt {
                neigh::ut_update(
                    &mut neigh.fhss_data_unsecured,
                    utt.ufsi,
                    ind.timestamp_us,
                    &src,
                );
                if secured {
                    neigh::ut_update(&mut neigh.fhss_data, utt.ufsi, ind.timestamp_us, &src);
                }
            }
            if let Some(lutt) = &lutt {
                neigh::lut_update(
                    &mut neigh.fhss_data_unsecured,
                    lutt.slot_number,
                    lutt.interval_offset_ms,
                    ind.timestamp_us,
                );
                if secured {
                    neigh::lut_update(
                        &mut neigh.fhss_data,
                        lutt.slot_number,
                        lutt.interval_offset_ms,
                        ind.timestamp_us,
                    );
                }
            }
            if let Some(nr) = &nr {
                let before = neigh.node_role;
                neigh::nr_update(neigh, nr);
                role_changed = before != neigh.node_role;
            }
            if let Some(us) = &us {
                neigh::us_update(
                    &fhss_config,
                    &mut neigh.fhss_data_unsecured,
                    &us.chan_info,
                    us.dwell_interval_ms,
                );
                if secured {
                    neigh::us_update(
                        &fhss_config,
                        &mut neigh.fhss_data,
                        &us.chan_info,
                        us.dwell_interval_ms,
                    );
                }
            }
            if let Some(lus) = &lus {
                let lto_info = neigh.lto_info;
                // channel plan tag 255 reuses the previous schedule; any
                // other tag resolves against the US-IE of the same frame
                let chan_info = if lus.channel_plan_tag == LusIe::TAG_REUSE {
                    None
                } else {
                    us.as_ref().map(|us| &us.chan_info)
                };
                let offset_ok = neigh::lus_update(
                    &fhss_config,
                    &mut neigh.fhss_data_unsecured,
                    chan_info,
                    lus.listen_interval_ms,
                    &lto_info,
                );
                if secured {
                    neigh::lus_update(
                        &fhss_config,
                        &mut neigh.fhss_data,
                        chan_info,
                        lus.listen_interval_ms,
                        &lto_info,
                    );
                }
                if !offset_ok {
                    debug!("lfn listening interval changed, new offset grant pending");
                }
            }
            if let Some(lnd) = &lnd {
                neigh::lnd_update(&mut neigh.fhss_data_unsecured, lnd, ind.timestamp_us);
                if secured {
                    neigh::lnd_update(&mut neigh.fhss_data, lnd, ind.timestamp_us);
                }
            }
            if let Some(pom) = pom {
                neigh.pom_ie = pom;
            }

            if frame.frame_type == frame_type::DATA && frame.dst_addr == Addr::Ext(our_eui64) {
                neigh.unicast_data_rx = true;
            }
            if secured && neigh.trusted_device {
                let lifetime_s = neigh.lifetime_s;
                neigh.refresh(lifetime_s, now_s);
            }
        }

        if new_neighbor || role_changed {
            self.emit_property_changed("Nodes");
            if role_changed {
                self.emit_property_changed("RoutingGraph");
            }
        }
    }

    /// The transmit confirmation path.
    pub fn on_tx_cnf(&mut self, cnf: &TxCnf) {
        if !cnf.frame.is_empty() {
            match DataFrame::parse_cnf(&cnf.frame, self.pan.pan_id) {
                Ok(ack) => {
                    if let (Some(src), Some(sec)) = (ack.src_addr.ext(), &ack.security) {
                        if let Some(neigh) = self.neigh_table.get_mut(src) {
                            let slot = &mut neigh.frame_counter_min
                                [(sec.key_index.clamp(1, 7) - 1) as usize];
                            if *slot == u32::MAX || sec.frame_counter >= *slot {
                                *slot = sec.frame_counter.saturating_add(1);
                            }
                        }
                    }
                }
                Err(err) => warn!("invalid ack frame: {}", err),
            }
        }
        match cnf.status {
            HifStatus::Success => trace!("tx-cnf handle {}: success", cnf.handle),
            status if status.retry_eligible() => {
                debug!("tx-cnf handle {}: transient {:?}", cnf.handle, status)
            }
            status => debug!("tx-cnf handle {}: {:?}", cnf.handle, status),
        }
    }

    /// The transmit data path, with the send-time schedule guards.
    ///
    /// # Panics
    ///
    /// Panics on contradictory request shapes (destination vs hopping
    /// sequence, acknowledged async frames); these are caller bugs.
    pub fn data_req_ext(&mut self, req: &DataReqExt) -> Result<u8> {
        assert!(
            !(req.ack_request && req.fhss_type == FhssType::Async),
            "acknowledged async frames do not exist"
        );
        match req.fhss_type {
            FhssType::FfnBc | FhssType::LfnBc | FhssType::Async => {
                assert!(req.dst.is_none(), "broadcast sequence with a destination")
            }
            FhssType::FfnUc | FhssType::LfnUc | FhssType::LfnPa => {
                assert!(req.dst.is_some(), "unicast sequence without a destination")
            }
        }

        let handle = self.next_tx_handle();
        let mut neigh_fhss = None;
        let mut frame_counters = None;
        let mut aborted = false;
        if let Some(dst) = &req.dst {
            match self.neigh_table.get(dst) {
                Some(neigh) if neigh::has_us(&neigh.fhss_data_unsecured) => {
                    neigh_fhss = Some(neigh.fhss_data_unsecured);
                    frame_counters = Some(neigh.frame_counter_min);
                }
                Some(_) => {
                    trace!(
                        "tx-abort 15.4: unknown unicast schedule for {}",
                        wisunparse::fmt_eui64(dst)
                    );
                    aborted = true;
                }
                None => {
                    warn!("neighbor timeout before packet send");
                    aborted = true;
                }
            }
        }
        if aborted {
            self.on_tx_cnf(&TxCnf {
                handle,
                status: HifStatus::Timedout,
                frame: Vec::new(),
                timestamp_us: 0,
            });
            return Ok(handle);
        }

        let request = DataRequest {
            ack_request: req.ack_request,
            pan_id_suppressed: req.dst.is_some(),
            seq_num_suppressed: req.dst.is_none(),
            dst_pan_id: self.pan.pan_id,
            dst_addr: match &req.dst {
                Some(dst) => Addr::Ext(*dst),
                None => Addr::None,
            },
            security: req.security,
            header_ies: req.header_ies,
            payload_ies: req.payload_ies,
            ..Default::default()
        };
        let mut frame = Vec::new();
        request.write(&mut frame, &self.rcp.eui64, self.pan.pan_id);

        self.rcp.req_data_tx(
            &frame,
            handle,
            req.fhss_type,
            neigh_fhss.as_ref(),
            frame_counters.as_ref(),
            req.rate_list,
            req.ms_mode,
        )?;
        Ok(handle)
    }

    /// Cancels an outstanding transmission by handle.
    pub fn data_req_abort(&mut self, handle: u8) -> Result<()> {
        self.rcp.req_data_tx_abort(handle)
    }

    /// Sends a management frame on the async sequence.
    pub fn send_mngt_frame(&mut self, built: mngt::MngtFrame) -> Result<u8> {
        let handle = self.next_tx_handle();
        self.rcp.req_data_tx(
            &built.frame,
            handle,
            FhssType::Async,
            None,
            None,
            None,
            ModeSwitchType::Phy,
        )?;
        Ok(handle)
    }

    /// Sends the periodic PAN advertisement & configuration pair.
    pub fn send_pan_adverts(&mut self) -> Result<()> {
        let lfn_count = self.neigh_table.lfn_count() as u16;
        let pa = mngt::build_pa(
            &self.pan,
            &self.fhss_config,
            &self.ie_custom,
            &self.rcp.eui64,
            lfn_count,
        );
        self.send_mngt_frame(pa)?;
        let pc = mngt::build_pc(
            &self.pan,
            &self.fhss_config,
            &self.ie_custom,
            &self.rcp.eui64,
        );
        self.send_mngt_frame(pc)?;
        if self.config.enable_lfn {
            let lpa = mngt::build_lpa(
                &self.pan,
                &self.fhss_config,
                &self.ie_custom,
                &self.rcp.eui64,
            );
            self.send_mngt_frame(lpa)?;
            let lpc = mngt::build_lpc(
                &self.pan,
                &self.fhss_config,
                &self.ie_custom,
                &self.rcp.eui64,
            );
            self.send_mngt_frame(lpc)?;
        }
        Ok(())
    }

    /// One second timer tick: neighbor expiry & periodic advertisements.
    pub fn timer_tick(&mut self) -> Result<()> {
        let now_s = self.now_s();
        let expired = self.neigh_table.expire(now_s);
        if !expired.is_empty() {
            for mac64 in &expired {
                debug!("neighbor expired: {}", wisunparse::fmt_eui64(mac64));
            }
            self.emit_property_changed("Nodes");
            self.emit_property_changed("RoutingGraph");
        }

        if self.radio_configured {
            self.advert_countdown = self.advert_countdown.saturating_sub(1);
            if self.advert_countdown == 0 {
                self.advert_countdown = PAN_ADVERT_PERIOD_S;
                self.send_pan_adverts()?;
            }
        }
        Ok(())
    }

    /// Promotes a neighbor after a completed authentication (authenticator
    /// collaborator callback).
    pub fn on_supplicant_authenticated(&mut self, eui64: &Eui64, node_role: Option<u8>) {
        let now_s = self.now_s();
        if self.neigh_table.get(eui64).is_none() {
            let key_index_mask = self.key_index_mask();
            self.neigh_table
                .add(eui64, None, self.config.tx_power_dbm, key_index_mask, now_s);
        }
        if let Some(neigh) = self.neigh_table.get_mut(eui64) {
            neigh.trust(now_s);
            neigh.node_role = node_role.and_then(wisunparse::NodeRole::from_ie);
        }
        let mut record = crate::storage::SupplicantRecord::new(*eui64);
        record.node_role = node_role;
        if let Err(err) = self.storage.write(&record) {
            warn!("key storage: {}", err);
        }
        self.emit_property_changed("Nodes");
    }

    /// Drains the RCP traffic and processes every event in arrival order.
    pub fn process_rcp(&mut self) -> Result<()> {
        for event in self.rcp.receive()? {
            self.handle_rcp_event(event)?;
        }
        Ok(())
    }

    /// Accepts, reads and answers control clients.
    pub fn process_ctl(&mut self) {
        let Some(mut ctl) = self.ctl.take() else {
            return;
        };
        ctl.accept();
        let requests = ctl.read_requests();
        self.ctl = Some(ctl);
        for (client_id, request) in requests {
            let message = match api::dispatch(self, &request) {
                Ok(payload) => wire::encode_reply(&payload),
                Err(err) => {
                    debug!("control: {}", err);
                    wire::encode_error(&err)
                }
            };
            if let Some(ctl) = &mut self.ctl {
                ctl.send(client_id, &message);
            }
        }
        if let Some(ctl) = &mut self.ctl {
            ctl.reap();
        }
    }

    /// The event loop. Returns only on a fatal error or after
    /// [`Ctxt::shutdown`] conditions.
    pub fn run(&mut self) -> Result<()> {
        use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
        use nix::sys::time::TimeSpec;
        use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
        use std::os::fd::{AsFd, BorrowedFd};

        let timer = TimerFd::new(ClockId::CLOCK_MONOTONIC, TimerFlags::TFD_NONBLOCK)
            .map_err(|err| Error::Fatal(format!("timerfd: {}", err)))?;
        timer
            .set(
                Expiration::Interval(TimeSpec::new(1, 0)),
                TimerSetTimeFlags::empty(),
            )
            .map_err(|err| Error::Fatal(format!("timerfd_settime: {}", err)))?;

        self.rcp.req_reset(false)?;

        loop {
            let bus_fd = self.rcp.bus().as_raw_fd();
            let ctl_fds: Vec<i32> = match &self.ctl {
                Some(ctl) => {
                    let mut fds = vec![ctl.listener_fd()];
                    fds.extend(ctl.client_fds());
                    fds
                }
                None => Vec::new(),
            };

            // SAFETY: every fd polled here is owned by `self` or by the
            // local timer and outlives the poll call
            let mut pollfds: Vec<PollFd> = Vec::with_capacity(2 + ctl_fds.len());
            pollfds.push(PollFd::new(
                unsafe { BorrowedFd::borrow_raw(bus_fd) },
                PollFlags::POLLIN,
            ));
            pollfds.push(PollFd::new(timer.as_fd(), PollFlags::POLLIN));
            for fd in &ctl_fds {
                pollfds.push(PollFd::new(
                    unsafe { BorrowedFd::borrow_raw(*fd) },
                    PollFlags::POLLIN,
                ));
            }

            poll(&mut pollfds, PollTimeout::NONE)
                .map_err(|err| Error::Fatal(format!("poll: {}", err)))?;

            let readable: Vec<bool> = pollfds
                .iter()
                .map(|fd| {
                    fd.revents()
                        .map(|revents| revents.contains(PollFlags::POLLIN))
                        .unwrap_or(false)
                })
                .collect();
            drop(pollfds);

            if readable[0] {
                self.process_rcp()?;
            }
            if readable[2..].iter().any(|ready| *ready) {
                self.process_ctl();
            }
            // timers run after all pending fd events of the tick
            if readable[1] {
                let _ = timer.wait();
                self.timer_tick()?;
            }
        }
    }

    /// Orderly shutdown: final reset, then close the layers top-down
    /// (control service, then the bus through [`Rcp`]'s drop).
    pub fn shutdown(&mut self) {
        let _ = self.rcp.req_reset(false);
        self.ctl = None;
        info!("shut down");
    }
}
