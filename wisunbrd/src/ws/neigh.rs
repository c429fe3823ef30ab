//! Neighbor table & per-neighbor FHSS timing state.
//!
//! Entries live in a dense arena with generation-counted handles; the
//! durable external key is the EUI-64. References handed out are
//! invalidated by the next expire pass, callers re-resolve by EUI-64.

use std::collections::HashMap;

use log::{debug, trace};
use rand::Rng;

use wisunparse::{
    fmt_eui64, ChannelFunction, GenericChannelInfo, ExcludedChannels, LndIe, NodeRole, NrIe, PomIe,
};

use crate::ws::regdb::{self, chan_mask};
use crate::ws::FhssConfig;

pub type Eui64 = [u8; 8];

/// Lifetime granted to a neighbor that has not completed authentication.
pub const TEMPORARY_ENTRY_LIFETIME_S: u32 = 600;

/// Guard time kept between LFN unicast & broadcast listening slots.
pub const LFN_SCHEDULE_GUARD_TIME_MS: u32 = 300;

/// Window under which a repeated data sequence number is a duplicate.
pub const DUPLICATE_WINDOW_S: u64 = 5;

/// Channel function of a neighbor schedule.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ChanFunc {
    Fixed,
    Tr51Cf,
    #[default]
    Dh1Cf,
    Vendor,
}

impl From<&ChannelFunction> for ChanFunc {
    fn from(function: &ChannelFunction) -> ChanFunc {
        match function {
            ChannelFunction::Fixed { .. } => ChanFunc::Fixed,
            ChannelFunction::Tr51Cf => ChanFunc::Tr51Cf,
            ChannelFunction::Dh1Cf => ChanFunc::Dh1Cf,
            ChannelFunction::VendorDefined => ChanFunc::Vendor,
        }
    }
}

/// FFN unicast timing sub-block.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FfnTiming {
    pub utt_rx_tstamp_us: u64,
    /// 24-bit Unicast Fractional Sequence Interval of the last UTT-IE.
    pub ufsi: u32,
    pub uc_dwell_interval_ms: u8,
}

/// LFN timing sub-block.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LfnTiming {
    pub lutt_rx_tstamp_us: u64,
    pub uc_slot_number: u16,
    pub uc_interval_offset_ms: u32,
    pub uc_listen_interval_ms: u32,
    pub lpa_response_delay_ms: u32,
    pub lpa_slot_duration_ms: u8,
    pub lpa_slot_count: u8,
    pub lpa_slot_first: u16,
    pub lnd_rx_tstamp_us: u64,
}

/// Per-neighbor FHSS timing; secured frames feed the authoritative copy,
/// unsecured frames a separate one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FhssData {
    pub uc_chan_func: ChanFunc,
    pub uc_chan_fixed: u16,
    pub uc_channel_list: [u8; 32],
    pub uc_chan_count: u16,
    pub ffn: FfnTiming,
    pub lfn: LfnTiming,
}

/// LFN listening interval bounds received via the NR-IE.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LtoInfo {
    pub uc_interval_min_ms: u32,
    pub uc_interval_max_ms: u32,
}

/// One neighbor entry. Keyed by EUI-64, owned by the table.
#[derive(Clone, Debug)]
pub struct Neigh {
    pub mac64: Eui64,
    pub node_role: Option<NodeRole>,
    pub lifetime_s: u32,
    /// Monotonic-clock second at which the entry expires.
    pub expiration_s: u64,
    pub trusted_device: bool,
    /// Lowest acceptable frame counter per key index 1..=7; all-ones when
    /// the index is disabled.
    pub frame_counter_min: [u32; 7],
    pub rx_power_dbm: i32,
    pub rx_power_dbm_unsecured: i32,
    pub rsl_in_dbm: f32,
    pub rsl_in_dbm_unsecured: f32,
    pub rsl_out_dbm: f32,
    pub lqi: i32,
    pub lqi_unsecured: i32,
    pub apc_txpow_dbm: i8,
    pub apc_txpow_dbm_ofdm: i8,
    pub pom_ie: PomIe,
    pub last_dsn: u8,
    pub unicast_data_rx: bool,
    pub last_rx_tstamp_us: u64,
    pub fhss_data: FhssData,
    pub fhss_data_unsecured: FhssData,
    pub lto_info: LtoInfo,
    /// Per-link mode switch override (see `ws::mngt`).
    pub ms_mode: u8,
    pub ms_phy_mode_id: u8,
    /// Per-link EDFE override.
    pub edfe_mode: u8,
}

impl Neigh {
    fn new(mac64: Eui64, role: Option<NodeRole>, tx_power_dbm: i8, key_index_mask: u8, now_s: u64) -> Neigh {
        let mut frame_counter_min = [0u32; 7];
        for key_index in 1..=7u8 {
            if 0 == key_index_mask & (1 << key_index) {
                frame_counter_min[key_index as usize - 1] = u32::MAX;
            }
        }
        Neigh {
            mac64,
            node_role: role,
            lifetime_s: TEMPORARY_ENTRY_LIFETIME_S,
            expiration_s: now_s + TEMPORARY_ENTRY_LIFETIME_S as u64,
            trusted_device: false,
            frame_counter_min,
            rx_power_dbm: i32::MAX,
            rx_power_dbm_unsecured: i32::MAX,
            rsl_in_dbm: f32::NAN,
            rsl_in_dbm_unsecured: f32::NAN,
            rsl_out_dbm: f32::NAN,
            lqi: i32::MAX,
            lqi_unsecured: i32::MAX,
            apc_txpow_dbm: tx_power_dbm,
            apc_txpow_dbm_ofdm: tx_power_dbm,
            pom_ie: PomIe {
                phy_op_mode_ids: Default::default(),
                mdr_command_capable: false,
            },
            last_dsn: 0,
            unicast_data_rx: false,
            last_rx_tstamp_us: 0,
            fhss_data: FhssData::default(),
            fhss_data_unsecured: FhssData::default(),
            lto_info: LtoInfo::default(),
            ms_mode: 0,
            ms_phy_mode_id: 0,
            edfe_mode: 0,
        }
    }

    /// Re-arms the expiration timer with a new lifetime.
    pub fn refresh(&mut self, lifetime_s: u32, now_s: u64) {
        self.lifetime_s = lifetime_s;
        self.expiration_s = now_s + lifetime_s as u64;
        trace!(
            "15.4 neighbor refresh {} / {}s",
            fmt_eui64(&self.mac64),
            self.lifetime_s
        );
    }

    /// Promotes the entry after a completed authentication.
    pub fn trust(&mut self, now_s: u64) {
        if self.trusted_device {
            return;
        }
        self.expiration_s = now_s + self.lifetime_s as u64;
        self.trusted_device = true;
        trace!(
            "15.4 neighbor trusted {} / {}s",
            fmt_eui64(&self.mac64),
            self.lifetime_s
        );
    }
}

/// Generation-counted reference to a table slot. Stale handles resolve to
/// `None` after the entry is removed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NeighHandle {
    index: u32,
    gen: u32,
}

#[derive(Clone, Debug, Default)]
struct Slot {
    gen: u32,
    entry: Option<Neigh>,
}

/// The neighbor table: dense arena + EUI-64 index.
#[derive(Default)]
pub struct NeighTable {
    slots: Vec<Slot>,
    by_mac: HashMap<Eui64, u32>,
}

impl NeighTable {
    pub fn new() -> NeighTable {
        NeighTable::default()
    }

    /// Inserts a new entry; the EUI-64 must not be present yet.
    pub fn add(
        &mut self,
        mac64: &Eui64,
        role: Option<NodeRole>,
        tx_power_dbm: i8,
        key_index_mask: u8,
        now_s: u64,
    ) -> NeighHandle {
        debug_assert!(!self.by_mac.contains_key(mac64));
        let entry = Neigh::new(*mac64, role, tx_power_dbm, key_index_mask, now_s);
        debug!(
            "15.4 neighbor add {} / {}s",
            fmt_eui64(mac64),
            entry.lifetime_s
        );
        let index = match self.slots.iter().position(|slot| slot.entry.is_none()) {
            Some(free) => {
                self.slots[free].entry = Some(entry);
                free as u32
            }
            None => {
                self.slots.push(Slot {
                    gen: 0,
                    entry: Some(entry),
                });
                self.slots.len() as u32 - 1
            }
        };
        self.by_mac.insert(*mac64, index);
        NeighHandle {
            index,
            gen: self.slots[index as usize].gen,
        }
    }

    pub fn get(&self, mac64: &Eui64) -> Option<&Neigh> {
        let index = *self.by_mac.get(mac64)?;
        self.slots[index as usize].entry.as_ref()
    }

    pub fn get_mut(&mut self, mac64: &Eui64) -> Option<&mut Neigh> {
        let index = *self.by_mac.get(mac64)?;
        self.slots[index as usize].entry.as_mut()
    }

    pub fn handle(&self, mac64: &Eui64) -> Option<NeighHandle> {
        let index = *self.by_mac.get(mac64)?;
        Some(NeighHandle {
            index,
            gen: self.slots[index as usize].gen,
        })
    }

    pub fn resolve(&self, handle: NeighHandle) -> Option<&Neigh> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.gen != handle.gen {
            return None;
        }
        slot.entry.as_ref()
    }

    pub fn resolve_mut(&mut self, handle: NeighHandle) -> Option<&mut Neigh> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.gen != handle.gen {
            return None;
        }
        slot.entry.as_mut()
    }

    pub fn del(&mut self, mac64: &Eui64) -> bool {
        let Some(index) = self.by_mac.remove(mac64) else {
            return false;
        };
        let slot = &mut self.slots[index as usize];
        if let Some(entry) = slot.entry.take() {
            debug!(
                "15.4 neighbor del {} / {}s",
                fmt_eui64(mac64),
                entry.lifetime_s
            );
        }
        slot.gen = slot.gen.wrapping_add(1);
        true
    }

    /// Removes entries whose expiration passed, returning their EUI-64s.
    pub fn expire(&mut self, now_s: u64) -> Vec<Eui64> {
        let expired: Vec<Eui64> = self
            .iter()
            .filter(|neigh| now_s >= neigh.expiration_s)
            .map(|neigh| neigh.mac64)
            .collect();
        for mac64 in &expired {
            self.del(mac64);
        }
        expired
    }

    pub fn count(&self) -> usize {
        self.by_mac.len()
    }

    pub fn lfn_count(&self) -> usize {
        self.iter()
            .filter(|neigh| neigh.node_role == Some(NodeRole::Lfn))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neigh> {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Neigh> {
        self.slots.iter_mut().filter_map(|slot| slot.entry.as_mut())
    }
}

/// Clock drift estimated between two UTT-IE samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriftEstimate {
    pub drift_ms: f64,
    pub window_us: u64,
}

impl DriftEstimate {
    /// Drift in parts per million; only meaningful above a 10 s window
    /// (the RCP timer resolution of 1 µs bounds the precision below it).
    pub fn ppm(&self) -> Option<f64> {
        if self.window_us >= 10_000_000 {
            Some(1e9 * self.drift_ms / self.window_us as f64)
        } else {
            None
        }
    }
}

fn calculate_ufsi_drift(
    fhss_data: &FhssData,
    ufsi: u32,
    timestamp_us: u64,
    eui64: &Eui64,
) -> Option<DriftEstimate> {
    if fhss_data.ffn.utt_rx_tstamp_us == 0 || fhss_data.ffn.ufsi == 0 {
        return None;
    }
    // No UFSI on fixed channel
    if fhss_data.uc_chan_func == ChanFunc::Fixed {
        return None;
    }
    let seq_length: f64 = if fhss_data.uc_chan_func == ChanFunc::Tr51Cf {
        fhss_data.uc_chan_count as f64
    } else {
        0x10000 as f64
    };
    let dwell = fhss_data.ffn.uc_dwell_interval_ms as f64;
    let ufsi_prev = fhss_data.ffn.ufsi as f64;
    let mut ufsi_cur = ufsi as f64;
    if fhss_data.uc_chan_func == ChanFunc::Dh1Cf && ufsi_cur < ufsi_prev {
        ufsi_cur += 0xffffff as f64;
    }
    // Convert the 24-bit UFSI to real time before drift calculation
    let time_prev_ms = ufsi_prev * seq_length * dwell / 0x1000000 as f64;
    let mut time_cur_ms = ufsi_cur * seq_length * dwell / 0x1000000 as f64;
    let window_us = timestamp_us.saturating_sub(fhss_data.ffn.utt_rx_tstamp_us);

    if fhss_data.uc_chan_func == ChanFunc::Tr51Cf {
        let full_schedule_ms =
            fhss_data.ffn.uc_dwell_interval_ms as u32 * fhss_data.uc_chan_count as u32;
        if full_schedule_ms == 0 {
            return None;
        }
        // Realign with the number of complete schedules elapsed so that
        // the current sample sits ahead of the previous one
        let mut schedules = ((window_us / 1000) / full_schedule_ms as u64) as i64;
        if time_cur_ms >= time_prev_ms {
            schedules -= 1;
        }
        time_cur_ms += (schedules as f64 + 1.0) * full_schedule_ms as f64;
    }

    let mut ufsi_diff_ms = time_cur_ms - time_prev_ms;
    if time_cur_ms < time_prev_ms {
        // add one full UFSI sequence length
        ufsi_diff_ms += seq_length * dwell;
    }

    let drift_ms = window_us as f64 / 1000.0 - ufsi_diff_ms;
    let estimate = DriftEstimate {
        drift_ms,
        window_us,
    };
    match estimate.ppm() {
        Some(ppm) => trace!(
            "15.4 neighbor sync {} / {:.1}ppm drift ({:.0}us in {}s)",
            fmt_eui64(eui64),
            ppm,
            drift_ms * 1000.0,
            window_us / 1_000_000
        ),
        None => trace!(
            "15.4 neighbor sync {} / drift measure not available",
            fmt_eui64(eui64)
        ),
    }
    Some(estimate)
}

/// Feeds a UTT-IE sample, returning the drift estimate when one could be
/// computed against the previous sample.
pub fn ut_update(
    fhss_data: &mut FhssData,
    ufsi: u32,
    tstamp_us: u64,
    eui64: &Eui64,
) -> Option<DriftEstimate> {
    let drift = calculate_ufsi_drift(fhss_data, ufsi, tstamp_us, eui64);

    if fhss_data.ffn.utt_rx_tstamp_us == tstamp_us && fhss_data.ffn.ufsi == ufsi {
        return drift; // Save an update
    }
    fhss_data.ffn.utt_rx_tstamp_us = tstamp_us;
    fhss_data.ffn.ufsi = ufsi;
    drift
}

// Wi-SUN FAN 1.1v08 - 6.3.4.6.4.2.6 Maintaining FFN / LFN Synchronization
//   When the FFN receives a LUTT-IE from a LFN it does not adjust any time
//   difference relative to the expected LFN's unicast listening reference
//   point.
// The LUTT information is recorded as-is; drift only enters through an
// LUS-IE indicating an interval change.
pub fn lut_update(
    fhss_data: &mut FhssData,
    slot_number: u16,
    interval_offset_ms: u32,
    tstamp_us: u64,
) {
    fhss_data.lfn.lutt_rx_tstamp_us = tstamp_us;
    fhss_data.lfn.uc_slot_number = slot_number;
    fhss_data.lfn.uc_interval_offset_ms = interval_offset_ms;
}

/// Records the LFN discovery parameters of an LND-IE.
pub fn lnd_update(fhss_data: &mut FhssData, ie_lnd: &LndIe, tstamp_us: u64) {
    fhss_data.lfn.lpa_response_delay_ms = ie_lnd.response_delay_ms;
    fhss_data.lfn.lpa_slot_duration_ms = ie_lnd.discovery_slot_time_ms;
    fhss_data.lfn.lpa_slot_count = ie_lnd.discovery_slots;
    fhss_data.lfn.lpa_slot_first = ie_lnd.discovery_first_slot;
    fhss_data.lfn.lnd_rx_tstamp_us = tstamp_us;
}

/// Records the listening interval bounds of an NR-IE.
pub fn nr_update(neigh: &mut Neigh, nr_ie: &NrIe) {
    if let Some((min, max)) = nr_ie.listen_interval_ms {
        neigh.lto_info.uc_interval_min_ms = min;
        neigh.lto_info.uc_interval_max_ms = max;
    }
    neigh.node_role = NodeRole::from_ie(nr_ie.node_role);
}

fn excluded_mask_by_range(
    channel_mask: &mut [u8; 32],
    ranges: &[(u16, u16)],
    number_of_channels: u16,
) {
    for (start, end) in ranges {
        chan_mask::clear_range(channel_mask, *start, (*end).min(number_of_channels));
    }
}

fn excluded_mask_by_mask(channel_mask: &mut [u8; 32], excluded: &[u8], number_of_channels: u16) {
    let nchan = (number_of_channels as usize).min(excluded.len() * 8);
    for chan in 0..nchan as u16 {
        if 0 != excluded[chan as usize / 8] & (1 << (chan % 8)) {
            chan_mask::clear(channel_mask, chan);
        }
    }
}

/// Derives `(uc_channel_list, uc_chan_count)` from a received channel
/// information block. Returns `false` (leaving the schedule untouched)
/// when the channel plan cannot be resolved against the regulatory
/// database.
fn set_chan_list(
    fhss_config: &FhssConfig,
    chan_mask_out: &mut [u8; 32],
    chan_info: &GenericChannelInfo,
    chan_cnt: &mut u16,
) -> bool {
    use wisunparse::ChannelPlan;

    let params = match chan_info.channel_plan {
        ChannelPlan::Zero {
            regulatory_domain,
            operating_class,
        } => regdb::chan_params(regulatory_domain, 0, operating_class),
        ChannelPlan::One { .. } => None,
        ChannelPlan::Two {
            regulatory_domain,
            chan_plan_id,
        } => regdb::chan_params(regulatory_domain, chan_plan_id, 0),
    };
    let count = match (&chan_info.channel_plan, params) {
        (ChannelPlan::One { chan_count, .. }, _) => *chan_count,
        (_, Some(params)) => params.chan_count,
        (_, None) => {
            trace!("ignore: unknown channel plan in schedule IE");
            return false;
        }
    };

    let mut mask = regdb::generate_channel_mask(count, params, fhss_config.regulation);
    match &chan_info.excluded {
        ExcludedChannels::None => (),
        ExcludedChannels::Range(ranges) => excluded_mask_by_range(&mut mask, ranges, count),
        ExcludedChannels::Mask(excluded) => excluded_mask_by_mask(&mut mask, excluded, count),
    }
    *chan_mask_out = mask;
    *chan_cnt = count;
    true
}

/// Applies a US-IE schedule to a neighbor's FHSS block.
pub fn us_update(
    fhss_config: &FhssConfig,
    fhss_data: &mut FhssData,
    chan_info: &GenericChannelInfo,
    dwell_interval: u8,
) {
    fhss_data.uc_chan_func = (&chan_info.channel_function).into();
    if let ChannelFunction::Fixed { chan } = chan_info.channel_function {
        fhss_data.uc_chan_fixed = chan;
        fhss_data.uc_chan_count = 1;
    } else {
        set_chan_list(
            fhss_config,
            &mut fhss_data.uc_channel_list,
            chan_info,
            &mut fhss_data.uc_chan_count,
        );
    }
    fhss_data.ffn.uc_dwell_interval_ms = dwell_interval;
}

/// True when a unicast schedule is known for the neighbor (a TX without
/// one is aborted at send time).
pub fn has_us(fhss_data: &FhssData) -> bool {
    fhss_data.uc_channel_list.iter().any(|byte| *byte != 0)
}

// Compute the divisors of val closest to q_ref, possibly including 1 and
// val itself.
fn calc_closest_divisors(val: u32, q_ref: u32) -> (u32, u32) {
    let mut below = 0;
    let mut above = 0;

    // Iterate through divisors from 1 to sqrt(val)
    let mut q = 1;
    while q * q <= val {
        if val % q == 0 {
            if q <= q_ref {
                below = q;
            } else {
                return (below, q);
            }
        }
        q += 1;
    }
    // Iterate through the remaining divisors
    q -= 1;
    while q > 0 {
        if val % q == 0 {
            let quotient = val / q;
            if quotient <= q_ref {
                below = quotient;
            } else {
                return (below, quotient);
            }
        }
        q -= 1;
    }
    (below, above)
}

// Compute the Adjusted Listening Interval to be included in the LTO-IE
// See Wi-SUN FAN 1.1v06 6.3.4.6.4.2.1.2 FFN Processing of LFN PAN
// Advertisement Solicit
pub fn calc_lfn_adjusted_interval(
    bc_interval: u32,
    uc_interval: u32,
    uc_interval_min: u32,
    uc_interval_max: u32,
) -> u32 {
    if bc_interval == 0 || uc_interval == 0 || uc_interval_min == 0 || uc_interval_max == 0 {
        return 0;
    }
    if uc_interval < uc_interval_min || uc_interval > uc_interval_max {
        trace!("ignore: lto-ie incoherent with nr-ie");
        return 0;
    }

    if uc_interval > bc_interval {
        // Current state:
        //   uc = q * bc + r
        // Desired state:
        //   uc' = q' * bc
        // This can be solved arithmetically:
        //   for a bigger interval:  uc' = uc + bc - r = (q + 1) * bc
        //   for a smaller interval: uc' = uc - r = q * bc
        let r = uc_interval % bc_interval;
        if r == 0 {
            return uc_interval; // No need to adjust
        }
        if uc_interval + bc_interval - r <= uc_interval_max {
            return uc_interval + bc_interval - r; // Extend interval
        }
        if uc_interval - r >= uc_interval_min {
            return uc_interval - r; // Reduce interval
        }
        uc_interval // No multiple available in range
    } else {
        // Current state:
        //   bc = q * uc + r
        // Desired state:
        //   bc = q' * uc'
        // This case is much more difficult. The solution proposed here is
        // to iterate through divisors of bc to find those closest to q:
        //   q_below <= q < q_above
        //   for a bigger interval:  uc' = bc / q_below
        //   for a smaller interval: uc' = bc / q_above
        if bc_interval % uc_interval == 0 {
            return uc_interval; // No need to adjust
        }

        let (q_below, q_above) = calc_closest_divisors(bc_interval, bc_interval / uc_interval);

        if q_above != 0 && bc_interval / q_above >= uc_interval_min {
            return bc_interval / q_above; // Reduce interval
        }
        if q_below != 0 && bc_interval / q_below <= uc_interval_max {
            return bc_interval / q_below; // Extend interval
        }
        uc_interval // No sub-multiple available in range
    }
}

/// Draws the LFN broadcast offset for an adjusted listening interval.
///
/// The offset is a multiple of the guard time inside the LFN broadcast
/// interval; any multiple or divisor alignment of the two intervals then
/// keeps unicast listening slots at least one guard time away from the
/// broadcast slot in both directions. Schedules of different LFNs are
/// only spread by the randomness.
pub fn calc_lfn_offset<R: Rng>(
    adjusted_listening_interval: u32,
    bc_interval: u32,
    rng: &mut R,
) -> u32 {
    // Cannot protect the broadcast slot with such a short interval
    if adjusted_listening_interval < 2 * LFN_SCHEDULE_GUARD_TIME_MS {
        return 0;
    }

    let max_offset_ms = if adjusted_listening_interval >= bc_interval {
        bc_interval.saturating_sub(LFN_SCHEDULE_GUARD_TIME_MS)
    } else {
        adjusted_listening_interval - LFN_SCHEDULE_GUARD_TIME_MS
    };
    if max_offset_ms < LFN_SCHEDULE_GUARD_TIME_MS {
        return 0;
    }
    LFN_SCHEDULE_GUARD_TIME_MS * rng.gen_range(1..=max_offset_ms / LFN_SCHEDULE_GUARD_TIME_MS)
}

/// Applies an LUS-IE to a neighbor's FHSS block.
///
/// Returns `false` when the interval changed in a way that requires a new
/// broadcast offset to be granted through an LTO-IE. `chan_info` is
/// `None` for channel plan tag 255 (reuse the previous schedule).
pub fn lus_update(
    fhss_config: &FhssConfig,
    fhss_data: &mut FhssData,
    chan_info: Option<&GenericChannelInfo>,
    listen_interval_ms: u32,
    lto_info: &LtoInfo,
) -> bool {
    let mut offset_adjusted = true;

    if fhss_data.lfn.uc_listen_interval_ms != listen_interval_ms {
        let adjusted = calc_lfn_adjusted_interval(
            fhss_config.lfn_bc_interval_ms,
            fhss_data.lfn.uc_listen_interval_ms,
            lto_info.uc_interval_min_ms,
            lto_info.uc_interval_max_ms,
        );
        if adjusted != 0 && adjusted != listen_interval_ms {
            offset_adjusted = false;
        }
    }

    fhss_data.lfn.uc_listen_interval_ms = listen_interval_ms;
    let Some(chan_info) = chan_info else {
        return offset_adjusted;
    };
    fhss_data.uc_chan_func = (&chan_info.channel_function).into();
    if let ChannelFunction::Fixed { chan } = chan_info.channel_function {
        fhss_data.uc_chan_fixed = chan;
        fhss_data.uc_chan_count = 1;
    } else {
        set_chan_list(
            fhss_config,
            &mut fhss_data.uc_channel_list,
            chan_info,
            &mut fhss_data.uc_chan_count,
        );
    }
    offset_adjusted
}

/// Duplicate frame filter. Returns `true` when the frame is new.
pub fn duplicate_packet_check(neigh: &mut Neigh, mac_dsn: u8, rx_timestamp_us: u64) -> bool {
    if neigh.last_dsn != mac_dsn {
        // New packet always accepted
        neigh.last_dsn = mac_dsn;
        return true;
    }
    if !neigh.unicast_data_rx {
        // No unicast info stored always accepted
        return true;
    }
    let elapsed_s =
        rx_timestamp_us.saturating_sub(neigh.fhss_data.ffn.utt_rx_tstamp_us) / 1_000_000;
    elapsed_s >= DUPLICATE_WINDOW_S
}
