//! PAN management: version counters, PAN advertisement & configuration
//! frame building, and the per-link mode switch / EDFE policy.

use log::debug;

use wisunparse::{
    fmt_eui64, wh_ie_sub_id, wp_ie_sub_id_long, wp_ie_sub_id_short, write_nested_long,
    write_nested_short, write_payload_ie, write_wh_ie, payload_ie_id, BtIe, ChannelFunction,
    ChannelPlan, DataRequest, ExcludedChannels, GenericChannelInfo, GtkHashIe, LbtIe, NetNameIe,
    PanIe, PanVerIe, PomIe, SecurityLevel, UsIe, UttIe,
};

use crate::error::{Error, Result};
use crate::ws::ie_list::{ws_frame_type, FrameTypeMask, IeCustomList};
use crate::ws::neigh::{Eui64, NeighTable};
use crate::ws::pan::PanInfo;
use crate::ws::FhssConfig;

/// Mode switch settings accepted by the control API.
pub mod mode_switch {
    pub const DEFAULT: u8 = 0;
    pub const DISABLED: u8 = 1;
    pub const PHY: u8 = 2;
    pub const MAC: u8 = 3;
}

/// EDFE settings accepted by the control API.
pub mod edfe_mode {
    pub const DEFAULT: u8 = 0;
    pub const DISABLED: u8 = 1;
    pub const ENABLED: u8 = 2;
    pub const MAX: u8 = 3;
}

/// Bumps the PAN version after an IE reconfiguration; advertised through
/// the PANVER-IE of the next PAN configuration frame.
pub fn pan_version_increase(pan: &mut PanInfo) {
    pan.pan_version = pan.pan_version.wrapping_add(1);
    debug!("pan version increase ({})", pan.pan_version);
}

pub fn lfn_pan_version_increase(pan: &mut PanInfo) {
    pan.lfn_pan_version = pan.lfn_pan_version.wrapping_add(1);
    debug!("lfn pan version increase ({})", pan.lfn_pan_version);
}

/// The interface's own advertised schedule, built from the static FHSS
/// configuration.
pub fn own_chan_info(cfg: &FhssConfig) -> GenericChannelInfo {
    let channel_plan = if cfg.chan_plan_id != 0 {
        ChannelPlan::Two {
            regulatory_domain: cfg.reg_domain,
            chan_plan_id: cfg.chan_plan_id,
        }
    } else {
        ChannelPlan::Zero {
            regulatory_domain: cfg.reg_domain,
            operating_class: cfg.op_class,
        }
    };
    GenericChannelInfo {
        channel_plan,
        channel_function: ChannelFunction::Dh1Cf,
        excluded: ExcludedChannels::None,
    }
}

fn us_ie(cfg: &FhssConfig) -> UsIe {
    UsIe {
        dwell_interval_ms: cfg.uc_dwell_interval_ms,
        clock_drift: 255,
        timing_accuracy: 10,
        chan_info: own_chan_info(cfg),
    }
}

fn frame_type_mask(frame_type: u8) -> FrameTypeMask {
    FrameTypeMask::from_bits_truncate(1 << frame_type)
}

/// A management frame ready to be handed to the radio as an async TX.
#[derive(Clone, Debug)]
pub struct MngtFrame {
    pub frame_type: u8,
    pub frame: Vec<u8>,
}

fn build_mngt_frame(
    frame_type: u8,
    pan: &PanInfo,
    ie_custom: &IeCustomList,
    src_eui64: &Eui64,
    header_ies: Vec<u8>,
    wp_content: Vec<u8>,
    secured: bool,
) -> MngtFrame {
    let mut header_ies = header_ies;
    ie_custom.write_header_ies(&mut header_ies, frame_type_mask(frame_type));

    let mut payload_ies = Vec::new();
    if !wp_content.is_empty() {
        write_payload_ie(&mut payload_ies, payload_ie_id::WP, &wp_content);
    }
    ie_custom.write_payload_ies(&mut payload_ies, frame_type_mask(frame_type));

    let chunks = [&payload_ies[..]];
    let payload_chunks: &[&[u8]] = if payload_ies.is_empty() { &[] } else { &chunks };
    let req = DataRequest {
        pan_id_suppressed: false,
        seq_num_suppressed: true,
        dst_pan_id: 0xffff,
        dst_addr: wisunparse::Addr::None,
        src_addr_mode: wisunparse::AddrMode::Ext,
        security: secured.then_some((SecurityLevel::EncMic64, 1)),
        header_ies: Some(&header_ies),
        payload_ies: payload_chunks,
        ..Default::default()
    };
    let mut frame = Vec::new();
    req.write(&mut frame, src_eui64, pan.pan_id);
    MngtFrame {
        frame_type,
        frame,
    }
}

/// Builds a PAN Advertisement frame.
pub fn build_pa(
    pan: &PanInfo,
    cfg: &FhssConfig,
    ie_custom: &IeCustomList,
    src_eui64: &Eui64,
    lfn_count: u16,
) -> MngtFrame {
    let mut header_ies = Vec::new();
    let utt = UttIe {
        frame_type_id: ws_frame_type::PA,
        ufsi: 0, // patched by the radio at transmit time
    };
    write_wh_ie(&mut header_ies, wh_ie_sub_id::UTT, &utt.to_content());

    let mut wp = Vec::new();
    write_nested_long(&mut wp, wp_ie_sub_id_long::US, &us_ie(cfg).to_content());
    let pan_ie = PanIe {
        pan_size: pan.pan_size.max(lfn_count),
        routing_cost: 0,
        use_parent_bs_ie: false,
        routing_method: true,
        lfn_window_style: false,
        fan_tps_version: pan.fan_version,
    };
    write_nested_short(&mut wp, wp_ie_sub_id_short::PAN, &pan_ie.to_content());
    let netname = NetNameIe::new(&pan.network_name);
    write_nested_short(&mut wp, wp_ie_sub_id_short::NETNAME, &netname.to_content());
    if !pan.phy_op_modes.is_empty() {
        let pom = PomIe {
            phy_op_mode_ids: pan.phy_op_modes.clone(),
            mdr_command_capable: true,
        };
        write_nested_short(&mut wp, wp_ie_sub_id_short::POM, &pom.to_content());
    }

    build_mngt_frame(ws_frame_type::PA, pan, ie_custom, src_eui64, header_ies, wp, false)
}

/// Builds a PAN Configuration frame.
pub fn build_pc(
    pan: &PanInfo,
    cfg: &FhssConfig,
    ie_custom: &IeCustomList,
    src_eui64: &Eui64,
) -> MngtFrame {
    let mut header_ies = Vec::new();
    let utt = UttIe {
        frame_type_id: ws_frame_type::PC,
        ufsi: 0,
    };
    write_wh_ie(&mut header_ies, wh_ie_sub_id::UTT, &utt.to_content());
    let bt = BtIe {
        broadcast_slot_number: 0, // patched by the radio at transmit time
        broadcast_interval_offset_ms: 0,
    };
    write_wh_ie(&mut header_ies, wh_ie_sub_id::BT, &bt.to_content());

    let mut wp = Vec::new();
    write_nested_long(&mut wp, wp_ie_sub_id_long::US, &us_ie(cfg).to_content());
    let panver = PanVerIe {
        pan_version: pan.pan_version,
    };
    write_nested_short(&mut wp, wp_ie_sub_id_short::PANVER, &panver.to_content());
    let gtkhash = GtkHashIe {
        hashes: pan.gtk_hashes(),
    };
    write_nested_short(&mut wp, wp_ie_sub_id_short::GTKHASH, &gtkhash.to_content());

    build_mngt_frame(ws_frame_type::PC, pan, ie_custom, src_eui64, header_ies, wp, true)
}

/// Builds an LFN PAN Advertisement frame.
pub fn build_lpa(
    pan: &PanInfo,
    cfg: &FhssConfig,
    ie_custom: &IeCustomList,
    src_eui64: &Eui64,
) -> MngtFrame {
    let mut header_ies = Vec::new();
    let utt = UttIe {
        frame_type_id: ws_frame_type::LPA,
        ufsi: 0,
    };
    write_wh_ie(&mut header_ies, wh_ie_sub_id::UTT, &utt.to_content());

    let mut wp = Vec::new();
    write_nested_long(&mut wp, wp_ie_sub_id_long::US, &us_ie(cfg).to_content());
    let pan_ie = PanIe {
        pan_size: pan.pan_size,
        routing_cost: 0,
        use_parent_bs_ie: false,
        routing_method: true,
        lfn_window_style: true,
        fan_tps_version: pan.fan_version,
    };
    write_nested_short(&mut wp, wp_ie_sub_id_short::PAN, &pan_ie.to_content());
    let netname = NetNameIe::new(&pan.network_name);
    write_nested_short(&mut wp, wp_ie_sub_id_short::NETNAME, &netname.to_content());

    build_mngt_frame(ws_frame_type::LPA, pan, ie_custom, src_eui64, header_ies, wp, false)
}

/// Builds an LFN PAN Configuration frame.
pub fn build_lpc(
    pan: &PanInfo,
    cfg: &FhssConfig,
    ie_custom: &IeCustomList,
    src_eui64: &Eui64,
) -> MngtFrame {
    let mut header_ies = Vec::new();
    let utt = UttIe {
        frame_type_id: ws_frame_type::LPC,
        ufsi: 0,
    };
    write_wh_ie(&mut header_ies, wh_ie_sub_id::UTT, &utt.to_content());
    let lbt = LbtIe {
        slot_number: 0,
        interval_offset_ms: 0,
    };
    write_wh_ie(&mut header_ies, wh_ie_sub_id::LBT, &lbt.to_content());

    let mut wp = Vec::new();
    let mut lcp = vec![0]; // channel plan tag
    own_chan_info(cfg).write(&mut lcp);
    write_nested_long(&mut wp, wp_ie_sub_id_long::LCP, &lcp);
    let panver = PanVerIe {
        pan_version: pan.lfn_pan_version,
    };
    write_nested_short(&mut wp, wp_ie_sub_id_short::PANVER, &panver.to_content());

    build_mngt_frame(ws_frame_type::LPC, pan, ie_custom, src_eui64, header_ies, wp, true)
}

fn phy_mode_known(pan: &PanInfo, pom: Option<&PomIe>, phy_mode_id: u8) -> bool {
    if pan.phy_op_modes.contains(&phy_mode_id) {
        return true;
    }
    match pom {
        Some(pom) => pom.phy_op_mode_ids.contains(&phy_mode_id),
        None => false,
    }
}

/// Applies a mode switch setting to one link, or to the PAN default when
/// `eui64` is `None`.
pub fn set_mode_switch(
    pan: &mut PanInfo,
    neigh_table: &mut NeighTable,
    ms_mode: u8,
    phy_mode_id: u8,
    eui64: Option<&Eui64>,
) -> Result<()> {
    match eui64 {
        Some(eui64) => {
            let neigh = neigh_table
                .get_mut(eui64)
                .ok_or_else(|| Error::NotFound(format!("no neighbor {}", fmt_eui64(eui64))))?;
            if (ms_mode == mode_switch::PHY || ms_mode == mode_switch::MAC)
                && !pan.phy_op_modes.contains(&phy_mode_id)
                && !neigh.pom_ie.phy_op_mode_ids.contains(&phy_mode_id)
            {
                return Err(Error::InvalidArgument(format!(
                    "phy mode {} not advertised by {}",
                    phy_mode_id,
                    fmt_eui64(eui64)
                )));
            }
            neigh.ms_mode = ms_mode;
            neigh.ms_phy_mode_id = phy_mode_id;
        }
        None => {
            if (ms_mode == mode_switch::PHY || ms_mode == mode_switch::MAC)
                && !phy_mode_known(pan, None, phy_mode_id)
            {
                return Err(Error::InvalidArgument(format!(
                    "phy mode {} not in the PHY configuration",
                    phy_mode_id
                )));
            }
            pan.ms_mode = ms_mode;
            pan.ms_phy_mode_id = phy_mode_id;
            for neigh in neigh_table.iter_mut() {
                neigh.ms_mode = mode_switch::DEFAULT;
                neigh.ms_phy_mode_id = 0;
            }
        }
    }
    Ok(())
}

/// Applies an EDFE setting to one link, or to the PAN default when
/// `eui64` is `None`.
pub fn set_edfe(
    pan: &mut PanInfo,
    neigh_table: &mut NeighTable,
    edfe: u8,
    eui64: Option<&Eui64>,
) -> Result<()> {
    match eui64 {
        Some(eui64) => {
            let neigh = neigh_table
                .get_mut(eui64)
                .ok_or_else(|| Error::NotFound(format!("no neighbor {}", fmt_eui64(eui64))))?;
            neigh.edfe_mode = edfe;
        }
        None => {
            pan.edfe_mode = edfe;
            for neigh in neigh_table.iter_mut() {
                neigh.edfe_mode = edfe_mode::DEFAULT;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use wisunparse::{DataFrame, HeaderIeIter, NestedIeIter, PayloadIeIter};

    const BR: Eui64 = [2, 0, 0, 0, 0, 0, 0, 1];

    fn pan() -> PanInfo {
        PanInfo {
            pan_id: 0x1234,
            network_name: "TestPan".into(),
            pan_version: 7,
            ..Default::default()
        }
    }

    fn wp_sub_ids(frame: &[u8]) -> Vec<(u8, bool)> {
        let parsed = DataFrame::parse_ind(frame, 0x1234).unwrap();
        let mut sub_ids = Vec::new();
        for ie in PayloadIeIter::new(parsed.ie.payload) {
            let ie = ie.unwrap();
            if ie.id != payload_ie_id::WP {
                continue;
            }
            for nested in NestedIeIter::new(ie.content) {
                let nested = nested.unwrap();
                sub_ids.push((nested.sub_id, nested.long));
            }
        }
        sub_ids
    }

    #[test]
    fn pa_structure() {
        let built = build_pa(&pan(), &FhssConfig::default(), &IeCustomList::default(), &BR, 0);
        assert_eq!(ws_frame_type::PA, built.frame_type);

        let parsed = DataFrame::parse_ind(&built.frame, 0x1234).unwrap();
        assert_eq!(None, parsed.seq_number);
        assert_eq!(0x1234, parsed.src_pan_id);
        assert!(parsed.security.is_none());

        let header_ids: Vec<u8> = HeaderIeIter::new(parsed.ie.header)
            .map(|ie| ie.unwrap().wisun_sub_ie().unwrap().0)
            .collect();
        assert_eq!(vec![wh_ie_sub_id::UTT], header_ids);

        let subs = wp_sub_ids(&built.frame);
        assert!(subs.contains(&(wp_ie_sub_id_long::US, true)));
        assert!(subs.contains(&(wp_ie_sub_id_short::PAN, false)));
        assert!(subs.contains(&(wp_ie_sub_id_short::NETNAME, false)));
    }

    #[test]
    fn pc_structure() {
        let built = build_pc(&pan(), &FhssConfig::default(), &IeCustomList::default(), &BR);
        let parsed = DataFrame::parse_ind(&built.frame, 0x1234).unwrap();
        assert!(parsed.security.is_some());

        let header_ids: Vec<u8> = HeaderIeIter::new(parsed.ie.header)
            .map(|ie| ie.unwrap().wisun_sub_ie().unwrap().0)
            .collect();
        assert_eq!(vec![wh_ie_sub_id::UTT, wh_ie_sub_id::BT], header_ids);

        let subs = wp_sub_ids(&built.frame);
        assert!(subs.contains(&(wp_ie_sub_id_short::PANVER, false)));
        assert!(subs.contains(&(wp_ie_sub_id_short::GTKHASH, false)));
    }

    #[test]
    fn custom_ie_lands_in_pa_header() {
        use crate::ws::ie_list::IeType;
        let mut ie_custom = IeCustomList::default();
        ie_custom.update(
            IeType::Header,
            0x2a,
            b"hello",
            FrameTypeMask::PA | FrameTypeMask::PC,
        );
        let built = build_pa(&pan(), &FhssConfig::default(), &ie_custom, &BR, 0);
        let parsed = DataFrame::parse_ind(&built.frame, 0x1234).unwrap();
        let custom: Vec<_> = HeaderIeIter::new(parsed.ie.header)
            .map(|ie| ie.unwrap())
            .filter(|ie| ie.id == 0x2a)
            .collect();
        assert_eq!(1, custom.len());
        assert_eq!(b"hello", custom[0].content);

        // not selected for LPA
        let built = build_lpa(&pan(), &FhssConfig::default(), &ie_custom, &BR);
        let parsed = DataFrame::parse_ind(&built.frame, 0x1234).unwrap();
        assert!(!HeaderIeIter::new(parsed.ie.header)
            .map(|ie| ie.unwrap())
            .any(|ie| ie.id == 0x2a));
    }

    #[test]
    fn mode_switch_policy() {
        let mut pan = pan();
        pan.phy_op_modes.push(0x22);
        let mut table = NeighTable::new();
        let mac = [9, 0, 0, 0, 0, 0, 0, 9];
        table.add(&mac, None, 14, 0, 0);

        // PAN-wide default with a configured mode
        set_mode_switch(&mut pan, &mut table, mode_switch::PHY, 0x22, None).unwrap();
        assert_eq!(mode_switch::PHY, pan.ms_mode);

        // per-link with an unadvertised mode
        assert!(matches!(
            set_mode_switch(&mut pan, &mut table, mode_switch::PHY, 0x63, Some(&mac)),
            Err(Error::InvalidArgument(_))
        ));

        // per-link after the neighbor advertised the mode
        table
            .get_mut(&mac)
            .unwrap()
            .pom_ie
            .phy_op_mode_ids
            .push(0x63);
        set_mode_switch(&mut pan, &mut table, mode_switch::PHY, 0x63, Some(&mac)).unwrap();
        assert_eq!(0x63, table.get(&mac).unwrap().ms_phy_mode_id);

        // unknown neighbor
        assert!(matches!(
            set_mode_switch(&mut pan, &mut table, mode_switch::DISABLED, 0, Some(&[1; 8])),
            Err(Error::NotFound(_))
        ));

        // resetting the default clears per-link overrides
        set_mode_switch(&mut pan, &mut table, mode_switch::DEFAULT, 0, None).unwrap();
        assert_eq!(0, table.get(&mac).unwrap().ms_phy_mode_id);
    }

    #[test]
    fn edfe_policy() {
        let mut pan = pan();
        let mut table = NeighTable::new();
        let mac = [9, 0, 0, 0, 0, 0, 0, 9];
        table.add(&mac, None, 14, 0, 0);

        set_edfe(&mut pan, &mut table, edfe_mode::ENABLED, Some(&mac)).unwrap();
        assert_eq!(edfe_mode::ENABLED, table.get(&mac).unwrap().edfe_mode);
        set_edfe(&mut pan, &mut table, edfe_mode::DISABLED, None).unwrap();
        assert_eq!(edfe_mode::DEFAULT, table.get(&mac).unwrap().edfe_mode);
        assert_eq!(edfe_mode::DISABLED, pan.edfe_mode);
    }
}
