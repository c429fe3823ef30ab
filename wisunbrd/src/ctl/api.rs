//! Method dispatch & property encoding of the border router object.
//!
//! Method names, signatures and validation rules form the stable control
//! contract; the transport in [`super`] is replaceable.

use log::debug;

use wisunparse::NodeRole;

use crate::app::Ctxt;
use crate::error::{Error, Result};
use crate::hif::{API_EDFE, API_MODE_SWITCH};
use crate::net::route;
use crate::wire::{WireReader, WireWriter};
use crate::ws::ie_list::{FrameTypeMask, IeType};
use crate::ws::mngt::{self, edfe_mode, mode_switch};
use crate::ws::neigh::Eui64;
use crate::ws::pan::{gak_from_gtk, GTK_NUM, LGTK_NUM};
use crate::ctl::wire::Request;

/// Value tags of the dictionary entries in the `Nodes` property.
pub mod tag {
    pub const BOOL: u8 = 0;
    pub const U8: u8 = 1;
    pub const I32: u8 = 2;
    pub const U32: u8 = 3;
    pub const BYTES: u8 = 4;
    pub const STR: u8 = 5;
}

/// Handles one decoded request, returning the reply payload.
pub fn dispatch(ctxt: &mut Ctxt, request: &Request) -> Result<Vec<u8>> {
    match request {
        Request::MethodCall { name, args } => {
            debug!("control: method {}", name);
            method_call(ctxt, name, args)
        }
        Request::GetProperty { name } => get_property(ctxt, name),
        Request::Subscribe => Ok(Vec::new()),
    }
}

fn pop_eui64_arg(reader: &mut WireReader) -> Result<Option<Eui64>> {
    let bytes = reader.pop_counted()?;
    match bytes.len() {
        0 => Ok(None),
        8 => {
            let mut eui64 = [0; 8];
            eui64.copy_from_slice(bytes);
            // the all-ones broadcast address means "unspecified"
            if eui64 == wisunparse::Addr::BROADCAST_EUI64 {
                Ok(None)
            } else {
                Ok(Some(eui64))
            }
        }
        other => Err(Error::InvalidArgument(format!(
            "EUI-64 must be 0 or 8 bytes, got {}",
            other
        ))),
    }
}

fn pop_key_arg(reader: &mut WireReader) -> Result<Option<[u8; 16]>> {
    let bytes = reader.pop_counted()?;
    match bytes.len() {
        0 => Ok(None),
        16 => {
            let mut key = [0; 16];
            key.copy_from_slice(bytes);
            Ok(Some(key))
        }
        other => Err(Error::InvalidArgument(format!(
            "group key must be 0 or 16 bytes, got {}",
            other
        ))),
    }
}

fn pop_ipv6_arg(reader: &mut WireReader) -> Result<[u8; 16]> {
    let bytes = reader.pop_counted()?;
    if bytes.len() != 16 {
        return Err(Error::InvalidArgument(format!(
            "IPv6 address must be 16 bytes, got {}",
            bytes.len()
        )));
    }
    let mut addr = [0; 16];
    addr.copy_from_slice(bytes);
    Ok(addr)
}

fn pop_eui64_list(reader: &mut WireReader) -> Result<Vec<Eui64>> {
    let count = reader.pop_u8()? as usize;
    let mut list = Vec::with_capacity(count);
    for _ in 0..count {
        list.push(reader.pop_fixed::<8>()?);
    }
    Ok(list)
}

fn io_error(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(err.to_string())
    } else {
        Error::Transient(err.to_string())
    }
}

fn method_call(ctxt: &mut Ctxt, name: &str, args: &[u8]) -> Result<Vec<u8>> {
    let mut reader = WireReader::new(args);
    match name {
        "JoinMulticastGroup" => {
            let addr = pop_ipv6_arg(&mut reader)?;
            let ifname = ctxt.config.tun_dev.clone();
            ctxt.tun.join_mcast(&ifname, &addr).map_err(io_error)?;
            if !ctxt.mcast_groups.contains(&addr) {
                ctxt.mcast_groups.push(addr);
            }
            Ok(Vec::new())
        }
        "LeaveMulticastGroup" => {
            let addr = pop_ipv6_arg(&mut reader)?;
            let ifname = ctxt.config.tun_dev.clone();
            ctxt.tun.leave_mcast(&ifname, &addr).map_err(io_error)?;
            ctxt.mcast_groups.retain(|group| group != &addr);
            Ok(Vec::new())
        }
        "SetLinkModeSwitch" => {
            let (major, minor, patch) = API_MODE_SWITCH;
            if ctxt.rcp.version_api.older_than(major, minor, patch) {
                return Err(Error::Unsupported(format!(
                    "mode switch requires RCP API >= {}.{}.{}",
                    major, minor, patch
                )));
            }
            let eui64 = pop_eui64_arg(&mut reader)?;
            let phy_mode_id = reader.pop_le32()?;
            let ms_mode = reader.pop_u8()?;
            if ms_mode > mode_switch::MAC {
                return Err(Error::InvalidArgument("unknown mode switch mode".into()));
            }
            if ms_mode > mode_switch::DISABLED && phy_mode_id == 0 {
                return Err(Error::InvalidArgument(
                    "enabling mode switch requires a PHY mode".into(),
                ));
            }
            if ms_mode == mode_switch::DEFAULT && phy_mode_id != 0 {
                return Err(Error::InvalidArgument(
                    "resetting mode switch takes no PHY mode".into(),
                ));
            }
            if phy_mode_id > u8::MAX as u32 {
                return Err(Error::InvalidArgument("PHY mode out of range".into()));
            }
            mngt::set_mode_switch(
                &mut ctxt.pan,
                &mut ctxt.neigh_table,
                ms_mode,
                phy_mode_id as u8,
                eui64.as_ref(),
            )?;
            Ok(Vec::new())
        }
        "SetLinkEdfe" => {
            let eui64 = pop_eui64_arg(&mut reader)?;
            let edfe = reader.pop_u8()?;
            if edfe >= edfe_mode::MAX {
                return Err(Error::InvalidArgument("unknown EDFE mode".into()));
            }
            if edfe == edfe_mode::DEFAULT && eui64.is_none() {
                return Err(Error::InvalidArgument(
                    "resetting EDFE requires a specific link".into(),
                ));
            }
            if edfe == edfe_mode::ENABLED {
                let (major, minor, patch) = API_EDFE;
                if ctxt.rcp.version_api.older_than(major, minor, patch) {
                    return Err(Error::Unsupported(format!(
                        "EDFE requires RCP API >= {}.{}.{}",
                        major, minor, patch
                    )));
                }
            }
            mngt::set_edfe(&mut ctxt.pan, &mut ctxt.neigh_table, edfe, eui64.as_ref())?;
            Ok(Vec::new())
        }
        "RevokePairwiseKeys" => {
            let eui64 = pop_eui64_arg(&mut reader)?
                .ok_or_else(|| Error::InvalidArgument("an EUI-64 is required".into()))?;
            ctxt.storage.delete(&eui64)?;
            ctxt.emit_property_changed("Nodes");
            Ok(Vec::new())
        }
        "RevokeGroupKeys" => {
            let gtk = pop_key_arg(&mut reader)?;
            let lgtk = pop_key_arg(&mut reader)?;
            // both arguments validated before either table moves
            if let Some(gtk) = gtk {
                let key_index = ctxt.pan.rollover_gtk(gtk);
                ctxt.rcp.set_sec_key(key_index, &gtk, 0)?;
            }
            if let Some(lgtk) = lgtk {
                let key_index = ctxt.pan.rollover_lgtk(lgtk);
                ctxt.rcp.set_sec_key(key_index, &lgtk, 0)?;
            }
            mngt::pan_version_increase(&mut ctxt.pan);
            ctxt.emit_keys_changed();
            Ok(Vec::new())
        }
        "InstallGtk" => {
            let key = pop_key_arg(&mut reader)?
                .ok_or_else(|| Error::InvalidArgument("a 16-byte key is required".into()))?;
            let key_index = ctxt.pan.install_gtk(key)?;
            ctxt.rcp.set_sec_key(key_index, &key, 0)?;
            mngt::pan_version_increase(&mut ctxt.pan);
            ctxt.emit_keys_changed();
            Ok(Vec::new())
        }
        "InstallLgtk" => {
            let key = pop_key_arg(&mut reader)?
                .ok_or_else(|| Error::InvalidArgument("a 16-byte key is required".into()))?;
            let key_index = ctxt.pan.install_lgtk(key)?;
            ctxt.rcp.set_sec_key(key_index, &key, 0)?;
            mngt::lfn_pan_version_increase(&mut ctxt.pan);
            ctxt.emit_keys_changed();
            Ok(Vec::new())
        }
        "IeCustomInsert" => {
            let ie_type = IeType::from_u8(reader.pop_u8()?)?;
            let ie_id = reader.pop_u8()?;
            let content = reader.pop_counted()?.to_vec();
            let frame_types = reader.pop_counted()?.to_vec();
            let mask = FrameTypeMask::from_frame_types(&frame_types)?;
            ctxt.ie_custom.update(ie_type, ie_id, &content, mask);
            mngt::pan_version_increase(&mut ctxt.pan);
            Ok(Vec::new())
        }
        "IeCustomClear" => {
            ctxt.ie_custom.clear();
            mngt::pan_version_increase(&mut ctxt.pan);
            Ok(Vec::new())
        }
        "IncrementRplDtsn" => {
            ctxt.rpl.dtsn_inc();
            Ok(Vec::new())
        }
        "IncrementRplDodagVersionNumber" => {
            ctxt.rpl.dodag_version_inc();
            Ok(Vec::new())
        }
        "AllowMac64" => {
            let list = pop_eui64_list(&mut reader)?;
            set_filter_src64(ctxt, &list, true)
        }
        "DenyMac64" => {
            let list = pop_eui64_list(&mut reader)?;
            set_filter_src64(ctxt, &list, false)
        }
        other => Err(Error::NotFound(format!("unknown method {}", other))),
    }
}

fn set_filter_src64(ctxt: &mut Ctxt, list: &[Eui64], allow: bool) -> Result<Vec<u8>> {
    // When given an empty list, 'allow' must be reversed: the intent of
    // an empty AllowMac64 / DenyMac64 is "clear the current filter"
    let allow = if list.is_empty() { !allow } else { allow };
    ctxt.rcp.set_filter_src64(list, allow)?;
    Ok(Vec::new())
}

fn get_property(ctxt: &mut Ctxt, name: &str) -> Result<Vec<u8>> {
    let mut writer = WireWriter::new();
    match name {
        "Gtks" => {
            writer.push_u8(GTK_NUM as u8);
            for key in ctxt.pan.gtk_keys() {
                writer.push_data(&key);
            }
        }
        "Lgtks" => {
            writer.push_u8(LGTK_NUM as u8);
            for key in ctxt.pan.lgtk_keys() {
                writer.push_data(&key);
            }
        }
        "Gaks" => {
            writer.push_u8(GTK_NUM as u8);
            for key in ctxt.pan.gtk_keys() {
                writer.push_data(&gak_from_gtk(&ctxt.pan.network_name, &key));
            }
        }
        "Lgaks" => {
            writer.push_u8(LGTK_NUM as u8);
            for key in ctxt.pan.lgtk_keys() {
                writer.push_data(&gak_from_gtk(&ctxt.pan.network_name, &key));
            }
        }
        "Nodes" => encode_nodes(ctxt, &mut writer),
        "RoutingGraph" => encode_routing_graph(ctxt, &mut writer),
        "HwAddress" => writer.push_data(&ctxt.rcp.eui64),
        "WisunNetworkName" => writer.push_str(&ctxt.pan.network_name),
        "WisunSize" => writer.push_str(&ctxt.config.ws_size),
        "WisunDomain" => writer.push_str(domain_name(ctxt.fhss_config.reg_domain)),
        "WisunMode" => writer.push_le32(ctxt.config.ws_mode),
        "WisunClass" => writer.push_le32(ctxt.fhss_config.op_class as u32),
        "WisunPhyModeId" => writer.push_le32(ctxt.pan.phy_mode_id as u32),
        "WisunChanPlanId" => writer.push_le32(ctxt.fhss_config.chan_plan_id as u32),
        "WisunPanId" => writer.push_le16(ctxt.pan.pan_id),
        "WisunFanVersion" => writer.push_u8(ctxt.pan.fan_version),
        other => return Err(Error::NotFound(format!("unknown property {}", other))),
    }
    Ok(writer.into_vec())
}

fn domain_name(reg_domain: u8) -> &'static str {
    use crate::ws::regdb::reg_domain::*;
    match reg_domain {
        WW => "WW",
        NA => "NA",
        JP => "JP",
        EU => "EU",
        CN => "CN",
        IN => "IN",
        BZ => "BZ",
        KR => "KR",
        _ => "[unknown]",
    }
}

struct NodeDict {
    writer: WireWriter,
    count: u8,
}

impl NodeDict {
    fn new() -> NodeDict {
        NodeDict {
            writer: WireWriter::new(),
            count: 0,
        }
    }

    fn push_bool(&mut self, key: &str, value: bool) {
        self.writer.push_str(key);
        self.writer.push_u8(tag::BOOL);
        self.writer.push_bool(value);
        self.count += 1;
    }

    fn push_u8(&mut self, key: &str, value: u8) {
        self.writer.push_str(key);
        self.writer.push_u8(tag::U8);
        self.writer.push_u8(value);
        self.count += 1;
    }

    fn push_i32(&mut self, key: &str, value: i32) {
        self.writer.push_str(key);
        self.writer.push_u8(tag::I32);
        self.writer.push_le32(value as u32);
        self.count += 1;
    }

    fn push_bytes(&mut self, key: &str, value: &[u8]) {
        self.writer.push_str(key);
        self.writer.push_u8(tag::BYTES);
        self.writer.push_counted(value);
        self.count += 1;
    }

    fn finish(self, writer: &mut WireWriter, eui64: &Eui64) {
        writer.push_data(eui64);
        writer.push_u8(self.count);
        writer.push_data(self.writer.as_slice());
    }
}

fn node_neighbor_info(dict: &mut NodeDict, neigh: &crate::ws::neigh::Neigh) {
    dict.push_bool("is_neighbor", true);
    // secured measurements win over unsecured ones; sentinel values omit
    // the key entirely
    if neigh.rx_power_dbm != i32::MAX {
        dict.push_u8("rssi", (neigh.rx_power_dbm + 174) as u8);
    } else if neigh.rx_power_dbm_unsecured != i32::MAX {
        dict.push_u8("rssi", (neigh.rx_power_dbm_unsecured + 174) as u8);
    }
    if !neigh.rsl_in_dbm.is_nan() {
        dict.push_i32("rsl", neigh.rsl_in_dbm as i32);
    } else if !neigh.rsl_in_dbm_unsecured.is_nan() {
        dict.push_i32("rsl", neigh.rsl_in_dbm_unsecured as i32);
    }
    if !neigh.rsl_out_dbm.is_nan() {
        dict.push_i32("rsl_adv", neigh.rsl_out_dbm as i32);
    }
    if neigh.lqi != i32::MAX {
        dict.push_u8("lqi", neigh.lqi as u8);
    } else if neigh.lqi_unsecured != i32::MAX {
        dict.push_u8("lqi", neigh.lqi_unsecured as u8);
    }
    dict.push_bytes("pom", &neigh.pom_ie.phy_op_mode_ids);
    dict.push_bool("mdr_cmd_capable", neigh.pom_ie.mdr_command_capable);
}

fn encode_nodes(ctxt: &Ctxt, writer: &mut WireWriter) {
    let supplicants = ctxt.storage.list();
    let mut body = WireWriter::new();
    let mut count: u16 = 0;

    // the border router itself comes first
    let mut dict = NodeDict::new();
    dict.push_bool("is_border_router", true);
    dict.push_u8("node_role", NodeRole::Br as u8);
    dict.push_bool("is_neighbor", true);
    dict.push_bytes("pom", &ctxt.pan.phy_op_modes);
    dict.push_bool("mdr_cmd_capable", true);
    dict.finish(&mut body, &ctxt.rcp.eui64);
    count += 1;

    for eui64 in supplicants {
        let mut dict = NodeDict::new();
        if let Ok(record) = ctxt.storage.read(&eui64) {
            dict.push_bool("is_authenticated", true);
            if let Some(role) = record.node_role {
                if NodeRole::from_ie(role).is_some() {
                    dict.push_u8("node_role", role);
                }
            }
        }
        if let Some(neigh) = ctxt.neigh_table.get(&eui64) {
            node_neighbor_info(&mut dict, neigh);
        }
        dict.finish(&mut body, &eui64);
        count += 1;
    }

    writer.push_le16(count);
    writer.push_data(body.as_slice());
}

fn encode_routing_graph(ctxt: &Ctxt, writer: &mut WireWriter) {
    let tun_addr = ctxt.tun.addr_get_global_unicast(&ctxt.config.tun_dev);
    let graph = route::build_routing_graph(tun_addr, &ctxt.rpl, &ctxt.nd_cache, &ctxt.neigh_table);
    writer.push_le16(graph.len() as u16);
    for entry in graph {
        writer.push_data(&entry.prefix);
        writer.push_bool(entry.external);
        writer.push_u8(entry.parents.len() as u8);
        for parent in entry.parents {
            writer.push_data(&parent);
        }
    }
}
