//! End-to-end scenarios: frames in through a fake RCP, state out through
//! the control API.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use wisunbrd::app::{Config, Ctxt};
use wisunbrd::bus::Bus;
use wisunbrd::ctl::wire::{self, Request};
use wisunbrd::ctl::ControlService;
use wisunbrd::hif::{cmd, ApiVersion, FhssType, ModeSwitchType};
use wisunbrd::net::tun::MemTun;
use wisunbrd::rcp::{Rcp, RcpEvent, RxInd};
use wisunbrd::wire::{WireReader, WireWriter};

use wisunparse::{
    payload_ie_id, wh_ie_sub_id, wp_ie_sub_id_long, write_nested_long, write_payload_ie,
    write_wh_ie, Addr, ChannelFunction, ChannelPlan, DataFrame, DataRequest, ExcludedChannels,
    GenericChannelInfo, HeaderIeIter, SecurityLevel, UsIe, UttIe,
};

const PEER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
const BR: [u8; 8] = [0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11];

/// The radio end of the bus, for driving the host under test.
struct FakeRadio {
    bus: Bus,
}

impl FakeRadio {
    fn send_reset(&mut self, api: ApiVersion) {
        let mut writer = WireWriter::new();
        writer.push_u8(cmd::IND_RESET);
        writer.push_le32(api.0);
        writer.push_le32(ApiVersion::new(2, 3, 0).0);
        writer.push_str("fake-rcp");
        writer.push_data(&[0u8; 8]);
        self.bus.send_frame(writer.as_slice()).unwrap();
    }

    fn recv_cmd(&mut self) -> Option<(u8, Vec<u8>)> {
        self.bus.fill().unwrap();
        let payload = self.bus.next_frame()?;
        Some((payload[0], payload[1..].to_vec()))
    }
}

fn ctxt_pair(config: Config) -> (Ctxt, FakeRadio) {
    let (host, radio) = UnixStream::pair().unwrap();
    host.set_nonblocking(true).unwrap();
    radio.set_nonblocking(true).unwrap();
    let rcp = Rcp::new(Bus::new(Box::new(host)));
    let mut ctxt = Ctxt::new(config, rcp, Box::new(MemTun::default()), None);
    ctxt.rcp.eui64 = BR;
    (
        ctxt,
        FakeRadio {
            bus: Bus::new(Box::new(radio)),
        },
    )
}

fn config() -> Config {
    let dir = tempfile::tempdir().unwrap();
    Config {
        ws_pan_id: 0xabcd,
        ws_name: "TestPan".into(),
        storage_prefix: dir.into_path(),
        ..Default::default()
    }
}

fn negotiate(ctxt: &mut Ctxt, radio: &mut FakeRadio) {
    radio.send_reset(ApiVersion::new(2, 2, 0));
    for event in ctxt.rcp.receive().unwrap() {
        assert_eq!(RcpEvent::Reset, event);
    }
    // drain the host's reaction (set_host_api + radio_list)
    while radio.recv_cmd().is_some() {}
}

/// A secured data frame from the peer carrying a UTT-IE and a US-IE.
fn secured_frame_with_schedule(seq: u8) -> Vec<u8> {
    let mut header_ies = Vec::new();
    let utt = UttIe {
        frame_type_id: 4,
        ufsi: 0x000100,
    };
    write_wh_ie(&mut header_ies, wh_ie_sub_id::UTT, &utt.to_content());

    let us = UsIe {
        dwell_interval_ms: 255,
        clock_drift: 255,
        timing_accuracy: 10,
        chan_info: GenericChannelInfo {
            channel_plan: ChannelPlan::Two {
                regulatory_domain: wisunbrd::ws::regdb::reg_domain::EU,
                chan_plan_id: 32,
            },
            channel_function: ChannelFunction::Dh1Cf,
            excluded: ExcludedChannels::None,
        },
    };
    let mut wp = Vec::new();
    write_nested_long(&mut wp, wp_ie_sub_id_long::US, &us.to_content());
    let mut payload_ies = Vec::new();
    write_payload_ie(&mut payload_ies, payload_ie_id::WP, &wp);

    let chunks = [&payload_ies[..]];
    let req = DataRequest {
        ack_request: true,
        pan_id_suppressed: true,
        dst_addr: Addr::Ext(BR),
        security: Some((SecurityLevel::EncMic64, 1)),
        header_ies: Some(&header_ies),
        payload_ies: &chunks,
        ..Default::default()
    };
    let mut frame = Vec::new();
    req.write(&mut frame, &PEER, 0xabcd);
    // the radio sets the sequence number on the air
    frame[2] = seq;
    frame
}

fn rx(frame: Vec<u8>, timestamp_us: u64) -> RxInd {
    RxInd {
        frame,
        timestamp_us,
        rx_power_dbm: -70,
        lqi: 220,
        channel: 5,
    }
}

#[test]
fn unsupported_frame_leaves_no_state() {
    let (mut ctxt, _radio) = ctxt_pair(config());
    // 16-bit destination address: classified unsupported & dropped
    let bytes = vec![
        0x41, 0xd8, 0x10, 0xcd, 0xab, 0xff, 0xff, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
        0x07, 0x08,
    ];
    ctxt.on_rx_ind(&rx(bytes, 1_000));
    assert_eq!(0, ctxt.neigh_table.count());
}

#[test]
fn secured_frame_creates_and_schedules_neighbor() {
    let (mut ctxt, _radio) = ctxt_pair(config());
    ctxt.on_rx_ind(&rx(secured_frame_with_schedule(1), 1_000_000));

    assert_eq!(1, ctxt.neigh_table.count());
    let neigh = ctxt.neigh_table.get(&PEER).unwrap();
    assert_eq!(-70, neigh.rx_power_dbm);
    assert_eq!(220, neigh.lqi);
    assert_eq!(0x000100, neigh.fhss_data.ffn.ufsi);
    assert_eq!(0x000100, neigh.fhss_data_unsecured.ffn.ufsi);
    assert_eq!(69, neigh.fhss_data.uc_chan_count);
    assert!(wisunbrd::ws::neigh::has_us(&neigh.fhss_data_unsecured));
    assert!(neigh.unicast_data_rx);
    // frame counter floor moved past the received counter (0)
    assert_eq!(1, neigh.frame_counter_min[0]);
}

#[test]
fn unsecured_frame_from_unknown_is_ignored() {
    let (mut ctxt, _radio) = ctxt_pair(config());
    let req = DataRequest {
        pan_id_suppressed: true,
        dst_addr: Addr::Ext(BR),
        ..Default::default()
    };
    let mut frame = Vec::new();
    req.write(&mut frame, &PEER, 0xabcd);
    ctxt.on_rx_ind(&rx(frame, 1_000));
    assert_eq!(0, ctxt.neigh_table.count());
}

#[test]
fn duplicate_frame_dropped_inside_window() {
    let (mut ctxt, _radio) = ctxt_pair(config());
    ctxt.on_rx_ind(&rx(secured_frame_with_schedule(7), 1_000_000));
    ctxt.neigh_table.get_mut(&PEER).unwrap().lqi = i32::MAX;

    // same DSN 2 s later: dropped, quality untouched
    ctxt.on_rx_ind(&rx(secured_frame_with_schedule(7), 3_000_000));
    assert_eq!(i32::MAX, ctxt.neigh_table.get(&PEER).unwrap().lqi);

    // same DSN 6 s after the unicast reference: accepted again
    ctxt.on_rx_ind(&rx(secured_frame_with_schedule(7), 7_100_000));
    assert_eq!(220, ctxt.neigh_table.get(&PEER).unwrap().lqi);
}

#[test]
fn tx_without_schedule_aborts_locally() {
    let (mut ctxt, mut radio) = ctxt_pair(config());
    let now = ctxt.now_s();
    ctxt.neigh_table.add(&PEER, None, 14, 0, now);

    let req = wisunbrd::app::DataReqExt {
        dst: Some(PEER),
        fhss_type: FhssType::FfnUc,
        ack_request: true,
        security: Some((SecurityLevel::EncMic64, 1)),
        header_ies: None,
        payload_ies: &[],
        rate_list: None,
        ms_mode: ModeSwitchType::Phy,
    };
    ctxt.data_req_ext(&req).unwrap();
    // nothing reached the radio: the unicast schedule is unknown
    assert!(radio.recv_cmd().is_none());
}

#[test]
fn tx_with_schedule_reaches_radio() {
    let (mut ctxt, mut radio) = ctxt_pair(config());
    ctxt.on_rx_ind(&rx(secured_frame_with_schedule(1), 1_000_000));

    let req = wisunbrd::app::DataReqExt {
        dst: Some(PEER),
        fhss_type: FhssType::FfnUc,
        ack_request: true,
        security: Some((SecurityLevel::EncMic64, 1)),
        header_ies: None,
        payload_ies: &[],
        rate_list: None,
        ms_mode: ModeSwitchType::Phy,
    };
    ctxt.data_req_ext(&req).unwrap();
    let (id, params) = radio.recv_cmd().unwrap();
    assert_eq!(cmd::REQ_DATA_TX, id);
    let mut reader = WireReader::new(&params);
    let _handle = reader.pop_u8().unwrap();
    assert_eq!(FhssType::FfnUc as u8, reader.pop_u8().unwrap());
    let frame = reader.pop_counted().unwrap().to_vec();
    let parsed = DataFrame::parse_ind(&frame, 0xabcd).unwrap();
    assert_eq!(Addr::Ext(PEER), parsed.dst_addr);
    assert_eq!(Addr::Ext(BR), parsed.src_addr);
}

#[test]
fn version_gate_blocks_mode_switch() {
    let (mut ctxt, mut radio) = ctxt_pair(config());
    radio.send_reset(ApiVersion::new(2, 0, 0));
    ctxt.process_rcp().unwrap();
    assert_eq!(ApiVersion::new(2, 0, 0), ctxt.rcp.version_api);

    let mut args = WireWriter::new();
    args.push_counted(&[]);
    args.push_le32(0x22);
    args.push_u8(2); // PHY
    let request = Request::MethodCall {
        name: "SetLinkModeSwitch".into(),
        args: args.into_vec(),
    };
    let err = wisunbrd::ctl::api::dispatch(&mut ctxt, &request).unwrap_err();
    assert!(matches!(err, wisunbrd::Error::Unsupported(_)));
}

fn method_call(ctxt: &mut Ctxt, name: &str, args: WireWriter) -> wisunbrd::Result<Vec<u8>> {
    wisunbrd::ctl::api::dispatch(
        ctxt,
        &Request::MethodCall {
            name: name.into(),
            args: args.into_vec(),
        },
    )
}

fn get_property(ctxt: &mut Ctxt, name: &str) -> Vec<u8> {
    wisunbrd::ctl::api::dispatch(
        ctxt,
        &Request::GetProperty { name: name.into() },
    )
    .unwrap()
}

#[test]
fn install_then_revoke_group_keys() {
    let (mut ctxt, mut radio) = ctxt_pair(config());
    negotiate(&mut ctxt, &mut radio);

    let key = [0x11u8; 16];
    let mut args = WireWriter::new();
    args.push_counted(&key);
    method_call(&mut ctxt, "InstallGtk", args).unwrap();

    // the key reached slot 0 with force & the radio
    assert_eq!(key, ctxt.pan.gtk(0).unwrap().key);
    assert!(ctxt.pan.gtk(0).unwrap().force_install);
    let (id, params) = radio.recv_cmd().unwrap();
    assert_eq!(cmd::SET_SEC_KEY, id);
    let mut reader = WireReader::new(&params);
    assert_eq!(1, reader.pop_u8().unwrap());
    assert_eq!(key, reader.pop_fixed::<16>().unwrap());

    let gtks = get_property(&mut ctxt, "Gtks");
    let mut reader = WireReader::new(&gtks);
    assert_eq!(4, reader.pop_u8().unwrap());
    assert_eq!(key, reader.pop_fixed::<16>().unwrap());

    // revoke with a replacement key: same slot, PAN version +1
    let version_before = ctxt.pan.pan_version;
    let replacement = [0x22u8; 16];
    let mut args = WireWriter::new();
    args.push_counted(&replacement);
    args.push_counted(&[]);
    method_call(&mut ctxt, "RevokeGroupKeys", args).unwrap();

    assert_eq!(replacement, ctxt.pan.gtk(0).unwrap().key);
    assert_eq!(version_before + 1, ctxt.pan.pan_version);

    // a 10-byte key is rejected before any state moves
    let mut args = WireWriter::new();
    args.push_counted(&[0u8; 10]);
    args.push_counted(&[]);
    let err = method_call(&mut ctxt, "RevokeGroupKeys", args).unwrap_err();
    assert!(matches!(err, wisunbrd::Error::InvalidArgument(_)));
    assert_eq!(replacement, ctxt.pan.gtk(0).unwrap().key);
}

#[test]
fn gaks_derived_from_network_name() {
    let (mut ctxt, mut radio) = ctxt_pair(config());
    negotiate(&mut ctxt, &mut radio);
    let key = [0x33u8; 16];
    let mut args = WireWriter::new();
    args.push_counted(&key);
    method_call(&mut ctxt, "InstallGtk", args).unwrap();

    let gaks = get_property(&mut ctxt, "Gaks");
    let mut reader = WireReader::new(&gaks);
    assert_eq!(4, reader.pop_u8().unwrap());
    let gak = reader.pop_fixed::<16>().unwrap();
    assert_eq!(
        wisunbrd::ws::pan::gak_from_gtk("TestPan", &key),
        gak
    );
}

#[test]
fn custom_ie_reaches_next_pan_advert() {
    let (mut ctxt, _radio) = ctxt_pair(config());

    let version_before = ctxt.pan.pan_version;
    let mut args = WireWriter::new();
    args.push_u8(0); // header IE
    args.push_u8(0x2a);
    args.push_counted(b"hello");
    args.push_counted(&[0, 2]); // PA & PC
    method_call(&mut ctxt, "IeCustomInsert", args).unwrap();
    assert_eq!(version_before + 1, ctxt.pan.pan_version);

    let built = wisunbrd::ws::mngt::build_pa(
        &ctxt.pan,
        &ctxt.fhss_config,
        &ctxt.ie_custom,
        &ctxt.rcp.eui64,
        0,
    );
    let parsed = DataFrame::parse_ind(&built.frame, 0xabcd).unwrap();
    let ie = HeaderIeIter::new(parsed.ie.header)
        .map(|ie| ie.unwrap())
        .find(|ie| ie.id == 0x2a)
        .unwrap();
    assert_eq!(b"hello", ie.content);

    // an unknown frame type is rejected
    let mut args = WireWriter::new();
    args.push_u8(0);
    args.push_u8(0x2b);
    args.push_counted(b"x");
    args.push_counted(&[1]); // PAS cannot carry custom IEs
    let err = method_call(&mut ctxt, "IeCustomInsert", args).unwrap_err();
    assert!(matches!(err, wisunbrd::Error::InvalidArgument(_)));
}

#[test]
fn mac_filter_empty_list_inverts_polarity() {
    let (mut ctxt, mut radio) = ctxt_pair(config());
    negotiate(&mut ctxt, &mut radio);

    // non-empty allow list: allow = true on the wire
    let mut args = WireWriter::new();
    args.push_u8(1);
    args.push_data(&PEER);
    method_call(&mut ctxt, "AllowMac64", args).unwrap();
    let (id, params) = radio.recv_cmd().unwrap();
    assert_eq!(cmd::SET_FILTER_SRC64, id);
    let mut reader = WireReader::new(&params);
    assert!(reader.pop_bool().unwrap());
    assert_eq!(1, reader.pop_u8().unwrap());

    // empty allow list means "clear the filter": polarity inverted
    let mut args = WireWriter::new();
    args.push_u8(0);
    method_call(&mut ctxt, "AllowMac64", args).unwrap();
    let (_, params) = radio.recv_cmd().unwrap();
    let mut reader = WireReader::new(&params);
    assert!(!reader.pop_bool().unwrap());
    assert_eq!(0, reader.pop_u8().unwrap());

    // empty deny list likewise blocks nothing
    let mut args = WireWriter::new();
    args.push_u8(0);
    method_call(&mut ctxt, "DenyMac64", args).unwrap();
    let (_, params) = radio.recv_cmd().unwrap();
    let mut reader = WireReader::new(&params);
    assert!(reader.pop_bool().unwrap());
}

#[test]
fn routing_graph_property() {
    let (mut ctxt, _radio) = ctxt_pair(config());
    ctxt.tun = Box::new(MemTun {
        global_unicast: Some([0x20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]),
        groups: Vec::new(),
    });
    ctxt.rpl.targets.push(wisunbrd::net::rpl::RplTarget {
        prefix: [0x20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2],
        external: false,
        transits: vec![wisunbrd::net::rpl::RplTransit {
            parent: [0x20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        }],
    });

    let graph = get_property(&mut ctxt, "RoutingGraph");
    let mut reader = WireReader::new(&graph);
    assert_eq!(2, reader.pop_le16().unwrap());
    // BR row: the TUN global unicast, no parents
    let prefix = reader.pop_fixed::<16>().unwrap();
    assert_eq!(1, prefix[15]);
    assert!(!reader.pop_bool().unwrap());
    assert_eq!(0, reader.pop_u8().unwrap());
}

#[test]
fn nodes_property_starts_with_border_router() {
    let (mut ctxt, _radio) = ctxt_pair(config());
    let nodes = get_property(&mut ctxt, "Nodes");
    let mut reader = WireReader::new(&nodes);
    assert_eq!(1, reader.pop_le16().unwrap());
    assert_eq!(BR, reader.pop_fixed::<8>().unwrap());
    let dict_count = reader.pop_u8().unwrap();
    assert!(dict_count >= 3);
    // first dictionary key
    assert_eq!("is_border_router", reader.pop_str().unwrap());
}

#[test]
fn control_service_notifies_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("ctl.sock");
    let service = ControlService::bind(&socket_path).unwrap();

    let (mut ctxt, mut radio) = ctxt_pair(config());
    ctxt.ctl = Some(service);
    negotiate(&mut ctxt, &mut radio);

    let mut client = UnixStream::connect(&socket_path).unwrap();
    client
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();
    client
        .write_all(&wire::frame_message(&Request::encode_subscribe()))
        .unwrap();
    let mut args = WireWriter::new();
    args.push_counted(&[0x44u8; 16]);
    client
        .write_all(&wire::frame_message(&Request::encode_method_call(
            "InstallGtk",
            args.as_slice(),
        )))
        .unwrap();

    ctxt.process_ctl();

    // collect messages: the four key-property notifications, then the
    // method reply
    let mut rx = Vec::new();
    let mut messages = Vec::new();
    let mut chunk = [0u8; 1024];
    while messages.len() < 5 {
        let n = client.read(&mut chunk).unwrap();
        assert!(n > 0, "server closed early");
        rx.extend_from_slice(&chunk[..n]);
        while let Some(message) = wire::next_message(&mut rx) {
            messages.push(message);
        }
    }

    let changed: Vec<String> = messages
        .iter()
        .filter(|message| message[0] == wire::MSG_PROPERTY_CHANGED)
        .map(|message| {
            let mut reader = WireReader::new(&message[1..]);
            reader.pop_str().unwrap()
        })
        .collect();
    assert_eq!(vec!["Gtks", "Gaks", "Lgtks", "Lgaks"], changed);
    assert_eq!(wire::MSG_REPLY, messages.last().unwrap()[0]);

    // the installed key is visible over the same transport
    client
        .write_all(&wire::frame_message(&Request::encode_get_property("Gtks")))
        .unwrap();
    ctxt.process_ctl();
    let mut reply = Vec::new();
    loop {
        let n = client.read(&mut chunk).unwrap();
        rx.extend_from_slice(&chunk[..n]);
        if let Some(message) = wire::next_message(&mut rx) {
            reply = message;
            break;
        }
    }
    assert_eq!(wire::MSG_REPLY, reply[0]);
    let mut reader = WireReader::new(&reply[1..]);
    assert_eq!(4, reader.pop_u8().unwrap());
    assert_eq!([0x44u8; 16], reader.pop_fixed::<16>().unwrap());
}
