//! Routing-graph assembly for the control API: the border router itself,
//! every RPL target, and the rank-1 LFNs known only through their address
//! registrations.

use wisunparse::NodeRole;

use crate::net::ipv6::{self, Ipv6Addr, NdCache};
use crate::net::rpl::RplRoot;
use crate::ws::neigh::NeighTable;

/// One row of the `RoutingGraph` property.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteEntry {
    pub prefix: Ipv6Addr,
    pub external: bool,
    pub parents: Vec<Ipv6Addr>,
}

fn target_parents(transits: &[crate::net::rpl::RplTransit], pcs: u8) -> Vec<Ipv6Addr> {
    let mut parents: Vec<Ipv6Addr> = Vec::new();
    for transit in transits.iter().take(pcs as usize + 1) {
        if transit.parent == [0; 16] {
            continue;
        }
        if parents.contains(&transit.parent) {
            continue;
        }
        parents.push(transit.parent);
    }
    parents
}

/// Builds the routing graph rows.
///
/// LFNs at rank 1 are not RPL targets (they are not routed by RPL); they
/// are exposed through their IPv6 address registration instead, with the
/// DODAG root as single parent.
pub fn build_routing_graph(
    tun_global_unicast: Option<Ipv6Addr>,
    rpl: &RplRoot,
    nd_cache: &NdCache,
    neigh_table: &NeighTable,
) -> Vec<RouteEntry> {
    let mut graph = Vec::new();

    graph.push(RouteEntry {
        prefix: tun_global_unicast.unwrap_or([0; 16]),
        external: false,
        parents: Vec::new(),
    });

    for target in &rpl.targets {
        graph.push(RouteEntry {
            prefix: target.prefix,
            external: target.external,
            parents: target_parents(&target.transits, rpl.pcs),
        });
    }

    for entry in nd_cache.iter() {
        if ipv6::is_multicast(&entry.ipv6) || ipv6::is_link_local(&entry.ipv6) {
            continue;
        }
        if rpl.target_get(&entry.ipv6).is_some() {
            continue;
        }
        match neigh_table.get(&entry.eui64) {
            Some(neigh) if neigh.node_role == Some(NodeRole::Lfn) => (),
            _ => continue,
        }
        graph.push(RouteEntry {
            prefix: entry.ipv6,
            external: true,
            parents: vec![rpl.dodag_id],
        });
    }

    graph
}
