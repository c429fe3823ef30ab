//! Contracts towards the networking collaborators: the TUN device, the
//! RPL root and the IPv6 neighbor discovery cache, plus the routing-graph
//! assembly built on top of them.

pub mod ipv6;
pub mod route;
pub mod rpl;
pub mod tun;
