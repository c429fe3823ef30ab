//! Contract towards the TUN device collaborator. The core never owns the
//! TUN file descriptor; it only asks for multicast membership changes and
//! the interface's global unicast address.

use std::io;

use crate::net::ipv6::Ipv6Addr;

pub trait TunCollab {
    /// Joins an IPv6 multicast group on the interface.
    fn join_mcast(&mut self, ifname: &str, addr: &Ipv6Addr) -> io::Result<()>;

    /// Leaves an IPv6 multicast group on the interface.
    fn leave_mcast(&mut self, ifname: &str, addr: &Ipv6Addr) -> io::Result<()>;

    /// The interface's global unicast address, when one is configured.
    fn addr_get_global_unicast(&self, ifname: &str) -> Option<Ipv6Addr>;
}

/// In-memory stand-in used in tests and when running without a TUN
/// collaborator.
#[derive(Clone, Debug, Default)]
pub struct MemTun {
    pub global_unicast: Option<Ipv6Addr>,
    pub groups: Vec<Ipv6Addr>,
}

impl TunCollab for MemTun {
    fn join_mcast(&mut self, _ifname: &str, addr: &Ipv6Addr) -> io::Result<()> {
        if !self.groups.contains(addr) {
            self.groups.push(*addr);
        }
        Ok(())
    }

    fn leave_mcast(&mut self, _ifname: &str, addr: &Ipv6Addr) -> io::Result<()> {
        if !self.groups.contains(addr) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "not a member of the group",
            ));
        }
        self.groups.retain(|group| group != addr);
        Ok(())
    }

    fn addr_get_global_unicast(&self, _ifname: &str) -> Option<Ipv6Addr> {
        self.global_unicast
    }
}
