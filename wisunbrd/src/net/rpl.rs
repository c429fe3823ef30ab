//! View of the RPL root owned by the routing collaborator. The DODAG
//! algorithm itself lives outside the core; this state is read for the
//! routing graph and its counters bumped on operator request.

use log::debug;

use crate::net::ipv6::Ipv6Addr;

/// One transit (parent) of a target.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RplTransit {
    pub parent: Ipv6Addr,
}

/// One routing target (a downstream prefix).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RplTarget {
    pub prefix: Ipv6Addr,
    /// True when the target was injected from outside the PAN.
    pub external: bool,
    /// Up to PCS+1 parents; zeroed entries are unused.
    pub transits: Vec<RplTransit>,
}

/// The RPL root state.
#[derive(Clone, Debug)]
pub struct RplRoot {
    pub dodag_id: Ipv6Addr,
    /// Parent Candidate Set size (max transits per target is `pcs + 1`).
    pub pcs: u8,
    pub dtsn: u8,
    pub dodag_version: u8,
    pub targets: Vec<RplTarget>,
}

impl Default for RplRoot {
    fn default() -> RplRoot {
        RplRoot {
            dodag_id: [0; 16],
            pcs: 7,
            dtsn: 0,
            dodag_version: 0,
            targets: Vec::new(),
        }
    }
}

impl RplRoot {
    pub fn target_get(&self, prefix: &Ipv6Addr) -> Option<&RplTarget> {
        self.targets.iter().find(|target| target.prefix == *prefix)
    }

    /// Forces a DAO refresh from the whole DODAG.
    pub fn dtsn_inc(&mut self) {
        self.dtsn = self.dtsn.wrapping_add(1);
        debug!("rpl: dtsn increase ({})", self.dtsn);
    }

    /// Starts a new DODAG version (global repair).
    pub fn dodag_version_inc(&mut self) {
        self.dodag_version = self.dodag_version.wrapping_add(1);
        debug!("rpl: dodag version increase ({})", self.dodag_version);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counters_wrap() {
        let mut root = RplRoot {
            dtsn: 255,
            dodag_version: 255,
            ..Default::default()
        };
        root.dtsn_inc();
        root.dodag_version_inc();
        assert_eq!(0, root.dtsn);
        assert_eq!(0, root.dodag_version);
    }

    #[test]
    fn target_get() {
        let mut root = RplRoot::default();
        let prefix = [1; 16];
        root.targets.push(RplTarget {
            prefix,
            external: false,
            transits: vec![],
        });
        assert!(root.target_get(&prefix).is_some());
        assert!(root.target_get(&[2; 16]).is_none());
    }
}
