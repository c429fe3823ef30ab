//! PAN state: identifiers, version counters, network name, PHY
//! capabilities, and the GTK/LGTK key slots.

use arrayvec::ArrayVec;
use log::debug;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Group key slots (key indices 1..=4).
pub const GTK_NUM: usize = 4;

/// LFN group key slots (key indices 5..=7); the radio key table and the
/// per-neighbor frame counter table have 7 indexed slots in total.
pub const LGTK_NUM: usize = 3;

/// One installed group key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupKey {
    pub key: [u8; 16],
    /// Pushed to the radio on the next security update even if the slot
    /// was already occupied at startup.
    pub force_install: bool,
}

/// The PAN singleton owned by the PAN management layer.
#[derive(Clone, Debug)]
pub struct PanInfo {
    pub pan_id: u16,
    /// FAN major version advertised in PAN advertisements.
    pub fan_version: u8,
    /// Monotonic PAN version, incremented on IE reconfiguration.
    pub pan_version: u16,
    /// LFN PAN version.
    pub lfn_pan_version: u16,
    /// Network name, at most 32 bytes of UTF-8.
    pub network_name: String,
    pub pan_size: u16,
    /// Ordered PHY operating mode capabilities.
    pub phy_op_modes: ArrayVec<u8, 15>,
    pub phy_mode_id: u8,
    pub chan_plan_id: u8,
    /// PAN-wide mode switch default (see `ws::mngt`).
    pub ms_mode: u8,
    pub ms_phy_mode_id: u8,
    /// PAN-wide EDFE default.
    pub edfe_mode: u8,
    pub(crate) gtks: [Option<GroupKey>; GTK_NUM],
    pub(crate) lgtks: [Option<GroupKey>; LGTK_NUM],
}

impl Default for PanInfo {
    fn default() -> PanInfo {
        PanInfo {
            pan_id: 0xffff,
            fan_version: 1,
            pan_version: 0,
            lfn_pan_version: 0,
            network_name: String::new(),
            pan_size: 0,
            phy_op_modes: ArrayVec::new(),
            phy_mode_id: 0,
            chan_plan_id: 0,
            ms_mode: 0,
            ms_phy_mode_id: 0,
            edfe_mode: 0,
            gtks: [None; GTK_NUM],
            lgtks: [None; LGTK_NUM],
        }
    }
}

impl PanInfo {
    pub fn gtk(&self, slot: usize) -> Option<&GroupKey> {
        self.gtks[slot].as_ref()
    }

    pub fn lgtk(&self, slot: usize) -> Option<&GroupKey> {
        self.lgtks[slot].as_ref()
    }

    /// Key material of every GTK slot, zeros for empty slots (the wire
    /// shape of the `Gtks` property).
    pub fn gtk_keys(&self) -> [[u8; 16]; GTK_NUM] {
        let mut keys = [[0; 16]; GTK_NUM];
        for (out, slot) in keys.iter_mut().zip(self.gtks.iter()) {
            if let Some(group_key) = slot {
                *out = group_key.key;
            }
        }
        keys
    }

    /// Key material of every LGTK slot, zeros for empty slots.
    pub fn lgtk_keys(&self) -> [[u8; 16]; LGTK_NUM] {
        let mut keys = [[0; 16]; LGTK_NUM];
        for (out, slot) in keys.iter_mut().zip(self.lgtks.iter()) {
            if let Some(group_key) = slot {
                *out = group_key.key;
            }
        }
        keys
    }

    /// Installs a key in the first empty GTK slot, returning the RCP key
    /// index (1..=4).
    pub fn install_gtk(&mut self, key: [u8; 16]) -> Result<u8> {
        let slot = self
            .gtks
            .iter()
            .position(|slot| slot.is_none())
            .ok_or_else(|| Error::NotFound("no free GTK slot".into()))?;
        self.gtks[slot] = Some(GroupKey {
            key,
            force_install: true,
        });
        debug!("security: install GTK in slot {}", slot);
        Ok(slot as u8 + 1)
    }

    /// Installs a key in the first empty LGTK slot, returning the RCP key
    /// index (5..=7).
    pub fn install_lgtk(&mut self, key: [u8; 16]) -> Result<u8> {
        let slot = self
            .lgtks
            .iter()
            .position(|slot| slot.is_none())
            .ok_or_else(|| Error::NotFound("no free LGTK slot".into()))?;
        self.lgtks[slot] = Some(GroupKey {
            key,
            force_install: true,
        });
        debug!("security: install LGTK in slot {}", slot);
        Ok(slot as u8 + GTK_NUM as u8 + 1)
    }

    /// Replaces the newest installed slot during a revocation rollover
    /// (slot 0 when the table is empty), returning the RCP key index.
    pub fn rollover_gtk(&mut self, key: [u8; 16]) -> u8 {
        let slot = self
            .gtks
            .iter()
            .rposition(|slot| slot.is_some())
            .unwrap_or(0);
        self.gtks[slot] = Some(GroupKey {
            key,
            force_install: true,
        });
        debug!("security: revoke GTKs, roll over slot {}", slot);
        slot as u8 + 1
    }

    /// LGTK counterpart of [`PanInfo::rollover_gtk`].
    pub fn rollover_lgtk(&mut self, key: [u8; 16]) -> u8 {
        let slot = self
            .lgtks
            .iter()
            .rposition(|slot| slot.is_some())
            .unwrap_or(0);
        self.lgtks[slot] = Some(GroupKey {
            key,
            force_install: true,
        });
        debug!("security: revoke LGTKs, roll over slot {}", slot);
        slot as u8 + GTK_NUM as u8 + 1
    }

    /// 8-byte hash of each installed GTK for the GTKHASH-IE.
    pub fn gtk_hashes(&self) -> [[u8; 8]; GTK_NUM] {
        let mut hashes = [[0; 8]; GTK_NUM];
        for (out, slot) in hashes.iter_mut().zip(self.gtks.iter()) {
            if let Some(group_key) = slot {
                *out = gtk_hash(&group_key.key);
            }
        }
        hashes
    }
}

/// 8-byte truncated hash of a group key.
pub fn gtk_hash(gtk: &[u8; 16]) -> [u8; 8] {
    let digest = Sha256::digest(gtk);
    let mut hash = [0; 8];
    hash.copy_from_slice(&digest[..8]);
    hash
}

/// GAK derivation: SHA-256 of the network name concatenated with the GTK,
/// truncated to 16 bytes. Computed on demand, never cached.
pub fn gak_from_gtk(network_name: &str, gtk: &[u8; 16]) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(network_name.as_bytes());
    hasher.update(gtk);
    let digest = hasher.finalize();
    let mut gak = [0; 16];
    gak.copy_from_slice(&digest[..16]);
    gak
}
