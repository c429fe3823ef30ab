//! Wi-SUN specific state: neighbor table & FHSS timing, regulatory
//! database, PAN state and PAN management.

pub mod ie_list;
pub mod mngt;
pub mod neigh;
pub mod pan;
pub mod regdb;

use crate::hif::Regulation;
use regdb::{chan_mask, ChanParams};

/// The FHSS configuration of the interface, derived from the static
/// configuration at startup and never modified afterwards.
#[derive(Clone, Debug)]
pub struct FhssConfig {
    pub regulation: Regulation,
    pub reg_domain: u8,
    /// FAN 1.0 operating class (0 when addressing by plan ID).
    pub op_class: u8,
    /// FAN 1.1 channel plan ID (0 when addressing by class).
    pub chan_plan_id: u8,
    /// Operator-restricted channel mask, all-ones when unrestricted.
    pub chan_mask_custom: [u8; 32],
    pub uc_dwell_interval_ms: u8,
    pub bc_dwell_interval_ms: u8,
    pub bc_interval_ms: u32,
    pub lfn_bc_interval_ms: u32,
    pub lfn_bc_sync_period: u8,
    /// Broadcast Schedule Identifier.
    pub bsi: u16,
    pub async_frag_duration_ms: u32,
}

impl Default for FhssConfig {
    fn default() -> FhssConfig {
        FhssConfig {
            regulation: Regulation::None,
            reg_domain: regdb::reg_domain::EU,
            op_class: 0,
            chan_plan_id: 32,
            chan_mask_custom: [0xff; 32],
            uc_dwell_interval_ms: 255,
            bc_dwell_interval_ms: 255,
            bc_interval_ms: 1020,
            lfn_bc_interval_ms: 60_000,
            lfn_bc_sync_period: 5,
            bsi: 0,
            async_frag_duration_ms: 500,
        }
    }
}

impl FhssConfig {
    /// Resolves the interface's own channel plan.
    pub fn chan_params(&self) -> Option<&'static ChanParams> {
        regdb::chan_params(self.reg_domain, self.chan_plan_id, self.op_class)
    }

    /// The interface's own allowed channel mask & count.
    pub fn chan_mask(&self) -> ([u8; 32], u16) {
        let params = self.chan_params();
        let count = params.map(|params| params.chan_count).unwrap_or(0);
        let mut mask = regdb::generate_channel_mask(count, params, self.regulation);
        for (byte, custom) in mask.iter_mut().zip(self.chan_mask_custom.iter()) {
            *byte &= custom;
        }
        (mask, chan_mask::popcount(&mask))
    }
}
