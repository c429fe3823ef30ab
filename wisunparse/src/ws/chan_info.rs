use crate::err::ws::IeError;
use crate::err::{Layer, LenError};
use crate::ws::{read_u24_le, write_u24_le};

// Wi-SUN FAN channel information header byte
const CHAN_PLAN_MASK: u8 = 0b0000_0111;
const CHAN_FUNC_MASK: u8 = 0b0011_1000;
const CHAN_FUNC_SHIFT: u8 = 3;
const EXC_CHAN_CTRL_MASK: u8 = 0b1100_0000;
const EXC_CHAN_CTRL_SHIFT: u8 = 6;

/// Channel plan of a Wi-SUN schedule: how the channel set is named.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelPlan {
    /// Plan 0: regulatory domain & operating class.
    Zero {
        regulatory_domain: u8,
        operating_class: u8,
    },
    /// Plan 1: explicit first channel frequency, spacing & count.
    One {
        /// First channel center frequency in kHz.
        chan0_freq_khz: u32,
        /// Channel spacing code (0: 100 kHz, 1: 200 kHz, 2: 400 kHz,
        /// 3: 600 kHz, 4: 250 kHz, 5: 800 kHz, 6: 1200 kHz).
        chan_spacing: u8,
        /// Number of channels.
        chan_count: u16,
    },
    /// Plan 2: regulatory domain & channel plan ID.
    Two {
        regulatory_domain: u8,
        chan_plan_id: u8,
    },
}

impl ChannelPlan {
    fn plan_value(&self) -> u8 {
        match self {
            ChannelPlan::Zero { .. } => 0,
            ChannelPlan::One { .. } => 1,
            ChannelPlan::Two { .. } => 2,
        }
    }
}

/// Channel function of a Wi-SUN schedule: how the channel sequence is
/// derived.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelFunction {
    /// Single fixed channel.
    Fixed {
        chan: u16,
    },
    /// TR51 channel function.
    Tr51Cf,
    /// Direct hash channel function.
    Dh1Cf,
    /// Vendor defined channel function.
    VendorDefined,
}

impl ChannelFunction {
    fn function_value(&self) -> u8 {
        match self {
            ChannelFunction::Fixed { .. } => 0,
            ChannelFunction::Tr51Cf => 1,
            ChannelFunction::Dh1Cf => 2,
            ChannelFunction::VendorDefined => 3,
        }
    }
}

/// Excluded channels of a Wi-SUN schedule.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExcludedChannels {
    /// No channels excluded.
    None,
    /// Excluded channel ranges, inclusive on both ends.
    Range(Vec<(u16, u16)>),
    /// Excluded channel bitmask; a set bit excludes the channel.
    Mask(Vec<u8>),
}

impl ExcludedChannels {
    fn ctrl_value(&self) -> u8 {
        match self {
            ExcludedChannels::None => 0,
            ExcludedChannels::Range(_) => 1,
            ExcludedChannels::Mask(_) => 2,
        }
    }
}

/// The channel information block shared by the US-IE and BS-IE schedules.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenericChannelInfo {
    /// How the channel set is named.
    pub channel_plan: ChannelPlan,
    /// How the channel sequence is derived.
    pub channel_function: ChannelFunction,
    /// Channels removed from the set.
    pub excluded: ExcludedChannels,
}

fn len_error(required: usize, len: usize, offset: usize) -> IeError {
    LenError {
        required_len: required,
        len,
        layer: Layer::ChannelInfo,
        layer_start_offset: offset,
    }
    .into()
}

impl GenericChannelInfo {
    /// Reads a channel information block; it occupies the remainder of the
    /// enclosing schedule IE (the excluded channel mask runs to the end).
    pub fn from_slice(slice: &[u8]) -> Result<GenericChannelInfo, IeError> {
        if slice.is_empty() {
            return Err(len_error(1, 0, 0));
        }
        let plan = slice[0] & CHAN_PLAN_MASK;
        let function = (slice[0] & CHAN_FUNC_MASK) >> CHAN_FUNC_SHIFT;
        let exc_ctrl = (slice[0] & EXC_CHAN_CTRL_MASK) >> EXC_CHAN_CTRL_SHIFT;
        let mut rest = &slice[1..];
        let mut offset = 1;

        let channel_plan = match plan {
            0 => {
                if rest.len() < 2 {
                    return Err(len_error(2, rest.len(), offset));
                }
                let plan = ChannelPlan::Zero {
                    regulatory_domain: rest[0],
                    operating_class: rest[1],
                };
                rest = &rest[2..];
                offset += 2;
                plan
            }
            1 => {
                if rest.len() < 6 {
                    return Err(len_error(6, rest.len(), offset));
                }
                let plan = ChannelPlan::One {
                    chan0_freq_khz: read_u24_le(rest),
                    chan_spacing: rest[3],
                    chan_count: u16::from_le_bytes([rest[4], rest[5]]),
                };
                rest = &rest[6..];
                offset += 6;
                plan
            }
            2 => {
                if rest.len() < 2 {
                    return Err(len_error(2, rest.len(), offset));
                }
                let plan = ChannelPlan::Two {
                    regulatory_domain: rest[0],
                    chan_plan_id: rest[1],
                };
                rest = &rest[2..];
                offset += 2;
                plan
            }
            other => return Err(IeError::UnknownChannelPlan { channel_plan: other }),
        };

        let channel_function = match function {
            0 => {
                if rest.len() < 2 {
                    return Err(len_error(2, rest.len(), offset));
                }
                let func = ChannelFunction::Fixed {
                    chan: u16::from_le_bytes([rest[0], rest[1]]),
                };
                rest = &rest[2..];
                offset += 2;
                func
            }
            1 => ChannelFunction::Tr51Cf,
            2 => ChannelFunction::Dh1Cf,
            3 => ChannelFunction::VendorDefined,
            other => {
                return Err(IeError::UnknownChannelFunction {
                    channel_function: other,
                })
            }
        };

        let excluded = match exc_ctrl {
            0 => ExcludedChannels::None,
            1 => {
                if rest.is_empty() {
                    return Err(len_error(1, 0, offset));
                }
                let count = rest[0] as usize;
                rest = &rest[1..];
                offset += 1;
                if rest.len() < count * 4 {
                    return Err(len_error(count * 4, rest.len(), offset));
                }
                let mut ranges = Vec::with_capacity(count);
                for chunk in rest[..count * 4].chunks_exact(4) {
                    ranges.push((
                        u16::from_le_bytes([chunk[0], chunk[1]]),
                        u16::from_le_bytes([chunk[2], chunk[3]]),
                    ));
                }
                ExcludedChannels::Range(ranges)
            }
            2 => ExcludedChannels::Mask(rest.to_vec()),
            other => {
                return Err(IeError::UnknownExcludedChannelCtrl {
                    excluded_channel_ctrl: other,
                })
            }
        };

        Ok(GenericChannelInfo {
            channel_plan,
            channel_function,
            excluded,
        })
    }

    /// Appends the channel information block to a schedule IE content.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.push(
            self.channel_plan.plan_value()
                | (self.channel_function.function_value() << CHAN_FUNC_SHIFT)
                | (self.excluded.ctrl_value() << EXC_CHAN_CTRL_SHIFT),
        );
        match &self.channel_plan {
            ChannelPlan::Zero {
                regulatory_domain,
                operating_class,
            } => {
                buf.push(*regulatory_domain);
                buf.push(*operating_class);
            }
            ChannelPlan::One {
                chan0_freq_khz,
                chan_spacing,
                chan_count,
            } => {
                write_u24_le(buf, *chan0_freq_khz);
                buf.push(*chan_spacing);
                buf.extend_from_slice(&chan_count.to_le_bytes());
            }
            ChannelPlan::Two {
                regulatory_domain,
                chan_plan_id,
            } => {
                buf.push(*regulatory_domain);
                buf.push(*chan_plan_id);
            }
        }
        if let ChannelFunction::Fixed { chan } = self.channel_function {
            buf.extend_from_slice(&chan.to_le_bytes());
        }
        match &self.excluded {
            ExcludedChannels::None => (),
            ExcludedChannels::Range(ranges) => {
                buf.push(ranges.len() as u8);
                for (start, end) in ranges {
                    buf.extend_from_slice(&start.to_le_bytes());
                    buf.extend_from_slice(&end.to_le_bytes());
                }
            }
            ExcludedChannels::Mask(mask) => buf.extend_from_slice(mask),
        }
    }
}
