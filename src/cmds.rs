//! Flagging commands and the decisions they are built from.
//!
//! The two heuristic stages produce [`ChunkFlag`] decisions that only make
//! sense within one (field, spw, polarisation) selection. Stamping a
//! decision with the selection key turns it into a [`FlagCmd`], the
//! normalized unit handed to the external apply-flags step. Commands are
//! immutable once created and cheap to re-derive, so nothing here mutates
//! or deletes them after emission.

use std::fmt::{Display, Formatter};

/// Why a command was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagReason {
    /// An antenna is responsible for the outliers.
    BadAntenna,
    /// A specific baseline is responsible, and neither of its antennas is
    /// bad on its own.
    BadBaseline,
    /// A whole integration went bad across the array.
    BadTimestamp,
}

impl Display for FlagReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadAntenna => write!(f, "bad antenna"),
            Self::BadBaseline => write!(f, "bad baseline"),
            Self::BadTimestamp => write!(f, "bad timestamp"),
        }
    }
}

/// What a command applies to: one antenna, or one baseline. Commands with
/// no scope apply to the whole array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagScope {
    /// All baselines involving this antenna.
    Antenna(usize),
    /// The single baseline between these two antennas.
    Baseline(usize, usize),
}

impl Display for FlagScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Antenna(ant) => write!(f, "{}", ant),
            Self::Baseline(ant1, ant2) => write!(f, "{}&{}", ant1, ant2),
        }
    }
}

/// A flagging decision local to one (field, spw, polarisation) selection,
/// before it is stamped with that selection's identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChunkFlag {
    /// Flag one antenna at a single timestamp.
    AntennaAtTime {
        /// The antenna to flag.
        ant: usize,
        /// The timestamp it went bad at.
        time: f64,
    },
    /// Flag the whole array at a single timestamp.
    Timestamp {
        /// The timestamp to flag.
        time: f64,
    },
    /// Flag one antenna at all timestamps.
    Antenna {
        /// The antenna to flag.
        ant: usize,
    },
    /// Flag one baseline at all timestamps.
    Baseline {
        /// First antenna of the baseline.
        ant1: usize,
        /// Second antenna of the baseline.
        ant2: usize,
    },
}

impl ChunkFlag {
    /// Stamp this decision with its selection key, producing the command
    /// the external flagging interface consumes.
    pub fn into_cmd(
        self,
        filename: &str,
        field: &str,
        spw: usize,
        pol: usize,
        intent: &str,
    ) -> FlagCmd {
        let (antenna, time, reason) = match self {
            Self::AntennaAtTime { ant, time } => {
                (Some(FlagScope::Antenna(ant)), Some(time), FlagReason::BadAntenna)
            }
            Self::Timestamp { time } => (None, Some(time), FlagReason::BadTimestamp),
            Self::Antenna { ant } => (Some(FlagScope::Antenna(ant)), None, FlagReason::BadAntenna),
            Self::Baseline { ant1, ant2 } => (
                Some(FlagScope::Baseline(ant1, ant2)),
                None,
                FlagReason::BadBaseline,
            ),
        };
        FlagCmd {
            filename: filename.to_string(),
            spw,
            antenna,
            intent: intent.to_string(),
            pol,
            time,
            field: field.to_string(),
            reason,
        }
    }
}

/// One normalized flagging command.
///
/// `time` present means the command applies only to that timestamp;
/// absent, to all timestamps. `antenna` absent means the whole array.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagCmd {
    /// Name of the dataset the command belongs to.
    pub filename: String,
    /// Spectral window the command applies to.
    pub spw: usize,
    /// Antenna or baseline scope; `None` flags the whole array.
    pub antenna: Option<FlagScope>,
    /// Scan intent the flagged data matches.
    pub intent: String,
    /// Polarisation (correlation product) the command applies to.
    pub pol: usize,
    /// Timestamp the command applies to, seconds; `None` means all.
    pub time: Option<f64>,
    /// Field the command applies to.
    pub field: String,
    /// Why the command was raised.
    pub reason: FlagReason,
}

impl FlagCmd {
    /// Render the flagdata-style data selection for this command.
    ///
    /// The timestamp is rendered in epoch seconds; converting it to the
    /// applier's timerange syntax is the applier's concern.
    pub fn command(&self) -> String {
        let mut out = format!("field='{}' spw='{}'", self.field, self.spw);
        if let Some(scope) = &self.antenna {
            out.push_str(&format!(" antenna='{}'", scope));
        }
        if let Some(time) = self.time {
            out.push_str(&format!(" time='{:.3}'", time));
        }
        out.push_str(&format!(
            " correlation='{}' intent='*{}*' reason='{}'",
            self.pol, self.intent, self.reason
        ));
        out
    }
}

impl Display for FlagCmd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// Drop time-scoped antenna decisions that are covered by a whole-time
/// decision for the same antenna from the same selection.
///
/// The two stages run independently, so a bad moment of an antenna that
/// later turns out bad at all timestamps would otherwise be flagged twice.
/// Decisions from other selections are never consolidated against; flags
/// are always scoped by (field, spw, pol) and duplicates across those keys
/// are legitimate.
pub(crate) fn consolidate_chunk_flags(flags: Vec<ChunkFlag>) -> Vec<ChunkFlag> {
    let whole_time_ants: Vec<usize> = flags
        .iter()
        .filter_map(|flag| match flag {
            ChunkFlag::Antenna { ant } => Some(*ant),
            _ => None,
        })
        .collect();
    if whole_time_ants.is_empty() {
        return flags;
    }
    flags
        .into_iter()
        .filter(|flag| match flag {
            ChunkFlag::AntennaAtTime { ant, .. } => !whole_time_ants.contains(ant),
            _ => true,
        })
        .collect()
}
