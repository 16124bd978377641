#![allow(dead_code)]

use std::fmt;

use rust_decimal::Decimal;

/// Requested price aggregation level for the book subscription, P0 (finest)
/// through P4 (coarsest). Changing it forces a resubscription — the feed
/// only ever streams one granularity per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Precision(u8);

impl Precision {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(4);

    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX.0).then_some(Self(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// One step coarser, if not already at P4.
    pub fn coarser(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// One step finer, if not already at P0.
    pub fn finer(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Update frequency of the book channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frequency {
    /// Every change, as it happens.
    Realtime,
    /// Throttled to two updates per second.
    #[default]
    Throttled,
}

impl Frequency {
    pub fn from_param(s: &str) -> Option<Self> {
        match s {
            "F0" => Some(Self::Realtime),
            "F1" => Some(Self::Throttled),
            _ => None,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            Self::Realtime => "F0",
            Self::Throttled => "F1",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// One incremental level update as it arrives from the feed.
///
/// `amount` is signed: positive quantities belong to the bid side, negative
/// to the ask side, zero removes the level. `count` is the number of orders
/// behind the level; the merge only ever checks it for validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLevelUpdate {
    pub price: Decimal,
    pub count: i64,
    pub amount: Decimal,
}

/// An ordered batch of level updates plus the identifier that orders it
/// against previously applied batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBatch {
    pub update_id: u64,
    pub entries: Vec<RawLevelUpdate>,
}

/// Decoded feed traffic flowing from the adapter to the book owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A decoded batch of level updates. Snapshot frames arrive as an
    /// ordinary (large) batch right after a `Reset`.
    Batch(UpdateBatch),
    /// The transport (re)subscribed: the current book is obsolete and must
    /// be replaced with an empty one.
    Reset,
}

/// Control-plane commands for the feed adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCommand {
    /// Tear down the subscription and reopen it at the given precision.
    Resubscribe { precision: Precision },
}
