//! Stream position markers.

use serde::{Deserialize, Serialize};

/// Opaque, totally-ordered position of a record within a partition.
///
/// Offsets are modeled as `i64` but callers should treat them as opaque:
/// the only meaningful operations are comparison and handing a previously
/// observed offset back to [`set_offset`](crate::StreamLevelConsumer::set_offset)
/// or [`commit_at`](crate::StreamLevelConsumer::commit_at).
///
/// Within one session, offsets observed across successive un-repositioned
/// decodes are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offset(pub i64);

impl Offset {
    /// The first position of a partition.
    pub const ZERO: Offset = Offset(0);

    /// Raw integer value of this offset.
    pub fn value(self) -> i64 {
        self.0
    }

    /// The position immediately after this one.
    ///
    /// Used for at-least-once resume: a checkpoint names the last delivered
    /// record, so consumption continues at `checkpoint.next()`.
    pub fn next(self) -> Offset {
        Offset(self.0 + 1)
    }
}

impl From<i64> for Offset {
    fn from(v: i64) -> Self {
        Offset(v)
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_totally_ordered() {
        assert!(Offset(0) < Offset(1));
        assert!(Offset(-1) < Offset::ZERO);
        assert_eq!(Offset(41).next(), Offset(42));
    }

    #[test]
    fn offset_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Offset(7)).unwrap();
        assert_eq!(json, "7");
        let back: Offset = serde_json::from_str("7").unwrap();
        assert_eq!(back, Offset(7));
    }
}
