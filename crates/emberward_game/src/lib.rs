//! The game-variant seam.
//!
//! Concrete game variants differ only in their wire opcode numbering, their
//! player-state schema details, and a handful of rule toggles; everything
//! else in the engine is generic over [`GameVariant`]. Variant state is
//! constructed once at shard startup and passed down explicitly; there are
//! no process-wide singletons.

use std::sync::Arc;

use emberward_protocol::MessageKind;
use rustc_hash::FxHashMap;

mod ashen;
mod sunken;

pub use ashen::AshenVariant;
pub use sunken::SunkenVariant;

/// The covenant-style grouping a player volunteers into for auto-summons.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VisitorPool {
    None,
    Coop,
    Watchdog,
    Aldrich,
    Blue,
    Church,
}

impl VisitorPool {
    pub fn from_u32(raw: u32) -> Self {
        match raw {
            1 => Self::Coop,
            2 => Self::Watchdog,
            3 => Self::Aldrich,
            4 => Self::Blue,
            5 => Self::Church,
            _ => Self::None,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Coop => 1,
            Self::Watchdog => 2,
            Self::Aldrich => 3,
            Self::Blue => 4,
            Self::Church => 5,
        }
    }
}

/// Bidirectional opcode numbering for one variant, built from a declarative
/// table at construction time. Dispatch is a map lookup, never a scan.
pub struct OpcodeTable {
    to_opcode: FxHashMap<MessageKind, u32>,
    from_opcode: FxHashMap<u32, MessageKind>,
}

impl OpcodeTable {
    pub fn new(entries: &[(MessageKind, u32)]) -> Self {
        let mut to_opcode = FxHashMap::default();
        let mut from_opcode = FxHashMap::default();
        for &(kind, opcode) in entries {
            let displaced = to_opcode.insert(kind, opcode);
            debug_assert!(displaced.is_none(), "duplicate kind in opcode table");
            let displaced = from_opcode.insert(opcode, kind);
            debug_assert!(displaced.is_none(), "duplicate opcode in opcode table");
        }
        Self {
            to_opcode,
            from_opcode,
        }
    }

    pub fn opcode(&self, kind: MessageKind) -> Option<u32> {
        self.to_opcode.get(&kind).copied()
    }

    pub fn kind_of(&self, opcode: u32) -> Option<MessageKind> {
        self.from_opcode.get(&opcode).copied()
    }
}

/// Everything the engine needs to know about one concrete game.
pub trait GameVariant: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn opcodes(&self) -> &OpcodeTable;

    /// Whether artifacts are partitioned by `(area, cell)` instead of area
    /// alone.
    fn uses_cell_grid(&self) -> bool;

    /// Whether the matching predicate compares soul memory instead of soul
    /// level.
    fn matches_on_soul_memory(&self) -> bool;

    /// The field ids the client should include in rolling status uploads.
    fn upload_field_mask(&self) -> &[u32];

    /// Areas in which clients hear the bell ring.
    fn bell_areas(&self) -> &[u32];

    /// Human-readable area name for logs and webhook notices.
    fn area_name(&self, area_id: u32) -> String;

    /// Whether leaderboard submissions accumulate onto the stored score
    /// instead of keeping the best.
    fn rankings_accumulate(&self) -> bool {
        false
    }

    /// The id embedded in a push message body, by convention the push's own
    /// opcode.
    fn push_id(&self, kind: MessageKind) -> u32 {
        self.opcodes().opcode(kind).unwrap_or(0)
    }
}

/// Looks a variant up by its configured name.
pub fn variant_by_name(name: &str) -> Option<Arc<dyn GameVariant>> {
    match name {
        "ashen" => Some(Arc::new(AshenVariant::new())),
        "sunken" => Some(Arc::new(SunkenVariant::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_resolve_by_name() {
        assert!(variant_by_name("ashen").is_some());
        assert!(variant_by_name("sunken").is_some());
        assert!(variant_by_name("unknown").is_none());
    }

    #[test]
    fn every_kind_has_an_opcode_in_every_variant() {
        for name in ["ashen", "sunken"] {
            let variant = variant_by_name(name).unwrap();
            for &kind in MessageKind::ALL {
                let opcode = variant.opcodes().opcode(kind);
                assert!(opcode.is_some(), "{name} is missing {}", kind.name());
                assert_eq!(
                    variant.opcodes().kind_of(opcode.unwrap()),
                    Some(kind),
                    "{name} round trip failed for {}",
                    kind.name()
                );
            }
        }
    }

    #[test]
    fn visitor_pool_round_trip() {
        for raw in 0..=5 {
            assert_eq!(VisitorPool::from_u32(raw).as_u32(), raw);
        }
        assert_eq!(VisitorPool::from_u32(99), VisitorPool::None);
    }
}
