use bitflags::bitflags;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// An optional internal representation a fast path depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    ChunkMap,
    UnloadQueue,
    SectionArray,
    EntityIndex,
    AccessList,
    PlayerManager,
}

impl Representation {
    pub const ALL: [Representation; 6] = [
        Representation::ChunkMap,
        Representation::UnloadQueue,
        Representation::SectionArray,
        Representation::EntityIndex,
        Representation::AccessList,
        Representation::PlayerManager,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_set(self) -> RepresentationSet {
        RepresentationSet::from_bits_truncate(1 << self.index())
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChunkMap => "long-keyed chunk map",
            Self::UnloadQueue => "long-keyed unload queue",
            Self::SectionArray => "chunk section array",
            Self::EntityIndex => "entities-by-id registry",
            Self::AccessList => "world access list",
            Self::PlayerManager => "player manager",
        };
        f.write_str(name)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RepresentationSet: u8 {
        const CHUNK_MAP = 1 << 0;
        const UNLOAD_QUEUE = 1 << 1;
        const SECTION_ARRAY = 1 << 2;
        const ENTITY_INDEX = 1 << 3;
        const ACCESS_LIST = 1 << 4;
        const PLAYER_MANAGER = 1 << 5;
    }
}

impl RepresentationSet {
    pub fn contains_repr(&self, repr: Representation) -> bool {
        self.contains(repr.as_set())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagState {
    Unprobed,
    Available,
    Unavailable,
}

const UNPROBED: u8 = 0;
const AVAILABLE: u8 = 1;
const UNAVAILABLE: u8 = 2;

impl FlagState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            UNPROBED => Self::Unprobed,
            AVAILABLE => Self::Available,
            _ => Self::Unavailable,
        }
    }
}

/// Monotonic availability of one representation: once unavailable, always
/// unavailable.
#[derive(Debug)]
pub struct CapabilityFlag {
    state: AtomicU8,
    downgrades: AtomicUsize,
    fallbacks: AtomicUsize,
}

impl CapabilityFlag {
    fn with_state(state: FlagState) -> Self {
        let raw = match state {
            FlagState::Unprobed => UNPROBED,
            FlagState::Available => AVAILABLE,
            FlagState::Unavailable => UNAVAILABLE,
        };
        Self {
            state: AtomicU8::new(raw),
            downgrades: AtomicUsize::new(0),
            fallbacks: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> FlagState {
        FlagState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Settles an unprobed flag. A flag that is already settled keeps its state.
    fn settle(&self, available: bool) -> FlagState {
        let target = if available { AVAILABLE } else { UNAVAILABLE };
        match self
            .state
            .compare_exchange(UNPROBED, target, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => FlagState::from_raw(target),
            Err(current) => FlagState::from_raw(current),
        }
    }

    /// Returns true only for the call that performed the transition.
    fn downgrade(&self) -> bool {
        let previous = self.state.swap(UNAVAILABLE, Ordering::AcqRel);
        if previous != UNAVAILABLE {
            self.downgrades.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    pub fn downgrade_count(&self) -> usize {
        self.downgrades.load(Ordering::Relaxed)
    }

    pub fn fallback_count(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub representation: Representation,
    pub state: FlagState,
    pub downgrades: usize,
    pub fallbacks: usize,
}

/// Process-wide capability flags, one per representation.
#[derive(Debug)]
pub struct Capabilities {
    flags: [CapabilityFlag; 6],
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl Capabilities {
    /// All flags unprobed; each is probed on first use.
    pub fn new() -> Self {
        Self::with_disabled(RepresentationSet::empty())
    }

    /// Flags in `disabled` start out unavailable and are never probed.
    pub fn with_disabled(disabled: RepresentationSet) -> Self {
        Self {
            flags: Representation::ALL.map(|repr| {
                CapabilityFlag::with_state(if disabled.contains_repr(repr) {
                    FlagState::Unavailable
                } else {
                    FlagState::Unprobed
                })
            }),
        }
    }

    /// Skips probing: flags in `available` are available, the rest are not.
    pub fn forced(available: RepresentationSet) -> Self {
        Self {
            flags: Representation::ALL.map(|repr| {
                CapabilityFlag::with_state(if available.contains_repr(repr) {
                    FlagState::Available
                } else {
                    FlagState::Unavailable
                })
            }),
        }
    }

    pub fn flag(&self, repr: Representation) -> &CapabilityFlag {
        &self.flags[repr.index()]
    }

    pub fn state(&self, repr: Representation) -> FlagState {
        self.flag(repr).state()
    }

    /// Whether the fast path for `repr` may be tried, running `probe` once if
    /// the flag has not been settled yet.
    pub fn is_usable(&self, repr: Representation, probe: impl FnOnce() -> bool) -> bool {
        let flag = self.flag(repr);
        let state = match flag.state() {
            FlagState::Unprobed => {
                let available = probe();
                debug!("Probed {}: available = {}", repr, available);
                flag.settle(available)
            }
            state => state,
        };
        state == FlagState::Available
    }

    /// Permanently disables `repr` after its fast path faulted. Only the first
    /// downgrade logs a warning; returns whether this call was that one.
    pub fn downgrade(&self, repr: Representation, fault: &dyn fmt::Display) -> bool {
        let first = self.flag(repr).downgrade();
        if first {
            warn!("Failed to access the {}, support disabled: {}", repr, fault);
        }
        first
    }

    pub fn record_fallback(&self, repr: Representation) {
        self.flag(repr).fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> Vec<CapabilityReport> {
        Representation::ALL
            .iter()
            .map(|&repr| {
                let flag = self.flag(repr);
                CapabilityReport {
                    representation: repr,
                    state: flag.state(),
                    downgrades: flag.downgrade_count(),
                    fallbacks: flag.fallback_count(),
                }
            })
            .collect()
    }
}
