//! # Readiness
//!
//! The handshake gate of a bridge. Readiness only moves forward, and only
//! when a milestone message arrives in the order the handshake expects:
//!
//! ```text
//! Uninitialized ──► OneSideReady(side) ──► BothReady ──► AppCreated ──► InitialDataSet
//!      rank 0             rank 1             rank 2        rank 3          rank 4
//! ```
//!
//! `BothReady` is only reachable by two resources-loaded milestones from
//! *different* sides, so app creation fires exactly once. Anything else is a
//! `Rejection` and leaves the state untouched.

use std::fmt;

/// One of the two execution contexts a bridge connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Logic,
    Render,
}

/// Inbound events that can advance readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    ResourcesLoaded(Side),
    AppCreated,
    InitialDataReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    Uninitialized,
    OneSideReady(Side),
    BothReady,
    AppCreated,
    /// Terminal. Further initial data is still accepted (and forwarded) but
    /// does not move the state.
    InitialDataSet,
}

/// Why a milestone was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The same side reported its resources loaded twice.
    DuplicateResources(Side),
    /// The milestone is not valid in the current state.
    OutOfOrder { milestone: Milestone, state: Readiness },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::DuplicateResources(side) => {
                write!(f, "duplicate resources-loaded from {side:?} side")
            }
            Rejection::OutOfOrder { milestone, state } => {
                write!(f, "{milestone:?} not valid while {state:?}")
            }
        }
    }
}

impl Readiness {
    /// Numeric view of the state, matching the counter the handshake was
    /// originally described with.
    pub fn rank(self) -> u8 {
        match self {
            Readiness::Uninitialized => 0,
            Readiness::OneSideReady(_) => 1,
            Readiness::BothReady => 2,
            Readiness::AppCreated => 3,
            Readiness::InitialDataSet => 4,
        }
    }

    /// True once both sides have loaded their resources. Lifecycle commands
    /// are only delivered past this gate.
    pub fn is_open(self) -> bool {
        self.rank() >= 2
    }

    /// Applies a milestone. On success returns the new state; on rejection the
    /// state is unchanged.
    pub fn advance(&mut self, milestone: Milestone) -> Result<Readiness, Rejection> {
        let next = match (*self, milestone) {
            (Readiness::Uninitialized, Milestone::ResourcesLoaded(side)) => {
                Readiness::OneSideReady(side)
            }
            (Readiness::OneSideReady(ready), Milestone::ResourcesLoaded(side)) => {
                if ready == side {
                    return Err(Rejection::DuplicateResources(side));
                }
                Readiness::BothReady
            }
            (_, Milestone::ResourcesLoaded(side)) => {
                return Err(Rejection::DuplicateResources(side));
            }
            (Readiness::BothReady, Milestone::AppCreated) => Readiness::AppCreated,
            (Readiness::AppCreated | Readiness::InitialDataSet, Milestone::InitialDataReady) => {
                Readiness::InitialDataSet
            }
            (state, milestone) => return Err(Rejection::OutOfOrder { milestone, state }),
        };
        *self = next;
        Ok(next)
    }
}
