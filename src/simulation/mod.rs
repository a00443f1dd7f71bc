//! Simulation systems: the scheduler and everything a tick runs

pub mod cleanup;
pub mod clock;
pub mod dispatch;
pub mod events;
pub mod gestures;
pub mod hash;
pub mod invariants;
pub mod messages;
pub mod replay;
pub mod scenario;
pub mod scheduler;

pub use clock::FrameClock;
pub use events::{EventLog, SimEvent, SimEventKind};
pub use hash::hash_state;
pub use invariants::{check_invariants, InvariantViolation};
pub use messages::{Message, TransitionCause};
pub use replay::Replay;
pub use scenario::{Placement, Scenario};
pub use scheduler::{Simulation, TickOutcome};
