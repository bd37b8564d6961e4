//! # Riposte Core
//!
//! Melee combat core: combo selection, attack phases and blocking.
//!
//! ## Architecture
//!
//! - **Tree**: combo definitions compiled into a trie of [`ComboKey`]s
//! - **Resolver**: per-actor state machine walking the tree as inputs arrive,
//!   gated by attack phases and filtered by candidate [`Condition`]s
//! - **Defense**: guard and poise, feeding block events back into the
//!   resolver for counter attacks
//!
//! Attack payloads are opaque to this crate. Damage and other values are
//! typically computed from stat formulas with [`tally`], re-exported here.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use riposte_core::{
//!     ActorState, ComboDefinition, ComboKey, ComboResolver, ComboTree, Condition, ManualClock,
//! };
//!
//! let tree = ComboTree::build(vec![
//!     ComboDefinition::new(vec![ComboKey::A], "slash"),
//!     ComboDefinition::new(vec![ComboKey::A], "plunge").with_condition(Condition::OnAir),
//! ])
//! .unwrap();
//! let mut resolver = ComboResolver::new(tree, Arc::new(ManualClock::default()));
//!
//! assert_eq!(resolver.select(ComboKey::A, &ActorState::new()), Some(&"slash"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

// Re-export tally for stat formulas
pub use tally;

pub mod actor;
pub mod clock;
pub mod condition;
pub mod defense;
pub mod error;
pub mod key;
pub mod resolver;
pub mod timing;
pub mod tree;

pub use actor::{Actor, ActorState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use condition::{Condition, ConditionContext};
pub use defense::{
    DefenseOutcome, Defender, Guard, GuardConfig, Hit, HitReaction, Poise, PoiseConfig,
};
pub use error::{ComboError, ComboResult};
pub use key::{ComboKey, KeySet};
pub use resolver::{ComboResolver, ResolverConfig, ResolverState};
pub use timing::{AttackTiming, Phase, PhaseCurve};
pub use tree::{Candidate, ComboDefinition, ComboTree, NodeId};

#[cfg(test)]
mod tests;
