//! Rule evaluation for CRF metadata.
//!
//! Decides, per subject visit, which forms and requisition panels are
//! `REQUIRED` or `NOT_REQUIRED`:
//!
//! - **Status resolver** ([`status`]): folds a subject's visit history into
//!   a [`StatusSnapshot`]
//! - **Predicate library** ([`Predicates`], [`NamedPredicate`]): boolean
//!   functions over the snapshot and the data access facade
//! - **Rule groups** ([`RuleGroup`], [`RuleRegistry`]): ordered rules
//!   mapping predicates to required states
//! - **Engine** ([`RuleEngine`]): evaluates groups for a visit
//!
//! # Example
//!
//! ```ignore
//! let config = EngineConfig::default();
//! let access = DataAccess::new(&store, config.entity_registry()?);
//! let predicates = Predicates::new(access, &config)?;
//! let engine = RuleEngine::new(bcpp_registry(&config.app_label)?, predicates)?;
//!
//! let outcome = engine.evaluate("subject_visit", &visit)?;
//! for entry in outcome.entries(&visit) {
//!     println!("{} {}", entry.target, entry.entry_status);
//! }
//! ```

pub mod catalogue;
pub mod engine;
pub mod error;
pub mod named;
pub mod predicate;
pub mod predicates;
pub mod registry;
pub mod rule;
pub mod status;

pub use catalogue::bcpp_registry;
pub use engine::{FiredRule, RuleEngine, RuleGroupOutcome};
pub use error::RuleError;
pub use named::{NamedPredicate, PredicateFn, PredicateRegistry};
pub use predicate::{FieldPredicate, Operator, PairPredicate, Predicate};
pub use predicates::{PredicateContext, Predicates};
pub use registry::RuleRegistry;
pub use rule::{Rule, RuleGroup, RuleGroupBuilder, RuleGroupKind, Targets};
pub use status::{EvaluationScope, StatusResolver, StatusSnapshot, VisitReading};
