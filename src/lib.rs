//! Interchangeable ordered-set engines behind a common interface.
//!
//! Every engine stores a set of unique, totally ordered values and implements
//! [`OrderedSet`]: insert and remove report whether the set changed, and
//! [`OrderedSet::check`] re-derives the engine's structural invariants from
//! scratch so that tests and benchmarks can validate a structure at any time.
//!
//! - [`AvlTree`]: a height-balanced binary search tree, rebalanced by
//!   rotations on the way back up from each change.
//! - [`BTree`]: a B-tree keeping its values in leaves, with a sibling link on
//!   every node pointing at the next node of the same depth.
//! - [`SkipList`]: a probabilistic stack of sorted linked lists, one node per
//!   value and level.
//! - [`PackedSkipList`]: the same skiplist with one node per value holding a
//!   tower of links.
//! - [`HashSetBaseline`]: an unordered hash set used as a timing baseline.
//!
//! Engines are built from a [`Config`], and a [`Workload`] replays the same
//! reproducible sequence of inserts and removes against any of them:
//!
//! ```
//! use ordset_engines::{AvlTree, BTree, Config, OrderedSet, SkipList, Workload};
//!
//! let config = Config::default().with_branching_factor(4).with_seed(1);
//! let workload = Workload::new(500).with_check_every_step(true);
//!
//! let avl = workload.run(&mut AvlTree::with_config(config)?)?;
//! let btree = workload.run(&mut BTree::with_config(config)?)?;
//! let skiplist = workload.run(&mut SkipList::with_config(config)?)?;
//! assert_eq!(avl.inserts, btree.inserts);
//! assert_eq!(btree.inserts, skiplist.inserts);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! None of the engines is thread-safe beyond what `&mut self` already
//! guarantees, and none installs a `tracing` subscriber: the events emitted
//! when an instance's debug flag is set go wherever the application sends
//! them.

pub mod avl;
pub mod btree;
pub mod config;
pub mod hashset;
pub mod level_generator;
pub mod ordered_set;
pub mod packed_skiplist;
pub mod skiplist;
pub mod workload;

pub use avl::AvlTree;
pub use btree::{BTree, CapacityError};
pub use config::{Config, ConfigError};
pub use hashset::HashSetBaseline;
pub use level_generator::{Geometric, GeometricError, LevelGenerator};
pub use ordered_set::OrderedSet;
pub use packed_skiplist::PackedSkipList;
pub use skiplist::SkipList;
pub use workload::{Phase, Report, Workload, WorkloadError};
