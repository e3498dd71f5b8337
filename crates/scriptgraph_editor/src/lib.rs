// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor core for scriptgraph.
//!
//! Keeps the visuals of a script graph in step with its model:
//! - [`dependency`]: which node's position hangs off which
//! - [`mover`]: cascading drags through those dependencies
//! - [`align`]: automatic placement of dependents next to their parent
//! - [`reconcile`]: incremental rebuild of visuals from a change-list
//!
//! ## Architecture
//!
//! The visual toolkit sits behind [`view::ViewLayer`]. The core never holds
//! a visual directly; [`view::ViewMapping`] resolves model identities to
//! [`view::VisualId`] handles on every lookup, so a rebuild can replace any
//! visual without leaving stale references behind. [`GraphEditor`] ties the
//! pieces together for one open graph.

pub mod align;
pub mod config;
pub mod dependency;
pub mod editor;
pub mod history;
pub mod mover;
pub mod reconcile;
pub mod scheduler;
pub mod view;
pub mod view_state;

pub use align::AlignmentEngine;
pub use config::{EditorPreferences, LayoutMetrics, PreferencesError};
pub use dependency::{AddOutcome, Dependency, DependencyStore, LinkedNodesDependency, StackedNodeDependency};
pub use editor::GraphEditor;
pub use history::{History, HistoryError};
pub use mover::{Cascaded, PositionDependenciesManager};
pub use reconcile::{full_rebuild, PartialRebuilder, RebuildStats, RebuildTarget};
pub use scheduler::FrameScheduler;
pub use view::{RecordingView, ViewLayer, ViewMapping, VisualId};
pub use view_state::{SelectMode, Selection, ViewState};
