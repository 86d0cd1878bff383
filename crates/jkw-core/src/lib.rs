#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::doc_markdown
)]

//! Data layer for browsing a Jenkins server: a lazily loaded job → build tree
//! with generation-based cancellation, and a persisted, user-ordered list of
//! tracked projects.

pub mod cache;
pub mod config_store;
pub mod controller;
pub mod error;
pub mod events;
pub mod history;
pub mod model;
pub mod scope;
pub mod settings;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::{BuildTreeCache, RootSelection};
pub use controller::{TreeController, TreeStatus};
pub use error::{TreeError, TreeResult};
pub use events::{Direction, EventSender, TreeEvent, TreeKind};
pub use history::HistoryOrderingService;
pub use model::{
    Build, BuildNode, BuildResult, Job, JobNode, JobType, ProjectKey, TrackedProject, TreeNode,
};
pub use scope::{Scope, ScopeSource};
pub use settings::TreeSettings;
pub use store::ProjectListStore;
