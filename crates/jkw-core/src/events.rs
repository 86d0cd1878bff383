//! Change notifications for the UI layer.

use tokio::sync::mpsc;

/// The two independent tree instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Jobs,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// Node identities may have changed; re-query roots and expanded nodes.
    Invalidated { tree: TreeKind, generation: u64 },
    ProjectsReordered { name: String, direction: Direction },
    ProjectsDeleted { names: Vec<String> },
    ProjectTracked { name: String, branch: Option<String> },
}

pub type EventSender = mpsc::UnboundedSender<TreeEvent>;

/// Listeners going away is not an error for the sender; it only means nobody redraws.
pub(crate) fn emit(tx: &EventSender, event: TreeEvent) {
    if tx.send(event).is_err() {
        tracing::warn!("tree event channel closed");
    }
}
