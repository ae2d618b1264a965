//! Two-phase sanitizing: a read-only planning pass, then a reverse replay.
//!
//! Planning walks the tree once in document pre-order and records one pending action per
//! element and per disallowed comment, keyed by the node's pre-order position. Replay
//! walks the tree once more in exact reverse pre-order (children right to left, each node
//! after its subtree) and takes actions off the end of the queue as positions match.
//! By the time a node's action runs, every node visited after it has reached its final
//! disposition, and a mutation only touches siblings that replay has already passed.

use std::fmt;
use std::iter::{Peekable, Rev};
use std::slice;

use html::{Node, count_descendants, walk_preorder};

use crate::attributes::{AttributeStats, sanitize_element};
use crate::classify::{ElementAction, classify_node};
use crate::policy::Policy;

/// Kind of a pending mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    RemoveComment,
    /// Remove an element with its subtree.
    Drop,
    /// Splice an element's children into its position, then remove it.
    Unwrap,
    /// Run the attribute sanitizer on an allowed element.
    RewriteAttributes,
}

impl ActionKind {
    fn fits(self, node: &Node) -> bool {
        match self {
            ActionKind::RemoveComment => node.is_comment(),
            ActionKind::Drop | ActionKind::Unwrap | ActionKind::RewriteAttributes => {
                node.is_element()
            }
        }
    }
}

impl From<ElementAction> for ActionKind {
    fn from(action: ElementAction) -> Self {
        match action {
            ElementAction::Allow => ActionKind::RewriteAttributes,
            ElementAction::Block => ActionKind::Unwrap,
            ElementAction::Drop => ActionKind::Drop,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingAction {
    kind: ActionKind,
    /// Pre-order position among all nodes below the root.
    position: usize,
}

/// Pending actions in visitation order, plus the size of the tree they were planned on.
#[derive(Clone, Debug, Default)]
pub struct ActionQueue {
    actions: Vec<PendingAction>,
    nodes: usize,
}

impl ActionQueue {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Nodes below the root of the planned tree, text included.
    pub fn planned_nodes(&self) -> usize {
        self.nodes
    }

    /// `(kind, pre-order position)` in visitation order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (ActionKind, usize)> + '_ {
        self.actions.iter().map(|action| (action.kind, action.position))
    }
}

/// What a replay did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SanitizeStats {
    pub elements_dropped: usize,
    pub elements_unwrapped: usize,
    pub comments_removed: usize,
    /// Elements whose attributes went through the attribute sanitizer.
    pub elements_rewritten: usize,
    pub attributes: AttributeStats,
}

/// A queue does not match the tree it is applied to.
///
/// Planning and replay of one [`crate::sanitize`] call never produce this; it signals a
/// queue applied to a tree other than the one it was planned on, or a tree mutated in
/// between. The tree is checked before replay starts, so an error leaves it untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SanitizeError {
    NodeCountMismatch {
        planned: usize,
        found: usize,
    },
    UnexpectedNode {
        position: usize,
        expected: ActionKind,
    },
}

impl fmt::Display for SanitizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizeError::NodeCountMismatch { planned, found } => {
                write!(f, "queue planned for {planned} nodes, tree has {found}")
            }
            SanitizeError::UnexpectedNode { position, expected } => {
                write!(
                    f,
                    "node at position {position} does not fit pending {expected:?} action"
                )
            }
        }
    }
}

impl std::error::Error for SanitizeError {}

/// Planning pass. Reads the tree only; every element and comment below `root` is visited,
/// including those inside elements that will later be dropped.
pub fn plan(root: &Node, policy: &Policy) -> ActionQueue {
    let mut queue = ActionQueue::default();
    walk_preorder(root, |node, _| {
        let position = queue.nodes;
        queue.nodes += 1;
        let kind = match node {
            Node::Comment { .. } if !policy.allow_comments() => ActionKind::RemoveComment,
            Node::Element { .. } => match classify_node(node, policy) {
                Some(action) => action.into(),
                None => return,
            },
            _ => return,
        };
        log::trace!(target: "sanitizer.scheduler", "plan {kind:?} at {position}");
        queue.actions.push(PendingAction { kind, position });
    });
    queue
}

/// Replay pass. Executes `queue` in exact reverse visitation order.
pub fn apply(
    root: &mut Node,
    queue: &ActionQueue,
    policy: &Policy,
) -> Result<SanitizeStats, SanitizeError> {
    check(root, queue)?;
    let Some(children) = root.children_mut() else {
        return Ok(SanitizeStats::default());
    };
    let mut replay = Replay {
        actions: queue.actions.iter().rev().peekable(),
        position: queue.nodes,
        policy,
        stats: SanitizeStats::default(),
    };
    *children = replay.run(std::mem::take(children));
    Ok(replay.stats)
}

/// Confirms every pending action lands on a node of the right kind.
fn check(root: &Node, queue: &ActionQueue) -> Result<(), SanitizeError> {
    let found = count_descendants(root);
    if found != queue.nodes {
        return Err(SanitizeError::NodeCountMismatch {
            planned: queue.nodes,
            found,
        });
    }
    let mut actions = queue.actions.iter().peekable();
    let mut position = 0;
    let mut mismatch = None;
    walk_preorder(root, |node, _| {
        if let Some(action) = actions.next_if(|action| action.position == position) {
            if mismatch.is_none() && !action.kind.fits(node) {
                mismatch = Some(SanitizeError::UnexpectedNode {
                    position,
                    expected: action.kind,
                });
            }
        }
        position += 1;
    });
    mismatch.map_or(Ok(()), Err)
}

/// One open element during replay. Its children were taken out of it; `pending` holds
/// the ones not yet replayed and `finished` collects replayed output, last sibling first.
struct Frame {
    /// `None` for the root's frame.
    node: Option<Node>,
    pending: Vec<Node>,
    finished: Vec<Node>,
}

struct Replay<'q> {
    actions: Peekable<Rev<slice::Iter<'q, PendingAction>>>,
    /// Pre-order position of the last node finished, counting down from the tree size.
    position: usize,
    policy: &'q Policy,
    stats: SanitizeStats,
}

impl Replay<'_> {
    fn run(&mut self, children: Vec<Node>) -> Vec<Node> {
        let mut stack = vec![Frame {
            node: None,
            pending: children,
            finished: Vec::new(),
        }];
        while let Some(frame) = stack.last_mut() {
            if let Some(mut child) = frame.pending.pop() {
                let pending = child
                    .children_mut()
                    .map(std::mem::take)
                    .unwrap_or_default();
                if pending.is_empty() {
                    self.finish(child, &mut frame.finished);
                } else {
                    stack.push(Frame {
                        node: Some(child),
                        pending,
                        finished: Vec::new(),
                    });
                }
                continue;
            }

            let Some(Frame { node, mut finished, .. }) = stack.pop() else {
                break;
            };
            finished.reverse();
            match (node, stack.last_mut()) {
                (Some(mut node), Some(parent)) => {
                    if let Some(children) = node.children_mut() {
                        *children = finished;
                    }
                    self.finish(node, &mut parent.finished);
                }
                _ => return finished,
            }
        }
        Vec::new()
    }

    /// Runs the node's own action, if any, and emits what remains of it into `out`.
    fn finish(&mut self, mut node: Node, out: &mut Vec<Node>) {
        self.position -= 1;
        let position = self.position;
        let Some(action) = self.actions.next_if(|action| action.position == position) else {
            out.push(node);
            return;
        };
        log::trace!(target: "sanitizer.scheduler", "apply {:?} at {position}", action.kind);
        let stats = &mut self.stats;
        match action.kind {
            ActionKind::RemoveComment => stats.comments_removed += 1,
            ActionKind::Drop => stats.elements_dropped += 1,
            ActionKind::Unwrap => {
                if let Some(children) = node.children_mut() {
                    out.extend(children.drain(..).rev());
                }
                stats.elements_unwrapped += 1;
            }
            ActionKind::RewriteAttributes => {
                stats.attributes += sanitize_element(&mut node, self.policy);
                stats.elements_rewritten += 1;
                out.push(node);
            }
        }
    }
}
