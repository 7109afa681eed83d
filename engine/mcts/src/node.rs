//! MCTS tree node representation.
//!
//! Each node represents a game state reached by taking a move from the parent.
//! Nodes store visit statistics used for UCB selection and policy improvement.
//! The value stored in a node is always from the perspective of the player to
//! move at that node.

use engine_core::GameState;

use crate::search::SearchError;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the MCTS tree.
#[derive(Debug, Clone)]
pub struct MctsNode<S: GameState> {
    /// Parent node index (NONE for root)
    pub parent: NodeId,

    /// Move that led to this node from parent (None for root)
    pub mv: Option<S::Move>,

    /// Game state at this node.
    /// Children get theirs when first selected, not when created.
    pub state: Option<S>,

    /// Number of times this node has been visited
    pub visit_count: u32,

    /// Sum of values backpropagated through this node.
    /// Q(s,a) = value_sum / visit_count
    pub value_sum: f32,

    /// Prior probability from the evaluator.
    /// P(s,a) - probability of selecting move `a` from parent state.
    pub prior: f32,

    /// Game outcome for the player to move, once the state is known to be terminal
    pub terminal_value: Option<f32>,

    /// Children: (move, NodeId) pairs in canonical move order.
    /// Empty until node is expanded.
    pub children: Vec<(S::Move, NodeId)>,

    expanded: bool,
}

impl<S: GameState> MctsNode<S> {
    /// Create a new root node.
    pub fn new_root(state: S) -> Self {
        let terminal_value = terminal_value_of(&state);
        Self {
            parent: NodeId::NONE,
            mv: None,
            state: Some(state),
            visit_count: 0,
            value_sum: 0.0,
            prior: 1.0, // Root has prior 1.0
            terminal_value,
            children: Vec::new(),
            expanded: false,
        }
    }

    /// Create a new child node. Its state is filled in on first selection.
    pub fn new_child(parent: NodeId, mv: S::Move, prior: f32) -> Self {
        Self {
            parent,
            mv: Some(mv),
            state: None,
            visit_count: 0,
            value_sum: 0.0,
            prior,
            terminal_value: None,
            children: Vec::new(),
            expanded: false,
        }
    }

    /// Attach the game state, recording the outcome if it is terminal.
    pub fn set_state(&mut self, state: S) {
        self.terminal_value = terminal_value_of(&state);
        self.state = Some(state);
    }

    /// Calculate mean value Q(s,a) = value_sum / visit_count.
    /// Returns 0.0 if never visited.
    #[inline]
    pub fn mean_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f32
        }
    }

    /// Record one simulation passing through this node.
    #[inline]
    pub fn update(&mut self, value: f32) {
        self.visit_count += 1;
        self.value_sum += value;
    }

    /// Claim this node for expansion. Fails if it was already expanded;
    /// that is a logic error in the caller and must not be retried.
    pub fn mark_expanded(&mut self, id: NodeId) -> Result<(), SearchError> {
        if self.expanded {
            return Err(SearchError::DoubleExpansion(id));
        }
        self.expanded = true;
        Ok(())
    }

    /// Check if this node has been expanded from an evaluator call.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Check if this node holds a finished game.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.terminal_value.is_some()
    }

    /// Check if this is a leaf node (not expanded or terminal).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_terminal() || !self.is_expanded()
    }
}

fn terminal_value_of<S: GameState>(state: &S) -> Option<f32> {
    if state.is_terminal() {
        // A terminal state without a score is treated as a draw.
        Some(state.outcome().unwrap_or(0.0))
    } else {
        None
    }
}
