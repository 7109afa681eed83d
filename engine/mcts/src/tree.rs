//! MCTS tree structure with arena allocation.
//!
//! The tree uses arena allocation for efficient node storage and
//! cache-friendly traversal. Nodes are stored in a contiguous Vec
//! and referenced by NodeId indices.

use engine_core::{GameError, GameState};

use crate::node::{MctsNode, NodeId};
use crate::policy;
use crate::search::SearchError;

/// MCTS tree with arena-based node storage.
#[derive(Debug, Clone)]
pub struct MctsTree<S: GameState> {
    /// Arena storing all nodes
    nodes: Vec<MctsNode<S>>,

    /// Root node index (always 0)
    root: NodeId,
}

impl<S: GameState> MctsTree<S> {
    /// Create a new tree holding only the root state.
    pub fn new(root_state: S) -> Self {
        Self {
            nodes: vec![MctsNode::new_root(root_state)],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Game state at the root.
    #[inline]
    pub fn root_state(&self) -> Option<&S> {
        self.get(self.root).state.as_ref()
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<S> {
        &self.nodes[id.index()]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<S> {
        &mut self.nodes[id.index()]
    }

    /// Allocate a new node and return its ID.
    pub fn allocate(&mut self, node: MctsNode<S>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (never true after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the arena slice for read access.
    #[inline]
    pub fn arena(&self) -> &[MctsNode<S>] {
        &self.nodes
    }

    /// Make sure a node carries its game state, deriving it from the parent.
    ///
    /// Fails if the game rejects the move; the node is left without a state
    /// and nothing else in the tree changes.
    pub fn ensure_state(&mut self, node_id: NodeId) -> Result<(), GameError> {
        let node = self.get(node_id);
        if node.state.is_some() {
            return Ok(());
        }

        let mv = node
            .mv
            .ok_or_else(|| GameError::InvalidState("non-root node without a move".into()))?;
        let parent_state = self
            .get(node.parent)
            .state
            .as_ref()
            .ok_or_else(|| GameError::InvalidState("parent state not materialized".into()))?;

        let state = parent_state.apply_move(mv)?;
        self.get_mut(node_id).set_state(state);
        Ok(())
    }

    /// Expand a node with one child per entry of `priors`.
    ///
    /// `priors` must already be restricted to legal moves and normalized.
    /// Expanding the same node twice is a logic error.
    pub fn expand(&mut self, node_id: NodeId, priors: &[(S::Move, f32)]) -> Result<(), SearchError> {
        self.get_mut(node_id).mark_expanded(node_id)?;

        let mut children = Vec::with_capacity(priors.len());
        for &(mv, prior) in priors {
            let child_id = self.allocate(MctsNode::new_child(node_id, mv, prior));
            children.push((mv, child_id));
        }
        self.get_mut(node_id).children = children;
        Ok(())
    }

    /// Backpropagate a value along a root-to-leaf path.
    ///
    /// `value` is from the perspective of the player to move at the last
    /// node of `path`; it is negated at each step up for alternating games.
    pub fn backpropagate(&mut self, path: &[NodeId], value: f32) {
        let mut current_value = value;

        for &node_id in path.iter().rev() {
            self.get_mut(node_id).update(current_value);

            if S::ALTERNATING {
                current_value = -current_value;
            }
        }
    }

    /// Visit counts of the root's children in canonical move order.
    pub fn root_visits(&self) -> Vec<(S::Move, u32)> {
        self.get(self.root)
            .children
            .iter()
            .map(|&(mv, id)| (mv, self.get(id).visit_count))
            .collect()
    }

    /// Get the best move from root based on visit counts.
    /// Returns (move, visit_count) or None if root has no children.
    pub fn best_move(&self) -> Option<(S::Move, u32)> {
        let visits = self.root_visits();
        let mv = policy::greedy_move(&visits)?;
        visits.into_iter().find(|&(m, _)| m == mv)
    }

    /// Get the policy (temperature-adjusted visit distribution) from the root.
    /// Returns (move, probability) pairs; empty if the root has no children.
    pub fn root_policy(&self, temperature: f32) -> Vec<(S::Move, f32)> {
        let visits = self.root_visits();
        let weights = policy::visit_weights(&visits, temperature);
        visits
            .into_iter()
            .zip(weights)
            .map(|((mv, _), w)| (mv, w as f32))
            .collect()
    }

    /// Commit `mv` and keep the subtree below it as the new tree.
    ///
    /// Statistics gathered under the chosen child carry over. If the root was
    /// never expanded, or `mv` is not among its children, a fresh tree is
    /// started from the resulting state.
    pub fn reroot(self, mv: S::Move) -> Result<Self, GameError> {
        let child_id = self
            .get(self.root)
            .children
            .iter()
            .find(|&&(m, _)| m == mv)
            .map(|&(_, id)| id);

        let Some(child_id) = child_id else {
            let root_state = self
                .root_state()
                .ok_or_else(|| GameError::InvalidState("root state missing".into()))?;
            return Ok(Self::new(root_state.apply_move(mv)?));
        };

        let mut tree = self;
        tree.ensure_state(child_id)?;

        // Breadth-first order over the kept subtree; new ids follow this order
        let mut remap = vec![NodeId::NONE; tree.nodes.len()];
        let mut order = vec![child_id];
        remap[child_id.index()] = NodeId(0);
        let mut cursor = 0;
        while cursor < order.len() {
            let old_id = order[cursor];
            for &(_, c) in &tree.get(old_id).children {
                remap[c.index()] = NodeId(order.len() as u32);
                order.push(c);
            }
            cursor += 1;
        }

        let mut old: Vec<Option<MctsNode<S>>> = tree.nodes.into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(order.len());
        for old_id in order {
            let Some(mut node) = old[old_id.index()].take() else {
                continue;
            };
            if old_id == child_id {
                node.parent = NodeId::NONE;
                node.mv = None;
                node.prior = 1.0;
            } else {
                node.parent = remap[node.parent.index()];
            }
            for entry in &mut node.children {
                entry.1 = remap[entry.1.index()];
            }
            nodes.push(node);
        }

        Ok(Self {
            nodes,
            root: NodeId(0),
        })
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visit_count,
            root_value: root.mean_value(),
            max_depth: self.compute_max_depth(self.root, 0),
        }
    }

    fn compute_max_depth(&self, node_id: NodeId, current_depth: u32) -> u32 {
        let node = self.get(node_id);
        if node.children.is_empty() {
            return current_depth;
        }

        node.children
            .iter()
            .map(|(_, id)| self.compute_max_depth(*id, current_depth + 1))
            .max()
            .unwrap_or(current_depth)
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f32,
    pub max_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::State;

    fn uniform(moves: &[u8]) -> Vec<(u8, f32)> {
        let p = 1.0 / moves.len() as f32;
        moves.iter().map(|&m| (m, p)).collect()
    }

    #[test]
    fn test_new_tree() {
        let tree = MctsTree::new(State::new());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), NodeId(0));

        let root = tree.get(tree.root());
        assert!(root.parent.is_none());
        assert_eq!(tree.root_state(), Some(&State::new()));
    }

    #[test]
    fn test_expand() {
        let mut tree = MctsTree::new(State::new());
        let root = tree.root();

        tree.expand(root, &uniform(&[0, 1, 2])).unwrap();

        assert_eq!(tree.len(), 4);
        let node = tree.get(root);
        assert!(node.is_expanded());
        assert_eq!(node.children.len(), 3);
        assert_eq!(node.children[0], (0, NodeId(1)));

        let child = tree.get(NodeId(2));
        assert_eq!(child.parent, root);
        assert_eq!(child.mv, Some(1));
        assert!((child.prior - 1.0 / 3.0).abs() < 1e-6);

        let prior_sum: f32 = node.children.iter().map(|(_, id)| tree.get(*id).prior).sum();
        assert!((prior_sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_expand_twice_fails_without_new_children() {
        let mut tree = MctsTree::new(State::new());
        let root = tree.root();
        tree.expand(root, &uniform(&[0, 1])).unwrap();

        let err = tree.expand(root, &uniform(&[0, 1])).unwrap_err();
        assert!(matches!(err, SearchError::DoubleExpansion(id) if id == root));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_ensure_state() {
        let mut tree = MctsTree::new(State::new());
        let root = tree.root();
        tree.expand(root, &uniform(&[4])).unwrap();
        let child = tree.get(root).children[0].1;

        assert!(tree.get(child).state.is_none());
        tree.ensure_state(child).unwrap();
        assert_eq!(tree.get(child).state, Some(State::from_moves(&[4]).unwrap()));
        // Root state is untouched
        assert_eq!(tree.root_state(), Some(&State::new()));
    }

    #[test]
    fn test_ensure_state_reports_illegal_move() {
        let start = State::from_moves(&[4]).unwrap();
        let mut tree = MctsTree::new(start);
        let root = tree.root();
        // Cell 4 is occupied; the evaluator should never have offered it
        tree.expand(root, &uniform(&[4])).unwrap();
        let child = tree.get(root).children[0].1;

        assert!(matches!(
            tree.ensure_state(child),
            Err(GameError::IllegalMove(_))
        ));
        assert!(tree.get(child).state.is_none());
    }

    #[test]
    fn test_backpropagate() {
        let mut tree = MctsTree::new(State::new());
        let root = tree.root();

        // Create a chain: root -> child -> grandchild
        tree.expand(root, &uniform(&[0])).unwrap();
        let child_id = tree.get(root).children[0].1;
        tree.expand(child_id, &uniform(&[1])).unwrap();
        let grandchild_id = tree.get(child_id).children[0].1;

        // Backpropagate value 1.0 from grandchild
        tree.backpropagate(&[root, child_id, grandchild_id], 1.0);

        // Check visits
        assert_eq!(tree.get(grandchild_id).visit_count, 1);
        assert_eq!(tree.get(child_id).visit_count, 1);
        assert_eq!(tree.get(root).visit_count, 1);

        // Check values (negated at each level)
        assert!((tree.get(grandchild_id).value_sum - 1.0).abs() < 1e-6);
        assert!((tree.get(child_id).value_sum - (-1.0)).abs() < 1e-6);
        assert!((tree.get(root).value_sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_root_policy() {
        let mut tree = MctsTree::new(State::new());
        let root = tree.root();
        tree.expand(root, &uniform(&[0, 1])).unwrap();
        let c1 = tree.get(root).children[0].1;
        let c2 = tree.get(root).children[1].1;

        tree.get_mut(c1).visit_count = 30;
        tree.get_mut(c2).visit_count = 70;

        // Temperature 1.0: proportional to visits
        let policy = tree.root_policy(1.0);
        assert_eq!(policy.len(), 2);
        assert!((policy[0].1 - 0.3).abs() < 1e-6);
        assert!((policy[1].1 - 0.7).abs() < 1e-6);

        // Temperature 0.0: greedy
        let greedy = tree.root_policy(0.0);
        assert!(greedy[0].1.abs() < 1e-6);
        assert!((greedy[1].1 - 1.0).abs() < 1e-6);

        assert_eq!(tree.best_move(), Some((1, 70)));
    }

    #[test]
    fn test_root_policy_unexpanded() {
        let tree = MctsTree::new(State::new());
        assert!(tree.root_policy(1.0).is_empty());
        assert!(tree.best_move().is_none());
    }

    #[test]
    fn test_reroot_keeps_subtree() {
        let mut tree = MctsTree::new(State::new());
        let root = tree.root();
        tree.expand(root, &uniform(&[0, 4])).unwrap();
        let kept = tree.get(root).children[1].1;
        tree.ensure_state(kept).unwrap();
        tree.expand(kept, &uniform(&[0, 8])).unwrap();
        let grandchild = tree.get(kept).children[1].1;
        tree.ensure_state(grandchild).unwrap();
        tree.backpropagate(&[root, kept, grandchild], 0.5);
        tree.backpropagate(&[root, kept], -0.25);

        let tree = tree.reroot(4).unwrap();

        assert_eq!(tree.len(), 3);
        let new_root = tree.get(tree.root());
        assert!(new_root.parent.is_none());
        assert!(new_root.mv.is_none());
        assert_eq!(new_root.visit_count, 2);
        assert_eq!(tree.root_state(), Some(&State::from_moves(&[4]).unwrap()));

        let (mv, id) = new_root.children[1];
        assert_eq!(mv, 8);
        assert_eq!(tree.get(id).parent, tree.root());
        assert_eq!(tree.get(id).visit_count, 1);
        assert_eq!(tree.root_visits(), vec![(0, 0), (8, 1)]);
    }

    #[test]
    fn test_reroot_unknown_move_starts_fresh() {
        let tree = MctsTree::new(State::new());
        let tree = tree.reroot(2).unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_state(), Some(&State::from_moves(&[2]).unwrap()));
    }

    #[test]
    fn test_reroot_illegal_move() {
        let tree = MctsTree::new(State::from_moves(&[2]).unwrap());
        assert!(tree.reroot(2).is_err());
    }

    #[test]
    fn test_tree_stats() {
        let mut tree = MctsTree::new(State::new());
        tree.expand(tree.root(), &uniform(&[0])).unwrap();

        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.max_depth, 1);
        assert_eq!(stats.root_visits, 0);
    }
}
