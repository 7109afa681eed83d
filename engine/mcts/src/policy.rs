//! Selection rules: the UCB score used while descending the tree and the
//! final move choice at the root.
//!
//! Ties are always broken in favor of the earliest child in canonical move
//! order, so a search with a fixed seed is reproducible.

use engine_core::GameState;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::GREEDY_TEMPERATURE;
use crate::node::{MctsNode, NodeId};
use crate::tree::MctsTree;

/// Calculate UCB score for child selection.
/// UCB(s,a) = Q(s,a) + c_puct * P(s,a) * sqrt(N_parent) / (1 + N(s,a))
///
/// Higher scores are better (more promising to explore).
///
/// The value stored in each node is from that node's perspective (the player
/// to move there). In an alternating game the child belongs to the opponent,
/// so its Q is negated: a child with Q=-1 (bad for the opponent) is worth +1
/// to the parent.
///
/// Takes pre-computed sqrt(parent_visits) to avoid redundant sqrt calls
/// when comparing multiple children.
#[inline]
pub fn ucb_score<S: GameState>(child: &MctsNode<S>, parent_visits_sqrt: f32, c_puct: f32) -> f32 {
    let q = if S::ALTERNATING {
        -child.mean_value()
    } else {
        child.mean_value()
    };
    let u = c_puct * child.prior * parent_visits_sqrt / (1.0 + child.visit_count as f32);
    q + u
}

/// Pick the child of `node_id` with the highest UCB score.
/// Returns None if the node has no children.
pub fn select_child<S: GameState>(tree: &MctsTree<S>, node_id: NodeId, c_puct: f32) -> Option<NodeId> {
    let node = tree.get(node_id);
    let parent_visits_sqrt = (node.visit_count as f32).sqrt();

    let mut best: Option<(NodeId, f32)> = None;
    for &(_, child_id) in &node.children {
        let score = ucb_score(tree.get(child_id), parent_visits_sqrt, c_puct);
        // Strictly greater keeps the first child on ties
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((child_id, score)),
        }
    }
    best.map(|(id, _)| id)
}

/// Most visited move; ties go to the earliest entry.
pub fn greedy_move<M: Copy>(visits: &[(M, u32)]) -> Option<M> {
    let mut best: Option<(M, u32)> = None;
    for &(mv, n) in visits {
        match best {
            Some((_, best_n)) if n <= best_n => {}
            _ => best = Some((mv, n)),
        }
    }
    best.map(|(mv, _)| mv)
}

/// Temperature-adjusted weights `visits^(1/temperature)`, normalized to sum to 1.
///
/// Counts are scaled by the largest count before exponentiation so small
/// temperatures do not overflow; the normalized result is unchanged. A
/// greedy temperature puts all mass on [`greedy_move`]. If nothing has been
/// visited every weight is zero.
pub fn visit_weights<M: Copy>(visits: &[(M, u32)], temperature: f32) -> Vec<f64> {
    let max_visits = visits.iter().map(|&(_, n)| n).max().unwrap_or(0);
    if max_visits == 0 {
        return vec![0.0; visits.len()];
    }

    if temperature <= GREEDY_TEMPERATURE {
        let mut weights = vec![0.0; visits.len()];
        if let Some(idx) = greedy_index(visits) {
            weights[idx] = 1.0;
        }
        return weights;
    }

    let exponent = 1.0 / temperature as f64;
    let raw: Vec<f64> = visits
        .iter()
        .map(|&(_, n)| (n as f64 / max_visits as f64).powf(exponent))
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Choose the move to play after search.
///
/// Temperature at or below [`GREEDY_TEMPERATURE`] is argmax over visit
/// counts; otherwise the move is sampled with probability proportional to
/// `visits^(1/temperature)`. Falls back to argmax when no weight is
/// positive, and returns None only for an empty slice.
pub fn select_move<M: Copy, R: Rng + ?Sized>(
    visits: &[(M, u32)],
    temperature: f32,
    rng: &mut R,
) -> Option<M> {
    if temperature <= GREEDY_TEMPERATURE {
        return greedy_move(visits);
    }

    let weights = visit_weights(visits, temperature);
    match WeightedIndex::new(&weights) {
        Ok(dist) => Some(visits[dist.sample(rng)].0),
        Err(_) => greedy_move(visits),
    }
}

fn greedy_index<M>(visits: &[(M, u32)]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, &(_, n)) in visits.iter().enumerate() {
        match best {
            Some((_, best_n)) if n <= best_n => {}
            _ => best = Some((idx, n)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::State;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn child(prior: f32, visits: u32, value_sum: f32) -> MctsNode<State> {
        let mut node = MctsNode::new_child(NodeId(0), 0, prior);
        node.visit_count = visits;
        node.value_sum = value_sum;
        node
    }

    #[test]
    fn test_ucb_score() {
        // Q from child's perspective = 0.5
        let node = child(0.5, 10, 5.0);

        // UCB = -Q + c_puct * P * sqrt(N_parent) / (1 + N)
        // UCB = -0.5 + 1.0 * 0.5 * 10 / 11 = -0.5 + 0.4545... ≈ -0.0455
        let ucb = ucb_score(&node, 100f32.sqrt(), 1.0);
        assert!((ucb - (-0.0455)).abs() < 0.01);
    }

    #[test]
    fn test_ucb_unvisited_is_prior_driven() {
        let low = child(0.1, 0, 0.0);
        let high = child(0.9, 0, 0.0);
        assert!(ucb_score(&high, 3.0, 1.25) > ucb_score(&low, 3.0, 1.25));
    }

    #[test]
    fn test_ucb_non_increasing_in_own_visits() {
        let parent_sqrt = 50f32.sqrt();
        for mean in [-0.5f32, 0.0, 0.5] {
            let mut previous = f32::INFINITY;
            for visits in 0..200u32 {
                let node = child(0.3, visits, mean * visits as f32);
                let score = ucb_score(&node, parent_sqrt, 1.5);
                assert!(
                    score <= previous + 1e-6,
                    "score rose from {previous} to {score} at {visits} visits"
                );
                previous = score;
            }
        }
    }

    #[test]
    fn test_select_child_prefers_prior_then_first_on_tie() {
        let mut tree = MctsTree::new(State::new());
        let root = tree.root();
        tree.expand(root, &[(0, 0.3), (1, 0.7)]).unwrap();
        tree.get_mut(root).visit_count = 1;

        let best = select_child(&tree, root, 1.0).unwrap();
        assert_eq!(tree.get(best).mv, Some(1)); // Second child has higher prior

        let mut tied = MctsTree::new(State::new());
        let root = tied.root();
        tied.expand(root, &[(0, 0.5), (1, 0.5)]).unwrap();
        tied.get_mut(root).visit_count = 1;
        let best = select_child(&tied, root, 1.0).unwrap();
        assert_eq!(tied.get(best).mv, Some(0));
    }

    #[test]
    fn test_select_child_without_children() {
        let tree = MctsTree::new(State::new());
        assert!(select_child(&tree, tree.root(), 1.0).is_none());
    }

    #[test]
    fn test_greedy_move_tie_break() {
        assert_eq!(greedy_move(&[(3u8, 5), (1, 7), (2, 7)]), Some(1));
        assert_eq!(greedy_move(&[(3u8, 0), (1, 0)]), Some(3));
        assert_eq!(greedy_move::<u8>(&[]), None);
    }

    #[test]
    fn test_zero_temperature_matches_argmax() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let visits = [(0u8, 10), (1, 40), (2, 40), (3, 10)];
        for _ in 0..100 {
            assert_eq!(select_move(&visits, 0.0, &mut rng), Some(1));
        }
    }

    #[test]
    fn test_visit_weights() {
        let visits = [(0u8, 30), (1, 70)];

        let proportional = visit_weights(&visits, 1.0);
        assert!((proportional[0] - 0.3).abs() < 1e-9);
        assert!((proportional[1] - 0.7).abs() < 1e-9);

        // T = 0.5 squares the counts: 900 / (900 + 4900)
        let sharp = visit_weights(&visits, 0.5);
        assert!((sharp[0] - 900.0 / 5800.0).abs() < 1e-9);

        let greedy = visit_weights(&visits, 0.0);
        assert_eq!(greedy, vec![0.0, 1.0]);

        assert_eq!(visit_weights(&[(0u8, 0), (1, 0)], 1.0), vec![0.0, 0.0]);
    }

    #[test]
    fn test_tiny_temperature_does_not_overflow() {
        let weights = visit_weights(&[(0u8, 1000), (1, 500)], 0.001);
        assert!(weights.iter().all(|w| w.is_finite()));
        assert!(weights[0] > 0.99);
    }

    #[test]
    fn test_sampling_follows_visits() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let visits = [(0u8, 0), (1, 50), (2, 30), (3, 20)];

        let mut counts = [0u32; 4];
        for _ in 0..1000 {
            let mv = select_move(&visits, 1.0, &mut rng).unwrap();
            counts[mv as usize] += 1;
        }

        // Unvisited moves are never sampled
        assert_eq!(counts[0], 0);
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > counts[3]);
    }

    #[test]
    fn test_sampling_unvisited_falls_back_to_greedy() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(select_move(&[(4u8, 0), (5, 0)], 1.0, &mut rng), Some(4));
    }
}
