//! CPU decision engine: depth-limited minimax with alpha-beta pruning
//!
//! Each tick the CPU scores its legal headings by simulating alternating
//! moves (the human replies first) and scoring the leaves by how much more
//! open space the CPU can reach than the human.
//!
//! The search owns a private copy of the trail map. Simulated trail cells are
//! marked before recursing and unmarked after, and only cells the search
//! itself marked are ever released, so the caller's map is never touched.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::grid::{Cell, Direction, Side, TrailMap};
use super::reach::FloodScratch;
use crate::consts::{CONTINUITY_BONUS, HEURISTIC_DEPTH, SEARCH_DEPTH, TRAPPED_SCORE};

/// Configurable knobs for the search. Defaults reproduce the tuned behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Plies searched below each root candidate
    pub depth: u32,
    /// Flood-fill budget at the leaves
    pub heuristic_depth: usize,
    /// Bonus added to the candidate that keeps the current heading
    pub continuity_bonus: f64,
    /// Magnitude of the score for a rider with no legal move
    pub trapped_score: i32,
    /// Alpha-beta cutoffs; disabling only costs time, never changes the result
    pub pruning: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: SEARCH_DEPTH,
            heuristic_depth: HEURISTIC_DEPTH,
            continuity_bonus: CONTINUITY_BONUS,
            trapped_score: TRAPPED_SCORE,
            pruning: true,
        }
    }
}

/// Counters from the most recent decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Minimax nodes visited
    pub nodes: u64,
    /// Leaves scored with the flood-fill heuristic
    pub leaves: u64,
    /// Sibling loops cut short by alpha-beta
    pub cutoffs: u64,
}

/// Score of one root candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchEval {
    pub heading: Direction,
    /// Minimax value without the continuity bonus
    pub value: i32,
}

/// The CPU opponent
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    cfg: SearchConfig,
    flood: FloodScratch,
    stats: SearchStats,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(cfg: SearchConfig) -> Self {
        Self {
            cfg,
            flood: FloodScratch::new(),
            stats: SearchStats::default(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    /// Stats of the last `choose_heading`/`branch_evals` call
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Pick the CPU's heading for the next tick
    ///
    /// Returns `None` when every heading is blocked; the CPU is trapped and
    /// will crash on its next move whatever it does.
    pub fn choose_heading<R: Rng + ?Sized>(
        &mut self,
        cpu_pos: Cell,
        cpu_heading: Direction,
        human_pos: Cell,
        trails: &TrailMap,
        rng: &mut R,
    ) -> Option<Direction> {
        let branches = self.branch_evals(cpu_pos, cpu_heading, human_pos, trails, rng);

        let mut best: Option<(Direction, f64)> = None;
        for branch in &branches {
            let mut value = branch.value as f64;
            if branch.heading == cpu_heading {
                value += self.cfg.continuity_bonus;
            }
            // Strict comparison keeps the earliest candidate on ties
            if best.is_none_or(|(_, best_value)| value > best_value) {
                best = Some((branch.heading, value));
            }
        }

        log::trace!(
            "cpu at {:?}: {} candidates, pick {:?} ({} nodes, {} leaves, {} cutoffs)",
            cpu_pos,
            branches.len(),
            best.map(|(dir, _)| dir),
            self.stats.nodes,
            self.stats.leaves,
            self.stats.cutoffs
        );

        best.map(|(dir, _)| dir)
    }

    /// Minimax value of each legal root heading, in evaluation order
    ///
    /// The current heading comes first when legal; the rest are shuffled so
    /// equal scores do not always resolve the same way.
    pub fn branch_evals<R: Rng + ?Sized>(
        &mut self,
        cpu_pos: Cell,
        cpu_heading: Direction,
        human_pos: Cell,
        trails: &TrailMap,
        rng: &mut R,
    ) -> Vec<BranchEval> {
        self.stats = SearchStats::default();

        let legal = |dir: Direction| {
            let next = dir.step(cpu_pos);
            !dir.is_reverse_of(cpu_heading) && !trails.is_blocked(next) && next != human_pos
        };

        let mut others: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|&dir| dir != cpu_heading && legal(dir))
            .collect();
        others.shuffle(rng);

        let mut candidates = Vec::with_capacity(4);
        if legal(cpu_heading) {
            candidates.push(cpu_heading);
        }
        candidates.extend(others);

        if candidates.is_empty() {
            return Vec::new();
        }

        let mut scratch = trails.clone();
        let placed = scratch.mark(cpu_pos, Side::Cpu);

        let mut evals = Vec::with_capacity(candidates.len());
        for heading in candidates {
            let value = self.minimax(
                &mut scratch,
                self.cfg.depth,
                false,
                heading.step(cpu_pos),
                human_pos,
                i32::MIN,
                i32::MAX,
            );
            evals.push(BranchEval { heading, value });
        }

        if placed {
            scratch.unmark(cpu_pos);
        }
        evals
    }

    #[allow(clippy::too_many_arguments)]
    fn minimax(
        &mut self,
        obstacles: &mut TrailMap,
        depth: u32,
        maximizing: bool,
        cpu_pos: Cell,
        human_pos: Cell,
        mut alpha: i32,
        mut beta: i32,
    ) -> i32 {
        self.stats.nodes += 1;

        if cpu_pos == human_pos {
            return 0;
        }

        if depth == 0 {
            self.stats.leaves += 1;
            let budget = self.cfg.heuristic_depth;
            let cpu_space = self.flood.count_reachable(cpu_pos, obstacles, budget) as i32;
            let human_space = self.flood.count_reachable(human_pos, obstacles, budget) as i32;
            return cpu_space - human_space;
        }

        let (mover, opponent, side) = if maximizing {
            (cpu_pos, human_pos, Side::Cpu)
        } else {
            (human_pos, cpu_pos, Side::Human)
        };

        let mut best = if maximizing { i32::MIN } else { i32::MAX };
        let mut any_legal = false;

        for dir in Direction::ALL {
            let next = dir.step(mover);
            if obstacles.is_blocked(next) || next == opponent {
                continue;
            }
            any_legal = true;

            let placed = obstacles.mark(mover, side);
            let value = if maximizing {
                self.minimax(obstacles, depth - 1, false, next, human_pos, alpha, beta)
            } else {
                self.minimax(obstacles, depth - 1, true, cpu_pos, next, alpha, beta)
            };
            if placed {
                obstacles.unmark(mover);
            }

            if maximizing {
                best = best.max(value);
                alpha = alpha.max(value);
            } else {
                best = best.min(value);
                beta = beta.min(value);
            }

            if self.cfg.pruning && beta <= alpha {
                self.stats.cutoffs += 1;
                break;
            }
        }

        if !any_legal {
            return if maximizing {
                -self.cfg.trapped_score
            } else {
                self.cfg.trapped_score
            };
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::Grid;
    use glam::IVec2;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn engine_no_pruning() -> DecisionEngine {
        DecisionEngine::with_config(SearchConfig {
            pruning: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_immediate_trap_has_no_legal_move() {
        let grid = Grid::new(10, 10).unwrap();
        let trails = TrailMap::from_trails(grid, &[IVec2::new(1, 0)], &[IVec2::new(0, 1)]);
        let mut engine = DecisionEngine::new();
        let mut rng = Pcg32::seed_from_u64(1);

        let pick = engine.choose_heading(
            IVec2::new(0, 0),
            Direction::Right,
            IVec2::new(8, 8),
            &trails,
            &mut rng,
        );
        assert_eq!(pick, None);
    }

    #[test]
    fn test_never_picks_blocked_or_reverse() {
        // CPU at (1,0) heading Right; Right is trail, Up is wall, Left is reverse
        let grid = Grid::new(10, 10).unwrap();
        let trails = TrailMap::from_trails(grid, &[IVec2::new(2, 0)], &[]);
        let mut engine = DecisionEngine::new();

        for seed in 0..8 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let pick = engine.choose_heading(
                IVec2::new(1, 0),
                Direction::Right,
                IVec2::new(8, 8),
                &trails,
                &mut rng,
            );
            assert_eq!(pick, Some(Direction::Down));
        }
    }

    #[test]
    fn test_avoids_dead_end_pocket() {
        // CPU at (5,5) heading Right. Going Up enters a one-cell pocket; the
        // other exits lead to open space.
        let grid = Grid::new(12, 12).unwrap();
        let pocket_walls = [IVec2::new(4, 4), IVec2::new(6, 4), IVec2::new(5, 3)];
        let trails = TrailMap::from_trails(grid, &[], &pocket_walls);
        let mut engine = DecisionEngine::new();
        let mut rng = Pcg32::seed_from_u64(7);

        let pick = engine.choose_heading(
            IVec2::new(5, 5),
            Direction::Right,
            IVec2::new(10, 10),
            &trails,
            &mut rng,
        );
        assert!(matches!(pick, Some(Direction::Right) | Some(Direction::Down)));
    }

    #[test]
    fn test_does_not_step_onto_human_head() {
        let grid = Grid::new(10, 10).unwrap();
        let trails = TrailMap::new(grid);
        let mut engine = DecisionEngine::new();
        let mut rng = Pcg32::seed_from_u64(3);

        let branches = engine.branch_evals(
            IVec2::new(4, 4),
            Direction::Left,
            IVec2::new(3, 4),
            &trails,
            &mut rng,
        );
        assert!(branches.iter().all(|b| b.heading != Direction::Left));
        assert!(branches.iter().all(|b| b.heading != Direction::Right));
        assert_eq!(branches.len(), 2);
    }

    #[test]
    fn test_current_heading_evaluated_first() {
        let grid = Grid::new(20, 20).unwrap();
        let trails = TrailMap::new(grid);
        let mut engine = DecisionEngine::new();
        for seed in 0..4 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let branches = engine.branch_evals(
                IVec2::new(10, 10),
                Direction::Up,
                IVec2::new(2, 2),
                &trails,
                &mut rng,
            );
            assert_eq!(branches[0].heading, Direction::Up);
            assert_eq!(branches.len(), 3);
        }
    }

    #[test]
    fn test_search_leaves_trails_untouched() {
        let grid = Grid::new(10, 10).unwrap();
        let trails = TrailMap::from_trails(grid, &[IVec2::new(2, 5)], &[IVec2::new(7, 5)]);
        let before = trails.clone();
        let mut engine = DecisionEngine::new();
        let mut rng = Pcg32::seed_from_u64(11);
        let _ = engine.choose_heading(
            IVec2::new(6, 5),
            Direction::Left,
            IVec2::new(3, 5),
            &trails,
            &mut rng,
        );
        assert_eq!(trails, before);
        assert!(engine.stats().nodes > 0);
    }

    #[test]
    fn test_pruning_skips_work() {
        let grid = Grid::new(30, 20).unwrap();
        let trails = TrailMap::new(grid);
        let mut pruned = DecisionEngine::new();
        let mut full = engine_no_pruning();

        let mut rng = Pcg32::seed_from_u64(5);
        pruned.choose_heading(IVec2::new(24, 10), Direction::Left, IVec2::new(6, 10), &trails, &mut rng);
        let mut rng = Pcg32::seed_from_u64(5);
        full.choose_heading(IVec2::new(24, 10), Direction::Left, IVec2::new(6, 10), &trails, &mut rng);

        assert!(pruned.stats().nodes < full.stats().nodes);
        assert!(pruned.stats().cutoffs > 0);
        assert_eq!(full.stats().cutoffs, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_pruned_matches_unpruned(
            seed in any::<u64>(),
            walls in proptest::collection::vec((0i32..9, 0i32..9), 0..25),
            cpu in (0i32..9, 0i32..9),
            human in (0i32..9, 0i32..9),
            heading in 0usize..4,
        ) {
            let grid = Grid::new(9, 9).unwrap();
            let cells: Vec<Cell> = walls.iter().map(|&(x, y)| IVec2::new(x, y)).collect();
            let trails = TrailMap::from_trails(grid, &[], &cells);
            let cpu = IVec2::new(cpu.0, cpu.1);
            let human = IVec2::new(human.0, human.1);
            prop_assume!(cpu != human && !trails.is_blocked(cpu) && !trails.is_blocked(human));
            let heading = Direction::ALL[heading];

            let mut pruned = DecisionEngine::new();
            let mut full = engine_no_pruning();
            let mut rng_a = Pcg32::seed_from_u64(seed);
            let mut rng_b = Pcg32::seed_from_u64(seed);

            let a = pruned.branch_evals(cpu, heading, human, &trails, &mut rng_a);
            let b = full.branch_evals(cpu, heading, human, &trails, &mut rng_b);
            prop_assert_eq!(&a, &b);

            let mut rng_a = Pcg32::seed_from_u64(seed);
            let mut rng_b = Pcg32::seed_from_u64(seed);
            let pick_a = pruned.choose_heading(cpu, heading, human, &trails, &mut rng_a);
            let pick_b = full.choose_heading(cpu, heading, human, &trails, &mut rng_b);
            prop_assert_eq!(pick_a, pick_b);

            // Whatever comes back is a legal compass heading
            if let Some(dir) = pick_a {
                let next = dir.step(cpu);
                prop_assert!(!trails.is_blocked(next));
                prop_assert!(next != human);
                prop_assert!(!dir.is_reverse_of(heading));
            }
        }
    }
}
