//! `CachedPuzzleSolver`: a bounded, near-match-tolerant solution cache
//! fronting a background DFS solve.
//!
//! The same physical puzzle is read many times a second as the camera
//! tracks it, and the digit classifier occasionally misreads a cell from
//! one frame to the next. Re-running the backtracking solver from scratch
//! on every frame is wasted work, and worse, a single misread digit can
//! turn a previously-solved puzzle into a contradiction that looks
//! unsolvable. The cache instead remembers recent solutions and, when a new
//! reading mostly agrees with one of them, trusts the cached solution over
//! the handful of disagreeing cells rather than re-deriving it.
//!
//! Solving runs on a background `std::thread` so a slow or pathological
//! puzzle never stalls the per-frame pipeline; the caller polls
//! non-blockingly for the result, following this crate's plain
//! `std::thread`/`std::sync::mpsc` concurrency model (no async runtime).

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::game::Game;
use crate::solve;

/// Maximum number of given cells allowed to disagree with a cached
/// solution before that cache entry is considered a different puzzle
/// rather than an OCR error on the same one.
pub const NEAR_MATCH_MAX_DIFFERENCES: usize = 3;

/// Default number of recent solutions retained.
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Puzzles with fewer non-blank cells than this are rejected outright: too
/// few clues make the search space explode, so no background solve is
/// ever launched for them.
pub const MIN_GIVEN_DIGITS: usize = 21;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CacheEntry {
    givens: Game,
    solution: Game,
    recently_used_count: u32,
}

/// Outcome of one [`CachedPuzzleSolver::submit`] call.
#[derive(Debug)]
pub enum SolveOutcome {
    /// A cached solution (exact or near-match) was available immediately.
    Cached(Game),
    /// No usable cache entry; a background solve has been started (or one
    /// was already running for a different request and keeps running).
    Pending,
    /// The givens are contradictory; no background solve was started.
    Unsolvable,
}

/// Fronts the pure [`solve::solve`] backtracking search with a bounded,
/// near-match-tolerant cache and a non-blocking background worker.
pub struct CachedPuzzleSolver {
    capacity: usize,
    entries: VecDeque<CacheEntry>,
    pending: Option<Receiver<Option<Game>>>,
    pending_givens: Option<Game>,
}

impl Default for CachedPuzzleSolver {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl CachedPuzzleSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            pending: None,
            pending_givens: None,
        }
    }

    /// True while a background solve is in flight.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Look for a cached solution that still satisfies `givens` within
    /// [`NEAR_MATCH_MAX_DIFFERENCES`], promoting a hit to most-recently-used
    /// and bumping its hit counter.
    fn find_near_match(&mut self, givens: &Game) -> Option<Game> {
        let position = self.entries.iter().position(|entry| {
            mismatch_count(givens, &entry.solution) <= NEAR_MATCH_MAX_DIFFERENCES
        })?;

        let mut entry = self.entries.remove(position).expect("position is valid");
        entry.recently_used_count += 1;
        let solution = entry.solution;
        self.entries.push_front(entry);
        Some(solution)
    }

    fn insert(&mut self, givens: Game, solution: Game) {
        self.entries.push_front(CacheEntry {
            givens,
            solution,
            recently_used_count: 1,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// The cached solution with the highest recently-used hit counter, or
    /// `None` if the cache is empty.
    pub fn most_likely_solution(&self) -> Option<Game> {
        self.entries
            .iter()
            .max_by_key(|entry| entry.recently_used_count)
            .map(|entry| entry.solution)
    }

    /// Request a solution for `givens`. Never blocks: either a cached
    /// answer is returned immediately, a background solve is kicked off (or
    /// already running), or the givens are flagged unsolvable or too sparse
    /// outright.
    ///
    /// If a background solve is already in flight, a new `givens` that
    /// doesn't match the cache is simply dropped on the floor (the caller
    /// is expected to call `submit` again on a later frame — this isn't a
    /// queue, it tracks at most one in-flight solve at a time).
    ///
    /// A board with fewer than [`MIN_GIVEN_DIGITS`] non-blank cells never
    /// starts a background solve — too few clues blow up the search space —
    /// and reports `Pending` ("not ready") instead.
    pub fn submit(&mut self, givens: Game) -> SolveOutcome {
        if let Some(solution) = self.find_near_match(&givens) {
            return SolveOutcome::Cached(solution);
        }

        if self.is_busy() {
            return SolveOutcome::Pending;
        }

        if !givens.is_consistent() {
            return SolveOutcome::Unsolvable;
        }

        if givens.given_count() < MIN_GIVEN_DIGITS {
            return SolveOutcome::Pending;
        }

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = solve::solve(&givens);
            let _ = tx.send(result);
        });
        self.pending = Some(rx);
        self.pending_givens = Some(givens);
        SolveOutcome::Pending
    }

    /// Non-blocking poll of the in-flight background solve, if any. Caches
    /// a successful result before returning it.
    pub fn poll(&mut self) -> Option<SolveOutcome> {
        let rx = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(Some(solution)) => {
                self.pending = None;
                let givens = self.pending_givens.take().expect("set alongside pending");
                self.insert(givens, solution);
                Some(SolveOutcome::Cached(solution))
            }
            Ok(None) => {
                self.pending = None;
                self.pending_givens = None;
                Some(SolveOutcome::Unsolvable)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                self.pending_givens = None;
                Some(SolveOutcome::Unsolvable)
            }
        }
    }
}

fn mismatch_count(givens: &Game, solution: &Game) -> usize {
    (0..81)
        .filter(|&i| {
            let g = givens.cell(i);
            g != 0 && g != solution.cell(i)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    // The classic 30-clue newspaper puzzle and its unique solution, reused
    // across these tests so `submit` always sees a board that clears the
    // `MIN_GIVEN_DIGITS` gate.
    #[rustfmt::skip]
    const PUZZLE: [u8; 81] = [
        5, 3, 0, 0, 7, 0, 0, 0, 0,
        6, 0, 0, 1, 9, 5, 0, 0, 0,
        0, 9, 8, 0, 0, 0, 0, 6, 0,
        8, 0, 0, 0, 6, 0, 0, 0, 3,
        4, 0, 0, 8, 0, 3, 0, 0, 1,
        7, 0, 0, 0, 2, 0, 0, 0, 6,
        0, 6, 0, 0, 0, 0, 2, 8, 0,
        0, 0, 0, 4, 1, 9, 0, 0, 5,
        0, 0, 0, 0, 8, 0, 0, 7, 9,
    ];

    #[rustfmt::skip]
    const SOLVED: [u8; 81] = [
        5, 3, 4, 6, 7, 8, 9, 1, 2,
        6, 7, 2, 1, 9, 5, 3, 4, 8,
        1, 9, 8, 3, 4, 2, 5, 6, 7,
        8, 5, 9, 7, 6, 1, 4, 2, 3,
        4, 2, 6, 8, 5, 3, 7, 9, 1,
        7, 1, 3, 9, 2, 4, 8, 5, 6,
        9, 6, 1, 5, 3, 7, 2, 8, 4,
        2, 8, 7, 4, 1, 9, 6, 3, 5,
        3, 4, 5, 2, 8, 6, 1, 7, 9,
    ];

    fn poll_until_cached(solver: &mut CachedPuzzleSolver) -> Game {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(SolveOutcome::Cached(g)) = solver.poll() {
                return g;
            }
            assert!(Instant::now() < deadline, "background solve never completed");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn exact_repeat_is_served_from_cache() {
        let mut solver = CachedPuzzleSolver::new();
        let givens = Game::from_array(PUZZLE);

        match solver.submit(givens) {
            SolveOutcome::Pending => {}
            other => panic!("expected a background solve to start, got {other:?}"),
        }
        let solution = poll_until_cached(&mut solver);
        assert_eq!(solution.to_array(), SOLVED);

        match solver.submit(givens) {
            SolveOutcome::Cached(cached) => assert_eq!(cached, solution),
            other => panic!("expected cache hit, got {other:?}"),
        }
    }

    #[test]
    fn near_match_tolerates_a_few_misread_digits() {
        let mut solver = CachedPuzzleSolver::new();
        let givens = Game::from_array(PUZZLE);
        solver.submit(givens);
        let solution = poll_until_cached(&mut solver);

        // Flip two cells to some other value: still within tolerance.
        let mut cells = PUZZLE;
        let mut flipped = 0;
        for c in cells.iter_mut() {
            if *c != 0 {
                *c = *c % 9 + 1;
                flipped += 1;
                if flipped == 2 {
                    break;
                }
            }
        }
        let noisy = Game::from_array(cells);

        match solver.submit(noisy) {
            SolveOutcome::Cached(cached) => assert_eq!(cached, solution),
            other => panic!("expected near-match cache hit, got {other:?}"),
        }
    }

    #[test]
    fn too_many_differences_triggers_a_fresh_solve() {
        let mut solver = CachedPuzzleSolver::new();
        solver.submit(Game::from_array(PUZZLE));
        poll_until_cached(&mut solver);

        // Five given cells, all disagreeing with the cached solution (more
        // than NEAR_MATCH_MAX_DIFFERENCES), with a duplicate digit in row 0
        // making the board itself contradictory.
        let mut cells = [0u8; 81];
        cells[0] = 1;
        cells[1] = 1;
        cells[2] = 2;
        cells[3] = 2;
        cells[4] = 3;
        let contradictory = Game::from_array(cells);

        match solver.submit(contradictory) {
            SolveOutcome::Unsolvable => {}
            other => panic!("expected unsolvable, got {other:?}"),
        }
    }

    #[test]
    fn sparse_board_returns_pending_without_launching_a_task() {
        // The first 20 givens of PUZZLE: one fewer than MIN_GIVEN_DIGITS, and
        // necessarily consistent since it's a subset of a valid puzzle.
        let mut cells = [0u8; 81];
        let mut filled = 0;
        for (i, &v) in PUZZLE.iter().enumerate() {
            if v != 0 && filled < 20 {
                cells[i] = v;
                filled += 1;
            }
        }
        let givens = Game::from_array(cells);
        assert_eq!(givens.given_count(), 20);
        assert!(givens.is_consistent());

        let mut solver = CachedPuzzleSolver::new();
        match solver.submit(givens) {
            SolveOutcome::Pending => {}
            other => panic!("expected not-ready, got {other:?}"),
        }
        assert!(!solver.is_busy(), "a sparse board must not start a background solve");
    }

    #[test]
    fn bounded_capacity_evicts_oldest_entry() {
        let mut solver = CachedPuzzleSolver::with_capacity(1);
        let solved = Game::from_array(SOLVED);
        solver.insert(Game::empty(), solved);
        solver.insert(Game::from_array(PUZZLE), solved);
        assert_eq!(solver.entries.len(), 1);
    }

    #[test]
    fn most_likely_solution_tracks_the_most_hit_entry() {
        let mut solver = CachedPuzzleSolver::new();
        let solved = Game::from_array(SOLVED);
        solver.insert(Game::from_array(PUZZLE), solved);
        assert_eq!(solver.most_likely_solution(), Some(solved));

        solver.find_near_match(&Game::from_array(PUZZLE));
        assert_eq!(solver.most_likely_solution(), Some(solved));
    }

    #[test]
    fn most_likely_solution_is_none_when_cache_is_empty() {
        let solver = CachedPuzzleSolver::new();
        assert_eq!(solver.most_likely_solution(), None);
    }
}
