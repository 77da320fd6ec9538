//! Sudoku constraint solving: a 10-bit candidate bitset, the board type, a
//! pure backtracking solver, and a near-match-tolerant background cache in
//! front of it.

pub mod bitset;
pub mod cache;
pub mod error;
pub mod game;
pub mod solve;

pub use bitset::CandidateSet;
pub use cache::{
    CachedPuzzleSolver, SolveOutcome, DEFAULT_CACHE_CAPACITY, MIN_GIVEN_DIGITS, NEAR_MATCH_MAX_DIFFERENCES,
};
pub use error::SolverError;
pub use game::Game;
pub use solve::solve;
