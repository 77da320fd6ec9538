use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("givens contain a digit outside 0..=9")]
    InvalidDigit,
}
