//! Conversion-factor solver
//!
//! Estimates tonnes-per-bucket and tonnes-per-truckload factors per
//! configuration group from a month's primary counts and its reconciled
//! production and development tonnages.

pub mod counts;
pub mod ports;
pub mod service;
pub mod solver;

pub use counts::unit_counts;
pub use ports::{FactorRepository, FactorTransaction, MonthActivity};
pub use service::FactorService;
pub use solver::{solve_factors, FactorProblem, SolverOutcome, SolverSettings};
