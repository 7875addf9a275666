//! Testing utilities and helpers
//!
//! - **[`assertions`]**: float and error-message assertions
//! - **[`temp`]**: self-deleting scratch directories for database and config
//!   files
//!
//! ```rust
//! use minetally_common::testing::{assert_approx_eq, TempDir};
//!
//! let dir = TempDir::new("doc").unwrap();
//! assert!(dir.path().exists());
//! assert_approx_eq(0.1 + 0.2, 0.3, 1e-12);
//! ```

pub mod assertions;
pub mod temp;

// Macros exported with #[macro_export] are available at crate root
pub use assertions::{assert_all_approx_eq, assert_approx_eq, assert_sorted};
pub use temp::TempDir;
