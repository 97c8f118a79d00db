//! Pure stages between classification and recipe lookup.
//!
//! This crate provides:
//! - `normalize` for turning a classifier label into a search query
//! - `select_labels` for picking which ranked labels get a lookup
//!
//! ## Architecture
//! Both stages are deterministic and do no I/O:
//! 1. The classifier ranks labels
//! 2. `select_labels` keeps the top N, normalizing each to a query
//! 3. The orchestrator sends one provider lookup per selected query
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{normalize, select_labels};
//!
//! assert_eq!(normalize("apple_pie"), "apple pie");
//!
//! let selected = select_labels(&predictions, 2);
//! for label in &selected {
//!     println!("{} -> {}", label.label, label.query);
//! }
//! ```

pub mod query;
pub mod selection;

// Re-export main types
pub use query::normalize;
pub use selection::{SelectedLabel, select_labels};
