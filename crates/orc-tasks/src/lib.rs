//! ORC Tasks - Bounded Task Coordinator
//!
//! Generic fan-out/fan-in used by every concurrent phase of the enhancement
//! pipeline:
//! - [`TaskGroup`]: submit tasks, wait for all of them, get the first error
//! - [`CancelSignal`]: shared cooperative cancellation
//!
//! # Example
//!
//! ```rust
//! use orc_tasks::TaskGroup;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let group: TaskGroup<u32, String> = TaskGroup::new(4);
//! for i in 0..3 {
//!     group.spawn(async move { Ok(i * 2) });
//! }
//! let mut doubled = group.wait().await.unwrap();
//! doubled.sort_unstable();
//! assert_eq!(doubled, vec![0, 2, 4]);
//! # }
//! ```

#![warn(missing_docs)]

pub mod cancel;
pub mod group;

// Re-exports
pub use cancel::CancelSignal;
pub use group::{TaskGroup, DEFAULT_LIMIT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
