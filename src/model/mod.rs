//! Pure data structures: identifiers, the status vocabulary, order payloads and history entries.

pub mod history;
pub mod ids;
pub mod order;
pub mod status;

pub use history::*;
pub use ids::*;
pub use order::*;
pub use status::*;
