pub mod merge;
pub mod pagination;
pub mod result;

mod error;

pub use error::{MergeError, Result};
pub use merge::merge;
pub use pagination::Pagination;
pub use result::{BatchResponse, ChangeRecord, Cursor, ResolvedResult};
