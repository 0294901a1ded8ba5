pub mod list_field;
pub mod store;
pub mod tag;

pub use store::{Store, StoreDetail, VisitationStatus};
pub use tag::{Tag, TagButton};
