//! Shared domain enumerations aligned with persisted database enums.
//!
//! `PostStatus` is defined in `kindred-api-types` so API clients can depend
//! on it without pulling in the server; the domain re-exports it as the
//! canonical name.

pub use kindred_api_types::PostStatus;

pub trait PostStatusExt {
    fn as_str(self) -> &'static str;
}

impl PostStatusExt for PostStatus {
    fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}
