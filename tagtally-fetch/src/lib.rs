pub mod counter;
pub mod error;
pub mod fetcher;
pub mod result;

pub use counter::{TagCount, count_tag};
pub use error::FetchError;
pub use fetcher::Fetcher;
pub use result::FetchOutcome;
