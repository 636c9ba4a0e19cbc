//! Windowed recent-search fetcher.
//!
//! Splits a time range into one-day windows, searches each candidate in each
//! window, and reshapes the nested responses into flat `tweets` and `users`
//! tables ready to be written as CSV.

pub mod client;
pub mod download;
pub mod error;
pub mod reshape;
pub mod types;
pub mod window;

mod retry;

pub use client::TwitterClient;
pub use download::{download, CandidateQuery, DownloadSettings, Downloaded, CANDIDATE_COLUMN};
pub use error::TwitterError;
pub use types::SearchResponse;
pub use window::{generate_windows, parse_bound, Window};
