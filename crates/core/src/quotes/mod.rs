pub mod service;

pub use service::{PriceHistoryRequest, QuoteService};
