pub mod holdings_model;
pub mod holdings_service;

pub use holdings_model::{
    sample_holdings, Holding, HoldingRow, HoldingSource, MergePolicy, SortDirection, SortField,
};
pub use holdings_service::{
    classify_symbol, filter_rows, sort_rows, sorted_view, total_value, weighted_change_percent,
    HoldingsService,
};
