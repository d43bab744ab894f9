pub mod accounts_model;
pub mod accounts_service;

pub use accounts_model::{position_value, ParsedPortfolio, ParsedPosition, PositionKind};
pub use accounts_service::{parse_accounts, AccountTransactions, AccountsService};
