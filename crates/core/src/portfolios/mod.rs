pub mod portfolios_model;
pub mod portfolios_service;

pub use portfolios_model::{UploadedAsset, UploadedHolding, UploadedPortfolio};
pub use portfolios_service::{
    holdings_from_portfolio, parse_portfolio, parse_portfolio_batch, PortfolioStore,
};
