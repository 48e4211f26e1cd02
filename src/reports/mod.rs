// Reports module - valuation and profit/loss figures

pub mod portfolio;

pub use portfolio::{
    build_report, percent_of, summarize, value_position, PortfolioReport, PortfolioSummary,
    PositionReport, PositionValuation, Valuation, OUT_OF_RANGE,
};
