use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::db::Holding;

/// Figures for one holding at a resolved price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionValuation {
    pub price: Decimal,
    pub market_value: Decimal,
    pub cost_value: Decimal,
    pub gain_loss: Decimal,
    /// Zero when the cost value is zero
    pub gain_loss_pct: Decimal,
}

/// Outcome of pricing one holding during a refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Valuation {
    Priced(PositionValuation),
    /// No quote could be resolved; excluded from the summary
    Unpriced { reason: String },
}

impl Valuation {
    pub fn priced(&self) -> Option<&PositionValuation> {
        match self {
            Valuation::Priced(v) => Some(v),
            Valuation::Unpriced { .. } => None,
        }
    }

    pub fn is_priced(&self) -> bool {
        self.priced().is_some()
    }
}

/// Aggregate over priced positions only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortfolioSummary {
    pub total_cost: Decimal,
    pub total_market: Decimal,
    pub total_gain_loss: Decimal,
    /// Zero when the total cost is zero
    pub total_gain_loss_pct: Decimal,
    pub priced_count: usize,
    pub unpriced_count: usize,
}

/// A holding paired with its valuation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionReport {
    pub holding: Holding,
    pub valuation: Valuation,
}

/// Complete portfolio report, positions in holding order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioReport {
    pub positions: Vec<PositionReport>,
    pub summary: PortfolioSummary,
}

impl PortfolioReport {
    pub fn position(&self, symbol: &str) -> Option<&PositionReport> {
        self.positions.iter().find(|p| p.holding.symbol == symbol)
    }
}

/// Reason given for a position whose figures do not fit in a `Decimal`
pub const OUT_OF_RANGE: &str = "value out of range";

/// `part / whole * 100`, or zero when `whole` is not positive.
///
/// `None` when the ratio overflows.
pub fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole > Decimal::ZERO {
        part.checked_div(whole)?.checked_mul(Decimal::ONE_HUNDRED)
    } else {
        Some(Decimal::ZERO)
    }
}

/// Value a holding at `price`, or `None` if any figure overflows
pub fn value_position(holding: &Holding, price: Decimal) -> Option<PositionValuation> {
    let market_value = holding.shares.checked_mul(price)?;
    let cost_value = holding.cost_value()?;
    let gain_loss = market_value.checked_sub(cost_value)?;

    Some(PositionValuation {
        price,
        market_value,
        cost_value,
        gain_loss,
        gain_loss_pct: percent_of(gain_loss, cost_value)?,
    })
}

/// Fold a priced position into the running totals.
///
/// Returns false, leaving the totals untouched, for negative figures or when
/// a total would overflow.
fn accumulate(summary: &mut PortfolioSummary, v: &PositionValuation) -> bool {
    if v.cost_value < Decimal::ZERO || v.market_value < Decimal::ZERO {
        return false;
    }
    match (
        summary.total_cost.checked_add(v.cost_value),
        summary.total_market.checked_add(v.market_value),
    ) {
        (Some(cost), Some(market)) => {
            summary.total_cost = cost;
            summary.total_market = market;
            true
        }
        _ => false,
    }
}

/// Sum priced positions; unpriced ones (and any that cannot be summed) are
/// only counted
pub fn summarize(positions: &[PositionReport]) -> PortfolioSummary {
    let mut summary = PortfolioSummary::default();

    for position in positions {
        let counted = match &position.valuation {
            Valuation::Priced(v) => accumulate(&mut summary, v),
            Valuation::Unpriced { .. } => false,
        };
        if counted {
            summary.priced_count += 1;
        } else {
            summary.unpriced_count += 1;
        }
    }

    // Both totals are non-negative
    summary.total_gain_loss = summary.total_market - summary.total_cost;
    summary.total_gain_loss_pct =
        percent_of(summary.total_gain_loss, summary.total_cost).unwrap_or_else(|| {
            warn!("Portfolio return is out of range, reporting 0%");
            Decimal::ZERO
        });
    summary
}

/// Pair positions with their summary.
///
/// A priced position that cannot be added to the totals is reported as
/// unpriced, so the summary always covers exactly the priced positions.
pub fn build_report(mut positions: Vec<PositionReport>) -> PortfolioReport {
    let mut running = PortfolioSummary::default();
    for position in positions.iter_mut() {
        let fits = match &position.valuation {
            Valuation::Priced(v) => accumulate(&mut running, v),
            Valuation::Unpriced { .. } => true,
        };
        if !fits {
            warn!("Excluding {} from totals: {}", position.holding.symbol, OUT_OF_RANGE);
            position.valuation = Valuation::Unpriced {
                reason: OUT_OF_RANGE.to_string(),
            };
        }
    }

    let summary = summarize(&positions);
    PortfolioReport { positions, summary }
}
