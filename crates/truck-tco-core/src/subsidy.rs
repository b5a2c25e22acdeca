//! CAPEX subsidy allocation.
//!
//! A technology whose upfront cost (purchase + infrastructure) exceeds the
//! diesel purchase cost receives `subsidy_rate` of the gap. The money first
//! offsets infrastructure up to `infrastructure x subsidy_rate`; when the
//! subsidy is larger than that headroom, infrastructure is cut by the full
//! rate and the remainder lowers the purchase cost. Technologies already
//! cheaper than diesel receive nothing.
//!
//! The subsidy is recorded as a non-positive `CostType::Subsidy` line item.
//! It has already been absorbed into purchase and infrastructure cost, so it
//! never counts towards totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compose::{CostLedger, CostLineItem};
use crate::error::TcoError;
use crate::types::{add, mul, sub, CostType, ModelYear, Money, Rate, Technology};
use crate::TcoResult;

/// Which line items absorbed a technology's subsidy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsidyTarget {
    /// No subsidy (already cheaper than diesel, or zero rate).
    None,
    /// Entire subsidy deducted from infrastructure cost.
    Infrastructure,
    /// Infrastructure cut by the full rate, remainder off the purchase cost.
    PurchaseAndInfrastructure,
}

/// Subsidy outcome for one technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsidyAllocation {
    pub technology: Technology,
    /// Diesel purchase cost minus (purchase + infrastructure); negative when
    /// the technology costs more upfront.
    pub extra_capex: Money,
    /// Clamped subsidy, zero or negative.
    pub subsidy: Money,
    /// Infrastructure x subsidy rate.
    pub infrastructure_headroom: Money,
    /// Change applied to the purchase cost line item.
    pub purchase_adjustment: Money,
    /// Change applied to the infrastructure line item.
    pub infrastructure_adjustment: Money,
    pub target: SubsidyTarget,
}

fn ledger_amount(
    ledger: &CostLedger,
    technology: Technology,
    year: ModelYear,
    cost_type: CostType,
) -> TcoResult<Money> {
    ledger
        .get(technology, year, cost_type)
        .map(|i| i.amount)
        .ok_or_else(|| TcoError::InvalidInput {
            field: "ledger".into(),
            reason: format!("No {cost_type} line item for {technology} / {year}"),
        })
}

/// Apply the CAPEX subsidy to every non-baseline technology in `technologies`.
///
/// The ledger must already hold the final ICEV purchase cost for `year`;
/// without it the subsidy gap has no reference point.
pub fn allocate_subsidies(
    ledger: &mut CostLedger,
    year: ModelYear,
    technologies: &[Technology],
    subsidy_rate: Rate,
) -> TcoResult<Vec<SubsidyAllocation>> {
    if subsidy_rate < Decimal::ZERO || subsidy_rate > Decimal::ONE {
        return Err(TcoError::InvalidInput {
            field: "subsidy_rate".into(),
            reason: "Subsidy rate must be between 0 and 1".into(),
        });
    }

    let baseline_purchase = ledger
        .get(Technology::BASELINE, year, CostType::PurchaseCost)
        .map(|i| i.amount)
        .ok_or(TcoError::MissingBaseline)?;

    let mut allocations = Vec::new();
    for &technology in technologies.iter().filter(|t| !t.is_baseline()) {
        let purchase = ledger_amount(ledger, technology, year, CostType::PurchaseCost)?;
        let infrastructure = ledger_amount(ledger, technology, year, CostType::Infrastructure)?;

        let capex = add(purchase, infrastructure, "upfront cost")?;
        let extra_capex = sub(baseline_purchase, capex, "extra CAPEX over diesel")?;
        let raw_subsidy = mul(extra_capex, subsidy_rate, "subsidy")?;
        let subsidy = if raw_subsidy > Decimal::ZERO {
            Decimal::ZERO
        } else {
            raw_subsidy
        };
        let headroom = mul(infrastructure, subsidy_rate, "infrastructure headroom")?;

        let (new_purchase, new_infrastructure, target) = if subsidy.abs() > headroom {
            (
                add(purchase, subsidy + headroom, "subsidised purchase")?,
                infrastructure - headroom,
                SubsidyTarget::PurchaseAndInfrastructure,
            )
        } else if subsidy.is_zero() {
            (purchase, infrastructure, SubsidyTarget::None)
        } else {
            (purchase, infrastructure + subsidy, SubsidyTarget::Infrastructure)
        };

        // Recording the subsidy first rejects a second allocation before any
        // amount is touched.
        let weight_class = ledger
            .get(technology, year, CostType::PurchaseCost)
            .map(|i| i.weight_class)
            .unwrap_or_default();
        ledger.insert(CostLineItem {
            technology,
            cost_type: CostType::Subsidy,
            year,
            amount: subsidy,
            is_recurring: false,
            weight_class,
        })?;
        if let Some(item) = ledger.get_mut(technology, year, CostType::PurchaseCost) {
            item.amount = new_purchase;
        }
        if let Some(item) = ledger.get_mut(technology, year, CostType::Infrastructure) {
            item.amount = new_infrastructure;
        }

        debug!(%technology, %extra_capex, %subsidy, ?target, "allocated capex subsidy");

        allocations.push(SubsidyAllocation {
            technology,
            extra_capex,
            subsidy,
            infrastructure_headroom: headroom,
            purchase_adjustment: new_purchase - purchase,
            infrastructure_adjustment: new_infrastructure - infrastructure,
            target,
        });
    }
    Ok(allocations)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
