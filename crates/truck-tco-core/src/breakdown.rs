//! Per-technology cost breakdown for display.
//!
//! Groups the period-scaled ledger by technology, sums every line item that
//! counts towards the total (the subsidy does not; it is already absorbed)
//! and expresses each item as a percentage share of that total.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::compose::{CostLedger, TechnologyComposition};
use crate::error::TcoError;
use crate::subsidy::SubsidyAllocation;
use crate::types::{add, div, mul, sub, CostType, ModelYear, Money, Technology, WeightClass, Years};
use crate::TcoResult;

/// One cost component of a technology's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    pub cost_type: CostType,
    pub label: String,
    pub amount: Money,
    /// Share of the technology's total, in percent.
    pub share_pct: Decimal,
}

/// Period cost of ownership of one technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyBreakdown {
    pub technology: Technology,
    pub label: String,
    pub items: Vec<BreakdownItem>,
    /// Subsidy already absorbed into purchase and infrastructure (zero or negative).
    pub subsidy: Money,
    pub total: Money,
    /// Total over all kilometres driven in the holding period.
    pub cost_per_km: Money,
    /// Total minus the diesel total.
    pub delta_to_baseline: Money,
    /// Normalised energy consumption (kWh/km).
    pub kwh_per_km: Decimal,
    /// Normalised energy price (EUR/kWh).
    pub eur_per_kwh: Decimal,
}

/// Full result of one recompute, ordered by the user's selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub year: ModelYear,
    pub weight_class: WeightClass,
    pub observation_years: Years,
    pub technologies: Vec<TechnologyBreakdown>,
    /// Subsidy outcome per displayed non-diesel technology.
    pub subsidies: Vec<SubsidyAllocation>,
}

/// Long-format row for stacked bar rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub technology: Technology,
    pub cost_type: CostType,
    pub amount: Money,
    pub share_pct: Decimal,
}

impl CostBreakdown {
    pub fn empty(year: ModelYear, weight_class: WeightClass, observation_years: Years) -> Self {
        Self {
            year,
            weight_class,
            observation_years,
            technologies: Vec::new(),
            subsidies: Vec::new(),
        }
    }

    /// One row per (technology, cost type) in selection order.
    pub fn rows(&self) -> Vec<BreakdownRow> {
        self.technologies
            .iter()
            .flat_map(|t| {
                t.items.iter().map(move |i| BreakdownRow {
                    technology: t.technology,
                    cost_type: i.cost_type,
                    amount: i.amount,
                    share_pct: i.share_pct,
                })
            })
            .collect()
    }

    pub fn get(&self, technology: Technology) -> Option<&TechnologyBreakdown> {
        self.technologies.iter().find(|t| t.technology == technology)
    }
}

/// Sum of the line items that count towards a technology's total.
pub fn technology_total(
    ledger: &CostLedger,
    technology: Technology,
    year: ModelYear,
) -> TcoResult<Money> {
    ledger
        .items_for(technology, year)
        .filter(|i| i.cost_type.counts_towards_total())
        .try_fold(Decimal::ZERO, |acc, i| add(acc, i.amount, "technology total"))
}

/// Build the breakdown for `selection`, in selection order.
///
/// `total_km` is annual mileage times the observation period. Every selected
/// technology needs a composition for its normalised energy figures.
pub fn aggregate(
    ledger: &CostLedger,
    year: ModelYear,
    selection: &[Technology],
    compositions: &BTreeMap<Technology, TechnologyComposition>,
    total_km: Decimal,
) -> TcoResult<Vec<TechnologyBreakdown>> {
    let baseline_total = technology_total(ledger, Technology::BASELINE, year)?;

    let mut out = Vec::with_capacity(selection.len());
    for &technology in selection {
        let composition = compositions
            .get(&technology)
            .ok_or_else(|| TcoError::InvalidInput {
                field: "technologies".into(),
                reason: format!("{technology} was selected but never composed"),
            })?;

        let total = technology_total(ledger, technology, year)?;
        let mut items = Vec::new();
        for i in ledger
            .items_for(technology, year)
            .filter(|i| i.cost_type.counts_towards_total())
        {
            let share_pct = if total.is_zero() {
                Decimal::ZERO
            } else {
                mul(div(i.amount, total, "cost share")?, dec!(100), "cost share")?
            };
            items.push(BreakdownItem {
                cost_type: i.cost_type,
                label: i.cost_type.label().to_string(),
                amount: i.amount,
                share_pct,
            });
        }

        out.push(TechnologyBreakdown {
            technology,
            label: technology.label().to_string(),
            items,
            subsidy: ledger.amount_or_zero(technology, year, CostType::Subsidy),
            total,
            cost_per_km: if total_km > Decimal::ZERO {
                div(total, total_km, "cost per km")?
            } else {
                Decimal::ZERO
            },
            delta_to_baseline: sub(total, baseline_total, "delta to diesel")?,
            kwh_per_km: composition.consumption.value,
            eur_per_kwh: composition.energy_cost.value,
        });
    }
    Ok(out)
}
