//! Cost composition per technology.
//!
//! Covers:
//! 1. **Purchase cost** -- price net of residual value, one-time.
//! 2. **Maintenance & repair** -- annual figure.
//! 3. **Fuel / electricity** -- kWh/km x EUR/kWh x annual mileage.
//! 4. **CO2 price** -- combustion technology only, from the diesel emission factor.
//! 5. **Toll** -- rate per km x tolled share x annual mileage.
//! 6. **Infrastructure** -- annual share of charging/refuelling build-out.
//!
//! Composition yields annual figures. `CostLedger::scale_to_period` turns the
//! recurring ones into holding-period totals exactly once.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{OverrideBounds, PhysicalConstants};
use crate::error::TcoError;
use crate::normalize::{
    normalize_consumption, normalize_energy_cost, ConsumptionRecord, ElectricityPriceOverride,
    EnergyCostRecord,
};
use crate::reference::ReferenceData;
use crate::types::{
    div, mul, sub, CostType, ModelYear, Money, Rate, Technology, WeightClass, Years,
};
use crate::TcoResult;

// ---------------------------------------------------------------------------
// Line items and ledger
// ---------------------------------------------------------------------------

/// One cost component of one technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLineItem {
    pub technology: Technology,
    pub cost_type: CostType,
    pub year: ModelYear,
    pub amount: Money,
    /// Annual figure to be multiplied by the holding period.
    pub is_recurring: bool,
    pub weight_class: WeightClass,
}

impl CostLineItem {
    fn new(
        technology: Technology,
        cost_type: CostType,
        ctx: &CompositionContext<'_>,
        amount: Money,
    ) -> Self {
        Self {
            technology,
            cost_type,
            year: ctx.year,
            amount,
            is_recurring: cost_type.is_recurring(),
            weight_class: ctx.weight_class,
        }
    }
}

/// Whether ledger amounts are per year or per holding period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBasis {
    Annual,
    Period { years: Years },
}

pub type LedgerKey = (Technology, ModelYear, CostType);

/// Line items keyed by (technology, year, cost type); at most one per key.
#[derive(Debug, Clone, PartialEq)]
pub struct CostLedger {
    items: BTreeMap<LedgerKey, CostLineItem>,
    basis: LedgerBasis,
}

impl Default for CostLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CostLedger {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            basis: LedgerBasis::Annual,
        }
    }

    pub fn basis(&self) -> LedgerBasis {
        self.basis
    }

    pub fn insert(&mut self, item: CostLineItem) -> TcoResult<()> {
        let key = (item.technology, item.year, item.cost_type);
        if self.items.contains_key(&key) {
            return Err(TcoError::DuplicateLineItem(format!(
                "{} / {} / {}",
                item.technology, item.year, item.cost_type
            )));
        }
        self.items.insert(key, item);
        Ok(())
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = CostLineItem>) -> TcoResult<()> {
        for item in items {
            self.insert(item)?;
        }
        Ok(())
    }

    pub fn get(
        &self,
        technology: Technology,
        year: ModelYear,
        cost_type: CostType,
    ) -> Option<&CostLineItem> {
        self.items.get(&(technology, year, cost_type))
    }

    pub fn get_mut(
        &mut self,
        technology: Technology,
        year: ModelYear,
        cost_type: CostType,
    ) -> Option<&mut CostLineItem> {
        self.items.get_mut(&(technology, year, cost_type))
    }

    /// Amount of a line item, zero when absent.
    pub fn amount_or_zero(
        &self,
        technology: Technology,
        year: ModelYear,
        cost_type: CostType,
    ) -> Money {
        self.get(technology, year, cost_type)
            .map(|i| i.amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// All line items of one technology and year, in cost type order.
    pub fn items_for(
        &self,
        technology: Technology,
        year: ModelYear,
    ) -> impl Iterator<Item = &CostLineItem> {
        self.items
            .values()
            .filter(move |i| i.technology == technology && i.year == year)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Multiply every recurring item by the holding period.
    ///
    /// Scaling an already-scaled ledger to the same period is a no-op; scaling
    /// it to a different period is an error, since the annual figures are gone.
    /// On overflow the ledger is left untouched.
    pub fn scale_to_period(&mut self, years: Years) -> TcoResult<()> {
        if years == 0 {
            return Err(TcoError::InvalidInput {
                field: "observation_years".into(),
                reason: "Observation period must be at least one year".into(),
            });
        }
        match self.basis {
            LedgerBasis::Period { years: scaled } if scaled == years => Ok(()),
            LedgerBasis::Period { years: scaled } => Err(TcoError::InvalidInput {
                field: "observation_years".into(),
                reason: format!(
                    "Ledger already scaled to {scaled} years; recompose before scaling to {years}"
                ),
            }),
            LedgerBasis::Annual => {
                let factor = Decimal::from(years);
                let mut scaled = Vec::new();
                for (key, item) in self.items.iter().filter(|(_, i)| i.is_recurring) {
                    let context = format!("{} over {years} years", item.cost_type);
                    scaled.push((*key, mul(item.amount, factor, &context)?));
                }
                for (key, amount) in scaled {
                    if let Some(item) = self.items.get_mut(&key) {
                        item.amount = amount;
                    }
                }
                self.basis = LedgerBasis::Period { years };
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Per-technology overrides of reference values.
///
/// Values are in the unit the reference table uses for that technology
/// (e.g. l/100km for diesel consumption, EUR/kg H2 for hydrogen price).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyAssumptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<Money>,
    /// Annual maintenance & repair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_repair: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_cost: Option<Decimal>,
    /// EUR per tolled km.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toll_rate: Option<Money>,
    /// Annual infrastructure cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<Money>,
}

impl TechnologyAssumptions {
    /// Reject overrides outside `bounds`.
    pub fn validate(&self, technology: Technology, bounds: &OverrideBounds) -> TcoResult<()> {
        let fields = [
            ("purchase_cost", self.purchase_cost, &bounds.purchase_cost),
            ("maintenance_repair", self.maintenance_repair, &bounds.maintenance_repair),
            ("consumption", self.consumption, &bounds.consumption),
            ("energy_cost", self.energy_cost, &bounds.energy_cost),
            ("toll_rate", self.toll_rate, &bounds.toll_rate),
            ("infrastructure", self.infrastructure, &bounds.infrastructure),
        ];
        for (name, value, range) in fields {
            if let Some(v) = value {
                range.check(&format!("assumptions.{technology}.{name}"), v)?;
            }
        }
        Ok(())
    }
}

/// Scenario-wide values shared by every technology in one composition pass.
#[derive(Debug, Clone)]
pub struct CompositionContext<'a> {
    pub year: ModelYear,
    pub weight_class: WeightClass,
    /// Annual mileage (km).
    pub annual_mileage: Decimal,
    /// Share of the purchase price recovered at the end of the period.
    pub residual_value: Rate,
    /// EUR per tonne CO2e.
    pub co2_price_per_tonne: Money,
    pub electricity_override: Option<&'a ElectricityPriceOverride>,
    pub constants: &'a PhysicalConstants,
}

/// Annual line items plus the normalised energy records they were built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyComposition {
    pub items: Vec<CostLineItem>,
    pub consumption: ConsumptionRecord,
    pub energy_cost: EnergyCostRecord,
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Compose the annual cost line items of one technology.
///
/// Overrides are taken as given; range checks belong to the caller.
pub fn compose_technology(
    reference: &ReferenceData,
    technology: Technology,
    assumptions: &TechnologyAssumptions,
    ctx: &CompositionContext<'_>,
) -> TcoResult<TechnologyComposition> {
    let year = ctx.year;
    let class = ctx.weight_class;
    let mut items = Vec::with_capacity(6);

    // --- Purchase ---
    let purchase_price = match assumptions.purchase_cost {
        Some(p) => p,
        None => {
            reference
                .vehicle_cost(technology, year, class, CostType::PurchaseCost)?
                .amount
        }
    };
    let purchase = mul(
        purchase_price,
        sub(Decimal::ONE, ctx.residual_value, "residual value")?,
        "purchase net of residual value",
    )?;
    items.push(CostLineItem::new(technology, CostType::PurchaseCost, ctx, purchase));

    // --- Maintenance & repair ---
    let maintenance = match assumptions.maintenance_repair {
        Some(m) => m,
        None => {
            reference
                .vehicle_cost(technology, year, class, CostType::MaintenanceRepair)?
                .amount
        }
    };
    items.push(CostLineItem::new(
        technology,
        CostType::MaintenanceRepair,
        ctx,
        maintenance,
    ));

    // --- Energy ---
    let mut consumption = reference.consumption(technology, year, class)?;
    if let Some(c) = assumptions.consumption {
        consumption.value = c;
    }
    let consumption = normalize_consumption(&consumption, ctx.constants)?;

    let mut energy_cost = reference.energy_cost(technology, year)?;
    if let Some(e) = assumptions.energy_cost {
        energy_cost.value = e;
    }
    let energy_cost =
        normalize_energy_cost(&energy_cost, ctx.constants, ctx.electricity_override)?;

    let energy = mul(
        mul(consumption.value, energy_cost.value, "energy cost per km")?,
        ctx.annual_mileage,
        "annual energy cost",
    )?;
    items.push(CostLineItem::new(
        technology,
        CostType::FuelOrElectricity,
        ctx,
        energy,
    ));

    // --- CO2 price (combustion only) ---
    if technology.is_baseline() {
        let kwh = mul(consumption.value, ctx.annual_mileage, "annual energy use")?;
        let kg = mul(kwh, ctx.constants.diesel_co2_kg_per_kwh()?, "annual CO2 emissions")?;
        let co2 = div(
            mul(kg, ctx.co2_price_per_tonne, "annual CO2 cost")?,
            dec!(1000),
            "annual CO2 cost",
        )?;
        items.push(CostLineItem::new(technology, CostType::Co2Price, ctx, co2));
    }

    // --- Toll ---
    let toll_rate = match assumptions.toll_rate {
        Some(t) => t,
        None => reference.toll_rate(technology, year, class)?,
    };
    let tolled_km = mul(
        ctx.constants.toll_mileage_share,
        ctx.annual_mileage,
        "tolled kilometres",
    )?;
    let toll = mul(toll_rate, tolled_km, "annual toll")?;
    items.push(CostLineItem::new(technology, CostType::Toll, ctx, toll));

    // --- Infrastructure ---
    let infrastructure = match assumptions.infrastructure {
        Some(i) => i,
        None => {
            reference
                .vehicle_cost(technology, year, class, CostType::Infrastructure)?
                .amount
        }
    };
    items.push(CostLineItem::new(
        technology,
        CostType::Infrastructure,
        ctx,
        infrastructure,
    ));

    debug!(
        %technology,
        %year,
        kwh_per_km = %consumption.value,
        eur_per_kwh = %energy_cost.value,
        "composed annual line items"
    );

    Ok(TechnologyComposition {
        items,
        consumption,
        energy_cost,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
