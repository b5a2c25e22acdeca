//! End-to-end TCO recompute.
//!
//! One call runs the full chain for a scenario: validate the request,
//! compose annual line items for every selected technology plus the diesel
//! baseline, scale recurring items to the holding period, allocate CAPEX
//! subsidies against the baseline and aggregate the selection into a
//! `CostBreakdown`.

use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::breakdown::{aggregate, CostBreakdown};
use crate::compose::{
    compose_technology, CompositionContext, CostLedger, TechnologyAssumptions,
    TechnologyComposition,
};
use crate::config::{InputBounds, TcoConfig};
use crate::error::TcoError;
use crate::normalize::ElectricityPriceOverride;
use crate::reference::ReferenceData;
use crate::subsidy::{allocate_subsidies, SubsidyAllocation};
use crate::types::{
    mul, with_metadata, ComputationOutput, ModelYear, Money, Rate, Technology, WeightClass,
    Years,
};
use crate::TcoResult;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Scenario-wide policy and operating parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyParameters {
    /// EUR per tonne CO2e; the reference table price for the year when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_price_per_tonne: Option<Money>,
    /// Share of the extra CAPEX over diesel that is subsidised (0-1).
    pub subsidy_rate: Rate,
    /// Holding period in years.
    pub observation_years: Years,
    /// Share of the purchase price recovered at the end of the period (0-1).
    pub residual_value: Rate,
    /// Annual mileage (km).
    pub annual_mileage: Decimal,
}

impl Default for PolicyParameters {
    fn default() -> Self {
        Self {
            co2_price_per_tonne: None,
            subsidy_rate: dec!(0.8),
            observation_years: 5,
            residual_value: Decimal::ZERO,
            annual_mileage: dec!(136750),
        }
    }
}

/// Everything the user sets for one recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcoRequest {
    /// Technologies to display, in display order.
    pub technologies: Vec<Technology>,
    pub year: ModelYear,
    pub weight_class: WeightClass,
    pub policy: PolicyParameters,
    /// Overrides of reference values, per technology.
    pub assumptions: BTreeMap<Technology, TechnologyAssumptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electricity_override: Option<ElectricityPriceOverride>,
}

impl Default for TcoRequest {
    fn default() -> Self {
        Self {
            technologies: vec![Technology::Bev, Technology::Fcev],
            year: ModelYear::default(),
            weight_class: WeightClass::default(),
            policy: PolicyParameters::default(),
            assumptions: BTreeMap::new(),
            electricity_override: None,
        }
    }
}

/// Intermediate state of a recompute, before aggregation.
#[derive(Debug, Clone)]
pub struct ScenarioLedger {
    /// Period-scaled, subsidy-adjusted line items of every composed technology.
    pub ledger: CostLedger,
    pub compositions: BTreeMap<Technology, TechnologyComposition>,
    pub allocations: Vec<SubsidyAllocation>,
    /// CO2 price actually used (EUR/t).
    pub co2_price_per_tonne: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a full TCO recompute for `request`.
pub fn compute(
    reference: &ReferenceData,
    config: &TcoConfig,
    request: &TcoRequest,
) -> TcoResult<ComputationOutput<CostBreakdown>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    validate_request(request, &config.bounds)?;

    let policy = &request.policy;
    let mut breakdown =
        CostBreakdown::empty(request.year, request.weight_class, policy.observation_years);

    if request.technologies.is_empty() {
        warnings.push("No technology selected; nothing to compare".into());
    } else {
        let scenario = build_ledger(reference, config, request, &mut warnings)?;

        let total_km = mul(
            policy.annual_mileage,
            Decimal::from(policy.observation_years),
            "kilometres over the holding period",
        )?;
        breakdown.technologies = aggregate(
            &scenario.ledger,
            request.year,
            &request.technologies,
            &scenario.compositions,
            total_km,
        )?;
        breakdown.subsidies = scenario
            .allocations
            .into_iter()
            .filter(|a| request.technologies.contains(&a.technology))
            .collect();
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Truck TCO: normalised energy cost, period-scaled line items, capped CAPEX subsidy vs diesel",
        request,
        warnings,
        elapsed,
        breakdown,
    ))
}

/// Compose, scale and subsidise every technology the request needs.
///
/// The diesel baseline is always composed, since subsidies and deltas are
/// measured against it; it only appears in the breakdown when selected.
pub fn build_ledger(
    reference: &ReferenceData,
    config: &TcoConfig,
    request: &TcoRequest,
    warnings: &mut Vec<String>,
) -> TcoResult<ScenarioLedger> {
    let policy = &request.policy;
    let year = request.year;

    // --- CO2 price ---
    let co2_price_per_tonne = match policy.co2_price_per_tonne {
        Some(p) => p,
        None => {
            let p = reference.co2_price(year)?;
            warnings.push(format!(
                "CO2 price not supplied; using {p} EUR/t from the reference table for {year}"
            ));
            p
        }
    };

    // --- Working set: selection plus baseline ---
    let mut working: Vec<Technology> = Vec::with_capacity(request.technologies.len() + 1);
    if !request.technologies.contains(&Technology::BASELINE) {
        working.push(Technology::BASELINE);
        warnings.push(format!(
            "{} computed as subsidy reference but not displayed",
            Technology::BASELINE
        ));
    }
    working.extend(request.technologies.iter().copied());

    for technology in request.assumptions.keys() {
        if !working.contains(technology) {
            warnings.push(format!(
                "Assumptions for {technology} ignored; technology not selected"
            ));
        }
    }

    if let Some(o) = &request.electricity_override {
        let grid: Vec<String> = working
            .iter()
            .filter(|t| t.uses_grid_electricity())
            .map(|t| t.to_string())
            .collect();
        if grid.is_empty() {
            warnings.push(format!(
                "Electricity price for {} ignored; no grid-charged technology selected",
                o.country
            ));
        } else {
            warn!(country = %o.country, price = %o.price_per_kwh, "electricity price override");
            warnings.push(format!(
                "Electricity price for {} ({} EUR/kWh) replaces the reference price for {}",
                o.country,
                o.price_per_kwh,
                grid.join(", ")
            ));
        }
    }

    // --- Compose ---
    let ctx = CompositionContext {
        year,
        weight_class: request.weight_class,
        annual_mileage: policy.annual_mileage,
        residual_value: policy.residual_value,
        co2_price_per_tonne,
        electricity_override: request.electricity_override.as_ref(),
        constants: &config.constants,
    };

    let defaults = TechnologyAssumptions::default();
    let mut ledger = CostLedger::new();
    let mut compositions = BTreeMap::new();
    for &technology in &working {
        let assumptions = request.assumptions.get(&technology).unwrap_or(&defaults);
        let composition = compose_technology(reference, technology, assumptions, &ctx)?;
        ledger.extend(composition.items.iter().cloned())?;
        compositions.insert(technology, composition);
    }
    debug!(items = ledger.len(), technologies = working.len(), "composed ledger");

    // --- Scale ---
    ledger.scale_to_period(policy.observation_years)?;
    debug!(years = policy.observation_years, "scaled recurring items");

    // --- Subsidy ---
    let allocations = allocate_subsidies(&mut ledger, year, &working, policy.subsidy_rate)?;

    Ok(ScenarioLedger {
        ledger,
        compositions,
        allocations,
        co2_price_per_tonne,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, reason: String) -> TcoError {
    TcoError::InvalidInput {
        field: field.into(),
        reason,
    }
}

pub fn validate_request(request: &TcoRequest, bounds: &InputBounds) -> TcoResult<()> {
    for (i, technology) in request.technologies.iter().enumerate() {
        if request.technologies[..i].contains(technology) {
            return Err(invalid(
                "technologies",
                format!("{technology} selected more than once"),
            ));
        }
    }

    let policy = &request.policy;
    if policy.observation_years < bounds.min_observation_years
        || policy.observation_years > bounds.max_observation_years
    {
        return Err(invalid(
            "observation_years",
            format!(
                "Observation period must be between {} and {} years",
                bounds.min_observation_years, bounds.max_observation_years
            ),
        ));
    }
    if policy.annual_mileage < bounds.min_annual_mileage
        || policy.annual_mileage > bounds.max_annual_mileage
    {
        return Err(invalid(
            "annual_mileage",
            format!(
                "Annual mileage must be between {} and {} km",
                bounds.min_annual_mileage, bounds.max_annual_mileage
            ),
        ));
    }
    if let Some(p) = policy.co2_price_per_tonne {
        if p < Decimal::ZERO || p > bounds.max_co2_price {
            return Err(invalid(
                "co2_price_per_tonne",
                format!("CO2 price must be between 0 and {} EUR/t", bounds.max_co2_price),
            ));
        }
    }
    if policy.subsidy_rate < Decimal::ZERO || policy.subsidy_rate > Decimal::ONE {
        return Err(invalid(
            "subsidy_rate",
            "Subsidy rate must be between 0 and 1".into(),
        ));
    }
    if policy.residual_value < Decimal::ZERO || policy.residual_value > Decimal::ONE {
        return Err(invalid(
            "residual_value",
            "Residual value must be between 0 and 1".into(),
        ));
    }
    if let Some(o) = &request.electricity_override {
        bounds
            .overrides
            .energy_cost
            .check("electricity_override.price_per_kwh", o.price_per_kwh)?;
    }
    for (technology, assumptions) in &request.assumptions {
        assumptions.validate(*technology, &bounds.overrides)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
