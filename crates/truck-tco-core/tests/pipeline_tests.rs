use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use truck_tco_core::breakdown::technology_total;
use truck_tco_core::compose::{LedgerBasis, TechnologyAssumptions};
use truck_tco_core::config::TcoConfig;
use truck_tco_core::pipeline::{build_ledger, compute, PolicyParameters, TcoRequest};
use truck_tco_core::reference::ReferenceData;
use truck_tco_core::subsidy::SubsidyTarget;
use truck_tco_core::{CostType, ModelYear, Technology, TcoError, WeightClass};

fn reference() -> ReferenceData {
    ReferenceData::builtin().unwrap()
}

fn y2025() -> ModelYear {
    ModelYear::try_from(2025).unwrap()
}

fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, what: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{what}: expected ~{expected}, got {actual}"
    );
}

/// Diesel 40 t truck in 2025 with explicit values for every input.
fn diesel_request() -> TcoRequest {
    let mut assumptions = BTreeMap::new();
    assumptions.insert(
        Technology::Icev,
        TechnologyAssumptions {
            purchase_cost: Some(dec!(100_000)),
            maintenance_repair: Some(dec!(24_000)),
            consumption: Some(dec!(30)),
            energy_cost: Some(dec!(1.5)),
            toll_rate: Some(dec!(0.2)),
            infrastructure: Some(Decimal::ZERO),
        },
    );
    TcoRequest {
        technologies: vec![Technology::Icev],
        year: y2025(),
        weight_class: WeightClass::T40,
        policy: PolicyParameters {
            co2_price_per_tonne: Some(dec!(50)),
            subsidy_rate: dec!(0.8),
            observation_years: 5,
            residual_value: Decimal::ZERO,
            annual_mileage: dec!(136_750),
        },
        assumptions,
        electricity_override: None,
    }
}

// ===========================================================================
// Diesel reference scenario
// ===========================================================================

#[test]
fn test_diesel_scenario_line_items() {
    let out = compute(&reference(), &TcoConfig::default(), &diesel_request()).unwrap();
    let icev = out.result.get(Technology::Icev).unwrap();
    let item = |ct: CostType| {
        icev.items
            .iter()
            .find(|i| i.cost_type == ct)
            .map(|i| i.amount)
            .unwrap()
    };

    assert_eq!(item(CostType::PurchaseCost), dec!(100_000));
    assert_eq!(item(CostType::MaintenanceRepair), dec!(120_000));
    // 2.9763 kWh/km x (1.5 / 9.921) EUR/kWh x 136,750 km x 5
    assert_close(
        item(CostType::FuelOrElectricity),
        dec!(307_687.5),
        dec!(0.001),
        "fuel",
    );
    // 2.9763 kWh/km x 136,750 km x (2.65 / 9.921) kg/kWh x 50 EUR/t / 1000 x 5
    assert_close(item(CostType::Co2Price), dec!(27_179.0625), dec!(0.001), "co2");
    // 0.2 EUR/km x 0.9 x 136,750 km x 5
    assert_eq!(item(CostType::Toll), dec!(123_075));
    assert_eq!(item(CostType::Infrastructure), Decimal::ZERO);

    assert_close(icev.kwh_per_km, dec!(2.9763), dec!(0.0000001), "kwh/km");
    assert_close(icev.eur_per_kwh, dec!(0.15120), dec!(0.00001), "eur/kwh");
    assert_eq!(icev.delta_to_baseline, Decimal::ZERO);
    assert_eq!(icev.subsidy, Decimal::ZERO);
}

#[test]
fn test_total_equals_sum_of_items() {
    let mut req = diesel_request();
    req.technologies = Technology::ALL.to_vec();
    let out = compute(&reference(), &TcoConfig::default(), &req).unwrap();

    for t in &out.result.technologies {
        let sum: Decimal = t.items.iter().map(|i| i.amount).sum();
        assert_eq!(sum, t.total, "{}", t.technology);
        let share: Decimal = t.items.iter().map(|i| i.share_pct).sum();
        assert_close(share, dec!(100), dec!(0.000001), "shares");
    }
}

#[test]
fn test_co2_only_for_combustion() {
    let mut req = diesel_request();
    req.technologies = Technology::ALL.to_vec();
    let out = compute(&reference(), &TcoConfig::default(), &req).unwrap();
    for t in &out.result.technologies {
        let has_co2 = t.items.iter().any(|i| i.cost_type == CostType::Co2Price);
        assert_eq!(has_co2, t.technology.is_baseline(), "{}", t.technology);
    }
}

#[test]
fn test_zero_co2_price_gives_zero_co2_item() {
    let mut req = diesel_request();
    req.policy.co2_price_per_tonne = Some(Decimal::ZERO);
    let out = compute(&reference(), &TcoConfig::default(), &req).unwrap();
    let co2 = out
        .result
        .get(Technology::Icev)
        .unwrap()
        .items
        .iter()
        .find(|i| i.cost_type == CostType::Co2Price)
        .map(|i| i.amount);
    assert_eq!(co2, Some(Decimal::ZERO));
}

// ===========================================================================
// Subsidy
// ===========================================================================

#[test]
fn test_bev_subsidy_spills_into_purchase() {
    let mut req = diesel_request();
    req.technologies = vec![Technology::Icev, Technology::Bev];
    req.assumptions.insert(
        Technology::Bev,
        TechnologyAssumptions {
            purchase_cost: Some(dec!(150_000)),
            infrastructure: Some(dec!(4_000)),
            ..TechnologyAssumptions::default()
        },
    );

    let out = compute(&reference(), &TcoConfig::default(), &req).unwrap();
    let bev = out.result.get(Technology::Bev).unwrap();
    let item = |ct: CostType| {
        bev.items
            .iter()
            .find(|i| i.cost_type == ct)
            .map(|i| i.amount)
            .unwrap()
    };

    // Infrastructure 4,000/yr x 5 = 20,000; extra CAPEX = -70,000
    assert_eq!(bev.subsidy, dec!(-56_000));
    assert_eq!(item(CostType::PurchaseCost), dec!(110_000));
    assert_eq!(item(CostType::Infrastructure), dec!(4_000));

    let allocation = &out.result.subsidies[0];
    assert_eq!(allocation.technology, Technology::Bev);
    assert_eq!(allocation.extra_capex, dec!(-70_000));
    assert_eq!(allocation.target, SubsidyTarget::PurchaseAndInfrastructure);
}

#[test]
fn test_subsidy_lowers_total_by_subsidy_amount() {
    let mut req = diesel_request();
    req.technologies = vec![Technology::Fcev];
    req.policy.subsidy_rate = Decimal::ZERO;
    let unsubsidised = compute(&reference(), &TcoConfig::default(), &req).unwrap();

    req.policy.subsidy_rate = dec!(0.5);
    let subsidised = compute(&reference(), &TcoConfig::default(), &req).unwrap();

    let before = unsubsidised.result.get(Technology::Fcev).unwrap();
    let after = subsidised.result.get(Technology::Fcev).unwrap();
    assert_eq!(before.subsidy, Decimal::ZERO);
    assert!(after.subsidy <= Decimal::ZERO);
    assert_close(
        after.total,
        before.total + after.subsidy,
        dec!(0.000001),
        "subsidised total",
    );
}

#[test]
fn test_full_subsidy_never_undercuts_diesel_capex() {
    let mut req = diesel_request();
    req.technologies = Technology::ALL.to_vec();
    req.policy.subsidy_rate = Decimal::ONE;
    let mut warnings = Vec::new();
    let scenario =
        build_ledger(&reference(), &TcoConfig::default(), &req, &mut warnings).unwrap();

    let diesel = scenario
        .ledger
        .amount_or_zero(Technology::Icev, y2025(), CostType::PurchaseCost);
    for allocation in &scenario.allocations {
        let capex = scenario.ledger.amount_or_zero(
            allocation.technology,
            y2025(),
            CostType::PurchaseCost,
        ) + scenario.ledger.amount_or_zero(
            allocation.technology,
            y2025(),
            CostType::Infrastructure,
        );
        if allocation.extra_capex < Decimal::ZERO {
            assert_eq!(capex, diesel, "{}", allocation.technology);
        } else {
            assert!(capex <= diesel);
        }
    }
}

// ===========================================================================
// Ledger and determinism
// ===========================================================================

#[test]
fn test_ledger_scaled_exactly_once() {
    let mut warnings = Vec::new();
    let mut scenario = build_ledger(
        &reference(),
        &TcoConfig::default(),
        &diesel_request(),
        &mut warnings,
    )
    .unwrap();
    assert_eq!(scenario.ledger.basis(), LedgerBasis::Period { years: 5 });

    let before = technology_total(&scenario.ledger, Technology::Icev, y2025()).unwrap();
    scenario.ledger.scale_to_period(5).unwrap();
    assert_eq!(
        technology_total(&scenario.ledger, Technology::Icev, y2025()).unwrap(),
        before
    );
    assert!(scenario.ledger.scale_to_period(10).is_err());
}

#[test]
fn test_recompute_is_deterministic() {
    let mut req = TcoRequest::default();
    req.technologies = vec![Technology::OcBev, Technology::Icev, Technology::Bev];
    let first = compute(&reference(), &TcoConfig::default(), &req).unwrap();
    let second = compute(&reference(), &TcoConfig::default(), &req).unwrap();
    assert_eq!(first.result, second.result);
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn test_every_builtin_scenario_computes() {
    let config = TcoConfig::default();
    let reference = reference();
    for year in ModelYear::all() {
        for weight_class in WeightClass::ALL {
            let req = TcoRequest {
                technologies: Technology::ALL.to_vec(),
                year,
                weight_class,
                ..TcoRequest::default()
            };
            let out = compute(&reference, &config, &req)
                .unwrap_or_else(|e| panic!("{year} / {weight_class}: {e}"));
            assert_eq!(out.result.technologies.len(), Technology::ALL.len());
            assert!(out
                .result
                .technologies
                .iter()
                .all(|t| t.total > Decimal::ZERO));
        }
    }
}

#[test]
fn test_longer_period_raises_recurring_only() {
    let mut req = diesel_request();
    let five = compute(&reference(), &TcoConfig::default(), &req).unwrap();
    req.policy.observation_years = 10;
    let ten = compute(&reference(), &TcoConfig::default(), &req).unwrap();

    let five = five.result.get(Technology::Icev).unwrap().clone();
    let ten = ten.result.get(Technology::Icev).unwrap().clone();
    let purchase = dec!(100_000);
    assert_close(
        ten.total - purchase,
        (five.total - purchase) * dec!(2),
        dec!(0.000001),
        "recurring",
    );
    assert_close(
        ten.cost_per_km,
        ten.total / dec!(1_367_500),
        dec!(0.0000001),
        "per km",
    );
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn test_missing_reference_row_is_error() {
    let mut tables = reference().to_tables();
    tables
        .energy_cost
        .retain(|r| !(r.technology == Technology::Fcev && r.year == y2025()));
    let reference = ReferenceData::from_tables(tables).unwrap();

    let mut req = diesel_request();
    req.technologies = vec![Technology::Fcev];
    let err = compute(&reference, &TcoConfig::default(), &req).unwrap_err();
    assert!(
        matches!(err, TcoError::MissingReference { ref table, .. } if table == "energy_cost"),
        "{err}"
    );
}

#[test]
fn test_missing_baseline_row_fails_even_when_hidden() {
    let mut tables = reference().to_tables();
    tables.vehicle_cost.retain(|r| {
        !(r.technology == Technology::Icev && r.cost_type == CostType::PurchaseCost)
    });
    let reference = ReferenceData::from_tables(tables).unwrap();

    let req = TcoRequest {
        technologies: vec![Technology::Bev],
        ..TcoRequest::default()
    };
    assert!(compute(&reference, &TcoConfig::default(), &req).is_err());
}

#[test]
fn test_override_above_bound_is_invalid_input() {
    let mut req = diesel_request();
    req.technologies = vec![Technology::Icev, Technology::Bev];
    req.assumptions.insert(
        Technology::Bev,
        TechnologyAssumptions {
            purchase_cost: Some(dec!(1_000_001)),
            ..TechnologyAssumptions::default()
        },
    );
    let err = compute(&reference(), &TcoConfig::default(), &req).unwrap_err();
    assert!(
        matches!(err, TcoError::InvalidInput { ref field, .. } if field == "assumptions.BEV.purchase_cost"),
        "{err}"
    );
}
