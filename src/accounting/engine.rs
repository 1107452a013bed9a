//! Carbon Accounting Engine
//!
//! Converts one (site, window) pair of operational records into the
//! carbon-retired ledger, the carbon-released ledger, and total biochar
//! production. All-or-nothing: the first fault aborts the run and no partial
//! ledger escapes.
//!
//! # Ledger rules
//!
//! 1. Delivered orders: liters of biochar via the formulation's biochar mass
//!    fraction, tons via site density, carbon via site carbon content, CO2eq
//!    via the stoichiometric 44/12 ratio. Zero-quantity placeholders emit no
//!    row.
//! 2. Orders that leave the site as raw biochar (not activated, external
//!    customer) release transport CO2: customer distance × vehicle per-km
//!    rate.
//! 3. Biomass inputs release transport CO2 the same way, from the supplier
//!    side.
//! 4. Electricity and diesel carbon costs convert through site/global
//!    emission factors; any other cost type is an explicit fault.
//! 5. Total biochar production is the sum of production-run quantities.
//! 6. Ledger dates are calendar dates in the fixed reporting timezone.

use crate::accounting::fault::{AccountingFault, RefEntity};
use crate::accounting::records::{CarbonCost, CostKind, Input, Order};
use crate::accounting::resolver::RefResolver;
use crate::accounting::summary::{summarize, Summary};
use crate::accounting::time::{default_reporting_offset, reporting_date};
use crate::accounting::window::Window;
use crate::store::constants::{ConstantsDoc, KeyPath};
use crate::store::paths::collection_prefix;
use crate::store::DataStore;
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Stoichiometric CO2-to-carbon mass ratio. A physical constant, never
/// configurable.
pub const CO2_PER_TON_CARBON: f64 = 44.0 / 12.0;

/// Released-row label for outbound raw-biochar transport.
pub const LABEL_RAW_BIOCHAR_TRANSPORT: &str = "Raw Biochar Transport";
/// Released-row label for inbound biomass transport.
pub const LABEL_BIOMASS_TRANSPORT: &str = "Biomass Transport";

const KEY_DENSITY: &str = "biocharDensityKgPerL";
const KEY_CARBON_CONTENT: &str = "biocharCarbonContent";
const KEY_GRAMS_PER_KWH: &str = "gramsCO2PerKWh";
const KEY_DIESEL_KG_PER_L: &str = "dieselKgCO2PerL";
const KEY_TRANSPORT_RATES: &str = "transportKgCO2PerKm";

/// What to do when a production record has no quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingQuantityPolicy {
    /// Count the record as zero tons (the historical behavior).
    Zero,
    /// Abort the run.
    Fault,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed reporting timezone for ledger dates.
    pub reporting_offset: FixedOffset,
    /// Customer id of the producing organization itself.
    pub self_customer_id: String,
    pub missing_quantity: MissingQuantityPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reporting_offset: default_reporting_offset(),
            self_customer_id: "DEC".to_string(),
            missing_quantity: MissingQuantityPolicy::Zero,
        }
    }
}

/// One row of carbon sequestered in delivered biochar product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonRetiredRow {
    pub order_number: String,
    pub date: NaiveDate,
    pub tons_carbon: f64,
    pub tons_co2eq: f64,
}

/// One row of transport or energy/fuel emissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonReleasedRow {
    pub row_id: String,
    pub label: String,
    pub date: NaiveDate,
    pub tons_co2eq: f64,
}

/// The output of one accounting run. Constructed fresh per run; holds no
/// identity beyond the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingRun {
    pub retired: Vec<CarbonRetiredRow>,
    pub released: Vec<CarbonReleasedRow>,
    pub total_biochar_tons: f64,
}

impl AccountingRun {
    pub fn summary(&self) -> Summary {
        summarize(&self.retired, &self.released)
    }
}

pub struct CarbonEngine<'a> {
    store: &'a dyn DataStore,
    config: EngineConfig,
}

impl<'a> CarbonEngine<'a> {
    pub fn new(store: &'a dyn DataStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Run the full accounting pass for one site over one window.
    pub fn run(&self, site: &str, window: &Window) -> Result<AccountingRun, AccountingFault> {
        let prefix = collection_prefix(site);
        debug!(site, start = %window.start, end = %window.end, "accounting run start");

        let globals = self.store.global_constants()?;
        let site_constants = self.store.site_constants(site)?;
        let mut resolver = RefResolver::new(self.store);

        let mut retired = Vec::new();
        let mut released = Vec::new();

        for order in self.store.delivered_orders(&prefix, window)? {
            if let Some(row) = self.retired_from_order(&order, &site_constants, &mut resolver)? {
                retired.push(row);
            }
            if let Some(row) =
                self.order_transport(&order, &prefix, &globals, &mut resolver)?
            {
                released.push(row);
            }
        }

        for input in self.store.biomass_inputs(&prefix, window)? {
            released.push(self.input_transport(&input, &prefix, &globals, &mut resolver)?);
        }

        for cost in self.store.carbon_costs(&prefix, window)? {
            released.push(self.cost_emission(&cost, &site_constants, &globals)?);
        }

        let total_biochar_tons = self.total_production(&prefix, window)?;

        info!(
            site,
            retired_rows = retired.len(),
            released_rows = released.len(),
            total_biochar_tons,
            "accounting run complete"
        );

        Ok(AccountingRun {
            retired,
            released,
            total_biochar_tons,
        })
    }

    /// Step 1: carbon retired by one delivered order. `None` for
    /// zero-quantity placeholder orders.
    fn retired_from_order(
        &self,
        order: &Order,
        site_constants: &ConstantsDoc,
        resolver: &mut RefResolver<'_>,
    ) -> Result<Option<CarbonRetiredRow>, AccountingFault> {
        let formulation = resolver.formulation(&order.formulation)?.ok_or_else(|| {
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Formulation,
                record: order.order_number.clone(),
                reference: Some(order.formulation.clone()),
            }
        })?;
        let biochar_fraction = formulation.biochar_fraction().ok_or_else(|| {
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Formulation,
                record: order.order_number.clone(),
                reference: Some(order.formulation.clone()),
            }
        })?;

        let density = require_scalar(site_constants, KEY_DENSITY)?;
        let carbon_content = require_scalar(site_constants, KEY_CARBON_CONTENT)?;

        let liters_biochar = order.production_quantity_l * biochar_fraction;
        let tons_biochar = liters_biochar * density / 1000.0;
        let tons_carbon = tons_biochar * carbon_content;
        let tons_co2 = tons_carbon * CO2_PER_TON_CARBON;

        if tons_co2 <= 0.0 {
            return Ok(None);
        }
        Ok(Some(CarbonRetiredRow {
            order_number: order.order_number.clone(),
            date: reporting_date(order.delivered_date, self.config.reporting_offset),
            tons_carbon,
            tons_co2eq: tons_co2,
        }))
    }

    /// Step 2: outbound transport for raw-biochar orders. Activated orders
    /// and self-consumption orders never release transport CO2.
    fn order_transport(
        &self,
        order: &Order,
        prefix: &str,
        globals: &ConstantsDoc,
        resolver: &mut RefResolver<'_>,
    ) -> Result<Option<CarbonReleasedRow>, AccountingFault> {
        if order.is_activated || order.customer == self.config.self_customer_id {
            return Ok(None);
        }

        let customer = resolver.customer(prefix, &order.customer)?.ok_or_else(|| {
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Customer,
                record: order.order_number.clone(),
                reference: Some(order.customer.clone()),
            }
        })?;

        let tons_co2 = transport_tons_co2(
            &order.order_number,
            customer.distance_km,
            order.vehicle.as_deref(),
            globals,
        )?;

        Ok(Some(CarbonReleasedRow {
            row_id: order.order_number.clone(),
            label: LABEL_RAW_BIOCHAR_TRANSPORT.to_string(),
            date: reporting_date(order.delivered_date, self.config.reporting_offset),
            tons_co2eq: tons_co2,
        }))
    }

    /// Step 3: inbound transport for one biomass input.
    fn input_transport(
        &self,
        input: &Input,
        prefix: &str,
        globals: &ConstantsDoc,
        resolver: &mut RefResolver<'_>,
    ) -> Result<CarbonReleasedRow, AccountingFault> {
        let supplier_id = input.supplier.as_deref().ok_or_else(|| {
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Supplier,
                record: input.id.clone(),
                reference: None,
            }
        })?;
        let supplier = resolver.supplier(prefix, supplier_id)?.ok_or_else(|| {
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Supplier,
                record: input.id.clone(),
                reference: Some(supplier_id.to_string()),
            }
        })?;

        let tons_co2 = transport_tons_co2(
            &input.id,
            supplier.distance_km,
            input.vehicle.as_deref(),
            globals,
        )?;

        Ok(CarbonReleasedRow {
            row_id: input.id.clone(),
            label: LABEL_BIOMASS_TRANSPORT.to_string(),
            date: reporting_date(input.delivery_date, self.config.reporting_offset),
            tons_co2eq: tons_co2,
        })
    }

    /// Step 4: energy/fuel emissions for one carbon-cost entry.
    fn cost_emission(
        &self,
        cost: &CarbonCost,
        site_constants: &ConstantsDoc,
        globals: &ConstantsDoc,
    ) -> Result<CarbonReleasedRow, AccountingFault> {
        let tons_co2 = match &cost.kind {
            CostKind::Electricity => {
                let grams_per_kwh = require_scalar(site_constants, KEY_GRAMS_PER_KWH)?;
                cost.value * grams_per_kwh / 1_000_000.0
            }
            CostKind::Diesel => {
                let kg_per_l = require_scalar(globals, KEY_DIESEL_KG_PER_L)?;
                cost.value * kg_per_l / 1000.0
            }
            CostKind::Other(raw) => {
                return Err(AccountingFault::UnsupportedCostType {
                    entry: cost.id.clone(),
                    cost_type: raw.clone(),
                })
            }
        };

        Ok(CarbonReleasedRow {
            row_id: cost.id.clone(),
            label: format!("{}: {}", cost.kind, cost.notes),
            date: reporting_date(cost.date, self.config.reporting_offset),
            tons_co2eq: tons_co2,
        })
    }

    /// Step 5: total biochar production over the window.
    fn total_production(&self, prefix: &str, window: &Window) -> Result<f64, AccountingFault> {
        let mut total = 0.0;
        for record in self.store.production_records(prefix, window)? {
            match record.quantity_tons {
                Some(quantity) => total += quantity,
                None => match self.config.missing_quantity {
                    MissingQuantityPolicy::Zero => {}
                    MissingQuantityPolicy::Fault => {
                        return Err(AccountingFault::MissingProductionQuantity {
                            record: record.id,
                        })
                    }
                },
            }
        }
        Ok(total)
    }
}

/// Shared transport formula: distance × per-km rate, kg → tons. Faults when
/// either input is unresolved, naming the record and the missing pieces.
fn transport_tons_co2(
    record: &str,
    distance_km: Option<f64>,
    vehicle: Option<&str>,
    globals: &ConstantsDoc,
) -> Result<f64, AccountingFault> {
    let rate = vehicle.and_then(|v| globals.nested(KEY_TRANSPORT_RATES, v));

    match (distance_km, rate) {
        (Some(km), Some(kg_per_km)) => Ok(km * kg_per_km / 1000.0),
        _ => {
            let mut missing = Vec::new();
            if distance_km.is_none() {
                missing.push("distance".to_string());
            }
            match vehicle {
                None => missing.push("vehicle".to_string()),
                Some(v) if rate.is_none() => {
                    missing.push(format!("per-km rate for vehicle {v:?}"))
                }
                Some(_) => {}
            }
            Err(AccountingFault::MissingTransportData {
                record: record.to_string(),
                detail: missing.join(", "),
            })
        }
    }
}

fn require_scalar(doc: &ConstantsDoc, key: &str) -> Result<f64, AccountingFault> {
    doc.scalar(key).ok_or_else(|| AccountingFault::MissingConstant {
        key: KeyPath::single(key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::records::{Input, Order, ProductionRecord};
    use crate::store::{DataStore, SqliteStore};
    use chrono::{TimeZone, Utc};

    const EPS: f64 = 1e-9;

    /// A store seeded with the canonical fixture: site "nakuru", formulation
    /// F1 at 30% biochar, density 1.2 kg/L, carbon content 0.8, 400 g/kWh,
    /// diesel 2.68 kg/L, truck at 0.9 kgCO2/km, customer 50 km away.
    fn fixture_store() -> SqliteStore {
        let store = SqliteStore::in_memory().expect("store");
        store.upsert_site("nakuru").unwrap();
        store
            .set_constant("global", &"dieselKgCO2PerL".parse().unwrap(), 2.68)
            .unwrap();
        store
            .set_constant("global", &"transportKgCO2PerKm.truck".parse().unwrap(), 0.9)
            .unwrap();
        store
            .set_constant("nakuru", &"biocharDensityKgPerL".parse().unwrap(), 1.2)
            .unwrap();
        store
            .set_constant("nakuru", &"biocharCarbonContent".parse().unwrap(), 0.8)
            .unwrap();
        store
            .set_constant("nakuru", &"gramsCO2PerKWh".parse().unwrap(), 400.0)
            .unwrap();
        store.upsert_formulation_component("F1", "Biochar", 0.3).unwrap();
        store.upsert_customer("sites/nakuru", "CUST-1", Some(50.0)).unwrap();
        store.upsert_supplier("sites/nakuru", "SUP-1", Some(50.0)).unwrap();
        store
    }

    fn april() -> Window {
        Window::new(
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 30, 23, 59, 59).unwrap(),
        )
    }

    fn delivered_order(number: &str) -> Order {
        Order {
            order_number: number.to_string(),
            delivered_date: Utc.with_ymd_and_hms(2024, 4, 15, 12, 0, 0).unwrap(),
            production_quantity_l: 1000.0,
            formulation: "F1".to_string(),
            customer: "CUST-1".to_string(),
            vehicle: Some("truck".to_string()),
            is_activated: false,
            status: "Delivered".to_string(),
        }
    }

    fn biomass_input(id: &str) -> Input {
        Input {
            id: id.to_string(),
            delivery_date: Utc.with_ymd_and_hms(2024, 4, 10, 8, 0, 0).unwrap(),
            input_type: "Biomass".to_string(),
            supplier: Some("SUP-1".to_string()),
            vehicle: Some("truck".to_string()),
            status: "Obtained".to_string(),
        }
    }

    fn engine(store: &SqliteStore) -> CarbonEngine<'_> {
        CarbonEngine::new(store, EngineConfig::default())
    }

    #[test]
    fn test_retired_scenario_numbers() {
        // 1000 L × 0.3 × 1.2 kg/L / 1000 = 0.36 t biochar;
        // × 0.8 = 0.288 t carbon; × 44/12 = 1.056 t CO2.
        let store = fixture_store();
        store.insert_order("sites/nakuru", &delivered_order("ORD-1")).unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert_eq!(run.retired.len(), 1);
        let row = &run.retired[0];
        assert!((row.tons_carbon - 0.288).abs() < EPS);
        assert!((row.tons_co2eq - 1.056).abs() < EPS);
        assert!((row.tons_co2eq - row.tons_carbon * (44.0 / 12.0)).abs() < EPS);
    }

    #[test]
    fn test_zero_quantity_order_emits_no_retired_row() {
        let store = fixture_store();
        let mut order = delivered_order("ORD-0");
        order.production_quantity_l = 0.0;
        store.insert_order("sites/nakuru", &order).unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert!(run.retired.is_empty());
        // Transport is still accounted: the truck still drove.
        assert_eq!(run.released.len(), 1);
    }

    #[test]
    fn test_order_transport_scenario_numbers() {
        // 50 km × 0.9 kgCO2/km / 1000 = 0.045 t.
        let store = fixture_store();
        store.insert_order("sites/nakuru", &delivered_order("ORD-1")).unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert_eq!(run.released.len(), 1);
        let row = &run.released[0];
        assert_eq!(row.label, LABEL_RAW_BIOCHAR_TRANSPORT);
        assert_eq!(row.row_id, "ORD-1");
        assert!((row.tons_co2eq - 0.045).abs() < EPS);
    }

    #[test]
    fn test_activated_order_never_releases_transport() {
        let store = fixture_store();
        let mut order = delivered_order("ORD-1");
        order.is_activated = true;
        // Even with no vehicle at all the activated order is fine.
        order.vehicle = None;
        store.insert_order("sites/nakuru", &order).unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert!(run.released.is_empty());
        assert_eq!(run.retired.len(), 1);
    }

    #[test]
    fn test_self_consumption_order_never_releases_transport() {
        let store = fixture_store();
        let mut order = delivered_order("ORD-1");
        order.customer = "DEC".to_string();
        store.insert_order("sites/nakuru", &order).unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert!(run.released.is_empty());
    }

    #[test]
    fn test_missing_vehicle_rate_aborts_run() {
        let store = fixture_store();
        let mut order = delivered_order("ORD-17");
        order.vehicle = Some("tuk-tuk".to_string()); // no rate configured
        store.insert_order("sites/nakuru", &order).unwrap();
        // A later record that would otherwise contribute.
        store
            .insert_production_record(
                "sites/nakuru",
                &ProductionRecord {
                    id: "PR-1".to_string(),
                    end_date: Utc.with_ymd_and_hms(2024, 4, 20, 18, 0, 0).unwrap(),
                    quantity_tons: Some(3.0),
                },
            )
            .unwrap();

        let err = engine(&store).run("nakuru", &april()).unwrap_err();
        match err {
            AccountingFault::MissingTransportData { record, detail } => {
                assert_eq!(record, "ORD-17");
                assert!(detail.contains("tuk-tuk"));
            }
            other => panic!("unexpected fault: {other:?}"),
        }
    }

    #[test]
    fn test_missing_customer_distance_aborts_run() {
        let store = fixture_store();
        store.upsert_customer("sites/nakuru", "CUST-FAR", None).unwrap();
        let mut order = delivered_order("ORD-2");
        order.customer = "CUST-FAR".to_string();
        store.insert_order("sites/nakuru", &order).unwrap();

        let err = engine(&store).run("nakuru", &april()).unwrap_err();
        assert!(matches!(err, AccountingFault::MissingTransportData { .. }));
    }

    #[test]
    fn test_absent_customer_record_is_reference_fault() {
        let store = fixture_store();
        let mut order = delivered_order("ORD-3");
        order.customer = "GHOST".to_string();
        store.insert_order("sites/nakuru", &order).unwrap();

        let err = engine(&store).run("nakuru", &april()).unwrap_err();
        match err {
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Customer,
                record,
                reference,
            } => {
                assert_eq!(record, "ORD-3");
                assert_eq!(reference.as_deref(), Some("GHOST"));
            }
            other => panic!("unexpected fault: {other:?}"),
        }
    }

    #[test]
    fn test_absent_formulation_is_reference_fault() {
        let store = fixture_store();
        let mut order = delivered_order("ORD-4");
        order.formulation = "F404".to_string();
        store.insert_order("sites/nakuru", &order).unwrap();

        let err = engine(&store).run("nakuru", &april()).unwrap_err();
        assert!(matches!(
            err,
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Formulation,
                ..
            }
        ));
    }

    #[test]
    fn test_biomass_input_transport() {
        let store = fixture_store();
        store.insert_input("sites/nakuru", &biomass_input("IN-1")).unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert_eq!(run.released.len(), 1);
        let row = &run.released[0];
        assert_eq!(row.label, LABEL_BIOMASS_TRANSPORT);
        assert!((row.tons_co2eq - 0.045).abs() < EPS);
    }

    #[test]
    fn test_input_without_supplier_reference_faults() {
        let store = fixture_store();
        let mut input = biomass_input("IN-2");
        input.supplier = None;
        store.insert_input("sites/nakuru", &input).unwrap();

        let err = engine(&store).run("nakuru", &april()).unwrap_err();
        match err {
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Supplier,
                record,
                reference,
            } => {
                assert_eq!(record, "IN-2");
                assert!(reference.is_none());
            }
            other => panic!("unexpected fault: {other:?}"),
        }
    }

    #[test]
    fn test_input_with_absent_supplier_record_faults() {
        let store = fixture_store();
        let mut input = biomass_input("IN-3");
        input.supplier = Some("SUP-404".to_string());
        store.insert_input("sites/nakuru", &input).unwrap();

        let err = engine(&store).run("nakuru", &april()).unwrap_err();
        assert!(matches!(
            err,
            AccountingFault::MissingReferenceData {
                entity: RefEntity::Supplier,
                reference: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_electricity_cost_scenario_numbers() {
        // 2000 kWh × 400 g/kWh / 1e6 = 0.8 t.
        let store = fixture_store();
        store
            .insert_carbon_cost(
                "sites/nakuru",
                &CarbonCost {
                    id: "CC-1".to_string(),
                    date: Utc.with_ymd_and_hms(2024, 4, 5, 10, 0, 0).unwrap(),
                    kind: CostKind::Electricity,
                    value: 2000.0,
                    notes: "kiln heaters".to_string(),
                },
            )
            .unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        let row = &run.released[0];
        assert!((row.tons_co2eq - 0.8).abs() < EPS);
        assert_eq!(row.label, "Electricity: kiln heaters");
    }

    #[test]
    fn test_diesel_cost_scenario_numbers() {
        // 100 L × 2.68 kg/L / 1000 = 0.268 t.
        let store = fixture_store();
        store
            .insert_carbon_cost(
                "sites/nakuru",
                &CarbonCost {
                    id: "CC-2".to_string(),
                    date: Utc.with_ymd_and_hms(2024, 4, 6, 10, 0, 0).unwrap(),
                    kind: CostKind::Diesel,
                    value: 100.0,
                    notes: "generator".to_string(),
                },
            )
            .unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert!((run.released[0].tons_co2eq - 0.268).abs() < EPS);
    }

    #[test]
    fn test_unsupported_cost_type_faults() {
        let store = fixture_store();
        store
            .insert_carbon_cost(
                "sites/nakuru",
                &CarbonCost {
                    id: "CC-3".to_string(),
                    date: Utc.with_ymd_and_hms(2024, 4, 7, 10, 0, 0).unwrap(),
                    kind: CostKind::Other("Methane".to_string()),
                    value: 12.0,
                    notes: String::new(),
                },
            )
            .unwrap();

        let err = engine(&store).run("nakuru", &april()).unwrap_err();
        match err {
            AccountingFault::UnsupportedCostType { entry, cost_type } => {
                assert_eq!(entry, "CC-3");
                assert_eq!(cost_type, "Methane");
            }
            other => panic!("unexpected fault: {other:?}"),
        }
    }

    #[test]
    fn test_total_production_sums_window() {
        let store = fixture_store();
        for (id, end_day, quantity) in [("PR-1", 5, 2.5), ("PR-2", 20, 1.25)] {
            store
                .insert_production_record(
                    "sites/nakuru",
                    &ProductionRecord {
                        id: id.to_string(),
                        end_date: Utc.with_ymd_and_hms(2024, 4, end_day, 18, 0, 0).unwrap(),
                        quantity_tons: Some(quantity),
                    },
                )
                .unwrap();
        }
        // Outside the window.
        store
            .insert_production_record(
                "sites/nakuru",
                &ProductionRecord {
                    id: "PR-3".to_string(),
                    end_date: Utc.with_ymd_and_hms(2024, 5, 2, 18, 0, 0).unwrap(),
                    quantity_tons: Some(99.0),
                },
            )
            .unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert!((run.total_biochar_tons - 3.75).abs() < EPS);
    }

    #[test]
    fn test_missing_quantity_policy_zero_vs_fault() {
        let store = fixture_store();
        store
            .insert_production_record(
                "sites/nakuru",
                &ProductionRecord {
                    id: "PR-NULL".to_string(),
                    end_date: Utc.with_ymd_and_hms(2024, 4, 10, 18, 0, 0).unwrap(),
                    quantity_tons: None,
                },
            )
            .unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("zero policy");
        assert_eq!(run.total_biochar_tons, 0.0);

        let strict = CarbonEngine::new(
            &store,
            EngineConfig {
                missing_quantity: MissingQuantityPolicy::Fault,
                ..EngineConfig::default()
            },
        );
        let err = strict.run("nakuru", &april()).unwrap_err();
        assert!(matches!(
            err,
            AccountingFault::MissingProductionQuantity { .. }
        ));
    }

    #[test]
    fn test_ledger_dates_are_reporting_tz() {
        let store = fixture_store();
        let mut order = delivered_order("ORD-TZ");
        // 22:00 UTC on the 15th is already the 16th in GMT+3.
        order.delivered_date = Utc.with_ymd_and_hms(2024, 4, 15, 22, 0, 0).unwrap();
        store.insert_order("sites/nakuru", &order).unwrap();

        let run = engine(&store).run("nakuru", &april()).expect("run");
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 4, 16).unwrap();
        assert_eq!(run.retired[0].date, expected);
        assert_eq!(run.released[0].date, expected);
    }

    #[test]
    fn test_sandbox_site_reads_test_path() {
        let store = fixture_store();
        // Sandbox needs its own constants group and reference data.
        store
            .set_constant("mock-site", &"biocharDensityKgPerL".parse().unwrap(), 1.2)
            .unwrap();
        store
            .set_constant("mock-site", &"biocharCarbonContent".parse().unwrap(), 0.8)
            .unwrap();
        store.upsert_customer("test/mock-site", "CUST-1", Some(50.0)).unwrap();
        store.insert_order("test/mock-site", &delivered_order("ORD-MOCK")).unwrap();

        let run = engine(&store).run("mock-site", &april()).expect("run");
        assert_eq!(run.retired.len(), 1);

        // The production site does not see sandbox records.
        let production = engine(&store).run("nakuru", &april()).expect("run");
        assert!(production.retired.is_empty());
    }

    #[test]
    fn test_missing_site_constant_faults() {
        let store = fixture_store();
        store.insert_order("sites/nakuru", &delivered_order("ORD-1")).unwrap();
        // Wipe density by pointing at a site with no constants.
        store.upsert_customer("sites/eldoret", "CUST-1", Some(50.0)).unwrap();
        store.upsert_site("eldoret").unwrap();
        store.insert_order("sites/eldoret", &delivered_order("ORD-E")).unwrap();

        let err = engine(&store).run("eldoret", &april()).unwrap_err();
        match err {
            AccountingFault::MissingConstant { key } => {
                assert_eq!(key.to_string(), "biocharDensityKgPerL");
            }
            other => panic!("unexpected fault: {other:?}"),
        }
    }

    #[test]
    fn test_run_with_no_records_is_empty_not_fault() {
        let store = fixture_store();
        let run = engine(&store).run("nakuru", &april()).expect("run");
        assert!(run.retired.is_empty());
        assert!(run.released.is_empty());
        assert_eq!(run.total_biochar_tons, 0.0);
        let summary = run.summary();
        assert_eq!(summary.gross_offset_tons, 0.0);
        assert_eq!(summary.net_offset_tons, 0.0);
    }
}
