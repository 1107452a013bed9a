//! SQLite-backed data store.
//!
//! Local stand-in for the original hosted document store. Collections become
//! tables keyed by the site's storage path prefix; timestamps are RFC3339
//! UTC TEXT so lexicographic comparison matches chronological order.

use crate::accounting::records::{
    CarbonCost, CostKind, Customer, Formulation, Input, Order, ProductionRecord, Supplier,
    INPUT_TYPE_BIOMASS, STATUS_DELIVERED, STATUS_OBTAINED,
};
use crate::accounting::window::Window;
use crate::store::constants::{ConstantsDoc, KeyPath};
use crate::store::{DataStore, StoreError};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{info, warn};

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;

CREATE TABLE IF NOT EXISTS sites (
    name TEXT PRIMARY KEY
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS constants (
    grp TEXT NOT NULL,
    path TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (grp, path)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS formulations (
    name TEXT NOT NULL,
    component TEXT NOT NULL,
    mass_fraction REAL NOT NULL,
    PRIMARY KEY (name, component)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS customers (
    site_path TEXT NOT NULL,
    id TEXT NOT NULL,
    distance_km REAL,
    PRIMARY KEY (site_path, id)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS suppliers (
    site_path TEXT NOT NULL,
    id TEXT NOT NULL,
    distance_km REAL,
    PRIMARY KEY (site_path, id)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS orders (
    site_path TEXT NOT NULL,
    order_number TEXT NOT NULL,
    status TEXT NOT NULL,
    delivered_date TEXT NOT NULL,
    production_quantity_l REAL NOT NULL,
    formulation TEXT NOT NULL,
    customer TEXT NOT NULL,
    vehicle TEXT,
    is_activated INTEGER NOT NULL,
    PRIMARY KEY (site_path, order_number)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_orders_status_date
    ON orders(site_path, status, delivered_date);

CREATE TABLE IF NOT EXISTS inputs (
    site_path TEXT NOT NULL,
    id TEXT NOT NULL,
    input_type TEXT NOT NULL,
    status TEXT NOT NULL,
    delivery_date TEXT NOT NULL,
    supplier TEXT,
    vehicle TEXT,
    PRIMARY KEY (site_path, id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_inputs_type_date
    ON inputs(site_path, input_type, delivery_date);

CREATE TABLE IF NOT EXISTS carbon_costs (
    site_path TEXT NOT NULL,
    id TEXT NOT NULL,
    cost_type TEXT NOT NULL,
    date TEXT NOT NULL,
    value REAL NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (site_path, id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_costs_date
    ON carbon_costs(site_path, date);

CREATE TABLE IF NOT EXISTS production_runs (
    site_path TEXT NOT NULL,
    id TEXT NOT NULL,
    end_date TEXT NOT NULL,
    quantity_tons REAL,
    PRIMARY KEY (site_path, id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_production_end_date
    ON production_runs(site_path, end_date);
"#;

/// Serialize a timestamp to its canonical storage form.
fn ts_to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp back to UTC.
fn ts_from_db(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and apply the schema.
    pub fn new(db_path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX; // We handle our own locking

        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("Failed to open database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize database schema")?;

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap_or_default();
        if journal_mode.to_lowercase() != "wal" && db_path != ":memory:" {
            warn!("WAL mode not active, journal_mode = {}", journal_mode);
        }

        info!("Carbon accounting database ready at: {}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests and available for sandboxing.
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    // =========================================================================
    // WRITE HELPERS (seeding, ingestion, tests)
    // =========================================================================

    pub fn upsert_site(&self, name: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO sites (name) VALUES (?1)",
            params![name],
        )?;
        Ok(())
    }

    pub fn upsert_formulation_component(
        &self,
        name: &str,
        component: &str,
        mass_fraction: f64,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO formulations (name, component, mass_fraction) VALUES (?1, ?2, ?3) \
             ON CONFLICT(name, component) DO UPDATE SET mass_fraction=excluded.mass_fraction",
            params![name, component, mass_fraction],
        )?;
        Ok(())
    }

    pub fn upsert_customer(
        &self,
        prefix: &str,
        id: &str,
        distance_km: Option<f64>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO customers (site_path, id, distance_km) VALUES (?1, ?2, ?3) \
             ON CONFLICT(site_path, id) DO UPDATE SET distance_km=excluded.distance_km",
            params![prefix, id, distance_km],
        )?;
        Ok(())
    }

    pub fn upsert_supplier(
        &self,
        prefix: &str,
        id: &str,
        distance_km: Option<f64>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO suppliers (site_path, id, distance_km) VALUES (?1, ?2, ?3) \
             ON CONFLICT(site_path, id) DO UPDATE SET distance_km=excluded.distance_km",
            params![prefix, id, distance_km],
        )?;
        Ok(())
    }

    pub fn insert_order(&self, prefix: &str, order: &Order) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO orders \
             (site_path, order_number, status, delivered_date, production_quantity_l, \
              formulation, customer, vehicle, is_activated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                prefix,
                order.order_number,
                order.status,
                ts_to_db(order.delivered_date),
                order.production_quantity_l,
                order.formulation,
                order.customer,
                order.vehicle,
                order.is_activated,
            ],
        )?;
        Ok(())
    }

    pub fn insert_input(&self, prefix: &str, input: &Input) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO inputs \
             (site_path, id, input_type, status, delivery_date, supplier, vehicle) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                prefix,
                input.id,
                input.input_type,
                input.status,
                ts_to_db(input.delivery_date),
                input.supplier,
                input.vehicle,
            ],
        )?;
        Ok(())
    }

    pub fn insert_carbon_cost(&self, prefix: &str, cost: &CarbonCost) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO carbon_costs \
             (site_path, id, cost_type, date, value, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                prefix,
                cost.id,
                cost.kind.to_string(),
                ts_to_db(cost.date),
                cost.value,
                cost.notes,
            ],
        )?;
        Ok(())
    }

    pub fn insert_production_record(
        &self,
        prefix: &str,
        record: &ProductionRecord,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO production_runs (site_path, id, end_date, quantity_tons) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                prefix,
                record.id,
                ts_to_db(record.end_date),
                record.quantity_tons,
            ],
        )?;
        Ok(())
    }
}

impl DataStore for SqliteStore {
    fn global_constants(&self) -> Result<ConstantsDoc, StoreError> {
        self.site_constants("global")
    }

    fn site_constants(&self, site: &str) -> Result<ConstantsDoc, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached("SELECT path, value FROM constants WHERE grp = ?1")?;
        let mut rows = stmt.query([site])?;

        let mut doc = ConstantsDoc::default();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            let value: f64 = row.get(1)?;
            let path: KeyPath = raw.parse().map_err(|e| StoreError::Corrupt {
                detail: format!("constants.{site}: {e}"),
            })?;
            doc.set(&path, value);
        }
        Ok(doc)
    }

    fn set_constant(&self, group: &str, path: &KeyPath, value: f64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO constants (grp, path, value) VALUES (?1, ?2, ?3) \
             ON CONFLICT(grp, path) DO UPDATE SET value=excluded.value",
            params![group, path.to_string(), value],
        )?;
        Ok(())
    }

    fn list_sites(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT name FROM sites ORDER BY name")?;
        let sites = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(sites)
    }

    fn delivered_orders(&self, prefix: &str, window: &Window) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT order_number, status, delivered_date, production_quantity_l, \
                    formulation, customer, vehicle, is_activated \
             FROM orders \
             WHERE site_path = ?1 AND status = ?2 \
               AND delivered_date >= ?3 AND delivered_date <= ?4 \
             ORDER BY delivered_date, order_number",
        )?;
        let orders = stmt
            .query_map(
                params![
                    prefix,
                    STATUS_DELIVERED,
                    ts_to_db(window.start),
                    ts_to_db(window.end)
                ],
                |row| {
                    let delivered_raw: String = row.get(2)?;
                    Ok(Order {
                        order_number: row.get(0)?,
                        status: row.get(1)?,
                        delivered_date: ts_from_db(&delivered_raw)?,
                        production_quantity_l: row.get(3)?,
                        formulation: row.get(4)?,
                        customer: row.get(5)?,
                        vehicle: row.get(6)?,
                        is_activated: row.get(7)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(orders)
    }

    fn biomass_inputs(&self, prefix: &str, window: &Window) -> Result<Vec<Input>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, input_type, status, delivery_date, supplier, vehicle \
             FROM inputs \
             WHERE site_path = ?1 AND input_type = ?2 AND status = ?3 \
               AND delivery_date >= ?4 AND delivery_date <= ?5 \
             ORDER BY delivery_date, id",
        )?;
        let inputs = stmt
            .query_map(
                params![
                    prefix,
                    INPUT_TYPE_BIOMASS,
                    STATUS_OBTAINED,
                    ts_to_db(window.start),
                    ts_to_db(window.end)
                ],
                |row| {
                    let delivery_raw: String = row.get(3)?;
                    Ok(Input {
                        id: row.get(0)?,
                        input_type: row.get(1)?,
                        status: row.get(2)?,
                        delivery_date: ts_from_db(&delivery_raw)?,
                        supplier: row.get(4)?,
                        vehicle: row.get(5)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(inputs)
    }

    fn carbon_costs(&self, prefix: &str, window: &Window) -> Result<Vec<CarbonCost>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, cost_type, date, value, notes \
             FROM carbon_costs \
             WHERE site_path = ?1 AND date >= ?2 AND date <= ?3 \
             ORDER BY date, id",
        )?;
        let costs = stmt
            .query_map(
                params![prefix, ts_to_db(window.start), ts_to_db(window.end)],
                |row| {
                    let kind_raw: String = row.get(1)?;
                    let date_raw: String = row.get(2)?;
                    Ok(CarbonCost {
                        id: row.get(0)?,
                        kind: CostKind::from(kind_raw),
                        date: ts_from_db(&date_raw)?,
                        value: row.get(3)?,
                        notes: row.get(4)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(costs)
    }

    fn production_records(
        &self,
        prefix: &str,
        window: &Window,
    ) -> Result<Vec<ProductionRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, end_date, quantity_tons \
             FROM production_runs \
             WHERE site_path = ?1 AND end_date >= ?2 AND end_date <= ?3 \
             ORDER BY end_date, id",
        )?;
        let records = stmt
            .query_map(
                params![prefix, ts_to_db(window.start), ts_to_db(window.end)],
                |row| {
                    let end_raw: String = row.get(1)?;
                    Ok(ProductionRecord {
                        id: row.get(0)?,
                        end_date: ts_from_db(&end_raw)?,
                        quantity_tons: row.get(2)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn formulation(&self, name: &str) -> Result<Option<Formulation>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT component, mass_fraction FROM formulations WHERE name = ?1",
        )?;
        let mut rows = stmt.query([name])?;

        let mut formulation = Formulation::default();
        let mut found = false;
        while let Some(row) = rows.next()? {
            let component: String = row.get(0)?;
            let fraction: f64 = row.get(1)?;
            formulation.components.insert(component, fraction);
            found = true;
        }
        Ok(found.then_some(formulation))
    }

    fn customer(&self, prefix: &str, id: &str) -> Result<Option<Customer>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, distance_km FROM customers WHERE site_path = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query(params![prefix, id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        Ok(Some(Customer {
            id: row.get(0)?,
            distance_km: row.get(1)?,
        }))
    }

    fn supplier(&self, prefix: &str, id: &str) -> Result<Option<Supplier>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, distance_km FROM suppliers WHERE site_path = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query(params![prefix, id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        Ok(Some(Supplier {
            id: row.get(0)?,
            distance_km: row.get(1)?,
        }))
    }
}
