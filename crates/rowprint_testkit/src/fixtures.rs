//! Sample record types and store helpers.
//!
//! The schemas model a small personnel and inventory database: employees
//! with a derived salary figure, departments, product categories with an
//! optional description, and products whose audit stamp is rewritten on
//! every read and therefore left out of fingerprints.

use chrono::{DateTime, Utc};
use rowprint_codec::{Decimal, Value};
use rowprint_core::{
    Column, ColumnType, Config, CoreError, CoreResult, FnExtractor, RecordSchema, RecordSnapshot,
    RecordStore, SnapshotExtractor,
};

/// Schema of the `Employee` record type.
///
/// `ProperSalary` is derived: the salary raised by a quarter, truncated to
/// whole units. It is computed on load and never fingerprinted.
pub fn employee_schema() -> CoreResult<RecordSchema> {
    RecordSchema::builder("Employee")
        .column(Column::new("Id", ColumnType::Integer).key())
        .column(Column::new("Name", ColumnType::Text))
        .column(Column::new("Salary", ColumnType::Decimal))
        .column(Column::new("DepartmentId", ColumnType::Integer).nullable())
        .column(Column::new("HireDate", ColumnType::Date))
        .column(Column::new("Active", ColumnType::Bool))
        .derived("ProperSalary", ColumnType::Integer, proper_salary)
        .build()
}

fn proper_salary(snapshot: &RecordSnapshot) -> CoreResult<Value> {
    let Some(salary) = snapshot.get("Salary").and_then(Value::as_decimal) else {
        return Ok(Value::Null);
    };
    let raised = salary.checked_mul(&Decimal::new(125, 2)?)?;
    i64::try_from(raised.trunc())
        .map(Value::Integer)
        .map_err(|_| CoreError::derived_field("Employee", "ProperSalary", "salary out of range"))
}

/// Schema of the `Department` record type.
pub fn department_schema() -> CoreResult<RecordSchema> {
    RecordSchema::builder("Department")
        .column(Column::new("Id", ColumnType::Integer).key())
        .column(Column::new("DepartmentName", ColumnType::Text))
        .build()
}

/// Schema of the `Category` record type.
///
/// `Description` is nullable, so a category without one fingerprints
/// differently from one with an empty description.
pub fn category_schema() -> CoreResult<RecordSchema> {
    RecordSchema::builder("Category")
        .column(Column::new("Id", ColumnType::Integer).key())
        .column(Column::new("CategoryName", ColumnType::Text))
        .column(Column::new("Description", ColumnType::Text).nullable())
        .build()
}

/// Schema of the `Product` record type.
///
/// `LastAudited` is untracked, so stamping it never invalidates a token.
pub fn product_schema() -> CoreResult<RecordSchema> {
    RecordSchema::builder("Product")
        .column(Column::new("Id", ColumnType::Integer).key())
        .column(Column::new("ProductName", ColumnType::Text))
        .column(Column::new("UnitPrice", ColumnType::Decimal))
        .column(Column::new("UnitsInStock", ColumnType::Integer))
        .column(Column::new("Discontinued", ColumnType::Bool))
        .column(Column::new("LastAudited", ColumnType::Timestamp).nullable().untracked())
        .build()
}

/// An employee row.
pub fn employee(
    schema: &RecordSchema,
    id: i64,
    name: &str,
    salary: &str,
    department: Option<i64>,
) -> CoreResult<RecordSnapshot> {
    schema
        .snapshot()
        .set("Id", id)?
        .set("Name", name)?
        .set("Salary", Value::decimal(salary)?)?
        .set("DepartmentId", department)?
        .set("HireDate", Value::date("1992-05-01")?)?
        .set("Active", true)?
        .build()
}

/// A department row.
pub fn department(schema: &RecordSchema, id: i64, name: &str) -> CoreResult<RecordSnapshot> {
    schema
        .snapshot()
        .set("Id", id)?
        .set("DepartmentName", name)?
        .build()
}

/// A category row.
pub fn category(
    schema: &RecordSchema,
    id: i64,
    name: &str,
    description: Option<&str>,
) -> CoreResult<RecordSnapshot> {
    schema
        .snapshot()
        .set("Id", id)?
        .set("CategoryName", name)?
        .set("Description", description)?
        .build()
}

/// A product as an application would hold it in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Units on hand.
    pub units_in_stock: i64,
    /// Whether the product is no longer sold.
    pub discontinued: bool,
    /// When stock was last counted.
    pub last_audited: Option<DateTime<Utc>>,
}

impl Product {
    /// A product with a fixed price and no audit stamp.
    pub fn sample(id: i64, name: &str, units_in_stock: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            unit_price: Decimal::from(18),
            units_in_stock,
            discontinued: false,
            last_audited: None,
        }
    }
}

/// Extraction function for [`Product`].
pub type ProductExtractFn = fn(&RecordSchema, &Product) -> CoreResult<RecordSnapshot>;

/// Extractor turning [`Product`] values into snapshots.
pub fn product_extractor() -> CoreResult<FnExtractor<ProductExtractFn>> {
    Ok(FnExtractor::new(product_schema()?, extract_product))
}

fn extract_product(schema: &RecordSchema, product: &Product) -> CoreResult<RecordSnapshot> {
    schema
        .snapshot()
        .set("Id", product.id)?
        .set("ProductName", product.name.as_str())?
        .set("UnitPrice", product.unit_price)?
        .set("UnitsInStock", product.units_in_stock)?
        .set("Discontinued", product.discontinued)?
        .set("LastAudited", product.last_audited)?
        .build()
}

/// A store of employees in three departments.
pub fn employee_store() -> CoreResult<RecordStore> {
    let schema = employee_schema()?;
    let store = RecordStore::new(schema.clone(), Config::default());
    let rows = [
        (1, "Nancy Davolio", "2954.55", Some(1)),
        (2, "Andrew Fuller", "2254.49", Some(1)),
        (3, "Janet Leverling", "3119.15", Some(2)),
        (4, "Margaret Peacock", "1861.08", None),
    ];
    for (id, name, salary, department) in rows {
        store.insert(employee(&schema, id, name, salary, department)?)?;
    }
    Ok(store)
}

/// A store of product categories. Category 8 has no description.
pub fn category_store() -> CoreResult<RecordStore> {
    let schema = category_schema()?;
    let store = RecordStore::new(schema.clone(), Config::default());
    let rows = [
        (1, "Beverages", Some("Soft drinks, coffees, teas, beers, and ales")),
        (2, "Condiments", Some("Sweet and savory sauces, relishes, spreads")),
        (3, "Confections", Some("")),
        (8, "Seafood", None),
    ];
    for (id, name, description) in rows {
        store.insert(category(&schema, id, name, description)?)?;
    }
    Ok(store)
}

/// A store holding `count` products with ids `1..=count`.
pub fn product_store(count: i64, config: Config) -> CoreResult<RecordStore> {
    let extractor = product_extractor()?;
    let store = RecordStore::new(extractor.schema().clone(), config);
    for id in 1..=count {
        let product = Product::sample(id, &format!("Product {id}"), 0);
        store.insert(extractor.extract(&product)?)?;
    }
    Ok(store)
}

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// Filtered by `RUST_LOG`, defaulting to `warn`. Safe to call from every
/// test; only the first call installs.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowprint_core::RecordKey;

    #[test]
    fn employee_derived_salary() {
        let store = employee_store().unwrap();
        let nancy = store.load(&RecordKey::from(1)).unwrap();
        // 2954.55 * 1.25 = 3693.1875
        assert_eq!(nancy.derived("ProperSalary"), Some(&Value::Integer(3693)));
        assert_eq!(
            nancy.derived_values(),
            &[("ProperSalary".to_string(), Value::Integer(3693))]
        );
        let hired = nancy.snapshot().get("HireDate").and_then(Value::as_date);
        assert_eq!(hired, chrono::NaiveDate::from_ymd_opt(1992, 5, 1));
    }

    #[test]
    fn unassigned_employee_has_null_department() {
        let store = employee_store().unwrap();
        let margaret = store.load(&RecordKey::from(4)).unwrap();
        assert_eq!(margaret.snapshot().get("DepartmentId"), Some(&Value::Null));
    }

    #[test]
    fn audit_stamp_does_not_change_fingerprint() {
        let extractor = product_extractor().unwrap();
        let engine = rowprint_core::FingerprintEngine::new();
        let mut chai = Product::sample(1, "Chai", 39);
        let before = engine.fingerprint_record(&extractor, &chai).unwrap();

        let stamp = Utc::now();
        chai.last_audited = Some(stamp);
        assert_eq!(engine.fingerprint_record(&extractor, &chai).unwrap(), before);
        let row = extractor.extract(&chai).unwrap();
        assert_eq!(row.get("LastAudited").and_then(Value::as_timestamp), Some(stamp));

        chai.units_in_stock -= 1;
        assert_ne!(engine.fingerprint_record(&extractor, &chai).unwrap(), before);
        assert_eq!(extractor.schema().record_type(), "Product");
    }

    #[test]
    fn departments() {
        let schema = department_schema().unwrap();
        let sales = department(&schema, 1, "Sales").unwrap();
        let key = schema.key_of(&sales).unwrap();
        assert_eq!(key, RecordKey::from(1));
        assert_eq!(key.values(), &[Value::Integer(1)]);
    }

    #[test]
    fn missing_description_is_null_not_empty() {
        let store = category_store().unwrap();
        let seafood = store.load(&RecordKey::from(8)).unwrap();
        assert_eq!(seafood.snapshot().get("Description"), Some(&Value::Null));

        let confections = store.load(&RecordKey::from(3)).unwrap();
        assert_eq!(confections.snapshot().get("Description"), Some(&Value::from("")));

        // same name, null versus empty description
        let schema = category_schema().unwrap();
        let engine = rowprint_core::FingerprintEngine::new();
        let null = category(&schema, 8, "Seafood", None).unwrap();
        let empty = category(&schema, 8, "Seafood", Some("")).unwrap();
        assert_ne!(
            engine.fingerprint_with(&schema, &null).unwrap(),
            engine.fingerprint_with(&schema, &empty).unwrap()
        );
    }

    #[test]
    fn clearing_description_conflicts_with_stale_token() {
        let store = category_store().unwrap();
        let (beverages, stale) = store.load(&RecordKey::from(1)).unwrap().into_parts();

        let cleared = beverages.with_value("Description", Value::Null).unwrap();
        assert!(store.update(&stale, cleared).unwrap().is_applied());

        let renamed = beverages.with_value("CategoryName", "Drinks").unwrap();
        assert!(store.update(&stale, renamed).unwrap().is_conflict());
    }
}
