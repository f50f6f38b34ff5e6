//! Persistence primitives parameterized by a compiled storage shape.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, OptionalExtension, Transaction};
use schemaforge_model::{EntityKey, Record, RegistryEntry, StorageField, StorageKind};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Table name for an entity key: the dotted key itself, `crm.customer`.
///
/// Key segments never contain `.`, so distinct keys get distinct tables.
/// The name is always quoted in SQL.
pub fn table_name(key: &EntityKey) -> String {
    key.to_string()
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_list(entry: &RegistryEntry) -> String {
    entry
        .model()
        .fields()
        .iter()
        .map(|f| quote(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn create_table_sql(entry: &RegistryEntry) -> String {
    let columns: Vec<String> = entry
        .model()
        .fields()
        .iter()
        .map(|f| {
            let mut col = format!("{} {}", quote(&f.name), f.kind.sql_type());
            if f.primary_key {
                col.push_str(" PRIMARY KEY");
            }
            if !f.nullable {
                col.push_str(" NOT NULL");
            }
            col
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        quote(&table_name(entry.key())),
        columns.join(", ")
    )
}

/// A storage transaction. Rolls back on drop unless committed.
pub struct Tx<'c> {
    tx: Transaction<'c>,
}

impl<'c> Tx<'c> {
    pub(crate) fn new(tx: Transaction<'c>) -> Self {
        Self { tx }
    }

    pub fn commit(self) -> StorageResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    /// Inserts a row. Fields missing from `values` are stored as NULL.
    pub fn insert(
        &self,
        entry: &RegistryEntry,
        id: Uuid,
        values: &Map<String, Value>,
    ) -> StorageResult<()> {
        let fields = entry.model().fields();
        let mut params = Vec::with_capacity(fields.len());
        params.push(SqlValue::Text(id.hyphenated().to_string()));
        for field in entry.model().data_fields() {
            params.push(encode(field, values.get(&field.name))?);
        }
        let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(&table_name(entry.key())),
            column_list(entry),
            placeholders.join(", ")
        );
        self.tx
            .execute(&sql, params_from_iter(params))
            .map_err(StorageError::classify)?;
        Ok(())
    }

    /// Fetches one row by identifier.
    pub fn fetch(&self, entry: &RegistryEntry, id: Uuid) -> StorageResult<Option<Record>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            column_list(entry),
            quote(&table_name(entry.key())),
            quote(&entry.model().identifier().name)
        );
        let width = entry.model().len();
        let raw = self
            .tx
            .prepare(&sql)
            .map_err(StorageError::classify)?
            .query_row([id.hyphenated().to_string()], |row| read_raw(row, width))
            .optional()?;
        raw.map(|raw| decode(entry, raw)).transpose()
    }

    /// Returns up to `limit` rows after skipping `skip`, in insertion order.
    pub fn scan(&self, entry: &RegistryEntry, skip: u64, limit: u64) -> StorageResult<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid LIMIT ?1 OFFSET ?2",
            column_list(entry),
            quote(&table_name(entry.key())),
        );
        let width = entry.model().len();
        let mut stmt = self.tx.prepare(&sql).map_err(StorageError::classify)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit, skip], |row| read_raw(row, width))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|raw| decode(entry, raw)).collect()
    }

    /// Applies `changes` to one row. Keys outside the shape are ignored.
    /// Returns false when no row has that identifier.
    pub fn update(
        &self,
        entry: &RegistryEntry,
        id: Uuid,
        changes: &Map<String, Value>,
    ) -> StorageResult<bool> {
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for field in entry.model().data_fields() {
            if let Some(value) = changes.get(&field.name) {
                params.push(encode(field, Some(value))?);
                assignments.push(format!("{} = ?{}", quote(&field.name), params.len()));
            }
        }
        if assignments.is_empty() {
            return Ok(self.fetch(entry, id)?.is_some());
        }
        params.push(SqlValue::Text(id.hyphenated().to_string()));
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote(&table_name(entry.key())),
            assignments.join(", "),
            quote(&entry.model().identifier().name),
            params.len()
        );
        let changed = self
            .tx
            .execute(&sql, params_from_iter(params))
            .map_err(StorageError::classify)?;
        Ok(changed > 0)
    }

    /// Deletes one row. Returns false when no row has that identifier.
    pub fn delete(&self, entry: &RegistryEntry, id: Uuid) -> StorageResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote(&table_name(entry.key())),
            quote(&entry.model().identifier().name)
        );
        let changed = self
            .tx
            .execute(&sql, [id.hyphenated().to_string()])
            .map_err(StorageError::classify)?;
        Ok(changed > 0)
    }

    /// Number of rows in the entity's table.
    pub fn count(&self, entry: &RegistryEntry) -> StorageResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote(&table_name(entry.key())));
        let n: i64 = self.tx.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}

fn read_raw(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<SqlValue>> {
    (0..width).map(|i| row.get::<_, SqlValue>(i)).collect()
}

fn encode(field: &StorageField, value: Option<&Value>) -> StorageResult<SqlValue> {
    let value = match value {
        None | Some(Value::Null) => return Ok(SqlValue::Null),
        Some(v) => v,
    };
    let encoded = match field.kind {
        StorageKind::Uuid | StorageKind::Text | StorageKind::Date => {
            value.as_str().map(|s| SqlValue::Text(s.to_string()))
        }
        StorageKind::Boolean => value.as_bool().map(|b| SqlValue::Integer(i64::from(b))),
        StorageKind::Integer => value.as_i64().map(SqlValue::Integer),
        StorageKind::Float => value.as_f64().map(SqlValue::Real),
    };
    encoded.ok_or_else(|| {
        StorageError::InvalidData(format!(
            "value {value} does not fit {:?} column '{}'",
            field.kind, field.name
        ))
    })
}

fn decode(entry: &RegistryEntry, raw: Vec<SqlValue>) -> StorageResult<Record> {
    let fields = entry.model().fields();
    let mut raw = raw.into_iter();

    let id_field = entry.model().identifier();
    let id = match raw.next() {
        Some(SqlValue::Text(s)) => Uuid::parse_str(&s).map_err(|e| StorageError::Decode {
            column: id_field.name.clone(),
            reason: e.to_string(),
        })?,
        other => {
            return Err(StorageError::Decode {
                column: id_field.name.clone(),
                reason: format!("expected identifier text, found {other:?}"),
            });
        }
    };

    let mut values = Map::new();
    for (field, value) in fields[1..].iter().zip(raw) {
        values.insert(field.name.clone(), decode_value(field, value)?);
    }
    Ok(Record::new(id, values))
}

fn decode_value(field: &StorageField, value: SqlValue) -> StorageResult<Value> {
    let mismatch = |found: &SqlValue| StorageError::Decode {
        column: field.name.clone(),
        reason: format!("expected {:?}, found {found:?}", field.kind),
    };
    let decoded = match (field.kind, &value) {
        (_, SqlValue::Null) => Value::Null,
        (StorageKind::Uuid | StorageKind::Text | StorageKind::Date, SqlValue::Text(s)) => {
            Value::String(s.clone())
        }
        (StorageKind::Boolean, SqlValue::Integer(0)) => Value::Bool(false),
        (StorageKind::Boolean, SqlValue::Integer(1)) => Value::Bool(true),
        (StorageKind::Integer, SqlValue::Integer(i)) => Value::from(*i),
        (StorageKind::Float, SqlValue::Real(f)) => Value::from(*f),
        (StorageKind::Float, SqlValue::Integer(i)) => Value::from(*i as f64),
        _ => return Err(mismatch(&value)),
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_double_quotes() {
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn table_names_keep_hyphens_and_underscores_apart() {
        let hyphen = EntityKey::new("sales", "order-line").unwrap();
        let underscore = EntityKey::new("sales", "order_line").unwrap();
        assert_eq!(table_name(&hyphen), "sales.order-line");
        assert_ne!(table_name(&hyphen), table_name(&underscore));

        let left = EntityKey::new("a_b", "c").unwrap();
        let right = EntityKey::new("a", "b_c").unwrap();
        assert_ne!(table_name(&left), table_name(&right));
    }

    #[test]
    fn decode_rejects_text_in_integer_column() {
        let field = StorageField {
            name: "qty".into(),
            kind: StorageKind::Integer,
            nullable: true,
            primary_key: false,
        };
        let err = decode_value(&field, SqlValue::Text("many".into())).unwrap_err();
        assert!(err.is_schema_mismatch());
    }

    #[test]
    fn decode_widens_integer_in_float_column() {
        let field = StorageField {
            name: "price".into(),
            kind: StorageKind::Float,
            nullable: true,
            primary_key: false,
        };
        assert_eq!(decode_value(&field, SqlValue::Integer(3)).unwrap(), Value::from(3.0));
    }
}
