//! Table storage.
//!
//! Tables are plain column lists with rows of JSON values. [`Tables`] is
//! cloned freely: sessions snapshot it at begin and commits build the next
//! committed state on a copy before swapping it in.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::memdb::error::{MemDbError, MemDbResult};
use crate::memdb::statement::{Command, Filter, Projection};

/// A row returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Get a value by position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Column names, in projection order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values, in projection order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Take the values out of the row.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    fn column_index(&self, table: &str, column: &str) -> MemDbResult<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| MemDbError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    fn compile<'f>(&self, table: &str, filters: &'f [Filter]) -> MemDbResult<Vec<(usize, &'f Value)>> {
        filters
            .iter()
            .map(|f| Ok((self.column_index(table, &f.column)?, &f.value)))
            .collect()
    }
}

fn row_matches(row: &[Value], predicate: &[(usize, &Value)]) -> bool {
    predicate.iter().all(|(i, v)| row.get(*i) == Some(*v))
}

/// All tables of one committed state or session view.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    tables: BTreeMap<String, Table>,
}

impl Tables {
    /// Names of all tables, sorted.
    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Apply a command, returning the number of affected rows.
    ///
    /// A failing command leaves the tables unchanged. `Select` only counts
    /// matching rows.
    pub fn execute(&mut self, command: &Command) -> MemDbResult<u64> {
        match command {
            Command::CreateTable {
                name,
                columns,
                if_not_exists,
            } => {
                if self.tables.contains_key(name) {
                    if *if_not_exists {
                        return Ok(0);
                    }
                    return Err(MemDbError::TableAlreadyExists(name.clone()));
                }
                self.tables.insert(
                    name.clone(),
                    Table {
                        columns: columns.clone(),
                        rows: Vec::new(),
                    },
                );
                Ok(0)
            }
            Command::DropTable { name, if_exists } => match self.tables.remove(name) {
                Some(_) => Ok(0),
                None if *if_exists => Ok(0),
                None => Err(MemDbError::TableNotFound(name.clone())),
            },
            Command::Insert {
                table,
                columns,
                rows,
            } => self.insert(table, columns.as_deref(), rows),
            Command::Select { .. } => self.query(command).map(|rows| rows.len() as u64),
            Command::Delete { table, filters } => {
                let t = self.table_mut(table)?;
                let predicate = t.compile(table, filters)?;
                let before = t.rows.len();
                t.rows.retain(|row| !row_matches(row, &predicate));
                Ok((before - t.rows.len()) as u64)
            }
            Command::Truncate { tables } => {
                for name in tables {
                    self.table(name)?;
                }
                let mut removed = 0;
                for name in tables {
                    let t = self.table_mut(name)?;
                    removed += t.rows.len() as u64;
                    t.rows.clear();
                }
                Ok(removed)
            }
        }
    }

    /// Run a `Select` command.
    pub fn query(&self, command: &Command) -> MemDbResult<Vec<Row>> {
        let (table, projection, filters) = match command {
            Command::Select {
                table,
                projection,
                filters,
            } => (table, projection, filters),
            other => return Err(MemDbError::NotAQuery(format!("{:?}", other))),
        };

        let t = self.table(table)?;
        let predicate = t.compile(table, filters)?;
        let (columns, indices) = match projection {
            Projection::All => (t.columns.clone(), (0..t.columns.len()).collect::<Vec<_>>()),
            Projection::Columns(names) => {
                let indices = names
                    .iter()
                    .map(|c| t.column_index(table, c))
                    .collect::<MemDbResult<Vec<_>>>()?;
                (names.clone(), indices)
            }
        };

        Ok(t.rows
            .iter()
            .filter(|row| row_matches(row, &predicate))
            .map(|row| Row {
                columns: columns.clone(),
                values: indices.iter().map(|i| row[*i].clone()).collect(),
            })
            .collect())
    }

    fn insert(&mut self, table: &str, columns: Option<&[String]>, rows: &[Vec<Value>]) -> MemDbResult<u64> {
        let t = self.table_mut(table)?;
        let width = t.columns.len();
        let positions = match columns {
            Some(names) => names
                .iter()
                .map(|c| t.column_index(table, c))
                .collect::<MemDbResult<Vec<_>>>()?,
            None => (0..width).collect(),
        };

        let mut staged = Vec::with_capacity(rows.len());
        for values in rows {
            if values.len() != positions.len() {
                return Err(MemDbError::ColumnCount {
                    expected: positions.len(),
                    found: values.len(),
                });
            }
            let mut row = vec![Value::Null; width];
            for (position, value) in positions.iter().zip(values) {
                row[*position] = value.clone();
            }
            staged.push(row);
        }

        let inserted = staged.len() as u64;
        t.rows.extend(staged);
        Ok(inserted)
    }

    fn table(&self, name: &str) -> MemDbResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| MemDbError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> MemDbResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| MemDbError::TableNotFound(name.to_string()))
    }
}
