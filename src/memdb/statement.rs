//! Statement parsing and parameter binding.
//!
//! Converts SQL strings to bound [`Command`]s using sqlparser. Placeholders
//! (`$1`, `$2`, ... or `?`) are replaced by parameter values during
//! conversion, so a command carries concrete values and can be replayed.

use serde_json::Value;
use sqlparser::ast as sp;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;

use crate::memdb::error::{MemDbError, MemDbResult};

/// Equality predicate on one column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Filter {
    pub column: String,
    pub value: Value,
}

/// Columns selected by a query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    All,
    Columns(Vec<String>),
}

/// A parsed statement with its parameters bound.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    CreateTable {
        name: String,
        columns: Vec<String>,
        if_not_exists: bool,
    },
    DropTable {
        name: String,
        if_exists: bool,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Value>>,
    },
    Select {
        table: String,
        projection: Projection,
        filters: Vec<Filter>,
    },
    Delete {
        table: String,
        filters: Vec<Filter>,
    },
    Truncate {
        tables: Vec<String>,
    },
}

impl Command {
    /// Parse a single SQL statement and bind `params` into it.
    pub fn parse(sql: &str, params: &[Value]) -> MemDbResult<Self> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(MemDbError::Syntax("empty statement".into()));
        }

        let statements = SqlParser::parse_sql(&GenericDialect {}, sql)?;
        match statements.as_slice() {
            [statement] => Binder::new(params).convert_statement(statement),
            [] => Err(MemDbError::Syntax("empty statement".into())),
            _ => Err(MemDbError::Unsupported("multiple statements".into())),
        }
    }

    /// Whether running this command changes stored data or schema.
    pub fn is_write(&self) -> bool {
        !matches!(self, Command::Select { .. })
    }
}

struct Binder<'a> {
    params: &'a [Value],
    next_positional: usize,
}

impl<'a> Binder<'a> {
    fn new(params: &'a [Value]) -> Self {
        Self {
            params,
            next_positional: 0,
        }
    }

    fn convert_statement(&mut self, stmt: &sp::Statement) -> MemDbResult<Command> {
        match stmt {
            sp::Statement::CreateTable(create) => {
                if create.columns.is_empty() {
                    return Err(MemDbError::Unsupported("table without columns".into()));
                }
                Ok(Command::CreateTable {
                    name: object_name(&create.name)?,
                    columns: create.columns.iter().map(|c| ident(&c.name)).collect(),
                    if_not_exists: create.if_not_exists,
                })
            }
            sp::Statement::Drop {
                object_type: sp::ObjectType::Table,
                names,
                if_exists,
                ..
            } => match names.as_slice() {
                [name] => Ok(Command::DropTable {
                    name: object_name(name)?,
                    if_exists: *if_exists,
                }),
                _ => Err(MemDbError::Unsupported(
                    "DROP of multiple tables".into(),
                )),
            },
            sp::Statement::Insert(insert) => self.convert_insert(insert),
            sp::Statement::Query(query) => self.convert_query(query),
            sp::Statement::Delete(delete) => self.convert_delete(delete),
            sp::Statement::Truncate { table_names, .. } => Ok(Command::Truncate {
                tables: table_names
                    .iter()
                    .map(|target| object_name(&target.name))
                    .collect::<MemDbResult<Vec<_>>>()?,
            }),
            other => Err(MemDbError::Unsupported(other.to_string())),
        }
    }

    fn convert_insert(&mut self, insert: &sp::Insert) -> MemDbResult<Command> {
        let table = match &insert.table {
            sp::TableObject::TableName(name) => object_name(name)?,
            sp::TableObject::TableFunction(_) => {
                return Err(MemDbError::Unsupported("INSERT into table function".into()))
            }
        };

        let columns = if insert.columns.is_empty() {
            None
        } else {
            Some(insert.columns.iter().map(ident).collect())
        };

        let rows = match insert.source.as_ref().map(|s| s.body.as_ref()) {
            Some(sp::SetExpr::Values(values)) => values
                .rows
                .iter()
                .map(|row| row.iter().map(|e| self.value(e)).collect())
                .collect::<MemDbResult<Vec<Vec<_>>>>()?,
            _ => return Err(MemDbError::Unsupported("INSERT without VALUES".into())),
        };

        Ok(Command::Insert {
            table,
            columns,
            rows,
        })
    }

    fn convert_query(&mut self, query: &sp::Query) -> MemDbResult<Command> {
        if query.order_by.is_some() || query.limit.is_some() || query.offset.is_some() {
            return Err(MemDbError::Unsupported(
                "ORDER BY, LIMIT and OFFSET".into(),
            ));
        }

        let select = match query.body.as_ref() {
            sp::SetExpr::Select(select) => select,
            other => return Err(MemDbError::Unsupported(other.to_string())),
        };

        let table = match select.from.as_slice() {
            [from] => from_table(from)?,
            _ => {
                return Err(MemDbError::Unsupported(
                    "exactly one table in FROM required".into(),
                ))
            }
        };

        let projection = self.convert_projection(&select.projection)?;
        let filters = self.filters(select.selection.as_ref())?;

        Ok(Command::Select {
            table,
            projection,
            filters,
        })
    }

    fn convert_projection(&mut self, items: &[sp::SelectItem]) -> MemDbResult<Projection> {
        if let [sp::SelectItem::Wildcard(_)] = items {
            return Ok(Projection::All);
        }

        items
            .iter()
            .map(|item| match item {
                sp::SelectItem::UnnamedExpr(sp::Expr::Identifier(id)) => Ok(ident(id)),
                other => Err(MemDbError::Unsupported(format!("select item {}", other))),
            })
            .collect::<MemDbResult<Vec<_>>>()
            .map(Projection::Columns)
    }

    fn convert_delete(&mut self, delete: &sp::Delete) -> MemDbResult<Command> {
        let tables = match &delete.from {
            sp::FromTable::WithFromKeyword(tables) => tables,
            sp::FromTable::WithoutKeyword(tables) => tables,
        };

        let table = match tables.as_slice() {
            [from] => from_table(from)?,
            _ => {
                return Err(MemDbError::Unsupported(
                    "DELETE from multiple tables".into(),
                ))
            }
        };

        let filters = self.filters(delete.selection.as_ref())?;
        Ok(Command::Delete { table, filters })
    }

    fn filters(&mut self, selection: Option<&sp::Expr>) -> MemDbResult<Vec<Filter>> {
        let mut filters = Vec::new();
        if let Some(expr) = selection {
            self.collect_filters(expr, &mut filters)?;
        }
        Ok(filters)
    }

    /// Only conjunctions of `column = value` are supported.
    fn collect_filters(&mut self, expr: &sp::Expr, out: &mut Vec<Filter>) -> MemDbResult<()> {
        match expr {
            sp::Expr::BinaryOp {
                left,
                op: sp::BinaryOperator::And,
                right,
            } => {
                self.collect_filters(left, out)?;
                self.collect_filters(right, out)
            }
            sp::Expr::BinaryOp {
                left,
                op: sp::BinaryOperator::Eq,
                right,
            } => {
                let filter = match (left.as_ref(), right.as_ref()) {
                    (sp::Expr::Identifier(column), value) | (value, sp::Expr::Identifier(column)) => {
                        Filter {
                            column: ident(column),
                            value: self.value(value)?,
                        }
                    }
                    _ => return Err(MemDbError::Unsupported(format!("WHERE {}", expr))),
                };
                out.push(filter);
                Ok(())
            }
            sp::Expr::Nested(inner) => self.collect_filters(inner, out),
            other => Err(MemDbError::Unsupported(format!("WHERE {}", other))),
        }
    }

    fn value(&mut self, expr: &sp::Expr) -> MemDbResult<Value> {
        match expr {
            sp::Expr::Value(v) => match &v.value {
                sp::Value::Null => Ok(Value::Null),
                sp::Value::Boolean(b) => Ok(Value::Bool(*b)),
                sp::Value::Number(n, _) => number(n),
                sp::Value::SingleQuotedString(s) | sp::Value::DoubleQuotedString(s) => {
                    Ok(Value::String(s.clone()))
                }
                sp::Value::Placeholder(p) => self.bind(p),
                other => Err(MemDbError::Unsupported(format!("value {}", other))),
            },
            sp::Expr::UnaryOp {
                op: sp::UnaryOperator::Minus,
                expr,
            } => match self.value(expr)? {
                Value::Number(n) => {
                    let negated = match n.as_i64() {
                        Some(i) => i.checked_neg().map(Value::from),
                        None if n.is_f64() => n.as_f64().map(|f| Value::from(-f)),
                        None => None,
                    };
                    negated.ok_or_else(|| MemDbError::Unsupported(format!("negated {}", n)))
                }
                other => Err(MemDbError::Unsupported(format!("negated {}", other))),
            },
            sp::Expr::Nested(inner) => self.value(inner),
            other => Err(MemDbError::Unsupported(format!("expression {}", other))),
        }
    }

    fn bind(&mut self, placeholder: &str) -> MemDbResult<Value> {
        let index = if placeholder == "?" {
            let index = self.next_positional;
            self.next_positional += 1;
            index
        } else {
            placeholder
                .strip_prefix('$')
                .or_else(|| placeholder.strip_prefix('?'))
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .map(|n| n - 1)
                .ok_or_else(|| MemDbError::Unsupported(format!("placeholder {}", placeholder)))?
        };

        self.params
            .get(index)
            .cloned()
            .ok_or_else(|| MemDbError::MissingParameter(placeholder.to_string()))
    }
}

fn number(literal: &str) -> MemDbResult<Value> {
    if let Ok(i) = literal.parse::<i64>() {
        return Ok(Value::from(i));
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| MemDbError::Unsupported(format!("number {}", literal)))
}

/// Unquoted identifiers are case-insensitive.
fn ident(id: &sp::Ident) -> String {
    if id.quote_style.is_some() {
        id.value.clone()
    } else {
        id.value.to_lowercase()
    }
}

fn object_name(name: &sp::ObjectName) -> MemDbResult<String> {
    name.0
        .last()
        .and_then(|part| part.as_ident())
        .map(ident)
        .ok_or_else(|| MemDbError::Unsupported(format!("table name {}", name)))
}

fn from_table(from: &sp::TableWithJoins) -> MemDbResult<String> {
    if !from.joins.is_empty() {
        return Err(MemDbError::Unsupported("JOIN".into()));
    }
    match &from.relation {
        sp::TableFactor::Table { name, .. } => object_name(name),
        other => Err(MemDbError::Unsupported(format!("FROM {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_create_table() {
        let cmd = Command::parse("CREATE TABLE IF NOT EXISTS text (val TEXT, Note TEXT)", &[]).unwrap();

        assert_eq!(
            cmd,
            Command::CreateTable {
                name: "text".into(),
                columns: vec!["val".into(), "note".into()],
                if_not_exists: true,
            }
        );
        assert!(cmd.is_write());
    }

    #[test]
    fn test_parse_insert_binds_dollar_params() {
        let cmd = Command::parse(
            "INSERT INTO text (val) VALUES ($1), ($2)",
            &[json!("a"), json!("b")],
        )
        .unwrap();

        assert_eq!(
            cmd,
            Command::Insert {
                table: "text".into(),
                columns: Some(vec!["val".into()]),
                rows: vec![vec![json!("a")], vec![json!("b")]],
            }
        );
    }

    #[test]
    fn test_parse_insert_literals() {
        let cmd = Command::parse("INSERT INTO t VALUES ('x', -3, 1.5, NULL, true)", &[]).unwrap();

        match cmd {
            Command::Insert { columns, rows, .. } => {
                assert!(columns.is_none());
                assert_eq!(rows, vec![vec![json!("x"), json!(-3), json!(1.5), Value::Null, json!(true)]]);
            }
            other => panic!("Expected Insert, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_parameter() {
        let err = Command::parse("INSERT INTO text (val) VALUES ($2)", &[json!("a")]).unwrap_err();
        assert!(matches!(err, MemDbError::MissingParameter(p) if p == "$2"));
    }

    #[test]
    fn test_negated_parameter_out_of_range() {
        let sql = "SELECT * FROM t WHERE a = -$1";

        assert!(matches!(
            Command::parse(sql, &[json!(i64::MIN)]),
            Err(MemDbError::Unsupported(_))
        ));
        assert!(matches!(
            Command::parse(sql, &[json!(u64::MAX)]),
            Err(MemDbError::Unsupported(_))
        ));

        let cmd = Command::parse(sql, &[json!(i64::MAX)]).unwrap();
        assert!(matches!(
            cmd,
            Command::Select { filters, .. } if filters[0].value == json!(-i64::MAX)
        ));
        let cmd = Command::parse(sql, &[json!(1.5)]).unwrap();
        assert!(matches!(
            cmd,
            Command::Select { filters, .. } if filters[0].value == json!(-1.5)
        ));
    }

    #[test]
    fn test_parse_select() {
        let cmd = Command::parse("SELECT val FROM text WHERE val = $1 AND id = 2;", &[json!("a")]).unwrap();

        assert_eq!(
            cmd,
            Command::Select {
                table: "text".into(),
                projection: Projection::Columns(vec!["val".into()]),
                filters: vec![
                    Filter {
                        column: "val".into(),
                        value: json!("a"),
                    },
                    Filter {
                        column: "id".into(),
                        value: json!(2),
                    },
                ],
            }
        );
        assert!(!cmd.is_write());
    }

    #[test]
    fn test_parse_select_all() {
        match Command::parse("SELECT * FROM text", &[]).unwrap() {
            Command::Select { projection, filters, .. } => {
                assert_eq!(projection, Projection::All);
                assert!(filters.is_empty());
            }
            other => panic!("Expected Select, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_delete_and_truncate() {
        assert_eq!(
            Command::parse("DELETE FROM text WHERE val = 'a'", &[]).unwrap(),
            Command::Delete {
                table: "text".into(),
                filters: vec![Filter {
                    column: "val".into(),
                    value: json!("a"),
                }],
            }
        );
        assert_eq!(
            Command::parse("TRUNCATE TABLE text;", &[]).unwrap(),
            Command::Truncate {
                tables: vec!["text".into()],
            }
        );
    }

    #[test]
    fn test_parse_drop_table() {
        assert_eq!(
            Command::parse("DROP TABLE IF EXISTS text", &[]).unwrap(),
            Command::DropTable {
                name: "text".into(),
                if_exists: true,
            }
        );
    }

    #[test]
    fn test_rejects_unsupported() {
        assert!(matches!(
            Command::parse("SELECT val FROM text ORDER BY val", &[]),
            Err(MemDbError::Unsupported(_))
        ));
        assert!(matches!(
            Command::parse("SELECT * FROM text WHERE val > 1", &[]),
            Err(MemDbError::Unsupported(_))
        ));
        assert!(matches!(
            Command::parse("SELECT 1; SELECT 2", &[]),
            Err(MemDbError::Unsupported(_))
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(Command::parse("", &[]), Err(MemDbError::Syntax(_))));
        assert!(matches!(Command::parse("INSERT INTO", &[]), Err(MemDbError::Syntax(_))));
    }
}
