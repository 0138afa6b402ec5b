use crate::core::{RecordError, Result, Value};
use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    /// Source column and output label, in select order.
    Columns(Vec<(String, String)>),
}

/// The native query shape the in-memory backend understands:
/// `SELECT * | col [AS label], ... FROM table [WHERE col = literal [AND ...]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub projection: Projection,
    pub filters: Vec<(String, Value)>,
}

pub fn parse_select(sql: &str) -> Result<SelectQuery> {
    let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|e| RecordError::ParseError(e.to_string()))?;

    if statements.len() != 1 {
        return Err(RecordError::UnsupportedOperation(
            "Exactly one statement expected".into(),
        ));
    }

    let sql_ast::Statement::Query(query) = statements.remove(0) else {
        return Err(RecordError::UnsupportedOperation(
            "Only SELECT queries supported".into(),
        ));
    };
    let sql_ast::SetExpr::Select(select) = *query.body else {
        return Err(RecordError::UnsupportedOperation(
            "Only SELECT queries supported".into(),
        ));
    };

    let table = match select.from.as_slice() {
        [from] if from.joins.is_empty() => match &from.relation {
            sql_ast::TableFactor::Table { name, .. } => extract_table_name(name)?,
            _ => {
                return Err(RecordError::UnsupportedOperation(
                    "Complex table references not supported".into(),
                ));
            }
        },
        _ => {
            return Err(RecordError::UnsupportedOperation(
                "Exactly one table without joins expected".into(),
            ));
        }
    };

    let mut columns = Vec::new();
    let mut wildcard = false;
    for item in select.projection {
        match item {
            sql_ast::SelectItem::Wildcard(_) => wildcard = true,
            sql_ast::SelectItem::UnnamedExpr(expr) => {
                let column = column_name(&expr)?;
                columns.push((column.clone(), column));
            }
            sql_ast::SelectItem::ExprWithAlias { expr, alias } => {
                columns.push((column_name(&expr)?, alias.value));
            }
            _ => {
                return Err(RecordError::UnsupportedOperation(
                    "Unsupported select item".into(),
                ));
            }
        }
    }
    if wildcard && !columns.is_empty() {
        return Err(RecordError::UnsupportedOperation(
            "Wildcard cannot be combined with columns".into(),
        ));
    }

    let mut filters = Vec::new();
    if let Some(selection) = &select.selection {
        collect_filters(selection, &mut filters)?;
    }

    Ok(SelectQuery {
        table,
        projection: if wildcard {
            Projection::All
        } else {
            Projection::Columns(columns)
        },
        filters,
    })
}

fn collect_filters(expr: &sql_ast::Expr, filters: &mut Vec<(String, Value)>) -> Result<()> {
    match expr {
        sql_ast::Expr::Nested(inner) => collect_filters(inner, filters),
        sql_ast::Expr::BinaryOp {
            left,
            op: sql_ast::BinaryOperator::And,
            right,
        } => {
            collect_filters(left, filters)?;
            collect_filters(right, filters)
        }
        sql_ast::Expr::BinaryOp {
            left,
            op: sql_ast::BinaryOperator::Eq,
            right,
        } => {
            let (column, literal) = match (column_name(left), column_name(right)) {
                (Ok(column), Err(_)) => (column, literal_value(right)?),
                (Err(_), Ok(column)) => (column, literal_value(left)?),
                _ => {
                    return Err(RecordError::UnsupportedOperation(
                        "Equality must compare a column with a literal".into(),
                    ));
                }
            };
            filters.push((column, literal));
            Ok(())
        }
        _ => Err(RecordError::UnsupportedOperation(format!(
            "Unsupported filter: {}",
            expr
        ))),
    }
}

fn column_name(expr: &sql_ast::Expr) -> Result<String> {
    match expr {
        sql_ast::Expr::Identifier(ident) => Ok(ident.value.clone()),
        sql_ast::Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|ident| ident.value.clone())
            .ok_or_else(|| RecordError::ParseError("Empty identifier".into())),
        _ => Err(RecordError::UnsupportedOperation(format!(
            "Expected a column, got: {}",
            expr
        ))),
    }
}

fn literal_value(expr: &sql_ast::Expr) -> Result<Value> {
    match expr {
        sql_ast::Expr::Value(value) => convert_value(&value.value),
        sql_ast::Expr::Nested(inner) => literal_value(inner),
        sql_ast::Expr::UnaryOp {
            op: sql_ast::UnaryOperator::Minus,
            expr,
        } => match literal_value(expr)? {
            Value::Integer(i) => Ok(Value::Integer(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(RecordError::ParseError(format!(
                "Cannot negate {}",
                other.type_name()
            ))),
        },
        _ => Err(RecordError::UnsupportedOperation(format!(
            "Expected a literal, got: {}",
            expr
        ))),
    }
}

fn convert_value(val: &sql_ast::Value) -> Result<Value> {
    match val {
        sql_ast::Value::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Integer(i))
            } else if let Ok(f) = n.parse::<f64>() {
                Ok(Value::Float(f))
            } else {
                Err(RecordError::ParseError(format!("Invalid number: {}", n)))
            }
        }
        sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
            Ok(Value::Text(s.clone()))
        }
        sql_ast::Value::Boolean(b) => Ok(Value::Boolean(*b)),
        sql_ast::Value::Null => Ok(Value::Null),
        _ => Err(RecordError::UnsupportedOperation(format!(
            "Unsupported value: {:?}",
            val
        ))),
    }
}

fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|ident| ident.to_string())
        .ok_or_else(|| RecordError::ParseError("Invalid table name".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wildcard() {
        let query = parse_select("SELECT * FROM users").unwrap();
        assert_eq!(query.table, "users");
        assert_eq!(query.projection, Projection::All);
        assert!(query.filters.is_empty());
    }

    #[test]
    fn test_parse_columns_aliases_and_filters() {
        let query =
            parse_select("SELECT id, name AS user_name FROM users WHERE active = true AND 3 = tier").unwrap();
        assert_eq!(
            query.projection,
            Projection::Columns(vec![
                ("id".into(), "id".into()),
                ("name".into(), "user_name".into()),
            ])
        );
        assert_eq!(
            query.filters,
            vec![
                ("active".into(), Value::Boolean(true)),
                ("tier".into(), Value::Integer(3)),
            ]
        );
    }

    #[test]
    fn test_negative_literal() {
        let query = parse_select("SELECT * FROM t WHERE balance = -5").unwrap();
        assert_eq!(query.filters, vec![("balance".into(), Value::Integer(-5))]);
    }

    #[test]
    fn test_rejects_other_statements() {
        assert!(parse_select("DELETE FROM users").is_err());
        assert!(parse_select("SELECT * FROM a JOIN b ON a.id = b.id").is_err());
        assert!(parse_select("SELECT * FROM users WHERE age > 3").is_err());
        assert!(parse_select("not sql").is_err());
    }
}
