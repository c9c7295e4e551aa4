//! Per-request query context and parameterized statement rendering.

use crate::sql::SqlValue;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Returns the placeholder for `v`. Nulls are inlined.
    fn push_param(&mut self, v: SqlValue) -> String {
        if v.is_null() {
            return "NULL".into();
        }
        self.params.push(v);
        format!("${}", self.params.len())
    }
}

/// A table identifier, optionally backed by a derived-table expression.
#[derive(Clone, Debug)]
pub struct TableRef {
    pub name: String,
    pub source: Option<String>,
}

impl TableRef {
    pub fn named(name: impl Into<String>) -> Self {
        TableRef {
            name: name.into(),
            source: None,
        }
    }

    fn render_from(&self) -> String {
        self.render_as(&self.name)
    }

    fn render_as(&self, alias: &str) -> String {
        match &self.source {
            Some(source) => format!("({}) AS {}", source, quoted(alias)),
            None if alias == self.name => quoted(&self.name),
            None => format!("{} AS {}", quoted(&self.name), quoted(alias)),
        }
    }
}

/// `<qualifier>.<name>`: a column of the root table or of a joined relation label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: String,
    pub name: String,
}

impl ColumnRef {
    pub fn new(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnRef {
            qualifier: qualifier.into(),
            name: name.into(),
        }
    }

    fn render(&self) -> String {
        format!("{}.{}", quoted(&self.qualifier), quoted(&self.name))
    }

    /// Result alias used by projection: `<qualifier>_<name>`.
    pub fn alias(&self) -> String {
        format!("{}_{}", self.qualifier, self.name)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.qualifier, self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: SqlValue,
    },
    /// OR of the inner conditions.
    AnyOf(Vec<Condition>),
}

impl Condition {
    pub fn eq(column: ColumnRef, value: SqlValue) -> Self {
        Condition::Compare {
            column,
            op: CompareOp::Eq,
            value,
        }
    }

    fn render(&self, q: &mut QueryBuf) -> String {
        match self {
            Condition::Compare { column, op, value } if value.is_null() => {
                let test = if *op == CompareOp::Ne { "IS NOT NULL" } else { "IS NULL" };
                format!("{} {}", column.render(), test)
            }
            Condition::Compare { column, op, value } => {
                let ph = q.push_param(value.clone());
                format!("{} {} {}", column.render(), op.as_sql(), ph)
            }
            Condition::AnyOf(parts) => {
                let rendered: Vec<String> = parts.iter().map(|c| c.render(q)).collect();
                format!("({})", rendered.join(" OR "))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Join {
    pub table: TableRef,
    pub alias: String,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

/// The query under construction for one request. Owned by that request only.
#[derive(Debug)]
pub struct QueryContext {
    root: TableRef,
    columns: Vec<ColumnRef>,
    joins: Vec<Join>,
    joined: HashSet<String>,
    conditions: Vec<Condition>,
    order_by: Vec<(ColumnRef, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryContext {
    pub fn new(root: TableRef) -> Self {
        QueryContext {
            root,
            columns: Vec::new(),
            joins: Vec::new(),
            joined: HashSet::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Selects `column` aliased as `<qualifier>_<name>`; a repeated column is selected once.
    pub fn add_column(&mut self, column: ColumnRef) {
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn is_joined(&self, label: &str) -> bool {
        self.joined.contains(label)
    }

    /// Left-joins `table` as `label` unless that label is already joined. Returns whether a join was added.
    pub fn left_join(&mut self, label: &str, table: TableRef, left: ColumnRef, right: ColumnRef) -> bool {
        if !self.joined.insert(label.to_string()) {
            return false;
        }
        self.joins.push(Join {
            table,
            alias: label.to_string(),
            left,
            right,
        });
        true
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn push_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn order_by(&mut self, column: ColumnRef, direction: SortDirection) {
        self.order_by.push((column, direction));
    }

    pub fn ordering(&self) -> &[(ColumnRef, SortDirection)] {
        &self.order_by
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    fn render_from_where(&self, q: &mut QueryBuf) -> String {
        let mut out = format!(" FROM {}", self.root.render_from());
        for join in &self.joins {
            out.push_str(&format!(
                " LEFT JOIN {} ON {} = {}",
                join.table.render_as(&join.alias),
                join.left.render(),
                join.right.render()
            ));
        }
        let where_parts: Vec<String> = self.conditions.iter().map(|c| c.render(q)).collect();
        if !where_parts.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&where_parts.join(" AND "));
        }
        out
    }

    /// SELECT with projection, joins, filters, ordering and paging.
    pub fn render_select(&self) -> QueryBuf {
        let mut q = QueryBuf::new();
        let select_list = if self.columns.is_empty() {
            format!("{}.*", quoted(&self.root.name))
        } else {
            self.columns
                .iter()
                .map(|c| format!("{} AS {}", c.render(), quoted(&c.alias())))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let from_where = self.render_from_where(&mut q);
        let order_clause = if self.order_by.is_empty() {
            String::new()
        } else {
            let parts: Vec<String> = self
                .order_by
                .iter()
                .map(|(c, d)| format!("{} {}", c.render(), d.as_sql()))
                .collect();
            format!(" ORDER BY {}", parts.join(", "))
        };
        let limit_clause = self.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
        let offset_clause = self.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
        q.sql = format!(
            "SELECT {}{}{}{}{}",
            select_list, from_where, order_clause, limit_clause, offset_clause
        );
        q
    }

    /// COUNT(*) sharing joins and filters, without projection, ordering or paging.
    pub fn render_count(&self) -> QueryBuf {
        let mut q = QueryBuf::new();
        let from_where = self.render_from_where(&mut q);
        q.sql = format!("SELECT COUNT(*) AS {}{}", quoted("count"), from_where);
        q
    }
}

/// Multi-row INSERT. Columns are the union over all rows in first-seen order; a row
/// lacking a column sends DEFAULT. With `noop_column`, a duplicate key becomes a
/// no-op update of that column. Several all-default rows need a `returning` column to
/// name in the column list; callers reject that case otherwise.
pub fn insert(
    table: &TableRef,
    rows: &[IndexMap<String, SqlValue>],
    noop_column: Option<&str>,
    returning: Option<&str>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols: Vec<&str> = Vec::new();
    for row in rows {
        for name in row.keys() {
            if !cols.contains(&name.as_str()) {
                cols.push(name.as_str());
            }
        }
    }
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let values: Vec<String> = cols
            .iter()
            .map(|c| match row.get(*c) {
                Some(v) => q.push_param(v.clone()),
                None => "DEFAULT".to_string(),
            })
            .collect();
        tuples.push(format!("({})", values.join(", ")));
    }
    let col_list = cols.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
    let mut sql = if cols.is_empty() {
        match (rows.len(), returning) {
            // all-default records: one DEFAULT tuple each
            (n, Some(col)) if n > 1 => format!(
                "INSERT INTO {} ({}) VALUES {}",
                quoted(&table.name),
                quoted(col),
                vec!["(DEFAULT)"; n].join(", ")
            ),
            _ => format!("INSERT INTO {} DEFAULT VALUES", quoted(&table.name)),
        }
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            quoted(&table.name),
            col_list,
            tuples.join(", ")
        )
    };
    if let Some(col) = noop_column {
        let c = quoted(col);
        sql.push_str(&format!(" ON CONFLICT ({}) DO UPDATE SET {} = EXCLUDED.{}", c, c, c));
    }
    if let Some(col) = returning {
        sql.push_str(&format!(" RETURNING {}", quoted(col)));
    }
    q.sql = sql;
    q
}

fn render_where(conditions: &[Condition], q: &mut QueryBuf) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = conditions.iter().map(|c| c.render(q)).collect();
    format!(" WHERE {}", parts.join(" AND "))
}

/// UPDATE with SET pairs, scoped by `conditions` (qualified by the table name).
pub fn update_where(table: &TableRef, sets: &[(String, SqlValue)], conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let set_clause = sets
        .iter()
        .map(|(col, v)| {
            let ph = q.push_param(v.clone());
            format!("{} = {}", quoted(col), ph)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let where_clause = render_where(conditions, &mut q);
    q.sql = format!("UPDATE {} SET {}{}", quoted(&table.name), set_clause, where_clause);
    q
}

/// DELETE scoped by `conditions` (qualified by the table name).
pub fn delete_where(table: &TableRef, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = render_where(conditions, &mut q);
    q.sql = format!("DELETE FROM {}{}", quoted(&table.name), where_clause);
    q
}
