//! In-memory stand-in for a SQL Server database.
//!
//! `FakeDatabase` answers the catalog query from registered table
//! definitions. For a probe query it parses the WHERE clause it receives
//! (`[c] LIKE @P2`, `[c] = @P1` and the `CONVERT(VARCHAR(10), [c], 23|101)`
//! date forms joined by `OR`) and returns the first stored row that
//! satisfies it. Comparisons follow the server's rules closely enough that a
//! missing predicate finds nothing and an unconvertible `=` operand fails
//! the statement. Every statement is recorded so tests can assert on query
//! traffic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::condition::MAX_DECIMAL_PRECISION;
use crate::error::SearchError;
use crate::executor::{ConnectionSource, QueryExecutor};
use crate::results::ResultSet;
use crate::schema::{CATALOG_COLUMNS_QUERY, ColumnInfo};
use crate::types::{ISO_DATE_FORMAT, RowValues, US_DATE_FORMAT};

#[derive(Debug, Clone, Default)]
struct FakeTable {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<RowValues>>,
}

#[derive(Debug, Default)]
struct FakeState {
    tables: HashMap<String, FakeTable>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    unreachable: bool,
    statements: Vec<String>,
    connections_opened: usize,
}

/// Shared handle to the fake; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table with `(name, sql type)` columns. Exact numeric types
    /// may carry their width, as in `decimal(10,2)`.
    #[must_use]
    pub fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.lock().tables.insert(
            name.to_string(),
            FakeTable {
                columns: columns.iter().map(|(n, t)| fake_column(n, t)).collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    /// Append a row to a registered table.
    #[must_use]
    pub fn with_row(self, table: &str, row: Vec<RowValues>) -> Self {
        if let Some(t) = self.lock().tables.get_mut(table) {
            t.rows.push(row);
        }
        self
    }

    /// Make probe queries against `table` fail with a connection error.
    #[must_use]
    pub fn failing_on(self, table: &str) -> Self {
        self.lock().failing.insert(table.to_string());
        self
    }

    /// Delay probe queries against `table`.
    #[must_use]
    pub fn slow_on(self, table: &str, delay: Duration) -> Self {
        self.lock().delays.insert(table.to_string(), delay);
        self
    }

    /// Refuse every new connection.
    #[must_use]
    pub fn unreachable(self) -> Self {
        self.lock().unreachable = true;
        self
    }

    /// A single session on this database.
    #[must_use]
    pub fn connection(&self) -> FakeConnection {
        FakeConnection { db: self.clone() }
    }

    /// Every statement received so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Statements other than catalog lookups.
    #[must_use]
    pub fn probe_statements(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| s != CATALOG_COLUMNS_QUERY)
            .collect()
    }

    #[must_use]
    pub fn connections_opened(&self) -> usize {
        self.lock().connections_opened
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn catalog(&self, params: &[RowValues]) -> ResultSet {
        let table_name = params.first().and_then(RowValues::as_text).unwrap_or("");
        let mut rs = ResultSet::with_capacity(8);
        rs.set_column_names(Arc::new(vec![
            "COLUMN_NAME".into(),
            "DATA_TYPE".into(),
            "NUMERIC_PRECISION".into(),
            "NUMERIC_SCALE".into(),
        ]));
        if let Some(table) = self.lock().tables.get(table_name) {
            for column in &table.columns {
                let (precision, scale) = match column.numeric_precision {
                    Some((p, s)) => (RowValues::Int(p.into()), RowValues::Int(s.into())),
                    None => (RowValues::Null, RowValues::Null),
                };
                rs.add_row_values(vec![
                    RowValues::Text(column.name.clone()),
                    RowValues::Text(column.data_type.clone()),
                    precision,
                    scale,
                ]);
            }
        }
        rs
    }

    async fn probe(&self, query: &str, params: &[RowValues]) -> Result<ResultSet, SearchError> {
        let (table_name, where_clause) = split_probe(query).ok_or_else(|| unsupported(query))?;
        let filters = parse_where(where_clause).ok_or_else(|| unsupported(query))?;

        let delay = self.lock().delays.get(&table_name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        if state.failing.contains(&table_name) {
            return Err(SearchError::ConnectionError(format!(
                "connection reset while reading {table_name}"
            )));
        }
        let table = state.tables.get(&table_name).ok_or_else(|| {
            SearchError::ExecutionError(format!("Invalid object name '{table_name}'"))
        })?;

        let mut rs = ResultSet::with_capacity(1);
        rs.set_column_names(Arc::new(
            table.columns.iter().map(|c| c.name.clone()).collect(),
        ));
        for row in &table.rows {
            if row_satisfies(table, row, &filters, params)? {
                rs.add_row_values(row.clone());
                break;
            }
        }
        Ok(rs)
    }
}

/// One session on a [`FakeDatabase`].
#[derive(Debug, Clone)]
pub struct FakeConnection {
    db: FakeDatabase,
}

#[async_trait]
impl QueryExecutor for FakeConnection {
    async fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SearchError> {
        self.db.lock().statements.push(query.to_string());
        if query == CATALOG_COLUMNS_QUERY {
            Ok(self.db.catalog(params))
        } else {
            self.db.probe(query, params).await
        }
    }
}

#[async_trait]
impl ConnectionSource for FakeDatabase {
    type Connection = FakeConnection;

    async fn acquire(&self) -> Result<Self::Connection, SearchError> {
        let mut state = self.lock();
        if state.unreachable {
            return Err(SearchError::ConnectionError(
                "server did not respond".to_string(),
            ));
        }
        state.connections_opened += 1;
        drop(state);
        Ok(self.connection())
    }
}

fn fake_column(name: &str, sql_type: &str) -> ColumnInfo {
    let width = sql_type.split_once('(').and_then(|(ty, rest)| {
        let inner = rest.strip_suffix(')')?;
        let (p, s) = inner.split_once(',').unwrap_or((inner, "0"));
        Some((ty, p.trim().parse().ok()?, s.trim().parse().ok()?))
    });
    match width {
        Some((ty, p, s)) => ColumnInfo::new(name, ty.trim()).with_numeric_precision(p, s),
        None => ColumnInfo::new(name, sql_type),
    }
}

fn unsupported(query: &str) -> SearchError {
    SearchError::ExecutionError(format!("fake database cannot parse: {query}"))
}

/// One comparison of the WHERE clause against a named column.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    Like { column: String, param: usize },
    Equals { column: String, param: usize },
    DateLike { column: String, style: u32, param: usize },
}

/// Table name and WHERE clause out of `... FROM [name] WHERE ...`.
fn split_probe(query: &str) -> Option<(String, &str)> {
    let start = query.find(" FROM [")? + " FROM [".len();
    let (table, rest) = read_identifier_body(&query[start..])?;
    Some((table, rest.strip_prefix(" WHERE ")?))
}

/// Reads the inside of a bracket-quoted identifier up to its closing `]`.
fn read_identifier_body(s: &str) -> Option<(String, &str)> {
    let mut name = String::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == ']' {
            if chars.peek().is_some_and(|(_, next)| *next == ']') {
                chars.next();
                name.push(']');
            } else {
                return Some((name, &s[i + 1..]));
            }
        } else {
            name.push(c);
        }
    }
    None
}

fn read_identifier(s: &str) -> Option<(String, &str)> {
    read_identifier_body(s.strip_prefix('[')?)
}

fn read_param(s: &str) -> Option<usize> {
    let n: usize = s.trim().strip_prefix("@P")?.parse().ok()?;
    n.checked_sub(1)
}

/// Splits on ` OR ` outside parentheses and quoted identifiers.
fn split_or(clause: &str) -> Vec<&str> {
    let bytes = clause.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_identifier = false;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b']' if in_identifier => {
                if bytes.get(i + 1) == Some(&b']') {
                    i += 1;
                } else {
                    in_identifier = false;
                }
            }
            _ if in_identifier => {}
            b'[' => in_identifier = true,
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && bytes[i..].starts_with(b" OR ") => {
                parts.push(&clause[start..i]);
                i += " OR ".len();
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&clause[start..]);
    parts
}

fn parse_where(clause: &str) -> Option<Vec<Filter>> {
    let mut filters = Vec::new();
    for term in split_or(clause) {
        let term = term.trim();
        if let Some(inner) = term.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            filters.extend(parse_where(inner)?);
        } else if let Some(rest) = term.strip_prefix("CONVERT(VARCHAR(10), ") {
            let (column, rest) = read_identifier(rest)?;
            let (style, rest) = rest.strip_prefix(", ")?.split_once(") LIKE ")?;
            filters.push(Filter::DateLike {
                column,
                style: style.trim().parse().ok()?,
                param: read_param(rest)?,
            });
        } else {
            let (column, rest) = read_identifier(term)?;
            if let Some(param) = rest.strip_prefix(" LIKE ") {
                filters.push(Filter::Like {
                    column,
                    param: read_param(param)?,
                });
            } else {
                filters.push(Filter::Equals {
                    column,
                    param: read_param(rest.strip_prefix(" = ")?)?,
                });
            }
        }
    }
    Some(filters)
}

fn row_satisfies(
    table: &FakeTable,
    row: &[RowValues],
    filters: &[Filter],
    params: &[RowValues],
) -> Result<bool, SearchError> {
    for filter in filters {
        let (column, param) = match filter {
            Filter::Like { column, param }
            | Filter::Equals { column, param }
            | Filter::DateLike { column, param, .. } => (column, *param),
        };
        let idx = table
            .columns
            .iter()
            .position(|c| &c.name == column)
            .ok_or_else(|| SearchError::ExecutionError(format!("Invalid column name '{column}'")))?;
        let cell = row.get(idx).unwrap_or(&RowValues::Null);
        let operand = params.get(param).and_then(RowValues::as_text).ok_or_else(|| {
            SearchError::ExecutionError(format!("Must declare the scalar variable \"@P{}\"", param + 1))
        })?;

        let hit = match filter {
            Filter::Like { .. } => !cell.is_null() && like(&cell.to_string(), operand),
            Filter::DateLike { style, .. } => {
                let format = match style {
                    23 => ISO_DATE_FORMAT,
                    101 => US_DATE_FORMAT,
                    other => {
                        return Err(SearchError::ExecutionError(format!(
                            "fake database has no date style {other}"
                        )));
                    }
                };
                cell.as_date()
                    .is_some_and(|d| like(&d.format(format).to_string(), operand))
            }
            Filter::Equals { .. } => equals(&table.columns[idx], cell, operand)?,
        };
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `cell = operand` with the text operand converted to the column's type.
fn equals(column: &ColumnInfo, cell: &RowValues, operand: &str) -> Result<bool, SearchError> {
    let conversion_failed = || {
        SearchError::ExecutionError(format!(
            "Conversion failed when converting the nvarchar value '{operand}' to data type {}",
            column.data_type
        ))
    };
    let overflow = || {
        SearchError::ExecutionError(format!(
            "Arithmetic overflow error converting nvarchar to data type {}",
            column.data_type
        ))
    };

    match cell {
        RowValues::Null => Ok(false),
        RowValues::Int(value) => {
            let wanted: i64 = operand.trim().parse().map_err(|_| conversion_failed())?;
            if column
                .integer_range()
                .is_some_and(|(min, max)| !(min..=max).contains(&wanted))
            {
                return Err(overflow());
            }
            Ok(wanted == *value)
        }
        RowValues::Decimal(_) | RowValues::Float(_) => {
            let body = operand.trim().trim_start_matches(['+', '-']);
            let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
            let int_digits = int_part.trim_start_matches('0').len();
            let limit = column
                .integer_digit_limit()
                .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
            let max_digits = usize::try_from(MAX_DECIMAL_PRECISION).unwrap_or(usize::MAX);
            if int_digits + frac_part.len() > max_digits || int_digits > limit {
                return Err(overflow());
            }
            let wanted: f64 = operand.trim().parse().map_err(|_| conversion_failed())?;
            let stored: f64 = cell.to_string().parse().map_err(|_| conversion_failed())?;
            Ok(wanted == stored)
        }
        RowValues::Text(text) => Ok(text.to_lowercase() == operand.to_lowercase()),
        other => Ok(other.to_string() == operand),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LikeToken {
    AnyRun,
    AnyOne,
    OneOf(Vec<char>),
    Literal(char),
}

impl LikeToken {
    fn accepts(&self, c: char) -> bool {
        match self {
            LikeToken::AnyRun | LikeToken::AnyOne => true,
            LikeToken::OneOf(set) => set.contains(&c),
            LikeToken::Literal(l) => *l == c,
        }
    }
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            '[' => {
                let mut set = Vec::new();
                // The first char after `[` is a member even when it is `]`.
                if let Some(first) = chars.next() {
                    set.push(first);
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    set.push(c);
                }
                LikeToken::OneOf(set)
            }
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

fn like_matches(text: &[char], pattern: &[LikeToken]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((LikeToken::AnyRun, rest)) => (0..=text.len()).any(|i| like_matches(&text[i..], rest)),
        Some((token, rest)) => text
            .split_first()
            .is_some_and(|(c, tail)| token.accepts(*c) && like_matches(tail, rest)),
    }
}

/// `text LIKE pattern` under a case-insensitive collation.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    like_matches(&text, &like_tokens(&pattern.to_lowercase()))
}
