//! Query model: filters, order directives, and limits.
//!
//! Parses the wire form used by `queryDocuments`, translates it into native
//! filter/sort documents for the MongoDB backend, and evaluates the same
//! operator semantics in memory for the in-memory backend. Filters are
//! AND-combined in input order; there is no OR composition, and cross-field
//! restrictions are left to the engine.

use std::cmp::Ordering;

use mongodb::bson::{doc, Bson, Document};
use serde_json::{Map, Value as JsonValue};

use crate::convert::json_to_bson;
use crate::error::{Result, ServerError};

/// Comparison operators accepted by `queryDocuments`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `array-contains`: the field is an array containing the value.
    ArrayContains,
    /// `array-contains-any`: the field is an array sharing an element with the value list.
    ArrayContainsAny,
    /// `in`: the field value is one of the listed values.
    In,
    /// `not-in`: the field value is none of the listed values.
    NotIn,
}

impl FilterOp {
    /// Parse the wire operator string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "array-contains" => Some(Self::ArrayContains),
            "array-contains-any" => Some(Self::ArrayContainsAny),
            "in" => Some(Self::In),
            "not-in" => Some(Self::NotIn),
            _ => None,
        }
    }

    /// The wire form of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::ArrayContains => "array-contains",
            Self::ArrayContainsAny => "array-contains-any",
            Self::In => "in",
            Self::NotIn => "not-in",
        }
    }

    /// True when the comparison value must be an array.
    pub fn wants_array(self) -> bool {
        matches!(self, Self::ArrayContainsAny | Self::In | Self::NotIn)
    }
}

/// One field comparison.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Field name, possibly a dotted path.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Comparison value.
    pub value: Bson,
}

/// Sort direction for an order directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `asc` (the default)
    Ascending,
    /// `desc`
    Descending,
}

/// One order directive.
#[derive(Debug, Clone)]
pub struct OrderBy {
    /// Field to sort on.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

/// A parsed query: filters, order directives, and an optional positive limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Filters, AND-combined in input order.
    pub filters: Vec<Filter>,
    /// Order directives, applied in input order.
    pub order_by: Vec<OrderBy>,
    /// Maximum result count.
    pub limit: Option<i64>,
}

impl Query {
    /// Parse the `filters`, `orderBy`, and `limit` arguments of a tool call.
    pub fn from_args(args: &Map<String, JsonValue>) -> Result<Self> {
        Ok(Self {
            filters: parse_filters(args)?,
            order_by: parse_order_by(args)?,
            limit: parse_limit(args)?,
        })
    }

    /// A limit-only query.
    pub fn with_limit(limit: Option<i64>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Native filter document. A single filter stays inline; several go under
    /// `$and` so repeated field names cannot collide in one document.
    pub fn filter_doc(&self) -> Document {
        let mut clauses: Vec<Document> = self.filters.iter().map(Filter::to_doc).collect();
        if clauses.is_empty() {
            Document::new()
        } else if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            doc! { "$and": clauses }
        }
    }

    /// Native sort document, directives in listed order.
    pub fn sort_doc(&self) -> Document {
        let mut sort = Document::new();
        for order in &self.order_by {
            let direction = match order.direction {
                Direction::Ascending => 1_i32,
                Direction::Descending => -1_i32,
            };
            sort.insert(order.field.as_str(), direction);
        }
        sort
    }
}

impl Filter {
    fn to_doc(&self) -> Document {
        let value = self.value.clone();
        let clause = match self.op {
            FilterOp::Eq => doc! { "$eq": value },
            FilterOp::Ne => doc! { "$ne": value },
            FilterOp::Lt => doc! { "$lt": value },
            FilterOp::Le => doc! { "$lte": value },
            FilterOp::Gt => doc! { "$gt": value },
            FilterOp::Ge => doc! { "$gte": value },
            FilterOp::ArrayContains => doc! { "$elemMatch": { "$eq": value } },
            FilterOp::ArrayContainsAny => doc! { "$elemMatch": { "$in": value } },
            FilterOp::In => doc! { "$in": value },
            FilterOp::NotIn => doc! { "$nin": value },
        };
        let mut doc = Document::new();
        doc.insert(self.field.as_str(), clause);
        doc
    }

    /// Evaluate this filter against a document (in-memory backend).
    ///
    /// Negated operators only match documents that carry the field.
    pub fn matches(&self, doc: &Document) -> bool {
        let field = lookup(doc, &self.field);
        match self.op {
            FilterOp::Eq => field.is_some_and(|v| bson_eq(v, &self.value)),
            FilterOp::Ne => field.is_some_and(|v| !bson_eq(v, &self.value)),
            FilterOp::Lt => cmp_matches(field, &self.value, |o| o == Ordering::Less),
            FilterOp::Le => cmp_matches(field, &self.value, |o| o != Ordering::Greater),
            FilterOp::Gt => cmp_matches(field, &self.value, |o| o == Ordering::Greater),
            FilterOp::Ge => cmp_matches(field, &self.value, |o| o != Ordering::Less),
            FilterOp::ArrayContains => {
                matches!(field, Some(Bson::Array(items)) if items.iter().any(|i| bson_eq(i, &self.value)))
            }
            FilterOp::ArrayContainsAny => match (field, &self.value) {
                (Some(Bson::Array(items)), Bson::Array(candidates)) => items
                    .iter()
                    .any(|i| candidates.iter().any(|c| bson_eq(i, c))),
                _ => false,
            },
            FilterOp::In => match &self.value {
                Bson::Array(candidates) => {
                    field.is_some_and(|v| candidates.iter().any(|c| bson_eq(v, c)))
                }
                _ => false,
            },
            FilterOp::NotIn => match &self.value {
                Bson::Array(candidates) => {
                    field.is_some_and(|v| !candidates.iter().any(|c| bson_eq(v, c)))
                }
                _ => false,
            },
        }
    }
}

fn cmp_matches(field: Option<&Bson>, value: &Bson, pred: impl Fn(Ordering) -> bool) -> bool {
    field.and_then(|v| compare(v, value)).is_some_and(pred)
}

/// Look up a possibly dotted field path (`a.b.c`) in a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut current = doc;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let value = current.get(part)?;
        if parts.peek().is_none() {
            return Some(value);
        }
        match value {
            Bson::Document(inner) => current = inner,
            _ => return None,
        }
    }
    None
}

/// Equality with numeric cross-type coercion, structural otherwise.
pub fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match compare(a, b) {
        Some(ord) => ord == Ordering::Equal,
        None => a == b,
    }
}

/// Ordering across comparable BSON scalars. Numbers compare across the
/// int/double divide; incomparable type pairs yield `None`.
pub fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            Some(x.timestamp_millis().cmp(&y.timestamp_millis()))
        }
        _ => {
            let x = numeric_value(a)?;
            let y = numeric_value(b)?;
            x.partial_cmp(&y)
        }
    }
}

fn numeric_value(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Stable-sort documents by the order directives, in listed order. Documents
/// missing a sort field collect at the ascending front.
pub fn sort_documents(docs: &mut [(String, Document)], order_by: &[OrderBy]) {
    docs.sort_by(|(_, a), (_, b)| {
        for order in order_by {
            let ord = match (lookup(a, &order.field), lookup(b, &order.field)) {
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let ord = match order.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn invalid(name: impl Into<String>, reason: impl Into<String>) -> ServerError {
    ServerError::InvalidArg {
        name: name.into(),
        reason: reason.into(),
    }
}

fn required_str<'a>(obj: &'a Map<String, JsonValue>, parent: &str, key: &str) -> Result<&'a str> {
    match obj.get(key) {
        None => Err(ServerError::MissingArg(format!("{parent}.{key}"))),
        Some(v) => v
            .as_str()
            .ok_or_else(|| invalid(format!("{parent}.{key}"), "expected a string")),
    }
}

fn parse_filters(args: &Map<String, JsonValue>) -> Result<Vec<Filter>> {
    let Some(raw) = args.get("filters") else {
        return Ok(Vec::new());
    };
    let items = raw
        .as_array()
        .ok_or_else(|| invalid("filters", "expected an array of filter objects"))?;

    let mut filters = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| invalid(format!("filters[{i}]"), "expected a filter object"))?;
        let parent = format!("filters[{i}]");
        let field = required_str(obj, &parent, "field")?.to_string();
        let op_raw = required_str(obj, &parent, "operator")?;
        let op = FilterOp::parse(op_raw).ok_or_else(|| {
            invalid(
                format!("{parent}.operator"),
                format!("unsupported operator '{op_raw}'"),
            )
        })?;
        let value = obj
            .get("value")
            .cloned()
            .ok_or_else(|| ServerError::MissingArg(format!("{parent}.value")))?;
        let value = json_to_bson(value);
        if op.wants_array() && !matches!(value, Bson::Array(_)) {
            return Err(invalid(
                format!("{parent}.value"),
                format!("operator '{}' requires an array value", op.as_str()),
            ));
        }
        filters.push(Filter { field, op, value });
    }
    Ok(filters)
}

fn parse_order_by(args: &Map<String, JsonValue>) -> Result<Vec<OrderBy>> {
    let Some(raw) = args.get("orderBy") else {
        return Ok(Vec::new());
    };
    let items = raw
        .as_array()
        .ok_or_else(|| invalid("orderBy", "expected an array of order directives"))?;

    let mut order_by = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| invalid(format!("orderBy[{i}]"), "expected an order directive object"))?;
        let parent = format!("orderBy[{i}]");
        let field = required_str(obj, &parent, "field")?.to_string();
        let direction = match obj.get("direction") {
            None => Direction::Ascending,
            Some(v) => match v.as_str() {
                Some("asc") => Direction::Ascending,
                Some("desc") => Direction::Descending,
                _ => {
                    return Err(invalid(
                        format!("{parent}.direction"),
                        "expected \"asc\" or \"desc\"",
                    ))
                }
            },
        };
        order_by.push(OrderBy { field, direction });
    }
    Ok(order_by)
}

/// Parse an optional `limit` argument; present values must be positive integers.
pub fn parse_limit(args: &Map<String, JsonValue>) -> Result<Option<i64>> {
    match args.get("limit") {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => match v.as_i64() {
            Some(n) if n > 0 => Ok(Some(n)),
            _ => Err(invalid("limit", "expected a positive integer")),
        },
    }
}
