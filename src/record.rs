use chrono::NaiveDate;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;

pub const ID_FIELD: &str = "id";

pub type RecordId = String;

/// Kind of a declared field. Form input is coerced into this kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            name: name.into(),
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Field::new(name, FieldKind::Text)
    }

    /// Header label: first letter upper case, underscores as spaces.
    pub fn label(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars)
                .collect::<String>()
                .replace('_', " "),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    /// Coerce raw user input into `kind`. Input that does not parse stays text.
    pub fn parse_as(kind: FieldKind, raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Empty;
        }
        match kind {
            FieldKind::Number => trimmed
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            FieldKind::Date => crate::dates::parse_date(trimmed)
                .map(Value::Date)
                .unwrap_or_else(|| Value::Text(raw.to_string())),
            FieldKind::Text => Value::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Empty => 0,
            Value::Number(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }

    /// Natural ordering: numeric, chronological or lexicographic within a
    /// kind, `Empty < Number < Date < Text` across kinds.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// Field values of a record, without its id, in insertion order.
pub type Fields = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    values: Fields,
}

static EMPTY: Value = Value::Empty;

impl Record {
    pub(crate) fn new(id: RecordId, mut values: Fields) -> Self {
        values.shift_remove(ID_FIELD);
        Record { id, values }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Value of `field`; `id` resolves to the record id, absent fields to `Empty`.
    pub fn get(&self, field: &str) -> Value {
        if field == ID_FIELD {
            return Value::Text(self.id.clone());
        }
        self.values.get(field).cloned().unwrap_or(Value::Empty)
    }

    pub(crate) fn get_ref(&self, field: &str) -> Option<&Value> {
        if field == ID_FIELD {
            return None;
        }
        Some(self.values.get(field).unwrap_or(&EMPTY))
    }

    pub fn values(&self) -> &Fields {
        &self.values
    }

    pub(crate) fn replace_values(&mut self, mut values: Fields) {
        values.shift_remove(ID_FIELD);
        self.values = values;
    }

    /// String form of `field` as used for filtering and display.
    pub fn display(&self, field: &str) -> String {
        match self.get_ref(field) {
            Some(v) => v.to_string(),
            None => self.id.clone(),
        }
    }
}

/// Build a `Fields` map from `(name, value)` pairs.
pub fn fields<K, V, I>(pairs: I) -> Fields
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
