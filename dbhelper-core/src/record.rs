use crate::Value;

/// Column names the helper leaves to the engine defaults on insert.
pub const TIMESTAMP_COLUMNS: [&str; 4] = ["createTime", "updateTime", "created_at", "updated_at"];

/// Ordered list of `(column, value)` pairs written by inserts and updates.
///
/// ```rust
/// use dbhelper_core::{Record, Value};
/// let record = Record::new()
///     .set("name", "eva")
///     .set("age", 31)
///     .set("created_at", "2024-01-01 00:00:00")
///     .omit_timestamps();
/// assert_eq!(record.columns().collect::<Vec<_>>(), ["name", "age"]);
/// assert_eq!(record.get("age"), Some(&Value::Int64(31)));
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column`, replacing the value in place if it is already present.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(field) => field.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let i = self.fields.iter().position(|(c, _)| c == column)?;
        Some(self.fields.remove(i).1)
    }

    pub fn omit<'a>(mut self, columns: impl IntoIterator<Item = &'a str>) -> Self {
        for column in columns {
            self.remove(column);
        }
        self
    }

    /// Drop the creation and update timestamps so the engine fills them in.
    pub fn omit_timestamps(self) -> Self {
        self.omit(TIMESTAMP_COLUMNS)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + Clone {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + Clone {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + Clone {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True if both records have the same columns in the same order.
    pub fn same_columns(&self, other: &Record) -> bool {
        self.columns().eq(other.columns())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;
    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
