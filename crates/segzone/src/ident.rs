//! Validated SQL identifiers and table names.
//!
//! Everything that ends up in generated SQL as a name (tables, schemas,
//! columns, indexes) goes through [`Ident`]. Values never do; they are bound.

use crate::error::{Result, SegzoneError};
use sea_query::{Alias, IntoTableRef, TableRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static IDENT_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles")
});

/// A bare SQL identifier matching `[A-Za-z_][A-Za-z0-9_]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if IDENT_RE.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(SegzoneError::InvalidIdentifier { ident: name })
        }
    }

    /// Build from a name assembled out of already-valid parts.
    pub(crate) fn trusted(name: String) -> Self {
        debug_assert!(IDENT_RE.is_match(&name), "untrusted identifier {name:?}");
        Self(name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier as a sea-query alias.
    #[must_use]
    pub fn alias(&self) -> Alias {
        Alias::new(self.0.as_str())
    }

    /// Double-quoted form for the few statements assembled by hand.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Prepend a prefix, producing another valid identifier.
    #[must_use]
    pub(crate) fn with_prefix(&self, prefix: &str) -> Self {
        Self(format!("{prefix}{}", self.0))
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ident {
    type Err = SegzoneError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Serialize for Ident {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Ident {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// A table name, optionally qualified by a schema: `schema.table` or `table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    schema: Option<Ident>,
    name: Ident,
}

impl TableName {
    #[must_use]
    pub fn new(schema: Option<Ident>, name: Ident) -> Self {
        Self { schema, name }
    }

    /// An unqualified table in the session's default schema.
    #[must_use]
    pub fn local(name: Ident) -> Self {
        Self { schema: None, name }
    }

    #[must_use]
    pub fn schema(&self) -> Option<&Ident> {
        self.schema.as_ref()
    }

    /// The table name without its schema.
    #[must_use]
    pub fn local_name(&self) -> &Ident {
        &self.name
    }

    /// The table as a sea-query table reference.
    #[must_use]
    pub fn table_ref(&self) -> TableRef {
        match &self.schema {
            Some(schema) => (schema.alias(), self.name.alias()).into_table_ref(),
            None => self.name.alias().into_table_ref(),
        }
    }

    /// Quoted, schema-qualified form for hand-assembled statements.
    #[must_use]
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema.quoted(), self.name.quoted()),
            None => self.name.quoted(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for TableName {
    type Err = SegzoneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((schema, name)) => Ok(Self::new(Some(Ident::new(schema)?), Ident::new(name)?)),
            None => Ok(Self::local(Ident::new(s)?)),
        }
    }
}

impl Serialize for TableName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TableName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
