use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::generate::value::Value;

/// A row read back from a sink: field name to value, in sink order.
pub type Row = IndexMap<String, Value>;

/// The record types written to both sinks.
///
/// Table/collection and field names follow the retail schema both sinks
/// were created with, so they stay in the sink's vocabulary rather than
/// the Rust one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    City,
    Address,
    Supplier,
    Product,
    Store,
    Terminal,
    Register,
    Customer,
    Invoice,
    InvoiceLine,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::City,
        EntityKind::Address,
        EntityKind::Supplier,
        EntityKind::Product,
        EntityKind::Store,
        EntityKind::Terminal,
        EntityKind::Register,
        EntityKind::Customer,
        EntityKind::Invoice,
        EntityKind::InvoiceLine,
    ];

    /// Collection name in the document store, table name in the wide-column store.
    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::City => "cidade",
            EntityKind::Address => "endereco",
            EntityKind::Supplier => "fornecedor",
            EntityKind::Product => "produto",
            EntityKind::Store => "loja",
            EntityKind::Terminal => "pdv",
            EntityKind::Register => "caixa",
            EntityKind::Customer => "cliente",
            EntityKind::Invoice => "nota_fiscal",
            EntityKind::InvoiceLine => "item_nota_fiscal",
        }
    }

    /// Fields that identify a record. Upserts match on these.
    pub fn key_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::City => &["cod_ibge"],
            EntityKind::Address => &["cod_endereco"],
            EntityKind::Supplier => &["cod_fornecedor"],
            EntityKind::Product => &["cod_produto"],
            EntityKind::Store => &["cod_loja"],
            EntityKind::Terminal => &["cod_pdv"],
            EntityKind::Register => &["cod_caixa"],
            EntityKind::Customer => &["cod_cliente"],
            EntityKind::Invoice => &["seq_nota"],
            EntityKind::InvoiceLine => &["seq_nota", "seq_item_nota"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::City => "city",
            EntityKind::Address => "address",
            EntityKind::Supplier => "supplier",
            EntityKind::Product => "product",
            EntityKind::Store => "store",
            EntityKind::Terminal => "terminal",
            EntityKind::Register => "register",
            EntityKind::Customer => "customer",
            EntityKind::Invoice => "invoice",
            EntityKind::InvoiceLine => "invoice line",
        };
        write!(f, "{}", label)
    }
}

/// A sink-neutral record: an entity kind plus ordered fields.
///
/// Optional fields come in two flavors. A field left out of `fields` is
/// *absent* (MongoDB: no key; CQL: `DEFAULT UNSET`). A field holding
/// `Value::Null` is *present but empty* (MongoDB: `null`; CQL: `null`).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: EntityKind,
    fields: IndexMap<&'static str, Value>,
}

impl Record {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            fields: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.fields.insert(name, value.into());
        self
    }

    /// Insert the field only when a value is present; `None` leaves it absent.
    pub fn with_optional<V: Into<Value>>(mut self, name: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.fields.insert(name, v.into());
        }
        self
    }

    /// Always insert the field; `None` becomes an explicit null.
    pub fn with_nullable<V: Into<Value>>(mut self, name: &'static str, value: Option<V>) -> Self {
        let value = value.map(Into::into).unwrap_or(Value::Null);
        self.fields.insert(name, value);
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn table_name(&self) -> &'static str {
        self.kind.table_name()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    /// The identifying fields of this record, in key order.
    pub fn key(&self) -> RecordKey {
        RecordKey(
            self.kind
                .key_fields()
                .iter()
                .map(|name| (*name, self.get(name).cloned().unwrap_or(Value::Null)))
                .collect(),
        )
    }

    /// Serialize as a flat JSON object, the shape `INSERT ... JSON` expects.
    pub fn to_json_string(&self) -> String {
        let object: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        serde_json::Value::Object(object).to_string()
    }

    pub fn to_row(&self) -> Row {
        self.fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

/// Identifying fields of a record. Displays as `seq_nota=5,seq_item_nota=2`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordKey(pub Vec<(&'static str, Value)>);

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}
