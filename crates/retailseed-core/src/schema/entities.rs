//! # Entity Schema
//!
//! The nine retail entity types plus invoice lines. Every entity is keyed by
//! a dense integer assigned from its generation index, so a stage that
//! generated N items owns exactly the keys `first_key..first_key + N`.

use chrono::NaiveDateTime;

use crate::generate::value::Value;
use crate::schema::types::{EntityKind, Record};

/// City keys follow the IBGE municipality code layout: seven digits.
pub const CITY_KEY_BASE: i64 = 1_000_000;

/// Every other entity counts from 1.
pub const DEFAULT_KEY_BASE: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub city_id: i64,
    pub name: String,
    pub state: &'static str,
    pub region: &'static str,
    pub country: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub address_id: i64,
    pub street_name: &'static str,
    pub street_number: String,
    pub postal_code: i64,
    pub city_id: i64,
    pub abroad: bool,
    pub street_type: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Supplier {
    pub supplier_id: i64,
    pub name: String,
    pub invoices_on_account: bool,
    /// Days of credit granted when invoicing on account, 0 otherwise.
    pub grace_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Promotion {
    pub promotion_id: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub supplier_id: i64,
    pub sector_id: i64,
    pub unit_id: i64,
    pub fractional: bool,
    pub sale_price: f64,
    pub cost_price: f64,
    pub average_price: f64,
    pub promotion: Option<Promotion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub store_id: i64,
    pub name: String,
    pub address_id: i64,
    pub headquarters: bool,
}

/// A point-of-sale terminal (PDV).
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub terminal_id: i64,
    pub registration_number: i64,
    pub valid_from: NaiveDateTime,
    pub valid_until: NaiveDateTime,
    pub first_invoice_number: i64,
    pub last_invoice_number: i64,
    pub store_id: i64,
    /// Ordinal of the terminal inside its store.
    pub terminal_number: i64,
}

/// A cash register (caixa) and its operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub register_id: i64,
    pub operator_name: String,
    pub store_id: i64,
    pub on_leave: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
    pub loyal: bool,
    pub address_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Voucher,
    Card,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Voucher,
        PaymentMethod::Card,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub invoice_id: i64,
    pub terminal_id: i64,
    pub register_id: i64,
    pub customer_id: i64,
    pub invoice_number: i64,
    pub issued_at: NaiveDateTime,
    pub delivery: bool,
    pub total: f64,
    pub payment_method: PaymentMethod,
}

impl Invoice {
    /// Amount paid with `method`: the full total for the chosen method, zero
    /// for the other two.
    pub fn paid_with(&self, method: PaymentMethod) -> f64 {
        if self.payment_method == method {
            self.total
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLine {
    pub invoice_id: i64,
    /// 1-based position inside the invoice.
    pub line_id: i64,
    pub product_id: i64,
    pub quantity: f64,
    pub unit_price: f64,
    pub cost_price: f64,
    pub average_price: f64,
    pub promotion_price: Option<f64>,
}

/// An invoice together with the lines its total was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceWithLines {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
}

/// Conversion of a generated entity into the records written to the sinks.
pub trait ToRecords {
    fn to_records(&self) -> Vec<Record>;
}

impl City {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::City)
            .with("cod_ibge", self.city_id)
            .with("nom_cidade", self.name.clone())
            .with("nom_estado", self.state)
            .with("nom_regiao", self.region)
            .with("nom_pais", self.country)
    }
}

impl Address {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::Address)
            .with("cod_endereco", self.address_id)
            .with("nom_logradouro", self.street_name)
            .with("num_logradouro", self.street_number.clone())
            .with("cod_cep", self.postal_code)
            .with("cod_ibge", self.city_id)
            .with("flg_exterior", Value::flag(self.abroad))
            .with("tip_logradouro", self.street_type)
    }
}

impl Supplier {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::Supplier)
            .with("cod_fornecedor", self.supplier_id)
            .with("nom_fornecedor", self.name.clone())
            .with("flg_fatura", Value::flag(self.invoices_on_account))
            .with("num_dias_fatura", self.grace_days)
    }
}

impl Product {
    /// The price a sale is rung up at: the promotional price when one exists.
    pub fn unit_price(&self) -> f64 {
        self.promotion.map(|p| p.price).unwrap_or(self.sale_price)
    }

    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::Product)
            .with("cod_produto", self.product_id)
            .with("nom_produto", self.name.clone())
            .with("cod_fornecedor", self.supplier_id)
            .with("cod_setor", self.sector_id)
            .with("cod_unidade", self.unit_id)
            .with("flg_fracionado", Value::flag(self.fractional))
            .with("vlr_venda", self.sale_price)
            .with("vlr_custo", self.cost_price)
            .with("vlr_medio", self.average_price)
            .with_optional("cod_promocao", self.promotion.map(|p| p.promotion_id))
            .with_optional("vlr_promocao", self.promotion.map(|p| p.price))
    }
}

impl Store {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::Store)
            .with("cod_loja", self.store_id)
            .with("nom_loja", self.name.clone())
            .with("cod_endereco", self.address_id)
            .with("flg_matriz", Value::flag(self.headquarters))
    }
}

impl Terminal {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::Terminal)
            .with("cod_pdv", self.terminal_id)
            .with("num_registro", self.registration_number)
            .with("dat_inicio_vigencia", self.valid_from)
            .with("dat_fim_vigencia", self.valid_until)
            .with("num_nota_inicial", self.first_invoice_number)
            .with("num_nota_final", self.last_invoice_number)
            .with("cod_loja", self.store_id)
            .with("num_pdv_loja", self.terminal_number)
    }
}

impl Register {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::Register)
            .with("cod_caixa", self.register_id)
            .with("nom_caixa", self.operator_name.clone())
            .with("cod_loja", self.store_id)
            .with("flg_ferias", Value::flag(self.on_leave))
    }
}

impl Customer {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::Customer)
            .with("cod_cliente", self.customer_id)
            .with("nom_cliente", self.name.clone())
            .with("flg_fidelizado", Value::flag(self.loyal))
            .with("cod_endereco", self.address_id)
    }
}

impl Invoice {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::Invoice)
            .with("seq_nota", self.invoice_id)
            .with("cod_pdv", self.terminal_id)
            .with("cod_caixa", self.register_id)
            .with("cod_cliente", self.customer_id)
            .with("num_nota", self.invoice_number)
            .with("dat_nota", self.issued_at)
            .with("flg_entrega", Value::flag(self.delivery))
            .with("vlr_nota", self.total)
            .with("vlr_dinheiro", self.paid_with(PaymentMethod::Cash))
            .with("vlr_tick", self.paid_with(PaymentMethod::Voucher))
            .with("vlr_cartao", self.paid_with(PaymentMethod::Card))
    }
}

impl InvoiceLine {
    pub fn to_record(&self) -> Record {
        Record::new(EntityKind::InvoiceLine)
            .with("seq_item_nota", self.line_id)
            .with("seq_nota", self.invoice_id)
            .with("cod_produto", self.product_id)
            .with("qtd_produto", self.quantity)
            .with("vlr_venda", self.unit_price)
            .with("vlr_custo", self.cost_price)
            .with("vlr_medio", self.average_price)
            .with_nullable("vlr_promocao", self.promotion_price)
    }
}

macro_rules! single_record {
    ($($entity:ty),* $(,)?) => {
        $(
            impl ToRecords for $entity {
                fn to_records(&self) -> Vec<Record> {
                    vec![self.to_record()]
                }
            }
        )*
    };
}

single_record!(City, Address, Supplier, Product, Store, Terminal, Register, Customer);

impl ToRecords for InvoiceWithLines {
    /// The invoice first, then its lines in order.
    fn to_records(&self) -> Vec<Record> {
        let mut records = Vec::with_capacity(self.lines.len() + 1);
        records.push(self.invoice.to_record());
        records.extend(self.lines.iter().map(InvoiceLine::to_record));
        records
    }
}
