//! # Fact Providers
//!
//! Stateless functions that turn draws from an rng into plausible field
//! values: person names from the `fake` pt_BR locale, place and product
//! names from fixed vocabularies, monetary amounts, dates relative to a
//! pinned base time, and percentage flags.
//!
//! Monetary values are rounded the moment they are computed, never at
//! serialization time. Rounding truncates toward zero after scaling by 100,
//! so `12.349` becomes `12.34`.

use chrono::{Days, Months, NaiveDateTime};
use fake::faker::name::pt_br::{FirstName, LastName};
use fake::Fake;
use rand::Rng;

pub const STATES: &[&str] = &[
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

pub const REGIONS: &[&str] = &["Norte", "Nordeste", "Centro-Oeste", "Sudeste", "Sul"];

pub const COUNTRY: &str = "Brasil";

pub const STREET_TYPES: &[&str] = &["R", "AV", "AL", "EST", "ROD", "PRÇ", "VL"];

pub const STREET_NAMES: &[&str] = &[
    "Flores",
    "Palmeiras",
    "Ipê",
    "Jatobá",
    "Araçá",
    "Tucumã",
    "Brasil",
    "Santos Dumont",
    "Getúlio Vargas",
    "JK",
    "Amazonas",
    "Rui Barbosa",
    "Marechal Deodoro",
    "Principal",
    "Comercial",
    "Industrial",
    "Central",
    "Jatoba",
    "das Araras",
    "dos Bandeirantes",
    "Coronel Fawcett",
];

pub const PRODUCT_ITEMS: &[&str] = &[
    "Arroz",
    "Feijão",
    "Macarrão",
    "Açúcar",
    "Café",
    "Leite",
    "Óleo",
    "Farinha",
    "Sal",
    "Carne",
    "Frango",
    "Peixe",
    "Pão",
    "Cerveja",
    "Refrigerante",
    "Suco",
    "Biscoito",
    "Chocolate",
    "Sorvete",
    "Sabão",
    "Detergente",
    "Desinfetante",
    "Papel Higiênico",
    "Shampoo",
    "Condicionador",
];

pub const PRODUCT_VARIANTS: &[&str] = &[
    "Tipo 1",
    "Premium",
    "Gold",
    "Silver",
    "Tradicional",
    "Especial",
    "Extra",
    "Super",
    "Master",
    "Light",
    "Integral",
    "Natural",
    "Original",
    "Fino",
    "Clássico",
    "Orgânico",
    "Zero",
    "Plus",
    "Mega",
    "Ultra",
    "Soft",
    "Fresh",
    "Tropical",
    "Gourmet",
];

pub const PRODUCT_BRANDS: &[&str] = &[
    "Nova Era",
    "Tradição",
    "Qualidade",
    "Campo Bom",
    "Delícia",
    "Saúde Total",
    "Sabor Perfeito",
    "MasterFood",
    "Naturalmente",
    "BomGosto",
    "AmigoDia",
    "CasaFeliz",
    "PuroBem",
    "DeliciaReal",
];

/// Cents are snapped to this many millionths before truncating, so a value
/// already exact to the cent (64.74, stored as 6473.999... cents) keeps it.
const CENT_SNAP: f64 = 1e6;

/// Truncate a monetary amount to 2 decimal places, toward zero.
///
/// Idempotent: `round2(round2(x)) == round2(x)`.
pub fn round2(amount: f64) -> f64 {
    let cents = (amount * 100.0 * CENT_SNAP).round() / CENT_SNAP;
    cents.trunc() / 100.0
}

/// Pick one entry of a static vocabulary uniformly.
pub fn pick(rng: &mut impl Rng, vocabulary: &'static [&'static str]) -> &'static str {
    vocabulary[rng.random_range(0..vocabulary.len())]
}

/// A flag that is set in `percent`% of draws.
pub fn chance(rng: &mut impl Rng, percent: u32) -> bool {
    rng.random_range(0..100) < percent
}

/// Uniform integer in `low..=high`.
pub fn int_between(rng: &mut impl Rng, low: i64, high: i64) -> i64 {
    rng.random_range(low..=high)
}

/// "{first} {last}", used for customers and register operators.
pub fn person_name(rng: &mut impl Rng) -> String {
    let first: String = FirstName().fake_with_rng(rng);
    let last: String = LastName().fake_with_rng(rng);
    format!("{} {}", first, last)
}

pub fn supplier_name(rng: &mut impl Rng) -> String {
    format!("{} Ltda", person_name(rng))
}

/// "{brand} {item} {variant}", e.g. "Campo Bom Café Gourmet".
pub fn product_name(rng: &mut impl Rng) -> String {
    let brand = pick(rng, PRODUCT_BRANDS);
    let item = pick(rng, PRODUCT_ITEMS);
    let variant = pick(rng, PRODUCT_VARIANTS);
    format!("{} {} {}", brand, item, variant)
}

/// Uniform amount in `[low, high)`, rounded to cents.
pub fn money_between(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    round2(low + rng.random::<f64>() * (high - low))
}

/// Uniform float in `[low, high)`, unrounded (margins, ratios).
pub fn ratio_between(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    low + rng.random::<f64>() * (high - low)
}

/// Prices derived from a unit cost and a margin multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub cost: f64,
    pub sale: f64,
    pub average: f64,
}

/// Sale price is `cost * margin`; the average price sits halfway between
/// cost and sale. `cost` is already in cents; the derived figures are
/// rounded as they are computed.
pub fn price_from_margin(cost: f64, margin: f64) -> Pricing {
    let sale = round2(cost * margin);
    let average = round2((cost + sale) / 2.0);
    Pricing {
        cost,
        sale,
        average,
    }
}

/// Promotions take 30% off the sale price.
pub fn promotion_price(sale: f64) -> f64 {
    round2(sale * 0.7)
}

/// Units sold on one invoice line: 1 to 10, plus a tenth-step fraction in
/// `0.0..=0.9` when the product is sold by weight.
pub fn line_quantity(rng: &mut impl Rng, fractional: bool) -> f64 {
    let whole = rng.random_range(1..=10) as f64;
    if fractional {
        whole + rng.random_range(0..10) as f64 / 10.0
    } else {
        whole
    }
}

/// `base` moved back by `years`, then by up to `max_months` months and up to
/// `max_days` days (both exclusive upper bounds).
///
/// Calendar arithmetic clamps to month ends; on the (unreachable in practice)
/// overflow the unshifted component is kept.
pub fn date_before(
    rng: &mut impl Rng,
    base: NaiveDateTime,
    years: u32,
    max_months: u32,
    max_days: u64,
) -> NaiveDateTime {
    let months = years * 12 + rng.random_range(0..max_months);
    let days = rng.random_range(0..max_days);
    let shifted = base.checked_sub_months(Months::new(months)).unwrap_or(base);
    shifted.checked_sub_days(Days::new(days)).unwrap_or(shifted)
}

/// `start` moved forward by whole years.
pub fn years_after(start: NaiveDateTime, years: u32) -> NaiveDateTime {
    start
        .checked_add_months(Months::new(years * 12))
        .unwrap_or(start)
}
