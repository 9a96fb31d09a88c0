//! # Product Catalog
//!
//! Invoice lines may reference any product, not only the ones a given worker
//! happens to have seen, so the invoice stage reads the whole product table
//! back from a sink and holds it in memory. The catalog is immutable once
//! built and shared across all invoice workers behind an `Arc`.

use rand::Rng;

use crate::error::{Result, RetailSeedError};
use crate::schema::entities::Product;
use crate::schema::types::{EntityKind, Row};

/// The product fields invoice lines copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub product_id: i64,
    pub fractional: bool,
    pub sale_price: f64,
    pub cost_price: f64,
    pub average_price: f64,
    pub promotion_price: Option<f64>,
}

impl CatalogProduct {
    /// The price a line is sold at: the promotional price when one exists.
    pub fn unit_price(&self) -> f64 {
        self.promotion_price.unwrap_or(self.sale_price)
    }

    /// Decode a product row as written by either sink.
    ///
    /// A missing or null `vlr_promocao` both mean "no promotion".
    pub fn from_row(row: &Row) -> std::result::Result<Self, String> {
        let int = |name: &str| {
            row.get(name)
                .and_then(|v| v.as_int())
                .ok_or_else(|| format!("missing or non-integer '{}'", name))
        };
        let float = |name: &str| {
            row.get(name)
                .and_then(|v| v.as_float())
                .ok_or_else(|| format!("missing or non-numeric '{}'", name))
        };
        let fractional = match row.get("flg_fracionado").and_then(|v| v.as_string()) {
            Some("S") => true,
            Some("N") => false,
            other => return Err(format!("unexpected flg_fracionado {:?}", other)),
        };
        let promotion_price = match row.get("vlr_promocao") {
            None => None,
            Some(v) if v.is_null() => None,
            Some(v) => Some(
                v.as_float()
                    .ok_or_else(|| "non-numeric 'vlr_promocao'".to_string())?,
            ),
        };

        Ok(Self {
            product_id: int("cod_produto")?,
            fractional,
            sale_price: float("vlr_venda")?,
            cost_price: float("vlr_custo")?,
            average_price: float("vlr_medio")?,
            promotion_price,
        })
    }
}

impl From<&Product> for CatalogProduct {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.product_id,
            fractional: product.fractional,
            sale_price: product.sale_price,
            cost_price: product.cost_price,
            average_price: product.average_price,
            promotion_price: product.promotion.map(|p| p.price),
        }
    }
}

/// Read-only product set, sorted by product id.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<CatalogProduct>,
}

impl ProductCatalog {
    /// Sorting makes line generation independent of the order the sink
    /// returned rows in.
    pub fn new(mut products: Vec<CatalogProduct>) -> Self {
        products.sort_by_key(|p| p.product_id);
        Self { products }
    }

    pub fn from_rows(rows: &[Row]) -> Result<Self> {
        let products = rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                CatalogProduct::from_row(row).map_err(|message| RetailSeedError::CatalogDecode {
                    table: EntityKind::Product.table_name(),
                    row_index,
                    message,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(products))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Uniform pick. The catalog must be non-empty.
    pub fn pick(&self, rng: &mut impl Rng) -> &CatalogProduct {
        &self.products[rng.random_range(0..self.products.len())]
    }

    pub fn get(&self, product_id: i64) -> Option<&CatalogProduct> {
        self.products
            .binary_search_by_key(&product_id, |p| p.product_id)
            .ok()
            .map(|i| &self.products[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogProduct> {
        self.products.iter()
    }
}
