//! # Entity Generators
//!
//! One generator per entity type. A generator is a pure function of the
//! record's global index, its rng and the parent data the generator was built
//! with (key ranges, the product catalog, the base time). Keys come from the
//! index alone, so workers never coordinate.

use std::sync::Arc;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::Rng;

use crate::generate::catalog::ProductCatalog;
use crate::generate::foreign_key::{AddressAllocation, KeyRange};
use crate::generate::providers::{self, COUNTRY, REGIONS, STATES, STREET_NAMES, STREET_TYPES};
use crate::schema::entities::*;

/// Produces the entity at a given global index.
pub trait EntityGenerator: Send + Sync + 'static {
    type Output: ToRecords + Send;

    fn generate(&self, index: usize, rng: &mut StdRng) -> Self::Output;
}

fn dense_key(index: usize) -> i64 {
    DEFAULT_KEY_BASE + index as i64
}

#[derive(Debug, Clone, Default)]
pub struct CityGenerator;

impl EntityGenerator for CityGenerator {
    type Output = City;

    fn generate(&self, index: usize, rng: &mut StdRng) -> City {
        City {
            city_id: CITY_KEY_BASE + index as i64,
            name: format!("Cidade {}", index + 1),
            state: providers::pick(rng, STATES),
            region: providers::pick(rng, REGIONS),
            country: COUNTRY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddressGenerator {
    pub cities: KeyRange,
}

impl EntityGenerator for AddressGenerator {
    type Output = Address;

    fn generate(&self, index: usize, rng: &mut StdRng) -> Address {
        Address {
            address_id: dense_key(index),
            street_name: providers::pick(rng, STREET_NAMES),
            street_number: providers::int_between(rng, 1, 1000).to_string(),
            postal_code: providers::int_between(rng, 10_000_000, 99_999_999),
            city_id: self.cities.pick(rng),
            abroad: false,
            street_type: providers::pick(rng, STREET_TYPES),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SupplierGenerator;

impl EntityGenerator for SupplierGenerator {
    type Output = Supplier;

    fn generate(&self, index: usize, rng: &mut StdRng) -> Supplier {
        let name = providers::supplier_name(rng);
        let invoices_on_account = providers::chance(rng, 50);
        let grace_days = if invoices_on_account {
            providers::int_between(rng, 1, 30)
        } else {
            0
        };
        Supplier {
            supplier_id: dense_key(index),
            name,
            invoices_on_account,
            grace_days,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProductGenerator {
    pub suppliers: KeyRange,
}

impl EntityGenerator for ProductGenerator {
    type Output = Product;

    fn generate(&self, index: usize, rng: &mut StdRng) -> Product {
        let name = providers::product_name(rng);
        let supplier_id = self.suppliers.pick(rng);
        let sector_id = providers::int_between(rng, 1, 10);
        let unit_id = providers::int_between(rng, 1, 5);
        let fractional = providers::chance(rng, 30);

        let cost = providers::money_between(rng, 5.0, 100.0);
        let margin = providers::ratio_between(rng, 1.2, 2.0);
        let pricing = providers::price_from_margin(cost, margin);

        let promotion = providers::chance(rng, 20).then(|| Promotion {
            promotion_id: providers::int_between(rng, 1, 20),
            price: providers::promotion_price(pricing.sale),
        });

        Product {
            product_id: dense_key(index),
            name,
            supplier_id,
            sector_id,
            unit_id,
            fractional,
            sale_price: pricing.sale,
            cost_price: pricing.cost,
            average_price: pricing.average,
            promotion,
        }
    }
}

/// Stores take the first block of the address pool, one address each.
#[derive(Debug, Clone)]
pub struct StoreGenerator {
    addresses: KeyRange,
}

impl StoreGenerator {
    pub fn new(allocation: &AddressAllocation) -> Self {
        Self {
            addresses: allocation.store_block(),
        }
    }
}

impl EntityGenerator for StoreGenerator {
    type Output = Store;

    fn generate(&self, index: usize, _rng: &mut StdRng) -> Store {
        debug_assert!(index < self.addresses.len());
        let store_id = dense_key(index);
        Store {
            store_id,
            name: format!("Loja {}", store_id),
            address_id: self.addresses.first() + index as i64,
            headquarters: index == 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TerminalGenerator {
    pub stores: KeyRange,
    pub base_time: NaiveDateTime,
}

impl EntityGenerator for TerminalGenerator {
    type Output = Terminal;

    fn generate(&self, index: usize, rng: &mut StdRng) -> Terminal {
        let registration_number = providers::int_between(rng, 1000, 9999);
        let valid_from = providers::date_before(rng, self.base_time, 1, 12, 30);
        let first_invoice_number = providers::int_between(rng, 1, 1000);
        let last_invoice_number = first_invoice_number + providers::int_between(rng, 1000, 9999);
        Terminal {
            terminal_id: dense_key(index),
            registration_number,
            valid_from,
            valid_until: providers::years_after(valid_from, 5),
            first_invoice_number,
            last_invoice_number,
            store_id: self.stores.pick(rng),
            terminal_number: providers::int_between(rng, 1, 20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterGenerator {
    pub stores: KeyRange,
}

impl EntityGenerator for RegisterGenerator {
    type Output = Register;

    fn generate(&self, index: usize, rng: &mut StdRng) -> Register {
        Register {
            register_id: dense_key(index),
            operator_name: providers::person_name(rng),
            store_id: self.stores.pick(rng),
            on_leave: providers::chance(rng, 10),
        }
    }
}

/// Customers take the block of addresses right after the stores' block.
#[derive(Debug, Clone)]
pub struct CustomerGenerator {
    addresses: KeyRange,
}

impl CustomerGenerator {
    pub fn new(allocation: &AddressAllocation) -> Self {
        Self {
            addresses: allocation.customer_block(),
        }
    }
}

impl EntityGenerator for CustomerGenerator {
    type Output = Customer;

    fn generate(&self, index: usize, rng: &mut StdRng) -> Customer {
        debug_assert!(index < self.addresses.len());
        Customer {
            customer_id: dense_key(index),
            name: providers::person_name(rng),
            loyal: providers::chance(rng, 40),
            address_id: self.addresses.first() + index as i64,
        }
    }
}

/// Builds an invoice and its lines. Lines draw products from the read-back
/// catalog, which must be non-empty.
#[derive(Debug, Clone)]
pub struct InvoiceGenerator {
    pub terminals: KeyRange,
    pub registers: KeyRange,
    pub customers: KeyRange,
    pub catalog: Arc<ProductCatalog>,
    pub base_time: NaiveDateTime,
}

impl EntityGenerator for InvoiceGenerator {
    type Output = InvoiceWithLines;

    fn generate(&self, index: usize, rng: &mut StdRng) -> InvoiceWithLines {
        let invoice_id = dense_key(index);
        let terminal_id = self.terminals.pick(rng);
        let register_id = self.registers.pick(rng);
        let customer_id = self.customers.pick(rng);
        let invoice_number = providers::int_between(rng, 100_000, 999_999);
        let issued_at = providers::date_before(rng, self.base_time, 0, 12, 30);
        let delivery = providers::chance(rng, 20);

        let line_count = rng.random_range(1..=15);
        let mut lines = Vec::with_capacity(line_count);
        let mut gross = 0.0;
        for position in 0..line_count {
            let product = self.catalog.pick(rng);
            let quantity = providers::line_quantity(rng, product.fractional);
            let unit_price = product.unit_price();
            gross += unit_price * quantity;
            lines.push(InvoiceLine {
                invoice_id,
                line_id: position as i64 + 1,
                product_id: product.product_id,
                quantity,
                unit_price,
                cost_price: product.cost_price,
                average_price: product.average_price,
                promotion_price: product.promotion_price,
            });
        }

        let payment_method = PaymentMethod::ALL[rng.random_range(0..PaymentMethod::ALL.len())];

        InvoiceWithLines {
            invoice: Invoice {
                invoice_id,
                terminal_id,
                register_id,
                customer_id,
                invoice_number,
                issued_at,
                delivery,
                total: providers::round2(gross),
                payment_method,
            },
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::catalog::CatalogProduct;
    use crate::generate::record_rng;
    use chrono::{Months, NaiveDate};

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn catalog() -> Arc<ProductCatalog> {
        Arc::new(ProductCatalog::new(vec![
            CatalogProduct {
                product_id: 1,
                fractional: true,
                sale_price: 15.0,
                cost_price: 10.0,
                average_price: 12.5,
                promotion_price: Some(10.5),
            },
            CatalogProduct {
                product_id: 2,
                fractional: false,
                sale_price: 3.99,
                cost_price: 2.0,
                average_price: 2.99,
                promotion_price: None,
            },
        ]))
    }

    #[test]
    fn test_city_keys_and_names() {
        let mut rng = record_rng(1, 0, 0);
        let first = CityGenerator.generate(0, &mut rng);
        assert_eq!(first.city_id, 1_000_000);
        assert_eq!(first.name, "Cidade 1");
        assert_eq!(first.country, "Brasil");
        let later = CityGenerator.generate(1999, &mut rng);
        assert_eq!(later.city_id, 1_001_999);
    }

    #[test]
    fn test_addresses_reference_generated_cities() {
        let generator = AddressGenerator {
            cities: KeyRange::new(CITY_KEY_BASE, 10),
        };
        for index in 0..200 {
            let address = generator.generate(index, &mut record_rng(9, 1, index));
            assert_eq!(address.address_id, index as i64 + 1);
            assert!(generator.cities.contains(address.city_id));
            assert!((10_000_000..=99_999_999).contains(&address.postal_code));
            let number: i64 = address.street_number.parse().unwrap();
            assert!((1..=1000).contains(&number));
            assert!(!address.abroad);
        }
    }

    #[test]
    fn test_supplier_grace_days_follow_flag() {
        for index in 0..200 {
            let s = SupplierGenerator.generate(index, &mut record_rng(3, 2, index));
            if s.invoices_on_account {
                assert!((1..=30).contains(&s.grace_days));
            } else {
                assert_eq!(s.grace_days, 0);
            }
        }
    }

    #[test]
    fn test_product_pricing_invariants() {
        let generator = ProductGenerator {
            suppliers: KeyRange::new(1, 5),
        };
        let mut promotions = 0;
        for index in 0..500 {
            let p = generator.generate(index, &mut record_rng(4, 3, index));
            assert!((5.0..100.0).contains(&p.cost_price));
            assert!(p.sale_price >= p.cost_price);
            assert!(p.average_price >= p.cost_price && p.average_price <= p.sale_price);
            assert!(generator.suppliers.contains(p.supplier_id));
            if let Some(promo) = p.promotion {
                promotions += 1;
                assert!((1..=20).contains(&promo.promotion_id));
                assert_eq!(promo.price, providers::promotion_price(p.sale_price));
            }
        }
        assert!(promotions > 0);
    }

    #[test]
    fn test_only_first_store_is_headquarters() {
        let allocation = AddressAllocation::new(KeyRange::new(1, 5), 2, 3).unwrap();
        let generator = StoreGenerator::new(&allocation);
        let first = generator.generate(0, &mut record_rng(1, 4, 0));
        let second = generator.generate(1, &mut record_rng(1, 4, 1));
        assert!(first.headquarters);
        assert!(!second.headquarters);
        assert_eq!(first.name, "Loja 1");
        assert_eq!(first.address_id, 1);
        assert_eq!(second.address_id, 2);
    }

    #[test]
    fn test_customers_use_block_after_stores() {
        let allocation = AddressAllocation::new(KeyRange::new(1, 5), 2, 3).unwrap();
        let generator = CustomerGenerator::new(&allocation);
        let ids: Vec<i64> = (0..3)
            .map(|i| generator.generate(i, &mut record_rng(1, 7, i)).address_id)
            .collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_terminal_validity_window() {
        let generator = TerminalGenerator {
            stores: KeyRange::new(1, 3),
            base_time: base_time(),
        };
        for index in 0..100 {
            let t = generator.generate(index, &mut record_rng(5, 5, index));
            assert!(t.valid_from <= base_time().checked_sub_months(Months::new(12)).unwrap());
            assert_eq!(t.valid_until, providers::years_after(t.valid_from, 5));
            assert!(t.last_invoice_number - t.first_invoice_number >= 1000);
            assert!((1..=20).contains(&t.terminal_number));
        }
    }

    #[test]
    fn test_invoice_total_and_payment_split() {
        let generator = InvoiceGenerator {
            terminals: KeyRange::new(1, 3),
            registers: KeyRange::new(1, 3),
            customers: KeyRange::new(1, 3),
            catalog: catalog(),
            base_time: base_time(),
        };
        for index in 0..300 {
            let bundle = generator.generate(index, &mut record_rng(6, 8, index));
            let invoice = &bundle.invoice;
            assert!((1..=15).contains(&bundle.lines.len()));
            assert!(invoice.issued_at <= base_time());

            let gross: f64 = bundle.lines.iter().map(|l| l.unit_price * l.quantity).sum();
            assert_eq!(invoice.total, providers::round2(gross));

            let paid: Vec<f64> = PaymentMethod::ALL
                .iter()
                .map(|m| invoice.paid_with(*m))
                .collect();
            assert!(invoice.total > 0.0);
            assert_eq!(paid.iter().filter(|v| **v == invoice.total).count(), 1);
            assert_eq!(paid.iter().filter(|v| **v == 0.0).count(), 2);

            for (position, line) in bundle.lines.iter().enumerate() {
                assert_eq!(line.invoice_id, invoice.invoice_id);
                assert_eq!(line.line_id, position as i64 + 1);
                match line.product_id {
                    1 => {
                        assert_eq!(line.unit_price, 10.5);
                        assert_eq!(line.promotion_price, Some(10.5));
                    }
                    2 => {
                        assert_eq!(line.unit_price, 3.99);
                        assert_eq!(line.promotion_price, None);
                        assert_eq!(line.quantity.fract(), 0.0);
                    }
                    other => panic!("unknown product {}", other),
                }
            }
        }
    }

    #[test]
    fn test_generation_is_a_function_of_index() {
        let generator = ProductGenerator {
            suppliers: KeyRange::new(1, 50),
        };
        let a = generator.generate(123, &mut record_rng(77, 3, 123));
        let b = generator.generate(123, &mut record_rng(77, 3, 123));
        assert_eq!(a, b);
    }
}
