use std::collections::HashMap;
use std::fmt::Display;

use async_trait::async_trait;
use futures::TryStreamExt;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::prepared::PreparedStatement;
use scylla::statement::Consistency;
use tracing::{debug, info};

use super::{RecordSink, SinkError};
use crate::generate::value::Value;
use crate::schema::types::{EntityKind, Record, Row};

/// Wide-column sink. Writes go through `INSERT ... JSON` so a record's
/// field map is the whole statement payload.
pub struct CassandraSink {
    session: Session,
    inserts: HashMap<&'static str, PreparedStatement>,
}

fn cassandra_error(err: impl Display) -> SinkError {
    SinkError::Cassandra(err.to_string())
}

/// Parse a consistency level name, case-insensitively (`quorum`, `one`, ...).
pub fn parse_consistency(name: &str) -> Result<Consistency, String> {
    let level = match name.to_ascii_lowercase().as_str() {
        "any" => Consistency::Any,
        "one" => Consistency::One,
        "two" => Consistency::Two,
        "three" => Consistency::Three,
        "quorum" => Consistency::Quorum,
        "all" => Consistency::All,
        "local_quorum" => Consistency::LocalQuorum,
        "each_quorum" => Consistency::EachQuorum,
        "local_one" => Consistency::LocalOne,
        other => {
            return Err(format!(
                "unknown consistency level '{}' (expected one of: any, one, two, three, quorum, all, local_quorum, each_quorum, local_one)",
                other
            ))
        }
    };
    Ok(level)
}

/// `CREATE TABLE IF NOT EXISTS` statement for an entity table.
pub fn table_ddl(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::City => {
            "CREATE TABLE IF NOT EXISTS cidade (cod_ibge bigint PRIMARY KEY, nom_cidade text, nom_estado text, nom_regiao text, nom_pais text)"
        }
        EntityKind::Address => {
            "CREATE TABLE IF NOT EXISTS endereco (cod_endereco bigint PRIMARY KEY, nom_logradouro text, num_logradouro text, cod_cep bigint, cod_ibge bigint, flg_exterior text, tip_logradouro text)"
        }
        EntityKind::Supplier => {
            "CREATE TABLE IF NOT EXISTS fornecedor (cod_fornecedor bigint PRIMARY KEY, nom_fornecedor text, flg_fatura text, num_dias_fatura bigint)"
        }
        EntityKind::Product => {
            "CREATE TABLE IF NOT EXISTS produto (cod_produto bigint PRIMARY KEY, nom_produto text, cod_fornecedor bigint, cod_setor bigint, cod_unidade bigint, flg_fracionado text, vlr_venda double, vlr_custo double, vlr_medio double, cod_promocao bigint, vlr_promocao double)"
        }
        EntityKind::Store => {
            "CREATE TABLE IF NOT EXISTS loja (cod_loja bigint PRIMARY KEY, nom_loja text, cod_endereco bigint, flg_matriz text)"
        }
        EntityKind::Terminal => {
            "CREATE TABLE IF NOT EXISTS pdv (cod_pdv bigint PRIMARY KEY, num_registro bigint, dat_inicio_vigencia timestamp, dat_fim_vigencia timestamp, num_nota_inicial bigint, num_nota_final bigint, cod_loja bigint, num_pdv_loja bigint)"
        }
        EntityKind::Register => {
            "CREATE TABLE IF NOT EXISTS caixa (cod_caixa bigint PRIMARY KEY, nom_caixa text, cod_loja bigint, flg_ferias text)"
        }
        EntityKind::Customer => {
            "CREATE TABLE IF NOT EXISTS cliente (cod_cliente bigint PRIMARY KEY, nom_cliente text, flg_fidelizado text, cod_endereco bigint)"
        }
        EntityKind::Invoice => {
            "CREATE TABLE IF NOT EXISTS nota_fiscal (seq_nota bigint PRIMARY KEY, cod_pdv bigint, cod_caixa bigint, cod_cliente bigint, num_nota bigint, dat_nota timestamp, flg_entrega text, vlr_nota double, vlr_dinheiro double, vlr_tick double, vlr_cartao double)"
        }
        EntityKind::InvoiceLine => {
            "CREATE TABLE IF NOT EXISTS item_nota_fiscal (seq_nota bigint, seq_item_nota bigint, cod_produto bigint, qtd_produto double, vlr_venda double, vlr_custo double, vlr_medio double, vlr_promocao double, PRIMARY KEY (seq_nota, seq_item_nota))"
        }
    }
}

/// `DEFAULT UNSET` leaves absent fields untouched instead of writing
/// tombstones; explicit JSON nulls are still written as nulls.
fn insert_statement(table: &str) -> String {
    format!("INSERT INTO {} JSON ? DEFAULT UNSET", table)
}

fn from_json_row(table: &str, json: &str) -> Result<Row, SinkError> {
    let parsed: serde_json::Value = serde_json::from_str(json).map_err(|e| SinkError::Decode {
        table: table.to_string(),
        message: e.to_string(),
    })?;
    match parsed {
        serde_json::Value::Object(object) => Ok(object
            .into_iter()
            .map(|(name, value)| (name, Value::from_json(value)))
            .collect()),
        other => Err(SinkError::Decode {
            table: table.to_string(),
            message: format!("expected a JSON object, got {}", other),
        }),
    }
}

impl CassandraSink {
    /// Connect to the cluster and switch to `keyspace`, which must exist.
    ///
    /// With `create_tables` the entity tables are created first. Insert
    /// statements are prepared once here and reused by every worker.
    pub async fn connect(
        hosts: &[String],
        keyspace: &str,
        consistency: Consistency,
        create_tables: bool,
    ) -> Result<Self, SinkError> {
        let profile = ExecutionProfile::builder().consistency(consistency).build();
        let session = SessionBuilder::new()
            .known_nodes(hosts)
            .default_execution_profile_handle(profile.into_handle())
            .build()
            .await
            .map_err(cassandra_error)?;
        session
            .use_keyspace(keyspace, false)
            .await
            .map_err(cassandra_error)?;
        debug!("Connected to Cassandra keyspace '{}'", keyspace);

        if create_tables {
            ensure_schema(&session).await?;
            info!("Ensured {} tables in keyspace '{}'", EntityKind::ALL.len(), keyspace);
        }

        let mut inserts = HashMap::new();
        for kind in EntityKind::ALL {
            let statement = session
                .prepare(insert_statement(kind.table_name()))
                .await
                .map_err(cassandra_error)?;
            inserts.insert(kind.table_name(), statement);
        }

        Ok(Self { session, inserts })
    }
}

async fn ensure_schema(session: &Session) -> Result<(), SinkError> {
    for kind in EntityKind::ALL {
        session
            .query_unpaged(table_ddl(kind), ())
            .await
            .map_err(cassandra_error)?;
    }
    Ok(())
}

#[async_trait]
impl RecordSink for CassandraSink {
    fn name(&self) -> &str {
        "cassandra"
    }

    async fn upsert(&self, table: &str, record: &Record) -> Result<(), SinkError> {
        let json = record.to_json_string();
        match self.inserts.get(table) {
            Some(prepared) => self
                .session
                .execute_unpaged(prepared, (json,))
                .await
                .map_err(cassandra_error)?,
            None => self
                .session
                .query_unpaged(insert_statement(table), (json,))
                .await
                .map_err(cassandra_error)?,
        };
        Ok(())
    }

    async fn bulk_read(&self, table: &str) -> Result<Vec<Row>, SinkError> {
        let mut stream = self
            .session
            .query_iter(format!("SELECT JSON * FROM {}", table), ())
            .await
            .map_err(cassandra_error)?
            .rows_stream::<(String,)>()
            .map_err(cassandra_error)?;

        let mut rows = Vec::new();
        while let Some((json,)) = stream.try_next().await.map_err(cassandra_error)? {
            rows.push(from_json_row(table, &json)?);
        }
        debug!("Read {} rows back from '{}'", rows.len(), table);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::entities::*;
    use crate::generate::foreign_key::{AddressAllocation, KeyRange};
    use crate::generate::record_rng;
    use crate::schema::entities::{Product, Promotion, ToRecords};

    #[test]
    fn test_consistency_names() {
        assert_eq!(parse_consistency("QUORUM").unwrap(), Consistency::Quorum);
        assert_eq!(parse_consistency("local_one").unwrap(), Consistency::LocalOne);
        assert!(parse_consistency("most").is_err());
    }

    #[test]
    fn test_insert_keeps_absent_fields_unset() {
        assert_eq!(
            insert_statement("produto"),
            "INSERT INTO produto JSON ? DEFAULT UNSET"
        );
    }

    #[test]
    fn test_ddl_covers_every_generated_field() {
        let allocation = AddressAllocation::new(KeyRange::new(1, 2), 1, 1).unwrap();
        let base_time = chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let pool = KeyRange::new(1, 1);
        let mut rng = record_rng(1, 1, 0);

        let product = ProductGenerator { suppliers: pool }.generate(0, &mut rng);
        let catalog = std::sync::Arc::new(crate::generate::catalog::ProductCatalog::new(vec![
            (&product).into(),
        ]));

        let mut records = Vec::new();
        records.extend(CityGenerator.generate(0, &mut rng).to_records());
        records.extend(AddressGenerator { cities: pool }.generate(0, &mut rng).to_records());
        records.extend(SupplierGenerator.generate(0, &mut rng).to_records());
        records.push(
            Product {
                promotion: Some(Promotion {
                    promotion_id: 1,
                    price: 1.0,
                }),
                ..product
            }
            .to_record(),
        );
        records.extend(StoreGenerator::new(&allocation).generate(0, &mut rng).to_records());
        records.extend(
            TerminalGenerator {
                stores: pool,
                base_time,
            }
            .generate(0, &mut rng)
            .to_records(),
        );
        records.extend(RegisterGenerator { stores: pool }.generate(0, &mut rng).to_records());
        records.extend(CustomerGenerator::new(&allocation).generate(0, &mut rng).to_records());
        records.extend(
            InvoiceGenerator {
                terminals: pool,
                registers: pool,
                customers: pool,
                catalog,
                base_time,
            }
            .generate(0, &mut rng)
            .to_records(),
        );

        for kind in EntityKind::ALL {
            assert!(
                records.iter().any(|r| r.kind() == kind),
                "no sample record for {}",
                kind
            );
        }
        for record in &records {
            let ddl = table_ddl(record.kind());
            assert!(ddl.contains(&format!(" {} (", record.table_name())));
            for (name, _) in record.fields() {
                assert!(
                    ddl.contains(&format!("{} ", name)),
                    "{} is missing column {}",
                    record.table_name(),
                    name
                );
            }
        }
    }

    #[test]
    fn test_select_json_row_decodes() {
        let row = from_json_row(
            "produto",
            r#"{"cod_produto": 3, "vlr_venda": 15.0, "vlr_promocao": null}"#,
        )
        .unwrap();
        assert_eq!(row.get("cod_produto"), Some(&Value::Int(3)));
        assert_eq!(row.get("vlr_promocao"), Some(&Value::Null));
        assert!(from_json_row("produto", "[1]").is_err());
    }
}
