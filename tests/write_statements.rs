use std::sync::Arc;

use pgfluent::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
use pgfluent::error::PgFluentError;
use pgfluent::traits::DatabaseDriver;
use pgfluent::types::SqlValue;
use pgfluent::{OperationKind, PgFluentClient};

pgfluent::record! {
    #[derive(Debug, Clone, Default)]
    pub struct Product {
        #[primary]
        pub id: i64,
        #[column("product_name")]
        pub name: String,
        pub price: f64,
        pub stock: i32,
        pub discontinued: bool,
    }
}

fn client_for(driver: &Arc<InMemoryTestDriver>) -> PgFluentClient {
    PgFluentClient::with_driver(Arc::clone(driver) as Arc<dyn DatabaseDriver>)
}

fn product(name: &str, price: f64, stock: i32) -> Product {
    Product {
        id: 0,
        name: name.to_string(),
        price,
        stock,
        discontinued: false,
    }
}

fn affected(n: u64) -> pgfluent::RawQueryResult {
    InMemoryTestResponseBuilder::new().rows_affected(n).build()
}

#[tokio::test]
async fn test_insert_writes_default_for_generated_field() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(affected(1)));
    let client = client_for(&driver);

    let rows = client
        .table("products")
        .insert(&product("lamp", 24.5, 3))
        .await
        .unwrap();

    assert_eq!(rows, 1);
    driver.assert_last_query(
        r#"INSERT INTO "products" ("id", "product_name", "price", "stock", "discontinued") VALUES (DEFAULT, $1, $2, $3, $4)"#,
        &[
            SqlValue::Text("lamp".to_string()),
            SqlValue::Float64(24.5),
            SqlValue::Int32(3),
            SqlValue::Bool(false),
        ],
    );
}

#[tokio::test]
async fn test_insert_many_in_one_statement() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(affected(3)));
    let client = client_for(&driver);

    let batch = vec![
        product("a", 1.0, 1),
        product("b", 2.0, 2),
        product("c", 3.0, 3),
    ];
    let rows = client.table("products").insert_many(&batch).await.unwrap();

    assert_eq!(rows, 3);
    driver.assert_query_count(1);
    let last = driver.last_query().unwrap();
    assert!(last.sql.ends_with(
        "VALUES (DEFAULT, $1, $2, $3, $4), (DEFAULT, $5, $6, $7, $8), (DEFAULT, $9, $10, $11, $12)"
    ));
    assert_eq!(last.params.len(), 12);
    assert_eq!(last.params[4], SqlValue::Text("b".to_string()));
}

#[tokio::test]
async fn test_insert_nothing_sends_nothing() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let client = client_for(&driver);

    let err = client
        .table("products")
        .insert_many::<Product>(&[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PgFluentError::Contract {
            operation: OperationKind::Insert,
            ..
        }
    ));
    driver.assert_query_count(0);
}

#[tokio::test]
async fn test_update_record_skips_generated_field() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(affected(1)));
    let client = client_for(&driver);

    let mut lamp = product("lamp", 30.0, 2);
    lamp.id = 7;
    let rows = client
        .table("products")
        .where_("id = ?", [lamp.id])
        .update(&lamp)
        .await
        .unwrap();

    assert_eq!(rows, 1);
    driver.assert_last_query(
        r#"UPDATE "products" SET ("product_name", "price", "stock", "discontinued") = ($2, $3, $4, $5) WHERE id = $1"#,
        &[
            SqlValue::Int64(7),
            SqlValue::Text("lamp".to_string()),
            SqlValue::Float64(30.0),
            SqlValue::Int32(2),
            SqlValue::Bool(false),
        ],
    );
}

#[tokio::test]
async fn test_update_fields_in_given_order() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(affected(4)));
    let client = client_for(&driver);

    let rows = client
        .table("products")
        .where_("stock < ?", [1])
        .update_fields([
            ("discontinued", SqlValue::from(true)),
            ("price", SqlValue::from(0.0)),
        ])
        .await
        .unwrap();

    assert_eq!(rows, 4);
    driver.assert_last_query(
        r#"UPDATE "products" SET ("discontinued", "price") = ($2, $3) WHERE stock < $1"#,
        &[
            SqlValue::Int32(1),
            SqlValue::Bool(true),
            SqlValue::Float64(0.0),
        ],
    );
}

#[tokio::test]
async fn test_update_single_field() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(affected(1)));
    let client = client_for(&driver);

    client
        .table("products")
        .where_("id = ?", [3])
        .update_fields([("stock", 12)])
        .await
        .unwrap();

    driver.assert_last_query(
        r#"UPDATE "products" SET "stock" = $2 WHERE id = $1"#,
        &[SqlValue::Int32(3), SqlValue::Int32(12)],
    );
}

#[tokio::test]
async fn test_update_with_empty_change_set_is_rejected() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let client = client_for(&driver);

    let err = client
        .table("products")
        .where_("id = ?", [3])
        .update_fields(Vec::<(&str, SqlValue)>::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PgFluentError::Contract {
            operation: OperationKind::Update,
            ..
        }
    ));
    driver.assert_query_count(0);
}

#[tokio::test]
async fn test_delete_requires_a_condition() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(affected(2)));
    let client = client_for(&driver);

    let err = client.table("products").delete().await.unwrap_err();
    assert!(err.is_usage());
    driver.assert_query_count(0);

    let rows = client
        .table("products")
        .where_("discontinued = ?", [true])
        .delete()
        .await
        .unwrap();
    assert_eq!(rows, 2);
    driver.assert_last_query(
        r#"DELETE FROM "products" WHERE discontinued = $1"#,
        &[SqlValue::Bool(true)],
    );
}

#[tokio::test]
async fn test_increment_and_decrement() {
    let driver = Arc::new(InMemoryTestDriver::new().with_responses([affected(1), affected(5)]));
    let client = client_for(&driver);

    let rows = client
        .table("products")
        .where_("id = ?", [9])
        .increment("stock")
        .await
        .unwrap();
    assert_eq!(rows, 1);
    driver.assert_last_query(
        r#"UPDATE "products" SET "stock" = "stock" + 1 WHERE id = $1"#,
        &[SqlValue::Int32(9)],
    );

    let rows = client.table("products").decrement("stock").await.unwrap();
    assert_eq!(rows, 5);
    driver.assert_last_query(r#"UPDATE "products" SET "stock" = "stock" - 1"#, &[]);
}

#[tokio::test]
async fn test_write_failure_is_wrapped() {
    let driver = Arc::new(InMemoryTestDriver::new().with_failure("duplicate key value"));
    let client = client_for(&driver);

    let err = client
        .table("products")
        .insert(&product("lamp", 1.0, 1))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PgFluentError::Statement {
            operation: OperationKind::Insert,
            ..
        }
    ));
    assert_eq!(err.to_string(), "insert: Query failed: duplicate key value");
}
