//! Round trips through a live PostgreSQL. Skipped unless `DATABASE_URL` is set.

use sqlroute::{AppError, DataAccess, PgDataAccess, Value};
use sqlx::PgPool;

async fn connect() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(PgPool::connect(&url).await.expect("connect to DATABASE_URL"))
}

struct Scratch {
    pool: PgPool,
    table: String,
    mood: String,
}

impl Scratch {
    async fn create(pool: PgPool) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let scratch = Scratch {
            pool,
            table: format!("items_{}", suffix),
            mood: format!("mood_{}", suffix),
        };
        sqlx::query(&format!("CREATE TYPE {} AS ENUM ('happy', 'sad')", scratch.mood))
            .execute(&scratch.pool)
            .await
            .unwrap();
        sqlx::query(&format!(
            "CREATE TABLE {} (id int4 PRIMARY KEY, label text, price numeric(10, 2), mood {}, born date, note text)",
            scratch.table, scratch.mood
        ))
        .execute(&scratch.pool)
        .await
        .unwrap();
        scratch
    }

    async fn drop(self) {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.table))
            .execute(&self.pool)
            .await
            .unwrap();
        sqlx::query(&format!("DROP TYPE IF EXISTS {}", self.mood))
            .execute(&self.pool)
            .await
            .unwrap();
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (id, label, price, mood, born, note) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            self.table
        )
    }
}

#[tokio::test]
async fn text_values_take_the_column_types() {
    let Some(pool) = connect().await else {
        return;
    };
    let scratch = Scratch::create(pool.clone()).await;
    let data = PgDataAccess::new(pool);

    let inserted = data
        .execute_write(
            &scratch.insert_sql(),
            &[
                Value::from("1"),
                Value::from("42"),
                Value::from("9.99"),
                Value::from("happy"),
                Value::from("2024-02-29"),
                Value::Null,
            ],
        )
        .await;
    let rows = data
        .execute_read(
            &format!("SELECT id, label, price, mood, born, note FROM {} WHERE id = $1", scratch.table),
            &[Value::from("1")],
        )
        .await;
    let by_label = data
        .execute_read(
            &format!("SELECT id FROM {} WHERE label = $1", scratch.table),
            &[Value::Int(42)],
        )
        .await;
    scratch.drop().await;

    let inserted = inserted.unwrap();
    assert_eq!(inserted.affected_rows, 1);
    assert_eq!(inserted.returning[0].get("id"), Some(&Value::Int(1)));

    let rows = rows.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.get("id"), Some(&Value::Int(1)));
    assert_eq!(row.get("label"), Some(&Value::from("42")));
    assert_eq!(row.get("price"), Some(&Value::Float(9.99)));
    assert_eq!(row.get("mood"), Some(&Value::from("happy")));
    assert_eq!(row.get("born"), Some(&Value::from("2024-02-29")));
    assert_eq!(row.get("note"), Some(&Value::Null));

    assert_eq!(by_label.unwrap().len(), 1);
}

#[tokio::test]
async fn unconvertible_text_is_a_bad_request() {
    let Some(pool) = connect().await else {
        return;
    };
    let scratch = Scratch::create(pool.clone()).await;
    let data = PgDataAccess::new(pool);

    let params = |id: &str, born: &str| {
        vec![
            Value::from(id),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::from(born),
            Value::Null,
        ]
    };
    let bad_int = data.execute_write(&scratch.insert_sql(), &params("abc", "2024-01-01")).await;
    let bad_date = data.execute_write(&scratch.insert_sql(), &params("2", "yesterday")).await;
    let bad_enum = data
        .execute_write(
            &format!("INSERT INTO {} (id, mood) VALUES ($1, $2)", scratch.table),
            &[Value::from("3"), Value::from("grumpy")],
        )
        .await;
    scratch.drop().await;

    assert!(matches!(bad_int, Err(AppError::BadRequest(_))));
    assert!(matches!(bad_date, Err(AppError::BadRequest(_))));
    // Enum labels are checked by the server, not before binding.
    assert!(matches!(bad_enum, Err(AppError::Db(_))));
}
