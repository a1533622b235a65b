mod query_builder;

pub use deadpool_postgres::Pool;
pub use postgres_from_row::FromRow;
pub use postgres_types::Json;
pub use query_builder::*;
pub use {deadpool_postgres, postgres_from_row, postgres_types, tokio_postgres};
