use std::marker::PhantomData;
use std::sync::Arc;

use deadpool_postgres::PoolError;
use postgres_types::ToSql;
use tokio_postgres::{Error, Row};

use super::FromRow;

pub fn query<'a>(query: impl ToString) -> QueryBuilder<'a> {
	QueryBuilder::new(query)
}

/// SQL text plus its positional parameters. `bind` records the value for the
/// next `$n` placeholder already written into the text.
#[derive(Default)]
pub struct QueryBuilder<'a> {
	query: String,
	params: Vec<Box<dyn ToSql + Send + Sync + 'a>>,
}

impl<'args> QueryBuilder<'args> {
	pub fn new(query: impl ToString) -> Self {
		Self {
			query: query.to_string(),
			params: Vec::new(),
		}
	}

	pub fn bind(&mut self, param: impl ToSql + Send + Sync + 'args) -> &mut Self {
		self.params.push(Box::new(param));
		self
	}

	pub fn build(&self) -> Query<'_, Row> {
		Query {
			query: &self.query,
			params: &self.params,
			parse: Ok,
			_marker: PhantomData,
		}
	}

	pub fn build_query_as<T: FromRow>(&self) -> Query<'_, T> {
		Query {
			query: &self.query,
			params: &self.params,
			parse: |row| T::try_from_row(&row),
			_marker: PhantomData,
		}
	}
}

pub struct Query<'a, O> {
	query: &'a str,
	params: &'a [Box<dyn ToSql + Send + Sync + 'a>],
	parse: fn(Row) -> Result<O, Error>,
	_marker: PhantomData<O>,
}

/// Anything that can hand out a pooled client for a single query.
pub trait ClientLike: Send + Sync {
	#[doc(hidden)]
	fn query_builder_client(&self) -> impl std::future::Future<Output = Result<deadpool_postgres::Client, PoolError>> + Send;
}

impl ClientLike for deadpool_postgres::Pool {
	async fn query_builder_client(&self) -> Result<deadpool_postgres::Client, PoolError> {
		self.get().await
	}
}

impl<T: ClientLike> ClientLike for Arc<T> {
	async fn query_builder_client(&self) -> Result<deadpool_postgres::Client, PoolError> {
		self.as_ref().query_builder_client().await
	}
}

impl<T: ClientLike> ClientLike for &T {
	async fn query_builder_client(&self) -> Result<deadpool_postgres::Client, PoolError> {
		(*self).query_builder_client().await
	}
}

fn params<'a>(params: &'a [Box<dyn ToSql + Send + Sync + 'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
	params.iter().map(|param| param.as_ref() as _).collect()
}

impl<O> Query<'_, O> {
	pub async fn execute(self, conn: impl ClientLike) -> Result<u64, PoolError> {
		let client = conn.query_builder_client().await?;
		Ok(client.execute(self.query, &params(self.params)).await?)
	}

	pub async fn fetch_all(self, conn: impl ClientLike) -> Result<Vec<O>, PoolError> {
		let client = conn.query_builder_client().await?;
		let rows = client.query(self.query, &params(self.params)).await?;
		Ok(rows.into_iter().map(self.parse).collect::<Result<_, Error>>()?)
	}

	pub async fn fetch_optional(self, conn: impl ClientLike) -> Result<Option<O>, PoolError> {
		let client = conn.query_builder_client().await?;
		let row = client.query_opt(self.query, &params(self.params)).await?;
		Ok(row.map(self.parse).transpose()?)
	}
}
