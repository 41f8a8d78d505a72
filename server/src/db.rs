use futures::future::BoxFuture;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::item::{FoundItem, FoundItemPatch, NewFoundItem};
use crate::odata::{Ordering, Predicate};

pub mod memory;

/// Parameters for a single page query against the record store.
#[derive(Clone, Debug)]
pub struct ListParams {
    pub skip: i64,
    pub limit: i64,
    pub selection: Selection,
    pub ordering: Ordering,
}

/// The combined set of row constraints for a list query. The direct filters
/// come from the JSON listing endpoint; the predicate comes from the OData
/// translator. All constraints are ANDed together.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    /// Exact match on the item category.
    pub category: Option<String>,

    /// Case-insensitive substring match on the municipality name.
    pub municipality: Option<String>,

    /// Exact match on the item status.
    pub status: Option<String>,

    /// Case-insensitive substring match against name, description or
    /// location.
    pub search: Option<String>,

    pub predicate: Predicate,
}

/// Aggregate counts for the stats endpoint.
#[derive(Clone, Debug)]
pub struct Stats {
    pub total: i64,
    pub available: i64,
    pub claimed: i64,
    pub top_categories: Vec<CategoryCount>,
    pub top_municipalities: Vec<MunicipalityCount>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MunicipalityCount {
    pub name: String,
    pub count: i64,
}

pub trait Db {
    fn categories(&self) -> BoxFuture<Result<Vec<String>, BackendError>>;

    fn count_all(&self) -> BoxFuture<Result<i64, BackendError>>;

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;

    fn insert(&self, item: NewFoundItem) -> BoxFuture<Result<FoundItem, BackendError>>;

    fn list(&self, params: ListParams) -> BoxFuture<Result<Vec<FoundItem>, BackendError>>;

    fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<FoundItem>, BackendError>>;

    fn stats(&self) -> BoxFuture<Result<Stats, BackendError>>;

    fn update(
        &self,
        id: &Uuid,
        patch: FoundItemPatch,
    ) -> BoxFuture<Result<Option<FoundItem>, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
        types::Json,
    };
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::{CategoryCount, ListParams, MunicipalityCount, Stats};
    use crate::errors::BackendError;
    use crate::item::{FoundItem, FoundItemPatch, ItemDetails, Municipality, NewFoundItem, Pickup, Times};
    use crate::odata::{Direction, Ordering, Predicate};

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn categories(&self) -> BoxFuture<Result<Vec<String>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/categories.sql"));

                let categories: Vec<String> = query
                    .try_map(|row: PgRow| try_get(&row, "item_category"))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(categories)
            }
            .boxed()
        }

        fn count_all(&self) -> BoxFuture<Result<i64, BackendError>> {
            async move {
                let query = sqlx::query_as::<_, (i64,)>(include_str!("queries/count.sql"));

                let (count,) = query.fetch_one(&self.pool).await.map_err(map_sqlx_error)?;

                Ok(count)
            }
            .boxed()
        }

        fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentId(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn insert(&self, item: NewFoundItem) -> BoxFuture<Result<FoundItem, BackendError>> {
            async move {
                let id = Uuid::new_v4();
                let categories = item.categories.clone().unwrap_or_default();

                let query = sqlx::query_as(include_str!("queries/create.sql"));

                let (created_at, updated_at): (OffsetDateTime, OffsetDateTime) = query
                    .bind(id)
                    .bind(&item.municipality.name)
                    .bind(&item.municipality.kind)
                    .bind(&item.municipality.contact_email)
                    .bind(&item.item.name)
                    .bind(&item.item.category)
                    .bind(&item.item.date)
                    .bind(&item.item.location)
                    .bind(&item.item.status)
                    .bind(&item.item.description)
                    .bind(item.pickup.deadline)
                    .bind(&item.pickup.location)
                    .bind(&item.pickup.hours)
                    .bind(&item.pickup.contact)
                    .bind(Json(categories))
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(FoundItem::new(id, item, Some(created_at), Some(updated_at)))
            }
            .boxed()
        }

        fn list(&self, params: ListParams) -> BoxFuture<Result<Vec<FoundItem>, BackendError>> {
            async move {
                let (sql, binds) = build_list_query(&params);

                let mut query = sqlx::query(&sql);
                for value in &binds {
                    query = query.bind(value.as_str());
                }

                let items = query
                    .bind(params.skip)
                    .bind(params.limit)
                    .try_map(|row: PgRow| item_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(items)
            }
            .boxed()
        }

        fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<FoundItem>, BackendError>> {
            let id = *id;

            async move { retrieve_one(&self.pool, &id).await }.boxed()
        }

        fn stats(&self) -> BoxFuture<Result<Stats, BackendError>> {
            async move {
                let counts = sqlx::query_as::<_, (i64, i64, i64)>(include_str!(
                    "queries/stats_counts.sql"
                ));
                let (total, available, claimed) =
                    counts.fetch_one(&self.pool).await.map_err(map_sqlx_error)?;

                let top_categories: Vec<CategoryCount> =
                    sqlx::query(include_str!("queries/stats_categories.sql"))
                        .try_map(|row: PgRow| {
                            Ok(CategoryCount {
                                category: try_get(&row, "category")?,
                                count: try_get(&row, "count")?,
                            })
                        })
                        .fetch_all(&self.pool)
                        .await
                        .map_err(map_sqlx_error)?;

                let top_municipalities: Vec<MunicipalityCount> =
                    sqlx::query(include_str!("queries/stats_municipalities.sql"))
                        .try_map(|row: PgRow| {
                            Ok(MunicipalityCount {
                                name: try_get(&row, "name")?,
                                count: try_get(&row, "count")?,
                            })
                        })
                        .fetch_all(&self.pool)
                        .await
                        .map_err(map_sqlx_error)?;

                Ok(Stats {
                    total,
                    available,
                    claimed,
                    top_categories,
                    top_municipalities,
                })
            }
            .boxed()
        }

        fn update(
            &self,
            id: &Uuid,
            patch: FoundItemPatch,
        ) -> BoxFuture<Result<Option<FoundItem>, BackendError>> {
            let id = *id;

            async move {
                let mut item = match retrieve_one(&self.pool, &id).await? {
                    Some(item) => item,
                    None => return Ok(None),
                };

                patch.apply(&mut item);

                let query = sqlx::query_as(include_str!("queries/update.sql"));

                let times: Option<(OffsetDateTime, OffsetDateTime)> = query
                    .bind(id)
                    .bind(&item.municipality.name)
                    .bind(&item.municipality.kind)
                    .bind(&item.municipality.contact_email)
                    .bind(&item.item.name)
                    .bind(&item.item.category)
                    .bind(&item.item.date)
                    .bind(&item.item.location)
                    .bind(&item.item.status)
                    .bind(&item.item.description)
                    .bind(item.pickup.deadline)
                    .bind(&item.pickup.location)
                    .bind(&item.pickup.hours)
                    .bind(&item.pickup.contact)
                    .bind(Json(item.categories.clone()))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(times.map(|(created_at, updated_at)| {
                    item.times = Times {
                        created_at: Some(created_at),
                        updated_at: Some(updated_at),
                    };
                    item
                }))
            }
            .boxed()
        }
    }

    async fn retrieve_one(pool: &PgPool, id: &Uuid) -> Result<Option<FoundItem>, BackendError> {
        let query = sqlx::query(include_str!("queries/retrieve.sql"));

        let item = query
            .bind(*id)
            .try_map(|row: PgRow| item_from_row(&row))
            .fetch_optional(pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(item)
    }

    /// Assembles the list query. Direct filters and the translated predicate
    /// land in the WHERE clause; the two trailing placeholders are OFFSET
    /// and LIMIT. All bind values are text.
    fn build_list_query(params: &ListParams) -> (String, Vec<String>) {
        fn placeholder(binds: &mut Vec<String>, value: String) -> String {
            binds.push(value);
            format!("${}", binds.len())
        }

        let mut clauses: Vec<String> = vec![];
        let mut binds: Vec<String> = vec![];
        let selection = &params.selection;

        if let Some(category) = &selection.category {
            let p = placeholder(&mut binds, category.clone());
            clauses.push(format!("item_category = {}", p));
        }

        if let Some(municipality) = &selection.municipality {
            let p = placeholder(&mut binds, format!("%{}%", municipality));
            clauses.push(format!("municipality_name ILIKE {}", p));
        }

        if let Some(status) = &selection.status {
            let p = placeholder(&mut binds, status.clone());
            clauses.push(format!("item_status = {}", p));
        }

        if let Some(search) = &selection.search {
            let p = placeholder(&mut binds, format!("%{}%", search));
            clauses.push(format!(
                "(item_name ILIKE {0} OR item_description ILIKE {0} OR item_location ILIKE {0})",
                p
            ));
        }

        match &selection.predicate {
            Predicate::All => {}
            Predicate::StatusEquals(value) => {
                let p = placeholder(&mut binds, value.clone());
                clauses.push(format!("item_status = {}", p));
            }
            Predicate::CategoryEquals(value) => {
                let p = placeholder(&mut binds, value.clone());
                clauses.push(format!("item_category = {}", p));
            }
            Predicate::MunicipalityEquals(value) => {
                let p = placeholder(&mut binds, value.clone());
                clauses.push(format!("municipality_name = {}", p));
            }
            Predicate::NameContains(value) => {
                let p = placeholder(&mut binds, format!("%{}%", value));
                clauses.push(format!("item_name ILIKE {}", p));
            }
            Predicate::DescriptionContains(value) => {
                let p = placeholder(&mut binds, format!("%{}%", value));
                clauses.push(format!("item_description ILIKE {}", p));
            }
            Predicate::MunicipalityStartsWith(value) => {
                let p = placeholder(&mut binds, format!("{}%", value));
                clauses.push(format!("municipality_name ILIKE {}", p));
            }
        }

        let mut sql = String::from("SELECT * FROM found_items");

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql.push_str(order_clause(params.ordering));
        sql.push_str(&format!(
            " OFFSET ${} LIMIT ${}",
            binds.len() + 1,
            binds.len() + 2
        ));

        (sql, binds)
    }

    fn order_clause(ordering: Ordering) -> &'static str {
        match ordering {
            Ordering::Unspecified => "",
            Ordering::CreatedAt(Direction::Ascending) => " ORDER BY created_at",
            Ordering::CreatedAt(Direction::Descending) => " ORDER BY created_at DESC",
            Ordering::ItemName(Direction::Ascending) => " ORDER BY item_name",
            Ordering::ItemName(Direction::Descending) => " ORDER BY item_name DESC",
            Ordering::ItemDate(Direction::Ascending) => " ORDER BY item_date",
            Ordering::ItemDate(Direction::Descending) => " ORDER BY item_date DESC",
        }
    }

    fn item_from_row(row: &PgRow) -> Result<FoundItem, sqlx::Error> {
        let categories: Option<Json<Vec<String>>> = try_get(row, "categories")?;

        Ok(FoundItem {
            id: try_get(row, "id")?,
            municipality: Municipality {
                name: try_get(row, "municipality_name")?,
                kind: try_get(row, "municipality_type")?,
                contact_email: try_get(row, "municipality_email")?,
            },
            item: ItemDetails {
                name: try_get(row, "item_name")?,
                category: try_get(row, "item_category")?,
                date: try_get(row, "item_date")?,
                location: try_get(row, "item_location")?,
                status: try_get(row, "item_status")?,
                description: try_get(row, "item_description")?,
            },
            pickup: Pickup {
                deadline: try_get(row, "pickup_deadline")?,
                location: try_get(row, "pickup_location")?,
                hours: try_get(row, "pickup_hours")?,
                contact: try_get(row, "pickup_contact")?,
            },
            categories: categories.map(|Json(categories)| categories).unwrap_or_default(),
            times: Times {
                created_at: try_get(row, "created_at")?,
                updated_at: try_get(row, "updated_at")?,
            },
        })
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        BackendError::Sqlx { source: error }
    }

}
