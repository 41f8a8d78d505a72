use std::time::{Duration, Instant};

use futures::try_join;
use log::debug;
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::db::{ListParams, Selection};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::item::{FoundItemPatch, NewFoundItem};
use crate::metadata;
use crate::odata::{self, Direction, Ordering};
use crate::routes::{
    query::{ListingQuery, ODataQuery},
    rejection::{Context, Rejection},
    response::{CategoryEntry, ODataEnvelope, StatsResponse, SuccessResponse},
};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn root(environment: Environment) -> RouteResult {
    timed! {
        debug!(environment.logger, "Serving banner...");

        json(&SuccessResponse::Banner {
            message: "Zguba.gov API",
            version: info::VERSION,
            status: "running",
        })
    }
}

pub async fn list(environment: Environment, query: ListingQuery) -> RouteResult {
    timed! {
        let (skip, limit) = query.page();

        debug!(environment.logger, "Listing found items..."; "skip" => skip, "limit" => limit);

        let params = ListParams {
            skip,
            limit,
            selection: Selection {
                category: query.category,
                municipality: query.municipality,
                status: query.status,
                search: query.search,
                ..Selection::default()
            },
            ordering: Ordering::CreatedAt(Direction::Descending),
        };

        let items = environment
            .db
            .list(params)
            .await
            .map_err(|e: BackendError| Rejection::new(Context::list(), e))?;

        json(&items)
    }
}

pub async fn create(environment: Environment, payload: NewFoundItem) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create(), e);

        debug!(environment.logger, "Creating found item..."; "name" => %payload.item.name);

        payload.validate().map_err(error_handler)?;

        let item = environment
            .db
            .insert(payload)
            .await
            .map_err(error_handler)?;

        with_header(
            with_status(json(&item), StatusCode::CREATED),
            "location",
            environment.urls.item(&item.id).as_str(),
        )
    }
}

pub async fn retrieve(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        debug!(environment.logger, "Retrieving found item..."; "id" => %id);

        let id = parse_id(&id).map_err(error_handler)?;

        let item = environment
            .db
            .retrieve(&id)
            .await
            .map_err(error_handler)?
            .ok_or(BackendError::NonExistentId(id))
            .map_err(error_handler)?;

        json(&item)
    }
}

pub async fn update(
    environment: Environment,
    id: String,
    patch: FoundItemPatch,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update(id.clone()), e);

        debug!(environment.logger, "Updating found item..."; "id" => %id);

        let id = parse_id(&id).map_err(error_handler)?;
        patch.validate().map_err(error_handler)?;

        let item = environment
            .db
            .update(&id, patch)
            .await
            .map_err(error_handler)?
            .ok_or(BackendError::NonExistentId(id))
            .map_err(error_handler)?;

        json(&item)
    }
}

pub async fn delete(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        debug!(environment.logger, "Deleting found item..."; "id" => %id);

        let id = parse_id(&id).map_err(error_handler)?;

        environment
            .db
            .delete(&id)
            .await
            .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

pub async fn categories_list(environment: Environment) -> RouteResult {
    timed! {
        debug!(environment.logger, "Listing categories...");

        let categories = environment
            .db
            .categories()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::categories(), e))?;

        let entries: Vec<CategoryEntry> = categories
            .into_iter()
            .filter(|category| !category.is_empty())
            .map(|category| CategoryEntry {
                label: capitalize(&category),
                value: category,
            })
            .collect();

        // TODO make this cacheable
        json(&entries)
    }
}

pub async fn odata(environment: Environment, query: ODataQuery) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::odata(), e);

        debug!(
            environment.logger, "Serving OData listing...";
            "filter" => ?query.filter, "orderby" => ?query.orderby, "count" => query.count
        );

        let (skip, limit) = query.page();

        let params = ListParams {
            skip,
            limit,
            selection: Selection {
                predicate: odata::translate_filter(query.filter.as_deref()),
                ..Selection::default()
            },
            ordering: odata::translate_orderby(query.orderby.as_deref()),
        };

        // The count deliberately ignores the filter, matching what
        // harvesters have come to expect from this endpoint.
        let (value, count) = if query.count {
            let (value, count) =
                try_join!(environment.db.list(params), environment.db.count_all())
                    .map_err(error_handler)?;

            (value, Some(count))
        } else {
            let value = environment.db.list(params).await.map_err(error_handler)?;

            (value, None)
        };

        json(&ODataEnvelope {
            context: environment.urls.odata_context(),
            value,
            count,
        })
    }
}

pub async fn odata_metadata(environment: Environment) -> RouteResult {
    timed! {
        debug!(environment.logger, "Serving OData schema...");

        json(&metadata::edm_schema())
    }
}

pub async fn dataset_metadata(environment: Environment) -> RouteResult {
    timed! {
        debug!(environment.logger, "Serving DCAT catalog...");

        json(&metadata::catalog(&environment.urls))
    }
}

pub async fn dcat_rdf(environment: Environment) -> RouteResult {
    timed! {
        debug!(environment.logger, "Serving DCAT RDF placeholder...");

        json(&metadata::dcat_rdf(&environment.urls))
    }
}

pub async fn distribution(environment: Environment, id: String) -> RouteResult {
    timed! {
        debug!(environment.logger, "Serving distribution metadata..."; "id" => %id);

        json(&metadata::distribution(&environment.urls, &id))
    }
}

pub async fn stats(environment: Environment) -> RouteResult {
    timed! {
        debug!(environment.logger, "Computing stats...");

        let stats = environment
            .db
            .stats()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::stats(), e))?;

        json(&StatsResponse::from(stats))
    }
}

fn parse_id(id: &str) -> Result<Uuid, BackendError> {
    Uuid::parse_str(id).map_err(|_| BackendError::InvalidId(id.to_owned()))
}

/// Uppercases the first character and lowercases the rest, for dropdown
/// labels.
fn capitalize(value: &str) -> String {
    let mut characters = value.chars();

    match characters.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &characters.as_str().to_lowercase()
        }
        None => String::new(),
    }
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
