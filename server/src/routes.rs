use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

/// The maximum request body size to accept. Item payloads are small; this
/// mostly guards against runaway clients.
const MAX_CONTENT_LENGTH: u64 = 1024 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        InvalidEmail(..) | InvalidId(..) => StatusCode::BAD_REQUEST,
        NonExistentId(..) => StatusCode::NOT_FOUND,
        Sqlx { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::body::{content_length_limit, json as body};
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post, put, query};

    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;
    use crate::item::{FoundItemPatch, NewFoundItem};

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_root_route => root, rt; end(), g());
    route!(make_list_route => list, rt; p("api"), p("found-items"), end(), g(), query::<q::ListingQuery>());
    route!(make_create_route => create, rt; p("api"), p("found-items"), end(), post(), content_length_limit(MAX_CONTENT_LENGTH), body::<NewFoundItem>());
    route!(make_categories_route => categories_list, rt; p("api"), p("found-items"), p("categories"), p("list"), end(), g());
    route!(make_retrieve_route => retrieve, rt; p("api"), p("found-items"), par::<String>(), end(), g());
    route!(make_update_route => update, rt; p("api"), p("found-items"), par::<String>(), end(), put(), content_length_limit(MAX_CONTENT_LENGTH), body::<FoundItemPatch>());
    route!(make_delete_route => delete, rt; p("api"), p("found-items"), par::<String>(), end(), delete());
    route!(make_odata_metadata_route => odata_metadata, rt; p("odata"), p("$metadata"), end(), g());
    route!(make_odata_route => odata, rt; p("odata"), end(), g(), query::<q::ODataQuery>());
    route!(make_metadata_route => dataset_metadata, rt; p("metadata"), end(), g());
    route!(make_dcat_route => dcat_rdf, rt; p("metadata"), p("dcat"), end(), g());
    route!(make_distribution_route => distribution, rt; p("metadata"), p("distribution"), par::<String>(), end(), g());
    route!(make_stats_route => stats, rt; p("api"), p("stats"), end(), g());
}
