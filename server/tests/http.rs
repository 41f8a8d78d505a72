use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::{Filter, Reply};

use log::{o, Discard, Logger};
use zguba::db::memory::MemoryDb;
use zguba::environment::Environment;
use zguba::routes;
use zguba::urls::Urls;

const BASE_URL: &str = "https://api.zguba.gov/";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemResponse {
    id: String,
    municipality: MunicipalityResponse,
    item: ItemDetailsResponse,
    pickup: PickupResponse,
    categories: Vec<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MunicipalityResponse {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "contactEmail")]
    contact_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemDetailsResponse {
    name: String,
    category: String,
    date: String,
    location: String,
    status: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PickupResponse {
    deadline: i32,
    location: String,
    hours: Option<String>,
    contact: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ODataResponse {
    #[serde(rename = "odata.context")]
    context: String,
    value: Vec<ItemResponse>,
    #[serde(rename = "odata.count")]
    count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryEntryResponse {
    value: String,
    label: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatsResponse {
    #[serde(rename = "foundItems")]
    found_items: StatusCountsResponse,
    #[serde(rename = "topCategories")]
    top_categories: Vec<CategoryCountResponse>,
    #[serde(rename = "topMunicipalities")]
    top_municipalities: Vec<MunicipalityCountResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusCountsResponse {
    total: i64,
    available: i64,
    claimed: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryCountResponse {
    category: String,
    count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MunicipalityCountResponse {
    name: String,
    count: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

fn environment() -> Environment {
    let logger = Arc::new(Logger::root(Discard, o!()));
    let db = Arc::new(MemoryDb::new());
    let urls = Arc::new(Urls::new(BASE_URL));

    Environment::new(logger, db, urls)
}

type Api = BoxedFilter<(Box<dyn Reply>,)>;

fn api(environment: &Environment) -> Api {
    let logger = environment.logger.clone();

    routes::make_root_route(environment.clone())
        .or(routes::make_list_route(environment.clone()))
        .or(routes::make_create_route(environment.clone()))
        .or(routes::make_categories_route(environment.clone()))
        .or(routes::make_retrieve_route(environment.clone()))
        .or(routes::make_update_route(environment.clone()))
        .or(routes::make_delete_route(environment.clone()))
        .or(routes::make_odata_metadata_route(environment.clone()))
        .or(routes::make_odata_route(environment.clone()))
        .or(routes::make_dcat_route(environment.clone()))
        .or(routes::make_distribution_route(environment.clone()))
        .or(routes::make_metadata_route(environment.clone()))
        .or(routes::make_stats_route(environment.clone()))
        .recover(move |r| routes::format_rejection(logger.clone(), r))
        .map(|reply| Box::new(reply) as Box<dyn Reply>)
        .boxed()
}

fn payload(name: &str, category: &str, municipality: &str, status: &str) -> Value {
    json!({
        "municipality": {
            "name": municipality,
            "type": "gmina miejska",
            "contactEmail": "biuro@example.gov.pl"
        },
        "item": {
            "name": name,
            "category": category,
            "date": "2026-08-01",
            "location": "Rynek Główny 1",
            "status": status,
            "description": format!("{} znaleziony na rynku", name)
        },
        "pickup": {
            "deadline": 30,
            "location": "Urząd Miasta",
            "hours": "8:00-16:00",
            "contact": "12 616 12 07"
        }
    })
}

async fn create_item(api: &Api, payload: &Value) -> ItemResponse {
    let response = warp::test::request()
        .method("POST")
        .path("/api/found-items")
        .json(payload)
        .reply(api)
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    serde_json::from_slice(response.body()).expect("parse creation response")
}

#[tokio::test]
async fn root_banner() {
    let api = api(&environment());

    let response = warp::test::request().path("/").reply(&api).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).expect("parse banner");
    assert_eq!(body["message"], "Zguba.gov API");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn crud_roundtrip() {
    let api = api(&environment());

    let created = create_item(&api, &payload("Portfel", "dokumenty", "Kraków", "available")).await;
    assert_eq!(created.item.name, "Portfel");
    assert_eq!(created.item.status, "available");
    assert!(created.created_at.is_some());
    assert!(created.categories.is_empty());

    let response = warp::test::request()
        .path(&format!("/api/found-items/{}", created.id))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let retrieved: ItemResponse =
        serde_json::from_slice(response.body()).expect("parse retrieval response");
    assert_eq!(retrieved.id, created.id);
    assert_eq!(retrieved.municipality.name, "Kraków");
    assert_eq!(retrieved.municipality.kind, "gmina miejska");
    assert_eq!(retrieved.pickup.deadline, 30);

    let response = warp::test::request()
        .method("PUT")
        .path(&format!("/api/found-items/{}", created.id))
        .json(&json!({ "item": { "status": "claimed" } }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: ItemResponse =
        serde_json::from_slice(response.body()).expect("parse update response");
    assert_eq!(updated.item.status, "claimed");
    // everything not named in the patch is preserved
    assert_eq!(updated.item.name, "Portfel");
    assert_eq!(updated.municipality.contact_email, "biuro@example.gov.pl");
    assert_eq!(updated.pickup.hours.as_deref(), Some("8:00-16:00"));
    assert_eq!(updated.created_at, created.created_at);

    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/found-items/{}", created.id))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/found-items/{}", created.id))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = warp::test::request()
        .path(&format!("/api/found-items/{}", created.id))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorResponse = serde_json::from_slice(response.body()).expect("parse error body");
    assert!(error.message.contains("no item with ID"));
}

#[tokio::test]
async fn create_rejects_bad_email() {
    let api = api(&environment());

    let mut bad = payload("Klucze", "inne", "Poznań", "available");
    bad["municipality"]["contactEmail"] = json!("not-an-email");

    let response = warp::test::request()
        .method("POST")
        .path("/api/found-items")
        .json(&bad)
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(response.body()).expect("parse error body");
    assert!(error.message.contains("invalid email address"));
}

#[tokio::test]
async fn malformed_id_is_a_bad_request() {
    let api = api(&environment());

    let response = warp::test::request()
        .path("/api/found-items/not-a-uuid")
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let api = api(&environment());

    for index in 0..5 {
        create_item(
            &api,
            &payload(
                &format!("Przedmiot {}", index),
                "inne",
                "Warszawa",
                "available",
            ),
        )
        .await;
    }

    let response = warp::test::request()
        .path("/api/found-items?skip=2&limit=2")
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let page: Vec<ItemResponse> = serde_json::from_slice(response.body()).expect("parse page");
    let names: Vec<&str> = page.iter().map(|item| item.item.name.as_str()).collect();
    assert_eq!(names, vec!["Przedmiot 2", "Przedmiot 1"]);
}

#[tokio::test]
async fn listing_filters_combine() {
    let api = api(&environment());

    create_item(&api, &payload("Portfel", "dokumenty", "Kraków", "available")).await;
    create_item(&api, &payload("Telefon", "elektronika", "Kraków", "claimed")).await;
    create_item(&api, &payload("Parasol", "inne", "Warszawa", "available")).await;

    let response = warp::test::request()
        .path("/api/found-items?category=dokumenty")
        .reply(&api)
        .await;
    let items: Vec<ItemResponse> = serde_json::from_slice(response.body()).expect("parse items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item.name, "Portfel");

    // municipality matching is a case-insensitive substring
    let response = warp::test::request()
        .path("/api/found-items?municipality=krak&status=claimed")
        .reply(&api)
        .await;
    let items: Vec<ItemResponse> = serde_json::from_slice(response.body()).expect("parse items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item.name, "Telefon");

    // search spans name, description and location
    let response = warp::test::request()
        .path("/api/found-items?search=rynku")
        .reply(&api)
        .await;
    let items: Vec<ItemResponse> = serde_json::from_slice(response.body()).expect("parse items");
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn odata_filters() {
    let api = api(&environment());

    create_item(&api, &payload("Portfel", "dokumenty", "Kraków", "available")).await;
    create_item(&api, &payload("Telefon", "elektronika", "Gdańsk", "claimed")).await;

    let response = warp::test::request()
        .path("/odata?$filter=item_status%20eq%20'available'")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.context, format!("{}odata/$metadata", BASE_URL));
    assert_eq!(envelope.value.len(), 1);
    assert_eq!(envelope.value[0].item.name, "Portfel");
    assert!(envelope.count.is_none());

    let response = warp::test::request()
        .path("/odata?$filter=contains(item_name,'fel')")
        .reply(&api)
        .await;
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.value.len(), 1);
    assert_eq!(envelope.value[0].item.name, "Portfel");

    let response = warp::test::request()
        .path("/odata?$filter=startswith(municipality_name,'Kra')")
        .reply(&api)
        .await;
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.value.len(), 1);
    assert_eq!(envelope.value[0].municipality.name, "Kraków");

    // a recognized operator over an unknown field places no constraint
    let response = warp::test::request()
        .path("/odata?$filter=pickup_location%20eq%20'nigdzie'")
        .reply(&api)
        .await;
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.value.len(), 2);

    // unsupported operators degrade to no filtering rather than erroring
    let response = warp::test::request()
        .path("/odata?$filter=item_status%20ne%20'available'")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.value.len(), 2);
}

#[tokio::test]
async fn odata_ordering_and_pagination() {
    let api = api(&environment());

    create_item(&api, &payload("Aparat", "elektronika", "Łódź", "available")).await;
    create_item(&api, &payload("Zegarek", "inne", "Łódź", "available")).await;
    create_item(&api, &payload("Młotek", "inne", "Łódź", "available")).await;

    let response = warp::test::request()
        .path("/odata?$orderby=item_name")
        .reply(&api)
        .await;
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    let names: Vec<&str> = envelope
        .value
        .iter()
        .map(|item| item.item.name.as_str())
        .collect();
    assert_eq!(names, vec!["Aparat", "Młotek", "Zegarek"]);

    let response = warp::test::request()
        .path("/odata?$orderby=created_at%20desc&$skip=1&$top=1")
        .reply(&api)
        .await;
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.value.len(), 1);
    assert_eq!(envelope.value[0].item.name, "Zegarek");

    // unknown fields leave the collection order unconstrained
    let response = warp::test::request()
        .path("/odata?$orderby=pickup_deadline%20desc")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.value.len(), 3);
}

#[tokio::test]
async fn odata_count_ignores_the_filter() {
    let api = api(&environment());

    create_item(&api, &payload("Portfel", "dokumenty", "Kraków", "available")).await;
    create_item(&api, &payload("Telefon", "elektronika", "Gdańsk", "claimed")).await;

    let response = warp::test::request()
        .path("/odata?$filter=item_status%20eq%20'claimed'&$count=true")
        .reply(&api)
        .await;

    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.value.len(), 1);
    assert_eq!(envelope.count, Some(2));
}

#[tokio::test]
async fn odata_select_is_ignored() {
    let api = api(&environment());

    create_item(&api, &payload("Portfel", "dokumenty", "Kraków", "available")).await;

    let response = warp::test::request()
        .path("/odata?$select=item_name,municipality_name")
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    // the full record shape comes back regardless of the projection
    let envelope: ODataResponse = serde_json::from_slice(response.body()).expect("parse envelope");
    assert_eq!(envelope.value.len(), 1);
    assert_eq!(envelope.value[0].pickup.location, "Urząd Miasta");
}

#[tokio::test]
async fn categories_listing_is_distinct_and_labelled() {
    let api = api(&environment());

    create_item(&api, &payload("Portfel", "dokumenty", "Kraków", "available")).await;
    create_item(&api, &payload("Dowód", "dokumenty", "Kraków", "available")).await;
    create_item(&api, &payload("Telefon", "elektronika", "Gdańsk", "available")).await;

    let response = warp::test::request()
        .path("/api/found-items/categories/list")
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let entries: Vec<CategoryEntryResponse> =
        serde_json::from_slice(response.body()).expect("parse categories");
    let labels: Vec<&str> = entries.iter().map(|entry| entry.label.as_str()).collect();
    assert_eq!(labels, vec!["Dokumenty", "Elektronika"]);
    assert_eq!(entries[0].value, "dokumenty");
}

#[tokio::test]
async fn stats_counts_by_status_category_and_municipality() {
    let api = api(&environment());

    create_item(&api, &payload("Portfel", "dokumenty", "Kraków", "available")).await;
    create_item(&api, &payload("Dowód", "dokumenty", "Kraków", "claimed")).await;
    create_item(&api, &payload("Telefon", "elektronika", "Gdańsk", "available")).await;

    let response = warp::test::request().path("/api/stats").reply(&api).await;

    assert_eq!(response.status(), StatusCode::OK);
    let stats: StatsResponse = serde_json::from_slice(response.body()).expect("parse stats");
    assert_eq!(stats.found_items.total, 3);
    assert_eq!(stats.found_items.available, 2);
    assert_eq!(stats.found_items.claimed, 1);
    assert_eq!(stats.top_categories[0].category, "dokumenty");
    assert_eq!(stats.top_categories[0].count, 2);
    assert_eq!(stats.top_municipalities[0].name, "Kraków");
    assert_eq!(stats.top_municipalities[0].count, 2);
}

#[tokio::test]
async fn metadata_documents() {
    let api = api(&environment());

    let response = warp::test::request().path("/metadata").reply(&api).await;
    assert_eq!(response.status(), StatusCode::OK);
    let catalog: Value = serde_json::from_slice(response.body()).expect("parse catalog");
    assert_eq!(
        catalog["dct:title"],
        "Katalog Rzeczy Znalezionych - Zguba.gov"
    );

    let response = warp::test::request()
        .path("/metadata/dcat")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rdf: Value = serde_json::from_slice(response.body()).expect("parse RDF placeholder");
    assert_eq!(rdf["format"], "text/turtle");

    let response = warp::test::request()
        .path("/metadata/distribution/json-api")
        .reply(&api)
        .await;
    let distribution: Value =
        serde_json::from_slice(response.body()).expect("parse distribution");
    assert_eq!(distribution["dct:format"], "JSON");

    let response = warp::test::request()
        .path("/metadata/distribution/csv")
        .reply(&api)
        .await;
    let distribution: Value =
        serde_json::from_slice(response.body()).expect("parse distribution");
    assert_eq!(distribution["error"], "Distribution not found");

    let response = warp::test::request()
        .path("/odata/$metadata")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let schema: Value = serde_json::from_slice(response.body()).expect("parse schema");
    assert_eq!(
        schema["edmx:Edmx"]["edmx:DataServices"]["Schema"]["EntityType"]["@Name"],
        "FoundItem"
    );
}

#[tokio::test]
async fn admin_healthz_reports_version() {
    let environment = environment();
    let route = routes::admin::make_healthz_route(environment);

    let response = warp::test::request().path("/healthz").reply(&route).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).expect("parse healthz");
    assert_eq!(body["version"], info::VERSION);
}

#[tokio::test]
async fn creation_points_at_the_new_item() {
    let api = api(&environment());

    let response = warp::test::request()
        .method("POST")
        .path("/api/found-items")
        .json(&payload("Portfel", "dokumenty", "Kraków", "available"))
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let created: ItemResponse =
        serde_json::from_slice(response.body()).expect("parse creation response");
    let location = response
        .headers()
        .get("location")
        .expect("location header")
        .to_str()
        .expect("read location header");
    assert_eq!(
        location,
        format!("{}api/found-items/{}", BASE_URL, created.id)
    );
}
