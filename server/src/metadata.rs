//! Static DCAT-AP and OData metadata documents served to open-data
//! harvesters such as dane.gov.pl.

use serde_json::{json, Value};
use time::OffsetDateTime;

use crate::item::format_timestamp;
use crate::urls::Urls;

const LICENSE: &str = "http://creativecommons.org/licenses/by/4.0/";
const ISSUED: &str = "2025-12-01T00:00:00Z";
const HOMEPAGE: &str = "https://zguba.gov";

/// The DCAT-AP catalog description. Everything is fixed except
/// `dct:modified`, which reflects the current time.
pub fn catalog(urls: &Urls) -> Value {
    let modified = format_timestamp(&OffsetDateTime::now_utc());

    json!({
        "@context": "https://www.w3.org/ns/dcat",
        "@type": "dcat:Catalog",
        "dct:title": "Katalog Rzeczy Znalezionych - Zguba.gov",
        "dct:description": "System zarządzania znalezionymi przedmiotami w jednostkach administracji publicznej w Polsce",
        "dct:issued": ISSUED,
        "dct:modified": modified,
        "dct:language": "pl",
        "dcat:homepage": HOMEPAGE,

        "dcat:dataset": [
            {
                "@type": "dcat:Dataset",
                "dct:identifier": "found-items-dataset",
                "dct:title": "Znalezione Rzeczy",
                "dct:description": "Bieżąca lista znalezionych przedmiotów w jednostkach administracji publicznej",
                "dct:issued": ISSUED,
                "dct:modified": modified,
                "dct:language": "pl",
                "dct:license": LICENSE,
                "dcat:keyword": ["rzeczy znalezione", "przedmioty", "administracja publiczna", "dane otwarte"],
                "dcat:theme": ["http://publications.europa.eu/resource/authority/data-theme/SOCI"],
                "dct:accrualPeriodicity": "http://purl.org/ckan/freq/daily",

                "dcat:distribution": [
                    {
                        "@type": "dcat:Distribution",
                        "dct:title": "JSON API",
                        "dct:description": "REST API zwracający dane w formacie JSON",
                        "dcat:accessURL": urls.items_listing(),
                        "dcat:downloadURL": format!("{}?limit=1000", urls.items_listing()),
                        "dct:format": "JSON",
                        "dcat:mediaType": "application/json",
                        "dct:license": LICENSE
                    },
                    {
                        "@type": "dcat:Distribution",
                        "dct:title": "OData API",
                        "dct:description": "OData endpoint dla zaawansowanego filtrowania",
                        "dcat:accessURL": urls.odata().as_str(),
                        "dct:format": "OData",
                        "dcat:mediaType": "application/json"
                    }
                ],

                "dcat:contactPoint": {
                    "@type": "vcard:Organization",
                    "vcard:fn": "Zguba.gov Support",
                    "vcard:hasEmail": "mailto:support@zguba.gov"
                }
            }
        ],

        "dcat:organization": {
            "@type": "foaf:Organization",
            "foaf:name": "Zguba.gov"
        }
    })
}

/// Placeholder for the Turtle (RDF) rendition of the catalog.
pub fn dcat_rdf(urls: &Urls) -> Value {
    json!({
        "message": "RDF endpoint - TODO",
        "format": "text/turtle",
        "uri": urls.dcat_rdf().as_str()
    })
}

/// Looks up the description of a single distribution. Unknown IDs return a
/// not-found payload rather than an HTTP error; harvesters expect a JSON
/// body either way.
pub fn distribution(urls: &Urls, id: &str) -> Value {
    match id {
        "json-api" => json!({
            "@type": "dcat:Distribution",
            "dct:title": "JSON API",
            "dcat:accessURL": urls.items_listing(),
            "dct:format": "JSON",
            "dcat:mediaType": "application/json",
            "dct:license": LICENSE
        }),
        "odata" => json!({
            "@type": "dcat:Distribution",
            "dct:title": "OData API",
            "dcat:accessURL": urls.odata().as_str(),
            "dct:format": "OData",
            "dcat:mediaType": "application/json"
        }),
        _ => json!({ "error": "Distribution not found" }),
    }
}

/// The EDM schema document served at `/odata/$metadata`.
pub fn edm_schema() -> Value {
    json!({
        "edmx:Edmx": {
            "@xmlns:edmx": "http://schemas.microsoft.com/ado/2007/06/edmx",
            "@Version": "1.0",
            "edmx:DataServices": {
                "@m:DataServiceVersion": "2.0",
                "Schema": {
                    "@xmlns": "http://schemas.microsoft.com/ado/2008/09/edm",
                    "@Namespace": "Zguba.Models",
                    "EntityType": {
                        "@Name": "FoundItem",
                        "Key": {
                            "PropertyRef": {
                                "@Name": "id"
                            }
                        },
                        "Property": [
                            {"@Name": "id", "@Type": "Edm.String", "@Nullable": "false"},
                            {"@Name": "municipality_name", "@Type": "Edm.String"},
                            {"@Name": "municipality_type", "@Type": "Edm.String"},
                            {"@Name": "municipality_email", "@Type": "Edm.String"},
                            {"@Name": "item_name", "@Type": "Edm.String"},
                            {"@Name": "item_category", "@Type": "Edm.String"},
                            {"@Name": "item_date", "@Type": "Edm.String"},
                            {"@Name": "item_location", "@Type": "Edm.String"},
                            {"@Name": "item_status", "@Type": "Edm.String"},
                            {"@Name": "item_description", "@Type": "Edm.String"},
                            {"@Name": "pickup_deadline", "@Type": "Edm.Int32"},
                            {"@Name": "pickup_location", "@Type": "Edm.String"},
                            {"@Name": "pickup_hours", "@Type": "Edm.String"},
                            {"@Name": "pickup_contact", "@Type": "Edm.String"},
                            {"@Name": "created_at", "@Type": "Edm.DateTime"},
                            {"@Name": "updated_at", "@Type": "Edm.DateTime"}
                        ]
                    },
                    "EntityContainer": {
                        "@Name": "ZgubaService",
                        "@m:IsDefaultEntityContainer": "true",
                        "EntitySet": {
                            "@Name": "FoundItems",
                            "@EntityType": "Zguba.Models.FoundItem"
                        }
                    }
                }
            }
        }
    })
}
