use url::Url;
use uuid::Uuid;

/// Convenience wrapper for URL generation functions.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,
}

impl Urls {
    /// Create a new instance. `base` must include a trailing slash.
    pub fn new(base: impl AsRef<str>) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));

        Urls { base }
    }

    pub fn items(&self) -> Url {
        self.base
            .join("api/found-items/")
            .expect("get found-items URL")
    }

    pub fn item(&self, id: &Uuid) -> Url {
        let id = format!("{}", id);
        self.items()
            .join(&id)
            .unwrap_or_else(|_| panic!("get URL for item {}", id))
    }

    /// The listing URL without a trailing slash, as advertised in metadata.
    pub fn items_listing(&self) -> String {
        self.items().as_str().trim_end_matches('/').to_owned()
    }

    pub fn odata(&self) -> Url {
        self.base.join("odata").expect("get OData URL")
    }

    /// The `odata.context` value included in every OData envelope.
    pub fn odata_context(&self) -> String {
        format!("{}/$metadata", self.odata())
    }

    pub fn dcat_rdf(&self) -> Url {
        self.base
            .join("metadata/dcat.rdf")
            .expect("get DCAT RDF URL")
    }
}
