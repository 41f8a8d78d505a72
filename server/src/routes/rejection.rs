use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Categories {},
    Create {},
    Delete { id: String },
    List {},
    OData {},
    Retrieve { id: String },
    Stats {},
    Update { id: String },
}

impl Context {
    pub fn categories() -> Context {
        Context::Categories {}
    }

    pub fn create() -> Context {
        Context::Create {}
    }

    pub fn delete(id: String) -> Context {
        Context::Delete { id }
    }

    pub fn list() -> Context {
        Context::List {}
    }

    pub fn odata() -> Context {
        Context::OData {}
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }

    pub fn stats() -> Context {
        Context::Stats {}
    }

    pub fn update(id: String) -> Context {
        Context::Update { id }
    }
}
