use serde::{Deserialize, Serialize, Serializer};
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::errors::BackendError;

/// A single found item in the registry, in its public shape.
#[derive(Clone, Debug, Serialize)]
pub struct FoundItem {
    /// The ID of the item.
    pub id: Uuid,

    /// The municipality that registered the item.
    pub municipality: Municipality,

    /// The item details.
    pub item: ItemDetails,

    /// The pickup conditions.
    pub pickup: Pickup,

    /// Additional category tags. Empty when none were recorded.
    pub categories: Vec<String>,

    /// The times it was created and updated.
    #[serde(flatten)]
    pub times: Times,
}

impl FoundItem {
    pub fn new(
        id: Uuid,
        new: NewFoundItem,
        created_at: Option<OffsetDateTime>,
        updated_at: Option<OffsetDateTime>,
    ) -> Self {
        FoundItem {
            id,
            municipality: new.municipality,
            item: new.item,
            pickup: new.pickup,
            categories: new.categories.unwrap_or_default(),
            times: Times {
                created_at,
                updated_at,
            },
        }
    }
}

/// The municipality that registered a found item.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Municipality {
    pub name: String,

    /// The kind of territorial unit, e.g. "gmina miejska".
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "contactEmail")]
    pub contact_email: String,
}

/// Details of a found item.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ItemDetails {
    pub name: String,

    /// A free-form category tag.
    pub category: String,

    /// The calendar date the item was found, as an ISO date string.
    pub date: String,

    pub location: String,

    /// One of "available", "claimed" or "expired" by convention. No state
    /// machine is enforced at this layer.
    #[serde(default = "default_status")]
    pub status: String,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_status() -> String {
    "available".to_owned()
}

/// Conditions for picking up a found item.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Pickup {
    /// The number of days the item is held for pickup.
    pub deadline: i32,

    pub location: String,

    #[serde(default)]
    pub hours: Option<String>,

    #[serde(default)]
    pub contact: Option<String>,
}

/// The creation and modification times of an item, as ISO-8601 strings in
/// the public shape (or null for legacy rows without them).
#[derive(Clone, Debug, Serialize)]
pub struct Times {
    #[serde(rename = "createdAt", serialize_with = "iso8601")]
    pub created_at: Option<OffsetDateTime>,

    #[serde(rename = "updatedAt", serialize_with = "iso8601")]
    pub updated_at: Option<OffsetDateTime>,
}

const ISO_FORMAT: &str = "%FT%TZ";

pub(crate) fn format_timestamp(timestamp: &OffsetDateTime) -> String {
    timestamp.to_offset(UtcOffset::UTC).format(ISO_FORMAT)
}

fn iso8601<S: Serializer>(
    value: &Option<OffsetDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(timestamp) => serializer.serialize_str(&format_timestamp(timestamp)),
        None => serializer.serialize_none(),
    }
}

/// The payload for creating a found item.
#[derive(Clone, Debug, Deserialize)]
pub struct NewFoundItem {
    pub municipality: Municipality,
    pub item: ItemDetails,
    pub pickup: Pickup,

    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

impl NewFoundItem {
    pub fn validate(&self) -> Result<(), BackendError> {
        validate_email(&self.municipality.contact_email)
    }
}

/// The payload for a partial update. Only fields present in the payload
/// overwrite existing values.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FoundItemPatch {
    #[serde(default)]
    pub municipality: Option<Municipality>,

    #[serde(default)]
    pub item: Option<ItemPatch>,

    #[serde(default)]
    pub pickup: Option<PickupPatch>,

    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PickupPatch {
    #[serde(default)]
    pub deadline: Option<i32>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub hours: Option<String>,

    #[serde(default)]
    pub contact: Option<String>,
}

impl FoundItemPatch {
    pub fn validate(&self) -> Result<(), BackendError> {
        match &self.municipality {
            Some(municipality) => validate_email(&municipality.contact_email),
            None => Ok(()),
        }
    }

    /// Overwrites the fields of `item` that are present in the patch. The
    /// timestamps are left to the store.
    pub fn apply(self, item: &mut FoundItem) {
        if let Some(municipality) = self.municipality {
            item.municipality = municipality;
        }

        if let Some(patch) = self.item {
            if let Some(name) = patch.name {
                item.item.name = name;
            }
            if let Some(category) = patch.category {
                item.item.category = category;
            }
            if let Some(date) = patch.date {
                item.item.date = date;
            }
            if let Some(location) = patch.location {
                item.item.location = location;
            }
            if let Some(status) = patch.status {
                item.item.status = status;
            }
            if let Some(description) = patch.description {
                item.item.description = Some(description);
            }
        }

        if let Some(patch) = self.pickup {
            if let Some(deadline) = patch.deadline {
                item.pickup.deadline = deadline;
            }
            if let Some(location) = patch.location {
                item.pickup.location = location;
            }
            if let Some(hours) = patch.hours {
                item.pickup.hours = Some(hours);
            }
            if let Some(contact) = patch.contact {
                item.pickup.contact = Some(contact);
            }
        }

        if let Some(categories) = self.categories {
            item.categories = categories;
        }
    }
}

fn validate_email(address: &str) -> Result<(), BackendError> {
    let valid = match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidEmail(address.to_owned()))
    }
}
