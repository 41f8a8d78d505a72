//! An in-memory record store used by the route tests.

use std::cmp;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{self, AtomicU64};
use std::sync::RwLock;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CategoryCount, Db, ListParams, MunicipalityCount, Selection, Stats};
use crate::errors::BackendError;
use crate::item::{FoundItem, FoundItemPatch, NewFoundItem, Times};
use crate::odata::{Direction, Ordering, Predicate};

#[derive(Clone)]
struct Entry {
    item: FoundItem,
    /// Insertion counter. Rows with equal timestamps fall back to insertion
    /// order so pagination stays deterministic.
    sequence: u64,
}

#[derive(Default)]
pub struct MemoryDb {
    entries: RwLock<HashMap<Uuid, Entry>>,
    sequence: AtomicU64,
}

impl MemoryDb {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Db for MemoryDb {
    fn categories(&self) -> BoxFuture<Result<Vec<String>, BackendError>> {
        let distinct: BTreeSet<String> = self
            .entries
            .read()
            .unwrap()
            .values()
            .map(|entry| entry.item.item.category.clone())
            .collect();

        future::ready(Ok(distinct.into_iter().collect())).boxed()
    }

    fn count_all(&self) -> BoxFuture<Result<i64, BackendError>> {
        let count = self.entries.read().unwrap().len() as i64;

        future::ready(Ok(count)).boxed()
    }

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let removed = self.entries.write().unwrap().remove(id);

        let result = match removed {
            Some(_) => Ok(()),
            None => Err(BackendError::NonExistentId(*id)),
        };

        future::ready(result).boxed()
    }

    fn insert(&self, item: NewFoundItem) -> BoxFuture<Result<FoundItem, BackendError>> {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let item = FoundItem::new(id, item, Some(now), Some(now));
        let sequence = self.sequence.fetch_add(1, atomic::Ordering::SeqCst);

        self.entries.write().unwrap().insert(
            id,
            Entry {
                item: item.clone(),
                sequence,
            },
        );

        future::ready(Ok(item)).boxed()
    }

    fn list(&self, params: ListParams) -> BoxFuture<Result<Vec<FoundItem>, BackendError>> {
        let mut entries: Vec<Entry> = self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|entry| matches(&params.selection, &entry.item))
            .cloned()
            .collect();

        sort(&mut entries, params.ordering);

        let items = entries
            .into_iter()
            .skip(cmp::max(params.skip, 0) as usize)
            .take(cmp::max(params.limit, 0) as usize)
            .map(|entry| entry.item)
            .collect();

        future::ready(Ok(items)).boxed()
    }

    fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<FoundItem>, BackendError>> {
        let item = self
            .entries
            .read()
            .unwrap()
            .get(id)
            .map(|entry| entry.item.clone());

        future::ready(Ok(item)).boxed()
    }

    fn stats(&self) -> BoxFuture<Result<Stats, BackendError>> {
        let entries = self.entries.read().unwrap();

        let total = entries.len() as i64;
        let available = count_status(&entries, "available");
        let claimed = count_status(&entries, "claimed");

        let top_categories = top_counts(&entries, |item| item.item.category.clone())
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        let top_municipalities = top_counts(&entries, |item| item.municipality.name.clone())
            .into_iter()
            .map(|(name, count)| MunicipalityCount { name, count })
            .collect();

        future::ready(Ok(Stats {
            total,
            available,
            claimed,
            top_categories,
            top_municipalities,
        }))
        .boxed()
    }

    fn update(
        &self,
        id: &Uuid,
        patch: FoundItemPatch,
    ) -> BoxFuture<Result<Option<FoundItem>, BackendError>> {
        let mut entries = self.entries.write().unwrap();

        let item = entries.get_mut(id).map(|entry| {
            patch.apply(&mut entry.item);
            entry.item.times = Times {
                created_at: entry.item.times.created_at,
                updated_at: Some(OffsetDateTime::now_utc()),
            };

            entry.item.clone()
        });

        future::ready(Ok(item)).boxed()
    }
}

fn matches(selection: &Selection, item: &FoundItem) -> bool {
    if let Some(category) = &selection.category {
        if item.item.category != *category {
            return false;
        }
    }

    if let Some(municipality) = &selection.municipality {
        if !contains_ci(&item.municipality.name, municipality) {
            return false;
        }
    }

    if let Some(status) = &selection.status {
        if item.item.status != *status {
            return false;
        }
    }

    if let Some(search) = &selection.search {
        let description = item.item.description.as_deref().unwrap_or("");

        if !(contains_ci(&item.item.name, search)
            || contains_ci(description, search)
            || contains_ci(&item.item.location, search))
        {
            return false;
        }
    }

    match &selection.predicate {
        Predicate::All => true,
        Predicate::StatusEquals(value) => item.item.status == *value,
        Predicate::CategoryEquals(value) => item.item.category == *value,
        Predicate::MunicipalityEquals(value) => item.municipality.name == *value,
        Predicate::NameContains(value) => contains_ci(&item.item.name, value),
        Predicate::DescriptionContains(value) => {
            contains_ci(item.item.description.as_deref().unwrap_or(""), value)
        }
        Predicate::MunicipalityStartsWith(value) => item
            .municipality
            .name
            .to_lowercase()
            .starts_with(&value.to_lowercase()),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn sort(entries: &mut Vec<Entry>, ordering: Ordering) {
    match ordering {
        // The backing map has no inherent order; fall back to insertion
        // order.
        Ordering::Unspecified => entries.sort_by_key(|entry| entry.sequence),
        Ordering::CreatedAt(direction) => entries.sort_by(|a, b| {
            directed(
                direction,
                (a.item.times.created_at, a.sequence).cmp(&(b.item.times.created_at, b.sequence)),
            )
        }),
        Ordering::ItemName(direction) => entries.sort_by(|a, b| {
            directed(
                direction,
                (&a.item.item.name, a.sequence).cmp(&(&b.item.item.name, b.sequence)),
            )
        }),
        Ordering::ItemDate(direction) => entries.sort_by(|a, b| {
            directed(
                direction,
                (&a.item.item.date, a.sequence).cmp(&(&b.item.item.date, b.sequence)),
            )
        }),
    }
}

fn directed(direction: Direction, ordering: cmp::Ordering) -> cmp::Ordering {
    match direction {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
    }
}

fn count_status(entries: &HashMap<Uuid, Entry>, status: &str) -> i64 {
    entries
        .values()
        .filter(|entry| entry.item.item.status == status)
        .count() as i64
}

fn top_counts(
    entries: &HashMap<Uuid, Entry>,
    key: impl Fn(&FoundItem) -> String,
) -> Vec<(String, i64)> {
    let mut counts: HashMap<String, i64> = HashMap::new();

    for entry in entries.values() {
        *counts.entry(key(&entry.item)).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, i64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(10);

    counts
}
