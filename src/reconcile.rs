//! # Diff Reconciler
//!
//! Keeps a live `Vec` of entities in step with an id-keyed raw map. Ids that
//! stay present keep their instance (updated in place), new ids are
//! constructed, vanished ids are dropped.

use crate::error::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a live instance, assigned once at construction
///
/// `update` never changes it, so two observations with the same
/// `InstanceId` are the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A live entity that can be refreshed from its raw form
pub trait Reconcile<C: ?Sized> {
    type Raw;

    /// Key of this instance in the raw map
    fn sync_id(&self) -> &str;

    /// Refresh this instance in place from `raw`
    fn update(&mut self, id: &str, raw: &Self::Raw, ctx: &mut C) -> Result<()>;
}

/// Builds a new live instance from its raw form
pub type Constructor<T, R, C> = fn(&str, &R, &mut C) -> Result<T>;

/// Picks the constructor for a raw item when a collection holds more than
/// one concrete kind
pub struct Discriminator<T, R, C: ?Sized> {
    classify: fn(&str, &R) -> Result<Constructor<T, R, C>>,
}

impl<T, R, C: ?Sized> Discriminator<T, R, C> {
    pub fn new(classify: fn(&str, &R) -> Result<Constructor<T, R, C>>) -> Self {
        Self { classify }
    }

    pub fn discriminate(&self, id: &str, raw: &R) -> Result<Constructor<T, R, C>> {
        (self.classify)(id, raw)
    }
}

/// How new instances of a collection are built
pub enum Factory<T, R, C: ?Sized> {
    Class(Constructor<T, R, C>),
    Discriminator(Discriminator<T, R, C>),
}

impl<T, R, C: ?Sized> Factory<T, R, C> {
    fn constructor_for(&self, id: &str, raw: &R) -> Result<Constructor<T, R, C>> {
        match self {
            Factory::Class(constructor) => Ok(*constructor),
            Factory::Discriminator(discriminator) => discriminator.discriminate(id, raw),
        }
    }
}

/// Instance churn caused by one synchronisation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SyncStats {
    pub fn merge(&mut self, other: SyncStats) {
        self.added += other.added;
        self.updated += other.updated;
        self.removed += other.removed;
    }

    /// No instance was created or dropped
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Synchronise `live` with `map`
///
/// An absent map clears `live` in place. Every raw item is classified before
/// anything is touched, so a classification error leaves `live` exactly as
/// it was. Existing instances keep their position; new ones are appended in
/// map order.
pub fn synchronize_map<T, R, C>(
    live: &mut Vec<T>,
    factory: &Factory<T, R, C>,
    map: Option<&BTreeMap<String, R>>,
    ctx: &mut C,
) -> Result<SyncStats>
where
    T: Reconcile<C, Raw = R>,
    C: ?Sized,
{
    let Some(map) = map else {
        let removed = live.len();
        live.clear();
        if removed > 0 {
            tracing::debug!("[SYNC] Source map absent, cleared {} instances", removed);
        }
        return Ok(SyncStats {
            removed,
            ..SyncStats::default()
        });
    };

    let mut plan = Vec::with_capacity(map.len());
    for (id, raw) in map {
        plan.push((id, raw, factory.constructor_for(id, raw)?));
    }

    let positions: HashMap<String, usize> = live
        .iter()
        .enumerate()
        .map(|(position, instance)| (instance.sync_id().to_string(), position))
        .collect();

    let mut stats = SyncStats::default();
    for (id, raw, constructor) in plan {
        match positions.get(id.as_str()) {
            Some(&position) => {
                live[position].update(id, raw, ctx)?;
                stats.updated += 1;
            }
            None => {
                live.push(constructor(id, raw, ctx)?);
                stats.added += 1;
                tracing::debug!("[SYNC] Added instance {}", id);
            }
        }
    }

    let before = live.len();
    live.retain(|instance| {
        let keep = map.contains_key(instance.sync_id());
        if !keep {
            tracing::debug!("[SYNC] Removed instance {}", instance.sync_id());
        }
        keep
    });
    stats.removed = before - live.len();

    Ok(stats)
}
