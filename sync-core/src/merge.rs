//! Merge engine for two divergent task lists.
//!
//! Given the local lists and a [`SyncData`] received from the peer, produce
//! one reconciled state. The merge is a pure function of its inputs: the
//! same two sides always produce the same output, which is what lets the
//! guest re-derive the host's result.
//!
//! Rules, applied identically to tasks and categories:
//!
//! 1. Tombstones from both sides are unioned.
//! 2. Any entity whose ID is tombstoned is dropped, whatever its `last_save`.
//! 3. Survivors are ordered by creation date (stable), recording a slot each.
//! 4. Duplicate IDs keep the copy with the strictly later `last_save`
//!    (missing means the epoch); ties keep the leading side's copy.
//! 5. Output is sorted by creation date, ties broken by the winner's slot.
//!
//! The leading side goes first in every pool and union. On the host it is
//! the local state ([`merge_sync_data`]). On the guest it is the host's
//! reply ([`merge_host_reply`]), which already carries the host's order and
//! tie-breaks, so both devices end with identical lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use todo_sync_types::{
    Category, CategoryId, OtherData, OtherDataSource, SyncData, Task, TaskId, Timestamp, User,
};

/// Which device's miscellaneous fields (name, picture, settings) survive a sync.
///
/// These fields carry no reliable timestamp, so the user decides up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOption {
    /// Keep this device's values and push them to the peer.
    ThisDevice,
    /// Take the peer's values.
    OtherDevice,
    /// Exchange tasks and categories only.
    #[default]
    NoSync,
}

impl SyncOption {
    /// Whether `OtherData` should be attached to outgoing payloads.
    pub fn exchanges_other_data(&self) -> bool {
        !matches!(self, Self::NoSync)
    }
}

impl fmt::Display for SyncOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ThisDevice => "this_device",
            Self::OtherDevice => "other_device",
            Self::NoSync => "no_sync",
        })
    }
}

impl FromStr for SyncOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "this_device" => Ok(Self::ThisDevice),
            "other_device" => Ok(Self::OtherDevice),
            "no_sync" => Ok(Self::NoSync),
            other => Err(format!(
                "unknown sync option {other:?} (expected this_device, other_device or no_sync)"
            )),
        }
    }
}

/// Where the merged `OtherData` came from, relative to the merging side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherDataOrigin {
    /// The merging device's own data.
    Local,
    /// The data received from the peer.
    Remote,
}

impl OtherDataOrigin {
    /// Translate to the wire tag, given the role of the merging side.
    pub fn to_source(self, merged_by_host: bool) -> OtherDataSource {
        match (self, merged_by_host) {
            (Self::Local, true) | (Self::Remote, false) => OtherDataSource::Host,
            (Self::Local, false) | (Self::Remote, true) => OtherDataSource::Guest,
        }
    }
}

/// Borrowed view of the local side of a merge.
#[derive(Debug, Clone, Copy)]
pub struct LocalState<'a> {
    /// Live tasks.
    pub tasks: &'a [Task],
    /// Task tombstones.
    pub deleted_tasks: &'a [TaskId],
    /// Live categories.
    pub categories: &'a [Category],
    /// Category tombstones.
    pub deleted_categories: &'a [CategoryId],
    /// Favorite category IDs.
    pub favorite_categories: &'a [CategoryId],
    /// Local miscellaneous fields, when the session exchanges them.
    pub other_data: Option<&'a OtherData>,
}

impl<'a> LocalState<'a> {
    /// View the lists of a user.
    pub fn from_user(user: &'a User, other_data: Option<&'a OtherData>) -> Self {
        Self {
            tasks: &user.tasks,
            deleted_tasks: &user.deleted_tasks,
            categories: &user.categories,
            deleted_categories: &user.deleted_categories,
            favorite_categories: &user.favorite_categories,
            other_data,
        }
    }

    /// Build an outgoing envelope from this state.
    pub fn to_sync_data(&self) -> SyncData {
        SyncData::prepare(
            self.tasks,
            self.deleted_tasks,
            self.categories,
            self.deleted_categories,
            self.favorite_categories,
            self.other_data.cloned(),
        )
    }
}

/// Output of [`merge_sync_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Reconciled tasks.
    pub tasks: Vec<Task>,
    /// Union of both sides' task tombstones.
    pub deleted_tasks: Vec<TaskId>,
    /// Reconciled categories.
    pub categories: Vec<Category>,
    /// Union of both sides' category tombstones.
    pub deleted_categories: Vec<CategoryId>,
    /// Union of both favorites lists, without deleted categories.
    pub favorite_categories: Vec<CategoryId>,
    /// Winning miscellaneous fields, if any were exchanged.
    pub other_data: Option<OtherData>,
    /// Which side `other_data` came from.
    pub other_data_origin: Option<OtherDataOrigin>,
    /// When the merge completed.
    pub last_synced_at: Timestamp,
}

impl MergeResult {
    /// Write the merged lists into a user.
    ///
    /// Remote `OtherData` name and settings are adopted here. The profile
    /// picture is left alone; see [`crate::plan_profile_picture`].
    pub fn apply(&self, user: &mut User) {
        user.tasks = self.tasks.clone();
        user.deleted_tasks = self.deleted_tasks.clone();
        user.categories = self.categories.clone();
        user.deleted_categories = self.deleted_categories.clone();
        user.favorite_categories = self.favorite_categories.clone();
        user.last_synced_at = Some(self.last_synced_at);
        if let (Some(other), Some(OtherDataOrigin::Remote)) =
            (&self.other_data, self.other_data_origin)
        {
            user.apply_other_data(other);
        }
    }

    /// Remote `OtherData` that the local side must adopt, if any.
    pub fn adopted_other_data(&self) -> Option<&OtherData> {
        match self.other_data_origin {
            Some(OtherDataOrigin::Remote) => self.other_data.as_ref(),
            _ => None,
        }
    }

    /// Build the envelope that carries this result back to the peer.
    pub fn to_sync_data(&self, merged_by_host: bool) -> SyncData {
        let data = SyncData::prepare(
            &self.tasks,
            &self.deleted_tasks,
            &self.categories,
            &self.deleted_categories,
            &self.favorite_categories,
            self.other_data.clone(),
        );
        match (self.other_data.is_some(), self.other_data_origin) {
            (true, Some(origin)) => data.with_other_data_source(origin.to_source(merged_by_host)),
            _ => data,
        }
    }
}

/// Which side of a merge leads pool order and wins `last_save` ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lead {
    Local,
    Remote,
}

impl Lead {
    fn order<'s, X: ?Sized>(self, local: &'s X, remote: &'s X) -> (&'s X, &'s X) {
        match self {
            Self::Local => (local, remote),
            Self::Remote => (remote, local),
        }
    }
}

/// Merge the local state with a payload received from the peer.
///
/// Local entities lead: they come first on equal dates and win `last_save`
/// ties. This is the host's merge.
pub fn merge_sync_data(local: &LocalState<'_>, remote: &SyncData, option: SyncOption) -> MergeResult {
    merge_with_lead(local, remote, option, Lead::Local)
}

/// Merge the host's reply into the guest's own pre-sync state.
///
/// The reply is the host's merge result, so it leads: its order and its
/// tie-breaks are kept and the guest ends with the host's lists.
pub fn merge_host_reply(local: &LocalState<'_>, reply: &SyncData, option: SyncOption) -> MergeResult {
    merge_with_lead(local, reply, option, Lead::Remote)
}

fn merge_with_lead(
    local: &LocalState<'_>,
    remote: &SyncData,
    option: SyncOption,
    lead: Lead,
) -> MergeResult {
    let deleted_tasks = union_ids(lead.order(local.deleted_tasks, &remote.deleted_tasks[..]));
    let deleted_categories =
        union_ids(lead.order(local.deleted_categories, &remote.deleted_categories[..]));

    let tasks = merge_entities(lead.order(local.tasks, &remote.tasks[..]), &deleted_tasks);
    let categories = merge_entities(
        lead.order(local.categories, &remote.categories[..]),
        &deleted_categories,
    );

    let favorite_categories: Vec<CategoryId> =
        union_ids(lead.order(local.favorite_categories, &remote.favorite_categories[..]))
            .into_iter()
            .filter(|id| !deleted_categories.contains(id))
            .collect();

    let (other_data, other_data_origin) = merge_other_data(local.other_data, remote, option);

    MergeResult {
        tasks,
        deleted_tasks,
        categories,
        deleted_categories,
        favorite_categories,
        other_data,
        other_data_origin,
        last_synced_at: Utc::now(),
    }
}

fn merge_other_data(
    local: Option<&OtherData>,
    remote: &SyncData,
    option: SyncOption,
) -> (Option<OtherData>, Option<OtherDataOrigin>) {
    if option == SyncOption::NoSync {
        return (None, None);
    }
    // A tagged payload is the host's decision; follow it.
    if remote.other_data_source.is_some() {
        return match &remote.other_data {
            Some(other) => (Some(other.clone()), Some(OtherDataOrigin::Remote)),
            None => (None, None),
        };
    }
    match option {
        SyncOption::ThisDevice => match local {
            Some(other) => (Some(other.clone()), Some(OtherDataOrigin::Local)),
            None => (None, None),
        },
        SyncOption::OtherDevice => match &remote.other_data {
            Some(other) => (Some(other.clone()), Some(OtherDataOrigin::Remote)),
            None => (None, None),
        },
        SyncOption::NoSync => (None, None),
    }
}

/// Order-preserving union: leading IDs first, then unseen trailing IDs.
fn union_ids<I: Copy + Eq + Hash>((lead, trail): (&[I], &[I])) -> Vec<I> {
    let mut seen = HashSet::with_capacity(lead.len() + trail.len());
    lead.iter()
        .chain(trail)
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// An entity the merge engine can reconcile.
trait Mergeable: Clone {
    type Id: Copy + Eq + Hash;

    fn merge_id(&self) -> Self::Id;

    /// Missing `last_save` counts as the epoch.
    fn saved_at(&self) -> DateTime<Utc>;

    /// Base ordering key. Entities without one keep pool order.
    fn created_at(&self) -> Option<DateTime<Utc>>;
}

impl Mergeable for Task {
    type Id = TaskId;

    fn merge_id(&self) -> TaskId {
        self.id
    }

    fn saved_at(&self) -> DateTime<Utc> {
        self.last_save.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.date)
    }
}

impl Mergeable for Category {
    type Id = CategoryId;

    fn merge_id(&self) -> CategoryId {
        self.id
    }

    fn saved_at(&self) -> DateTime<Utc> {
        self.last_save.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

struct Candidate<'a, T> {
    entity: &'a T,
    leads: bool,
    slot: usize,
}

fn merge_entities<T: Mergeable>((lead, trail): (&[T], &[T]), deleted: &[T::Id]) -> Vec<T> {
    let deleted: HashSet<T::Id> = deleted.iter().copied().collect();

    let pool: Vec<(&T, bool)> = lead
        .iter()
        .map(|e| (e, true))
        .chain(trail.iter().map(|e| (e, false)))
        .filter(|(e, _)| !deleted.contains(&e.merge_id()))
        .collect();

    // sort_by_key is stable: equal dates keep pool order (leading side first)
    let mut base_order: Vec<usize> = (0..pool.len()).collect();
    base_order.sort_by_key(|&i| pool[i].0.created_at());

    let mut winners: Vec<Candidate<'_, T>> = Vec::with_capacity(pool.len());
    let mut by_id: HashMap<T::Id, usize> = HashMap::with_capacity(pool.len());

    for (slot, &i) in base_order.iter().enumerate() {
        let (entity, leads) = pool[i];
        match by_id.get(&entity.merge_id()).copied() {
            None => {
                by_id.insert(entity.merge_id(), winners.len());
                winners.push(Candidate {
                    entity,
                    leads,
                    slot,
                });
            }
            Some(index) => {
                let current = &mut winners[index];
                if supersedes(entity, leads, current.entity, current.leads) {
                    *current = Candidate {
                        entity,
                        leads,
                        slot,
                    };
                }
            }
        }
    }

    winners.sort_by(|a, b| {
        a.entity
            .created_at()
            .cmp(&b.entity.created_at())
            .then(a.slot.cmp(&b.slot))
    });
    winners.into_iter().map(|c| c.entity.clone()).collect()
}

fn supersedes<T: Mergeable>(candidate: &T, candidate_leads: bool, current: &T, current_leads: bool) -> bool {
    match candidate.saved_at().cmp(&current.saved_at()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate_leads && !current_leads,
    }
}
