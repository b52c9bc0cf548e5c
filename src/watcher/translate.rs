//! Translation of `notify` events into [`ChangeEvent`]s.
//!
//! Renames are decomposed: the old name is reported deleted and the new name created.
//! Access events carry no content change and are dropped.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

use super::event::{ChangeEvent, ChangeKind};

/// True if the backend dropped events and the consumer's view may be stale.
pub fn is_overflow(event: &Event) -> bool {
    event.need_rescan() || (matches!(event.kind, EventKind::Other) && event.paths.is_empty())
}

/// Normalized changes carried by one raw event.
pub fn changes_from_event(event: &Event) -> Vec<ChangeEvent> {
    let all = |kind: ChangeKind| -> Vec<ChangeEvent> {
        event
            .paths
            .iter()
            .map(|path| ChangeEvent::new(path.clone(), kind))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => all(ChangeKind::Created),
        EventKind::Remove(_) => all(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => all(ChangeKind::Deleted),
            RenameMode::To => all(ChangeKind::Created),
            RenameMode::Both => rename_pair(event),
            // Unknown direction: the path may or may not still exist.
            RenameMode::Any | RenameMode::Other => event
                .paths
                .iter()
                .map(|path| {
                    let kind = if path.exists() {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Deleted
                    };
                    ChangeEvent::new(path.clone(), kind)
                })
                .collect(),
        },
        EventKind::Modify(_) | EventKind::Any => all(ChangeKind::Modified),
        EventKind::Other => all(ChangeKind::Modified),
        EventKind::Access(_) => Vec::new(),
    }
}

/// Which form of a rename a tracker id was first seen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameForm {
    /// Separate `From` and `To` events.
    Halves,
    /// One `Both` event carrying both paths.
    Pair,
}

/// Reports each rename once.
///
/// inotify announces a rename as `From`, then `To`, then a `Both` carrying both
/// paths, all sharing one tracker id. Whichever form arrives first for an id is
/// reported; the other form is dropped. Events without a tracker id pass through.
#[derive(Debug, Default)]
pub struct RenameTracker {
    seen: VecDeque<(Instant, usize, RenameForm)>,
}

impl RenameTracker {
    pub const MAX_AGE: Duration = Duration::from_secs(2);
    pub const MAX_TRACKED: usize = 512;

    pub fn new() -> Self {
        Self::default()
    }

    /// Changes for one raw event, with repeated rename forms removed.
    pub fn changes(&mut self, event: &Event, now: Instant) -> Vec<ChangeEvent> {
        self.expire(now);

        let form = match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::From | RenameMode::To)) => {
                Some(RenameForm::Halves)
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Some(RenameForm::Pair),
            _ => None,
        };

        if let (Some(form), Some(id)) = (form, event.attrs.tracker()) {
            let first = self
                .seen
                .iter()
                .find(|(_, seen_id, _)| *seen_id == id)
                .map(|(_, _, seen_form)| *seen_form);
            match first {
                Some(first) if first != form => {
                    crate::debug_event!("watcher", "repeated rename dropped", "tracker {id}");
                    return Vec::new();
                }
                Some(_) => {}
                None => self.seen.push_back((now, id, form)),
            }
        }

        changes_from_event(event)
    }

    fn expire(&mut self, now: Instant) {
        while let Some((at, _, _)) = self.seen.front() {
            if now.saturating_duration_since(*at) <= Self::MAX_AGE
                && self.seen.len() <= Self::MAX_TRACKED
            {
                break;
            }
            self.seen.pop_front();
        }
    }
}

fn rename_pair(event: &Event) -> Vec<ChangeEvent> {
    let mut paths = event.paths.iter();
    let mut out = Vec::with_capacity(2);
    if let Some(from) = paths.next() {
        out.push(ChangeEvent::deleted(from.clone()));
    }
    if let Some(to) = paths.next() {
        out.push(ChangeEvent::created(to.clone()));
    }
    out
}
