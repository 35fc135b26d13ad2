//! Classification of a change to a calendar object, from a scheduling point of view
//!
//! Both versions are reduced to a snapshot per instance (the master component, and every override identified by its
//! `RECURRENCE-ID`), made of the fields that matter to participants. Comparing snapshots tells who has to be notified,
//! and with which iTIP method.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::calendar_object::{CalendarObject, Component, SchedulingObjectError};
use crate::itip::MessageKind;
use crate::participant::{CalendarAddress, Participant, Role};

/// Properties whose change is worth re-sending an invitation
const SIGNIFICANT_PROPERTIES: &[&str] = &[
    "DTSTART", "DTEND", "DURATION", "DUE",
    "RRULE", "RDATE", "EXDATE",
    "STATUS", "SUMMARY", "LOCATION",
];

/// ATTENDEE parameters that describe the participation (the scheduling ones are deliberately left out)
const SIGNIFICANT_ATTENDEE_PARAMS: &[(&str, &str)] = &[
    ("PARTSTAT", "NEEDS-ACTION"),
    ("ROLE", "REQ-PARTICIPANT"),
    ("RSVP", "FALSE"),
    ("DELEGATED-TO", ""),
    ("DELEGATED-FROM", ""),
];


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Nothing to deliver
    NoOp,
    NewInvite,
    UpdatedInvite,
    Cancellation,
    Reply,
}

/// Someone that must be notified of a change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledRecipient {
    pub address: CalendarAddress,
    /// Which entry of the triggering document receives the scheduling status
    pub role: Role,
    pub kind: MessageKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeClassification {
    pub kind: ChangeKind,
    /// Who sends the messages (the organizer, or the replying attendee)
    pub originator: Option<CalendarAddress>,
    /// In document order
    pub recipients: Vec<ScheduledRecipient>,
}

impl ChangeClassification {
    pub fn no_op() -> Self {
        Self { kind: ChangeKind::NoOp, originator: None, recipients: Vec::new() }
    }

    pub fn is_no_op(&self) -> bool {
        self.kind == ChangeKind::NoOp
    }
}


#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffError {
    /// Neither an old nor a new version was given
    InvalidInput,
    /// A version is not a valid scheduling object
    Malformed(SchedulingObjectError),
}

impl Display for DiffError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffError::InvalidInput => write!(f, "nothing to compare"),
            DiffError::Malformed(err) => write!(f, "malformed scheduling object: {}", err),
        }
    }
}

impl std::error::Error for DiffError {}

impl From<SchedulingObjectError> for DiffError {
    fn from(err: SchedulingObjectError) -> Self {
        DiffError::Malformed(err)
    }
}


/// What the differ needs to know about the request
#[derive(Clone, Copy, Debug, Default)]
pub struct DiffContext<'a> {
    /// The calendar user addresses of the authenticated principal
    pub acting: &'a [CalendarAddress],
    /// The object is being moved rather than deleted
    pub relocation: bool,
}

impl<'a> DiffContext<'a> {
    pub fn new(acting: &'a [CalendarAddress]) -> Self {
        Self { acting, relocation: false }
    }

    pub fn relocating(mut self) -> Self {
        self.relocation = true;
        self
    }

    fn is_acting(&self, address: &CalendarAddress) -> bool {
        self.acting.iter().any(|a| a == address)
    }
}


/// Classify the change from `old` to `new` (`None` meaning that the object does not exist before or after the write)
pub fn diff(old: Option<&CalendarObject>, new: Option<&CalendarObject>, ctx: &DiffContext) -> Result<ChangeClassification, DiffError> {
    match (old, new) {
        (None, None) => Err(DiffError::InvalidInput),
        (Some(old), None) => deleted(old, ctx),
        (None, Some(new)) => created(new),
        (Some(old), Some(new)) => updated(old, new, ctx),
    }
}

fn deleted(old: &CalendarObject, ctx: &DiffContext) -> Result<ChangeClassification, DiffError> {
    old.uid()?;
    if ctx.relocation {
        log::debug!("Object is being relocated, this is not a cancellation");
        return Ok(ChangeClassification::no_op());
    }
    let organizer = match old.organizer()? {
        None => return Ok(ChangeClassification::no_op()),
        Some(organizer) => organizer,
    };
    let recipients = invitees(old, &organizer)
        .map(|a| ScheduledRecipient { address: a.address().clone(), role: Role::Attendee, kind: MessageKind::Cancel })
        .collect();
    Ok(classification(ChangeKind::Cancellation, organizer.address(), recipients))
}

fn created(new: &CalendarObject) -> Result<ChangeClassification, DiffError> {
    new.uid()?;
    let organizer = match new.organizer()? {
        None => return Ok(ChangeClassification::no_op()),
        Some(organizer) => organizer,
    };
    let recipients = invitees(new, &organizer)
        .map(|a| ScheduledRecipient { address: a.address().clone(), role: Role::Attendee, kind: MessageKind::Request })
        .collect();
    Ok(classification(ChangeKind::NewInvite, organizer.address(), recipients))
}

fn updated(old: &CalendarObject, new: &CalendarObject, ctx: &DiffContext) -> Result<ChangeClassification, DiffError> {
    let old_uid = old.uid()?;
    let new_uid = new.uid()?;
    if old_uid != new_uid {
        log::debug!("UID changed from {} to {}, not a scheduling change", old_uid, new_uid);
        return Ok(ChangeClassification::no_op());
    }

    let organizer = match new.organizer()? {
        None => return Ok(ChangeClassification::no_op()),
        Some(organizer) => organizer,
    };
    if let Some(previous) = old.organizer()? {
        if previous.address() != organizer.address() {
            log::debug!("Organizer changed from {} to {}, not a scheduling change", previous.address(), organizer.address());
            return Ok(ChangeClassification::no_op());
        }
    }

    let old_snapshot = snapshot(old);
    let new_snapshot = snapshot(new);

    if ctx.is_acting(organizer.address()) {
        return Ok(organizer_update(old, new, &organizer, &old_snapshot, &new_snapshot));
    }

    let me = new.attendees().into_iter()
        .find(|a| a.address() != organizer.address() && ctx.is_acting(a.address()));
    match me {
        Some(me) => Ok(attendee_reply(old, new, &organizer, &me, &old_snapshot, &new_snapshot)),
        None => {
            log::debug!("Neither the organizer nor an attendee of {} is acting", new_uid);
            Ok(ChangeClassification::no_op())
        }
    }
}

fn organizer_update(old: &CalendarObject, new: &CalendarObject, organizer: &Participant, old_snapshot: &Snapshot, new_snapshot: &Snapshot) -> ChangeClassification {
    let event_changed = instances_changed(old_snapshot, new_snapshot);

    let mut recipients: Vec<ScheduledRecipient> = invitees(new, organizer)
        .filter(|a| event_changed || attendee_changed(old_snapshot, new_snapshot, a.address()))
        .map(|a| ScheduledRecipient { address: a.address().clone(), role: Role::Attendee, kind: MessageKind::Request })
        .collect();

    let remaining = new.attendees();
    let removed = invitees(old, organizer)
        .filter(|a| remaining.iter().all(|r| r.address() != a.address()))
        .map(|a| ScheduledRecipient { address: a.address().clone(), role: Role::Attendee, kind: MessageKind::Cancel });
    recipients.extend(removed);

    classification(ChangeKind::UpdatedInvite, organizer.address(), recipients)
}

fn attendee_reply(old: &CalendarObject, new: &CalendarObject, organizer: &Participant, me: &Participant, old_snapshot: &Snapshot, new_snapshot: &Snapshot) -> ChangeClassification {
    if instances_changed(old_snapshot, new_snapshot) {
        log::debug!("{} is not the organizer, and cannot change the event itself", me.address());
        return ChangeClassification::no_op();
    }

    let old_attendees = old.attendees();
    let new_attendees = new.attendees();
    let same_attendees = old_attendees.len() == new_attendees.len()
        && new_attendees.iter().all(|n| old_attendees.iter().any(|o| o.address() == n.address()));
    if same_attendees == false {
        log::debug!("{} is not the organizer, and cannot change the attendee list", me.address());
        return ChangeClassification::no_op();
    }

    let changed: Vec<&Participant> = new_attendees.iter()
        .filter(|a| attendee_changed(old_snapshot, new_snapshot, a.address()))
        .collect();
    let replying = match changed.as_slice() {
        [only] => only.address() == me.address(),
        [] => comments_changed(old_snapshot, new_snapshot),
        _ => false,
    };
    if replying == false {
        return ChangeClassification::no_op();
    }

    let recipient = ScheduledRecipient {
        address: organizer.address().clone(),
        role: Role::Organizer,
        kind: MessageKind::Reply,
    };
    classification(ChangeKind::Reply, me.address(), vec![recipient])
}

/// Attendees, except the organizer
fn invitees<'a>(object: &CalendarObject, organizer: &'a Participant) -> impl Iterator<Item = Participant> + 'a {
    object.attendees().into_iter()
        .filter(move |a| a.address() != organizer.address())
}

fn classification(kind: ChangeKind, originator: &CalendarAddress, recipients: Vec<ScheduledRecipient>) -> ChangeClassification {
    if recipients.is_empty() {
        return ChangeClassification::no_op();
    }
    ChangeClassification {
        kind,
        originator: Some(originator.clone()),
        recipients,
    }
}


/// What participants see of one instance
#[derive(Debug, PartialEq, Eq)]
struct Instance {
    fingerprint: Vec<String>,
    comments: Vec<String>,
    attendees: Vec<(CalendarAddress, String)>,
}

impl Instance {
    fn new(comp: &Component) -> Self {
        let fingerprint = SIGNIFICANT_PROPERTIES.iter()
            .flat_map(|name| comp.properties().iter().filter(move |p| p.is(name)))
            .map(|p| format!("{}{:?}:{}", p.name(), p.params(), p.value()))
            .collect();
        let comments = comp.properties().iter()
            .filter(|p| p.is("COMMENT"))
            .map(|p| p.value().to_string())
            .collect();
        let attendees = comp.participant_properties()
            .filter(|(role, _)| *role == Role::Attendee)
            .filter_map(|(role, p)| Participant::from_property(role, p))
            .map(|a| {
                let participation = SIGNIFICANT_ATTENDEE_PARAMS.iter()
                    .map(|&(name, default)| a.param(name).unwrap_or(default).to_ascii_uppercase())
                    .collect::<Vec<_>>()
                    .join(";");
                (a.address().clone(), participation)
            })
            .collect();
        Self { fingerprint, comments, attendees }
    }

    fn attendee(&self, address: &CalendarAddress) -> Option<&str> {
        self.attendees.iter()
            .find(|(a, _)| a == address)
            .map(|(_, participation)| participation.as_str())
    }
}

/// Instances, keyed by component name and `RECURRENCE-ID`
type Snapshot = BTreeMap<String, Instance>;

fn snapshot(object: &CalendarObject) -> Snapshot {
    object.scheduling_components()
        .map(|comp| {
            let key = format!("{}/{}", comp.name(), comp.instance_id().unwrap_or_default());
            (key, Instance::new(comp))
        })
        .collect()
}

/// Whether instances were added, removed, or had a significant property changed
fn instances_changed(old: &Snapshot, new: &Snapshot) -> bool {
    old.len() != new.len()
        || old.iter().any(|(key, instance)| match new.get(key) {
            None => true,
            Some(other) => instance.fingerprint != other.fingerprint,
        })
}

fn attendee_changed(old: &Snapshot, new: &Snapshot, address: &CalendarAddress) -> bool {
    old.keys().chain(new.keys()).any(|key| {
        let before = old.get(key).and_then(|i| i.attendee(address));
        let after = new.get(key).and_then(|i| i.attendee(address));
        before != after
    })
}

fn comments_changed(old: &Snapshot, new: &Snapshot) -> bool {
    new.iter().any(|(key, instance)| {
        old.get(key).map(|i| &i.comments) != Some(&instance.comments)
    })
}
