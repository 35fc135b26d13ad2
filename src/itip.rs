//! Synthesis of iTIP messages (RFC 5546) out of a calendar object

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar_object::{CalendarObject, Component, Property};
use crate::participant::{CalendarAddress, Role};

/// Parameters that only make sense on the organizer's copy, and must not travel
const SCHEDULING_PARAMS: &[&str] = &["SCHEDULE-STATUS", "SCHEDULE-AGENT", "SCHEDULE-FORCE-SEND"];

const CANCEL_PROPERTIES: &[&str] = &["UID", "RECURRENCE-ID", "SEQUENCE", "DTSTART", "SUMMARY"];
const REPLY_PROPERTIES: &[&str] = &["UID", "RECURRENCE-ID", "SEQUENCE", "DTSTART", "DTEND", "DURATION", "DUE", "COMMENT"];


/// The iTIP methods this crate sends
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// An invitation, or an update to an invitation
    Request,
    /// The organizer withdrew (part of) an event
    Cancel,
    /// An attendee answered an invitation
    Reply,
}

impl MessageKind {
    /// The value of the `METHOD` property
    pub fn method(&self) -> &'static str {
        match self {
            MessageKind::Request => "REQUEST",
            MessageKind::Cancel => "CANCEL",
            MessageKind::Reply => "REPLY",
        }
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.method())
    }
}


/// Build the message that `originator` sends to `recipient` about `source`.
///
/// For requests and cancellations, only the instances the recipient is invited to are carried.
/// For replies, only the instances the originator attends are carried, and other attendees are left out.
pub fn build_message(kind: MessageKind, source: &CalendarObject, originator: &CalendarAddress, recipient: &CalendarAddress, now: &DateTime<Utc>) -> CalendarObject {
    let mut root = Component::new("VCALENDAR");
    root.push(Property::new("VERSION", "2.0"));
    root.push(Property::new("PRODID", crate::ical::default_prod_id()));
    root.push(Property::new("METHOD", kind.method()));

    for tz in source.timezones() {
        root.add_component(tz.clone());
    }

    let stamp = Property::new("DTSTAMP", crate::ical::format_date_time(now));
    match kind {
        MessageKind::Request => {
            let listing: Vec<&Component> = source.scheduling_components()
                .filter(|c| c.lists_attendee(recipient))
                .collect();
            let instances = if listing.is_empty() {
                source.scheduling_components().collect()
            } else {
                listing
            };
            for comp in instances {
                root.add_component(request_component(comp, &stamp));
            }
        },
        MessageKind::Cancel => {
            for comp in source.scheduling_components().filter(|c| c.lists_attendee(recipient)) {
                let mut cancel = minimal_component(comp, CANCEL_PROPERTIES, recipient);
                cancel.push(Property::new("STATUS", "CANCELLED"));
                cancel.push(stamp.clone());
                root.add_component(cancel);
            }
        },
        MessageKind::Reply => {
            for comp in source.scheduling_components().filter(|c| c.lists_attendee(originator)) {
                let mut reply = minimal_component(comp, REPLY_PROPERTIES, originator);
                reply.push(stamp.clone());
                root.add_component(reply);
            }
        },
    }

    CalendarObject::new(root)
}

fn request_component(source: &Component, stamp: &Property) -> Component {
    let mut comp = Component::new(source.name());
    for prop in source.properties().iter().filter(|p| !p.is("DTSTAMP")) {
        comp.push(exported(prop));
    }
    comp.push(stamp.clone());
    for sub in source.components().iter().filter(|c| !c.is("VALARM")) {
        comp.add_component(sub.clone());
    }
    comp
}

/// A copy of `source` reduced to `names`, its organizer, and the ATTENDEE entry of `attendee`
fn minimal_component(source: &Component, names: &[&str], attendee: &CalendarAddress) -> Component {
    let mut comp = Component::new(source.name());
    for name in names {
        for prop in source.properties().iter().filter(|p| p.is(name)) {
            comp.push(prop.clone());
        }
    }
    for (role, prop) in source.participant_properties() {
        let keep = match role {
            Role::Organizer => true,
            Role::Attendee => CalendarAddress::parse(prop.value()).as_ref() == Some(attendee),
        };
        if keep {
            comp.push(exported(prop));
        }
    }
    comp
}

/// Strip the organizer-side scheduling parameters from ORGANIZER and ATTENDEE properties
fn exported(prop: &Property) -> Property {
    let mut prop = prop.clone();
    if Role::of(&prop).is_some() {
        for param in SCHEDULING_PARAMS {
            prop.remove_param(param);
        }
    }
    prop
}


#[cfg(test)]
mod test {
    use super::*;

    const MEETING: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:meeting\r\n\
DTSTART:20140811T230000Z\r\n\
DTSTAMP:20140801T000000Z\r\n\
SUMMARY:Weekly meeting\r\n\
RRULE:FREQ=WEEKLY\r\n\
ORGANIZER:mailto:boss@example.org\r\n\
ATTENDEE;SCHEDULE-STATUS=1.2:mailto:alice@example.org\r\n\
ATTENDEE;PARTSTAT=ACCEPTED:mailto:bob@example.org\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT5M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:meeting\r\n\
RECURRENCE-ID:20140818T230000Z\r\n\
DTSTART:20140819T090000Z\r\n\
ORGANIZER:mailto:boss@example.org\r\n\
ATTENDEE;PARTSTAT=ACCEPTED:mailto:bob@example.org\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn address(s: &str) -> CalendarAddress {
        CalendarAddress::parse(s).unwrap()
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2021-03-21T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_request() {
        let source = crate::ical::parse(MEETING).unwrap();
        let message = build_message(MessageKind::Request, &source, &address("mailto:boss@example.org"), &address("mailto:alice@example.org"), &now());

        assert_eq!(message.root().value_of("METHOD"), Some("REQUEST"));
        assert_eq!(message.root().value_of("VERSION"), Some("2.0"));

        // Alice is not invited to the overridden instance
        let events: Vec<&Component> = message.scheduling_components().collect();
        assert_eq!(events.len(), 1);
        let event = events[0];
        assert_eq!(event.value_of("DTSTAMP"), Some("20210321T100000Z"));
        assert_eq!(event.properties().iter().filter(|p| p.is("DTSTAMP")).count(), 1);
        assert_eq!(event.value_of("RRULE"), Some("FREQ=WEEKLY"));
        assert!(event.components().is_empty());

        let alice = event.participant_properties()
            .find(|(_, p)| p.value() == "mailto:alice@example.org")
            .map(|(_, p)| p)
            .unwrap();
        assert_eq!(alice.param("SCHEDULE-STATUS"), None);

        let to_bob = build_message(MessageKind::Request, &source, &address("mailto:boss@example.org"), &address("mailto:bob@example.org"), &now());
        assert_eq!(to_bob.scheduling_components().count(), 2);
    }

    #[test]
    fn test_cancel() {
        let source = crate::ical::parse(MEETING).unwrap();
        let message = build_message(MessageKind::Cancel, &source, &address("mailto:boss@example.org"), &address("mailto:bob@example.org"), &now());

        assert_eq!(message.root().value_of("METHOD"), Some("CANCEL"));
        let events: Vec<&Component> = message.scheduling_components().collect();
        assert_eq!(events.len(), 2);
        for event in events {
            assert_eq!(event.value_of("UID"), Some("meeting"));
            assert_eq!(event.value_of("STATUS"), Some("CANCELLED"));
            assert_eq!(event.value_of("RRULE"), None);
            let participants: Vec<&str> = event.participant_properties().map(|(_, p)| p.value()).collect();
            assert_eq!(participants, vec!["mailto:boss@example.org", "mailto:bob@example.org"]);
        }
    }

    #[test]
    fn test_reply() {
        let source = crate::ical::parse(MEETING).unwrap();
        let message = build_message(MessageKind::Reply, &source, &address("mailto:alice@example.org"), &address("mailto:boss@example.org"), &now());

        assert_eq!(message.root().value_of("METHOD"), Some("REPLY"));
        let events: Vec<&Component> = message.scheduling_components().collect();
        assert_eq!(events.len(), 1);
        let event = events[0];
        assert_eq!(event.value_of("SUMMARY"), None);
        assert_eq!(event.value_of("DTSTART"), Some("20140811T230000Z"));
        let attendees: Vec<&str> = event.participant_properties()
            .filter(|(role, _)| *role == Role::Attendee)
            .map(|(_, p)| p.value())
            .collect();
        assert_eq!(attendees, vec!["mailto:alice@example.org"]);
    }
}
