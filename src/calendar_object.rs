//! iCalendar documents (a `VCALENDAR` and its components)
//!
//! This is a lossless tree: every component and property of the parsed text is kept, in order, so
//! that a document can be rewritten (e.g. to add a `SCHEDULE-STATUS` parameter) without losing anything.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::participant::{CalendarAddress, Participant, Role};

/// Components that never hold scheduling data
const NON_SCHEDULING_COMPONENTS: &[&str] = &["VTIMEZONE"];


/// A single content line (`NAME;PARAM=VALUE:value`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    name: String,
    params: Vec<(String, Vec<String>)>,
    /// Raw value, as found in the file (i.e. still escaped)
    value: String,
}

impl Property {
    pub fn new<N: AsRef<str>, V: ToString>(name: N, value: V) -> Self {
        Self {
            name: name.as_ref().to_ascii_uppercase(),
            params: Vec::new(),
            value: value.to_string(),
        }
    }

    pub fn with_params(mut self, params: Vec<(String, Vec<String>)>) -> Self {
        for (name, values) in params {
            self.params.push((name.to_ascii_uppercase(), values));
        }
        self
    }

    pub fn name(&self) -> &str              { &self.name }
    pub fn value(&self) -> &str             { &self.value }
    pub fn params(&self) -> &[(String, Vec<String>)] { &self.params }

    pub fn is<S: AsRef<str>>(&self, name: S) -> bool {
        self.name.eq_ignore_ascii_case(name.as_ref())
    }

    /// Returns the first value of the given parameter, if any
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(|v| v.as_str())
    }

    /// Add a parameter, or replace every previous occurrence of it
    pub fn set_param<S: ToString>(&mut self, name: &str, value: S) {
        self.remove_param(name);
        self.params.push((name.to_ascii_uppercase(), vec![value.to_string()]));
    }

    pub fn remove_param(&mut self, name: &str) {
        self.params.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }
}


/// A `BEGIN:xxx`/`END:xxx` block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    name: String,
    properties: Vec<Property>,
    components: Vec<Component>,
}

impl Component {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Self {
            name: name.as_ref().to_ascii_uppercase(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn name(&self) -> &str                 { &self.name }
    pub fn properties(&self) -> &[Property]    { &self.properties }
    pub fn components(&self) -> &[Component]   { &self.components }
    pub fn properties_mut(&mut self) -> &mut Vec<Property> { &mut self.properties }
    pub fn components_mut(&mut self) -> &mut Vec<Component> { &mut self.components }

    pub fn push(&mut self, property: Property) {
        self.properties.push(property);
    }

    pub fn add_component(&mut self, component: Component) {
        self.components.push(component);
    }

    pub fn is<S: AsRef<str>>(&self, name: S) -> bool {
        self.name.eq_ignore_ascii_case(name.as_ref())
    }

    /// Returns the first property with this name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.is(name))
    }

    /// Returns the value of the first property with this name
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.property(name).map(|p| p.value())
    }

    /// Replace every property with this name by a single one
    pub fn set_property(&mut self, property: Property) {
        let name = property.name().to_string();
        self.properties.retain(|p| !p.is(&name));
        self.properties.push(property);
    }

    pub fn is_scheduling_component(&self) -> bool {
        NON_SCHEDULING_COMPONENTS.iter().all(|n| !self.is(n))
    }

    /// The `RECURRENCE-ID` of this component, that tells which instance of a recurring item it overrides
    pub fn instance_id(&self) -> Option<&str> {
        self.value_of("RECURRENCE-ID")
    }

    /// Returns the ORGANIZER and ATTENDEE properties, in order
    pub fn participant_properties(&self) -> impl Iterator<Item = (Role, &Property)> {
        self.properties.iter().filter_map(|p| Role::of(p).map(|role| (role, p)))
    }

    /// Whether an ATTENDEE property of this component matches this address
    pub fn lists_attendee(&self, address: &CalendarAddress) -> bool {
        self.participant_properties()
            .any(|(role, p)| role == Role::Attendee && CalendarAddress::parse(p.value()).as_ref() == Some(address))
    }
}


/// Why a document cannot be considered as a single scheduling object
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchedulingObjectError {
    /// A scheduling component has no UID
    MissingUid,
    /// Components do not share the same UID
    MultipleUids,
    /// Components do not share the same ORGANIZER
    MultipleOrganizers,
}

impl Display for SchedulingObjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUid => write!(f, "a calendar component has no UID"),
            Self::MultipleUids => write!(f, "calendar components have different UIDs"),
            Self::MultipleOrganizers => write!(f, "calendar components have different organizers"),
        }
    }
}

impl std::error::Error for SchedulingObjectError {}


/// A calendar object resource, i.e. a single iCalendar document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarObject {
    root: Component,
}

impl CalendarObject {
    /// Wrap a `VCALENDAR` component
    pub fn new(root: Component) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Component {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Component {
        &mut self.root
    }

    /// The top-level components that carry scheduling data (i.e. everything but time zones)
    pub fn scheduling_components(&self) -> impl Iterator<Item = &Component> {
        self.root.components.iter().filter(|c| c.is_scheduling_component())
    }

    pub fn scheduling_components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.root.components.iter_mut().filter(|c| c.is_scheduling_component())
    }

    pub fn timezones(&self) -> impl Iterator<Item = &Component> {
        self.root.components.iter().filter(|c| c.is("VTIMEZONE"))
    }

    /// The UID shared by every scheduling component of this object
    pub fn uid(&self) -> Result<&str, SchedulingObjectError> {
        let mut uid = None;
        for comp in self.scheduling_components() {
            let this_uid = comp.value_of("UID").ok_or(SchedulingObjectError::MissingUid)?;
            match uid {
                None => uid = Some(this_uid),
                Some(known) if known != this_uid => return Err(SchedulingObjectError::MultipleUids),
                Some(_) => (),
            }
        }
        uid.ok_or(SchedulingObjectError::MissingUid)
    }

    /// The organizer of this object, if any
    pub fn organizer(&self) -> Result<Option<Participant>, SchedulingObjectError> {
        let mut organizer: Option<Participant> = None;
        for participant in self.raw_participants().filter(|p| p.role() == Role::Organizer) {
            match &organizer {
                None => organizer = Some(participant),
                Some(known) if known.address() != participant.address() => {
                    return Err(SchedulingObjectError::MultipleOrganizers);
                },
                Some(_) => (),
            }
        }
        Ok(organizer)
    }

    /// Every distinct attendee of this object, in document order
    pub fn attendees(&self) -> Vec<Participant> {
        let mut attendees: Vec<Participant> = Vec::new();
        for participant in self.raw_participants().filter(|p| p.role() == Role::Attendee) {
            if attendees.iter().all(|a| a.address() != participant.address()) {
                attendees.push(participant);
            }
        }
        attendees
    }

    fn raw_participants(&self) -> impl Iterator<Item = Participant> + '_ {
        self.scheduling_components()
            .flat_map(|comp| comp.participant_properties())
            .filter_map(|(role, prop)| Participant::from_property(role, prop))
    }
}

impl Display for CalendarObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::ical::build_from(self))
    }
}


#[cfg(test)]
mod test {
    use super::*;

    const RECURRING: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/Paris\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:weekly\r\n\
DTSTART;TZID=Europe/Paris:20210906T100000\r\n\
RRULE:FREQ=WEEKLY\r\n\
ORGANIZER:mailto:boss@example.org\r\n\
ATTENDEE:mailto:alice@example.org\r\n\
ATTENDEE;PARTSTAT=ACCEPTED:mailto:bob@example.org\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:weekly\r\n\
RECURRENCE-ID;TZID=Europe/Paris:20210913T100000\r\n\
DTSTART;TZID=Europe/Paris:20210913T110000\r\n\
ORGANIZER:mailto:boss@example.org\r\n\
ATTENDEE:mailto:bob@example.org\r\n\
ATTENDEE:mailto:carol@example.org\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_participants() {
        let obj = crate::ical::parse(RECURRING).unwrap();
        assert_eq!(obj.uid().unwrap(), "weekly");
        assert_eq!(obj.timezones().count(), 1);
        assert_eq!(obj.scheduling_components().count(), 2);

        let organizer = obj.organizer().unwrap().unwrap();
        assert_eq!(organizer.address().as_str(), "mailto:boss@example.org");

        let attendees: Vec<String> = obj.attendees().iter()
            .map(|a| a.address().to_string())
            .collect();
        assert_eq!(attendees, vec![
            "mailto:alice@example.org",
            "mailto:bob@example.org",
            "mailto:carol@example.org",
        ]);
    }

    #[test]
    fn test_uid_errors() {
        let missing = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDTSTART:20140811T230000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let obj = crate::ical::parse(missing).unwrap();
        assert_eq!(obj.uid(), Err(SchedulingObjectError::MissingUid));

        let multiple = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a\r\nEND:VEVENT\r\nBEGIN:VEVENT\r\nUID:b\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let obj = crate::ical::parse(multiple).unwrap();
        assert_eq!(obj.uid(), Err(SchedulingObjectError::MultipleUids));
    }

    #[test]
    fn test_param_edition() {
        let mut prop = Property::new("attendee", "mailto:alice@example.org")
            .with_params(vec![("partstat".to_string(), vec!["ACCEPTED".to_string()])]);
        assert_eq!(prop.name(), "ATTENDEE");
        assert_eq!(prop.param("PARTSTAT"), Some("ACCEPTED"));

        prop.set_param("SCHEDULE-STATUS", "5.2");
        prop.set_param("schedule-status", "1.2");
        assert_eq!(prop.params().len(), 2);
        assert_eq!(prop.param("SCHEDULE-STATUS"), Some("1.2"));

        prop.remove_param("PARTSTAT");
        assert_eq!(prop.param("PARTSTAT"), None);
    }
}
