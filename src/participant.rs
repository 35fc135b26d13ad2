//! Organizers and attendees of a calendar object

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::calendar_object::Property;

/// A calendar user address, such as `mailto:alice@example.org`
///
/// The scheme is case-insensitive (it is stored lowercased), the rest of the address is compared as is.
/// Values that carry no scheme (e.g. a bare `alice@example.org`) are kept verbatim: they still are participants,
/// they just never match a principal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarAddress {
    content: String,
    is_uri: bool,
}

impl CalendarAddress {
    /// Parse an address. Returns `None` only for an empty value
    pub fn parse<S: AsRef<str>>(address: S) -> Option<Self> {
        let trimmed = address.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }

        match Url::parse(trimmed) {
            Ok(url) => {
                let scheme = url.scheme();
                match trimmed.get(scheme.len()..) {
                    Some(rest) if rest.starts_with(':') => {
                        return Some(Self { content: format!("{}{}", scheme, rest), is_uri: true });
                    },
                    _ => (),
                }
            },
            Err(err) => {
                log::debug!("{:?} is not an absolute URI ({})", trimmed, err);
            },
        }
        Some(Self { content: trimmed.to_string(), is_uri: false })
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Whether this address is an absolute URI. Other addresses cannot be resolved
    pub fn is_uri(&self) -> bool {
        self.is_uri
    }
}

impl Display for CalendarAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Organizer,
    Attendee,
}

impl Role {
    /// Tells which role a property describes (if any)
    pub fn of(property: &Property) -> Option<Role> {
        if property.is("ORGANIZER") {
            Some(Role::Organizer)
        } else if property.is("ATTENDEE") {
            Some(Role::Attendee)
        } else {
            None
        }
    }

    pub fn property_name(&self) -> &'static str {
        match self {
            Role::Organizer => "ORGANIZER",
            Role::Attendee => "ATTENDEE",
        }
    }
}


/// An ORGANIZER or ATTENDEE entry of a calendar object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    role: Role,
    address: CalendarAddress,
    params: Vec<(String, Vec<String>)>,
}

impl Participant {
    pub fn new(role: Role, address: CalendarAddress) -> Self {
        Self { role, address, params: Vec::new() }
    }

    /// Extract a participant from an ORGANIZER or ATTENDEE property.
    /// Returns `None` in case the property has no valid address
    pub fn from_property(role: Role, property: &Property) -> Option<Self> {
        let address = CalendarAddress::parse(property.value())?;
        Some(Self {
            role,
            address,
            params: property.params().to_vec(),
        })
    }

    pub fn role(&self) -> Role                    { self.role }
    pub fn address(&self) -> &CalendarAddress     { &self.address }
    pub fn params(&self) -> &[(String, Vec<String>)] { &self.params }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(|v| v.as_str())
    }

    /// The participation status (`PARTSTAT`), which defaults to `NEEDS-ACTION`
    pub fn participation_status(&self) -> &str {
        self.param("PARTSTAT").unwrap_or("NEEDS-ACTION")
    }

    /// The last scheduling status written onto this entry, if any
    pub fn schedule_status(&self) -> Option<&str> {
        self.param("SCHEDULE-STATUS")
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_address_normalization() {
        let upper = CalendarAddress::parse("MAILTO:Alice@Example.org").unwrap();
        let lower = CalendarAddress::parse(" mailto:Alice@Example.org").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "mailto:Alice@Example.org");

        let other_case = CalendarAddress::parse("mailto:alice@example.org").unwrap();
        assert_ne!(upper, other_case);
        assert!(upper.is_uri());

        let http = CalendarAddress::parse("HTTP://Example.org/principals/Alice").unwrap();
        assert_eq!(http.as_str(), "http://Example.org/principals/Alice");

        let bare = CalendarAddress::parse("alice@example.org").unwrap();
        assert_eq!(bare.as_str(), "alice@example.org");
        assert!(bare.is_uri() == false);
        assert_eq!(CalendarAddress::parse("  "), None);
    }

    #[test]
    fn test_participant_from_property() {
        let prop = Property::new("ATTENDEE", "mailto:bob@example.org")
            .with_params(vec![("SCHEDULE-STATUS".to_string(), vec!["1.2".to_string()])]);
        let participant = Participant::from_property(Role::Attendee, &prop).unwrap();
        assert_eq!(participant.role(), Role::Attendee);
        assert_eq!(participant.participation_status(), "NEEDS-ACTION");
        assert_eq!(participant.schedule_status(), Some("1.2"));

        let no_address = Property::new("ATTENDEE", "");
        assert!(Participant::from_property(Role::Attendee, &no_address).is_none());
        assert_eq!(Role::of(&Property::new("SUMMARY", "x")), None);
    }
}
