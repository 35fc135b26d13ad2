//! A module to parse ICal files

use std::error::Error;

use ical::property::PropertyParser;

use crate::calendar_object::{CalendarObject, Component, Property};


/// Parse an iCal file into the internal representation [`crate::CalendarObject`]
pub fn parse(content: &str) -> Result<CalendarObject, Box<dyn Error>> {
    let reader = PropertyParser::from_reader(content.as_bytes());

    let mut stack: Vec<Component> = Vec::new();
    let mut root: Option<Component> = None;

    for line in reader {
        let line = match line {
            Err(err) => return Err(format!("Unable to parse iCal data: {}", err).into()),
            Ok(line) => line,
        };
        let name = line.name.trim().to_ascii_uppercase();

        match name.as_str() {
            "BEGIN" => {
                if root.is_some() {
                    return Err("Parsing multiple items is not supported".into());
                }
                let comp_name = line.value.unwrap_or_default();
                stack.push(Component::new(comp_name.trim()));
            },
            "END" => {
                let comp = match stack.pop() {
                    None => return Err("Found an END without a matching BEGIN".into()),
                    Some(comp) => comp,
                };
                let expected = line.value.unwrap_or_default();
                if comp.is(expected.trim()) == false {
                    return Err(format!("Unexpected END:{} while parsing a {}", expected.trim(), comp.name()).into());
                }
                match stack.last_mut() {
                    Some(parent) => parent.add_component(comp),
                    None => root = Some(comp),
                }
            },
            _ => {
                let current = match stack.last_mut() {
                    None => return Err(format!("Property {} is outside of any component", name).into()),
                    Some(comp) => comp,
                };
                let params = line.params.unwrap_or_default()
                    .into_iter()
                    .map(|(param_name, values)| (param_name, values.into_iter().map(unquote).collect()))
                    .collect();
                current.push(Property::new(&name, line.value.unwrap_or_default()).with_params(params));
            },
        }
    }

    if let Some(unterminated) = stack.last() {
        return Err(format!("Unterminated component {}", unterminated.name()).into());
    }
    let root = match root {
        None => return Err("Invalid iCal data: no calendar found".into()),
        Some(root) => root,
    };
    if root.is("VCALENDAR") == false {
        return Err(format!("Expected a VCALENDAR, got a {}", root.name()).into());
    }

    Ok(CalendarObject::new(root))
}

fn unquote(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        value
    }
}


#[cfg(test)]
mod test {
    const EXAMPLE_ICAL: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Nextcloud Tasks v0.13.6
BEGIN:VEVENT
UID:0633de27-8c32-42be-bcb8-63bc879c6185
DTSTAMP:20210321T001600
DTSTART:20210322T090000Z
SUMMARY:Weekly sync
ORGANIZER;CN=Boss:mailto:boss@example.org
ATTENDEE;PARTSTAT=ACCEPTED;ROLE=CHAIR:mailto:alice@example.org
BEGIN:VALARM
ACTION:DISPLAY
TRIGGER:-PT15M
END:VALARM
END:VEVENT
END:VCALENDAR
"#;

    const EXAMPLE_MULTIPLE_ICAL: &str = r#"BEGIN:VCALENDAR
BEGIN:VTODO
UID:0633de27-8c32-42be-bcb8-63bc879c6185
SUMMARY:Call Mom
END:VTODO
END:VCALENDAR
BEGIN:VCALENDAR
BEGIN:VTODO
UID:0633de27-8c32-42be-bcb8-63bc879c6185
SUMMARY:Buy a gift for Mom
END:VTODO
END:VCALENDAR
"#;

    use super::*;

    #[test]
    fn test_ical_parsing() {
        let obj = parse(EXAMPLE_ICAL).unwrap();
        let root = obj.root();
        assert!(root.is("VCALENDAR"));
        assert_eq!(root.value_of("PRODID"), Some("-//Nextcloud Tasks v0.13.6"));

        let event = &root.components()[0];
        assert!(event.is("VEVENT"));
        assert_eq!(event.value_of("SUMMARY"), Some("Weekly sync"));
        assert_eq!(event.components().len(), 1);
        assert!(event.components()[0].is("VALARM"));

        let attendee = event.property("ATTENDEE").unwrap();
        assert_eq!(attendee.value(), "mailto:alice@example.org");
        assert_eq!(attendee.param("PARTSTAT"), Some("ACCEPTED"));
        assert_eq!(attendee.param("ROLE"), Some("CHAIR"));
        assert_eq!(event.property("ORGANIZER").unwrap().param("CN"), Some("Boss"));
    }

    #[test]
    fn test_multiple_items_in_ical() {
        assert!(parse(EXAMPLE_MULTIPLE_ICAL).is_err());
    }

    #[test]
    fn test_invalid_structures() {
        assert!(parse("").is_err());
        assert!(parse("BEGIN:VCALENDAR\nBEGIN:VEVENT\nEND:VCALENDAR\n").is_err());
        assert!(parse("BEGIN:VCARD\nFN:Alice\nEND:VCARD\n").is_err());
        assert!(parse("BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:x\nEND:VEVENT\n").is_err());
    }
}
