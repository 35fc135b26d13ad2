//! Scheduling statuses, and how they are written back onto the triggering document

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::broker::DeliveryOutcome;
use crate::calendar_object::CalendarObject;
use crate::participant::{CalendarAddress, Role};

/// The value of the `SCHEDULE-STATUS` parameter (RFC 6638, section 3.2.9)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Delivered,
    RecipientNotFound,
    CannotDeliver,
}

impl ScheduleStatus {
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleStatus::Delivered => "1.2",
            ScheduleStatus::RecipientNotFound => "3.7",
            ScheduleStatus::CannotDeliver => "5.2",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScheduleStatus::Delivered => "The message has been delivered",
            ScheduleStatus::RecipientNotFound => "Could not find the recipient",
            ScheduleStatus::CannotDeliver => "Could not deliver the message",
        }
    }
}

impl Display for ScheduleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<&DeliveryOutcome> for ScheduleStatus {
    fn from(outcome: &DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Delivered { .. } => ScheduleStatus::Delivered,
            DeliveryOutcome::RecipientNotFound => ScheduleStatus::RecipientNotFound,
            DeliveryOutcome::CannotDeliver(_) => ScheduleStatus::CannotDeliver,
        }
    }
}


/// Returns a copy of `document`, where every `role` entry matching `address` carries `status`.
///
/// Any previous status of these entries is replaced. Other entries are left untouched.
pub fn annotate(document: &CalendarObject, role: Role, address: &CalendarAddress, status: ScheduleStatus) -> CalendarObject {
    let mut annotated = document.clone();
    let mut count = 0;
    for comp in annotated.scheduling_components_mut() {
        for prop in comp.properties_mut().iter_mut() {
            if Role::of(prop) != Some(role) {
                continue;
            }
            if CalendarAddress::parse(prop.value()).as_ref() == Some(address) {
                prop.set_param("SCHEDULE-STATUS", status.code());
                count += 1;
            }
        }
    }
    log::debug!("{} {} entries of {} now have status {}", count, role.property_name(), address, status);
    annotated
}


#[cfg(test)]
mod test {
    use super::*;

    const INVITE: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:foo\r\n\
ORGANIZER:mailto:user1.sabredav@sabredav.org\r\n\
ATTENDEE:mailto:user1.sabredav@sabredav.org\r\n\
ATTENDEE;SCHEDULE-STATUS=5.2:mailto:user2.sabredav@sabredav.org\r\n\
ATTENDEE:mailto:user3.sabredav@sabredav.org\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:foo\r\n\
RECURRENCE-ID:20140818T230000Z\r\n\
ORGANIZER:mailto:user1.sabredav@sabredav.org\r\n\
ATTENDEE:mailto:user2.sabredav@sabredav.org\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn statuses(document: &CalendarObject) -> Vec<(String, Option<String>)> {
        document.scheduling_components()
            .flat_map(|c| c.participant_properties())
            .map(|(role, p)| (format!("{}:{}", role.property_name(), p.value()), p.param("SCHEDULE-STATUS").map(|s| s.to_string())))
            .collect()
    }

    #[test]
    fn test_annotate() {
        let document = crate::ical::parse(INVITE).unwrap();
        let user2 = CalendarAddress::parse("mailto:user2.sabredav@sabredav.org").unwrap();

        let annotated = annotate(&document, Role::Attendee, &user2, ScheduleStatus::Delivered);
        assert_eq!(statuses(&annotated), vec![
            ("ORGANIZER:mailto:user1.sabredav@sabredav.org".to_string(), None),
            ("ATTENDEE:mailto:user1.sabredav@sabredav.org".to_string(), None),
            ("ATTENDEE:mailto:user2.sabredav@sabredav.org".to_string(), Some("1.2".to_string())),
            ("ATTENDEE:mailto:user3.sabredav@sabredav.org".to_string(), None),
            ("ORGANIZER:mailto:user1.sabredav@sabredav.org".to_string(), None),
            ("ATTENDEE:mailto:user2.sabredav@sabredav.org".to_string(), Some("1.2".to_string())),
        ]);
        // The input is left untouched
        assert_eq!(statuses(&document)[2].1, Some("5.2".to_string()));
    }

    #[test]
    fn test_annotate_role() {
        let document = crate::ical::parse(INVITE).unwrap();
        let user1 = CalendarAddress::parse("mailto:user1.sabredav@sabredav.org").unwrap();

        let annotated = annotate(&document, Role::Organizer, &user1, ScheduleStatus::RecipientNotFound);
        let statuses = statuses(&annotated);
        assert_eq!(statuses[0].1, Some("3.7".to_string()));
        assert_eq!(statuses[1].1, None);
        assert_eq!(statuses[4].1, Some("3.7".to_string()));
    }
}
