//! Discovery of the scheduling inbox (and default calendar) of a principal

use std::fmt::{Display, Formatter};

use crate::itip::MessageKind;
use crate::principal::DavProperty;
use crate::resource::DavPath;
use crate::traits::PrincipalDirectory;

/// Where scheduling messages for a principal go
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboxTarget {
    /// The calendar home of the principal
    pub home: DavPath,
    /// The scheduling inbox collection
    pub inbox: DavPath,
    /// The default calendar. Only looked up for invitations
    pub default_calendar: Option<DavPath>,
}

/// Why no inbox could be found for a known principal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocateFailure {
    NoHomeSet,
    NoInbox,
    NoDefaultCalendar,
}

impl Display for LocateFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LocateFailure::NoHomeSet => write!(f, "could not locate a calendar-home-set"),
            LocateFailure::NoInbox => write!(f, "could not locate a schedule-inbox-URL"),
            LocateFailure::NoDefaultCalendar => write!(f, "could not locate a schedule-default-calendar-URL"),
        }
    }
}

impl std::error::Error for LocateFailure {}


/// Locate the inbox of a principal, and its default calendar in case an invitation is about to be delivered.
///
/// Inbox and default calendar hrefs may be relative to the calendar home.
pub async fn locate(directory: &dyn PrincipalDirectory, principal: &DavPath, kind: MessageKind) -> Result<InboxTarget, LocateFailure> {
    let home = required_href(directory, principal, DavProperty::CalendarHomeSet).await
        .map(DavPath::new)
        .ok_or(LocateFailure::NoHomeSet)?;

    let inbox = required_href(directory, principal, DavProperty::ScheduleInboxUrl).await
        .map(|href| home.resolve(&href))
        .ok_or(LocateFailure::NoInbox)?;

    let default_calendar = match kind {
        MessageKind::Request => {
            let calendar = required_href(directory, principal, DavProperty::ScheduleDefaultCalendarUrl).await
                .map(|href| home.resolve(&href))
                .ok_or(LocateFailure::NoDefaultCalendar)?;
            Some(calendar)
        },
        MessageKind::Cancel | MessageKind::Reply => None,
    };

    log::debug!("Inbox of {} is {}", principal, inbox);
    Ok(InboxTarget { home, inbox, default_calendar })
}

async fn required_href(directory: &dyn PrincipalDirectory, principal: &DavPath, property: DavProperty) -> Option<String> {
    let lookup = directory.lookup(principal, property).await;
    match lookup.first_value() {
        Some(href) => Some(href.to_string()),
        None => {
            log::warn!("Property {} of {} is not usable ({:?})", property, principal, lookup);
            None
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::MemoryDirectory;
    use crate::traits::PropertyLookup;

    fn directory() -> MemoryDirectory {
        let mut directory = MemoryDirectory::new();
        directory.add_principal("principals/bob", &["mailto:bob@example.org"]);
        directory.set_property("principals/bob", DavProperty::CalendarHomeSet, PropertyLookup::Found(vec!["/calendars/bob/".to_string()]));
        directory.set_property("principals/bob", DavProperty::ScheduleInboxUrl, PropertyLookup::Found(vec!["inbox/".to_string()]));
        directory.set_property("principals/bob", DavProperty::ScheduleDefaultCalendarUrl, PropertyLookup::Found(vec!["/calendars/bob/cal/".to_string()]));
        directory
    }

    #[tokio::test]
    async fn test_locate() {
        let directory = directory();
        let target = locate(&directory, &DavPath::new("principals/bob"), MessageKind::Request).await.unwrap();
        assert_eq!(target.home, DavPath::new("calendars/bob"));
        assert_eq!(target.inbox, DavPath::new("calendars/bob/inbox"));
        assert_eq!(target.default_calendar, Some(DavPath::new("calendars/bob/cal")));

        let target = locate(&directory, &DavPath::new("principals/bob"), MessageKind::Cancel).await.unwrap();
        assert_eq!(target.default_calendar, None);
    }

    #[tokio::test]
    async fn test_failure_reasons() {
        let bob = DavPath::new("principals/bob");

        let mut no_home = directory();
        no_home.set_property("principals/bob", DavProperty::CalendarHomeSet, PropertyLookup::Denied);
        assert_eq!(locate(&no_home, &bob, MessageKind::Request).await, Err(LocateFailure::NoHomeSet));

        let mut no_inbox = directory();
        no_inbox.set_property("principals/bob", DavProperty::ScheduleInboxUrl, PropertyLookup::Failed(500));
        assert_eq!(locate(&no_inbox, &bob, MessageKind::Reply).await, Err(LocateFailure::NoInbox));

        let mut no_calendar = directory();
        no_calendar.remove_property("principals/bob", DavProperty::ScheduleDefaultCalendarUrl);
        assert_eq!(locate(&no_calendar, &bob, MessageKind::Request).await, Err(LocateFailure::NoDefaultCalendar));
        // The default calendar is irrelevant for cancellations
        assert!(locate(&no_calendar, &bob, MessageKind::Cancel).await.is_ok());
    }
}
