//! Resolution of calendar user addresses into server principals

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::participant::CalendarAddress;
use crate::resource::DavPath;
use crate::traits::{PrincipalDirectory, PropertyLookup};

/// The principal properties the scheduling pipeline reads
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DavProperty {
    /// `{urn:ietf:params:xml:ns:caldav}calendar-home-set`
    CalendarHomeSet,
    /// `{urn:ietf:params:xml:ns:caldav}schedule-inbox-URL`
    ScheduleInboxUrl,
    /// `{urn:ietf:params:xml:ns:caldav}schedule-default-calendar-URL`
    ScheduleDefaultCalendarUrl,
    /// `{urn:ietf:params:xml:ns:caldav}calendar-user-address-set`
    CalendarUserAddressSet,
}

impl DavProperty {
    /// The name of this property, in Clark notation
    pub fn clark_name(&self) -> &'static str {
        match self {
            DavProperty::CalendarHomeSet => "{urn:ietf:params:xml:ns:caldav}calendar-home-set",
            DavProperty::ScheduleInboxUrl => "{urn:ietf:params:xml:ns:caldav}schedule-inbox-URL",
            DavProperty::ScheduleDefaultCalendarUrl => "{urn:ietf:params:xml:ns:caldav}schedule-default-calendar-URL",
            DavProperty::CalendarUserAddressSet => "{urn:ietf:params:xml:ns:caldav}calendar-user-address-set",
        }
    }
}

impl Display for DavProperty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.clark_name())
    }
}


/// What a calendar user address resolves to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// A principal of this server
    Principal(DavPath),
    /// Nobody we know of (or nobody we are allowed to see)
    Unknown,
}

/// Find the principal behind a calendar user address.
///
/// A missing directory, an address that is not a URI, an unmatched address and a denied or failed search all give `Recipient::Unknown`.
pub async fn resolve(directory: Option<&dyn PrincipalDirectory>, address: &CalendarAddress) -> Recipient {
    if address.is_uri() == false {
        log::debug!("{} is not a URI, it cannot match any principal", address);
        return Recipient::Unknown;
    }
    let directory = match directory {
        None => {
            log::debug!("No principal directory to resolve {}", address);
            return Recipient::Unknown;
        },
        Some(d) => d,
    };

    match directory.principal_by_address(address).await {
        Ok(Some(principal)) => {
            log::debug!("{} resolved to principal {}", address, principal);
            Recipient::Principal(principal)
        },
        Ok(None) => {
            log::debug!("No principal matches {}", address);
            Recipient::Unknown
        },
        Err(err) => {
            log::warn!("Unable to resolve {}: {}", address, err);
            Recipient::Unknown
        },
    }
}

/// The calendar user addresses of a principal (its `calendar-user-address-set`)
pub async fn principal_addresses(directory: &dyn PrincipalDirectory, principal: &DavPath) -> Vec<CalendarAddress> {
    match directory.lookup(principal, DavProperty::CalendarUserAddressSet).await {
        PropertyLookup::Found(values) => values.iter()
            .filter_map(CalendarAddress::parse)
            .collect(),
        other => {
            log::debug!("No calendar user address for {} ({:?})", principal, other);
            Vec::new()
        },
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::MemoryDirectory;

    fn address(s: &str) -> CalendarAddress {
        CalendarAddress::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_resolve() {
        let mut directory = MemoryDirectory::new();
        directory.add_principal("principals/alice", &["mailto:alice@example.org"]);

        let found = resolve(Some(&directory), &address("MAILTO:alice@example.org")).await;
        assert_eq!(found, Recipient::Principal(DavPath::new("principals/alice")));

        let unknown = resolve(Some(&directory), &address("mailto:bob@example.org")).await;
        assert_eq!(unknown, Recipient::Unknown);

        let no_directory = resolve(None, &address("mailto:alice@example.org")).await;
        assert_eq!(no_directory, Recipient::Unknown);
    }

    #[tokio::test]
    async fn test_resolve_bare_address() {
        let mut directory = MemoryDirectory::new();
        directory.add_principal("principals/alice", &["mailto:alice@example.org", "alice@example.org"]);

        let bare = resolve(Some(&directory), &address("alice@example.org")).await;
        assert_eq!(bare, Recipient::Unknown);
    }

    #[tokio::test]
    async fn test_denied_search() {
        let mut directory = MemoryDirectory::new();
        directory.add_principal("principals/alice", &["mailto:alice@example.org"]);
        directory.deny_search(true);

        let found = resolve(Some(&directory), &address("mailto:alice@example.org")).await;
        assert_eq!(found, Recipient::Unknown);
    }

    #[tokio::test]
    async fn test_principal_addresses() {
        let mut directory = MemoryDirectory::new();
        directory.add_principal("principals/alice", &["mailto:alice@example.org", "urn:uuid:1234"]);

        let addresses = principal_addresses(&directory, &DavPath::new("principals/alice")).await;
        assert_eq!(addresses, vec![address("mailto:alice@example.org"), address("urn:uuid:1234")]);

        let nobody = principal_addresses(&directory, &DavPath::new("principals/nobody")).await;
        assert!(nobody.is_empty());
    }
}
