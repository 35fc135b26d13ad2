//! A principal directory that lives in memory

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::participant::CalendarAddress;
use crate::principal::DavProperty;
use crate::resource::DavPath;
use crate::traits::{LookupError, PrincipalDirectory, PropertyLookup};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct PrincipalRecord {
    properties: BTreeMap<DavProperty, PropertyLookup>,
}

impl PrincipalRecord {
    fn addresses(&self) -> impl Iterator<Item = CalendarAddress> + '_ {
        let values: &[String] = match self.properties.get(&DavProperty::CalendarUserAddressSet) {
            Some(PropertyLookup::Found(values)) => values.as_slice(),
            _ => &[],
        };
        values.iter().filter_map(CalendarAddress::parse)
    }
}

/// A principal directory stored in memory
///
/// Every property can be set, denied or removed per principal, which mimics what access control would let the current user see.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDirectory {
    principals: BTreeMap<DavPath, PrincipalRecord>,
    search_denied: bool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize a directory from the content of a valid JSON file.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let directory = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };
        Ok(directory)
    }

    /// Store the current directory into a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let file = match std::fs::File::create(path) {
            Err(err) => {
                return Err(format!("Unable to save file {:?}: {}", path, err).into());
            },
            Ok(f) => f,
        };
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Register a principal and its calendar user addresses
    pub fn add_principal(&mut self, principal: &str, addresses: &[&str]) {
        let addresses = addresses.iter().map(|a| a.to_string()).collect();
        self.set_property(principal, DavProperty::CalendarUserAddressSet, PropertyLookup::Found(addresses));
    }

    /// Set the home, inbox and default calendar hrefs of a principal
    pub fn set_scheduling_urls(&mut self, principal: &str, home: &str, inbox: &str, default_calendar: &str) {
        self.set_property(principal, DavProperty::CalendarHomeSet, PropertyLookup::Found(vec![home.to_string()]));
        self.set_property(principal, DavProperty::ScheduleInboxUrl, PropertyLookup::Found(vec![inbox.to_string()]));
        self.set_property(principal, DavProperty::ScheduleDefaultCalendarUrl, PropertyLookup::Found(vec![default_calendar.to_string()]));
    }

    /// Set what a lookup of `property` returns. This creates the principal if needed
    pub fn set_property(&mut self, principal: &str, property: DavProperty, value: PropertyLookup) {
        self.principals.entry(DavPath::new(principal))
            .or_default()
            .properties
            .insert(property, value);
    }

    /// Make a property invisible to the current user
    pub fn deny_property(&mut self, principal: &str, property: DavProperty) {
        self.set_property(principal, property, PropertyLookup::Denied);
    }

    pub fn remove_property(&mut self, principal: &str, property: DavProperty) {
        if let Some(record) = self.principals.get_mut(&DavPath::new(principal)) {
            record.properties.remove(&property);
        }
    }

    /// Forbid (or allow again) searching principals by address
    pub fn deny_search(&mut self, denied: bool) {
        self.search_denied = denied;
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryDirectory {
    async fn principal_by_address(&self, address: &CalendarAddress) -> Result<Option<DavPath>, LookupError> {
        if self.search_denied {
            return Err(LookupError::Denied);
        }

        let found = self.principals.iter()
            .find(|(_, record)| record.addresses().any(|a| &a == address))
            .map(|(path, _)| path.clone());
        Ok(found)
    }

    async fn lookup(&self, principal: &DavPath, property: DavProperty) -> PropertyLookup {
        self.principals.get(principal)
            .and_then(|record| record.properties.get(&property))
            .cloned()
            .unwrap_or(PropertyLookup::NotFound)
    }
}
