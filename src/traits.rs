//! Interfaces to the parts of the server that scheduling relies on, but does not own
//!
//! Any backend can implement them (see the [`memory`](crate::memory) module for in-memory ones).

use std::error::Error;
use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collection::ResourceType;
use crate::participant::CalendarAddress;
use crate::principal::DavProperty;
use crate::resource::DavPath;

/// The resource tree (collections and calendar objects), as far as the scheduling pipeline reads it
#[async_trait]
pub trait DavTree: Send + Sync {
    /// Returns the resource type of the node at `path`, or `None` in case there is no such node
    async fn resource_type(&self, path: &DavPath) -> Option<ResourceType>;

    /// Returns the current content of the calendar object at `path`, or `None` in case it does not exist
    async fn get_object(&self, path: &DavPath) -> Result<Option<String>, Box<dyn Error + Send + Sync>>;
}

/// Something able to store scheduling messages into inbox collections
#[async_trait]
pub trait InboxSink: Send + Sync {
    /// Create a new object named `name` in `collection`.
    ///
    /// This must never overwrite an existing object, and return [`DepositError::AlreadyExists`] instead.
    async fn deposit(&self, collection: &DavPath, name: &str, data: &str) -> Result<(), DepositError>;
}

/// The principal directory, queried with the access rights of the current request
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Find the principal that owns this calendar user address
    async fn principal_by_address(&self, address: &CalendarAddress) -> Result<Option<DavPath>, LookupError>;

    /// Read a property of a principal
    async fn lookup(&self, principal: &DavPath, property: DavProperty) -> PropertyLookup;
}


/// The result of a property lookup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyLookup {
    /// The property exists. Its values (usually hrefs)
    Found(Vec<String>),
    /// The property does not exist on this principal
    NotFound,
    /// The property exists, but the current user may not see it
    Denied,
    /// The lookup failed with this (HTTP-like) status code
    Failed(u16),
}

impl PropertyLookup {
    /// The first value of a successful lookup, if any
    pub fn first_value(&self) -> Option<&str> {
        match self {
            PropertyLookup::Found(values) => values.iter().map(|v| v.trim()).find(|v| !v.is_empty()),
            _ => None,
        }
    }
}


/// Why an inbox object could not be created
#[derive(Debug)]
pub enum DepositError {
    /// An object with the same name exists already
    AlreadyExists,
    /// Any other storage failure (quota, conflict, I/O...)
    Failed(Box<dyn Error + Send + Sync>),
}

impl Display for DepositError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositError::AlreadyExists => write!(f, "an object with this name exists already"),
            DepositError::Failed(err) => write!(f, "unable to store the object: {}", err),
        }
    }
}

impl Error for DepositError {}


/// Why a principal search failed
#[derive(Debug)]
pub enum LookupError {
    /// The current user is not allowed to search principals
    Denied,
    Backend(Box<dyn Error + Send + Sync>),
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Denied => write!(f, "access to the principal directory was denied"),
            LookupError::Backend(err) => write!(f, "principal directory error: {}", err),
        }
    }
}

impl Error for LookupError {}
