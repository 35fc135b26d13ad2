//! Kinds of nodes in the resource tree

use serde::{Deserialize, Serialize};

use bitflags::bitflags;

bitflags! {
    /// The `DAV:resourcetype` of a node
    #[derive(Serialize, Deserialize)]
    pub struct ResourceType: u8 {
        /// Any collection (a node that has children)
        const COLLECTION = 1;
        /// A calendar collection, that contains calendar object resources
        const CALENDAR = 2;
        /// A scheduling inbox, that receives iTIP messages
        const SCHEDULE_INBOX = 4;
        /// A scheduling outbox
        const SCHEDULE_OUTBOX = 8;
        /// A principal
        const PRINCIPAL = 16;
    }
}

impl ResourceType {
    pub fn calendar() -> Self {
        Self::COLLECTION | Self::CALENDAR
    }

    pub fn inbox() -> Self {
        Self::COLLECTION | Self::SCHEDULE_INBOX
    }

    /// Whether writing an object into a collection of this type may trigger scheduling.
    ///
    /// Only calendar collections are, scheduling inboxes and outboxes never are (even if they are flagged as calendars)
    pub fn is_scheduling_capable(&self) -> bool {
        self.contains(Self::CALENDAR)
            && !self.intersects(Self::SCHEDULE_INBOX | Self::SCHEDULE_OUTBOX)
    }
}
