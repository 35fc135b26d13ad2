//! This crate provides implicit scheduling (RFC 6638) for CalDAV servers.
//!
//! When a calendar object is created, modified or deleted, the attendees (or the organizer) referenced in it must be told
//! about it. This crate plugs into the write pipeline of a server through the hooks of a [`ScheduleAdapter`](lifecycle::ScheduleAdapter):
//! * the change is classified by the [`diff`] module (new invitation, update, cancellation, reply...),
//! * every recipient address is resolved to a principal ([`principal`]), whose inbox is located ([`inbox`]),
//! * an iTIP message ([`itip`]) is written into that inbox by the [`DeliveryBroker`](broker::DeliveryBroker),
//! * the outcome of each delivery is written back as a `SCHEDULE-STATUS` onto the object being stored ([`status`]).
//!
//! The resource tree, the inboxes and the principal directory are abstracted behind the traits of the [`traits`] module.
//! In-memory implementations are available in the [`memory`] module.

pub mod traits;

mod resource;
pub use resource::DavPath;
pub mod collection;
pub use collection::ResourceType;
mod calendar_object;
pub use calendar_object::{CalendarObject, Component, Property, SchedulingObjectError};
mod participant;
pub use participant::{CalendarAddress, Participant, Role};
pub mod ical;

pub mod diff;
pub mod principal;
pub mod inbox;
pub mod itip;
pub mod broker;
pub use broker::DeliveryBroker;
pub mod status;
pub mod lifecycle;
pub use lifecycle::ScheduleAdapter;

pub mod memory;
pub mod mock_behaviour;

pub mod config;
pub mod utils;
