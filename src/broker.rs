//! Delivery of iTIP messages into the inboxes of the recipients

use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::calendar_object::CalendarObject;
use crate::config::SchedulingSettings;
use crate::inbox::{self, LocateFailure};
use crate::itip::{self, MessageKind};
use crate::participant::{CalendarAddress, Role};
use crate::principal::{self, Recipient};
use crate::resource::DavPath;
use crate::status::ScheduleStatus;
use crate::traits::{DepositError, InboxSink, PrincipalDirectory};

/// Why a message could not be delivered to a known (or at least well-formed) recipient
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Undeliverable {
    /// Scheduling is disabled: there is nowhere to write messages to
    NoDeliverySink,
    /// There is no way to resolve addresses
    NoDirectory,
    Locate(LocateFailure),
    /// Every object name that was tried already existed in the inbox
    NameExhausted,
    WriteFailed(String),
}

impl Display for Undeliverable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Undeliverable::NoDeliverySink => write!(f, "no delivery sink is configured"),
            Undeliverable::NoDirectory => write!(f, "no principal directory is configured"),
            Undeliverable::Locate(failure) => write!(f, "{}", failure),
            Undeliverable::NameExhausted => write!(f, "unable to find a free object name in the inbox"),
            Undeliverable::WriteFailed(msg) => write!(f, "unable to write into the inbox: {}", msg),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The message is now stored at `object`
    Delivered { object: DavPath },
    RecipientNotFound,
    CannotDeliver(Undeliverable),
}

impl DeliveryOutcome {
    pub fn status(&self) -> ScheduleStatus {
        ScheduleStatus::from(self)
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

impl Display for DeliveryOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryOutcome::Delivered { object } => write!(f, "delivered to {}", object),
            DeliveryOutcome::RecipientNotFound => write!(f, "recipient not found"),
            DeliveryOutcome::CannotDeliver(reason) => write!(f, "cannot deliver ({})", reason),
        }
    }
}

/// What happened to one recipient of a change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReport {
    pub address: CalendarAddress,
    /// The entry of the triggering document this recipient matches
    pub role: Role,
    pub kind: MessageKind,
    pub outcome: DeliveryOutcome,
}


/// Writes iTIP messages into inboxes
///
/// The directory and the sink can be swapped (or removed) at any time. Each delivery reads the current ones.
pub struct DeliveryBroker {
    directory: RwLock<Option<Arc<dyn PrincipalDirectory>>>,
    sink: RwLock<Option<Arc<dyn InboxSink>>>,
    settings: SchedulingSettings,
}

impl DeliveryBroker {
    /// A broker with neither directory nor sink (every delivery fails until they are set)
    pub fn new(settings: SchedulingSettings) -> Self {
        Self {
            directory: RwLock::new(None),
            sink: RwLock::new(None),
            settings,
        }
    }

    pub fn with_directory(self, directory: Arc<dyn PrincipalDirectory>) -> Self {
        self.set_directory(Some(directory));
        self
    }

    pub fn with_sink(self, sink: Arc<dyn InboxSink>) -> Self {
        self.set_sink(Some(sink));
        self
    }

    pub fn set_directory(&self, directory: Option<Arc<dyn PrincipalDirectory>>) {
        *self.directory.write().unwrap_or_else(PoisonError::into_inner) = directory;
    }

    pub fn set_sink(&self, sink: Option<Arc<dyn InboxSink>>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    pub fn directory(&self) -> Option<Arc<dyn PrincipalDirectory>> {
        self.directory.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn sink(&self) -> Option<Arc<dyn InboxSink>> {
        self.sink.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn settings(&self) -> &SchedulingSettings {
        &self.settings
    }

    /// Send `source` from `originator` to `recipient`, as a `kind` message.
    ///
    /// This never fails: every problem is reported in the outcome.
    pub async fn deliver(&self, kind: MessageKind, originator: &CalendarAddress, recipient: &CalendarAddress, source: &CalendarObject) -> DeliveryOutcome {
        let sink = match self.sink() {
            None => {
                log::warn!("Not delivering a {} to {}: scheduling is disabled", kind, recipient);
                return DeliveryOutcome::CannotDeliver(Undeliverable::NoDeliverySink);
            },
            Some(sink) => sink,
        };
        let directory = match self.directory() {
            None => {
                log::warn!("Not delivering a {} to {}: no principal directory", kind, recipient);
                return DeliveryOutcome::CannotDeliver(Undeliverable::NoDirectory);
            },
            Some(directory) => directory,
        };

        let principal = match principal::resolve(Some(&*directory), recipient).await {
            Recipient::Unknown => {
                log::info!("Not delivering a {} to {}: unknown recipient", kind, recipient);
                return DeliveryOutcome::RecipientNotFound;
            },
            Recipient::Principal(principal) => principal,
        };

        let target = match inbox::locate(&*directory, &principal, kind).await {
            Err(failure) => {
                log::warn!("Not delivering a {} to {}: {}", kind, recipient, failure);
                return DeliveryOutcome::CannotDeliver(Undeliverable::Locate(failure));
            },
            Ok(target) => target,
        };

        let message = itip::build_message(kind, source, originator, recipient, &Utc::now());
        let data = message.to_string();

        for _ in 0..self.settings.max_name_attempts.max(1) {
            let name = format!("{}{}", Uuid::new_v4().to_hyphenated(), self.settings.object_extension);
            match sink.deposit(&target.inbox, &name, &data).await {
                Ok(()) => {
                    let object = target.inbox.join(&name);
                    log::info!("Delivered a {} to {} ({})", kind, recipient, object);
                    return DeliveryOutcome::Delivered { object };
                },
                Err(DepositError::AlreadyExists) => {
                    log::debug!("{} already exists in {}, trying another name", name, target.inbox);
                },
                Err(DepositError::Failed(err)) => {
                    log::warn!("Unable to deliver a {} to {}: {}", kind, recipient, err);
                    return DeliveryOutcome::CannotDeliver(Undeliverable::WriteFailed(err.to_string()));
                },
            }
        }

        log::warn!("Unable to deliver a {} to {}: no free name in {}", kind, recipient, target.inbox);
        DeliveryOutcome::CannotDeliver(Undeliverable::NameExhausted)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::collection::ResourceType;
    use crate::memory::{MemoryDirectory, MemoryTree};
    use crate::mock_behaviour::MockBehaviour;

    const INVITE: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:foo\r\n\
DTSTART:20140811T230000Z\r\n\
ORGANIZER:mailto:user1.sabredav@sabredav.org\r\n\
ATTENDEE:mailto:user2.sabredav@sabredav.org\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn address(s: &str) -> CalendarAddress {
        CalendarAddress::parse(s).unwrap()
    }

    fn setup() -> (Arc<MemoryTree>, DeliveryBroker) {
        let _ = env_logger::builder().is_test(true).try_init();

        let tree = Arc::new(MemoryTree::new());
        tree.add_collection("calendars/user2/inbox", ResourceType::inbox());
        tree.add_collection("calendars/user2/cal", ResourceType::calendar());

        let mut directory = MemoryDirectory::new();
        directory.add_principal("principals/user2", &["mailto:user2.sabredav@sabredav.org"]);
        directory.set_scheduling_urls("principals/user2", "/calendars/user2/", "inbox", "cal");

        let broker = DeliveryBroker::new(SchedulingSettings::default())
            .with_directory(Arc::new(directory))
            .with_sink(tree.clone());
        (tree, broker)
    }

    async fn invite(broker: &DeliveryBroker, to: &str) -> DeliveryOutcome {
        let source = crate::ical::parse(INVITE).unwrap();
        broker.deliver(MessageKind::Request, &address("mailto:user1.sabredav@sabredav.org"), &address(to), &source).await
    }

    #[tokio::test]
    async fn test_delivered() {
        let (tree, broker) = setup();
        let outcome = invite(&broker, "mailto:user2.sabredav@sabredav.org").await;

        let object = match &outcome {
            DeliveryOutcome::Delivered { object } => object.clone(),
            other => panic!("Unexpected outcome {:?}", other),
        };
        assert_eq!(outcome.status(), ScheduleStatus::Delivered);
        assert_eq!(object.parent(), Some(DavPath::new("calendars/user2/inbox")));
        assert!(object.name().ends_with(".ics"));

        let content = tree.object(object).unwrap();
        let message = crate::ical::parse(&content).unwrap();
        assert_eq!(message.root().value_of("METHOD"), Some("REQUEST"));
        assert_eq!(tree.children("calendars/user2/inbox").len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let (tree, broker) = setup();
        let outcome = invite(&broker, "mailto:user3.sabredav@sabredav.org").await;
        assert_eq!(outcome, DeliveryOutcome::RecipientNotFound);
        assert_eq!(outcome.status().code(), "3.7");
        assert!(tree.children("calendars/user2/inbox").is_empty());
    }

    #[tokio::test]
    async fn test_reconfiguration() {
        let (tree, broker) = setup();
        let sink = broker.sink();

        broker.set_sink(None);
        let outcome = invite(&broker, "mailto:user2.sabredav@sabredav.org").await;
        assert_eq!(outcome, DeliveryOutcome::CannotDeliver(Undeliverable::NoDeliverySink));

        broker.set_sink(sink);
        let directory = broker.directory();
        broker.set_directory(None);
        let outcome = invite(&broker, "mailto:user2.sabredav@sabredav.org").await;
        assert_eq!(outcome, DeliveryOutcome::CannotDeliver(Undeliverable::NoDirectory));
        assert_eq!(outcome.status().code(), "5.2");

        broker.set_directory(directory);
        assert!(invite(&broker, "mailto:user2.sabredav@sabredav.org").await.is_delivered());
        assert_eq!(tree.children("calendars/user2/inbox").len(), 1);
    }

    #[tokio::test]
    async fn test_name_collisions() {
        let (tree, broker) = setup();
        let attempts = broker.settings().max_name_attempts;

        tree.set_mock_behaviour(MockBehaviour::collide_now(attempts - 1));
        assert!(invite(&broker, "mailto:user2.sabredav@sabredav.org").await.is_delivered());

        tree.set_mock_behaviour(MockBehaviour::collide_now(attempts));
        let outcome = invite(&broker, "mailto:user2.sabredav@sabredav.org").await;
        assert_eq!(outcome, DeliveryOutcome::CannotDeliver(Undeliverable::NameExhausted));
        assert_eq!(tree.children("calendars/user2/inbox").len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure() {
        let (tree, broker) = setup();
        tree.set_mock_behaviour(MockBehaviour::fail_now(1));

        let outcome = invite(&broker, "mailto:user2.sabredav@sabredav.org").await;
        assert!(matches!(outcome, DeliveryOutcome::CannotDeliver(Undeliverable::WriteFailed(_))));
        assert!(tree.children("calendars/user2/inbox").is_empty());
    }
}
