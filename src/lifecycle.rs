//! Hooks that run implicit scheduling from within the write pipeline of the resource tree
//!
//! The tree calls one of the `before_*` hooks of a [`ScheduleAdapter`] once a write has passed every other check
//! (authentication, access control...), and before it is committed. The hook delivers the iTIP messages the change
//! calls for, and rewrites the content about to be stored so that it carries the scheduling status of every recipient.
//!
//! Hooks never fail: whatever goes wrong is at worst reported as a scheduling status, and the write always proceeds.

use std::sync::Arc;

use crate::broker::{DeliveryBroker, DeliveryReport};
use crate::calendar_object::CalendarObject;
use crate::diff::{self, ChangeKind, DiffContext};
use crate::itip::MessageKind;
use crate::participant::CalendarAddress;
use crate::principal;
use crate::resource::DavPath;
use crate::status;
use crate::traits::DavTree;

/// The HTTP method of the triggering request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Put,
    Delete,
    Move,
    Copy,
    Other,
}

impl From<&str> for Method {
    fn from(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "MOVE" => Method::Move,
            "COPY" => Method::Copy,
            _ => Method::Other,
        }
    }
}

/// What scheduling needs to know about the triggering request
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    principal: Option<DavPath>,
    addresses: Vec<CalendarAddress>,
    headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self { method, principal: None, addresses: Vec::new(), headers: Vec::new() }
    }

    /// Set the authenticated principal
    pub fn with_principal<P: Into<DavPath>>(mut self, principal: P) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Set the calendar user addresses of the authenticated principal, as known to the authentication layer.
    /// Without them, they are looked up in the principal directory of the broker
    pub fn with_addresses<S: AsRef<str>>(mut self, addresses: &[S]) -> Self {
        self.addresses = addresses.iter().filter_map(CalendarAddress::parse).collect();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn method(&self) -> Method                  { self.method }
    pub fn principal(&self) -> Option<&DavPath>     { self.principal.as_ref() }
    pub fn addresses(&self) -> &[CalendarAddress]   { &self.addresses }

    /// The value of a header (names are case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the object is being moved elsewhere (and not really deleted)
    pub fn is_relocation(&self) -> bool {
        self.method == Method::Move
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Intercepted,
    Classified,
    Delivering,
    Committing,
}

/// What a hook did
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineReport {
    /// How the change was classified (`NoOp` when scheduling did not apply)
    pub change: ChangeKind,
    /// Every state the pipeline went through
    pub states: Vec<PipelineState>,
    /// One per recipient, in document order
    pub deliveries: Vec<DeliveryReport>,
    /// Whether the content about to be written has been rewritten
    pub modified: bool,
}

impl PipelineReport {
    fn new() -> Self {
        Self {
            change: ChangeKind::NoOp,
            states: vec![PipelineState::Idle],
            deliveries: Vec::new(),
            modified: false,
        }
    }

    fn enter(&mut self, state: PipelineState) {
        log::trace!("Scheduling pipeline: {:?} -> {:?}", self.states.last(), state);
        self.states.push(state);
    }

    /// Let the triggering write go on
    fn commit(mut self) -> Self {
        self.enter(PipelineState::Committing);
        self.enter(PipelineState::Idle);
        self
    }
}


/// Runs implicit scheduling for writes into a resource tree
pub struct ScheduleAdapter {
    tree: Arc<dyn DavTree>,
    broker: DeliveryBroker,
}

impl ScheduleAdapter {
    pub fn new(tree: Arc<dyn DavTree>, broker: DeliveryBroker) -> Self {
        Self { tree, broker }
    }

    pub fn broker(&self) -> &DeliveryBroker {
        &self.broker
    }

    /// Called before a new object is created at `path`.
    ///
    /// `content` may be rewritten, in which case `modified` is set.
    pub async fn before_create(&self, request: &Request, path: &DavPath, content: &mut String, modified: &mut bool) -> PipelineReport {
        let report = self.run(request, path, false, Some(content)).await;
        *modified |= report.modified;
        report
    }

    /// Called before the existing object at `path` is overwritten. Its current content is read from the tree.
    ///
    /// `content` may be rewritten, in which case `modified` is set.
    pub async fn before_write(&self, request: &Request, path: &DavPath, content: &mut String, modified: &mut bool) -> PipelineReport {
        let report = self.run(request, path, true, Some(content)).await;
        *modified |= report.modified;
        report
    }

    /// Called before the object at `path` is removed from the tree (deleted, or moved away)
    pub async fn before_unbind(&self, request: &Request, path: &DavPath) -> PipelineReport {
        self.run(request, path, true, None).await
    }

    async fn run(&self, request: &Request, path: &DavPath, read_old: bool, content: Option<&mut String>) -> PipelineReport {
        let mut report = PipelineReport::new();
        report.enter(PipelineState::Intercepted);

        if self.applies_to(request, path).await == false {
            return report.commit();
        }

        let old = if read_old {
            match self.tree.get_object(path).await {
                Err(err) => {
                    log::warn!("Unable to read the current version of {}: {}", path, err);
                    return report.commit();
                },
                Ok(None) => None,
                Ok(Some(text)) => match parse_version(&text, path) {
                    None => return report.commit(),
                    Some(obj) => Some(obj),
                },
            }
        } else {
            None
        };
        let new = match content.as_deref() {
            None => None,
            Some(text) => match parse_version(text, path) {
                None => return report.commit(),
                Some(obj) => Some(obj),
            },
        };

        let acting = self.acting_addresses(request).await;
        let mut ctx = DiffContext::new(&acting);
        ctx.relocation = request.is_relocation();
        let classification = match diff::diff(old.as_ref(), new.as_ref(), &ctx) {
            Err(err) => {
                log::warn!("Not scheduling {}: {}", path, err);
                return report.commit();
            },
            Ok(classification) => classification,
        };
        report.change = classification.kind;
        report.enter(PipelineState::Classified);

        let originator = match &classification.originator {
            Some(originator) if classification.is_no_op() == false => originator,
            _ => {
                log::debug!("{} needs no scheduling", path);
                return report.commit();
            },
        };
        log::debug!("{} is a {:?} from {} for {} recipient(s)", path, classification.kind, originator, classification.recipients.len());

        report.enter(PipelineState::Delivering);
        let mut annotated = new.clone();
        for recipient in &classification.recipients {
            let source = match recipient.kind {
                MessageKind::Cancel => old.as_ref().or_else(|| new.as_ref()),
                MessageKind::Request | MessageKind::Reply => new.as_ref().or_else(|| old.as_ref()),
            };
            let source = match source {
                None => continue,
                Some(source) => source,
            };

            let outcome = self.broker.deliver(recipient.kind, originator, &recipient.address, source).await;
            if let Some(document) = annotated.as_mut() {
                *document = status::annotate(document, recipient.role, &recipient.address, outcome.status());
            }
            report.deliveries.push(DeliveryReport {
                address: recipient.address.clone(),
                role: recipient.role,
                kind: recipient.kind,
                outcome,
            });
        }

        if let (Some(content), Some(document)) = (content, annotated) {
            if Some(&document) != new.as_ref() {
                *content = document.to_string();
                report.modified = true;
            }
        }
        report.commit()
    }

    /// Whether scheduling applies to this request at all
    async fn applies_to(&self, request: &Request, path: &DavPath) -> bool {
        let settings = self.broker.settings();
        if request.header(&settings.opt_out_header).map(|v| v.trim()) == Some(settings.opt_out_value.as_str()) {
            log::debug!("Scheduling of {} disabled by the client", path);
            return false;
        }
        if request.is_relocation() {
            log::debug!("{} is being moved, nothing to schedule", path);
            return false;
        }

        let parent = match path.parent() {
            None => return false,
            Some(parent) => parent,
        };
        match self.tree.resource_type(&parent).await {
            Some(t) if t.is_scheduling_capable() => true,
            _ => {
                log::debug!("{} is not a calendar collection, nothing to schedule", parent);
                false
            },
        }
    }

    /// The addresses of the authenticated principal
    async fn acting_addresses(&self, request: &Request) -> Vec<CalendarAddress> {
        if request.addresses().is_empty() == false {
            return request.addresses().to_vec();
        }
        match (request.principal(), self.broker.directory()) {
            (Some(principal), Some(directory)) => principal::principal_addresses(&*directory, principal).await,
            _ => Vec::new(),
        }
    }
}

fn parse_version(text: &str, path: &DavPath) -> Option<CalendarObject> {
    match crate::ical::parse(text) {
        Ok(obj) => Some(obj),
        Err(err) => {
            log::warn!("Not scheduling {}: invalid calendar data ({})", path, err);
            None
        }
    }
}
