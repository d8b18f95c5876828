/// Event bus: synchronous publish/subscribe for session notifications.

use crate::core::generator::GeneratedEncounter;
use crate::core::selection::TagFilter;
use crate::schema::environment::Environment;

/// Something that happened in a session.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    EncounterGenerated(Box<GeneratedEncounter>),
    EncounterCleared,
    EnvironmentChanged(Option<Environment>),
    FiltersChanged(TagFilter),
    HistoryChanged { can_undo: bool, can_redo: bool },
    EncounterSaved { id: uuid::Uuid, title: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EncounterGenerated,
    EncounterCleared,
    EnvironmentChanged,
    FiltersChanged,
    HistoryChanged,
    EncounterSaved,
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::EncounterGenerated(_) => EventKind::EncounterGenerated,
            Self::EncounterCleared => EventKind::EncounterCleared,
            Self::EnvironmentChanged(_) => EventKind::EnvironmentChanged,
            Self::FiltersChanged(_) => EventKind::FiltersChanged,
            Self::HistoryChanged { .. } => EventKind::HistoryChanged,
            Self::EncounterSaved { .. } => EventKind::EncounterSaved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&AppEvent)>;

struct Subscription {
    id: SubscriptionId,
    kind: Option<EventKind>,
    handler: Handler,
}

/// Handlers run synchronously, in subscription order.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event, or to every event with `None`.
    pub fn subscribe<F>(&mut self, kind: Option<EventKind>, handler: F) -> SubscriptionId
    where
        F: FnMut(&AppEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    /// Returns false if the subscription was not found.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver an event; returns how many handlers received it.
    pub fn emit(&mut self, event: &AppEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for sub in &mut self.subscriptions {
            if sub.kind.map_or(true, |k| k == kind) {
                (sub.handler)(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriptions.len())
            .finish()
    }
}
