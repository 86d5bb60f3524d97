//! Typed subscriber lists.
//!
//! Every component publishes lifecycle events (channel deleted, burst
//! complete, link ready, ...) through a [`Callbacks`] list so that it never
//! needs to know who is listening. Subscribers are tagged with an [`Owner`]
//! so a feature module can drop all of its subscriptions at once on unload.

use std::borrow::Cow;
use std::fmt;

/// Token identifying who registered a callback, handler or timer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Owner(Cow<'static, str>);

impl Owner {
    /// Owner token for the agent's own core machinery.
    pub const CORE: Owner = Owner(Cow::Borrowed("core"));

    /// Create an owner token.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Owner(name.into())
    }

    /// Name of this owner.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Owner {
    fn from(name: &'static str) -> Self {
        Owner(Cow::Borrowed(name))
    }
}

impl From<String> for Owner {
    fn from(name: String) -> Self {
        Owner(Cow::Owned(name))
    }
}

type Subscriber<E> = Box<dyn FnMut(&E)>;

/// An ordered list of subscribers interested in events of type `E`.
pub struct Callbacks<E: ?Sized> {
    subscribers: Vec<(Owner, Subscriber<E>)>,
}

impl<E: ?Sized> Callbacks<E> {
    /// Empty list.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Add a subscriber; subscribers are notified in registration order.
    pub fn subscribe(&mut self, owner: impl Into<Owner>, callback: impl FnMut(&E) + 'static) {
        self.subscribers.push((owner.into(), Box::new(callback)));
    }

    /// Remove every subscriber registered by `owner`. Returns how many were removed.
    pub fn unsubscribe_owner(&mut self, owner: &Owner) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|(o, _)| o != owner);
        before - self.subscribers.len()
    }

    /// Deliver `event` to every subscriber.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<E: ?Sized> Default for Callbacks<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> fmt::Debug for Callbacks<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
