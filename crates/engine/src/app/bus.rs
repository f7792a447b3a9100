//! Per-frame listener registry.
//!
//! Handlers register a key per channel; the runtime snapshots a channel's list
//! before dispatching it so a handler can unsubscribe itself (or another
//! handler) mid-dispatch without disturbing the iteration.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Tick,
    Render,
    Input,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Tick, Channel::Render, Channel::Input];

    const fn index(self) -> usize {
        match self {
            Channel::Tick => 0,
            Channel::Render => 1,
            Channel::Input => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus<K> {
    listeners: [Vec<K>; 3],
}

impl<K> Default for EventBus<K> {
    fn default() -> Self {
        Self {
            listeners: [Vec::new(), Vec::new(), Vec::new()],
        }
    }
}

impl<K: Copy + PartialEq> EventBus<K> {
    /// Appends `key` to the channel. Returns false if it was already listening.
    pub fn subscribe(&mut self, channel: Channel, key: K) -> bool {
        let list = &mut self.listeners[channel.index()];
        if list.contains(&key) {
            return false;
        }
        list.push(key);
        true
    }

    pub fn unsubscribe(&mut self, channel: Channel, key: K) -> bool {
        let list = &mut self.listeners[channel.index()];
        match list.iter().position(|existing| *existing == key) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe_all(&mut self, key: K) {
        for channel in Channel::ALL {
            self.unsubscribe(channel, key);
        }
    }

    pub fn is_subscribed(&self, channel: Channel, key: K) -> bool {
        self.listeners[channel.index()].contains(&key)
    }

    pub fn snapshot(&self, channel: Channel) -> Vec<K> {
        self.listeners[channel.index()].clone()
    }

    /// Every key listening on any channel, first-seen order.
    pub fn registered(&self) -> Vec<K> {
        let mut keys = Vec::new();
        for list in &self.listeners {
            for key in list {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
        keys
    }
}
