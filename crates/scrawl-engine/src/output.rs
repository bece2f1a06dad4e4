//! Handler output: events for the sender and events for the room.

use scrawl_protocol::{Pid, RoomEvent, ServerEvent};

/// What one handled command produced.
///
/// Every handler returns two ordered lists: events for the originating
/// connection only, and events to fan out to the room (some carrying
/// per-recipient targets, e.g. individually redacted snapshots).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reply {
    pub to_sender: Vec<ServerEvent>,
    pub to_room: Vec<RoomEvent>,
    /// Connections the transport must close after delivery (kicks).
    pub to_close: Vec<Pid>,
}

impl Reply {
    pub fn new() -> Self {
        Reply::default()
    }

    /// Only the sender hears anything.
    pub fn to_sender(event: ServerEvent) -> Self {
        Reply { to_sender: vec![event], ..Reply::default() }
    }

    /// Everyone in the room (sender included) hears the same event.
    pub fn broadcast(event: ServerEvent) -> Self {
        Reply { to_room: vec![RoomEvent::all(event)], ..Reply::default() }
    }

    pub fn push_sender(&mut self, event: ServerEvent) {
        self.to_sender.push(event);
    }

    pub fn push_room(&mut self, event: ServerEvent) {
        self.to_room.push(RoomEvent::all(event));
    }

    pub fn push_targeted(&mut self, targets: Vec<Pid>, event: ServerEvent) {
        self.to_room.push(RoomEvent::only(targets, event));
    }

    /// Prepends clock-generated events so they are observed before the
    /// command's own output.
    pub fn prepend_room(&mut self, events: Vec<RoomEvent>) {
        if !events.is_empty() {
            let mut merged = events;
            merged.append(&mut self.to_room);
            self.to_room = merged;
        }
    }
}
