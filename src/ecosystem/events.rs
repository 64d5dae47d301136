/// Messages emitted by the ecosystem passes.

use bevy::prelude::*;

/// A predator's nearest target changed (including to or from `None`).
#[derive(Event, Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetChanged {
    pub predator: Entity,
    pub previous: Option<Entity>,
    pub target: Option<Entity>,
}
