//! Flat unit record: soldiers and vehicles share one struct, told apart by a
//! kind tag and optional crew slots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::content::{UnitKind, UnitTemplate, WeaponTemplate};
use crate::core::error::TransitionError;
use crate::core::types::{Facing, Side, Tick, UnitId, UnitIndex, Vec2};
use crate::orders::order::Order;
use crate::orders::plan::ActivePlan;
use crate::perception::Perception;
use crate::simulation::events::{EventLog, SimEventKind};
use crate::unit::capability::{Capability, CapabilitySet, Condition, ConditionSet};
use crate::unit::state::{check_transition, Behavior, Gesture, Posture};

/// Health pair, `current` in `[0, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Health {
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Remove up to `amount`, returning what was actually removed
    pub fn damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.current);
        self.current -= applied;
        applied
    }

    pub fn is_zero(&self) -> bool {
        self.current == 0
    }
}

/// Rounds in the weapon and in reserve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ammo {
    pub loaded: u32,
    pub magazine: u32,
    pub reserve: u32,
}

impl Ammo {
    pub fn from_weapon(weapon: &WeaponTemplate) -> Self {
        Self {
            loaded: weapon.magazine,
            magazine: weapon.magazine,
            reserve: weapon.reserve,
        }
    }

    /// Take one round out of the magazine
    pub fn consume_round(&mut self) -> bool {
        if self.loaded == 0 {
            return false;
        }
        self.loaded -= 1;
        true
    }

    pub fn can_reload(&self) -> bool {
        self.reserve > 0 && self.loaded < self.magazine
    }

    /// Top up the magazine from reserve
    pub fn refill(&mut self) {
        let wanted = self.magazine - self.loaded;
        let taken = wanted.min(self.reserve);
        self.reserve -= taken;
        self.loaded += taken;
    }
}

/// Movement speeds in world units per tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mobility {
    pub walk: f32,
    pub run: f32,
    pub sneak: f32,
}

/// Membership in a squad; slot 0 is the leader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SquadLink {
    pub leader: UnitIndex,
    pub slot: u8,
}

/// Passenger seats of a vehicle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewSlots {
    pub capacity: u8,
    pub occupants: Vec<UnitIndex>,
}

impl CrewSlots {
    pub fn has_room(&self) -> bool {
        self.occupants.len() < self.capacity as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub side: Side,
    pub template: String,

    pub position: Vec2,
    /// Position at the start of the tick, for render interpolation only
    pub prev_position: Vec2,
    pub facing: Facing,

    pub health: Health,
    pub behavior: Behavior,
    pub gesture: Gesture,
    pub capabilities: CapabilitySet,
    pub conditions: ConditionSet,

    pub orders: VecDeque<Order>,
    pub current_action: Option<ActivePlan>,
    pub perception: Perception,

    pub weapon: Option<WeaponTemplate>,
    pub ammo: Ammo,
    pub mobility: Mobility,
    pub vision_range: f32,

    pub squad: Option<SquadLink>,
    pub crew: Option<CrewSlots>,
    pub mounted_in: Option<UnitIndex>,
    pub died_at: Option<Tick>,
}

impl Unit {
    /// Build a unit from its template. Posture and weapon bits are derived
    /// here; the template is not consulted again.
    pub fn spawn(id: UnitId, template: &UnitTemplate, side: Side, position: Vec2, posture: Posture) -> Self {
        let mut capabilities = template.base_capabilities();
        if template.kind == UnitKind::Soldier {
            capabilities = capabilities.with(posture.capability());
            if posture == Posture::Standing && capabilities.has(Capability::CanMove) {
                capabilities = capabilities.with(Capability::CanSprint);
            }
        }
        let ammo = template.weapon.as_ref().map(Ammo::from_weapon).unwrap_or_default();
        if ammo.loaded > 0 {
            capabilities = capabilities.with(Capability::WeaponLoaded);
        }

        let crew = (template.kind == UnitKind::Vehicle && template.crew_slots > 0).then(|| CrewSlots {
            capacity: template.crew_slots,
            occupants: Vec::new(),
        });

        Self {
            id,
            kind: template.kind,
            side,
            template: template.name.clone(),
            position,
            prev_position: position,
            facing: Facing::default(),
            health: Health::full(template.max_health),
            behavior: Behavior::Idle(posture),
            gesture: Gesture::Idle,
            capabilities,
            conditions: ConditionSet::EMPTY,
            orders: VecDeque::new(),
            current_action: None,
            perception: Perception::default(),
            weapon: template.weapon.clone(),
            ammo,
            mobility: Mobility {
                walk: template.walk_speed,
                run: template.run_speed,
                sneak: template.sneak_speed,
            },
            vision_range: template.vision_range,
            squad: None,
            crew,
            mounted_in: None,
            died_at: None,
        }
    }

    #[inline]
    pub fn has(&self, flag: Capability) -> bool {
        self.capabilities.has(flag)
    }

    #[inline]
    pub fn has_condition(&self, flag: Condition) -> bool {
        self.conditions.has(flag)
    }

    pub fn grant(&mut self, mask: CapabilitySet) {
        self.capabilities = self.capabilities.union(mask);
    }

    pub fn revoke(&mut self, mask: CapabilitySet) {
        self.capabilities = self.capabilities.difference(mask);
    }

    pub fn is_alive(&self) -> bool {
        !self.behavior.is_dead()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted_in.is_some()
    }

    pub fn posture(&self) -> Posture {
        Posture::from_capabilities(self.capabilities)
    }

    /// Change behavior through the legal-transition table.
    ///
    /// On success the exit/enter pair and a `BehaviorChanged` event are
    /// published. Re-entering an identical behavior is a no-op.
    pub fn transition(&mut self, to: Behavior, tick: Tick, events: &mut EventLog) -> Result<(), TransitionError> {
        if self.behavior == to {
            return Ok(());
        }
        check_transition(&self.behavior, &to)?;

        let from = self.behavior.kind();
        let to_kind = to.kind();
        self.behavior = to;

        events.push(tick, SimEventKind::BehaviorExited { unit: self.id, behavior: from });
        events.push(tick, SimEventKind::BehaviorEntered { unit: self.id, behavior: to_kind });
        if from != to_kind {
            events.push(tick, SimEventKind::BehaviorChanged { unit: self.id, from, to: to_kind });
        }
        Ok(())
    }

    /// Replace the gesture, publishing the change
    pub fn set_gesture(&mut self, gesture: Gesture, tick: Tick, events: &mut EventLog) {
        let from = self.gesture.kind();
        self.gesture = gesture;
        let to = gesture.kind();
        if from != to {
            events.push(tick, SimEventKind::GestureChanged { unit: self.id, from, to });
        }
    }

    /// Enter the absorbing Dead state. Ammunition already consumed stays
    /// consumed; everything else the unit was doing is discarded.
    pub fn kill(&mut self, tick: Tick, events: &mut EventLog) {
        if !self.is_alive() {
            return;
        }
        self.set_gesture(Gesture::Idle, tick, events);
        self.health.current = 0;
        self.capabilities = CapabilitySet::EMPTY;
        self.conditions = ConditionSet::EMPTY;
        self.orders.clear();
        self.current_action = None;
        self.perception.visible.clear();
        self.died_at = Some(tick);

        if let Err(err) = self.transition(Behavior::Dead, tick, events) {
            tracing::debug!("Unit {:?} could not enter Dead: {}", self.id, err);
            self.behavior = Behavior::Dead;
        }
        events.push(tick, SimEventKind::UnitDestroyed { unit: self.id });
    }
}
