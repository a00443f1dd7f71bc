//! Primitive action catalog
//!
//! Every action declares the capabilities it `requires`, `adds` and
//! `removes`. The table is validated once at load time: each capability is
//! granted by at most one action, and the prerequisite graph has no cycles.
//! Translation never has to guess.

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::types::Vec2;
use crate::unit::capability::{Capability, CapabilitySet};
use crate::unit::state::{Path, Posture};

/// Index into the action table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u16);

/// What the simulation does when it executes an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ChangePosture(Posture),
    Walk,
    Run,
    Sneak,
    Reload,
    Fire,
    Hold,
    TakeCover,
}

impl ActionKind {
    fn label(&self) -> &'static str {
        match self {
            ActionKind::ChangePosture(Posture::Standing) => "change_posture(standing)",
            ActionKind::ChangePosture(Posture::Crouched) => "change_posture(crouched)",
            ActionKind::ChangePosture(Posture::Prone) => "change_posture(prone)",
            ActionKind::Walk => "walk",
            ActionKind::Run => "run",
            ActionKind::Sneak => "sneak",
            ActionKind::Reload => "reload",
            ActionKind::Fire => "fire",
            ActionKind::Hold => "hold",
            ActionKind::TakeCover => "take_cover",
        }
    }
}

/// Action kinds the engine needs to translate every order type
const REQUIRED_KINDS: [ActionKind; 10] = [
    ActionKind::ChangePosture(Posture::Standing),
    ActionKind::ChangePosture(Posture::Crouched),
    ActionKind::ChangePosture(Posture::Prone),
    ActionKind::Walk,
    ActionKind::Run,
    ActionKind::Sneak,
    ActionKind::Reload,
    ActionKind::Fire,
    ActionKind::Hold,
    ActionKind::TakeCover,
];

/// Authored form of an action, as it appears in content files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub kind: ActionKind,
    #[serde(default)]
    pub requires: Vec<Capability>,
    #[serde(default)]
    pub adds: Vec<Capability>,
    #[serde(default)]
    pub removes: Vec<Capability>,
    /// Gesture length for posture changes; weapon actions take theirs from the weapon
    #[serde(default)]
    pub duration_ticks: u64,
}

/// A validated action definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,
    pub kind: ActionKind,
    pub requires: CapabilitySet,
    pub adds: CapabilitySet,
    pub removes: CapabilitySet,
    pub duration_ticks: u64,
}

impl ActionDef {
    pub fn from_spec(spec: &ActionSpec) -> Self {
        Self {
            name: spec.name.clone(),
            kind: spec.kind,
            requires: spec.requires.iter().copied().collect(),
            adds: spec.adds.iter().copied().collect(),
            removes: spec.removes.iter().copied().collect(),
            duration_ticks: spec.duration_ticks,
        }
    }

    /// Capability snapshot after this action has executed
    pub fn effect_on(&self, caps: CapabilitySet) -> CapabilitySet {
        caps.apply(self.adds, self.removes)
    }
}

/// Where an action is aimed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionTarget {
    None,
    Path(Path),
    Position(Vec2),
    Unit(crate::core::types::UnitIndex),
}

/// One step of a translated order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveAction {
    pub action: ActionId,
    pub kind: ActionKind,
    pub target: ActionTarget,
}

/// Validated, injective action catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTable {
    actions: Vec<ActionDef>,
    /// `granters[bit]` is the unique action whose `adds` contains `bit`
    granters: Vec<Option<ActionId>>,
}

impl ActionTable {
    /// Build and validate a table. Any ambiguity or cycle is fatal here so
    /// that it can never surface during a match.
    pub fn new(specs: &[ActionSpec]) -> Result<Self, ConfigError> {
        let actions: Vec<ActionDef> = specs.iter().map(ActionDef::from_spec).collect();

        for (i, def) in actions.iter().enumerate() {
            if actions[..i].iter().any(|other| other.name == def.name) {
                return Err(ConfigError::DuplicateAction(def.name.clone()));
            }
            if def.adds.intersects(def.removes) {
                return Err(ConfigError::SelfContradictoryAction(def.name.clone()));
            }
        }

        let mut granters: Vec<Option<ActionId>> = vec![None; 64];
        for bit in 0..64u8 {
            let mask = CapabilitySet::from_bits(1u64 << bit);
            let granting: Vec<usize> = actions
                .iter()
                .enumerate()
                .filter(|(_, def)| def.adds.intersects(mask))
                .map(|(i, _)| i)
                .collect();

            match granting.as_slice() {
                [] => {}
                [only] => granters[bit as usize] = Some(ActionId(*only as u16)),
                many => {
                    if let Some(capability) = Capability::from_bit(bit) {
                        return Err(ConfigError::AmbiguousGrant {
                            capability,
                            actions: many.iter().map(|&i| actions[i].name.clone()).collect(),
                        });
                    }
                }
            }
        }

        let table = Self { actions, granters };
        table.check_cycles()?;

        for kind in REQUIRED_KINDS {
            if table.find_kind(kind).is_none() {
                return Err(ConfigError::MissingActionKind(kind.label()));
            }
        }

        tracing::info!("Action table validated: {} actions", table.actions.len());
        Ok(table)
    }

    /// Depth-first search over action -> granter-of-required-bit edges
    fn check_cycles(&self) -> Result<(), ConfigError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(
            table: &ActionTable,
            node: usize,
            marks: &mut [Mark],
            stack: &mut Vec<usize>,
        ) -> Result<(), ConfigError> {
            marks[node] = Mark::InProgress;
            stack.push(node);

            let mut requires = table.actions[node].requires;
            while let Some(bit) = requires.lowest_bit() {
                requires = requires.difference(CapabilitySet::from_bits(1u64 << bit));
                let Some(next) = table.granters[bit as usize] else {
                    continue;
                };
                let next = next.0 as usize;
                match marks[next] {
                    Mark::InProgress => {
                        let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                        let mut names: Vec<String> =
                            stack[start..].iter().map(|&n| table.actions[n].name.clone()).collect();
                        names.push(table.actions[next].name.clone());
                        return Err(ConfigError::PrerequisiteCycle(names));
                    }
                    Mark::Unvisited => visit(table, next, marks, stack)?,
                    Mark::Done => {}
                }
            }

            stack.pop();
            marks[node] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; self.actions.len()];
        let mut stack = Vec::new();
        for node in 0..self.actions.len() {
            if marks[node] == Mark::Unvisited {
                visit(self, node, &mut marks, &mut stack)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionDef> {
        self.actions.get(id.0 as usize)
    }

    /// The single action granting `bit`, if any
    pub fn granter_of(&self, bit: u8) -> Option<ActionId> {
        self.granters.get(bit as usize).copied().flatten()
    }

    pub fn find_kind(&self, kind: ActionKind) -> Option<ActionId> {
        self.actions
            .iter()
            .position(|def| def.kind == kind)
            .map(|i| ActionId(i as u16))
    }

    pub fn find_name(&self, name: &str) -> Option<ActionId> {
        self.actions
            .iter()
            .position(|def| def.name == name)
            .map(|i| ActionId(i as u16))
    }

    pub fn posture_action(&self, posture: Posture) -> Option<ActionId> {
        self.find_kind(ActionKind::ChangePosture(posture))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;

    fn spec(name: &str, kind: ActionKind, requires: &[Capability], adds: &[Capability]) -> ActionSpec {
        ActionSpec {
            name: name.into(),
            kind,
            requires: requires.to_vec(),
            adds: adds.to_vec(),
            removes: vec![],
            duration_ticks: 1,
        }
    }

    fn minimal_specs() -> Vec<ActionSpec> {
        use Capability::*;
        vec![
            spec("stand", ActionKind::ChangePosture(Posture::Standing), &[CanMove], &[IsStanding, CanSprint]),
            spec("crouch", ActionKind::ChangePosture(Posture::Crouched), &[CanMove], &[IsCrouched]),
            spec("prone", ActionKind::ChangePosture(Posture::Prone), &[], &[IsProne]),
            spec("walk", ActionKind::Walk, &[CanMove], &[]),
            spec("run", ActionKind::Run, &[CanMove, CanSprint], &[]),
            spec("sneak", ActionKind::Sneak, &[CanMove, IsCrouched], &[]),
            spec("reload", ActionKind::Reload, &[CanFire], &[WeaponLoaded]),
            spec("fire", ActionKind::Fire, &[CanFire, WeaponLoaded], &[]),
            spec("hold", ActionKind::Hold, &[], &[]),
            spec("cover", ActionKind::TakeCover, &[IsProne], &[Concealed]),
        ]
    }

    #[test]
    fn test_minimal_table_validates() {
        let table = ActionTable::new(&minimal_specs()).unwrap();
        assert_eq!(table.len(), 10);
        assert_eq!(table.granter_of(Capability::CanSprint.bit()), table.find_name("stand"));
        assert_eq!(table.granter_of(Capability::CanMove.bit()), None);
    }

    #[test]
    fn test_ambiguous_grant_rejected() {
        let mut specs = minimal_specs();
        specs.push(spec("sprint_drill", ActionKind::Hold, &[], &[Capability::CanSprint]));

        let err = ActionTable::new(&specs).unwrap_err();
        match err {
            ConfigError::AmbiguousGrant { capability, actions } => {
                assert_eq!(capability, Capability::CanSprint);
                assert_eq!(actions, vec!["stand".to_string(), "sprint_drill".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_cycle_rejected_at_load() {
        use Capability::*;
        let mut specs = minimal_specs();
        // stand now needs to be crouched, crouch needs to be standing
        specs[0].requires = vec![CanMove, IsCrouched];
        specs[1].requires = vec![CanMove, IsStanding];

        let err = ActionTable::new(&specs).unwrap_err();
        assert!(matches!(err, ConfigError::PrerequisiteCycle(_)));
    }

    #[test]
    fn test_self_requirement_is_a_cycle() {
        let mut specs = minimal_specs();
        specs[6].requires = vec![Capability::CanFire, Capability::WeaponLoaded];
        assert!(matches!(
            ActionTable::new(&specs),
            Err(ConfigError::PrerequisiteCycle(_))
        ));
    }

    #[test]
    fn test_contradictory_action_rejected() {
        let mut specs = minimal_specs();
        specs[8].adds = vec![Capability::Concealed];
        specs[8].removes = vec![Capability::Concealed];
        specs[9].adds = vec![];
        assert!(matches!(
            ActionTable::new(&specs),
            Err(ConfigError::SelfContradictoryAction(_))
        ));
    }

    #[test]
    fn test_missing_kind_rejected() {
        let mut specs = minimal_specs();
        specs.retain(|s| s.kind != ActionKind::TakeCover);
        assert!(matches!(
            ActionTable::new(&specs),
            Err(ConfigError::MissingActionKind("take_cover"))
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut specs = minimal_specs();
        specs[3].name = "run".into();
        assert!(matches!(
            ActionTable::new(&specs),
            Err(ConfigError::DuplicateAction(_))
        ));
    }

    #[test]
    fn test_standard_content_table() {
        let content = Content::standard().unwrap();
        let stand = content.actions.posture_action(Posture::Standing).unwrap();
        let def = content.actions.get(stand).unwrap();
        assert!(def.adds.has(Capability::CanSprint));
        assert!(def.removes.has(Capability::IsProne));
    }
}
