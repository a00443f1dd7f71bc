//! Orders, the action catalog and the order-to-behavior translator

pub mod actions;
pub mod command;
pub mod formation;
pub mod order;
pub mod plan;
pub mod translator;

pub use actions::{ActionDef, ActionId, ActionKind, ActionSpec, ActionTable, ActionTarget, PrimitiveAction};
pub use command::{Command, ScheduledCommand};
pub use formation::Formation;
pub use order::{Order, OrderPriority, OrderSource, OrderType};
pub use plan::{ActivePlan, Plan, PlanOrigin};
pub use translator::{chain_prerequisites, requirements_for, translate, WorldSnapshot};
