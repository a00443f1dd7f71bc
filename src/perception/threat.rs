//! Threat intensity
//!
//! Discharges and explosions add threat with inverse-square falloff beyond a
//! reference distance. Threat then decays linearly each tick.

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::{Side, Vec2};

/// Something loud and dangerous happened at `position`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatEvent {
    pub position: Vec2,
    pub magnitude: f32,
    /// Side responsible; its own units are not frightened by it
    pub side: Option<Side>,
}

impl ThreatEvent {
    pub fn new(position: Vec2, magnitude: f32, side: Option<Side>) -> Self {
        Self { position, magnitude, side }
    }

    /// Threat this event adds for a listener of `side` at `listener`
    pub fn contribution(&self, listener: Vec2, side: Side, config: &SimulationConfig) -> f32 {
        if self.side == Some(side) {
            return 0.0;
        }
        let d_sq = self.position.distance_sq(&listener);
        let hearing = config.hearing_radius;
        if d_sq > hearing * hearing {
            return 0.0;
        }
        let reference_sq = config.threat_reference_distance * config.threat_reference_distance;
        self.magnitude * reference_sq / d_sq.max(reference_sq)
    }
}

/// Outcome of one tick of threat accumulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreatUpdate {
    pub intensity: f32,
    /// Position of the loudest event heard this tick, if any
    pub loudest: Option<Vec2>,
}

/// Decay first, then add this tick's contributions
pub fn accumulate(current: f32, events: &[ThreatEvent], listener: Vec2, side: Side, config: &SimulationConfig) -> ThreatUpdate {
    let mut intensity = (current - config.threat_decay).max(0.0);
    let mut loudest: Option<(f32, Vec2)> = None;

    for event in events {
        let added = event.contribution(listener, side, config);
        if added <= 0.0 {
            continue;
        }
        intensity += added;
        if loudest.map_or(true, |(best, _)| added > best) {
            loudest = Some((added, event.position));
        }
    }

    ThreatUpdate {
        intensity,
        loudest: loudest.map(|(_, pos)| pos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closer_contributes_more() {
        let config = SimulationConfig::default();
        let event = ThreatEvent::new(Vec2::ZERO, 1.0, None);

        let near = event.contribution(Vec2::new(1.0, 0.0), Side(0), &config);
        let mid = event.contribution(Vec2::new(4.0, 0.0), Side(0), &config);
        let far = event.contribution(Vec2::new(8.0, 0.0), Side(0), &config);

        assert_eq!(near, 1.0);
        assert!((mid - 0.25).abs() < 1e-6);
        assert!((far - 0.0625).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_earshot_and_own_side() {
        let config = SimulationConfig::default();
        let event = ThreatEvent::new(Vec2::ZERO, 5.0, Some(Side(1)));
        assert_eq!(event.contribution(Vec2::new(100.0, 0.0), Side(0), &config), 0.0);
        assert_eq!(event.contribution(Vec2::new(1.0, 0.0), Side(1), &config), 0.0);
    }

    #[test]
    fn test_linear_decay_floors_at_zero() {
        let config = SimulationConfig::default();
        let update = accumulate(0.01, &[], Vec2::ZERO, Side(0), &config);
        assert_eq!(update.intensity, 0.0);
        assert_eq!(update.loudest, None);

        let update = accumulate(1.0, &[], Vec2::ZERO, Side(0), &config);
        assert!((update.intensity - 0.98).abs() < 1e-6);
    }

    #[test]
    fn test_loudest_event_is_reported() {
        let config = SimulationConfig::default();
        let events = [
            ThreatEvent::new(Vec2::new(10.0, 0.0), 1.0, None),
            ThreatEvent::new(Vec2::new(0.0, 3.0), 1.0, None),
        ];
        let update = accumulate(0.0, &events, Vec2::ZERO, Side(0), &config);
        assert_eq!(update.loudest, Some(Vec2::new(0.0, 3.0)));
    }
}
