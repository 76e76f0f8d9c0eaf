//! Per-tick animation of the solar system.
//!
//! [`Animator::step`] only mutates transforms; rendering is a separate call
//! made by the host loop. Deltas are applied one tick at a time so a run of
//! `n` ticks gives the same transforms however it is chunked.

use crate::system::SolarSystem;

/// Rotation applied per tick, in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDeltas {
    pub cloud_yaw: f32,
    pub moon_pivot_yaw: f32,
    /// Absolute pitch the moon pivot is held at.
    pub moon_pivot_pitch: f32,
    pub camera_pivot_yaw: f32,
    pub galaxy_yaw: f32,
}

impl Default for AnimationDeltas {
    fn default() -> Self {
        Self {
            cloud_yaw: -0.0002,
            moon_pivot_yaw: -0.005,
            moon_pivot_pitch: 0.5,
            camera_pivot_yaw: 0.001,
            galaxy_yaw: 0.0002,
        }
    }
}

/// Drives the scene's rotation fields.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    pub deltas: AnimationDeltas,
    ticks: u64,
}

impl Animator {
    pub fn new(deltas: AnimationDeltas) -> Self {
        Self { deltas, ticks: 0 }
    }

    /// Total ticks applied so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance the scene by `delta_ticks` ticks.
    pub fn step(&mut self, system: &mut SolarSystem, delta_ticks: u32) {
        for _ in 0..delta_ticks {
            self.tick(system);
        }
        self.ticks += u64::from(delta_ticks);
    }

    fn tick(&self, system: &mut SolarSystem) {
        let d = &self.deltas;
        let graph = &mut system.graph;

        if let Some(clouds) = graph.get_mut(system.clouds) {
            clouds.transform.rotation.y += d.cloud_yaw;
        }
        if let Some(pivot) = graph.get_mut(system.moon_pivot) {
            pivot.transform.rotation.y += d.moon_pivot_yaw;
            pivot.transform.rotation.x = d.moon_pivot_pitch;
        }
        if let Some(pivot) = graph.get_mut(system.camera_pivot) {
            pivot.transform.rotation.y += d.camera_pivot_yaw;
        }
        if let Some(galaxy) = graph.get_mut(system.galaxy) {
            galaxy.transform.rotation.y += d.galaxy_yaw;
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::system::{MOON_OFFSET, SceneParams};
    use crate::transform::{Euler, Transform};
    use crate::viewport::Viewport;

    fn build() -> SolarSystem {
        SolarSystem::build(&SceneParams::default(), &Viewport::new(1280, 720, 1.0))
    }

    fn snapshot(s: &SolarSystem) -> Vec<Transform> {
        s.graph.iter().map(|(_, n)| n.transform).collect()
    }

    fn rotation(s: &SolarSystem, id: crate::graph::NodeId) -> Euler {
        s.graph.get(id).unwrap().transform.rotation
    }

    #[test]
    fn test_single_tick_applies_deltas() {
        let mut s = build();
        Animator::default().step(&mut s, 1);

        assert_eq!(rotation(&s, s.clouds).y, -0.0002);
        assert_eq!(rotation(&s, s.moon_pivot), Euler::new(0.5, -0.005, 0.0));
        assert_eq!(rotation(&s, s.camera_pivot).y, 0.001);
        assert_eq!(rotation(&s, s.galaxy).y, 0.0002);
        // Untouched.
        assert_eq!(rotation(&s, s.earth), Euler::ZERO);
        assert_eq!(rotation(&s, s.sun), Euler::ZERO);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let mut a = build();
        let mut b = build();
        Animator::default().step(&mut a, 1000);
        Animator::default().step(&mut b, 1000);
        assert_eq!(snapshot(&a), snapshot(&b));
    }

    #[test]
    fn test_chunking_does_not_change_result() {
        let mut whole = build();
        let mut chunked = build();
        let mut animator = Animator::default();
        Animator::default().step(&mut whole, 240);
        for chunk in [1, 7, 32, 200] {
            animator.step(&mut chunked, chunk);
        }
        assert_eq!(animator.ticks(), 240);
        assert_eq!(snapshot(&whole), snapshot(&chunked));
    }

    #[test]
    fn test_zero_ticks_is_noop() {
        let mut s = build();
        let before = snapshot(&s);
        Animator::default().step(&mut s, 0);
        assert_eq!(before, snapshot(&s));
    }

    #[test]
    fn test_moon_stays_on_orbit_circle() {
        let mut s = build();
        s.graph.get_mut(s.earth).unwrap().transform.rotation = Euler::new(0.3, 1.2, -0.7);
        s.graph.get_mut(s.earth).unwrap().transform.position = Vec3::new(2.0, -1.0, 5.0);
        let radius = MOON_OFFSET.length();
        let mut animator = Animator::default();

        for _ in 0..50 {
            animator.step(&mut s, 25);
            let earth = s.graph.world_position(s.earth);
            let moon = s.graph.world_position(s.moon);
            assert!(((moon - earth).length() - radius).abs() < 1e-4);
        }
    }

    #[test]
    fn test_pivot_yaw_traces_circle_in_pivot_plane() {
        let mut s = build();
        let pivot = s.moon_pivot;
        let offset_in_plane = Vec3::new(MOON_OFFSET.x, 0.0, MOON_OFFSET.z).length();

        for step in 0..16 {
            let theta = step as f32 * std::f32::consts::TAU / 16.0;
            s.graph.get_mut(pivot).unwrap().transform.rotation = Euler::new(0.0, theta, 0.0);
            let moon = s.graph.world_position(s.moon);
            assert!((moon.y - MOON_OFFSET.y).abs() < 1e-5);
            assert!((Vec3::new(moon.x, 0.0, moon.z).length() - offset_in_plane).abs() < 1e-5);
        }
    }
}
