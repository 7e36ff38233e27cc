pub mod scheduler;

use std::collections::{HashMap, HashSet};

use eframe::egui::Pos2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{Link, LinkId, Signal};

/// Frame length the time scale is normalised against (60 fps).
pub const BASELINE_FRAME_MS: f32 = 16.667;
/// Progress per baseline frame for a link with `traffic_speed == 1`.
pub const BASE_SIGNAL_SPEED: f32 = 0.005;
const SPAWN_FACTOR: f32 = 0.5;

pub const MIN_GLOBAL_SPEED: f32 = 0.0;
pub const MAX_GLOBAL_SPEED: f32 = 5.0;

/// Counts from one simulation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub spawned: usize,
    pub finished: usize,
    pub orphaned: usize,
}

/// A signal resolved to a drawable position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSprite<'a> {
    pub pos: Pos2,
    pub link: &'a Link,
}

/// Traffic signals travelling along link paths.
///
/// The simulation never routes; it only reads each link's cached path when
/// positions are requested.
#[derive(Debug)]
pub struct Simulation {
    signals: Vec<Signal>,
    rng: StdRng,
    playing: bool,
    global_speed: f32,
    next_id: u64,
}

impl Simulation {
    pub fn new(seed: u64) -> Self {
        Self {
            signals: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            playing: true,
            global_speed: 1.0,
            next_id: 1,
        }
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Paused simulations neither spawn nor advance.
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn toggle_playing(&mut self) {
        self.playing = !self.playing;
    }

    pub fn global_speed(&self) -> f32 {
        self.global_speed
    }

    pub fn set_global_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.global_speed = speed.clamp(MIN_GLOBAL_SPEED, MAX_GLOBAL_SPEED);
        }
    }

    /// Drop every signal and restart the random stream.
    pub fn reset(&mut self, seed: u64) {
        self.signals.clear();
        self.rng = StdRng::seed_from_u64(seed);
        self.next_id = 1;
    }

    pub fn clear(&mut self) {
        self.signals.clear();
    }

    /// Remove signals travelling on any of `link_ids`.
    pub fn forget_links(&mut self, link_ids: &[LinkId]) {
        if link_ids.is_empty() {
            return;
        }
        let gone: HashSet<&str> = link_ids.iter().map(String::as_str).collect();
        self.signals.retain(|s| !gone.contains(s.link_id.as_str()));
    }

    /// Advance the simulation by `dt_ms` milliseconds.
    ///
    /// Each link gets one spawn draw with probability
    /// `density * 0.5 * global_speed * dt / 16.667`. New and existing
    /// signals then advance together and any that reach the end are removed.
    pub fn tick(&mut self, dt_ms: f32, links: &[Link]) -> TickStats {
        let mut stats = TickStats::default();

        let known: HashSet<&str> = links.iter().map(|l| l.id.as_str()).collect();
        let before = self.signals.len();
        self.signals.retain(|s| known.contains(s.link_id.as_str()));
        stats.orphaned = before - self.signals.len();

        if !self.playing {
            return stats;
        }

        let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        let time_scale = dt / BASELINE_FRAME_MS;

        for link in links {
            let chance = link.traffic_density * SPAWN_FACTOR * self.global_speed * time_scale;
            if self.rng.random::<f32>() < chance {
                self.signals.push(Signal {
                    id: self.next_id,
                    link_id: link.id.clone(),
                    progress: 0.0,
                    speed: BASE_SIGNAL_SPEED * link.traffic_speed,
                });
                self.next_id += 1;
                stats.spawned += 1;
            }
        }

        let step = self.global_speed * time_scale;
        for signal in &mut self.signals {
            signal.progress += signal.speed * step;
        }
        let alive = self.signals.len();
        self.signals.retain(|s| s.progress < 1.0);
        stats.finished = alive - self.signals.len();

        if stats.spawned > 0 || stats.finished > 0 {
            tracing::trace!(
                spawned = stats.spawned,
                finished = stats.finished,
                live = self.signals.len(),
                "simulation tick"
            );
        }
        stats
    }

    /// Positions of every signal whose link currently has a path, sampled at
    /// arclength fraction `progress`.
    pub fn sprites<'a>(&self, links: &'a [Link]) -> Vec<SignalSprite<'a>> {
        let by_id: HashMap<&str, &Link> = links.iter().map(|l| (l.id.as_str(), l)).collect();
        self.signals
            .iter()
            .filter_map(|signal| {
                let link = *by_id.get(signal.link_id.as_str())?;
                let path = link.path.as_ref().filter(|p| !p.is_empty())?;
                Some(SignalSprite {
                    pos: path.point_at_fraction(signal.progress),
                    link,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry;
    use crate::model::LinkStyle;

    fn link(id: &str, density: f32, speed: f32) -> Link {
        Link {
            id: id.to_string(),
            source_id: "a".to_string(),
            target_id: "b".to_string(),
            path: Some(geometry::generate_line_path(
                &[Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0)],
                24.0,
            )),
            traffic_speed: speed,
            traffic_density: density,
            style: LinkStyle::default(),
        }
    }

    fn seeded(link_id: &str, progress: f32, speed: f32) -> Signal {
        Signal {
            id: 0,
            link_id: link_id.to_string(),
            progress,
            speed,
        }
    }

    #[test]
    fn test_certain_spawn_advances_in_same_tick() {
        // Density 2 at one baseline frame gives a spawn chance of 1.
        let links = vec![link("l", 2.0, 1.0)];
        let mut sim = Simulation::new(7);
        let stats = sim.tick(BASELINE_FRAME_MS, &links);
        assert_eq!(stats.spawned, 1);
        assert_eq!(sim.signals().len(), 1);
        let signal = &sim.signals()[0];
        assert!((signal.progress - BASE_SIGNAL_SPEED).abs() < 1e-6);
        assert_eq!(signal.speed, BASE_SIGNAL_SPEED);
    }

    #[test]
    fn test_zero_density_never_spawns() {
        let links = vec![link("l", 0.0, 1.0)];
        let mut sim = Simulation::new(7);
        for _ in 0..1000 {
            sim.tick(100.0, &links);
        }
        assert!(sim.signals().is_empty());
    }

    #[test]
    fn test_progress_is_monotonic_until_removed() {
        let links = vec![link("l", 0.0, 1.0)];
        let mut sim = Simulation::new(1);
        sim.signals.push(seeded("l", 0.0, 0.05));

        let mut last = 0.0;
        let mut ticks = 0;
        while let Some(signal) = sim.signals().first() {
            assert!(signal.progress >= last);
            assert!(signal.progress < 1.0);
            last = signal.progress;
            sim.tick(BASELINE_FRAME_MS, &links);
            ticks += 1;
            assert!(ticks < 100, "signal never finished");
        }
        // 0.05 per frame reaches 1.0 on the twentieth tick.
        assert!((19..=21).contains(&ticks));
    }

    #[test]
    fn test_removed_when_reaching_end() {
        let links = vec![link("l", 0.0, 1.0)];
        let mut sim = Simulation::new(1);
        sim.signals.push(seeded("l", 0.995, 0.01));
        let stats = sim.tick(BASELINE_FRAME_MS, &links);
        assert_eq!(stats.finished, 1);
        assert!(sim.signals().is_empty());
    }

    #[test]
    fn test_zero_global_speed_freezes_and_stops_spawning() {
        let links = vec![link("l", 2.0, 1.0)];
        let mut sim = Simulation::new(1);
        sim.set_global_speed(0.0);
        sim.signals.push(seeded("l", 0.3, 0.01));
        for _ in 0..50 {
            sim.tick(BASELINE_FRAME_MS, &links);
        }
        assert_eq!(sim.signals().len(), 1);
        assert_eq!(sim.signals()[0].progress, 0.3);
    }

    #[test]
    fn test_pause_freezes_signals() {
        let links = vec![link("l", 2.0, 1.0)];
        let mut sim = Simulation::new(1);
        sim.signals.push(seeded("l", 0.3, 0.01));
        sim.set_playing(false);
        let stats = sim.tick(100.0, &links);
        assert_eq!(stats, TickStats::default());
        assert_eq!(sim.signals()[0].progress, 0.3);
        sim.toggle_playing();
        assert!(sim.is_playing());
    }

    #[test]
    fn test_global_speed_is_clamped() {
        let mut sim = Simulation::new(1);
        sim.set_global_speed(12.0);
        assert_eq!(sim.global_speed(), MAX_GLOBAL_SPEED);
        sim.set_global_speed(-1.0);
        assert_eq!(sim.global_speed(), MIN_GLOBAL_SPEED);
        sim.set_global_speed(f32::NAN);
        assert_eq!(sim.global_speed(), MIN_GLOBAL_SPEED);
    }

    #[test]
    fn test_deleted_link_drops_signals() {
        let mut sim = Simulation::new(1);
        sim.signals.push(seeded("gone", 0.2, 0.0));
        sim.signals.push(seeded("kept", 0.2, 0.0));
        let stats = sim.tick(0.0, &[link("kept", 0.0, 1.0)]);
        assert_eq!(stats.orphaned, 1);
        assert_eq!(sim.signals().len(), 1);

        sim.forget_links(&["kept".to_string()]);
        assert!(sim.signals().is_empty());
    }

    #[test]
    fn test_same_seed_same_traffic() {
        let links = vec![link("a", 0.3, 1.0), link("b", 0.1, 2.0)];
        let run = |seed| {
            let mut sim = Simulation::new(seed);
            for _ in 0..200 {
                sim.tick(33.3, &links);
            }
            sim.signals().to_vec()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_sprites_follow_path() {
        let links = vec![link("l", 0.0, 1.0)];
        let mut sim = Simulation::new(1);
        sim.signals.push(seeded("l", 0.25, 0.0));
        sim.signals.push(seeded("missing", 0.5, 0.0));
        let sprites = sim.sprites(&links);
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].pos, Pos2::new(25.0, 0.0));
        assert_eq!(sprites[0].link.id, "l");
    }
}
