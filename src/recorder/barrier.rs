use std::collections::BTreeSet;

/// Day-completion barrier across the live fleet.
///
/// Arrivals are tracked by camera name, so a camera reporting twice in one
/// cycle counts once and a camera leaving the fleet mid-cycle takes its
/// arrival with it. The barrier fires when every live camera has arrived,
/// then starts a fresh cycle.
#[derive(Debug, Default)]
pub struct DayBarrier {
    arrived: BTreeSet<String>,
    fired: u64,
}

impl DayBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `camera` as done for this cycle. Returns true when this
    /// arrival completes the cycle.
    pub fn arrive(&mut self, camera: &str, live: &[&str]) -> bool {
        if !live.contains(&camera) {
            return false;
        }
        if !self.arrived.insert(camera.to_string()) {
            return false;
        }
        self.try_fire(live)
    }

    /// Drops a departed camera and re-checks the cycle against the new
    /// live set.
    pub fn forget(&mut self, camera: &str, live: &[&str]) -> bool {
        self.arrived.remove(camera);
        self.retarget(live)
    }

    /// Re-checks the cycle after the live set changed.
    pub fn retarget(&mut self, live: &[&str]) -> bool {
        self.arrived.retain(|name| live.contains(&name.as_str()));
        self.try_fire(live)
    }

    pub fn arrived(&self) -> usize {
        self.arrived.len()
    }

    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    fn try_fire(&mut self, live: &[&str]) -> bool {
        if self.arrived.is_empty() || !live.iter().all(|name| self.arrived.contains(*name)) {
            return false;
        }
        self.arrived.clear();
        self.fired += 1;
        true
    }
}
