//! Scan lifecycle tracking
//!
//! The scanner filters on the service UUID only and stops at the first match.
//! Each scan gets a generation number so a timer armed for an earlier scan can
//! never end a later one.

use std::time::Duration;

use crate::messages::Effect;
use crate::protocol::VALUE_SERVICE_UUID;

/// Tracks whether a scan is running and which generation it is
#[derive(Debug, Default, Clone)]
pub struct Scanner {
    active: bool,
    generation: u64,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a scan is running
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begin a new scan with a bounded window
    pub fn start(&mut self, window: Duration) -> Vec<Effect> {
        self.active = true;
        self.generation += 1;
        vec![
            Effect::StartScan {
                service: VALUE_SERVICE_UUID,
            },
            Effect::ArmScanTimeout {
                scan: self.generation,
                after: window,
            },
        ]
    }

    /// Stop the scan if one is running
    pub fn stop(&mut self) -> Vec<Effect> {
        if !self.active {
            return Vec::new();
        }
        self.active = false;
        vec![Effect::StopScan, Effect::CancelScanTimeout]
    }

    /// The platform already stopped scanning on its own
    pub fn mark_failed(&mut self) -> Vec<Effect> {
        if !self.active {
            return Vec::new();
        }
        self.active = false;
        vec![Effect::CancelScanTimeout]
    }

    /// Handle timer expiry; returns effects only if it ends the current scan
    pub fn expire(&mut self, scan: u64) -> Option<Vec<Effect>> {
        if !self.active || scan != self.generation {
            return None;
        }
        self.active = false;
        Some(vec![Effect::StopScan])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed_generation(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::ArmScanTimeout { scan, .. } => Some(*scan),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_stale_timer_is_ignored() {
        let mut scanner = Scanner::new();
        let first = armed_generation(&scanner.start(Duration::from_secs(10)));
        scanner.stop();
        let second = armed_generation(&scanner.start(Duration::from_secs(10)));

        assert_ne!(first, second);
        assert!(scanner.expire(first).is_none());
        assert!(scanner.is_active());
        assert_eq!(scanner.expire(second), Some(vec![Effect::StopScan]));
        assert!(!scanner.is_active());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut scanner = Scanner::new();
        assert!(scanner.stop().is_empty());
        scanner.start(Duration::from_secs(1));
        assert_eq!(scanner.stop().len(), 2);
        assert!(scanner.stop().is_empty());
    }
}
