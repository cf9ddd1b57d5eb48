//! Fenêtre de validité d'un root device.
//!
//! Un device annonce sa durée de vie (`max-age`) lors de la découverte SSDP.
//! Passé ce délai sans nouvelle annonce, la description est considérée comme
//! périmée. Une nouvelle annonce réarme la fenêtre sans reconstruire l'arbre.

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::errors::DescriptionError;

/// Parse une durée de bail exprimée en secondes entières.
pub fn parse_max_age(max_age: &str) -> Result<Duration, DescriptionError> {
    max_age
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| DescriptionError::InvalidMaxAge(max_age.to_string()))
}

#[derive(Debug, Clone, Copy)]
struct Lease {
    duration: Duration,
    created: Instant,
    created_at: DateTime<Utc>,
}

impl Lease {
    fn starting_now(duration: Duration) -> Self {
        Self {
            duration,
            created: Instant::now(),
            created_at: Utc::now(),
        }
    }
}

/// Durée de validité et instant de création, protégés par un mutex.
#[derive(Debug)]
pub struct ValidityWindow {
    lease: Mutex<Lease>,
}

impl ValidityWindow {
    pub fn new(duration: Duration) -> Self {
        Self {
            lease: Mutex::new(Lease::starting_now(duration)),
        }
    }

    pub fn from_max_age(max_age: &str) -> Result<Self, DescriptionError> {
        Ok(Self::new(parse_max_age(max_age)?))
    }

    /// Temps restant avant péremption, négatif une fois expiré.
    pub fn remaining_time(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.remaining_millis())
    }

    /// Temps restant en millisecondes, négatif une fois expiré.
    pub fn remaining_millis(&self) -> i64 {
        let lease = *self.lease.lock();
        millis(lease.duration) - millis(lease.created.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_millis() <= 0
    }

    /// Réarme la fenêtre : nouvelle durée, création à l'instant présent.
    pub fn reset(&self, duration: Duration) {
        *self.lease.lock() = Lease::starting_now(duration);
    }

    pub fn reset_max_age(&self, max_age: &str) -> Result<(), DescriptionError> {
        self.reset(parse_max_age(max_age)?);
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.lease.lock().duration
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.lease.lock().created_at
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
