//! Image reference resolution with a per-run cache. Concurrent misses for
//! the same reference coalesce into a single upstream request.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};

use anyhow::{anyhow, Result};

use crate::graph::{Digest, Platform};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub digest: Digest,
    pub platform: Platform,
}

/// Queries the build daemon for the content digest of an image reference.
/// External collaborator; the default CLI wires a daemon-backed impl.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<ResolvedImage>;
}

#[derive(Clone)]
enum Flight {
    InFlight,
    Done(ResolvedImage),
}

/// Cache keyed by image reference. Hits are reused across the run; misses
/// single-flight so identical concurrent lookups produce one request.
#[derive(Default)]
pub struct ResolverCache {
    flights: Mutex<HashMap<String, Flight>>,
    cv: Condvar,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, resolver: &dyn ImageResolver, reference: &str) -> Result<ResolvedImage> {
        let mut flights = self
            .flights
            .lock()
            .map_err(|_| anyhow!("resolver cache poisoned"))?;
        loop {
            match flights.get(reference) {
                Some(Flight::Done(resolved)) => return Ok(resolved.clone()),
                Some(Flight::InFlight) => {
                    flights = self
                        .cv
                        .wait(flights)
                        .map_err(|_| anyhow!("resolver cache poisoned"))?;
                }
                None => break,
            }
        }
        flights.insert(reference.to_string(), Flight::InFlight);
        drop(flights);

        let outcome = resolver.resolve(reference);

        let mut flights = self
            .flights
            .lock()
            .map_err(|_| anyhow!("resolver cache poisoned"))?;
        match &outcome {
            Ok(resolved) => {
                flights.insert(reference.to_string(), Flight::Done(resolved.clone()));
            }
            Err(_) => {
                // leave the slot empty so a later lookup can retry
                flights.remove(reference);
            }
        }
        self.cv.notify_all();
        outcome
    }
}
