// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route template resolution
//!
//! Maps a handler identity to the path template the handler was registered under, so a
//! request to `/user/10` can be labeled `/user/{id}`. Lookups are exact matches on the
//! identity; the concrete request path is never consulted.
//!
//! The table is filled from a [`RouteRegistry`] when it is created and topped up on the
//! first lookup that misses. The registry only grows, so a refresh consumes just the
//! registrations it has not seen yet.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use crate::server::RouteRegistry;

#[derive(Debug, Default)]
struct TableState {
    templates: HashMap<String, String>,
    scanned: usize,
}

/// Handler identity to route template table
#[derive(Debug)]
pub struct RouteTable {
    registry: RouteRegistry,
    state: RwLock<TableState>,
}

impl RouteTable {
    /// Build a table from every route currently in the registry
    pub fn new(registry: RouteRegistry) -> Self {
        let table = Self {
            registry,
            state: RwLock::new(TableState::default()),
        };
        table.refresh();
        table
    }

    /// Template registered for `identity`, without refreshing
    pub fn lookup(&self, identity: &str) -> Option<String> {
        self.read_state().templates.get(identity).cloned()
    }

    /// Template registered for `identity`, refreshing from the registry on a miss
    pub fn resolve(&self, identity: &str) -> Option<String> {
        if let Some(template) = self.lookup(identity) {
            return Some(template);
        }

        // Look again even if this call found nothing new: a concurrent refresh may have
        // added the entry after the first lookup.
        self.refresh();
        self.lookup(identity)
    }

    /// Consume registrations added since the last refresh.
    ///
    /// Returns the number of new registrations. Concurrent callers serialize on the
    /// write lock; only the first one finds anything left to scan.
    pub fn refresh(&self) -> usize {
        if self.registry.len() == self.read_state().scanned {
            return 0;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let added = self.registry.since(state.scanned);

        for route in &added {
            if let Some(previous) = state
                .templates
                .insert(route.handler.clone(), route.path.clone())
            {
                if previous != route.path {
                    warn!(
                        "handler {} registered under both {} and {}, using {}",
                        route.handler, previous, route.path, route.path
                    );
                }
            }
        }

        state.scanned += added.len();

        if !added.is_empty() {
            debug!(
                "route table refreshed: {} new routes, {} handlers known",
                added.len(),
                state.templates.len()
            );
        }

        added.len()
    }

    /// Whether this table reads from the given registry
    pub fn reads_from(&self, registry: &RouteRegistry) -> bool {
        self.registry.same_as(registry)
    }

    /// Number of known handler identities
    pub fn len(&self) -> usize {
        self.read_state().templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TableState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
