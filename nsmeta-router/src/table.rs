//! The process-wide routing table (spec §4.2, §5 "Shared resources").
//!
//! EXACT/ALIAS/WELLKNOWN/DOMAIN are plain `parking_lot::RwLock`-guarded
//! `HashMap`s — one lock per map, never a single lock over all four, so an
//! EXACT lookup never blocks on DOMAIN churn. TOPIC keys hold a lock-free
//! copy-on-write set (`arc_swap::ArcSwap<im::HashSet<Route>>`) so `find`
//! never takes a lock on the hot read path; only the map of topic keys
//! itself (adding/removing a *key*, not a subscriber) is lock-guarded.
//! DEFAULT/DUMPSTER are single-slot `ArcSwapOption`s, giving the
//! compare-and-set semantics the spec calls for without a lock.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::RwLock;

use crate::route::{CellAddress, Route, RouteKind};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("duplicate route for kind {0:?}")]
    Duplicate(RouteKind),
    #[error("no such route")]
    NotFound,
}

pub struct RoutingTable {
    exact: RwLock<HashMap<String, Route>>,
    alias: RwLock<HashMap<String, Route>>,
    wellknown: RwLock<HashMap<String, Route>>,
    domain: RwLock<HashMap<String, Route>>,
    topics: RwLock<HashMap<String, Arc<ArcSwap<im::HashSet<Route>>>>>,
    default_route: ArcSwapOption<Route>,
    dumpster_route: ArcSwapOption<Route>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            exact: RwLock::new(HashMap::new()),
            alias: RwLock::new(HashMap::new()),
            wellknown: RwLock::new(HashMap::new()),
            domain: RwLock::new(HashMap::new()),
            topics: RwLock::new(HashMap::new()),
            default_route: ArcSwapOption::empty(),
            dumpster_route: ArcSwapOption::empty(),
        }
    }

    fn keyed_map(&self, kind: RouteKind) -> &RwLock<HashMap<String, Route>> {
        match kind {
            RouteKind::Exact => &self.exact,
            RouteKind::Alias => &self.alias,
            RouteKind::Wellknown => &self.wellknown,
            RouteKind::Domain => &self.domain,
            RouteKind::Topic | RouteKind::Default | RouteKind::Dumpster => {
                unreachable!("not a single-entry-per-key map")
            }
        }
    }

    /// `add(route)`: rejects a route whose kind+key (kind+gateway, for the
    /// singletons) is already occupied.
    pub fn add(&self, route: Route) -> Result<(), RouterError> {
        match route.kind {
            RouteKind::Exact | RouteKind::Alias | RouteKind::Wellknown | RouteKind::Domain => {
                let map = self.keyed_map(route.kind);
                let mut guard = map.write();
                if guard.contains_key(&route.key) {
                    return Err(RouterError::Duplicate(route.kind));
                }
                guard.insert(route.key.clone(), route);
                Ok(())
            }
            RouteKind::Topic => self.add_topic(route),
            RouteKind::Default => Self::cas_singleton(&self.default_route, route, RouteKind::Default),
            RouteKind::Dumpster => {
                Self::cas_singleton(&self.dumpster_route, route, RouteKind::Dumpster)
            }
        }
    }

    fn add_topic(&self, route: Route) -> Result<(), RouterError> {
        let slot = {
            let mut guard = self.topics.write();
            guard
                .entry(route.key.clone())
                .or_insert_with(|| Arc::new(ArcSwap::from_pointee(im::HashSet::new())))
                .clone()
        };

        let mut rejected = false;
        slot.rcu(|current| {
            if current.contains(&route) {
                rejected = true;
                current.clone()
            } else {
                Arc::new(current.update(route.clone()))
            }
        });

        if rejected {
            Err(RouterError::Duplicate(RouteKind::Topic))
        } else {
            Ok(())
        }
    }

    fn cas_singleton(
        slot: &ArcSwapOption<Route>,
        route: Route,
        kind: RouteKind,
    ) -> Result<(), RouterError> {
        let new = Arc::new(route);
        let prev = slot.compare_and_swap(&Option::<Arc<Route>>::None, Some(new));
        if prev.is_some() {
            Err(RouterError::Duplicate(kind))
        } else {
            Ok(())
        }
    }

    /// `delete(route)`: the symmetric removal. Errors with `NotFound` if the
    /// exact route (kind, key, gateway) is not present.
    pub fn delete(&self, route: &Route) -> Result<(), RouterError> {
        match route.kind {
            RouteKind::Exact | RouteKind::Alias | RouteKind::Wellknown | RouteKind::Domain => {
                let map = self.keyed_map(route.kind);
                let mut guard = map.write();
                match guard.get(&route.key) {
                    Some(existing) if existing.gateway == route.gateway => {
                        guard.remove(&route.key);
                        Ok(())
                    }
                    _ => Err(RouterError::NotFound),
                }
            }
            RouteKind::Topic => self.delete_topic(route),
            RouteKind::Default => Self::delete_singleton(&self.default_route, route),
            RouteKind::Dumpster => Self::delete_singleton(&self.dumpster_route, route),
        }
    }

    fn delete_topic(&self, route: &Route) -> Result<(), RouterError> {
        let slot = {
            let guard = self.topics.read();
            guard.get(&route.key).cloned()
        };
        let Some(slot) = slot else {
            return Err(RouterError::NotFound);
        };

        let mut removed = false;
        slot.rcu(|current| {
            if current.contains(route) {
                removed = true;
                Arc::new(current.without(route))
            } else {
                current.clone()
            }
        });

        if removed {
            Ok(())
        } else {
            Err(RouterError::NotFound)
        }
    }

    fn delete_singleton(slot: &ArcSwapOption<Route>, route: &Route) -> Result<(), RouterError> {
        let current = slot.load_full();
        match current {
            Some(existing) if existing.gateway == route.gateway => {
                slot.compare_and_swap(&Some(existing), None);
                Ok(())
            }
            _ => Err(RouterError::NotFound),
        }
    }

    /// `delete(addressCore)`: removes every route of any kind whose
    /// `gateway` equals `address`, returning the removed set.
    pub fn delete_by_gateway(&self, address: &str) -> Vec<Route> {
        let mut removed = Vec::new();

        for map in [&self.exact, &self.alias, &self.wellknown, &self.domain] {
            let mut guard = map.write();
            let keys: Vec<String> = guard
                .iter()
                .filter(|(_, r)| r.gateway == address)
                .map(|(k, _)| k.clone())
                .collect();
            for key in keys {
                if let Some(route) = guard.remove(&key) {
                    removed.push(route);
                }
            }
        }

        {
            let guard = self.topics.read();
            for slot in guard.values() {
                let mut taken = Vec::new();
                slot.rcu(|current| {
                    taken.clear();
                    let mut next = current.as_ref().clone();
                    for route in current.iter() {
                        if route.gateway == address {
                            taken.push(route.clone());
                            next = next.without(route);
                        }
                    }
                    Arc::new(next)
                });
                removed.append(&mut taken);
            }
        }

        for slot in [&self.default_route, &self.dumpster_route] {
            let current = slot.load_full();
            if let Some(route) = current {
                if route.gateway == address {
                    slot.compare_and_swap(&Some(route.clone()), None);
                    removed.push((*route).clone());
                }
            }
        }

        removed
    }

    /// `find(address)`: EXACT, then (WELLKNOWN if local else DOMAIN), then
    /// DEFAULT.
    pub fn find(&self, address: &CellAddress) -> Option<Route> {
        let exact_key = Route::key_for(RouteKind::Exact, address);
        if let Some(route) = self.exact.read().get(&exact_key) {
            return Some(route.clone());
        }

        if address.is_local() {
            let key = Route::key_for(RouteKind::Wellknown, address);
            if let Some(route) = self.wellknown.read().get(&key) {
                return Some(route.clone());
            }
        } else {
            let key = Route::key_for(RouteKind::Domain, address);
            if let Some(route) = self.domain.read().get(&key) {
                return Some(route.clone());
            }
        }

        self.default_route.load_full().map(|r| (*r).clone())
    }

    /// `findTopicRoutes(address)`: the topic set for `address.cell`, but
    /// only when `address` is addressed to the local domain.
    pub fn find_topic_routes(&self, address: &CellAddress) -> im::HashSet<Route> {
        if !address.is_local() {
            return im::HashSet::new();
        }
        let slot = {
            let guard = self.topics.read();
            guard.get(&address.cell).cloned()
        };
        match slot {
            Some(slot) => (**slot.load()).clone(),
            None => im::HashSet::new(),
        }
    }

    /// `getRoutingList`: every route currently registered, gathered by
    /// acquiring each map's lock in turn. Not a globally consistent
    /// snapshot across maps (spec §4.2 "Concurrency").
    pub fn routing_list(&self) -> Vec<Route> {
        let mut all = Vec::new();
        for map in [&self.exact, &self.alias, &self.wellknown, &self.domain] {
            all.extend(map.read().values().cloned());
        }
        for slot in self.topics.read().values() {
            all.extend(slot.load().iter().cloned());
        }
        if let Some(r) = self.default_route.load_full() {
            all.push((*r).clone());
        }
        if let Some(r) = self.dumpster_route.load_full() {
            all.push((*r).clone());
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(kind: RouteKind, key: &str, gateway: &str) -> Route {
        Route::new(kind, key, gateway)
    }

    #[test]
    fn routing_priority_prefers_exact_then_domain_then_default() {
        let table = RoutingTable::new();
        table.add(route(RouteKind::Exact, "foo@d1", "gw1")).unwrap();
        table.add(route(RouteKind::Domain, "d1", "gw2")).unwrap();
        table.add(route(RouteKind::Default, "", "gw3")).unwrap();

        assert_eq!(table.find(&"foo@d1".parse().unwrap()).unwrap().gateway, "gw1");
        assert_eq!(table.find(&"bar@d1".parse().unwrap()).unwrap().gateway, "gw2");
        assert_eq!(table.find(&"bar@d2".parse().unwrap()).unwrap().gateway, "gw3");
    }

    #[test]
    fn topic_routes_are_multi_subscriber_and_local_only() {
        let table = RoutingTable::new();
        table.add(route(RouteKind::Topic, "t", "gwA")).unwrap();
        table.add(route(RouteKind::Topic, "t", "gwB")).unwrap();

        let local = table.find_topic_routes(&"t@local".parse().unwrap());
        assert_eq!(local.len(), 2);

        let remote = table.find_topic_routes(&"t@d1".parse().unwrap());
        assert!(remote.is_empty());
    }

    #[test]
    fn duplicate_exact_route_is_rejected() {
        let table = RoutingTable::new();
        table.add(route(RouteKind::Exact, "foo@d1", "gw1")).unwrap();
        let err = table.add(route(RouteKind::Exact, "foo@d1", "gw1")).unwrap_err();
        assert!(matches!(err, RouterError::Duplicate(RouteKind::Exact)));
    }

    #[test]
    fn default_singleton_rejects_second_add() {
        let table = RoutingTable::new();
        table.add(route(RouteKind::Default, "", "gw1")).unwrap();
        let err = table.add(route(RouteKind::Default, "", "gw2")).unwrap_err();
        assert!(matches!(err, RouterError::Duplicate(RouteKind::Default)));
    }

    #[test]
    fn delete_by_gateway_sweeps_every_kind() {
        let table = RoutingTable::new();
        table.add(route(RouteKind::Exact, "foo@d1", "gw1")).unwrap();
        table.add(route(RouteKind::Topic, "t", "gw1")).unwrap();
        table.add(route(RouteKind::Default, "", "gw1")).unwrap();

        let removed = table.delete_by_gateway("gw1");
        assert_eq!(removed.len(), 3);
        assert!(table.find(&"foo@d1".parse().unwrap()).is_none());
        assert!(table.find_topic_routes(&"t@local".parse().unwrap()).is_empty());
    }
}
