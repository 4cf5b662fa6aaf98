//! Scripted in-memory transport for exercising the bank flows offline.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::transport::{Page, Transport, TransportError};

type Outcome = Result<Page, TransportError>;

/// Routes requests by method plus a path substring. Responses for a route are
/// consumed in order; the last one keeps repeating, so an always-`WAITING`
/// poll endpoint needs a single entry.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(&'static str, &'static str), Vec<Outcome>>>,
    log: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(&self, pattern: &'static str, outcome: Outcome) {
        self.routes
            .lock()
            .unwrap()
            .entry(("GET", pattern))
            .or_default()
            .push(outcome);
    }

    pub fn on_post(&self, pattern: &'static str, outcome: Outcome) {
        self.routes
            .lock()
            .unwrap()
            .entry(("POST", pattern))
            .or_default()
            .push(outcome);
    }

    pub fn requests_matching(&self, method: &str, pattern: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p)| m == method && p.contains(pattern))
            .count()
    }

    fn dispatch(&self, method: &'static str, path: &str) -> Outcome {
        self.log
            .lock()
            .unwrap()
            .push((method.to_string(), path.to_string()));

        let mut routes = self.routes.lock().unwrap();
        // The longest matching pattern wins, so a specific "pollingVerification"
        // route shadows a broader "confirmLogin" one.
        let key = routes
            .keys()
            .filter(|(m, pattern)| *m == method && path.contains(pattern))
            .max_by_key(|(_, pattern)| pattern.len())
            .copied();
        let Some(key) = key else {
            return Err(TransportError(format!("unscripted request: {method} {path}")));
        };
        let queue = routes.get_mut(&key).expect("route exists");
        if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue[0].clone()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str) -> Result<Page, TransportError> {
        self.dispatch("GET", path)
    }

    async fn post_form(
        &self,
        path: &str,
        _fields: &[(&str, &str)],
    ) -> Result<Page, TransportError> {
        self.dispatch("POST", path)
    }
}
