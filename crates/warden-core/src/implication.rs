//! Implication expansion over `implies` edges.
//!
//! Implication propagates grants forward: holding a coarse permission yields
//! every finer permission it implies, transitively. It is a separate relation
//! from `depends_on`, which is a precondition checked at decision time and
//! never granted automatically.

use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::registry::PermissionRegistry;

impl PermissionRegistry {
    /// Closure of `granted` under `implies`, including the granted IDs.
    ///
    /// Diamonds are fine: each permission is expanded at most once, so work
    /// is bounded by the number of registered permissions.
    ///
    /// # Errors
    ///
    /// `UnknownPermission` if any input or implied ID is unregistered. A grant
    /// that names a missing permission means corrupted data, not a denial.
    pub fn expand_implied<I, S>(&self, granted: I) -> Result<HashSet<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let inner = self.read();
        let mut expanded: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&str> = Vec::new();

        for id in granted {
            let id = id.as_ref();
            let (key, _) = inner
                .get_key_value(id)
                .ok_or_else(|| CoreError::UnknownPermission(id.to_string()))?;
            if !expanded.insert(key.as_str()) {
                continue;
            }
            pending.push(key.as_str());

            while let Some(current) = pending.pop() {
                for implied in &inner[current].implies {
                    let (key, _) = inner
                        .get_key_value(implied.as_str())
                        .ok_or_else(|| CoreError::UnknownPermission(implied.clone()))?;
                    if expanded.insert(key.as_str()) {
                        pending.push(key.as_str());
                    }
                }
            }
        }

        Ok(expanded.into_iter().map(str::to_string).collect())
    }
}
