//! Dependency resolution over `depends_on` edges.
//!
//! Holding a permission is not enough to use it: every permission reachable
//! through `depends_on` must be held as well. Resolution is a depth-first walk
//! with an explicit stack, tracking two marker sets:
//!
//! - `visited`: fully expanded nodes, safe to skip.
//! - `on_stack`: nodes currently being expanded. Reaching one again is a cycle.

use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::registry::PermissionRegistry;

impl PermissionRegistry {
    /// Every permission transitively required by `id`, excluding `id` itself.
    ///
    /// The result is a de-duplicated post-order of the walk. Callers must treat
    /// it as a set.
    ///
    /// # Errors
    ///
    /// - `UnknownPermission` if `id` or any visited dependency is unregistered.
    /// - `CircularDependency` naming the node where the cycle closed.
    pub fn resolve_dependencies(&self, id: &str) -> Result<Vec<String>> {
        let inner = self.read();
        let (origin, _) = inner
            .get_key_value(id)
            .ok_or_else(|| CoreError::UnknownPermission(id.to_string()))?;
        let origin = origin.as_str();

        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_stack: HashSet<&str> = HashSet::from([origin]);
        let mut resolved: Vec<String> = Vec::new();

        // (node, index of the next dependency edge to follow)
        let mut stack: Vec<(&str, usize)> = vec![(origin, 0)];

        while let Some(frame) = stack.last_mut() {
            let deps = &inner[frame.0].depends_on;

            if let Some(next) = deps.get(frame.1) {
                frame.1 += 1;
                let next = next.as_str();

                if on_stack.contains(next) {
                    return Err(CoreError::CircularDependency(next.to_string()));
                }
                if visited.contains(next) {
                    continue;
                }
                let (next, _) = inner
                    .get_key_value(next)
                    .ok_or_else(|| CoreError::UnknownPermission(next.to_string()))?;
                on_stack.insert(next.as_str());
                stack.push((next.as_str(), 0));
            } else {
                let Some((node, _)) = stack.pop() else {
                    break;
                };
                on_stack.remove(node);
                visited.insert(node);
                if node != origin {
                    resolved.push(node.to_string());
                }
            }
        }

        Ok(resolved)
    }
}
