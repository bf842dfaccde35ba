//! Utility functions for the container
//!
//! Bean naming conventions and the dependency graph algorithms shared by the
//! registry and the container.

/// Naming convention utilities for bean names
pub mod naming {
    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// This is the default bean naming strategy, where `ShoppingCart`
    /// becomes `shoppingCart`.
    ///
    /// # Examples
    ///
    /// ```
    /// use beanstalk_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("BookService"), "bookService");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Derives the default bean name for `T`: the last path segment of its
    /// type name, without generic arguments, in camelCase.
    ///
    /// ```
    /// use beanstalk_core::utils::naming::default_bean_name;
    ///
    /// struct BookDao;
    /// assert_eq!(default_bean_name::<BookDao>(), "bookDao");
    /// assert_eq!(default_bean_name::<Vec<BookDao>>(), "vec");
    /// ```
    pub fn default_bean_name<T: ?Sized>() -> String {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let short = base.rsplit("::").next().unwrap_or(base);
        to_camel_case(short)
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use indexmap::{IndexMap, IndexSet};

    /// The chain of beans under construction on one resolution call.
    ///
    /// Each top-level resolution gets its own path, so concurrent resolutions
    /// of unrelated (or even the same prototype) beans never see each other.
    #[derive(Debug, Default)]
    pub struct ResolutionPath {
        in_flight: IndexSet<String>,
    }

    impl ResolutionPath {
        pub fn new() -> Self {
            Self::default()
        }

        /// Marks `name` as being created.
        ///
        /// Returns the cycle, ending with `name` again, if `name` is
        /// already on the path.
        pub fn enter(&mut self, name: &str) -> Result<(), Vec<String>> {
            if let Some(start) = self.in_flight.get_index_of(name) {
                let mut cycle: Vec<String> = self.in_flight.iter().skip(start).cloned().collect();
                cycle.push(name.to_string());
                return Err(cycle);
            }
            self.in_flight.insert(name.to_string());
            Ok(())
        }

        /// Marks `name` as finished. Only the innermost bean can leave.
        pub fn exit(&mut self, name: &str) {
            debug_assert_eq!(self.in_flight.last().map(String::as_str), Some(name));
            self.in_flight.pop();
        }
    }

    /// Finds a cycle in a dependency graph.
    ///
    /// `graph` maps each bean to the beans it depends on. Nodes are visited
    /// in map order, so the reported cycle is deterministic. Edges pointing
    /// at names outside the map are ignored.
    pub fn find_cycle(graph: &IndexMap<String, Vec<String>>) -> Option<Vec<String>> {
        let mut visited = IndexSet::new();
        let mut stack = ResolutionPath::new();

        graph.keys().find_map(|node| {
            if visited.contains(node) {
                None
            } else {
                detect_cycle_dfs(node, graph, &mut visited, &mut stack)
            }
        })
    }

    fn detect_cycle_dfs(
        node: &str,
        graph: &IndexMap<String, Vec<String>>,
        visited: &mut IndexSet<String>,
        stack: &mut ResolutionPath,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        if let Err(cycle) = stack.enter(node) {
            return Some(cycle);
        }

        for dep in graph.get(node).into_iter().flatten() {
            if stack.in_flight.contains(dep) {
                return stack.enter(dep).err();
            }
            if !visited.contains(dep) && graph.contains_key(dep) {
                if let Some(cycle) = detect_cycle_dfs(dep, graph, visited, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.exit(node);
        None
    }

    /// Performs topological sort on dependency graph
    ///
    /// Returns bean names in dependency order (dependencies before
    /// dependents). Among beans that become ready at the same time, map order
    /// is kept. Fails with the offending cycle.
    pub fn topological_sort(
        graph: &IndexMap<String, Vec<String>>,
    ) -> Result<Vec<String>, Vec<String>> {
        if let Some(cycle) = find_cycle(graph) {
            return Err(cycle);
        }

        let mut sorted = IndexSet::with_capacity(graph.len());
        for node in graph.keys() {
            visit_post_order(node, graph, &mut sorted);
        }
        Ok(sorted.into_iter().collect())
    }

    fn visit_post_order(
        node: &str,
        graph: &IndexMap<String, Vec<String>>,
        sorted: &mut IndexSet<String>,
    ) {
        if sorted.contains(node) {
            return;
        }
        for dep in graph.get(node).into_iter().flatten() {
            if graph.contains_key(dep) {
                visit_post_order(dep, graph, sorted);
            }
        }
        sorted.insert(node.to_string());
    }
}
