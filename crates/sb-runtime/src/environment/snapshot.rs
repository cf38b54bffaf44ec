impl Environment {
    /// Diagnostic view of the incarnation at a quiescent point: bound
    /// types, live slots with their modes and reachability, and the root
    /// table's names.
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            incarnation: self.incarnation,
            state: self.state,
            bound_types: self.registry.borrow().bound_types(),
            slots: self.heap.borrow().slot_infos(),
            roots: self.roots.keys().cloned().collect(),
        }
    }
}
