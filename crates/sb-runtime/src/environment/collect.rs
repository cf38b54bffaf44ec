impl Environment {
    /// Runs the collector. A non-full collection sweeps one bounded batch
    /// and promises nothing about completeness; `full` sweeps the whole
    /// heap repeatedly until a pass frees nothing, so cascading releases
    /// (a finalized value dropping the last handle to another) are fully
    /// drained before this returns. Returns the number of reclaimed
    /// slots.
    pub fn collect(&mut self, full: bool) -> Result<usize, BridgeError> {
        self.ensure_active()?;
        let mut reclaimed = 0usize;
        loop {
            let batch = if full {
                None
            } else {
                Some(self.heap.borrow().sweep_batch)
            };
            let detached = self.heap.borrow_mut().sweep(batch);
            let freed = finalize_slots(detached);
            reclaimed += freed;
            if !full || freed == 0 {
                break;
            }
        }
        log::debug!(
            "collect(full={}) reclaimed {} slots, {} live",
            full,
            reclaimed,
            self.heap.borrow().live_count()
        );
        Ok(reclaimed)
    }

    /// Implicit collection driven by allocation pressure. Fires from the
    /// same call boundaries the engine's own allocations fire from.
    fn run_pressure_sweep(&mut self) {
        let detached = self.heap.borrow_mut().pressure_sweep();
        if detached.is_empty() {
            return;
        }
        let freed = finalize_slots(detached);
        log::trace!("pressure sweep reclaimed {} slots", freed);
    }
}
