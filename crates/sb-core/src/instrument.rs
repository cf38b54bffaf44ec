use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// Observability hook for boundary storage events. One construction event
/// fires per owned or copied value entering the boundary; one finalization
/// event fires when the collector (or environment teardown) destroys it.
/// Borrowed and shared values never report either event.
pub trait InstrumentationSink {
    fn record_construction(&self, type_name: &str);
    fn record_finalization(&self, type_name: &str, address: usize);
}

#[derive(Debug, Default)]
pub struct NullSink;

impl InstrumentationSink for NullSink {
    fn record_construction(&self, _type_name: &str) {}
    fn record_finalization(&self, _type_name: &str, _address: usize) {}
}

/// Tallying sink used by tests and diagnostics. Single-threaded interior
/// mutability, matching the boundary's cooperative model.
#[derive(Debug, Default)]
pub struct CountingSink {
    constructions: Cell<usize>,
    finalizations: Cell<usize>,
    constructions_by_type: RefCell<BTreeMap<String, usize>>,
    finalized_addresses: RefCell<Vec<usize>>,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constructions(&self) -> usize {
        self.constructions.get()
    }

    pub fn finalizations(&self) -> usize {
        self.finalizations.get()
    }

    pub fn constructions_for(&self, type_name: &str) -> usize {
        self.constructions_by_type
            .borrow()
            .get(type_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn finalized_addresses(&self) -> Vec<usize> {
        self.finalized_addresses.borrow().clone()
    }

    /// True when any storage address was reported finalized twice. Only
    /// meaningful while every finalized instance was live at the same
    /// time; allocator reuse across separate collections can repeat an
    /// address legitimately.
    pub fn has_duplicate_finalization(&self) -> bool {
        let addresses = self.finalized_addresses.borrow();
        for (index, address) in addresses.iter().enumerate() {
            if addresses[..index].contains(address) {
                return true;
            }
        }
        false
    }
}

impl InstrumentationSink for CountingSink {
    fn record_construction(&self, type_name: &str) {
        self.constructions.set(self.constructions.get() + 1);
        *self
            .constructions_by_type
            .borrow_mut()
            .entry(type_name.to_string())
            .or_insert(0) += 1;
    }

    fn record_finalization(&self, _type_name: &str, address: usize) {
        self.finalizations.set(self.finalizations.get() + 1);
        self.finalized_addresses.borrow_mut().push(address);
    }
}
