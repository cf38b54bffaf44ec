#[derive(Debug)]
pub(crate) struct SlotToken {
    slot: usize,
    incarnation: u64,
}

/// Script-visible face of a boundary slot. Clones travel through the
/// engine inside `Dynamic` values; a slot is reachable exactly while any
/// clone of its token exists outside the heap.
#[derive(Clone)]
pub(crate) struct ScriptHandle {
    token: Rc<SlotToken>,
}

/// Host-side handle returned by `set_value`/`offer_value`. Holding one
/// roots the slot; dropping it hands the value back to the collector.
pub struct BoundValue {
    token: Rc<SlotToken>,
    mode: OwnershipMode,
    type_name: &'static str,
}

impl BoundValue {
    pub fn mode(&self) -> OwnershipMode {
        self.mode
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            token: Rc::clone(&self.token),
        }
    }
}

enum SlotStorage {
    Inline(Box<dyn Any>),
    Borrowed { addr: usize },
    Shared(Rc<dyn Any>),
}

/// Everything a finalizer needs is captured here when the value enters
/// the boundary. Finalization never reads environment state, so a slot
/// outliving its registration context (mid-teardown sweeps, re-entrant
/// collections) still finalizes correctly.
pub(crate) struct BoundSlot {
    token: Rc<SlotToken>,
    mode: OwnershipMode,
    meta: TypeMeta,
    address: usize,
    storage: SlotStorage,
    sink: Rc<dyn InstrumentationSink>,
}

impl BoundSlot {
    fn is_unreachable(&self) -> bool {
        Rc::strong_count(&self.token) == 1
    }

    /// Consumes the slot. Owned storage is destroyed through the concrete
    /// value's own destructor; borrowed storage is left untouched; shared
    /// storage is released, which destroys the target only if this was
    /// the last reference anywhere.
    fn finalize(self) {
        match self.storage {
            SlotStorage::Inline(storage) => {
                self.sink
                    .record_finalization(self.meta.type_name, self.address);
                drop(storage);
            }
            SlotStorage::Borrowed { .. } => {}
            SlotStorage::Shared(control) => {
                drop(control);
            }
        }
    }
}

pub(crate) struct BoundaryHeap {
    incarnation: u64,
    slots: Vec<Option<BoundSlot>>,
    free: Vec<usize>,
    cursor: usize,
    allocations_since_sweep: usize,
    pressure_threshold: usize,
    sweep_batch: usize,
    sink: Rc<dyn InstrumentationSink>,
}

impl BoundaryHeap {
    fn new(
        incarnation: u64,
        sink: Rc<dyn InstrumentationSink>,
        pressure_threshold: usize,
        sweep_batch: usize,
    ) -> Self {
        Self {
            incarnation,
            slots: Vec::new(),
            free: Vec::new(),
            cursor: 0,
            allocations_since_sweep: 0,
            pressure_threshold,
            sweep_batch,
            sink,
        }
    }

    fn allocate(
        &mut self,
        mode: OwnershipMode,
        meta: TypeMeta,
        storage: SlotStorage,
    ) -> Rc<SlotToken> {
        let slot = self.free.pop().unwrap_or_else(|| {
            self.slots.push(None);
            self.slots.len() - 1
        });
        let token = Rc::new(SlotToken {
            slot,
            incarnation: self.incarnation,
        });
        let address = match &storage {
            SlotStorage::Inline(value) => value.as_ref() as *const dyn Any as *const () as usize,
            SlotStorage::Borrowed { addr } => *addr,
            SlotStorage::Shared(control) => Rc::as_ptr(control) as *const () as usize,
        };
        if mode.is_collector_owned() {
            self.sink.record_construction(meta.type_name);
        }
        self.slots[slot] = Some(BoundSlot {
            token: Rc::clone(&token),
            mode,
            meta,
            address,
            storage,
            sink: Rc::clone(&self.sink),
        });
        self.allocations_since_sweep += 1;
        token
    }

    /// One bounded sweep, run implicitly once enough allocations have
    /// happened since the last sweep of any kind.
    fn pressure_sweep(&mut self) -> Vec<BoundSlot> {
        if self.allocations_since_sweep < self.pressure_threshold {
            return Vec::new();
        }
        self.sweep(Some(self.sweep_batch))
    }

    /// Detaches unreachable slots and returns them; the caller finalizes
    /// after releasing its borrow of the heap. `batch` of `None` visits
    /// every slot once.
    fn sweep(&mut self, batch: Option<usize>) -> Vec<BoundSlot> {
        self.allocations_since_sweep = 0;
        let total = self.slots.len();
        if total == 0 {
            return Vec::new();
        }
        let visits = batch.unwrap_or(total).min(total);
        let mut detached = Vec::new();
        for _ in 0..visits {
            let index = self.cursor % total;
            self.cursor = (self.cursor + 1) % total;
            let collectable = self.slots[index]
                .as_ref()
                .map(BoundSlot::is_unreachable)
                .unwrap_or(false);
            if collectable {
                if let Some(slot) = self.slots[index].take() {
                    self.free.push(index);
                    detached.push(slot);
                }
            }
        }
        detached
    }

    /// Teardown path: every remaining slot comes out, reachable or not.
    fn drain(&mut self) -> Vec<BoundSlot> {
        self.free.clear();
        self.cursor = 0;
        self.allocations_since_sweep = 0;
        self.slots.drain(..).flatten().collect()
    }

    fn get(&self, token: &Rc<SlotToken>) -> Option<&BoundSlot> {
        let slot = self.slots.get(token.slot)?.as_ref()?;
        if Rc::ptr_eq(&slot.token, token) {
            Some(slot)
        } else {
            None
        }
    }

    fn live_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn slot_infos(&self) -> Vec<SlotInfo> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                entry.as_ref().map(|slot| SlotInfo {
                    slot: index,
                    mode: slot.mode,
                    type_name: slot.meta.type_name.to_string(),
                    reachable: !slot.is_unreachable(),
                })
            })
            .collect()
    }
}

/// Finalization happens strictly after the slots were detached from the
/// heap, so a finalizer that re-enters the boundary can never observe or
/// re-finalize the slots being destroyed.
pub(crate) fn finalize_slots(slots: Vec<BoundSlot>) -> usize {
    let count = slots.len();
    for slot in slots {
        slot.finalize();
    }
    count
}
