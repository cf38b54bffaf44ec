#[derive(Debug, Clone, PartialEq, Eq)]
enum RootKind {
    Handle,
    Plain,
}

impl Environment {
    /// Admits the offered value and roots it in the environment's root
    /// table under `name`. Re-setting a name drops the previous root; an
    /// orphaned owned value becomes collectable, a borrowed one is simply
    /// forgotten.
    pub fn set_value(&mut self, name: &str, offer: Offer) -> Result<BoundValue, BridgeError> {
        self.ensure_active()?;
        ensure_valid_name(name)?;
        let handle = self.admit(offer)?;
        self.roots
            .insert(name.to_string(), Dynamic::from(handle.handle()));
        self.run_pressure_sweep();
        Ok(handle)
    }

    /// Admits a value without rooting it; only the returned handle keeps
    /// it alive.
    pub fn offer_value(&mut self, offer: Offer) -> Result<BoundValue, BridgeError> {
        self.ensure_active()?;
        let handle = self.admit(offer)?;
        self.run_pressure_sweep();
        Ok(handle)
    }

    /// Roots a plain data value. Plain values are copies all the way
    /// down; the ownership machinery is not involved.
    pub fn set_plain(&mut self, name: &str, value: BridgeValue) -> Result<(), BridgeError> {
        self.ensure_active()?;
        ensure_valid_name(name)?;
        self.roots.insert(name.to_string(), bridge_to_dynamic(&value));
        Ok(())
    }

    fn admit(&mut self, offer: Offer) -> Result<BoundValue, BridgeError> {
        let Offer {
            mode,
            meta,
            declared,
            payload,
        } = offer;

        {
            let mut registry = self.registry.borrow_mut();
            registry.ensure_descriptor(meta);
            if let Some(declared_name) = &declared {
                let declared_id = registry
                    .resolve_name(declared_name)
                    .map(|descriptor| descriptor.meta.type_id)
                    .ok_or_else(|| {
                        BridgeError::new(
                            "VALUE_TYPE_UNBOUND",
                            format!("Declared type \"{}\" is not bound.", declared_name),
                        )
                    })?;
                if !registry.is_same_or_base(meta.type_id, declared_id) {
                    return Err(BridgeError::new(
                        "VALUE_TYPE_MISMATCH",
                        format!(
                            "Value of type \"{}\" cannot be declared as \"{}\".",
                            meta.type_name, declared_name
                        ),
                    ));
                }
            }
        }

        let storage = match payload {
            OfferPayload::Inline(value) => SlotStorage::Inline(value),
            OfferPayload::Borrowed { addr } => SlotStorage::Borrowed { addr },
            OfferPayload::Shared(control) => SlotStorage::Shared(control),
        };
        let token = self.heap.borrow_mut().allocate(mode, meta, storage);
        Ok(BoundValue {
            token,
            mode,
            type_name: meta.type_name,
        })
    }

    fn root_kind(&self, name: &str) -> Result<RootKind, BridgeError> {
        let entry = self
            .roots
            .get(name)
            .ok_or_else(|| value_not_found(name))?;
        if entry.clone().try_cast::<ScriptHandle>().is_some() {
            Ok(RootKind::Handle)
        } else {
            Ok(RootKind::Plain)
        }
    }

    fn root_handle_token(&self, name: &str) -> Result<Rc<SlotToken>, BridgeError> {
        let entry = self
            .roots
            .get(name)
            .ok_or_else(|| value_not_found(name))?;
        let handle = entry.clone().try_cast::<ScriptHandle>().ok_or_else(|| {
            BridgeError::new(
                "VALUE_MODE_MISMATCH",
                format!("Value \"{}\" is not a bound host value.", name),
            )
        })?;
        Ok(handle.token)
    }

    /// Address of the value as the script side aliases it: the boundary
    /// storage itself for owned/copied, the shared target for shared, and
    /// the host object's own address for borrowed modes.
    pub fn get_ref<T: Any>(&self, name: &str) -> Result<*const T, BridgeError> {
        self.ensure_active()?;
        let token = self.root_handle_token(name)?;
        let heap = self.heap.borrow();
        let slot = heap.get(&token).ok_or_else(|| value_not_found(name))?;
        if slot.meta.type_id != TypeId::of::<T>() {
            return Err(BridgeError::new(
                "VALUE_TYPE_MISMATCH",
                format!("Value \"{}\" holds \"{}\".", name, slot.meta.type_name),
            ));
        }
        Ok(slot.address as *const T)
    }

    /// Reads a copy out of boundary-owned or shared storage. Borrowed
    /// values are aliases of host memory the boundary does not own;
    /// retrieve them by address instead.
    pub fn get_cloned<T: Any + Clone>(&self, name: &str) -> Result<T, BridgeError> {
        self.ensure_active()?;
        let token = self.root_handle_token(name)?;
        let heap = self.heap.borrow();
        let slot = heap.get(&token).ok_or_else(|| value_not_found(name))?;
        let mismatch = || {
            BridgeError::new(
                "VALUE_TYPE_MISMATCH",
                format!("Value \"{}\" holds \"{}\".", name, slot.meta.type_name),
            )
        };
        match &slot.storage {
            SlotStorage::Inline(value) => {
                value.downcast_ref::<T>().cloned().ok_or_else(mismatch)
            }
            SlotStorage::Shared(control) => {
                control.downcast_ref::<T>().cloned().ok_or_else(mismatch)
            }
            SlotStorage::Borrowed { .. } => Err(BridgeError::new(
                "VALUE_MODE_MISMATCH",
                format!("Value \"{}\" is borrowed from the host.", name),
            )),
        }
    }

    pub fn get_plain(&self, name: &str) -> Result<BridgeValue, BridgeError> {
        self.ensure_active()?;
        let entry = self
            .roots
            .get(name)
            .ok_or_else(|| value_not_found(name))?;
        if self.root_kind(name)? == RootKind::Handle {
            return Err(BridgeError::new(
                "VALUE_MODE_MISMATCH",
                format!("Value \"{}\" is a bound host value.", name),
            ));
        }
        dynamic_to_bridge(entry.clone())
    }

    pub fn mode_of(&self, name: &str) -> Result<OwnershipMode, BridgeError> {
        self.ensure_active()?;
        let token = self.root_handle_token(name)?;
        let heap = self.heap.borrow();
        let slot = heap.get(&token).ok_or_else(|| value_not_found(name))?;
        Ok(slot.mode)
    }

    /// Unroots a root-table entry. Destruction, if any is due, stays with
    /// the collector.
    pub fn remove(&mut self, name: &str) -> Result<(), BridgeError> {
        self.ensure_active()?;
        self.roots
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| value_not_found(name))
    }

    pub fn is_live(&self, handle: &BoundValue) -> bool {
        handle.token.incarnation == self.incarnation
            && self.heap.borrow().get(&handle.token).is_some()
    }
}

fn value_not_found(name: &str) -> BridgeError {
    BridgeError::new(
        "VALUE_NOT_FOUND",
        format!("Value \"{}\" is not set in this environment.", name),
    )
}
