impl Environment {
    /// Clones the shared value back out of the boundary. The new handle
    /// joins the same external reference count; nothing shadow-counts.
    pub fn get_shared<T: Any>(&self, name: &str) -> Result<Rc<T>, BridgeError> {
        self.ensure_active()?;
        let token = self.root_handle_token(name)?;
        let heap = self.heap.borrow();
        let slot = heap.get(&token).ok_or_else(|| value_not_found(name))?;
        match &slot.storage {
            SlotStorage::Shared(control) => {
                Rc::clone(control).downcast::<T>().map_err(|_| {
                    BridgeError::new(
                        "VALUE_TYPE_MISMATCH",
                        format!(
                            "Shared value \"{}\" holds \"{}\".",
                            name, slot.meta.type_name
                        ),
                    )
                })
            }
            SlotStorage::Inline(_) | SlotStorage::Borrowed { .. } => Err(BridgeError::new(
                "VALUE_MODE_MISMATCH",
                format!("Value \"{}\" is not held under shared ownership.", name),
            )),
        }
    }

    /// Strong count of the shared control block as observed through the
    /// boundary: external holders plus the boundary's own reference plus
    /// any handles cloned back out.
    pub fn shared_use_count(&self, name: &str) -> Result<usize, BridgeError> {
        self.ensure_active()?;
        let token = self.root_handle_token(name)?;
        let heap = self.heap.borrow();
        let slot = heap.get(&token).ok_or_else(|| value_not_found(name))?;
        match &slot.storage {
            SlotStorage::Shared(control) => Ok(Rc::strong_count(control)),
            SlotStorage::Inline(_) | SlotStorage::Borrowed { .. } => Err(BridgeError::new(
                "VALUE_MODE_MISMATCH",
                format!("Value \"{}\" is not held under shared ownership.", name),
            )),
        }
    }
}
