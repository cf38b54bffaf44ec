/// Per-type metadata captured from the concrete Rust type at the call
/// site. `size`/`align` describe the inline storage a copied or owned
/// value occupies inside its boundary slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeMeta {
    type_id: TypeId,
    type_name: &'static str,
    size: usize,
    align: usize,
}

impl TypeMeta {
    fn of<T: Any>() -> Self {
        let layout = std::alloc::Layout::new::<T>();
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            size: layout.size(),
            align: layout.align(),
        }
    }
}

#[derive(Debug, Clone)]
struct TypeDescriptor {
    meta: TypeMeta,
    bound_name: Option<String>,
    base: Option<TypeId>,
}

/// One registry per environment incarnation. Descriptors never migrate
/// between incarnations; a fresh environment always starts empty.
#[derive(Debug, Default)]
pub(crate) struct TypeRegistry {
    by_type: HashMap<TypeId, TypeDescriptor>,
    by_name: HashMap<String, TypeId>,
}

impl TypeRegistry {
    /// First contact with a host type creates its descriptor, named or
    /// not. Offering values of unbound types is allowed; `bind` later
    /// upgrades the anonymous descriptor in place.
    fn ensure_descriptor(&mut self, meta: TypeMeta) {
        self.by_type.entry(meta.type_id).or_insert(TypeDescriptor {
            meta,
            bound_name: None,
            base: None,
        });
    }

    fn bind(&mut self, meta: TypeMeta, name: &str, base: Option<TypeId>) -> Result<(), BridgeError> {
        if let Some(existing) = self.by_name.get(name) {
            if *existing != meta.type_id {
                return Err(BridgeError::new(
                    "BIND_TYPE_DUPLICATE",
                    format!("Bound name \"{}\" already refers to another type.", name),
                ));
            }
        }
        if let Some(descriptor) = self.by_type.get(&meta.type_id) {
            if let Some(existing_name) = &descriptor.bound_name {
                if existing_name != name || descriptor.base != base {
                    return Err(BridgeError::new(
                        "BIND_TYPE_CONFLICT",
                        format!(
                            "Type \"{}\" is already bound as \"{}\".",
                            meta.type_name, existing_name
                        ),
                    ));
                }
                return Ok(());
            }
        }

        self.ensure_descriptor(meta);
        let descriptor = self
            .by_type
            .get_mut(&meta.type_id)
            .expect("descriptor was just ensured");
        descriptor.bound_name = Some(name.to_string());
        descriptor.base = base;
        self.by_name.insert(name.to_string(), meta.type_id);
        Ok(())
    }

    fn descriptor(&self, type_id: TypeId) -> Option<&TypeDescriptor> {
        self.by_type.get(&type_id)
    }

    fn resolve_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name
            .get(name)
            .and_then(|type_id| self.by_type.get(type_id))
    }

    fn is_named(&self, type_id: TypeId) -> bool {
        self.by_type
            .get(&type_id)
            .map(|descriptor| descriptor.bound_name.is_some())
            .unwrap_or(false)
    }

    /// Walks the declared base chain from `concrete` looking for
    /// `declared`. Used to validate that a value offered under a base
    /// descriptor actually is an instance of that base.
    fn is_same_or_base(&self, concrete: TypeId, declared: TypeId) -> bool {
        let mut current = Some(concrete);
        while let Some(type_id) = current {
            if type_id == declared {
                return true;
            }
            current = self
                .by_type
                .get(&type_id)
                .and_then(|descriptor| descriptor.base);
        }
        false
    }

    fn bound_types(&self) -> Vec<BoundTypeInfo> {
        let mut out = self
            .by_type
            .values()
            .map(|descriptor| BoundTypeInfo {
                bound_name: descriptor.bound_name.clone(),
                type_name: descriptor.meta.type_name.to_string(),
                size: descriptor.meta.size,
                align: descriptor.meta.align,
                base_type_name: descriptor
                    .base
                    .and_then(|base| self.by_type.get(&base))
                    .map(|base| base.meta.type_name.to_string()),
            })
            .collect::<Vec<_>>();
        out.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        out
    }
}

/// Proof that a type was bound in a specific environment incarnation.
/// Handles from a torn-down incarnation are rejected by any later
/// environment, even one occupying the same storage.
#[derive(Debug, Clone)]
pub struct TypeDescriptorHandle {
    incarnation: u64,
    type_id: TypeId,
    bound_name: String,
}

impl TypeDescriptorHandle {
    pub fn bound_name(&self) -> &str {
        &self.bound_name
    }
}

impl Environment {
    pub fn bind_type<T: Any>(&mut self, name: &str) -> Result<TypeDescriptorHandle, BridgeError> {
        self.bind_type_inner(TypeMeta::of::<T>(), name, None)
    }

    /// Binds `T` while declaring `B` as its base. The base must already be
    /// bound. The link only widens what `T` may be declared as; finalizers
    /// are always resolved from the concrete value, never from the
    /// declared descriptor.
    pub fn bind_type_with_base<T: Any, B: Any>(
        &mut self,
        name: &str,
    ) -> Result<TypeDescriptorHandle, BridgeError> {
        let base_id = TypeId::of::<B>();
        if !self.registry.borrow().is_named(base_id) {
            return Err(BridgeError::new(
                "BIND_BASE_MISSING",
                format!(
                    "Base type \"{}\" must be bound before \"{}\".",
                    std::any::type_name::<B>(),
                    name
                ),
            ));
        }
        self.bind_type_inner(TypeMeta::of::<T>(), name, Some(base_id))
    }

    fn bind_type_inner(
        &mut self,
        meta: TypeMeta,
        name: &str,
        base: Option<TypeId>,
    ) -> Result<TypeDescriptorHandle, BridgeError> {
        self.ensure_active()?;
        ensure_valid_name(name)?;
        self.registry.borrow_mut().bind(meta, name, base)?;
        log::debug!(
            "bound type {} as \"{}\" in incarnation {}",
            meta.type_name,
            name,
            self.incarnation
        );
        Ok(TypeDescriptorHandle {
            incarnation: self.incarnation,
            type_id: meta.type_id,
            bound_name: name.to_string(),
        })
    }

    pub fn describe_type(
        &self,
        handle: &TypeDescriptorHandle,
    ) -> Result<BoundTypeInfo, BridgeError> {
        self.ensure_active()?;
        if handle.incarnation != self.incarnation {
            return Err(BridgeError::new(
                "ENV_DESCRIPTOR_FOREIGN",
                format!(
                    "Descriptor \"{}\" belongs to another environment incarnation.",
                    handle.bound_name
                ),
            ));
        }
        let registry = self.registry.borrow();
        let descriptor = registry.descriptor(handle.type_id).ok_or_else(|| {
            BridgeError::new(
                "VALUE_TYPE_UNBOUND",
                format!("Type \"{}\" is not bound.", handle.bound_name),
            )
        })?;
        Ok(BoundTypeInfo {
            bound_name: descriptor.bound_name.clone(),
            type_name: descriptor.meta.type_name.to_string(),
            size: descriptor.meta.size,
            align: descriptor.meta.align,
            base_type_name: descriptor
                .base
                .and_then(|base| registry.descriptor(base))
                .map(|base| base.meta.type_name.to_string()),
        })
    }
}
