pub type PlainFunction = fn(&[BridgeValue]) -> Result<BridgeValue, BridgeError>;

type BoxedCallable = Box<dyn FnMut(&[BridgeValue]) -> Result<BridgeValue, BridgeError>>;

/// A host callable offered to scripts. A plain function is passed through
/// as its address: no boundary storage, no finalizer. A stateful callable
/// carries captured state, which is moved into its own boundary slot and
/// finalized per instance when the environment goes away.
pub enum Callable {
    Plain(PlainFunction),
    Stateful(BoxedCallable),
}

impl Callable {
    pub fn plain(function: PlainFunction) -> Self {
        Self::Plain(function)
    }

    pub fn stateful<F>(function: F) -> Self
    where
        F: FnMut(&[BridgeValue]) -> Result<BridgeValue, BridgeError> + 'static,
    {
        Self::Stateful(Box::new(function))
    }
}

impl Environment {
    pub fn set_function(&mut self, name: &str, callable: Callable) -> Result<(), BridgeError> {
        self.ensure_active()?;
        ensure_valid_name(name)?;
        if self.bound_functions.contains(name) {
            return Err(BridgeError::new(
                "BIND_FUNCTION_DUPLICATE",
                format!("Function \"{}\" is already bound.", name),
            ));
        }
        match callable {
            Callable::Plain(function) => {
                register_callable_arities(&mut self.engine, name, move |args| function(args));
            }
            Callable::Stateful(function) => {
                let state = Rc::new(RefCell::new(function));
                let meta = TypeMeta::of::<Rc<RefCell<BoxedCallable>>>();
                let token = self.heap.borrow_mut().allocate(
                    OwnershipMode::Owned,
                    meta,
                    SlotStorage::Inline(Box::new(Rc::clone(&state))),
                );
                // The shims root the slot for as long as the engine lives.
                register_callable_arities(&mut self.engine, name, move |args| {
                    let _rooted = &token;
                    (&mut *state.borrow_mut())(args)
                });
            }
        }
        self.bound_functions.insert(name.to_string());
        self.run_pressure_sweep();
        Ok(())
    }

    /// Exposes a zero-argument constructor to scripts: each script-side
    /// call builds a fresh host value that enters the boundary as an
    /// owned slot, collectable as soon as the script lets go of it.
    pub fn bind_constructor<T, F>(&mut self, name: &str, constructor: F) -> Result<(), BridgeError>
    where
        T: Any,
        F: Fn() -> T + 'static,
    {
        self.ensure_active()?;
        ensure_valid_name(name)?;
        if self.bound_functions.contains(name) {
            return Err(BridgeError::new(
                "BIND_FUNCTION_DUPLICATE",
                format!("Function \"{}\" is already bound.", name),
            ));
        }
        let meta = TypeMeta::of::<T>();
        self.registry.borrow_mut().ensure_descriptor(meta);
        let heap = Rc::clone(&self.heap);
        self.engine.register_fn(name, move || -> ScriptHandle {
            let value = constructor();
            let (token, detached) = {
                let mut heap = heap.borrow_mut();
                let token = heap.allocate(
                    OwnershipMode::Owned,
                    meta,
                    SlotStorage::Inline(Box::new(value)),
                );
                (token, heap.pressure_sweep())
            };
            finalize_slots(detached);
            ScriptHandle { token }
        });
        self.bound_functions.insert(name.to_string());
        log::debug!("bound constructor \"{}\" for {}", name, meta.type_name);
        Ok(())
    }
}

fn register_callable_arities<F>(engine: &mut Engine, name: &str, call: F)
where
    F: Fn(&[BridgeValue]) -> Result<BridgeValue, BridgeError> + Clone + 'static,
{
    let call0 = call.clone();
    engine.register_fn(name, move || -> Result<Dynamic, Box<EvalAltResult>> {
        invoke_callable(&call0, &[])
    });
    let call1 = call.clone();
    engine.register_fn(
        name,
        move |a0: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> { invoke_callable(&call1, &[a0]) },
    );
    let call2 = call.clone();
    engine.register_fn(
        name,
        move |a0: Dynamic, a1: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            invoke_callable(&call2, &[a0, a1])
        },
    );
    let call3 = call.clone();
    engine.register_fn(
        name,
        move |a0: Dynamic, a1: Dynamic, a2: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            invoke_callable(&call3, &[a0, a1, a2])
        },
    );
    engine.register_fn(
        name,
        move |a0: Dynamic,
              a1: Dynamic,
              a2: Dynamic,
              a3: Dynamic|
              -> Result<Dynamic, Box<EvalAltResult>> {
            invoke_callable(&call, &[a0, a1, a2, a3])
        },
    );
}

fn invoke_callable<F>(call: &F, args: &[Dynamic]) -> Result<Dynamic, Box<EvalAltResult>>
where
    F: Fn(&[BridgeValue]) -> Result<BridgeValue, BridgeError>,
{
    let mut bridge_args = Vec::with_capacity(args.len());
    for arg in args {
        let value = dynamic_to_bridge(arg.clone()).map_err(|error| {
            callable_error(BridgeError::new(
                "CALL_ARG_INVALID",
                format!("Argument cannot cross the boundary: {}", error),
            ))
        })?;
        bridge_args.push(value);
    }
    let result = call(&bridge_args).map_err(callable_error)?;
    Ok(bridge_to_dynamic(&result))
}

fn callable_error(error: BridgeError) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(error.to_string()),
        Position::NONE,
    ))
}
