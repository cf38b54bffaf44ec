/// Positional argument for a script call: plain data crossing by copy,
/// or an already-admitted bound value crossing as a handle.
pub enum CallArg<'a> {
    Value(BridgeValue),
    Handle(&'a BoundValue),
}

impl Environment {
    /// Evaluates a snippet against the root table. Temporaries the script
    /// created are gone once the snippet returns; owned values among them
    /// are reclaimed by the next sweep.
    pub fn eval(&mut self, code: &str) -> Result<BridgeValue, BridgeError> {
        self.ensure_active()?;
        let mut scope = self.build_scope();
        let result = self
            .engine
            .eval_with_scope::<Dynamic>(&mut scope, code)
            .map_err(|error| eval_error("EVAL_FAILED", error))?;
        self.restore_roots(&mut scope);
        drop(scope);
        self.run_pressure_sweep();
        dynamic_result_to_bridge(result)
    }

    /// Compiles a script, runs its top-level statements once, and keeps
    /// its function definitions callable through `call_function`.
    pub fn load_script(&mut self, code: &str) -> Result<(), BridgeError> {
        self.ensure_active()?;
        let ast = self
            .engine
            .compile(code)
            .map_err(|error| BridgeError::new("EVAL_FAILED", error.to_string()))?;
        let mut scope = self.build_scope();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|error| eval_error("EVAL_FAILED", error))?;
        self.restore_roots(&mut scope);
        drop(scope);

        // Only definitions are retained; the top level must not run again
        // on every later call.
        let functions = ast.clone_functions_only();
        self.ast = Some(match self.ast.take() {
            Some(previous) => previous.merge(&functions),
            None => functions,
        });
        self.run_pressure_sweep();
        Ok(())
    }

    pub fn call_function(
        &mut self,
        name: &str,
        args: &[BridgeValue],
    ) -> Result<BridgeValue, BridgeError> {
        let call_args = args.iter().map(bridge_to_dynamic).collect::<Vec<_>>();
        self.call_dynamic(name, call_args)
    }

    pub fn call_function_with(
        &mut self,
        name: &str,
        args: &[CallArg<'_>],
    ) -> Result<BridgeValue, BridgeError> {
        self.ensure_active()?;
        let mut call_args = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                CallArg::Value(value) => call_args.push(bridge_to_dynamic(value)),
                CallArg::Handle(handle) => {
                    if handle.token.incarnation != self.incarnation {
                        return Err(BridgeError::new(
                            "ENV_HANDLE_FOREIGN",
                            "Handle belongs to another environment incarnation.",
                        ));
                    }
                    call_args.push(Dynamic::from(handle.handle()));
                }
            }
        }
        self.call_dynamic(name, call_args)
    }

    fn call_dynamic(&mut self, name: &str, args: Vec<Dynamic>) -> Result<BridgeValue, BridgeError> {
        self.ensure_active()?;
        let mut scope = self.build_scope();
        let outcome = match &self.ast {
            Some(ast) => {
                match self
                    .engine
                    .call_fn::<Dynamic>(&mut scope, ast, name, args.clone())
                {
                    Ok(value) => Ok(value),
                    Err(error) => {
                        if matches!(*error, EvalAltResult::ErrorFunctionNotFound(_, _)) {
                            self.call_registered(&mut scope, name, args)
                        } else {
                            Err(eval_error("EVAL_FAILED", error))
                        }
                    }
                }
            }
            None => self.call_registered(&mut scope, name, args),
        };
        let result = outcome?;
        self.restore_roots(&mut scope);
        drop(scope);
        self.run_pressure_sweep();
        dynamic_result_to_bridge(result)
    }

    fn call_registered(
        &self,
        scope: &mut Scope<'static>,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, BridgeError> {
        if !self.bound_functions.contains(name) {
            return Err(BridgeError::new(
                "CALL_FUNCTION_MISSING",
                format!("Function \"{}\" is not bound.", name),
            ));
        }
        let mut rendered_args = String::new();
        for (index, arg) in args.into_iter().enumerate() {
            let arg_name = format!("__sb_arg{}", index);
            if index > 0 {
                rendered_args.push_str(", ");
            }
            rendered_args.push_str(&arg_name);
            scope.push_dynamic(arg_name, arg);
        }
        let code = format!("{}({})", name, rendered_args);
        self.engine
            .eval_with_scope::<Dynamic>(scope, &code)
            .map_err(|error| eval_error("EVAL_FAILED", error))
    }

    fn build_scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        for (name, entry) in &self.roots {
            scope.push_dynamic(name.clone(), entry.clone());
        }
        scope
    }

    /// Writes script-visible mutations of root entries back into the root
    /// table. A replaced entry drops its old `Dynamic` here, which is how
    /// a rebound root orphans its previous handle.
    fn restore_roots(&mut self, scope: &mut Scope<'static>) {
        for (name, entry) in self.roots.iter_mut() {
            if let Some(value) = scope.get_value::<Dynamic>(name) {
                *entry = value;
            }
        }
    }
}

fn eval_error(code: &str, error: Box<EvalAltResult>) -> BridgeError {
    BridgeError::new(code, error.to_string())
}
