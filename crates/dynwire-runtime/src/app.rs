//! The application container

use crate::error::{Errors, Result, RuntimeError};
use dynwire_core::{
    take_failure, Arg, Batch, Context, Function, Hook, Registration, TypeDesc, Value,
};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

type Component = Arc<dyn Any + Send + Sync>;

/// Output slots of one provider call; error-shaped positions are `None`
type Outputs = Arc<Vec<Option<Component>>>;

/// Position of a component: provider index and output index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    provider: usize,
    output: usize,
}

/// Application lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Built; hooks have not run
    Created,
    /// Startup hooks are running
    Starting,
    /// Startup hooks ran successfully
    Started,
    /// Shutdown hooks are running
    Stopping,
    /// Shutdown hooks ran, or startup was rolled back
    Stopped,
    /// The registration batch could not be applied
    Failed,
}

/// A minimal dependency-injection container driven by a registration batch.
///
/// Components are identified by type, optionally qualified by a name or a
/// value group. Providers run lazily, at most once, when one of their
/// components is first needed. Invocations run in registration order when
/// the app is built; lifecycle hooks run on [`App::start`] and [`App::stop`].
pub struct App {
    providers: Vec<Function>,
    unnamed: HashMap<TypeDesc, Slot>,
    named: HashMap<(TypeDesc, String), Slot>,
    groups: HashMap<(TypeDesc, String), Vec<Slot>>,
    hooks: Vec<Hook>,
    context: Context,
    cache: Mutex<HashMap<usize, Outputs>>,
    state: Mutex<State>,
    err: Option<RuntimeError>,
}

#[derive(Debug)]
struct State {
    phase: AppState,
    started: usize,
}

impl App {
    /// Apply a registration batch.
    ///
    /// Every fatal entry is collected into a single startup error. When there
    /// are none, invocations run in order and the first failure becomes the
    /// app's error. Check [`App::err`] before starting.
    pub fn new(batch: Batch) -> Self {
        let mut app = App {
            providers: Vec::new(),
            unnamed: HashMap::new(),
            named: HashMap::new(),
            groups: HashMap::new(),
            hooks: Vec::new(),
            context: Context::new(),
            cache: Mutex::new(HashMap::new()),
            state: Mutex::new(State {
                phase: AppState::Created,
                started: 0,
            }),
            err: None,
        };

        let mut errors = Errors::new();
        let mut invokes = Vec::new();

        for registration in batch {
            match registration {
                Registration::Provide(f) => {
                    if let Err(err) = app.provide(f) {
                        errors.push(err);
                    }
                }
                Registration::ProvideAnnotated {
                    name,
                    group,
                    target,
                } => {
                    if let Err(err) = app.provide_annotated(name, group, target) {
                        errors.push(err);
                    }
                }
                Registration::Invoke(f) => invokes.push(f),
                Registration::AppendHook(hook) => app.hooks.push(hook),
                Registration::Fatal(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            warn!(errors = errors.len(), "Application failed to initialize");
            app.fail(RuntimeError::Startup(errors));
            return app;
        }

        for (index, f) in invokes.iter().enumerate() {
            if let Err(err) = app.invoke(index, f) {
                warn!(index, error = %err, "Invoke failed");
                app.fail(err);
                return app;
            }
        }

        debug!(
            providers = app.providers.len(),
            hooks = app.hooks.len(),
            invokes = invokes.len(),
            "Application built"
        );
        app
    }

    /// The error that prevents this app from starting, if any
    pub fn err(&self) -> Option<&RuntimeError> {
        self.err.as_ref()
    }

    /// Current lifecycle state
    pub fn state(&self) -> AppState {
        self.state.lock().phase
    }

    /// Root context handed to providers and invocations that ask for one.
    /// Cancelled when the app stops.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run startup hooks in registration order.
    ///
    /// On the first failure, the shutdown hooks of already-started hooks run
    /// in reverse order and the app ends up stopped. Hooks run without the
    /// state lock held: a hook may query [`App::state`], and a nested
    /// `start` or `stop` fails with an invalid state error.
    pub fn start(&self, ctx: &Context) -> Result<()> {
        self.ensure_ready()?;
        self.transition(AppState::Created, AppState::Starting, "start")?;

        for (index, hook) in self.hooks.iter().enumerate() {
            if let Some(on_start) = &hook.on_start {
                if let Err(source) = on_start(ctx.clone()) {
                    warn!(index, error = %source, "Startup hook failed, rolling back");
                    for (undo, hook) in self.hooks[..index].iter().enumerate().rev() {
                        if let Some(on_stop) = &hook.on_stop {
                            if let Err(err) = on_stop(ctx.clone()) {
                                warn!(index = undo, error = %err, "Rollback hook failed");
                            }
                        }
                    }
                    self.state.lock().phase = AppState::Stopped;
                    self.context.cancel();
                    return Err(RuntimeError::Hook { index, source });
                }
            }
            self.state.lock().started = index + 1;
        }

        self.state.lock().phase = AppState::Started;
        info!(hooks = self.hooks.len(), "Application started");
        Ok(())
    }

    /// Run shutdown hooks of started hooks in reverse order.
    ///
    /// Every hook runs even when an earlier one fails; all failures are
    /// reported together.
    pub fn stop(&self, ctx: &Context) -> Result<()> {
        self.transition(AppState::Started, AppState::Stopping, "stop")?;
        let started = self.state.lock().started;

        let mut errors = Errors::new();
        for (index, hook) in self.hooks[..started].iter().enumerate().rev() {
            if let Some(on_stop) = &hook.on_stop {
                if let Err(source) = on_stop(ctx.clone()) {
                    errors.push(RuntimeError::Hook { index, source });
                }
            }
        }

        self.state.lock().phase = AppState::Stopped;
        self.context.cancel();
        info!(errors = errors.len(), "Application stopped");

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::Shutdown(errors))
        }
    }

    /// Move from `from` to `to`, or report why `action` is not allowed
    fn transition(&self, from: AppState, to: AppState, action: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase != from {
            return Err(RuntimeError::invalid_state(format!(
                "Application cannot {action} from the {:?} state",
                state.phase
            )));
        }
        state.phase = to;
        Ok(())
    }

    /// Resolve the unnamed component of type `T`
    pub fn get<T: Any + Clone>(&self) -> Result<T> {
        self.ensure_ready()?;
        let ty = TypeDesc::of::<T>();
        let slot = self
            .unnamed
            .get(&ty)
            .copied()
            .ok_or_else(|| RuntimeError::dependency(format!("no provider for {ty}")))?;
        downcast(&self.component(slot, &mut Vec::new())?)
    }

    /// Resolve the component of type `T` registered under `name`
    pub fn named<T: Any + Clone>(&self, name: &str) -> Result<T> {
        self.ensure_ready()?;
        let ty = TypeDesc::of::<T>();
        let slot = self
            .named
            .get(&(ty, name.to_string()))
            .copied()
            .ok_or_else(|| {
                RuntimeError::dependency(format!("no provider for {ty} named {name:?}"))
            })?;
        downcast(&self.component(slot, &mut Vec::new())?)
    }

    /// Resolve every component of type `T` in value group `group`, in
    /// registration order. An unknown group is empty.
    pub fn group<T: Any + Clone>(&self, group: &str) -> Result<Vec<T>> {
        self.ensure_ready()?;
        let ty = TypeDesc::of::<T>();
        let Some(slots) = self.groups.get(&(ty, group.to_string())) else {
            return Ok(Vec::new());
        };

        slots
            .iter()
            .map(|slot| downcast(&self.component(*slot, &mut Vec::new())?))
            .collect()
    }

    fn fail(&mut self, err: RuntimeError) {
        self.state.get_mut().phase = AppState::Failed;
        self.err = Some(err);
    }

    fn ensure_ready(&self) -> Result<()> {
        match &self.err {
            Some(err) => Err(RuntimeError::invalid_state(format!(
                "Application failed to initialize: {err}"
            ))),
            None => Ok(()),
        }
    }

    fn provide(&mut self, f: Function) -> Result<()> {
        let provider = self.providers.len();
        for (output, ty) in f.outputs().iter().enumerate() {
            if ty.is_error() {
                continue;
            }
            if self.unnamed.contains_key(ty) {
                return Err(RuntimeError::dependency(format!("{ty} already provided")));
            }
            self.unnamed.insert(*ty, Slot { provider, output });
        }

        self.providers.push(f);
        Ok(())
    }

    fn provide_annotated(
        &mut self,
        name: Option<String>,
        group: Option<String>,
        target: Function,
    ) -> Result<()> {
        if name.is_none() && group.is_none() {
            return self.provide(target);
        }

        let provider = self.providers.len();
        let (output, ty) = target
            .outputs()
            .iter()
            .copied()
            .enumerate()
            .find(|(_, ty)| !ty.is_error())
            .ok_or_else(|| {
                RuntimeError::dependency(format!("{} provides no value", target.shape()))
            })?;
        let slot = Slot { provider, output };

        if let Some(name) = name {
            if self.named.contains_key(&(ty, name.clone())) {
                return Err(RuntimeError::dependency(format!(
                    "{ty} named {name:?} already provided"
                )));
            }
            self.named.insert((ty, name), slot);
        }
        if let Some(group) = group {
            self.groups.entry((ty, group)).or_default().push(slot);
        }

        self.providers.push(target);
        Ok(())
    }

    fn invoke(&self, index: usize, f: &Function) -> Result<()> {
        let values = self.call(f, &mut Vec::new())?;
        for (ty, value) in f.outputs().iter().zip(values) {
            if ty.is_error() {
                take_failure(value).map_err(|source| RuntimeError::Invoke { index, source })?;
            }
        }
        debug!(index, shape = %f.shape(), "Invoked");
        Ok(())
    }

    /// Resolve the inputs of `f` and call it
    fn call(&self, f: &Function, stack: &mut Vec<usize>) -> Result<Vec<Value>> {
        let mut inputs = Vec::with_capacity(f.inputs().len());
        for ty in f.inputs() {
            inputs.push(self.resolve(*ty, stack)?);
        }

        let args: Vec<Arg<'_>> = inputs.iter().map(|c| &**c).collect();
        Ok(f.call(&args)?)
    }

    fn resolve(&self, ty: TypeDesc, stack: &mut Vec<usize>) -> Result<Component> {
        if ty.is_context() {
            let context: Component = Arc::new(self.context.clone());
            return Ok(context);
        }

        let slot = self
            .unnamed
            .get(&ty)
            .copied()
            .ok_or_else(|| RuntimeError::dependency(format!("no provider for {ty}")))?;
        self.component(slot, stack)
    }

    fn component(&self, slot: Slot, stack: &mut Vec<usize>) -> Result<Component> {
        let outputs = self.outputs(slot.provider, stack)?;
        outputs
            .get(slot.output)
            .cloned()
            .flatten()
            .ok_or_else(|| {
                RuntimeError::dependency(format!(
                    "provider #{} has no value at output #{}",
                    slot.provider, slot.output
                ))
            })
    }

    /// Call a provider once, caching its outputs
    fn outputs(&self, provider: usize, stack: &mut Vec<usize>) -> Result<Outputs> {
        if let Some(outputs) = self.cache.lock().get(&provider) {
            return Ok(Arc::clone(outputs));
        }

        let f = &self.providers[provider];
        if stack.contains(&provider) {
            return Err(RuntimeError::dependency_cycle(format!(
                "{} depends on itself",
                f.shape()
            )));
        }

        stack.push(provider);
        let values = self.call(f, stack);
        stack.pop();

        let mut outputs = Vec::with_capacity(f.outputs().len());
        for (ty, value) in f.outputs().iter().zip(values?) {
            if ty.is_error() {
                take_failure(value).map_err(|source| RuntimeError::Provider {
                    provider: f.shape().to_string(),
                    source,
                })?;
                outputs.push(None);
            } else {
                outputs.push(Some(Component::from(value)));
            }
        }

        let outputs = Arc::new(outputs);
        self.cache.lock().insert(provider, Arc::clone(&outputs));
        Ok(outputs)
    }
}

fn downcast<T: Any + Clone>(component: &Component) -> Result<T> {
    component.downcast_ref::<T>().cloned().ok_or_else(|| {
        RuntimeError::dependency(format!(
            "component is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("providers", &self.providers.len())
            .field("hooks", &self.hooks.len())
            .field("state", &self.state())
            .field("err", &self.err)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynwire_core::{Error, Fallible};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;

    fn batch(registrations: Vec<Registration>) -> Batch {
        registrations.into_iter().collect()
    }

    #[test]
    fn test_resolves_dependencies_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let app = App::new(batch(vec![
            Registration::Provide(Function::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                (40u32,)
            })),
            Registration::Provide(Function::new(|base: u32| (base as u64 + 2, Ok(()) as Fallible))),
            Registration::Provide(Function::new(|base: u32, total: u64| (format!("{base}/{total}"),))),
        ]));

        assert!(app.err().is_none());
        assert_eq!(app.get::<String>().unwrap(), "40/42");
        assert_eq!(app.get::<u64>().unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_dependency() {
        let app = App::new(batch(vec![Registration::Provide(Function::new(
            |x: u8| (x as u16,),
        ))]));
        assert!(matches!(app.get::<u16>(), Err(RuntimeError::Dependency(_))));
        assert!(matches!(app.get::<i64>(), Err(RuntimeError::Dependency(_))));
    }

    #[test]
    fn test_cycle() {
        let app = App::new(batch(vec![
            Registration::Provide(Function::new(|x: u16| (x as u8,))),
            Registration::Provide(Function::new(|x: u8| (x as u16,))),
        ]));
        assert!(matches!(app.get::<u8>(), Err(RuntimeError::DependencyCycle(_))));
    }

    #[test]
    fn test_provider_error() {
        let app = App::new(batch(vec![Registration::Provide(Function::new(
            || -> (u8, Fallible) { (0, Err("no value".into())) },
        ))]));

        match app.get::<u8>() {
            Err(RuntimeError::Provider { source, .. }) => assert_eq!(source.to_string(), "no value"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_provider_is_startup_error() {
        let app = App::new(batch(vec![
            Registration::Provide(Function::new(|| (1u8,))),
            Registration::Provide(Function::new(|| (2u8,))),
        ]));
        assert!(matches!(app.err(), Some(RuntimeError::Startup(_))));
        assert_eq!(app.state(), AppState::Failed);
    }

    #[test]
    fn test_named_and_group() {
        let app = App::new(batch(vec![
            Registration::ProvideAnnotated {
                name: Some("primary".to_string()),
                group: None,
                target: Function::new(|| ("first".to_string(),)),
            },
            Registration::ProvideAnnotated {
                name: None,
                group: Some("labels".to_string()),
                target: Function::new(|| (Ok(()) as Fallible, "a".to_string())),
            },
            Registration::ProvideAnnotated {
                name: None,
                group: Some("labels".to_string()),
                target: Function::new(|| ("b".to_string(),)),
            },
        ]));

        assert_eq!(app.named::<String>("primary").unwrap(), "first");
        assert!(app.named::<String>("secondary").is_err());
        assert_eq!(app.group::<String>("labels").unwrap(), vec!["a", "b"]);
        assert!(app.group::<String>("none").unwrap().is_empty());
        assert!(app.get::<String>().is_err());
    }

    #[test]
    fn test_fatal_entries_collected() {
        let mut b = Batch::new();
        b.fatal(Error::missing_symbol("A"));
        b.push(Registration::Invoke(Function::new(|| -> Fallible {
            panic!("must not run")
        })));
        b.fatal(Error::missing_symbol("B"));

        let app = App::new(b);
        let errors = app.err().and_then(RuntimeError::errors).unwrap();
        assert_eq!(errors.len(), 2);
        assert!(matches!(app.start(&Context::new()), Err(RuntimeError::InvalidState(_))));
        assert!(app.get::<u8>().is_err());
    }

    #[test]
    fn test_invoke_failure() {
        let app = App::new(batch(vec![
            Registration::Invoke(Function::new(|| -> Fallible { Ok(()) })),
            Registration::Invoke(Function::new(|| -> Fallible { Err("invoke failed".into()) })),
        ]));
        assert!(matches!(app.err(), Some(RuntimeError::Invoke { index: 1, .. })));
    }

    #[test]
    fn test_context_is_injected() {
        let seen = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&seen);
        let app = App::new(batch(vec![Registration::Invoke(Function::new(move |ctx: Context| {
            if !ctx.is_cancelled() {
                flag.fetch_add(1, Ordering::SeqCst);
            }
        }))]));

        assert!(app.err().is_none());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_rollback() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
        let hook = |name: &'static str, fail_start: bool| {
            let start_log = Arc::clone(&log);
            let stop_log = Arc::clone(&log);
            Registration::AppendHook(Hook {
                on_start: Some(Arc::new(move |_: Context| -> Fallible {
                    start_log.lock().push(format!("start {name}"));
                    if fail_start {
                        Err("refused".into())
                    } else {
                        Ok(())
                    }
                })),
                on_stop: Some(Arc::new(move |_: Context| -> Fallible {
                    stop_log.lock().push(format!("stop {name}"));
                    Ok(())
                })),
            })
        };

        let app = App::new(batch(vec![hook("a", false), hook("b", false), hook("c", true)]));
        let err = app.start(&Context::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::Hook { index: 2, .. }));
        assert_eq!(app.state(), AppState::Stopped);
        assert_eq!(
            *log.lock(),
            vec!["start a", "start b", "start c", "stop b", "stop a"]
        );
    }

    #[test]
    fn test_stop_reverse_and_aggregate() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let hooks: Vec<Registration> = (0..3)
            .map(|i| {
                let order = Arc::clone(&order);
                Registration::AppendHook(Hook {
                    on_start: None,
                    on_stop: Some(Arc::new(move |_: Context| -> Fallible {
                        order.lock().push(i);
                        if i == 1 {
                            Ok(())
                        } else {
                            Err(format!("stop {i} failed").into())
                        }
                    })),
                })
            })
            .collect();

        let app = App::new(batch(hooks));
        app.start(&Context::new()).unwrap();
        assert_eq!(app.state(), AppState::Started);

        let err = app.stop(&Context::new()).unwrap_err();
        assert_eq!(err.errors().map(Errors::len), Some(2));
        assert_eq!(*order.lock(), vec![2, 1, 0]);
        assert!(app.context().is_cancelled());

        assert!(matches!(app.stop(&Context::new()), Err(RuntimeError::InvalidState(_))));
    }

    #[test]
    fn test_hooks_may_reenter_app() {
        let handle: Arc<parking_lot::Mutex<Weak<App>>> = Arc::default();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));

        let on_start = {
            let (handle, seen) = (Arc::clone(&handle), Arc::clone(&seen));
            move |ctx: Context| -> Fallible {
                let app = handle.lock().upgrade().ok_or("app dropped")?;
                let nested = app.stop(&ctx);
                seen.lock().push(format!("{:?}", app.state()));
                seen.lock().push(matches!(nested, Err(RuntimeError::InvalidState(_))).to_string());
                Ok(())
            }
        };
        let on_stop = {
            let (handle, seen) = (Arc::clone(&handle), Arc::clone(&seen));
            move |ctx: Context| -> Fallible {
                let app = handle.lock().upgrade().ok_or("app dropped")?;
                let nested = app.start(&ctx);
                seen.lock().push(format!("{:?}", app.state()));
                seen.lock().push(matches!(nested, Err(RuntimeError::InvalidState(_))).to_string());
                Ok(())
            }
        };

        let app = Arc::new(App::new(batch(vec![Registration::AppendHook(Hook {
            on_start: Some(Arc::new(on_start)),
            on_stop: Some(Arc::new(on_stop)),
        })])));
        *handle.lock() = Arc::downgrade(&app);

        app.start(&Context::new()).unwrap();
        app.stop(&Context::new()).unwrap();

        assert_eq!(app.state(), AppState::Stopped);
        assert_eq!(*seen.lock(), vec!["Starting", "true", "Stopping", "true"]);
    }
}
