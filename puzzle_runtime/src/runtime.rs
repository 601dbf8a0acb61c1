use std::fmt;
use std::rc::Rc;

use puzzle_scene::{MixerId, NodeId, SceneEngine};

use crate::animation::FinishedCallbacks;
use crate::objects::ObjectCache;
use crate::options::InitOptions;
use crate::pick::{HostEvent, PickPolicy, PickRegistration, Surface};
use crate::progress::ProgressReporter;
use crate::selector::Selector;
use crate::steps::{StepConfig, StepMachine};
use crate::timers::TimerRegistry;

/// Shared handle to a procedure callback. Two handles are the same callback
/// only when they point at the same closure.
pub struct Callback<S>(Rc<dyn Fn(&mut Runtime<S>)>);

impl<S> Callback<S> {
    pub fn new(callback: impl Fn(&mut Runtime<S>) + 'static) -> Self {
        Callback(Rc::new(callback))
    }

    pub fn noop() -> Self {
        Callback::new(|_| {})
    }

    pub fn same(&self, other: &Callback<S>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn call(&self, runtime: &mut Runtime<S>) {
        (self.0)(runtime)
    }
}

impl<S> Clone for Callback<S> {
    fn clone(&self) -> Self {
        Callback(Rc::clone(&self.0))
    }
}

impl<S> fmt::Debug for Callback<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

pub(crate) type ScrollHandler<S> = Rc<dyn Fn(&mut Runtime<S>, f64)>;

/// Runtime context for one loaded scene.
pub struct Runtime<S> {
    pub(crate) scene: S,
    pub(crate) objects: ObjectCache,
    pub(crate) finished: FinishedCallbacks<S>,
    pub(crate) mixer_listener: Option<MixerId>,
    pub(crate) picks: Vec<PickRegistration<S>>,
    pub(crate) pick_policy: PickPolicy,
    pub(crate) picked_object: String,
    pub(crate) surface: Surface,
    pub(crate) timers: TimerRegistry<S>,
    pub(crate) steps: StepMachine,
    pub(crate) progress: ProgressReporter,
    scroll_handlers: Vec<ScrollHandler<S>>,
    unload_handlers: Vec<Callback<S>>,
    fade_annotations: bool,
    unloaded: bool,
    events: Vec<String>,
}

impl<S: SceneEngine + 'static> Runtime<S> {
    pub fn new(scene: S, options: &InitOptions) -> Self {
        let steps = StepMachine::new(StepConfig::default());
        Runtime {
            scene,
            objects: ObjectCache::default(),
            finished: FinishedCallbacks::default(),
            mixer_listener: None,
            picks: Vec::new(),
            pick_policy: PickPolicy::default(),
            picked_object: String::new(),
            surface: Surface::default(),
            timers: TimerRegistry::default(),
            steps,
            progress: ProgressReporter::absent(),
            scroll_handlers: Vec::new(),
            unload_handlers: Vec::new(),
            fade_annotations: options.fade_annotations,
            unloaded: false,
            events: Vec::new(),
        }
    }

    pub fn with_step_config(mut self, config: StepConfig) -> Self {
        self.steps = StepMachine::new(config);
        self
    }

    pub fn with_pick_policy(mut self, policy: PickPolicy) -> Self {
        self.pick_policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn into_scene(self) -> S {
        self.scene
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Drains the event journal, leaving it empty for the events that follow.
    pub fn take_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    pub fn fade_annotations(&self) -> bool {
        self.fade_annotations
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Name recorded by the last pick round; empty after a miss.
    pub fn picked_object(&self) -> &str {
        &self.picked_object
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded
    }

    pub(crate) fn log_event(&mut self, event: impl Into<String>) {
        let event = event.into();
        log::debug!(target: "puzzle_runtime", "{event}");
        self.events.push(event);
    }

    pub fn resolve(&self, selector: &Selector) -> Vec<String> {
        selector.resolve(&self.scene)
    }

    pub fn object_by_name(&mut self, name: &str) -> Option<NodeId> {
        self.objects.lookup(&self.scene, name)
    }

    /// Registers a handler invoked with the offset of every scroll event.
    pub fn on_scroll(&mut self, handler: impl Fn(&mut Runtime<S>, f64) + 'static) {
        self.scroll_handlers.push(Rc::new(handler));
    }

    /// Registers a handler invoked once when the host unloads the page.
    pub fn on_unload(&mut self, handler: Callback<S>) {
        self.unload_handlers.push(handler);
    }

    pub fn handle_event(&mut self, event: HostEvent) {
        if self.unloaded {
            log::debug!(target: "puzzle_runtime", "ignoring {event:?} after unload");
            return;
        }
        match event {
            HostEvent::Pointer { time_ms, event } => self.dispatch_pointer(time_ms, event),
            HostEvent::Scroll { offset } => {
                let handlers = self.scroll_handlers.clone();
                for handler in handlers {
                    handler(self, offset);
                }
            }
            HostEvent::Resize(surface) => {
                self.surface = surface;
                self.log_event(format!("surface.resize {}x{}", surface.width, surface.height));
            }
            HostEvent::Unload => self.unload(),
        }
    }

    /// Advances the engine mixer and the timer clock by `delta` seconds.
    /// Actions finishing during the update have their callbacks run before
    /// any timer fires.
    pub fn advance(&mut self, delta: f64) {
        if self.unloaded {
            return;
        }
        self.scene.update(delta);
        let finished = self.scene.drain_finished();
        if self.listener_installed() {
            for action in finished {
                self.notify_finished(&action);
            }
        } else if !finished.is_empty() {
            log::debug!(
                target: "puzzle_runtime",
                "dropping {} finish notification(s): no listener on this mixer",
                finished.len()
            );
        }
        self.tick_timers(delta);
    }

    fn listener_installed(&self) -> bool {
        self.mixer_listener.is_some() && self.mixer_listener == self.scene.mixer_id()
    }

    /// Runs unload handlers, then tears down every registry.
    pub fn unload(&mut self) {
        if self.unloaded {
            return;
        }
        let handlers = std::mem::take(&mut self.unload_handlers);
        for handler in handlers {
            handler.call(self);
        }
        self.objects.clear();
        self.finished.clear();
        self.mixer_listener = None;
        self.picks.clear();
        self.picked_object.clear();
        self.timers.clear();
        self.scroll_handlers.clear();
        self.unloaded = true;
        self.log_event("runtime.unload");
    }
}
