// engine.rs - load / start / stop over a host
//
// The engine owns the field, one private visual per particle and the pending
// animation frame. Everything the browser does (cloning images, attaching
// nodes, styling, requestAnimationFrame) goes through `Host`, so the state
// machine runs the same against the DOM and against a recording test host.
//
// Loop shape: start -> frame -> request -> (host calls on_frame) -> frame ...
// The handle of the pending request doubles as the "running" flag.

use crate::config::FieldConfig;
use crate::error::FieldError;
use crate::render::{Declaration, Encoder};
use crate::sim::{Field, Size};

/// What the engine needs from its environment.
pub trait Host {
    /// A sprite node: a loaded template or a particle's private clone.
    type Visual;
    /// Pending animation frame request.
    type Frame: Copy;

    fn container_size(&self) -> Size;

    /// Height of the mount element, `None` if the page doesn't have one.
    fn mount_height(&self) -> Option<f64>;

    fn measure(&self, visual: &Self::Visual) -> Size;

    /// Independent copy of a loaded template.
    fn duplicate(&mut self, template: &Self::Visual) -> Result<Self::Visual, FieldError>;

    fn attach(&mut self, visual: &Self::Visual) -> Result<(), FieldError>;

    fn detach(&mut self, visual: &Self::Visual) -> Result<(), FieldError>;

    fn apply_style(&mut self, visual: &Self::Visual, style: &[Declaration]) -> Result<(), FieldError>;

    fn request_frame(&mut self) -> Result<Self::Frame, FieldError>;

    fn cancel_frame(&mut self, frame: Self::Frame);

    /// False once the host's overlay has been torn down; the engine won't
    /// start on a dead host.
    fn is_installed(&self) -> bool {
        true
    }
}

pub struct Engine<H: Host> {
    host: H,
    field: Field,
    visuals: Vec<H::Visual>,
    encoder: Encoder,
    animation: Option<H::Frame>,
}

impl<H: Host> Engine<H> {
    pub fn new(host: H, config: FieldConfig, seed: u32) -> Self {
        Self {
            host,
            field: Field::new(config, seed),
            visuals: Vec::new(),
            encoder: Encoder::new(),
            animation: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn visuals(&self) -> &[H::Visual] {
        &self.visuals
    }

    pub fn is_running(&self) -> bool {
        self.animation.is_some()
    }

    /// Build the particle pool from loaded templates.
    ///
    /// Runs once the load barrier resolves. Each particle gets its own clone
    /// of a template so styling one never touches another. A running field
    /// is stopped, repopulated and restarted so the old pool never lingers.
    pub fn populate(&mut self, templates: &[H::Visual]) -> Result<(), FieldError> {
        let was_running = self.is_running();
        self.stop()?;

        let sizes: Vec<Size> = templates.iter().map(|t| self.host.measure(t)).collect();
        let container = self.host.container_size();
        let mount = self.host.mount_height();

        self.field.spawn(&sizes, container, mount);

        let mut visuals = Vec::with_capacity(self.field.len());
        for &sprite in &self.field.particles().sprite {
            visuals.push(self.host.duplicate(&templates[sprite])?);
        }
        self.visuals = visuals;

        self.restyle()?;
        if was_running {
            self.start()?;
        }
        Ok(())
    }

    /// Attach all visuals and start the frame loop. No-op while running or
    /// once the host is gone.
    pub fn start(&mut self) -> Result<(), FieldError> {
        if self.animation.is_some() {
            return Ok(());
        }
        if !self.host.is_installed() {
            log::warn!("particle field is detached, not starting");
            return Ok(());
        }

        for (n, visual) in self.visuals.iter().enumerate() {
            if let Err(err) = self.host.attach(visual) {
                // leave nothing half-attached
                for attached in &self.visuals[..n] {
                    if let Err(undo) = self.host.detach(attached) {
                        log::warn!("detaching particle after failed start: {undo}");
                    }
                }
                return Err(err);
            }
        }
        log::debug!("particle field started ({} particles)", self.visuals.len());

        self.frame()
    }

    /// Cancel the pending frame and detach all visuals. No-op when stopped.
    pub fn stop(&mut self) -> Result<(), FieldError> {
        let Some(frame) = self.animation.take() else {
            return Ok(());
        };

        self.host.cancel_frame(frame);
        for visual in &self.visuals {
            self.host.detach(visual)?;
        }
        log::debug!("particle field stopped");
        Ok(())
    }

    /// Animation frame callback. Ignored unless running.
    pub fn on_frame(&mut self) -> Result<(), FieldError> {
        if self.animation.is_none() {
            return Ok(());
        }
        self.frame()
    }

    fn frame(&mut self) -> Result<(), FieldError> {
        let container = self.host.container_size();
        self.field.tick(container);

        self.restyle()?;
        for i in 0..self.visuals.len() {
            let style = self.encoder.placement(self.field.particles(), i);
            self.host.apply_style(&self.visuals[i], style)?;
        }

        self.animation = Some(self.host.request_frame()?);
        Ok(())
    }

    fn restyle(&mut self) -> Result<(), FieldError> {
        for i in 0..self.visuals.len() {
            if self.field.particles().restyled[i] {
                let style = self.encoder.appearance(self.field.particles(), i);
                self.host.apply_style(&self.visuals[i], style)?;
            }
        }
        self.field.clear_restyled();
        Ok(())
    }
}

impl<H: Host> Drop for Engine<H> {
    fn drop(&mut self) {
        // the host's frame callback may not outlive the engine
        if let Some(frame) = self.animation.take() {
            self.host.cancel_frame(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Range;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq)]
    struct Visual {
        id: usize,
        template: usize,
        size: Size,
    }

    #[derive(Default)]
    struct RecordingHost {
        container: Size,
        mount: Option<f64>,
        next_id: usize,
        attached: Vec<usize>,
        pending: Vec<u32>,
        requests: u32,
        styles: HashMap<(usize, &'static str), String>,
        uninstalled: bool,
        fail_attach_at: Option<usize>,
    }

    impl RecordingHost {
        fn new(mount: Option<f64>) -> Self {
            Self { container: Size::new(1000.0, 3000.0), mount, next_id: 100, ..Self::default() }
        }

        fn style(&self, id: usize, prop: &'static str) -> Option<&str> {
            self.styles.get(&(id, prop)).map(String::as_str)
        }
    }

    impl Host for RecordingHost {
        type Visual = Visual;
        type Frame = u32;

        fn container_size(&self) -> Size {
            self.container
        }

        fn mount_height(&self) -> Option<f64> {
            self.mount
        }

        fn measure(&self, visual: &Visual) -> Size {
            visual.size
        }

        fn duplicate(&mut self, template: &Visual) -> Result<Visual, FieldError> {
            self.next_id += 1;
            Ok(Visual { id: self.next_id, ..template.clone() })
        }

        fn attach(&mut self, visual: &Visual) -> Result<(), FieldError> {
            if self.fail_attach_at == Some(self.attached.len()) {
                return Err(FieldError::Dom(format!("cannot attach {}", visual.id)));
            }
            self.attached.push(visual.id);
            Ok(())
        }

        fn detach(&mut self, visual: &Visual) -> Result<(), FieldError> {
            let Some(pos) = self.attached.iter().position(|&id| id == visual.id) else {
                return Err(FieldError::Dom(format!("{} is not attached", visual.id)));
            };
            self.attached.remove(pos);
            Ok(())
        }

        fn apply_style(&mut self, visual: &Visual, style: &[Declaration]) -> Result<(), FieldError> {
            for (prop, value) in style {
                self.styles.insert((visual.id, *prop), value.clone());
            }
            Ok(())
        }

        fn request_frame(&mut self) -> Result<u32, FieldError> {
            self.requests += 1;
            self.pending.push(self.requests);
            Ok(self.requests)
        }

        fn cancel_frame(&mut self, frame: u32) {
            self.pending.retain(|&f| f != frame);
        }

        fn is_installed(&self) -> bool {
            !self.uninstalled
        }
    }

    fn templates() -> Vec<Visual> {
        vec![
            Visual { id: 0, template: 0, size: Size::new(40.0, 60.0) },
            Visual { id: 1, template: 1, size: Size::new(20.0, 20.0) },
        ]
    }

    fn engine(amount: usize, mount: Option<f64>) -> Engine<RecordingHost> {
        let config = FieldConfig { amount_of_particles: amount, ..FieldConfig::default() };
        Engine::new(RecordingHost::new(mount), config, 1234)
    }

    // Fire the pending frame the way the browser would.
    fn fire(engine: &mut Engine<RecordingHost>) {
        engine.host_mut().pending.pop().expect("no pending frame");
        assert!(engine.host().pending.is_empty());
        engine.on_frame().unwrap();
    }

    #[test]
    fn test_load_then_start_attaches_pool() {
        let mut engine = engine(30, Some(800.0));
        engine.populate(&templates()).unwrap();
        assert!(engine.host().attached.is_empty());

        engine.start().unwrap();
        assert_eq!(engine.host().attached.len(), 30);
        assert!(engine.is_running());
        assert_eq!(engine.host().pending.len(), 1);
    }

    #[test]
    fn test_reload_while_running_swaps_pool() {
        let mut engine = engine(5, Some(800.0));
        engine.populate(&templates()).unwrap();
        engine.start().unwrap();
        let old: Vec<usize> = engine.visuals().iter().map(|v| v.id).collect();

        engine.populate(&templates()).unwrap();
        assert!(engine.is_running());
        assert_eq!(engine.host().pending.len(), 1);

        let mut attached = engine.host().attached.clone();
        attached.sort_unstable();
        let mut ids: Vec<usize> = engine.visuals().iter().map(|v| v.id).collect();
        ids.sort_unstable();
        assert_eq!(attached, ids);
        assert!(old.iter().all(|id| !attached.contains(id)));

        fire(&mut engine);
        engine.stop().unwrap();
        assert!(engine.host().attached.is_empty());
    }

    #[test]
    fn test_reload_while_stopped_stays_stopped() {
        let mut engine = engine(5, Some(800.0));
        engine.populate(&templates()).unwrap();
        engine.populate(&templates()).unwrap();
        assert!(!engine.is_running());
        assert!(engine.host().attached.is_empty());
        assert_eq!(engine.visuals().len(), 5);
    }

    #[test]
    fn test_start_on_uninstalled_host_is_noop() {
        let mut engine = engine(5, Some(800.0));
        engine.populate(&templates()).unwrap();
        engine.host_mut().uninstalled = true;

        engine.start().unwrap();
        assert!(!engine.is_running());
        assert!(engine.host().attached.is_empty());
        assert_eq!(engine.host().requests, 0);
    }

    #[test]
    fn test_failed_attach_rolls_back() {
        let mut engine = engine(5, Some(800.0));
        engine.populate(&templates()).unwrap();
        engine.host_mut().fail_attach_at = Some(3);

        assert!(engine.start().is_err());
        assert!(!engine.is_running());
        assert!(engine.host().attached.is_empty());
        assert_eq!(engine.host().requests, 0);

        engine.host_mut().fail_attach_at = None;
        engine.start().unwrap();
        assert_eq!(engine.host().attached.len(), 5);
    }

    #[test]
    fn test_missing_mount_is_noop() {
        let mut engine = engine(30, None);
        engine.populate(&templates()).unwrap();
        assert!(engine.visuals().is_empty());

        engine.start().unwrap();
        assert!(engine.host().attached.is_empty());
        fire(&mut engine);
        engine.stop().unwrap();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_particle_visual_is_a_clone() {
        let config = FieldConfig { amount_of_particles: 1, ..FieldConfig::default() };
        let mut engine = Engine::new(RecordingHost::new(Some(500.0)), config, 5);
        let template = Visual { id: 0, template: 0, size: Size::new(10.0, 10.0) };
        engine.populate(std::slice::from_ref(&template)).unwrap();

        assert_eq!(engine.visuals().len(), 1);
        let visual = &engine.visuals()[0];
        assert_ne!(visual.id, template.id);
        assert_eq!(visual.template, template.template);
    }

    #[test]
    fn test_start_twice_runs_one_loop() {
        let mut engine = engine(10, Some(800.0));
        engine.populate(&templates()).unwrap();
        engine.start().unwrap();
        engine.start().unwrap();

        assert_eq!(engine.host().attached.len(), 10);
        assert_eq!(engine.host().pending.len(), 1);
        assert_eq!(engine.host().requests, 1);
    }

    #[test]
    fn test_stop_then_start_resumes() {
        let mut engine = engine(10, Some(800.0));
        engine.populate(&templates()).unwrap();
        engine.start().unwrap();
        fire(&mut engine);

        engine.stop().unwrap();
        assert!(!engine.is_running());
        assert!(engine.host().attached.is_empty());
        assert!(engine.host().pending.is_empty());

        engine.stop().unwrap();

        engine.start().unwrap();
        let mut attached = engine.host().attached.clone();
        attached.sort_unstable();
        let mut ids: Vec<usize> = engine.visuals().iter().map(|v| v.id).collect();
        ids.sort_unstable();
        assert_eq!(attached, ids);
        assert_eq!(engine.host().pending.len(), 1);
    }

    #[test]
    fn test_stale_frame_after_stop_is_ignored() {
        let mut engine = engine(3, Some(800.0));
        engine.populate(&templates()).unwrap();
        engine.start().unwrap();
        engine.stop().unwrap();

        let before = engine.field().particles().offset.clone();
        engine.on_frame().unwrap();
        assert_eq!(engine.field().particles().offset, before);
        assert_eq!(engine.host().requests, 1);
    }

    #[test]
    fn test_frames_move_and_style() {
        let config = FieldConfig {
            amount_of_particles: 4,
            speed: Range::new(1.0, 1.0),
            ..FieldConfig::default()
        };
        let mut engine = Engine::new(RecordingHost::new(Some(800.0)), config, 77);
        engine.populate(&templates()).unwrap();

        let start = engine.field().particles().offset.clone();
        engine.start().unwrap();
        fire(&mut engine);
        fire(&mut engine);

        let p = engine.field().particles();
        for i in 0..p.len() {
            assert!((p.offset[i] - (start[i] - 3.0)).abs() < 1e-9);
            let id = engine.visuals()[i].id;
            let bottom = format!("{}px", -p.offset[i]);
            assert_eq!(engine.host().style(id, "bottom"), Some(bottom.as_str()));
            assert!(engine.host().style(id, "transform").unwrap().starts_with("translateX("));
            assert!(engine.host().style(id, "left").is_some());
            assert!(engine.host().style(id, "opacity").is_some());
        }
        assert_eq!(engine.host().requests, 3);
    }

    #[test]
    fn test_recycle_restyles_visual() {
        let config = FieldConfig {
            amount_of_particles: 1,
            speed: Range::new(50.0, 50.0),
            ..FieldConfig::default()
        };
        let mut host = RecordingHost::new(Some(100.0));
        host.container = Size::new(500.0, 200.0);
        let mut engine = Engine::new(host, config, 3);
        engine.populate(&templates()).unwrap();
        engine.start().unwrap();

        let id = engine.visuals()[0].id;
        let height = engine.field().particles().height[0];
        let mut recycled = false;
        for _ in 0..20 {
            engine.host_mut().styles.remove(&(id, "left"));
            fire(&mut engine);
            if engine.host().style(id, "left").is_some() {
                assert_eq!(engine.field().particles().offset[0], height);
                recycled = true;
                break;
            }
        }
        assert!(recycled);
    }

    #[test]
    fn test_drop_cancels_pending_frame() {
        struct Shared(std::rc::Rc<std::cell::RefCell<Vec<u32>>>);

        impl Host for Shared {
            type Visual = ();
            type Frame = u32;
            fn container_size(&self) -> Size {
                Size::new(10.0, 10.0)
            }
            fn mount_height(&self) -> Option<f64> {
                None
            }
            fn measure(&self, _: &()) -> Size {
                Size::default()
            }
            fn duplicate(&mut self, _: &()) -> Result<(), FieldError> {
                Ok(())
            }
            fn attach(&mut self, _: &()) -> Result<(), FieldError> {
                Ok(())
            }
            fn detach(&mut self, _: &()) -> Result<(), FieldError> {
                Ok(())
            }
            fn apply_style(&mut self, _: &(), _: &[Declaration]) -> Result<(), FieldError> {
                Ok(())
            }
            fn request_frame(&mut self) -> Result<u32, FieldError> {
                self.0.borrow_mut().push(1);
                Ok(1)
            }
            fn cancel_frame(&mut self, frame: u32) {
                self.0.borrow_mut().retain(|&f| f != frame);
            }
        }

        let pending = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut engine = Engine::new(Shared(pending.clone()), FieldConfig::default(), 1);
        engine.start().unwrap();
        assert_eq!(pending.borrow().len(), 1);

        drop(engine);
        assert!(pending.borrow().is_empty());
    }
}
