use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender};
use formation::{GestureAvailability, SharedState};
use tracing::{debug, info, warn};
use treeconfig::GestureConfig;

use crate::classifier::{GestureClassifier, VideoFrame};
use crate::error::GestureError;
use crate::pipeline::GesturePipeline;

/// A video source; `capture` returning `None` ends the stream.
pub trait CameraDevice: Send {
    fn open(&mut self, width: u32, height: u32, fps: f32) -> Result<(), GestureError>;
    fn capture(&mut self) -> Option<VideoFrame>;
    fn close(&mut self);
}

/// Loads the gesture model. Called again on every retry.
pub trait ClassifierFactory: Send {
    fn load(&mut self) -> Result<Box<dyn GestureClassifier>, GestureError>;
}

impl<F> ClassifierFactory for F
where
    F: FnMut() -> Result<Box<dyn GestureClassifier>, GestureError> + Send,
{
    fn load(&mut self) -> Result<Box<dyn GestureClassifier>, GestureError> {
        self()
    }
}

/// Emits blank frames of the requested size.
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera {
    size: Option<(u32, u32)>,
    frame_limit: Option<u64>,
    remaining: Option<u64>,
    failing_opens: u32,
    opens: u32,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// End each opened stream after `frames` captures.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Refuse the next `count` open attempts, as a denied permission would.
    pub fn failing_opens(mut self, count: u32) -> Self {
        self.failing_opens = count;
        self
    }

    pub fn opens(&self) -> u32 {
        self.opens
    }
}

impl CameraDevice for SyntheticCamera {
    fn open(&mut self, width: u32, height: u32, _fps: f32) -> Result<(), GestureError> {
        if self.failing_opens > 0 {
            self.failing_opens -= 1;
            return Err(GestureError::CameraUnavailable("permission denied".into()));
        }
        if width == 0 || height == 0 {
            return Err(GestureError::CameraUnavailable(format!(
                "unsupported resolution {width}x{height}"
            )));
        }
        self.opens += 1;
        self.size = Some((width, height));
        self.remaining = self.frame_limit;
        Ok(())
    }

    fn capture(&mut self) -> Option<VideoFrame> {
        let (width, height) = self.size?;
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        Some(VideoFrame::blank(width, height))
    }

    fn close(&mut self) {
        self.size = None;
    }
}

#[derive(Debug)]
enum WorkerCommand {
    Shutdown,
}

struct Worker {
    commands: Sender<WorkerCommand>,
    torn_down: Arc<AtomicBool>,
    join_handle: JoinHandle<Box<dyn CameraDevice>>,
}

/// Owns camera and model acquisition and the capture thread.
///
/// Failures never propagate past the controller: they are logged and
/// published through [`SharedState::availability`] so manual controls keep
/// working.
pub struct GestureController {
    state: Arc<SharedState>,
    config: GestureConfig,
    camera: Option<Box<dyn CameraDevice>>,
    factory: Box<dyn ClassifierFactory>,
    worker: Option<Worker>,
}

impl GestureController {
    pub fn new(
        camera: Box<dyn CameraDevice>,
        factory: Box<dyn ClassifierFactory>,
        config: GestureConfig,
        state: Arc<SharedState>,
    ) -> Self {
        state.set_availability(GestureAvailability::Loading);
        Self {
            state,
            config,
            camera: Some(camera),
            factory,
            worker: None,
        }
    }

    /// `false` once the worker thread has exited, even before it is reaped.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.join_handle.is_finished())
    }

    pub fn start(&mut self) -> Result<(), GestureError> {
        self.reap_finished_worker();
        if self.worker.is_some() {
            return Ok(());
        }
        self.state.set_availability(GestureAvailability::Loading);
        match self.spawn_worker() {
            Ok(worker) => {
                self.worker = Some(worker);
                info!(
                    width = self.config.camera_width,
                    height = self.config.camera_height,
                    fps = self.config.camera_fps,
                    "gesture control ready"
                );
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "gesture control unavailable");
                self.state
                    .set_availability(GestureAvailability::Unavailable(err.to_string()));
                Err(err)
            }
        }
    }

    /// Tears down any running worker and acquires everything again.
    pub fn retry(&mut self) -> Result<(), GestureError> {
        self.stop_worker();
        info!("retrying gesture control");
        self.start()
    }

    pub fn shutdown(&mut self) {
        if self.worker.is_some() {
            self.stop_worker();
            self.state.set_availability(GestureAvailability::Unavailable(
                "gesture control stopped".into(),
            ));
        }
    }

    /// Joins a worker whose stream ended on its own, recovering the camera.
    fn reap_finished_worker(&mut self) {
        if self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.join_handle.is_finished())
        {
            debug!("reaping exited gesture worker");
            self.stop_worker();
        }
    }

    fn spawn_worker(&mut self) -> Result<Worker, GestureError> {
        let mut camera = self
            .camera
            .take()
            .ok_or_else(|| GestureError::CameraUnavailable("camera handle was lost".into()))?;

        let classifier = match self.factory.load() {
            Ok(classifier) => classifier,
            Err(err) => {
                self.camera = Some(camera);
                return Err(err);
            }
        };
        let pipeline = GesturePipeline::new(classifier, &self.config, Arc::clone(&self.state));

        let (ready_tx, ready_rx) = bounded(1);
        let (command_tx, command_rx) = unbounded();
        let torn_down = Arc::new(AtomicBool::new(false));
        let settings = CaptureSettings::from(&self.config);
        let worker_torn_down = Arc::clone(&torn_down);
        let state = Arc::clone(&self.state);

        let join_handle = thread::Builder::new()
            .name("evergreen-gesture".into())
            .spawn(move || {
                if let Err(err) = camera.open(settings.width, settings.height, settings.fps) {
                    let _ = ready_tx.send(Err(err));
                    return camera;
                }
                state.set_availability(GestureAvailability::Ready);
                let _ = ready_tx.send(Ok(()));
                run_capture_loop(
                    camera.as_mut(),
                    pipeline,
                    settings.interval,
                    &command_rx,
                    &worker_torn_down,
                    &state,
                );
                camera.close();
                camera
            })
            .map_err(GestureError::Spawn)?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(GestureError::CameraUnavailable(
                "gesture worker exited during start-up".into(),
            ))
        });
        if let Err(err) = ready {
            self.camera = join_handle.join().ok();
            return Err(err);
        }

        Ok(Worker {
            commands: command_tx,
            torn_down,
            join_handle,
        })
    }

    fn stop_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.torn_down.store(true, Ordering::Release);
        let _ = worker.commands.send(WorkerCommand::Shutdown);
        match worker.join_handle.join() {
            Ok(camera) => self.camera = Some(camera),
            Err(_) => warn!("gesture worker panicked; camera handle dropped"),
        }
        debug!("gesture worker stopped");
    }
}

impl Drop for GestureController {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

#[derive(Debug, Clone, Copy)]
struct CaptureSettings {
    width: u32,
    height: u32,
    fps: f32,
    interval: Duration,
}

impl From<&GestureConfig> for CaptureSettings {
    fn from(config: &GestureConfig) -> Self {
        let fps = config.camera_fps.max(1.0);
        Self {
            width: config.camera_width,
            height: config.camera_height,
            fps,
            interval: Duration::from_secs_f32(1.0 / fps),
        }
    }
}

fn run_capture_loop(
    camera: &mut dyn CameraDevice,
    mut pipeline: GesturePipeline<Box<dyn GestureClassifier>>,
    interval: Duration,
    commands: &Receiver<WorkerCommand>,
    torn_down: &AtomicBool,
    state: &SharedState,
) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(commands) -> command => {
                debug!(?command, "gesture worker received shutdown");
                break;
            }
            recv(ticker) -> _ => {
                let Some(frame) = camera.capture() else {
                    info!("camera stream ended");
                    state.set_availability(GestureAvailability::Unavailable(
                        "camera stream ended".into(),
                    ));
                    break;
                };
                let result = pipeline.classify(&frame);
                if torn_down.load(Ordering::Acquire) {
                    debug!("discarding recognition that finished after teardown");
                    break;
                }
                match result {
                    Ok(recognition) => {
                        pipeline.apply(&recognition);
                    }
                    Err(err) => warn!(error = %err, "gesture recognition failed; skipping frame"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{GestureScript, ScriptedClassifier};
    use formation::Formation;
    use std::sync::atomic::AtomicU32;
    use std::time::Instant;

    const FIST: &str = "[[steps]]\ngesture = \"Closed_Fist\"\nframes = 10\n";

    fn fast_config() -> GestureConfig {
        GestureConfig {
            camera_fps: 500.0,
            ..GestureConfig::default()
        }
    }

    fn scripted_factory(source: &'static str) -> Box<dyn ClassifierFactory> {
        Box::new(move || -> Result<Box<dyn GestureClassifier>, GestureError> {
            let script = GestureScript::from_toml_str(source)?;
            Ok(Box::new(ScriptedClassifier::new(script)))
        })
    }

    fn wait_for(mut predicate: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if predicate() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn worker_commits_scripted_fist() {
        let state = Arc::new(SharedState::default());
        let mut controller = GestureController::new(
            Box::new(SyntheticCamera::new()),
            scripted_factory(FIST),
            fast_config(),
            Arc::clone(&state),
        );
        controller.start().expect("controller starts");
        assert_eq!(state.availability(), GestureAvailability::Ready);

        assert!(wait_for(|| state.formation() == Formation::Tree));
        controller.shutdown();
        assert!(!controller.is_running());
        assert_eq!(state.transitions(), 1);
    }

    #[test]
    fn denied_camera_reports_unavailable_then_retry_recovers() {
        let state = Arc::new(SharedState::default());
        let mut controller = GestureController::new(
            Box::new(SyntheticCamera::new().failing_opens(1)),
            scripted_factory(FIST),
            fast_config(),
            Arc::clone(&state),
        );

        let err = controller.start().unwrap_err();
        assert!(matches!(err, GestureError::CameraUnavailable(_)));
        assert!(matches!(
            state.availability(),
            GestureAvailability::Unavailable(_)
        ));
        assert!(!controller.is_running());

        // Manual control keeps working while gesture control is down.
        assert_eq!(state.toggle_formation(), Formation::Tree);
        assert_eq!(state.toggle_formation(), Formation::Scattered);

        controller.retry().expect("retry succeeds");
        assert_eq!(state.availability(), GestureAvailability::Ready);
        assert!(wait_for(|| state.formation() == Formation::Tree));
    }

    #[test]
    fn model_load_failure_keeps_camera_for_retry() {
        let state = Arc::new(SharedState::default());
        let mut attempts = 0;
        let factory = move || -> Result<Box<dyn GestureClassifier>, GestureError> {
            attempts += 1;
            if attempts == 1 {
                return Err(GestureError::ModelLoad("network unreachable".into()));
            }
            Ok(Box::new(ScriptedClassifier::new(GestureScript::default())))
        };
        let mut controller = GestureController::new(
            Box::new(SyntheticCamera::new()),
            Box::new(factory),
            fast_config(),
            Arc::clone(&state),
        );

        assert!(matches!(controller.start(), Err(GestureError::ModelLoad(_))));
        controller.retry().expect("second attempt loads");
        assert!(controller.is_running());
    }

    #[test]
    fn ended_stream_marks_unavailable() {
        let state = Arc::new(SharedState::default());
        let mut controller = GestureController::new(
            Box::new(SyntheticCamera::new().with_frame_limit(3)),
            scripted_factory(FIST),
            fast_config(),
            Arc::clone(&state),
        );
        controller.start().expect("controller starts");
        assert!(wait_for(|| matches!(
            state.availability(),
            GestureAvailability::Unavailable(_)
        )));
        assert_eq!(state.formation(), Formation::Scattered);
    }

    #[test]
    fn start_after_stream_end_restarts_worker() {
        let state = Arc::new(SharedState::default());
        let loads = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&loads);
        let factory = move || -> Result<Box<dyn GestureClassifier>, GestureError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedClassifier::new(GestureScript::default())))
        };
        let mut controller = GestureController::new(
            Box::new(SyntheticCamera::new().with_frame_limit(3)),
            Box::new(factory),
            fast_config(),
            Arc::clone(&state),
        );

        controller.start().expect("controller starts");
        assert!(wait_for(|| !controller.is_running()));
        assert_eq!(
            state.availability(),
            GestureAvailability::Unavailable("camera stream ended".into())
        );

        controller.start().expect("restart after stream end");
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(wait_for(|| !controller.is_running()));
        assert_eq!(
            state.availability(),
            GestureAvailability::Unavailable("camera stream ended".into())
        );
    }

    #[test]
    fn shutdown_returns_camera_for_restart() {
        let state = Arc::new(SharedState::default());
        let mut controller = GestureController::new(
            Box::new(SyntheticCamera::new()),
            scripted_factory(FIST),
            fast_config(),
            Arc::clone(&state),
        );
        controller.start().expect("controller starts");
        controller.shutdown();
        assert!(!controller.is_running());
        assert_eq!(
            state.availability(),
            GestureAvailability::Unavailable("gesture control stopped".into())
        );

        controller.start().expect("camera handle survives shutdown");
        assert!(controller.is_running());
        assert_eq!(state.availability(), GestureAvailability::Ready);
    }
}
