use std::path::Path;
use std::sync::Arc;

use animator::{
    FixedStepClock, FrameClock, FrameReport, GpuContext, GpuInstances, InstanceAnimator,
};
use anyhow::{anyhow, Context, Result};
use formation::{Formation, GestureAvailability, SharedState};
use gesture::{
    CameraDevice, FrameOutcome, GesturePipeline, GestureScript, ScriptedClassifier,
    SyntheticCamera,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use treeconfig::EvergreenConfig;

use crate::cli::SimulateArgs;
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `--config` wins, then `<config dir>/evergreen.toml`, then built-in defaults.
pub fn load_config(explicit: Option<&Path>, paths: &AppPaths) -> Result<EvergreenConfig> {
    if let Some(path) = explicit {
        return EvergreenConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let default_path = paths.config_file();
    if default_path.is_file() {
        tracing::debug!(path = %default_path.display(), "loading user config");
        return EvergreenConfig::load(&default_path)
            .with_context(|| format!("failed to load config {}", default_path.display()));
    }

    tracing::debug!("no config file found; using defaults");
    Ok(EvergreenConfig::default())
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub objects: usize,
    pub frames: u64,
    pub simulated_seconds: f32,
    pub video_frames: u64,
    pub skipped_video_frames: u64,
    pub committed_frames: u64,
    pub formation: Formation,
    pub transitions: u64,
    pub stable_label: String,
    pub gesture: String,
    pub rotation_mode: String,
    pub rotation_changes: u64,
    pub yaw: f32,
    pub topper_height: f32,
    pub mean_target_distance: f32,
    pub gpu_uploads: Option<u64>,
}

/// Video callback replaying a gesture script through a synthetic camera.
struct ScriptedGesture {
    camera: SyntheticCamera,
    pipeline: GesturePipeline<ScriptedClassifier>,
    frames: u64,
    skipped: u64,
    committed: u64,
}

impl ScriptedGesture {
    fn tick(&mut self) {
        let Some(frame) = self.camera.capture() else {
            return;
        };
        self.frames += 1;
        match self.pipeline.process_frame(&frame) {
            FrameOutcome::Skipped => self.skipped += 1,
            FrameOutcome::Committed { .. } => self.committed += 1,
            _ => {}
        }
    }
}

fn start_gesture(
    args: &SimulateArgs,
    config: &EvergreenConfig,
    state: &Arc<SharedState>,
    paths: &AppPaths,
) -> Result<Option<ScriptedGesture>> {
    let Some(requested) = args.script.as_deref() else {
        let reason = "no camera in headless mode; pass --script to replay gestures";
        tracing::warn!("{reason}");
        state.set_availability(GestureAvailability::Unavailable(reason.to_string()));
        return Ok(None);
    };

    let path = paths
        .resolve_script(requested)
        .ok_or_else(|| anyhow!("gesture script {} not found", requested.display()))?;
    let script = GestureScript::load(&path)
        .with_context(|| format!("failed to load gesture script {}", path.display()))?;
    tracing::info!(
        script = %path.display(),
        frames = script.total_frames(),
        "replaying gesture script"
    );

    let gesture = &config.gesture;
    let mut camera = SyntheticCamera::new();
    camera
        .open(gesture.camera_width, gesture.camera_height, gesture.camera_fps)
        .context("failed to open synthetic camera")?;
    state.set_availability(GestureAvailability::Ready);

    Ok(Some(ScriptedGesture {
        camera,
        pipeline: GesturePipeline::new(
            ScriptedClassifier::new(script),
            gesture,
            Arc::clone(state),
        ),
        frames: 0,
        skipped: 0,
        committed: 0,
    }))
}

struct GpuUpload {
    context: GpuContext,
    instances: GpuInstances,
}

/// Runs the render and video callbacks on one thread over simulated time.
pub fn simulate(
    args: &SimulateArgs,
    config: &EvergreenConfig,
    paths: &AppPaths,
) -> Result<SimulationSummary> {
    let layout = Arc::new(match args.seed {
        Some(seed) => layout::generate_seeded(&config.layout, seed),
        None => layout::generate_from_entropy(&config.layout),
    });
    let state = Arc::new(SharedState::new(args.formation, &config.showcase));
    let mut animator = InstanceAnimator::new(Arc::clone(&layout), config, Arc::clone(&state));
    let mut gesture = start_gesture(args, config, &state, paths)?;

    let mut gpu = if args.gpu {
        let context = GpuContext::headless().context("--gpu requires a GPU adapter")?;
        tracing::info!(adapter = %context.adapter_name, "uploading instances to GPU");
        let instances = GpuInstances::new(&context.device, animator.batches());
        Some(GpuUpload { context, instances })
    } else {
        None
    };

    let mut clock = FixedStepClock::from_fps(args.fps);
    let frames = (args.duration.as_secs_f32() * args.fps).round() as u64;
    let video_interval = 1.0 / config.gesture.camera_fps;
    let mut next_video = 0.0_f32;
    let mut elapsed = 0.0_f32;
    let mut last_report: Option<FrameReport> = None;
    let mut rotation_changes = 0_u64;

    tracing::info!(
        objects = layout.len(),
        frames,
        fps = args.fps,
        formation = %args.formation,
        "starting simulation"
    );

    for _ in 0..frames {
        let sample = clock.sample();
        elapsed = sample.elapsed;
        if let Some(gesture) = gesture.as_mut() {
            while next_video <= sample.elapsed {
                gesture.tick();
                next_video += video_interval;
            }
        }
        let report = animator.frame(sample);
        if last_report.is_some_and(|last| last.mode != report.mode) {
            rotation_changes += 1;
        }
        last_report = Some(report);

        if let Some(gpu) = gpu.as_mut() {
            let group = animator.group_matrix();
            gpu.instances
                .upload(&gpu.context.queue, animator.batches_mut(), group);
        }
    }

    let formation = state.formation();
    let (video_frames, skipped, committed) = gesture
        .as_ref()
        .map_or((0, 0, 0), |g| (g.frames, g.skipped, g.committed));

    Ok(SimulationSummary {
        objects: layout.len(),
        frames,
        simulated_seconds: elapsed,
        video_frames,
        skipped_video_frames: skipped,
        committed_frames: committed,
        formation,
        transitions: state.transitions(),
        stable_label: state.stable_label().to_string(),
        gesture: describe_availability(&state.availability()),
        rotation_mode: last_report
            .map_or(animator.rotation_mode(), |report| report.mode)
            .to_string(),
        rotation_changes,
        yaw: last_report.map_or(animator.yaw(), |report| report.yaw),
        topper_height: animator.topper().transform().position.y,
        mean_target_distance: animator.mean_target_distance(formation),
        gpu_uploads: gpu.as_ref().map(|gpu| gpu.instances.uploads()),
    })
}

pub fn describe_availability(availability: &GestureAvailability) -> String {
    match availability {
        GestureAvailability::Loading => "loading".to_string(),
        GestureAvailability::Ready => "ready".to_string(),
        GestureAvailability::Unavailable(reason) => format!("unavailable ({reason})"),
    }
}
