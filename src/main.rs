// What you SEE:
// • Live camera (mirrored) with a small HUD.
// • SPACE captures the empty room after a short "CAPTURING..." pause; SPACE again retakes it.
// • Anything of the target colour then shows the captured room instead: the cloak.
// • Arrows / [ ] / - = tune hue, tolerance and floors; 1 2 3 jump to red/green/blue.
// • M shows the match mask, R resets, A/H ask the assistant, ESC quits.

mod assistant;
mod background;
mod camera;
mod cli;
mod cloak;
mod color;
mod compositor;
mod controls;
mod draw;
mod error;
mod matcher;
mod types;

use assistant::{Assistant, DisabledAdvisor, GREETING, GeminiAdvisor, SceneAdvisor};
use camera::CameraCapture;
use clap::Parser;
use cli::Args;
use cloak::{CloakController, CloakEvent, CloakState};
use compositor::{Composite, FrameCompositor};
use controls::{Control, apply_to_config};
use draw::{
    Drawer, GLYPH_ADVANCE, GLYPH_HEIGHT, draw_text_5x7, draw_text_5x7_scaled, fill_rect,
    outline_rect, shade_rect, text_width, wrap_text,
};
use error::Error;
use matcher::ThresholdConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use types::FrameBuffer;

/// Give up after this many failed grabs in a row (camera unplugged).
const MAX_CONSECUTIVE_FRAME_ERRORS: u32 = 30;
/// How long "CAPTURED!" / "RESET" stay on screen.
const BANNER_TIME: Duration = Duration::from_millis(1500);
const ASSISTANT_LINES: usize = 4;

const WHITE: u32 = 0x00_FF_FF_FF;
const GRAY: u32 = 0x00_B0_B0_B0;
const YELLOW: u32 = 0x00_FF_CC_33;
const GREEN: u32 = 0x00_33_FF_99;

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    run(args).inspect_err(|e| log::error!("{e}"))
}

/// Everything the overlay needs that isn't the frame itself.
struct Hud {
    fps_text: String,
    banner: Option<(&'static str, Instant)>,
    assistant_text: String,
    show_mask: bool,
}

fn run(args: Args) -> Result<(), Error> {
    /* --- Camera + window setup --- */
    let mut cam = CameraCapture::new(args.camera, args.width, args.height, args.fps, !args.no_mirror)?;
    let (w, h) = cam.resolution();
    let mut drawer = Drawer::new("Invisibility Cloak", w as usize, h as usize)?;

    /* --- Core: thresholds, capture workflow, compositor --- */
    let mut cfg = args.threshold_config();
    let mut cloak = CloakController::new(args.capture_delay());
    let events = cloak.subscribe();
    let compositor = FrameCompositor::new(!args.sequential);

    /* --- Scene assistant (off the frame loop) --- */
    let advisor: Arc<dyn SceneAdvisor> = match GeminiAdvisor::new(args.advisor_config()) {
        Ok(advisor) => Arc::new(advisor),
        Err(e) => {
            log::warn!("scene assistant disabled: {e}");
            Arc::new(DisabledAdvisor)
        }
    };
    let assistant = Assistant::new(advisor);

    let mut hud = Hud {
        fps_text: String::from("FPS: 0.0"),
        banner: None,
        assistant_text: GREETING.to_string(),
        show_mask: false,
    };

    /* --- FPS / error bookkeeping --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut frame_errors: u32 = 0;
    let mut mismatch_reported = false;

    log::info!("thresholds: {cfg:?}");

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();

        /* 1) Grab a fresh live frame. A failed grab skips the whole tick. */
        let mut frame = match cam.next_frame() {
            Ok(frame) => {
                frame_errors = 0;
                frame
            }
            Err(e) => {
                frame_errors += 1;
                log::warn!("{e}");
                if frame_errors >= MAX_CONSECUTIVE_FRAME_ERRORS {
                    log::error!("camera stopped delivering frames, shutting down");
                    break;
                }
                continue;
            }
        };

        /* 2) Inputs */
        for control in drawer.controls() {
            match control {
                Control::CaptureBackground => cloak.request_capture(now),
                Control::Reset => cloak.reset(),
                Control::ToggleMask => hud.show_mask = !hud.show_mask,
                Control::AnalyzeScene => {
                    if assistant.analyze(cloak.store().snapshot()) {
                        hud.assistant_text = "Analyzing the environment...".to_string();
                    }
                }
                Control::ExplainTechnology => {
                    if assistant.explain() {
                        hud.assistant_text = "Retrieving technical data...".to_string();
                    }
                }
                slider => {
                    if apply_to_config(slider, &mut cfg) {
                        log::debug!("thresholds: {cfg:?}");
                    }
                }
            }
        }

        /* 3) A pending capture copies the raw frame, before keying and HUD. */
        cloak.poll(now, &frame);

        for event in events.try_iter() {
            match event {
                CloakEvent::BackgroundCaptured { width, height } => {
                    log::info!("background captured ({width}x{height})");
                    hud.banner = Some(("CAPTURED!", now));
                }
                CloakEvent::StateChanged { to: CloakState::Idle, .. } => {
                    hud.banner = Some(("RESET", now));
                }
                CloakEvent::StateChanged { .. } => {}
            }
        }

        /* 4) Key the frame (or show the mask). The config is read once per tick. */
        let tick_cfg = cfg;
        let outcome = if hud.show_mask {
            compositor.paint_match_mask(&mut frame, &tick_cfg);
            None
        } else {
            Some(compositor.process(&mut frame, &tick_cfg, cloak.store()))
        };

        match outcome {
            Some(Composite::DimensionMismatch { live, background }) => {
                if !mismatch_reported {
                    log::warn!(
                        "live frame {}x{} does not match background {}x{}; passing frames through",
                        live.0, live.1, background.0, background.1
                    );
                    mismatch_reported = true;
                }
            }
            _ => mismatch_reported = false,
        }

        /* 5) Assistant replies (never blocks) */
        while let Some(reply) = assistant.try_recv() {
            log::info!("assistant ({:?}): {}", reply.request, reply.text);
            hud.assistant_text = reply.text;
        }

        /* 6) HUD on top, then present */
        draw_hud(&mut frame, &hud, cloak.state(), &tick_cfg, outcome, assistant.is_busy(), now);
        drawer.present(&frame)?;

        /* 7) FPS counter (log + HUD once per second) */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            log::debug!("FPS: {fps:.1}");
            hud.fps_text = format!("FPS: {fps:.1}");
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    Ok(())
}

fn draw_hud(
    frame: &mut FrameBuffer,
    hud: &Hud,
    state: CloakState,
    cfg: &ThresholdConfig,
    outcome: Option<Composite>,
    assistant_busy: bool,
    now: Instant,
) {
    let line = GLYPH_HEIGHT + 4;

    // Line 1: state, how much got keyed, FPS
    let keyed = match outcome {
        Some(Composite::Keyed { replaced }) if frame.pixel_count() > 0 => {
            format!("KEYED: {:.1}%", replaced as f32 * 100.0 / frame.pixel_count() as f32)
        }
        Some(Composite::Keyed { .. }) => "KEYED: 0.0%".to_string(),
        Some(Composite::Passthrough) => "NO BACKGROUND".to_string(),
        Some(Composite::DimensionMismatch { .. }) => "SIZE MISMATCH".to_string(),
        None => "MASK VIEW".to_string(),
    };
    draw_text_5x7(frame, 8, 8, &format!("{state} | {keyed} | {}", hud.fps_text), WHITE);

    // Line 2: thresholds + swatch of the target colour
    let [r, g, b] = color::hsl_to_rgb(cfg.target_hue, 100.0, 50.0);
    let swatch = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
    fill_rect(frame, 8, 8 + line, 14, GLYPH_HEIGHT + 1, swatch);
    outline_rect(frame, 7, 7 + line, 16, GLYPH_HEIGHT + 3, WHITE);
    let thresholds = format!(
        "HUE {:.0} +-{:.0}  SAT>={:.0}  L>={:.0}",
        cfg.target_hue, cfg.hue_tolerance, cfg.saturation_floor, cfg.lightness_floor
    );
    draw_text_5x7(frame, 30, 8 + line, &thresholds, WHITE);

    // Line 3: key hints
    let hint = if matches!(state, CloakState::Idle) {
        "STEP OUT OF FRAME, THEN SPACE TO CAPTURE  |  ESC QUIT"
    } else {
        "SPACE RETAKE  R RESET  ARROWS HUE/TOL  [] SAT  -= LIGHT  123 PRESET  M MASK"
    };
    draw_text_5x7(frame, 8, 8 + 2 * line, hint, GRAY);

    // Centre banner
    let banner = match (state, hud.banner) {
        (CloakState::Capturing { .. }, _) => Some("CAPTURING..."),
        (_, Some((text, at))) if now.duration_since(at) < BANNER_TIME => Some(text),
        _ => None,
    };
    if let Some(text) = banner {
        let scale = 3;
        let x = (frame.width as i32 - text_width(text, scale)) / 2;
        let y = (frame.height as i32 - GLYPH_HEIGHT * scale) / 2;
        draw_text_5x7_scaled(frame, x, y, text, YELLOW, scale);
    }

    // Bottom: assistant
    let max_chars = ((frame.width as i32 - 16) / GLYPH_ADVANCE).max(1) as usize;
    let mut lines = wrap_text(&hud.assistant_text, max_chars);
    lines.truncate(ASSISTANT_LINES);
    let band = (lines.len() as i32 + 1) * line + 4;
    let top = frame.height as i32 - band;
    shade_rect(frame, 0, top, frame.width as i32, band);
    let title = if assistant_busy { "ASSISTANT (THINKING...)  A SCENE  H HOW" } else { "ASSISTANT  A SCENE  H HOW" };
    draw_text_5x7(frame, 8, top + 4, title, GREEN);
    for (i, text) in lines.iter().enumerate() {
        draw_text_5x7(frame, 8, top + 4 + (i as i32 + 1) * line, text, WHITE);
    }
}
