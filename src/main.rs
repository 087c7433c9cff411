// What you SEE now:
// • A borderless, see-through window over the slide display.
// • Every student tap on the current slide shows up as a purple dot that fades out.
// • New slide (or `capture_now.txt` appearing) wipes the dots.
// • C clears the dots, S saves a PNG snapshot, ESC quits.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};

use slide_tap_overlay::Config;
use slide_tap_overlay::app::{App, Ticks};
use slide_tap_overlay::draw;
use slide_tap_overlay::mapping::{self, Region};
use slide_tap_overlay::overlay::Overlay;
use slide_tap_overlay::session::{MonitorMeta, OverlayEvent, SessionDoc, TapResponse};
use slide_tap_overlay::stale::StaleFilter;
use slide_tap_overlay::store::{LocalStore, SlidePublisher};
use slide_tap_overlay::surface::WindowSurface;
use slide_tap_overlay::trigger::{FileTrigger, TRIGGER_POLL};
use slide_tap_overlay::types::FrameBuffer;
use slide_tap_overlay::watcher::StoreWatcher;

/// Used when neither the config nor the session says how big the display is.
const FALLBACK_REGION: Region = Region::new(0, 0, 1280, 720);

#[derive(Parser)]
#[command(name = "slide-tap-overlay")]
#[command(version)]
#[command(about = "Show student taps as fading dots over the presented slide")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the overlay window and follow the session (default)
    Run,
    /// Render the stored taps of a slide to a PNG without opening a window
    Render {
        /// Slide index (defaults to the current slide)
        #[arg(long)]
        slide: Option<u32>,
        /// How old the dots are at the moment of rendering
        #[arg(long, default_value_t = 0)]
        age_ms: u64,
        /// Output file
        #[arg(long, default_value = "overlay.png")]
        out: PathBuf,
    },
    /// Publish a slide URL and make it the current slide
    AddSlide {
        url: String,
    },
    /// Record a test tap (normalized coordinates)
    Tap {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        /// Slide index (defaults to the current slide)
        #[arg(long)]
        slide: Option<u32>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_overlay(&config),
        Commands::Render { slide, age_ms, out } => render_png(&config, slide, age_ms, &out),
        Commands::AddSlide { url } => add_slide(&config, &url),
        Commands::Tap { x, y, slide } => add_tap(&config, x, y, slide),
    }
}

/// Where the overlay window goes: configured display, else the monitor the
/// current slide was captured on, else a fixed fallback.
fn overlay_region(config: &Config, store: &LocalStore) -> Result<Region> {
    if let Some(d) = config.display {
        return Ok(d);
    }
    let meta = store.read_session()?.and_then(|doc| doc.screenshot_meta);
    Ok(match meta {
        Some(m) if m.width > 0 && m.height > 0 => Region::new(0, 0, m.width, m.height),
        _ => FALLBACK_REGION,
    })
}

fn run_overlay(config: &Config) -> Result<()> {
    /* --- Store + window ---
       Visual: a transparent window appears; nothing is drawn yet. */
    let store = LocalStore::open(&config.session_dir)?;
    let region = overlay_region(config, &store)?;
    let surface = WindowSurface::new("Slide Tap Overlay", region)?;

    let stale = StaleFilter::from_grace_secs(Utc::now(), config.stale_grace_secs);
    let overlay = Overlay::new(config.dot_style()?, region, config.display, stale)
        .with_debug_background(config.debug_background);

    /* --- Background sources ---
       Visual: none directly; they feed taps and slide changes into the loop. */
    let (tx, rx) = mpsc::channel::<OverlayEvent>();
    let watcher = StoreWatcher::new(store.clone(), tx.clone())
        .spawn(Duration::from_millis(config.poll_interval_ms))
        .context("Failed to start session watcher")?;
    let cooldown = Duration::from_millis(config.trigger_cooldown_ms);
    let trigger = FileTrigger::new(&config.trigger_file, cooldown, tx)
        .spawn(TRIGGER_POLL)
        .context("Failed to start file trigger")?;

    /* --- Main loop ---
       Visual: dots appear, fade, and vanish until ESC. */
    let mut app = App::new(overlay, surface, store, rx, Ticks::from_config(config))
        .with_snapshot_dir(&config.snapshot_dir);
    let result = app.run();

    for handle in [&watcher, &trigger] {
        if handle.is_finished() {
            log::warn!("{} stopped before the overlay closed", handle.name());
        }
    }

    // Hang up the channel first so neither thread blocks on a send.
    drop(app);
    watcher.stop();
    trigger.stop();
    result?;
    Ok(())
}

fn render_png(config: &Config, slide: Option<u32>, age_ms: u64, out: &Path) -> Result<()> {
    let store = LocalStore::open(&config.session_dir)?;
    let Some(doc) = store.read_session()? else {
        bail!("No session in {}; publish a slide first", config.session_dir.display());
    };
    let region = overlay_region(config, &store)?;
    let slide = slide.unwrap_or(doc.slide_index);

    // Rendering is about a past session, so no stale cutoff.
    let stale = StaleFilter::new(Utc::now(), None);
    let mut overlay = Overlay::new(config.dot_style()?, region, config.display, stale)
        .with_debug_background(config.debug_background);

    let t0 = Instant::now();
    overlay.handle_event(OverlayEvent::SessionChanged(doc.clone()), t0);
    if slide != doc.slide_index {
        // Point the overlay at the requested slide without touching the store.
        let doc = SessionDoc { slide_index: slide, ..doc };
        overlay.handle_event(OverlayEvent::SessionChanged(doc), t0);
    }
    for response in store.read_responses(slide)? {
        overlay.handle_event(OverlayEvent::Tap { slide_index: slide, response }, t0);
    }

    let mut fb = FrameBuffer::new(region.width as usize, region.height as usize);
    let drawn = overlay.render(&mut fb, t0 + Duration::from_millis(age_ms));
    overlay.draw_hud(&mut fb, 0.0);
    draw::save_png(&fb, out)?;
    log::info!("Rendered {drawn} dot(s) for slide {} to {}", u64::from(slide) + 1, out.display());
    Ok(())
}

fn add_slide(config: &Config, url: &str) -> Result<()> {
    let mut store = LocalStore::open(&config.session_dir)?;
    let meta = config
        .display
        .map(|d| MonitorMeta { width: d.width, height: d.height, monitor_index: 0 });
    let index = store.publish(url, meta)?;
    println!("Slide {} is now current: {url}", u64::from(index) + 1);
    Ok(())
}

fn add_tap(config: &Config, x: f64, y: f64, slide: Option<u32>) -> Result<()> {
    mapping::validate_normalized(x, y)?;
    let store = LocalStore::open(&config.session_dir)?;
    let slide = match slide {
        Some(s) => s,
        None => match store.read_session()? {
            Some(doc) => doc.slide_index,
            None => bail!("No session in {}; publish a slide first", config.session_dir.display()),
        },
    };
    store.append_response(slide, &TapResponse::new(x, y, Utc::now()))?;
    println!("Recorded tap ({x:.3}, {y:.3}) on slide {}", u64::from(slide) + 1);
    Ok(())
}
