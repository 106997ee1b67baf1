//! Landing Page Motion Demo
//!
//! Demonstrates the unveil_motion toolkit end to end:
//! - Engine seam: one-time scheduler load with baseline fallback
//! - Sequenced intro: counter, logo, tagline, exit hand-over
//! - Scroll reveals: single node, staggered cards, per-character text
//! - Scramble decode and an infinite marquee drift
//!
//! The stage is headless; this demo drives it with a simulated frame
//! loop and prints the state a renderer would consume.
//!
//! Run with: cargo run -p unveil_motion --example landing_demo

use unveil_core::{CapabilityService, EnvironmentProbe, PointerClass, Vec2};
use unveil_core::geometry::Bounds;
use unveil_motion::{
    engine, initialize_engine, marquee, reveal, stagger_reveal, DefaultLoader, IntroController,
    IntroTimings, MotionSettings, MotionSpec, Scramble, SplitMode, Stage, TextReveal,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Host environment
// ============================================================================

struct DesktopProbe;

impl EnvironmentProbe for DesktopProbe {
    fn pointer_class(&self) -> Option<PointerClass> {
        Some(PointerClass::Fine)
    }

    fn touch_points(&self) -> Option<u32> {
        Some(0)
    }

    fn viewport_size(&self) -> Option<Vec2> {
        Some(Vec2::new(1280.0, 720.0))
    }
}

const FRAME_MS: f32 = 16.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let settings = MotionSettings::from_toml_str(
        r#"
        default_duration_ms = 500
        default_stagger_ms = 80
        "#,
    )?;
    let capabilities = CapabilityService::new(&DesktopProbe);
    let engine = {
        initialize_engine(&DefaultLoader);
        engine()
    };
    let scheduler = engine
        .scheduler()
        .cloned()
        .expect("default loader always yields a scheduler");

    // ========================================================================
    // Stage layout
    // ========================================================================

    let stage = Stage::new();
    stage.set_viewport(Vec2::new(1280.0, 720.0));

    let overlay = stage.create_named("overlay");
    let hero = stage.create_node();
    stage.set_bounds(hero, Bounds::new(0.0, 780.0, 1280.0, 480.0));
    let cards = stage.create_node();
    stage.set_bounds(cards, Bounds::new(0.0, 1400.0, 1280.0, 360.0));
    for _ in 0..4 {
        stage.create_child(cards);
    }
    let headline = stage.create_node();
    stage.set_bounds(headline, Bounds::new(0.0, 1900.0, 1280.0, 120.0));
    let decoder = stage.create_node();
    stage.set_bounds(decoder, Bounds::new(0.0, 2100.0, 1280.0, 60.0));
    let ticker = stage.create_node();

    // ========================================================================
    // Intro
    // ========================================================================

    let timings = IntroTimings {
        counter_ms: 1200,
        logo_offset_ms: 200,
        tagline_offset_ms: 500,
        exit_ms: 400,
        ..settings.intro
    };
    let handed_over = Arc::new(AtomicBool::new(false));
    let handed = handed_over.clone();
    let intro = IntroController::mount(&engine, &stage, overlay, timings, &capabilities, move || {
        handed.store(true, Ordering::SeqCst);
    });

    let mut frame = 0u32;
    while !handed_over.load(Ordering::SeqCst) {
        scheduler.advance(FRAME_MS);
        frame += 1;
        if frame % 15 == 0 {
            println!(
                "intro {:>5.0}ms  counter {}  phase {:?}",
                frame as f32 * FRAME_MS,
                intro.counter_display(),
                intro.phase(),
            );
        }
    }
    println!("intro complete, overlay detached\n");

    // ========================================================================
    // Scroll content
    // ========================================================================

    let spec = MotionSpec {
        duration_ms: settings.default_duration_ms,
        ..Default::default()
    };
    let _hero_reveal = reveal(&engine, &stage, hero, spec, &capabilities);
    let _cards_cascade = stagger_reveal(
        &engine,
        &stage,
        cards,
        spec,
        settings.default_stagger_ms,
        &capabilities,
    );
    let _headline_reveal = TextReveal::mount(
        &engine,
        &stage,
        headline,
        "Motion that yields",
        SplitMode::Words,
        settings.default_stagger_ms,
        24.0,
        &capabilities,
    );
    let _decode = Scramble::mount(&engine, &stage, decoder, "SIGNAL LOCKED", 800, &capabilities);
    let _drift = marquee(&engine, &stage, ticker, 640.0, 4000, &capabilities);

    let mut scroll = 0.0f32;
    for frame in 0..240u32 {
        scroll += 12.0;
        stage.set_scroll(scroll);
        scheduler.advance(FRAME_MS);

        if frame % 40 == 0 {
            let hero_style = stage.style(hero).unwrap_or_default();
            let first_card = stage.children(cards).first().copied();
            let card_opacity = first_card
                .and_then(|c| stage.style(c))
                .map(|s| s.opacity)
                .unwrap_or_default();
            println!(
                "scroll {:>6.0}  hero opacity {:.2}  card[0] opacity {:.2}  ticker x {:>7.1}  \"{}\"",
                scroll,
                hero_style.opacity,
                card_opacity,
                stage.style(ticker).unwrap_or_default().translate.x,
                stage.text(decoder).unwrap_or_default(),
            );
        }
    }

    println!("\nfinal decode: \"{}\"", stage.text(decoder).unwrap_or_default());
    Ok(())
}
