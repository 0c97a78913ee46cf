//! The Parallax render test runner
//!
//! Renders the built-in scenes through the whole pipeline (register setup, compositing, depth
//! buffer, reprojection, save states) and checks properties of the finished frames.

extern crate parallax_core;
extern crate parallax_scenes;
extern crate term;

use parallax_core::ppu::{blend, light, Frame, MathOp, Ppu};
use parallax_core::reproject::{reproject, ReprojectionBuffers};
use parallax_scenes::{create_scene, Scene, SCENE_MAP};

use term::color;
use term::stdout as term_stdout;

use std::io::{self, Cursor, Write};
use std::process;

/// Describes how a test has failed
struct TestFailure(String);

type TestResult = Result<(), TestFailure>;

/// Fails the test with a formatted message unless `$cond` holds.
macro_rules! check {
    ( $cond:expr, $($arg:tt)+ ) => {
        if !$cond {
            return Err(TestFailure(format!($($arg)+)));
        }
    };
}

/// Sets up a fresh PPU for scene `name` and renders `frames` frames.
fn render(name: &str, frames: usize) -> Result<(Ppu, Box<dyn Scene>), TestFailure> {
    let mut scene = create_scene(name)
        .ok_or_else(|| TestFailure(format!("no scene named {}", name)))?;
    let mut ppu = Ppu::new();
    scene.setup(&mut ppu);
    for _ in 0..frames {
        ppu.render_frame(&mut *scene);
    }
    Ok((ppu, scene))
}

/// Color of logical pixel `x` on scanline `vcounter` (the main screen sample)
fn pixel(frame: &Frame, vcounter: u16, x: usize) -> Result<u32, TestFailure> {
    frame.pixel(x * 2 + 1, (vcounter as usize - 1) * 2)
        .ok_or_else(|| TestFailure(format!("({}, {}) is outside of the frame", x, vcounter)))
}

fn depth(frame: &Frame, vcounter: u16, x: usize) -> Result<u16, TestFailure> {
    frame.depth_at(x * 2 + 1, (vcounter as usize - 1) * 2)
        .ok_or_else(|| TestFailure(format!("({}, {}) is outside of the frame", x, vcounter)))
}

fn reprojected(frame: &Frame) -> Result<Vec<u32>, TestFailure> {
    let mut buffers = ReprojectionBuffers::default();
    let out = reproject(frame.color, frame.pitch, frame.width, frame.height,
                        frame.depth, frame.pitch, frame.far_depth, &mut buffers)
        .ok_or_else(|| TestFailure("reprojection failed".to_string()))?;
    Ok(out.color.to_vec())
}

/// Copies the visible rows out of the frame
fn visible(frame: &Frame) -> Vec<u32> {
    let mut pixels = Vec::with_capacity(frame.width * frame.height);
    for y in 0..frame.height {
        pixels.extend_from_slice(&frame.color[y * frame.pitch..y * frame.pitch + frame.width]);
    }
    pixels
}

fn deterministic() -> TestResult {
    for &name in SCENE_MAP.keys() {
        let (first, _) = render(name, 3)?;
        let (second, _) = render(name, 3)?;
        check!(first.framebuf == second.framebuf, "{}: frames differ between runs", name);
        check!(first.depth().buffer() == second.depth().buffer(),
            "{}: depth buffers differ between runs", name);
        check!(first.frame_count() == 3, "{}: frame count {}", name, first.frame_count());
    }
    Ok(())
}

fn flat_scene_has_no_depth() -> TestResult {
    let (ppu, _) = render("flat", 1)?;
    let frame = ppu.frame();
    check!(!ppu.depth().enabled(), "depth mode is on");
    check!(frame.depth.iter().all(|&d| d == frame.far_depth), "depth buffer was written");
    check!(reprojected(&frame)? == visible(&frame), "reprojection moved pixels");
    Ok(())
}

fn city_depth_layers() -> TestResult {
    let (ppu, _) = render("city", 1)?;
    let frame = ppu.frame();
    let far = frame.far_depth;
    check!(far == 0x1000, "far depth is {:04X}", far);

    // The sky sits on the far plane
    check!(depth(&frame, 1, 100)? == far, "sky has depth {:04X}", depth(&frame, 1, 100)?);
    // The first car covers x = 23..55 on lines 192..202 in frame 1
    let car = depth(&frame, 195, 30)?;
    check!(car == 0x00b0, "car has depth {:04X}", car);
    // Buildings are farther than the road, which is farther than the cars
    let building = depth(&frame, 170, 5)?;
    let road = depth(&frame, 178, 5)?;
    check!(building > road && road > car && building < far,
        "depth order: building {:04X}, road {:04X}, car {:04X}", building, road, car);

    check!(reprojected(&frame)? != visible(&frame), "reprojection didn't change the image");
    Ok(())
}

fn flat_and_city_share_colors() -> TestResult {
    // Depth mode only changes the result where depth decides against priority; the scenes
    // don't overlap layers of equal priority
    let (city, _) = render("city", 1)?;
    let (flat, _) = render("flat", 1)?;
    check!(visible(&city.frame()) == visible(&flat.frame()), "color output differs");
    Ok(())
}

fn blend_window() -> TestResult {
    // After 40 frames, the sprite covers x = 80..96 on lines 100..116, inside the window
    let (ppu, _) = render("blend", 40)?;
    let frame = ppu.frame();
    let cgram = ppu.cgram();
    let red = cgram.color(1);
    let yellow = cgram.color(17);

    let outside = pixel(&frame, 1, 0)?;
    check!(outside == light(red, 15), "outside the window: {:06X}", outside);
    let inside = pixel(&frame, 1, 64)?;
    let expected = light(blend(red, yellow, MathOp::Add, true), 15);
    check!(inside == expected, "inside the window: {:06X}, expected {:06X}", inside, expected);

    // The sprite uses an opaque palette and never blends
    let sprite = pixel(&frame, 100, 85)?;
    check!(sprite == light(cgram.color(130), 15), "sprite: {:06X}", sprite);
    Ok(())
}

fn hires_depth_alternates() -> TestResult {
    let (ppu, _) = render("hires", 1)?;
    let frame = ppu.frame();
    // Line 1, x = 0: BG1 stripe on the main screen, BG2 checker on the subscreen
    let samples = (frame.depth_at(0, 0), frame.depth_at(1, 0));
    check!(samples == (Some(0x1000), Some(0x0400)), "depth samples {:?}", samples);
    Ok(())
}

fn interlace_fields() -> TestResult {
    let mut scene = create_scene("city")
        .ok_or_else(|| TestFailure("no city scene".to_string()))?;
    let mut ppu = Ppu::new();
    scene.setup(&mut ppu);
    ppu.write_io(0x2133, 0x01);

    ppu.render_frame(&mut *scene);
    check!(ppu.field(), "first interlaced frame should be field 1");
    {
        let frame = ppu.frame();
        check!(frame.pixel(10, 0) == Some(0), "field 0 row was written");
        check!(frame.pixel(10, 1) != Some(0), "field 1 row is empty");
    }

    ppu.render_frame(&mut *scene);
    check!(!ppu.field(), "second interlaced frame should be field 0");
    check!(ppu.frame().pixel(10, 0) != Some(0), "field 0 row is empty");
    Ok(())
}

fn save_state_roundtrip() -> TestResult {
    let mut scene = create_scene("city")
        .ok_or_else(|| TestFailure("no city scene".to_string()))?;
    let mut original = Ppu::new();
    scene.setup(&mut original);

    let mut state = Vec::new();
    original.create_save_state(&mut state)
        .map_err(|e| TestFailure(format!("save failed: {}", e)))?;
    original.render_frame(&mut *scene);

    // A restored PPU renders the same frame without running the scene setup
    let mut scene = create_scene("city")
        .ok_or_else(|| TestFailure("no city scene".to_string()))?;
    let mut restored = Ppu::new();
    restored.restore_save_state(&mut Cursor::new(&state[..]))
        .map_err(|e| TestFailure(format!("restore failed: {}", e)))?;
    restored.render_frame(&mut *scene);

    check!(original.framebuf == restored.framebuf, "frames differ");
    check!(original.depth().buffer() == restored.depth().buffer(), "depth buffers differ");
    Ok(())
}

static TESTS: &[(&str, fn() -> TestResult)] = &[
    ("deterministic", deterministic),
    ("flat_scene_has_no_depth", flat_scene_has_no_depth),
    ("city_depth_layers", city_depth_layers),
    ("flat_and_city_share_colors", flat_and_city_share_colors),
    ("blend_window", blend_window),
    ("hires_depth_alternates", hires_depth_alternates),
    ("interlace_fields", interlace_fields),
    ("save_state_roundtrip", save_state_roundtrip),
];

/// Flushes stdout
fn flush() {
    io::stdout().flush().unwrap();
}

/// Prints `ok` or `FAILED`, depending on the passed value. Does not print a trailing newline.
/// Falls back to uncolored output if stdout isn't a terminal.
fn print_success(success: bool) {
    let text = if success { "ok" } else { "FAILED" };
    match term_stdout() {
        Some(mut term) => {
            let _ = term.fg(if success { color::GREEN } else { color::RED });
            print!("{}", text);
            flush();
            let _ = term.reset();
        }
        None => print!("{}", text),
    }
}

fn main() {
    println!();
    println!("running {} rendering tests", TESTS.len());
    let mut failures = Vec::new();
    for &(name, test) in TESTS {
        print!("test {} ... ", name);
        flush();

        let result = test();
        print_success(result.is_ok());
        println!();
        if let Err(TestFailure(msg)) = result {
            failures.push((name, msg));
        }
    }

    if !failures.is_empty() {
        println!();
        println!("failures:");
        for &(name, ref msg) in &failures {
            println!("    {}: {}", name, msg);
        }
    }

    println!();
    print!("test result: ");
    print_success(failures.is_empty());
    println!(". {} passed; {} failed", TESTS.len() - failures.len(), failures.len());
    println!();

    if !failures.is_empty() {
        process::exit(1);
    }
}
