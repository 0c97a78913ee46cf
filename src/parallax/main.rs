#![deny(unused_import_braces)]

#[macro_use] extern crate log;
extern crate clap;
extern crate env_logger;
extern crate png;

extern crate parallax_core;
extern crate parallax_scenes as scenes;

mod script;

use parallax_core::ppu::{to_rgb24, Ppu};
use parallax_core::reproject::{reproject, ReprojectionBuffers};
use scenes::Scene;

use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::process;

/// An RGB24 image ready to be written out
struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

fn build_app() -> clap::App<'static, 'static> {
    clap::App::new("parallax")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Renders SNES-style scenes with a depth buffer and optional 2.5D reprojection")
        .arg(clap::Arg::with_name("output")
            .required(true)
            .value_name("PNG_PATH")
            .takes_value(true)
            .help("Where to write the rendered frame"))
        .arg(clap::Arg::with_name("scene")
            .short("s")
            .long("scene")
            .takes_value(true)
            .help("The scene to render"))
        .arg(clap::Arg::with_name("frames")
            .short("n")
            .long("frames")
            .takes_value(true)
            .help("Number of frames to render (the last one is written)"))
        .arg(clap::Arg::with_name("reproject")
            .long("reproject")
            .help("Reproject the frame using its depth buffer"))
        .arg(clap::Arg::with_name("depth")
            .long("depth")
            .help("Force depth mode on"))
        .arg(clap::Arg::with_name("override")
            .long("override")
            .help("Let nearer pixels win against higher priority ones (implies --depth)"))
        .arg(clap::Arg::with_name("no-clamp")
            .long("no-clamp")
            .help("Let depth values wrap around instead of saturating"))
        .arg(clap::Arg::with_name("far")
            .long("far")
            .takes_value(true)
            .value_name("DEPTH")
            .help("Far depth (hex)"))
        .arg(clap::Arg::with_name("brightness")
            .long("brightness")
            .takes_value(true)
            .help("Master brightness (0-15)"))
        .arg(clap::Arg::with_name("overscan")
            .long("overscan")
            .help("Render 239 instead of 224 lines"))
        .arg(clap::Arg::with_name("interlace")
            .long("interlace")
            .help("Enable interlace (alternates between two fields)"))
        .arg(clap::Arg::with_name("regs")
            .long("regs")
            .takes_value(true)
            .value_name("FILE")
            .help("Register script to apply after the scene is set up"))
        .arg(clap::Arg::with_name("savestate")
            .long("savestate")
            .takes_value(true)
            .help("The save state file to load before rendering"))
        .arg(clap::Arg::with_name("save")
            .long("save")
            .takes_value(true)
            .help("Write a save state to this file after rendering"))
}

/// Looks up the scene by name, listing the known scenes if there's none with that name.
fn select_scene(name: &str) -> Result<Box<dyn Scene>, Box<dyn Error>> {
    match scenes::create_scene(name) {
        Some(scene) => {
            info!("rendering scene '{}': {}", name, scene.description());
            Ok(scene)
        }
        None => {
            println!("{} scenes known:", scenes::SCENE_MAP.len());
            for (name, create) in scenes::SCENE_MAP.iter() {
                println!("\t{}\t{}", name, create().description());
            }
            Err(format!("unknown scene: {}", name).into())
        }
    }
}

/// Read-modify-write of a register bit
fn set_bit(ppu: &mut Ppu, addr: u16, mask: u8, set: bool) {
    let value = match addr {
        0x2100 => ppu.inidisp(),
        0x2133 => ppu.setini(),
        _ => ppu.read_io(addr),
    };
    ppu.write_io(addr, if set { value | mask } else { value & !mask });
}

/// Applies the command line overrides on top of the scene's register setup.
fn apply_args(ppu: &mut Ppu, args: &clap::ArgMatches) -> Result<(), Box<dyn Error>> {
    if args.is_present("depth") || args.is_present("override") {
        set_bit(ppu, 0x21c0, 0x01, true);
    }
    if args.is_present("override") {
        set_bit(ppu, 0x21c0, 0x02, true);
    }
    if args.is_present("no-clamp") {
        set_bit(ppu, 0x21c0, 0x04, false);
    }
    if let Some(far) = args.value_of("far") {
        let far = u16::from_str_radix(far.trim_start_matches("0x"), 16)
            .map_err(|e| format!("invalid far depth `{}`: {}", far, e))?;
        ppu.write_io(0x21c1, far as u8);
        ppu.write_io(0x21c2, (far >> 8) as u8);
    }
    if let Some(brightness) = args.value_of("brightness") {
        let brightness = brightness.parse::<u8>()
            .map_err(|e| format!("invalid brightness `{}`: {}", brightness, e))?;
        if brightness > 15 {
            return Err(format!("brightness must be 0-15, got {}", brightness).into());
        }
        let inidisp = ppu.inidisp();
        ppu.write_io(0x2100, inidisp & 0xf0 | brightness);
    }
    if args.is_present("overscan") {
        set_bit(ppu, 0x2133, 0x04, true);
    }
    if args.is_present("interlace") {
        set_bit(ppu, 0x2133, 0x01, true);
    }
    if let Some(path) = args.value_of("regs") {
        let text = fs::read_to_string(path)?;
        let writes = script::parse(&text).map_err(|e| format!("{}: {}", path, e))?;
        info!("applying {} register writes from {}", writes.len(), path);
        for (addr, value) in writes {
            ppu.write_io(addr, value);
        }
    }
    Ok(())
}

/// Converts the visible frame to RGB24, reprojecting it first if requested.
fn present(ppu: &Ppu, reprojection: bool) -> Result<Image, Box<dyn Error>> {
    let frame = ppu.frame();
    let data = if reprojection {
        if !ppu.depth().enabled() {
            warn!("depth mode is off, the reprojection won't move anything");
        }

        let mut buffers = ReprojectionBuffers::default();
        let out = reproject(frame.color, frame.pitch, frame.width, frame.height,
                            frame.depth, frame.pitch, frame.far_depth, &mut buffers)
            .ok_or("reprojection failed")?;
        to_rgb24(out.color, frame.width, frame.height, out.pitch)
    } else {
        frame.to_rgb24()
    };

    Ok(Image {
        data: data,
        width: frame.width,
        height: frame.height,
    })
}

fn write_png(path: &str, image: &Image) -> Result<(), Box<dyn Error>> {
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(file, image.width as u32, image.height as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.data)?;
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = build_app().get_matches();

    let scene_name = args.value_of("scene").unwrap_or(scenes::DEFAULT_SCENE);
    let mut scene = select_scene(scene_name)?;
    let frames: u64 = match args.value_of("frames") {
        Some(n) => n.parse::<u64>().map_err(|e| format!("invalid frame count `{}`: {}", n, e))?,
        None => 1,
    };

    let mut ppu = Ppu::new();
    scene.setup(&mut ppu);
    if let Some(filename) = args.value_of("savestate") {
        let mut bufrd = BufReader::new(File::open(filename)?);
        ppu.restore_save_state(&mut bufrd)
            .map_err(|e| format!("couldn't restore {}: {}", filename, e))?;
    }
    apply_args(&mut ppu, &args)?;

    for _ in 0..frames {
        ppu.render_frame(&mut *scene);
    }
    debug!("rendered {} frames", ppu.frame_count());

    if let Some(filename) = args.value_of("save") {
        let mut file = File::create(filename)?;
        ppu.create_save_state(&mut file)?;
        info!("save state written to {}", filename);
    }

    // `output` is required
    let output = args.value_of("output").unwrap();
    let image = present(&ppu, args.is_present("reproject"))?;
    write_png(output, &image)?;
    info!("wrote {}x{} image to {}", image.width, image.height, output);

    Ok(())
}

fn main() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "parallax=INFO");
    }
    env_logger::init();

    if let Err(e) = run() {
        println!("error: {}", e);
        process::exit(1);
    }
}
