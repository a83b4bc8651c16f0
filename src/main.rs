use std::env;
use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use env_logger::Env;
use log::info;

use cg_labs::{write_summary, Demo, DemoApp, DemoSettings, WindowInitError};

const USAGE: &str = "Usage: cg-labs <shapes|solar> [--summary-only] [--shader-dir DIR] \
[--texture-dir DIR] [--strip-sphere] [--no-cycle]";

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let settings = options.settings();

    if options.summary_only {
        return print_summary(&settings);
    }
    info!("starting {} demo", settings.demo);
    match DemoApp::run(settings.clone()) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                print_summary(&settings)
            } else {
                Err(err)
            }
        }
    }
}

fn print_summary(settings: &DemoSettings) -> Result<()> {
    let stdout = io::stdout();
    write_summary(settings, &mut stdout.lock()).context("failed to summarise demo")
}

struct CliOptions {
    demo: Demo,
    summary_only: bool,
    shader_dir: Option<PathBuf>,
    texture_dir: Option<PathBuf>,
    strip_sphere: bool,
    no_cycle: bool,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(demo) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let demo: Demo = demo.parse().context(USAGE)?;

        let mut options = Self {
            demo,
            summary_only: false,
            shader_dir: None,
            texture_dir: None,
            strip_sphere: false,
            no_cycle: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                "--strip-sphere" => options.strip_sphere = true,
                "--no-cycle" => options.no_cycle = true,
                "--shader-dir" | "--texture-dir" => {
                    let Some(value) = args.next() else {
                        return Err(anyhow!("{arg} expects a directory. {USAGE}"));
                    };
                    if arg == "--shader-dir" {
                        options.shader_dir = Some(PathBuf::from(value));
                    } else {
                        options.texture_dir = Some(PathBuf::from(value));
                    }
                }
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }

    fn settings(&self) -> DemoSettings {
        let mut settings = DemoSettings::for_demo(self.demo);
        settings.shader_dir = self.shader_dir.clone();
        if let Some(dir) = &self.texture_dir {
            settings.texture_dir = dir.clone();
        }
        settings.solar.strip_sphere = self.strip_sphere;
        if self.no_cycle {
            settings.solar.day_night_period = None;
        }
        settings
    }
}
