use simplegif::progress::ProgressReporter;
use simplegif::{BatchReport, Converter, EncodeOptions, GifEncoder, SampleConfig};

use clap::{App, AppSettings, Arg, ArgMatches};
use pbr::ProgressBar;

use std::fmt::Display;
use std::fs;
use std::io::Stdout;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

fn main() {
    if let Err(e) = bin_main() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn app() -> App<'static, 'static> {
    App::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about("Turns videos into looping GIFs")
        .setting(AppSettings::UnifiedHelpMessage)
        .setting(AppSettings::DeriveDisplayOrder)
        .setting(AppSettings::ArgRequiredElseHelp)
        .arg(Arg::with_name("output")
            .long("output")
            .short("o")
            .help("Folder to write GIFs to (created if needed)")
            .empty_values(false)
            .takes_value(true)
            .value_name("dir")
            .default_value("outputs"))
        .arg(Arg::with_name("scale")
            .long("scale")
            .short("s")
            .help("Size of the GIF relative to the video")
            .empty_values(false)
            .value_name("factor")
            .default_value("0.6"))
        .arg(Arg::with_name("less-colors")
            .long("less-colors")
            .help("Reduce color depth for smaller files (adds banding)"))
        .arg(Arg::with_name("max-frames")
            .long("max-frames")
            .short("m")
            .help("Read at most this many frames of each video")
            .empty_values(false)
            .value_name("num")
            .default_value("2000"))
        .arg(Arg::with_name("frame-skip")
            .long("frame-skip")
            .short("k")
            .help("Keep one frame out of this many (at least 1)")
            .empty_values(false)
            .value_name("num")
            .default_value("5"))
        .arg(Arg::with_name("quality")
            .long("quality")
            .value_name("1-100")
            .takes_value(true)
            .help("Lower quality may give smaller file"))
        .arg(Arg::with_name("no-optimize")
            .long("no-optimize")
            .help("Use a simpler palette generator"))
        .arg(Arg::with_name("fast")
            .long("fast")
            .help("Faster encoding, but lower quality and bigger file"))
        .arg(Arg::with_name("quiet")
            .long("quiet")
            .help("Do not show progress bars"))
        .arg(Arg::with_name("verbose")
            .long("verbose")
            .short("v")
            .help("Print diagnostic messages"))
        .arg(Arg::with_name("INPUT")
            .help("A video file (mp4, avi, mov, mkv) or a folder of them")
            .empty_values(false)
            .required(true))
}

fn bin_main() -> BinResult<()> {
    let matches = app().get_matches_from(wild::args_os());

    let log_level = if matches.is_present("verbose") { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let (config, options) = settings(&matches)?;
    config.validate()?;

    let input = Path::new(matches.value_of_os("INPUT").ok_or("Missing input")?);
    let output_dir = Path::new(matches.value_of_os("output").ok_or("Missing output")?);
    fs::create_dir_all(output_dir).map_err(|e| format!("Can't create {}: {}", output_dir.display(), e))?;

    let mut reporter = Console::new(matches.is_present("quiet"));
    let mut converter = Converter::new(opener(), GifEncoder::default(), options);
    let report = converter.convert_path(input, output_dir, &config, &mut reporter)?;

    summarize(input, &report)
}

fn settings(matches: &ArgMatches<'_>) -> BinResult<(SampleConfig, EncodeOptions)> {
    let config = SampleConfig {
        scale: parse(matches, "scale")?,
        less_colors: matches.is_present("less-colors"),
        max_frames: parse(matches, "max-frames")?,
        frame_skip: parse(matches, "frame-skip")?,
    };
    let quality: Option<u8> = match matches.value_of("quality") {
        Some(_) => Some(parse(matches, "quality")?),
        None => None,
    };
    let options = EncodeOptions {
        optimize_palette: !matches.is_present("no-optimize"),
        quality: quality.unwrap_or(100).max(1).min(100),
        fast: matches.is_present("fast"),
        ..EncodeOptions::default()
    };
    Ok((config, options))
}

fn parse<T: FromStr>(matches: &ArgMatches<'_>, name: &str) -> BinResult<T> where T::Err: Display {
    let value = matches.value_of(name).ok_or_else(|| format!("Missing {}", name))?;
    Ok(value.parse().map_err(|e| format!("Invalid {} '{}': {}", name, value, e))?)
}

fn summarize(input: &Path, report: &BatchReport) -> BinResult<()> {
    if input.is_dir() {
        if report.inputs() == 0 {
            println!("No videos found in {}", input.display());
        } else {
            println!("Converted {} of {} videos", report.saved.len(), report.inputs());
        }
    }
    if report.has_failures() {
        return Err(format!("{} of {} inputs failed", report.failed.len(), report.inputs()).into());
    }
    Ok(())
}

#[cfg(feature = "video")]
fn opener() -> simplegif::FfmpegOpener {
    simplegif::FfmpegOpener::default()
}

#[cfg(not(feature = "video"))]
fn opener() -> NoVideoSupport {
    NoVideoSupport {}
}

#[cfg(not(feature = "video"))]
struct NoVideoSupport {}

#[cfg(not(feature = "video"))]
impl simplegif::SourceOpener for NoVideoSupport {
    fn open(&mut self, path: &Path) -> simplegif::CatResult<Box<dyn simplegif::FrameSource>> {
        Err(simplegif::Error::SourceUnavailable(path.to_path_buf(), "This executable has been compiled without video support".into()))
    }
}

/// Status lines on stdout, with a progress bar for each phase
struct Console {
    quiet: bool,
    bar: Option<ProgressBar<Stdout>>,
}

impl Console {
    fn new(quiet: bool) -> Self {
        Self { quiet, bar: None }
    }
}

impl ProgressReporter for Console {
    fn begin(&mut self, total: u64, msg: &str) {
        if let Some(mut pb) = self.bar.take() {
            pb.finish();
        }
        println!("{}", msg);
        if !self.quiet {
            let mut pb = ProgressBar::new(total);
            pb.show_speed = false;
            pb.show_percent = false;
            pb.format(" #_. ");
            pb.message("Frame ");
            pb.set_max_refresh_rate(Some(Duration::from_millis(250)));
            self.bar = Some(pb);
        }
    }

    fn increase(&mut self) -> bool {
        if let Some(pb) = &mut self.bar {
            pb.inc();
        }
        true
    }

    fn error(&mut self, message: String) {
        if let Some(mut pb) = self.bar.take() {
            pb.finish();
        }
        eprintln!("{}\n", message);
    }

    fn done(&mut self, msg: &str) {
        match self.bar.take() {
            Some(mut pb) => pb.finish_print(msg),
            None => println!("{}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_for(args: &[&str]) -> BinResult<(SampleConfig, EncodeOptions)> {
        let mut argv = vec!["simplegif"];
        argv.extend_from_slice(args);
        argv.push("clip.mp4");
        settings(&app().get_matches_from_safe(argv)?)
    }

    #[test]
    fn defaults_match_library() {
        let (config, options) = settings_for(&[]).unwrap();
        assert_eq!(SampleConfig::default(), config);
        assert_eq!(EncodeOptions::default(), options);
    }

    #[test]
    fn flags() {
        let (config, options) = settings_for(&["-s", "0.25", "--less-colors", "-m", "10", "-k", "1", "--no-optimize", "--fast", "--quality", "150"]).unwrap();
        assert_eq!(SampleConfig { scale: 0.25, less_colors: true, max_frames: 10, frame_skip: 1 }, config);
        assert!(!options.optimize_palette);
        assert!(options.fast);
        assert_eq!(100, options.quality);
        assert_eq!(100, options.frame_delay_ms);
        assert_eq!(0, options.loop_count);
    }

    #[test]
    fn numbers_are_checked() {
        assert!(settings_for(&["-k", "two"]).is_err());
        assert!(settings_for(&["--max-frames", "-3"]).is_err());
        let (config, _) = settings_for(&["-k", "0"]).unwrap();
        assert!(config.validate().is_err());
    }
}
