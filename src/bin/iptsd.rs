use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use ipts::{Config, Contact, Decoder, EventSink, StylusEvent};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    about = "Decodes raw Intel Precise Touch & Stylus (IPTS) buffers into stylus and touch contact events. Input is the IPTS character device or a recorded dump of it."
)]
struct Opt {
    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "TOML file overriding the pipeline defaults"
    )]
    config: Option<PathBuf>,

    #[structopt(
        long,
        default_value = "16384",
        help = "Maximum size of one device buffer"
    )]
    buffer_size: usize,

    #[structopt(
        short = "F",
        long,
        help = "Keep the source open after reading through it and decode new data as it is written, like `tail -f'"
    )]
    follow: bool,

    #[structopt(
        short,
        long,
        parse(from_occurrences),
        help = "Log skipped records and pipeline diagnostics; twice for per-report detail"
    )]
    verbose: u8,

    #[structopt(
        name = "DEVICE",
        parse(from_os_str),
        help = "IPTS character device or recorded dump"
    )]
    device: PathBuf,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut builder = env_logger::Builder::new();
    builder.filter_level(match opt.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });
    // RUST_LOG still wins over the flag
    builder.parse_default_env();
    builder.init();

    let config: Config = match &opt.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {:?}", path))?;
            toml::from_str(&raw).with_context(|| format!("failed to parse {:?}", path))?
        }
        None => Config::default(),
    };

    let mut decoder = Decoder::new(&config).context("configuration rejected")?;
    let mut source =
        File::open(&opt.device).with_context(|| format!("failed to open {:?}", opt.device))?;

    let mut sink = PrintSink::default();
    let mut buffer = vec![0; opt.buffer_size];

    loop {
        let read = source
            .read(&mut buffer)
            .with_context(|| format!("failed to read from {:?}", opt.device))?;

        if read == 0 {
            if opt.follow {
                thread::sleep(Duration::from_millis(10));
                continue;
            }
            break;
        }

        decoder.process(&buffer[..read], &mut sink);
    }

    Ok(())
}

/// Prints every decoded event; stands in for an OS event backend.
#[derive(Default)]
struct PrintSink {
    frames: u64,
}

impl EventSink for PrintSink {
    fn emit_stylus(&mut self, event: &StylusEvent) {
        println!("{:?}", event);
    }

    fn emit_contacts(&mut self, frame: &[Contact]) {
        self.frames += 1;

        if frame.is_empty() {
            return;
        }

        println!("frame {}:", self.frames);
        for contact in frame {
            println!("  {:?}", contact);
        }
    }
}
