mod args;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use bpaf::Parser;

use mfmfox::chs::Chs;
use mfmfox::config::CodecConfig;
use mfmfox::disk::MAX_TRACKS;
use mfmfox::{bitstream, format};

use args::{Cli, Command, GlobalOptions};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();
}

fn nsectors_per_track(global: &GlobalOptions) -> usize {
    if let Some(n) = global.sectors_per_track {
        return n;
    }
    if global.amiga {
        format::amiga::SECTORS_PER_TRACK
    } else if global.bk {
        10
    } else {
        9
    }
}

fn is_amiga(global: &GlobalOptions, path: &Path) -> Result<bool> {
    if global.amiga {
        return Ok(true);
    }
    if global.bk {
        return Ok(false);
    }
    let mut file = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    Ok(format::detect_amiga(&mut file)?)
}

fn run_info(global: &GlobalOptions, path: &Path) -> Result<()> {
    let amiga = is_amiga(global, path)?;
    println!("Format: {}", if amiga { "Amiga" } else { "IBM PC" });

    let mut file = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let ntracks = if global.verbose > 0 { MAX_TRACKS } else { 1 };

    for track in 0..ntracks {
        let mut reader = bitstream::seek_reader(&mut file, track)?;
        let mut order = Vec::new();
        let mut gaps = Vec::new();
        let mut seen = Vec::new();

        loop {
            let result = if amiga {
                format::amiga::read_sector(&mut reader).map(|r| (r.sector, r.sector_gap_bits, r.status))
            } else {
                format::ibmpc::read_sector(&mut reader).map(|r| (r.sector, r.sector_gap_bits, r.status))
            };
            match result {
                Some((sector, gap, status)) => {
                    order.push(sector + 1);
                    gaps.push(gap);
                    if sector >= seen.len() {
                        seen.resize(sector + 1, false);
                    }
                    seen[sector] = true;
                    if !status.is_empty() {
                        println!("  sector {}: {}", sector + 1, status);
                    }
                }
                None => break,
            }
        }

        println!("Track {}: {} sectors, order {:?}, gaps {:?}", Chs::from_track(track), seen.len(), order, gaps);
        for (i, present) in seen.iter().enumerate() {
            if !present {
                println!("  missing sector {}", i + 1);
            }
        }
    }
    Ok(())
}

fn run_extract(global: &GlobalOptions, in_path: &Path, out_path: &Path) -> Result<()> {
    let amiga = is_amiga(global, in_path)?;
    let mut input =
        BufReader::new(File::open(in_path).with_context(|| format!("opening {}", in_path.display()))?);
    let disk = if amiga {
        format::amiga::read_disk(&mut input, MAX_TRACKS)?
    } else {
        format::ibmpc::read_disk(&mut input, MAX_TRACKS)?
    };

    let mut output =
        BufWriter::new(File::create(out_path).with_context(|| format!("creating {}", out_path.display()))?);
    mfmfox::image_io::write_raw(&mut output, &disk)?;
    println!(
        "Extracted {} tracks, {} sectors/track to {}",
        disk.ntracks(),
        disk.nsectors_per_track(),
        out_path.display()
    );
    Ok(())
}

fn run_create(global: &GlobalOptions, out_path: &Path, in_path: Option<&Path>) -> Result<()> {
    let nsectors = nsectors_per_track(global);
    let disk = match in_path {
        Some(path) => {
            let mut input = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
            let total_len = std::fs::metadata(path)?.len();
            mfmfox::image_io::read_raw(&mut input, total_len, nsectors)?
        }
        None => mfmfox::DiskImage::new(MAX_TRACKS, nsectors)?,
    };

    let cfg = CodecConfig { suppress_index_mark: global.bk, ..CodecConfig::default() };
    let mut output =
        BufWriter::new(File::create(out_path).with_context(|| format!("creating {}", out_path.display()))?);
    if global.amiga {
        format::amiga::write_disk(&mut output, &disk, &cfg)?;
    } else {
        format::ibmpc::write_disk(&mut output, &disk, &cfg)?;
    }
    println!(
        "Created {} tracks, {} sectors/track at {}",
        disk.ntracks(),
        disk.nsectors_per_track(),
        out_path.display()
    );
    Ok(())
}

fn run_dump(path: &Path, verbose: u8) -> Result<()> {
    let mut file = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    for track in 0..MAX_TRACKS {
        let mut reader = bitstream::seek_reader(&mut file, track)?;
        println!("Track {}:", Chs::from_track(track));

        let mut last_b = 0u8;
        let mut i = 0usize;
        loop {
            let (a, b) = if verbose > 0 {
                let b = match reader.read_halfbit() {
                    Some(b) => b,
                    None => break,
                };
                (b, b)
            } else {
                let a = reader.read_halfbit();
                let b = reader.read_halfbit();
                let (a, b) = match (a, b) {
                    (Some(a), Some(b)) => (a, b),
                    _ => break,
                };
                let a = if a == 0 && b == 0 && last_b != 0 { 1 } else { a };
                last_b = b;
                (a, b)
            };

            if verbose > 0 || a != b {
                print!("{b}");
            } else {
                print!("{}", if b != 0 { "#" } else { "_" });
            }
            if i & 63 == 63 {
                println!();
            }
            i += 1;
        }
        println!();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli: Cli = args::cli().to_options().run();
    init_logging(cli.global.verbose);

    match &cli.command {
        Command::Info { path } => run_info(&cli.global, path),
        Command::Extract { in_path, out_path } => run_extract(&cli.global, in_path, out_path),
        Command::Create { out_path, in_path } => run_create(&cli.global, out_path, in_path.as_deref()),
        Command::Dump { path } => run_dump(path, cli.global.verbose),
    }
}
