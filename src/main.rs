//! Thin command-line driver: detect an image's geometry and list its files.

use std::path::Path;
use std::process::ExitCode;

use discwalk::browse::{DescriptorSource, DirParser, MAX_SCAN_DEPTH};
use discwalk::io::FileSource;
use discwalk::media::{self, MediaSourceDescriptor};

fn main() -> ExitCode {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: discwalk <image.iso|image.bin>");
        return ExitCode::FAILURE;
    };

    match run(Path::new(&path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut src = FileSource::open(path)?;
    let mut desc = MediaSourceDescriptor::new(src.len());
    media::detect_media_description(&mut desc, &mut src)?;

    println!(
        "{}: {} sectors of {} bytes (file header {}, lead-in {})",
        path.display(),
        desc.num_sectors,
        desc.sector_size,
        desc.offset_file_header,
        desc.offset_sector_leadin
    );
    if desc.dvd_layer_break_sector != 0 {
        println!(
            "dual-layer DVD, layer break at sector {}",
            desc.dvd_layer_break_sector
        );
    }

    let mut parser = DirParser::new(DescriptorSource::new(desc, src));
    parser.read_filesystem(
        &mut |entry| {
            let kind = if entry.is_directory() { "d" } else { "-" };
            println!(
                "{kind} {:>10}  {}  (sector {})",
                entry.len,
                entry.display_name(),
                entry.start_sector
            );
        },
        MAX_SCAN_DEPTH,
    )?;
    Ok(())
}
