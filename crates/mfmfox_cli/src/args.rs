//! Command line surface for `mfmdisk`: inspect, extract, create, and dump MFM floppy images.

use std::path::PathBuf;

use bpaf::{construct, long, positional, short, Parser};

#[derive(Clone, Debug)]
pub(crate) enum Command {
    Info { path: PathBuf },
    Extract { in_path: PathBuf, out_path: PathBuf },
    Create { out_path: PathBuf, in_path: Option<PathBuf> },
    Dump { path: PathBuf },
}

#[derive(Clone, Debug)]
pub(crate) struct GlobalOptions {
    pub(crate) amiga: bool,
    pub(crate) bk: bool,
    pub(crate) sectors_per_track: Option<usize>,
    pub(crate) verbose: u8,
}

#[derive(Clone, Debug)]
pub(crate) struct Cli {
    pub(crate) global: GlobalOptions,
    pub(crate) command: Command,
}

fn global_options() -> impl Parser<GlobalOptions> {
    let amiga = long("amiga")
        .short('a')
        .help("Use Amiga format (default is IBM PC)")
        .switch();
    let bk = long("bk").short('b').help("Use BK-0010 format").switch();
    let sectors_per_track = long("sectors-per-track")
        .short('s')
        .argument::<usize>("N")
        .help("Use N sectors per track")
        .optional();
    let verbose = short('v')
        .long("verbose")
        .help("Increase diagnostic verbosity (repeatable)")
        .req_flag(())
        .many()
        .map(|flags| flags.len() as u8);

    construct!(GlobalOptions {
        amiga,
        bk,
        sectors_per_track,
        verbose,
    })
}

fn info_command() -> impl Parser<Command> {
    let path = positional::<PathBuf>("INPUT.mfm");
    construct!(Command::Info { path })
        .to_options()
        .descr("Show information about an MFM file")
        .command("info")
}

fn extract_command() -> impl Parser<Command> {
    let in_path = positional::<PathBuf>("INPUT.mfm");
    let out_path = positional::<PathBuf>("OUTPUT.img");
    construct!(Command::Extract { in_path, out_path })
        .to_options()
        .descr("Extract sector data from an MFM file into a raw binary image")
        .command("extract")
}

fn create_command() -> impl Parser<Command> {
    let out_path = positional::<PathBuf>("OUTPUT.mfm");
    let in_path = positional::<PathBuf>("INPUT.img").optional();
    construct!(Command::Create { out_path, in_path })
        .to_options()
        .descr("Create an MFM file, optionally from a raw binary image")
        .command("create")
}

fn dump_command() -> impl Parser<Command> {
    let path = positional::<PathBuf>("INPUT.mfm");
    construct!(Command::Dump { path })
        .to_options()
        .descr("Dump the raw bit contents of an MFM file")
        .command("dump")
}

pub(crate) fn cli() -> impl Parser<Cli> {
    let global = global_options();
    let info = info_command();
    let extract = extract_command();
    let create = create_command();
    let dump = dump_command();
    let command = construct!([info, extract, create, dump]);
    construct!(Cli { global, command })
}
