use clap::{arg,crate_version,Command};
use indicatif::{ProgressBar,ProgressStyle};
use lzwhuff::{lzw_huff,container::Artifact,STD_OPTIONS};
use std::time::Instant;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";
const COMPRESSED_EXT: &str = ".compr";
const EXPANDED_EXT: &str = ".decompr";

fn ok_to_overwrite(path_out: &str) -> bool {
    if let Ok(_f) = std::fs::File::open(path_out) {
        let mut ans = String::new();
        eprint!("{} exists, overwrite? (y/n) ",path_out);
        if std::io::stdin().read_line(&mut ans).is_err() {
            return false;
        }
        return ans.trim_end()=="y" || ans.trim_end()=="Y";
    }
    true
}

/// `my_file` becomes `my_file.compr`
fn compressed_name(path_in: &str) -> String {
    [path_in,COMPRESSED_EXT].concat()
}

/// `my_file.compr` becomes `my_file.decompr`, anything else gets `.decompr` appended
fn expanded_name(path_in: &str) -> String {
    match path_in.strip_suffix(COMPRESSED_EXT) {
        Some(stem) if !stem.is_empty() => [stem,EXPANDED_EXT].concat(),
        _ => [path_in,EXPANDED_EXT].concat()
    }
}

/// Percentage bar on stderr, hidden when stderr is not a terminal
fn create_progress_bar(verb: &str) -> Result<ProgressBar,Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")?
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(verb.to_string());
    Ok(pb)
}

/// Callback for the codec, moves the bar to the reported percentage
fn on_progress(pb: &ProgressBar) -> impl FnMut(f64) + '_ {
    move |percent: f64| pb.set_position(percent as u64)
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress:      `lzwhuff compress -i my_file -o my_file.compr`
Expand:        `lzwhuff expand -i my_file.compr -o my_file`
Inspect:       `lzwhuff inspect -i my_file.compr`";

    let mut main_cmd = Command::new("lzwhuff")
        .about("Compress and expand with LZW followed by Huffman coding")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path, default appends .compr").required(false))
        .about("compress a file"));

    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path, default replaces .compr with .decompr").required(false))
        .about("expand a file"));

    main_cmd = main_cmd.subcommand(Command::new("inspect")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .about("show the structure of a compressed file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = match cmd.get_one::<String>("output") {
            Some(p) => p.to_string(),
            None => compressed_name(path_in)
        };
        if !ok_to_overwrite(&path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let start = Instant::now();
        let mut in_file = std::fs::File::open(path_in)?;
        let mut obuf: Vec<u8> = Vec::new();
        let pb = create_progress_bar("compressing")?;
        let (in_size,out_size) = lzw_huff::compress(&mut in_file,&mut obuf,&STD_OPTIONS,Some(&mut on_progress(&pb)))?;
        pb.finish_and_clear();
        std::fs::write(&path_out,&obuf)?;
        let gain = (1.0 - out_size as f64 / in_size as f64) * 100.0;
        eprintln!("compressed {} into {} (gain {:.2}%, {:.2}s)",in_size,out_size,gain,start.elapsed().as_secs_f64());
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = match cmd.get_one::<String>("output") {
            Some(p) => p.to_string(),
            None => expanded_name(path_in)
        };
        if !ok_to_overwrite(&path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let start = Instant::now();
        let mut in_file = std::fs::File::open(path_in)?;
        let mut obuf: Vec<u8> = Vec::new();
        let pb = create_progress_bar("expanding")?;
        let (in_size,out_size) = lzw_huff::expand(&mut in_file,&mut obuf,&STD_OPTIONS,Some(&mut on_progress(&pb)))?;
        pb.finish_and_clear();
        std::fs::write(&path_out,&obuf)?;
        eprintln!("expanded {} into {} ({:.2}s)",in_size,out_size,start.elapsed().as_secs_f64());
    }

    if let Some(cmd) = matches.subcommand_matches("inspect") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let buf = std::fs::read(path_in)?;
        let artifact = Artifact::from_bytes(&buf)?;
        println!("{}",artifact.summary());
    }

    Ok(())
}

#[test]
fn default_names() {
    assert_eq!(compressed_name("notes.txt"),"notes.txt.compr");
    assert_eq!(expanded_name("notes.txt.compr"),"notes.txt.decompr");
    assert_eq!(expanded_name("notes.bin"),"notes.bin.decompr");
    assert_eq!(expanded_name(".compr"),".compr.decompr");
}

#[test]
fn progress_bar_follows_callback() -> STDRESULT {
    let pb = create_progress_bar("compressing")?;
    assert_eq!(pb.length(),Some(100));
    let mut report = on_progress(&pb);
    report(0.0);
    assert_eq!(pb.position(),0);
    report(42.7);
    assert_eq!(pb.position(),42);
    report(100.0);
    assert_eq!(pb.position(),100);
    Ok(())
}
