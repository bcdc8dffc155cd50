use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};

fn main() -> Result<()> {
    let matches = Command::new("ancestry_matrix")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Computes the ancestry matrix of a read-count table.")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Debug mode"),
        )
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Read-count table (TSV)."),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .short('o')
                .value_name("ORDER")
                .value_parser(clap::value_parser!(usize))
                .default_value("0")
                .help("Order statistic over samples. 0 takes the minimum."),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("THREADS")
                .value_parser(clap::value_parser!(usize))
                .default_value("1")
                .help("Number of threads"),
        )
        .get_matches();
    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let threads = matches.get_one::<usize>("threads").copied().unwrap_or(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("building the thread pool")?;
    let order = matches.get_one::<usize>("order").copied().unwrap_or(0);
    let input = matches
        .get_one::<String>("input")
        .context("missing input")?;
    let content = std::fs::read_to_string(input).with_context(|| format!("reading {}", input))?;
    let counts = ancestry_tree::ReadCounts::from_text(&content)?;
    let ancestry = ancestry_tree::AncestryMatrix::new(&counts, order)?;
    print!("{}", ancestry.to_text());
    Ok(())
}
