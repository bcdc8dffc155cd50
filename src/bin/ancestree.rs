use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{info, warn};

fn command() -> Command {
    Command::new("ancestree")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Clonal tree reconstruction from multi-sample read counts.")
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
                .help("Read-count table (TSV). Header: gene_id, then each sample label twice."),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("TOML")
                .help("Parameter file. Flags override its values."),
        )
        .arg(
            Arg::new("alpha")
                .long("alpha")
                .short('a')
                .value_name("ALPHA")
                .value_parser(clap::value_parser!(f64))
                .help("Ancestry noise tolerance in [0, 0.5]. [default: 0.3]"),
        )
        .arg(
            Arg::new("beta")
                .long("beta")
                .short('b')
                .value_name("BETA")
                .value_parser(clap::value_parser!(f64))
                .help("Contraction threshold in [0.5, 1]. [default: 0.8]"),
        )
        .arg(
            Arg::new("gamma")
                .long("gamma")
                .short('g')
                .value_name("GAMMA")
                .value_parser(clap::value_parser!(f64))
                .help("Confidence interval significance in [0, 1]. [default: 0.01]"),
        )
        .arg(
            Arg::new("time")
                .long("time")
                .short('t')
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(i64))
                .allow_negative_numbers(true)
                .help("Time limit of the integer program, -1 for none. [default: -1]"),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .value_name("ORDER")
                .value_parser(clap::value_parser!(usize))
                .help("Order statistic over samples of the ancestry probabilities. [default: 0]"),
        )
        .arg(
            Arg::new("matrix")
                .long("matrix")
                .value_name("MATRIX")
                .help("Precomputed ancestry matrix, as written by ancestry_matrix."),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("THREADS")
                .value_parser(clap::value_parser!(usize))
                .help("Number of threads"),
        )
        .arg(
            Arg::new("sol")
                .long("sol")
                .short('s')
                .value_name("OUTPUT")
                .help("Write the solution pool here instead of stdout."),
        )
}

fn config(matches: &ArgMatches) -> Result<ancestry_tree::Config> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ancestry_tree::Config::load(path).with_context(|| format!("reading {}", path))?,
        None => ancestry_tree::Config::default(),
    };
    if let Some(&alpha) = matches.get_one::<f64>("alpha") {
        config.alpha = alpha;
    }
    if let Some(&beta) = matches.get_one::<f64>("beta") {
        config.beta = beta;
    }
    if let Some(&gamma) = matches.get_one::<f64>("gamma") {
        config.gamma = gamma;
    }
    if let Some(&time) = matches.get_one::<i64>("time") {
        config.time_limit = time;
    }
    if let Some(&order) = matches.get_one::<usize>("order") {
        config.order = order;
    }
    if let Some(&threads) = matches.get_one::<usize>("threads") {
        config.threads = threads;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let matches = command().get_matches();
    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let config = config(&matches)?;
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .context("building the thread pool")?;
    let input = matches
        .get_one::<String>("input")
        .context("missing input")?;
    let content = std::fs::read_to_string(input).with_context(|| format!("reading {}", input))?;
    let counts = ancestry_tree::ReadCounts::from_text(&content).with_context(|| format!("parsing {}", input))?;
    let inference = match matches.get_one::<String>("matrix") {
        Some(path) => {
            let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            let ancestry = ancestry_tree::AncestryMatrix::from_text(&content)
                .with_context(|| format!("parsing {}", path))?;
            ancestry_tree::infer_with_ancestry(&counts, &ancestry, &config)?
        }
        None => ancestry_tree::infer_clonal_trees(&counts, &config)?,
    };
    let report = &inference.report;
    if report.time_limited {
        warn!("Enumeration stopped by the time limit");
    }
    info!(
        "{} trees, achieved {:.6}, best bound {:.6}",
        inference.pool.len(),
        report.achieved,
        report.best_bound
    );
    for idx in 0..inference.pool.len() {
        info!("Tree {}: mean VAF delta {:.4}", idx, inference.pool.vaf_delta(idx)?);
    }
    let text = inference.pool.to_text();
    match matches.get_one::<String>("sol") {
        Some(path) => std::fs::write(path, text).with_context(|| format!("writing {}", path))?,
        None => print!("{}", text),
    }
    Ok(())
}
