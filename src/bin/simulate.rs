use ancestry_tree::simulation::{simulate, SimulationConfig};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use rand::SeedableRng;

fn main() -> Result<()> {
    let matches = Command::new("simulate")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Simulates read counts from a random clonal tree.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Debug mode"),
        )
        .arg(
            Arg::new("mutations")
                .long("mutations")
                .short('m')
                .value_parser(clap::value_parser!(usize))
                .default_value("20")
                .help("Number of mutations."),
        )
        .arg(
            Arg::new("samples")
                .long("samples")
                .short('s')
                .value_parser(clap::value_parser!(usize))
                .default_value("4")
                .help("Number of samples."),
        )
        .arg(
            Arg::new("coverage")
                .long("coverage")
                .short('c')
                .value_parser(clap::value_parser!(u32))
                .default_value("100")
                .help("Reads per mutation and sample."),
        )
        .arg(
            Arg::new("min_mix")
                .long("min")
                .value_parser(clap::value_parser!(usize))
                .default_value("1")
                .help("Minimum number of clones mixed in a sample."),
        )
        .arg(
            Arg::new("max_mix")
                .long("max")
                .value_parser(clap::value_parser!(usize))
                .default_value("4")
                .help("Maximum number of clones mixed in a sample."),
        )
        .arg(
            Arg::new("perfect")
                .long("perfect")
                .short('p')
                .action(ArgAction::SetTrue)
                .help("Exact read counts instead of binomial draws."),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .default_value("47")
                .help("Seed for a pseudo random number generator."),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .value_name("TREE")
                .help("Write the true tree, usages and frequencies here."),
        )
        .get_matches();
    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let config = SimulationConfig {
        mutations: matches.get_one::<usize>("mutations").copied().unwrap_or(20),
        samples: matches.get_one::<usize>("samples").copied().unwrap_or(4),
        coverage: matches.get_one::<u32>("coverage").copied().unwrap_or(100),
        min_mix: matches.get_one::<usize>("min_mix").copied().unwrap_or(1),
        max_mix: matches.get_one::<usize>("max_mix").copied().unwrap_or(4),
        perfect: matches.get_flag("perfect"),
    };
    let seed = matches.get_one::<u64>("seed").copied().unwrap_or(47);
    let mut rng: rand_xoshiro::Xoroshiro128PlusPlus = SeedableRng::seed_from_u64(seed);
    let sim = simulate(&mut rng, &config)?;
    if let Some(path) = matches.get_one::<String>("tree") {
        let mut out = String::new();
        sim.usage.write_text(&mut out);
        sim.tree.write_text(&mut out);
        sim.frequencies.write_text(&mut out);
        std::fs::write(path, out).with_context(|| format!("writing {}", path))?;
    }
    print!("{}", sim.counts.to_text());
    Ok(())
}
