use ancestry_tree::ancestry_graph::probabilistic::{inter_cluster_coherence, intra_cluster_coherence};
use ancestry_tree::{AncestryGraph, AncestryMatrix, ReadCounts};
use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

fn common_args(command: Command) -> Command {
    command
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
            Arg::new("matrix")
                .long("matrix")
                .value_name("MATRIX")
                .help("Precomputed ancestry matrix. Computed with order 0 when absent."),
        )
        .arg(
            Arg::new("alpha")
                .long("alpha")
                .short('a')
                .value_name("ALPHA")
                .value_parser(clap::value_parser!(f64))
                .default_value("0.3")
                .help("Ancestry noise tolerance in [0, 0.5]."),
        )
        .arg(
            Arg::new("beta")
                .long("beta")
                .short('b')
                .value_name("BETA")
                .value_parser(clap::value_parser!(f64))
                .default_value("0.8")
                .help("Contraction threshold in [0.5, 1]."),
        )
        .arg(
            Arg::new("gamma")
                .long("gamma")
                .short('g')
                .value_name("GAMMA")
                .value_parser(clap::value_parser!(f64))
                .default_value("0.01")
                .help("Confidence interval significance in [0, 1]."),
        )
}

fn command() -> Command {
    Command::new("analyse")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Diagnostics of ancestry graphs.")
        .arg_required_else_help(true)
        .subcommand(common_args(
            Command::new("graph").about("Shape of the probabilistic ancestry graph G."),
        ))
        .subcommand(common_args(
            Command::new("clusters").about("Size and coherence of each cluster of G."),
        ))
        .subcommand(common_args(
            Command::new("contracted").about("Shape of the contracted graph H and its arcs."),
        ))
}

struct Inputs {
    counts: ReadCounts,
    ancestry: AncestryMatrix,
    config: ancestry_tree::Config,
}

fn load(matches: &ArgMatches) -> Result<Inputs> {
    let input = matches
        .get_one::<String>("input")
        .context("missing input")?;
    let content = std::fs::read_to_string(input).with_context(|| format!("reading {}", input))?;
    let counts = ReadCounts::from_text(&content).with_context(|| format!("parsing {}", input))?;
    let ancestry = match matches.get_one::<String>("matrix") {
        Some(path) => {
            let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            AncestryMatrix::from_text(&content).with_context(|| format!("parsing {}", path))?
        }
        None => AncestryMatrix::new(&counts, 0)?,
    };
    if ancestry.mutations() != counts.mutations() {
        bail!(
            "ancestry matrix has {} mutations but {} has {}",
            ancestry.mutations(),
            input,
            counts.mutations()
        );
    }
    let config = ancestry_tree::Config {
        alpha: matches.get_one::<f64>("alpha").copied().unwrap_or(0.3),
        beta: matches.get_one::<f64>("beta").copied().unwrap_or(0.8),
        gamma: matches.get_one::<f64>("gamma").copied().unwrap_or(0.01),
        ..ancestry_tree::Config::default()
    };
    config.validate(counts.samples())?;
    Ok(Inputs {
        counts,
        ancestry,
        config,
    })
}

fn main() -> Result<()> {
    let matches = command().get_matches();
    let (name, sub_m) = matches.subcommand().context("missing subcommand")?;
    let level = match sub_m.get_count("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let Inputs {
        counts,
        ancestry,
        config,
    } = load(sub_m)?;
    let graph = AncestryGraph::probabilistic(&ancestry, &counts, config.alpha, config.gamma)?;
    let clusters = graph.remove_cycles();
    match name {
        "graph" => {
            println!("nodes\t{}", graph.node_count());
            println!("arcs\t{}", graph.arc_count());
            println!("infeasible\t{}", graph.infeasible_count());
            println!("in_degree_zero\t{}", graph.in_degree_zero_count());
            println!("isolated\t{}", graph.isolated_node_count());
            println!("max_out_degree\t{}", graph.max_out_degree());
            println!("largest_arborescence\t{}", graph.largest_arborescence());
            println!("dag\t{}", graph.is_dag());
            println!("transitive\t{}", graph.is_transitive());
            println!("non_trivial_scc\t{}", graph.non_trivial_scc_count());
            println!("anti_symmetric\t{:.4}", ancestry.anti_symmetric_fraction());
        }
        "clusters" => {
            let coherence = intra_cluster_coherence(&ancestry, &clusters);
            println!(
                "coherence\t{:.4}\t{:.4}\t{:.4}",
                coherence.incomparable, coherence.ancestral, coherence.comparable
            );
            let mut collapsed = counts.collapse(&clusters)?;
            collapsed.remap_labels(&clusters, &counts, config.max_cluster_size);
            println!("cluster\tsize\tanti_symmetric\tmembers");
            for (idx, cluster) in clusters.iter().enumerate() {
                let size = cluster.len();
                let fraction = ancestry.anti_symmetric_pairs(cluster) as f64 / (size * size) as f64;
                let members = collapsed.mutation_label(idx).replace('\n', ",");
                println!("{}\t{}\t{:.4}\t{}", idx, size, fraction, members);
            }
        }
        "contracted" => match graph.contract(&clusters, config.beta) {
            Ok(contracted) => {
                println!("nodes\t{}", contracted.node_count());
                println!("arcs\t{}", contracted.arc_count());
                println!("in_degree_zero\t{}", contracted.in_degree_zero_count());
                println!("largest_arborescence\t{}", contracted.largest_arborescence());
                println!("dag\ttrue");
                let coherence = inter_cluster_coherence(&contracted, &ancestry, &clusters);
                for (arc, max) in contracted.arcs().iter().zip(coherence) {
                    let source = contracted.node_to_column(arc.source);
                    let target = contracted.node_to_column(arc.target);
                    println!("{}\t{}\t{:.4}\t{:.4}", source, target, arc.prob, max);
                }
            }
            Err(ancestry_tree::Error::NotADag) => println!("dag\tfalse"),
            Err(why) => return Err(why.into()),
        },
        _ => unreachable!(),
    }
    Ok(())
}
