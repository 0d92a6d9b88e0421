//! cgsearch : search allele profiles within a Hamming distance of a query profile.
//!
//! cgsearch [--naive | --forest] --nseqs n --schemalength l --distance d [options]
//!
//! Profiles are read from the raw file given by --seqs (nseqs x schemalength bytes).
//! If the file does not exist, or if --create-seqs is set, synthetic profiles are generated
//! with --ntypes --diversity --seed and dumped in that file.
//!
//! --naive : scan all profiles.
//!
//! --forest : (default) use a forest of --ntrees random partition trees with bucket capacity --capacity.
//!     The forest is dumped in directory --index with its parameters and reloaded in later runs
//!     unless --create-index (or --create-seqs) is set. A dump not matching the profile file is rebuilt.
//!
//! --query : rank of the profile used as query (default 10).
//!
//! --heuristic : use the heuristic verifier with quantile level --alpha at --checkpoints (comma separated).
//!
//! --check : also run the naive scan and report the recall of the forest search.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{anyhow, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use cpu_time::ProcessTime;

use cgsearch::prelude::*;
use cgsearch::synth::create_seqs;

struct SearchArgs {
    dataset: DatasetParams,
    forest: ForestParams,
    strategy: VerifierStrategy,
    seqs_path: String,
    index_dir: String,
    query: usize,
    distance: usize,
    naive: bool,
    create_seqs: bool,
    create_index: bool,
    check: bool,
}

fn parse_args(matches: &ArgMatches) -> SearchArgs {
    let dataset = DatasetParams::new(
        *matches.get_one::<usize>("nseqs").unwrap(),
        *matches.get_one::<usize>("schemalength").unwrap(),
        *matches.get_one::<usize>("ntypes").unwrap(),
        *matches.get_one::<usize>("diversity").unwrap(),
        *matches.get_one::<u64>("seed").unwrap(),
    );
    let forest = ForestParams::new(
        *matches.get_one::<usize>("ntrees").unwrap(),
        *matches.get_one::<usize>("capacity").unwrap(),
    );
    let strategy = if matches.get_flag("heuristic") {
        let checkpoints: Vec<usize> = matches
            .get_many::<usize>("checkpoints")
            .unwrap()
            .copied()
            .collect();
        VerifierStrategy::Heuristic(HeuristicParams::new(
            checkpoints,
            *matches.get_one::<f64>("alpha").unwrap(),
        ))
    } else {
        VerifierStrategy::Exact
    };
    //
    SearchArgs {
        dataset,
        forest,
        strategy,
        seqs_path: matches.get_one::<String>("seqs").unwrap().clone(),
        index_dir: matches.get_one::<String>("index").unwrap().clone(),
        query: *matches.get_one::<usize>("query").unwrap(),
        distance: *matches.get_one::<usize>("distance").unwrap(),
        naive: matches.get_flag("naive"),
        create_seqs: matches.get_flag("create_seqs"),
        create_index: matches.get_flag("create_index"),
        check: matches.get_flag("check"),
    }
} // end of parse_args

//============================================================================================

// maps the profile file, generating it first if necessary
fn get_seqs(args: &SearchArgs) -> anyhow::Result<MmapSeqMatrix> {
    let seqs_path = Path::new(&args.seqs_path);
    if !seqs_path.exists() || args.create_seqs {
        println!("creating {} synthetic profiles in {:?}", args.dataset.nb_seqs, seqs_path);
        let matrix = create_seqs(&args.dataset)?;
        matrix.dump(seqs_path)?;
    }
    let store = MmapSeqMatrix::open(seqs_path, args.dataset.nb_seqs, args.dataset.schema_length)
        .with_context(|| format!("cannot map profile file {:?}", seqs_path))?;
    Ok(store)
} // end of get_seqs

// reloads the forest dumped in index dir if it matches the profiles, else builds and dumps it
fn get_forest(args: &SearchArgs, store: &MmapSeqMatrix) -> anyhow::Result<Forest> {
    let index_dir = Path::new(&args.index_dir);
    if index_dir.exists() && !args.create_index && !args.create_seqs {
        match reloadall(index_dir, store) {
            Ok((forest, params)) => {
                if *params.get_dataset_params() != args.dataset {
                    log::warn!("forest in {:?} was built on other profiles, rebuilding", index_dir);
                } else if !params.get_forest_params().same_shape(&args.forest) {
                    println!(
                        "forest in {:?} was built with {:?}, asked {:?}, rebuilding",
                        index_dir,
                        params.get_forest_params(),
                        args.forest
                    );
                } else {
                    println!("reloaded forest of {} trees from {:?}", forest.get_nb_trees(), index_dir);
                    return Ok(forest);
                }
            }
            Err(e) => {
                log::warn!("cannot reuse forest in {:?} : {}, rebuilding", index_dir, e);
            }
        }
    }
    let forest = Forest::build(store, args.forest)?;
    dumpall(index_dir, &forest, &ProcessingParams::new(args.dataset, args.forest))?;
    Ok(forest)
} // end of get_forest

fn run(args: &SearchArgs) -> anyhow::Result<()> {
    let store = get_seqs(args)?;
    if args.query >= store.len() {
        return Err(anyhow!(
            "query rank {} out of range, nb profiles : {}",
            args.query,
            store.len()
        ));
    }
    let query = store.get(args.query);
    let verifier = make_verifier(&args.strategy, args.distance, store.schema_length())?;
    log::info!("verifier : {:?}, distance : {}", args.strategy, args.distance);
    //
    let hits = if args.naive {
        let start_t = SystemTime::now();
        let cpu_start = ProcessTime::now();
        let hits = naive_search(&store, query, verifier.as_ref())?;
        println!(
            "naive search sys time(ms) {:?} cpu time(ms) {:?}",
            start_t.elapsed()?.as_millis(),
            cpu_start.elapsed().as_millis()
        );
        hits
    } else {
        let forest = get_forest(args, &store)?;
        let start_t = SystemTime::now();
        let cpu_start = ProcessTime::now();
        let hits = search(&forest, &store, query, verifier.as_ref())?;
        println!(
            "forest search sys time(ms) {:?} cpu time(ms) {:?}",
            start_t.elapsed()?.as_millis(),
            cpu_start.elapsed().as_millis()
        );
        println!("nb candidates : {}", forest.query(query)?.len());
        if args.check {
            let expected = naive_search(&store, query, verifier.as_ref())?;
            println!(
                "naive scan nb hits : {}, recall of forest : {:.4}",
                expected.len(),
                recall(&hits, &expected)
            );
        }
        hits
    };
    println!("nb hits : {}", hits.len());
    Ok(())
} // end of run

//============================================================================================

fn main() -> anyhow::Result<()> {
    //
    println!("\n ************** initializing logger *****************\n");
    env_logger::Builder::from_default_env().init();
    log::info!("logger initialized from default environment");
    //
    let matches = Command::new("cgsearch")
        .version("0.1.0")
        .about("Search allele profiles within a Hamming distance of a query profile")
        .arg(
            Arg::new("naive")
                .long("naive")
                .action(ArgAction::SetTrue)
                .conflicts_with("forest")
                .help("scan all profiles"),
        )
        .arg(
            Arg::new("forest")
                .long("forest")
                .action(ArgAction::SetTrue)
                .help("search with a forest of random partition trees (default)"),
        )
        .arg(
            Arg::new("ntypes")
                .long("ntypes")
                .default_value("100")
                .value_parser(clap::value_parser!(usize))
                .help("number of allele codes of synthetic profiles"),
        )
        .arg(
            Arg::new("nseqs")
                .long("nseqs")
                .default_value("200000")
                .value_parser(clap::value_parser!(usize))
                .help("number of profiles"),
        )
        .arg(
            Arg::new("schemalength")
                .long("schemalength")
                .default_value("3500")
                .value_parser(clap::value_parser!(usize))
                .help("number of loci in a profile"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .default_value("42")
                .value_parser(clap::value_parser!(u64))
                .help("seed of synthetic profiles generation"),
        )
        .arg(
            Arg::new("diversity")
                .long("diversity")
                .default_value("100")
                .value_parser(clap::value_parser!(usize))
                .help("mean number of loci mutated between a synthetic profile and its parent"),
        )
        .arg(
            Arg::new("seqs")
                .long("seqs")
                .default_value(".seqs.bin")
                .action(ArgAction::Set)
                .help("raw profile file"),
        )
        .arg(
            Arg::new("index")
                .long("index")
                .default_value(".cgsearch.idx")
                .action(ArgAction::Set)
                .help("directory of forest dump"),
        )
        .arg(
            Arg::new("distance")
                .short('d')
                .long("distance")
                .default_value("10")
                .value_parser(clap::value_parser!(usize))
                .help("maximum Hamming distance to query"),
        )
        .arg(
            Arg::new("create_seqs")
                .long("create-seqs")
                .action(ArgAction::SetTrue)
                .help("force creation of profiles and index"),
        )
        .arg(
            Arg::new("create_index")
                .long("create-index")
                .action(ArgAction::SetTrue)
                .help("force creation of index"),
        )
        .arg(
            Arg::new("ntrees")
                .short('t')
                .long("ntrees")
                .default_value("10")
                .value_parser(clap::value_parser!(usize))
                .help("number of trees in forest"),
        )
        .arg(
            Arg::new("capacity")
                .short('c')
                .long("capacity")
                .default_value("200")
                .value_parser(clap::value_parser!(usize))
                .help("bucket capacity"),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .default_value("10")
                .value_parser(clap::value_parser!(usize))
                .help("rank of the query profile"),
        )
        .arg(
            Arg::new("heuristic")
                .long("heuristic")
                .action(ArgAction::SetTrue)
                .help("use the heuristic verifier"),
        )
        .arg(
            Arg::new("alpha")
                .long("alpha")
                .default_value("0.01")
                .value_parser(clap::value_parser!(f64))
                .help("quantile level of heuristic bounds"),
        )
        .arg(
            Arg::new("checkpoints")
                .long("checkpoints")
                .default_value("10,100,1000,2000")
                .value_delimiter(',')
                .value_parser(clap::value_parser!(usize))
                .help("number of loci scanned at which heuristic bounds are tested"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .action(ArgAction::SetTrue)
                .help("compare forest search with naive scan"),
        )
        .get_matches();
    //
    let args = parse_args(&matches);
    run(&args)
} // end of main
