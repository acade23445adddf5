/**
 * RecTune
 * Copyright (C) 2026 The RecTune developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

extern crate getopts;
extern crate num_cpus;
extern crate rectune;

use std::env;
use std::error::Error;

use getopts::Options;

use rectune::{tune_hybrid, tune_item_knn, TuningConfig};
use rectune::features::AttributeSource;
use rectune::io;
use rectune::recommender::{BlockScaling, KnnParams, PopularityRecommender};
use rectune::hybrid::MergedHybrid;
use rectune::search::{RandomSearch, SearchSpace};
use rectune::stats::{DataDictionary, Renaming};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "interactions", "Interaction file name (required). A CSV file with a \
        header and a user,item[,value] record per line.", "PATH");
    opts.optmulti("a", "attributes", "Attribute file name (repeatable). A CSV file with a \
        header and an item,feature[,value] record per line. Every file becomes one feature \
        source.", "PATH");
    opts.optmulti("w", "importance", "Importance coefficient for the attribute file at the \
        same position (repeatable, defaults to 1.0).", "NUMBER");
    opts.optopt("e", "episodes", "Episode file name (optional). A CSV file whose per-item \
        row counts are bucketed into an additional feature source.", "PATH");
    opts.optopt("b", "buckets", "Number of buckets for the episode source (optional, \
        defaults to 20).", "NUMBER");
    opts.optopt("m", "mode", "What to tune: 'knn' searches the item-knn hyperparameters, \
        'hybrid' searches the mixing weight blending a knn model with the popularity \
        baseline (optional, defaults to knn).", "MODE");
    opts.optopt("k", "knn-record", "Best-record JSON of an earlier knn run, required in \
        hybrid mode to fix the knn hyperparameters.", "PATH");
    opts.optopt("f", "folds", "Number of random holdout folds (optional, defaults to 3).",
        "NUMBER");
    opts.optopt("c", "cutoff", "Ranking cutoff for the MAP objective (optional, defaults \
        to 10).", "NUMBER");
    opts.optopt("p", "init-points", "Number of random exploration points (optional, \
        defaults to 10).", "NUMBER");
    opts.optopt("n", "num-iterations", "Number of guided search iterations (optional, \
        defaults to 15).", "NUMBER");
    opts.optopt("t", "threads", "Number of worker threads per fit (optional, defaults to \
        the number of CPUs).", "NUMBER");
    opts.optopt("s", "seed", "Seed for splits and the search strategy (optional, defaults \
        to 42).", "NUMBER");
    opts.optopt("q", "worst-quantile", "Evaluate only this shortest-profile share of the \
        users, e.g. 0.25 (optional).", "NUMBER");
    opts.optopt("F", "feature-alpha", "Linear confidence coefficient for the attribute \
        block of the combined matrix, required together with --interaction-alpha \
        (optional).", "NUMBER");
    opts.optopt("I", "interaction-alpha", "Linear confidence coefficient for the \
        interaction block of the combined matrix, required together with --feature-alpha \
        (optional).", "NUMBER");
    opts.optopt("o", "outputfile", "Output file name for the best-record JSON (optional, \
        output will be written to stdout by default).", "PATH");
    opts.optopt("u", "target-users", "Single-column CSV of users to write a submission for \
        (optional).", "PATH");
    opts.optopt("S", "submission", "Submission file name, required together with \
        --target-users.", "PATH");
    opts.optflag("v", "verbose", "Print per-fold and per-evaluation progress");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    if !matches.opt_present("i") {
        return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify an interaction file via --interactions."),
        );
    }

    let mode = matches.opt_str("m").unwrap_or_else(|| "knn".to_string());
    if mode != "knn" && mode != "hybrid" {
        return print_usage_and_exit(&program, opts, Some("Mode must be 'knn' or 'hybrid'."));
    }
    if mode == "hybrid" && !matches.opt_present("k") {
        return print_usage_and_exit(
            &program,
            opts,
            Some("Hybrid mode needs the best record of an earlier knn run via --knn-record."),
        );
    }
    if matches.opt_present("u") != matches.opt_present("S") {
        return print_usage_and_exit(
            &program,
            opts,
            Some("--target-users and --submission must be given together."),
        );
    }

    let feature_alpha = match matches.opt_get::<f64>("F") {
        Ok(alpha) => alpha,
        Err(failure) => return option_problem(&program, opts, "F", &failure.to_string()),
    };
    let interaction_alpha = match matches.opt_get::<f64>("I") {
        Ok(alpha) => alpha,
        Err(failure) => return option_problem(&program, opts, "I", &failure.to_string()),
    };
    let scaling = match (feature_alpha, interaction_alpha) {
        (Some(feature_alpha), Some(interaction_alpha)) =>
            Some(BlockScaling { feature_alpha, interaction_alpha }),
        (None, None) => None,
        _ => {
            return print_usage_and_exit(
                &program,
                opts,
                Some("--feature-alpha and --interaction-alpha must be given together."),
            );
        },
    };

    let config = TuningConfig {
        num_folds: match matches.opt_get_default("f", 3) {
            Ok(folds) => folds,
            Err(failure) => return option_problem(&program, opts, "f", &failure.to_string()),
        },
        cutoff: match matches.opt_get_default("c", 10) {
            Ok(cutoff) => cutoff,
            Err(failure) => return option_problem(&program, opts, "c", &failure.to_string()),
        },
        init_points: match matches.opt_get_default("p", 10) {
            Ok(points) => points,
            Err(failure) => return option_problem(&program, opts, "p", &failure.to_string()),
        },
        n_iter: match matches.opt_get_default("n", 15) {
            Ok(iterations) => iterations,
            Err(failure) => return option_problem(&program, opts, "n", &failure.to_string()),
        },
        workers: match matches.opt_get_default("t", num_cpus::get()) {
            Ok(threads) => threads,
            Err(failure) => return option_problem(&program, opts, "t", &failure.to_string()),
        },
        seed: match matches.opt_get_default("s", 42) {
            Ok(seed) => seed,
            Err(failure) => return option_problem(&program, opts, "s", &failure.to_string()),
        },
        worst_fraction: match matches.opt_get::<f64>("q") {
            Ok(fraction) => fraction,
            Err(failure) => return option_problem(&program, opts, "q", &failure.to_string()),
        },
        verbose: matches.opt_present("v"),
        scaling,
        ..TuningConfig::default()
    };

    let num_buckets: usize = match matches.opt_get_default("b", 20) {
        Ok(buckets) => buckets,
        Err(failure) => return option_problem(&program, opts, "b", &failure.to_string()),
    };

    let run = Run {
        interactions_path: matches.opt_str("i").unwrap(),
        attribute_paths: matches.opt_strs("a"),
        importances: matches.opt_strs("w"),
        episodes_path: matches.opt_str("e"),
        num_buckets,
        mode,
        knn_record_path: matches.opt_str("k"),
        record_path: matches.opt_str("o"),
        target_users_path: matches.opt_str("u"),
        submission_path: matches.opt_str("S"),
        config,
    };

    if let Err(failure) = execute(&run) {
        eprintln!("Tuning run failed: {}", failure);
        std::process::exit(1);
    }
}

fn print_usage_and_exit(program: &str, opts: Options, hint: Option<&str>) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

fn option_problem(program: &str, opts: Options, option: &str, failure: &str) {
    let hint = format!("Problem with option '{}': {}", option, failure);
    print_usage_and_exit(program, opts, Some(&hint))
}

struct Run {
    interactions_path: String,
    attribute_paths: Vec<String>,
    importances: Vec<String>,
    episodes_path: Option<String>,
    num_buckets: usize,
    mode: String,
    knn_record_path: Option<String>,
    record_path: Option<String>,
    target_users_path: Option<String>,
    submission_path: Option<String>,
    config: TuningConfig,
}

fn execute(run: &Run) -> Result<(), Box<dyn Error>> {

    println!("Reading {}", run.interactions_path);
    let records = io::read_interactions(&run.interactions_path)?;
    let data_dict = DataDictionary::from_interactions(&records);

    println!(
        "Found {} interactions between {} users and {} items.",
        data_dict.num_interactions(),
        data_dict.num_users(),
        data_dict.num_items(),
    );

    let urm = io::interaction_matrix(&records, &data_dict);

    let mut sources: Vec<AttributeSource> = Vec::new();

    for (position, path) in run.attribute_paths.iter().enumerate() {
        let importance: f64 = match run.importances.get(position) {
            Some(raw) => raw.parse()?,
            None => 1.0,
        };

        println!("Reading attribute source {} (importance {})", path, importance);
        let attribute_records = io::read_attributes(path)?;
        sources.push(io::attribute_source(path, importance, &attribute_records, &data_dict));
    }

    if let Some(ref episodes_path) = run.episodes_path {
        println!("Reading episode source {}", episodes_path);
        let episode_records = io::read_attributes(episodes_path)?;
        sources.push(io::count_source(
            episodes_path,
            1.0,
            &episode_records,
            &data_dict,
            run.num_buckets,
        ));
    }

    let mut maximizer = RandomSearch::from_seed(run.config.seed);

    if run.mode == "hybrid" {

        let knn_record_path = run.knn_record_path.as_ref().unwrap();
        let knn_record = io::read_best_record(knn_record_path)?;
        let knn_params = KnnParams::from_point(&knn_record.params)?;

        println!(
            "Searching the mixing weight over {} folds (knn hyperparameters from {})",
            run.config.num_folds, knn_record_path,
        );

        let result = tune_hybrid(&urm, &sources, &knn_params, &run.config, &mut maximizer)?;

        println!("Best mixing weight found with mean MAP@{} {:.6}", run.config.cutoff, result.target);
        io::write_best_record(&result, run.record_path.clone())?;

        if let Some(ref target_users_path) = run.target_users_path {

            // the final blend uses base models refit on the full data
            let icm = rectune::features::build_feature_matrix(&sources, data_dict.num_items());
            let combined = rectune::combined_matrix(&icm, &urm, &run.config.scaling)?;
            let knn = rectune::recommender::ItemKnnRecommender::fit(
                urm.clone(),
                &combined,
                &knn_params,
                run.config.workers,
            )?;
            let popularity = PopularityRecommender::new(urm.clone());

            let mut blend = MergedHybrid::new(&knn, &popularity)?;
            blend.fit(result.params["hybrid_alpha"]);

            write_submission_for(run, &blend, &data_dict, target_users_path)?;
        }

    } else {

        let space = SearchSpace::new()
            .with("top_k", 10.0, 500.0)
            .with("shrink", 0.0, 100.0);

        println!(
            "Searching the item-knn hyperparameters over {} folds ({} exploration points, {} guided iterations)",
            run.config.num_folds, run.config.init_points, run.config.n_iter,
        );

        let tuned = tune_item_knn(&urm, &sources, &space, &run.config, &mut maximizer)?;

        println!("Best point found with mean MAP@{} {:.6}", run.config.cutoff, tuned.result.target);
        io::write_best_record(&tuned.result, run.record_path.clone())?;

        if let Some(ref target_users_path) = run.target_users_path {
            write_submission_for(run, &tuned.recommender, &data_dict, target_users_path)?;
        }
    }

    Ok(())
}

fn write_submission_for(
    run: &Run,
    recommender: &dyn rectune::recommender::Recommender,
    data_dict: &DataDictionary,
    target_users_path: &str,
) -> Result<(), Box<dyn Error>> {

    let submission_path = run.submission_path.as_ref().unwrap();

    println!("Writing submission to {}", submission_path);

    let target_users = io::read_target_users(target_users_path)?;
    let renaming = Renaming::from(data_dict.clone());

    io::write_submission(
        recommender,
        &target_users,
        data_dict,
        &renaming,
        run.config.cutoff,
        submission_path,
    )
}
