//! Smoke-test CLI for the SCXML analysis front-end.
//! Usage:
//!    scxml_to_model [-v] [-o <dir>] <scxml-file>...

use log::error;
use std::path::Path;
use std::process;

use scxml_model::common::{get_arguments, init_logging, ArgOption};

const VERBOSE_OPTION: ArgOption = ArgOption {
    name: "v",
    required: false,
    with_value: false,
};

const OUT_DIR_OPTION: ArgOption = ArgOption {
    name: "o",
    required: false,
    with_value: true,
};

fn main() {
    let (named_opt, files) = match get_arguments(&[&VERBOSE_OPTION, &OUT_DIR_OPTION]) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };

    init_logging(named_opt.contains_key("v"));

    if files.is_empty() {
        eprintln!("Missing argument. Please specify one or more scxml files.");
        process::exit(1);
    }

    let out_dir = named_opt.get("o").map(Path::new);

    let mut exit_code = 0;
    for file in &files {
        if let Err(err) = analyze_one(file, out_dir) {
            error!("{}", err);
            eprintln!("{}", err);
            exit_code = 1;
        }
    }
    process::exit(exit_code);
}

fn analyze_one(file: &str, out_dir: Option<&Path>) -> Result<(), scxml_model::AnalysisError> {
    let model = scxml_model::analyze_file_in(Path::new(file), out_dir)?;
    println!(
        "Model: {} Initial: {} States: {} Events: {} Needs JSEngine: {} Variables: {}",
        model.name,
        model.initial,
        model.states.len(),
        model.events.len(),
        model.needs_jsengine,
        model.variables.len()
    );
    Ok(())
}
