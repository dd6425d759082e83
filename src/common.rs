//! Common functions: argument parsing, logging setup, and feature
//! introspection shared by the CLI binary.

use std::collections::HashMap;
use std::env;

#[cfg(feature = "EnvLog")]
use chrono::Local;
#[cfg(feature = "EnvLog")]
use std::io::Write;

/// Descriptor for a program argument option.
pub struct ArgOption {
    pub name: &'static str,
    pub required: bool,
    pub with_value: bool,
}

impl ArgOption {
    /// Creates a new option with the specified name.
    pub fn new(name: &'static str) -> ArgOption {
        ArgOption {
            name,
            required: false,
            with_value: false,
        }
    }

    /// Defines this option as "required".
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Defines that this option needs a value.
    pub fn with_value(mut self) -> Self {
        self.with_value = true;
        self
    }
}

/// Parse program arguments.
///
/// Don't use clap to parse arguments for now to reduce dependencies: the
/// CLI surface here is a handful of flags plus a list of input paths.
pub fn get_arguments(arguments: &[&ArgOption]) -> Result<(HashMap<&'static str, String>, Vec<String>), String> {
    let mut final_args = Vec::<String>::new();

    let args: Vec<String> = env::args().collect();
    let mut idx = 1;
    let mut map = HashMap::new();

    while idx < args.len() {
        let arg = &args[idx];
        idx += 1;

        if arg.starts_with('-') {
            let sarg = arg.trim_start_matches('-');
            let mut match_found = false;
            for opt in arguments {
                match_found = opt.name == sarg;
                if match_found {
                    if opt.with_value {
                        if idx >= args.len() {
                            return Err(format!("missing value for argument '{}'", opt.name));
                        }
                        map.insert(opt.name, args[idx].clone());
                        idx += 1;
                    } else {
                        map.insert(opt.name, String::new());
                    }
                    break;
                }
            }
            if !match_found {
                return Err(format!("unknown option '{}'", arg));
            }
        } else {
            final_args.push(arg.clone());
        }
    }

    for opt in arguments {
        if opt.required && !map.contains_key(opt.name) {
            return Err(format!("missing required argument '-{}'", opt.name));
        }
    }

    Ok((map, final_args))
}

/// Installs the process-wide logger. Library code never calls this; only
/// binaries that want to see `log`-facade output do.
pub fn init_logging(verbose: bool) {
    #[cfg(feature = "EnvLog")]
    {
        let mut builder = env_logger::Builder::new();
        let level = if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        builder.filter_level(level);
        builder.format(|buf, record| {
            let thread_name = {
                if let Some(n) = std::thread::current().name() {
                    n.to_string()
                } else {
                    format!("{:?}", std::thread::current().id())
                }
            };
            writeln!(
                buf,
                "{} [{:8}] {:5} {}",
                Local::now().format("%m-%d %H:%M:%S%.3f"),
                thread_name,
                record.level(),
                record.args()
            )
        });
        let _ = builder.try_init();
    }
    #[cfg(not(feature = "EnvLog"))]
    {
        let _ = verbose;
    }
}

/// Get active project features, for diagnostics.
pub fn get_features() -> Vec<&'static str> {
    vec![
        #[cfg(feature = "EnvLog")]
        "EnvLog",
        #[cfg(feature = "json-config")]
        "json-config",
    ]
}
