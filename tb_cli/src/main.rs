//! `tensorbox` - evaluate a chain of boxed tensor operations from a JSON config.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;

use tb_cli::{evaluate, format_values, EvalConfig};
use tensorbox::Interface;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or("TENSORBOX_LOG", "warn"))
        .init();

    let interfaces: Vec<&'static str> = Interface::ALL.iter().map(Interface::as_str).collect();

    let matches = Command::new("tensorbox")
        .version(clap::crate_version!())
        .about("Evaluate array operations through the numpy and autograd TensorBox interfaces")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("eval")
                .about("Box an input array, apply an operation chain and print the result")
                .arg(
                    Arg::new("config")
                        .help("Path to the evaluation config (JSON)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("interface")
                        .short('i')
                        .long("interface")
                        .help("Interface to box values on. Overrides the interface in the config file.")
                        .value_parser(interfaces),
                )
                .arg(
                    Arg::new("requires_grad")
                        .short('g')
                        .long("requires-grad")
                        .help("Track gradients of the input and print d(sum(result))/d(input)")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("interfaces").about("List the supported interfaces"))
        .get_matches();

    match matches.subcommand() {
        Some(("eval", eval_matches)) => run_eval(eval_matches),
        Some(("interfaces", _)) => {
            for interface in Interface::ALL {
                let grad = if interface.supports_grad() { "tracks gradients" } else { "plain arrays" };
                println!("{interface:<10} {grad}");
            }
            Ok(())
        }
        _ => unreachable!("a subcommand is required"),
    }
}

fn run_eval(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .ok_or_else(|| anyhow::anyhow!("missing config path"))?;
    let config = EvalConfig::from_arguments(config_path, matches)?;
    log::debug!("{config:?}");

    let evaluation = evaluate(&config)?;
    let result = &evaluation.result;
    let values = result.numpy()?;

    println!("interface: {}", result.interface());
    println!("shape:     {}", result.shape());
    println!("dtype:     {}", result.dtype());
    println!("values:\n{}", format_values(&values));

    if let Some(gradient) = &evaluation.gradient {
        println!("gradient:\n{}", format_values(gradient));
    } else if config.requires_grad {
        log::warn!("no gradient: the result does not depend on the input through tracked operations");
    }

    Ok(())
}
