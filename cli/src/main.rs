mod commands;
mod terminal;

use commands::{CommandLine, Commands, init, plan, validate};
use omnivpc_common::config::Config;
use terminal::{logging, print};

fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    let cfg = Config {
        no_banner: commands.no_banner,
        quiet: commands.quiet,
    };

    logging::init_logging(cfg.quiet);
    print::banner(cfg.no_banner, cfg.quiet);

    match commands.command {
        Commands::Plan(args) => {
            print::header("composing topology", cfg.quiet);
            plan::plan(args, &cfg)
        }
        Commands::Init(args) => {
            print::header("writing plan file", cfg.quiet);
            init::init(args)
        }
        Commands::Validate(arg) => {
            print::header("validating plan", cfg.quiet);
            validate::validate(arg, &cfg)
        }
    }
}
