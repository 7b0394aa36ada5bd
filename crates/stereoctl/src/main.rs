mod cli;
mod compose;
mod inspect;
mod matrices;
mod paths;
mod profile;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    run::run(args)
}
