use anyhow::Result;
use clap::Parser;

use nabaz::cli::{Cli, Commands};
use nabaz::framework::CommandFramework;
use nabaz::parsers::{self, Language};
use nabaz::runner::run_invocation;
use nabaz::scm::{CodeDirectory, LocalGitHistory};
use nabaz::storage::SqliteStorage;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Test {
            repo_path,
            language,
            list_cmd,
            run_cmd,
            db_path,
        } => {
            let language = Language::from_name(&language)
                .ok_or_else(|| anyhow::anyhow!("unsupported language: {language}"))?;

            let repo_path = repo_path.canonicalize()?;
            let history = LocalGitHistory::open(&repo_path)?;
            let mut code = CodeDirectory::new(history.root());
            let mut storage = match db_path {
                Some(path) => SqliteStorage::open(&path)?,
                None => SqliteStorage::open_default()?,
            };
            let parser = parsers::new_parser(language);
            let mut framework = CommandFramework::new(history.root(), list_cmd, run_cmd);

            let outcome = run_invocation(
                &mut code,
                &mut storage,
                &mut framework,
                parser.as_ref(),
                &history,
            )?;

            if outcome.run_id.is_none() {
                println!("No tests were impacted ({} skipped).", outcome.tests_skipped);
            } else {
                println!(
                    "Ran {}/{} tests.",
                    outcome.tests_ran,
                    outcome.tests_ran + outcome.tests_skipped
                );
            }
            std::process::exit(outcome.exit_code);
        }
    }
}
