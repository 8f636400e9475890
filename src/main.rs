use argh::FromArgs;
use retrieval_menu::{Console, Environment, Menu, ProcessLauncher};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(FromArgs)]
/// Interactive menu for running the dynamic object retrieval pipeline stages.
struct Args {
    #[argh(option)]
    /// data folder to work on; asked for interactively when omitted or not a folder.
    data_path: Option<String>,

    #[argh(option, default = "PathBuf::from(\".\")")]
    /// folder holding the pipeline executables. Defaults to the current directory.
    bin_dir: PathBuf,
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Args = argh::from_env();
    match run(args) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "menu stopped");
            eprintln!(" {err:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let env = Environment::new()?.with_bin_dir(args.bin_dir);
    let launcher = ProcessLauncher::new(&env);
    let console = Console::interactive()?;
    let mut menu = Menu::new(env, console, Box::new(launcher), args.data_path.as_deref())?;
    menu.run()
}
