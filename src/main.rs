use clap::{Parser, Subcommand};

use requirements_lsp::config::resolve_index_url;
use requirements_lsp::lsp::server::{LogFormat, run_server};
use requirements_lsp::version::ordering::sort_releases;
use requirements_lsp::version::registries::PypiIndex;
use requirements_lsp::version::registry::PackageIndex;

#[derive(Parser)]
#[command(name = "requirements-lsp")]
#[command(version, about = "Language Server for requirements.txt files")]
struct Cli {
    /// Log file format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the releases of a package, oldest first
    Releases {
        name: String,

        /// Include releases whose files are all yanked
        #[arg(long)]
        all: bool,

        /// Package index URL (defaults to pip configuration, then PIP_INDEX_URL)
        #[arg(long)]
        index_url: Option<String>,
    },
}

async fn print_releases(name: &str, all: bool, index_url: Option<&str>) -> anyhow::Result<()> {
    let index = PypiIndex::new(resolve_index_url(index_url));
    let mut releases = index.package_releases(name, all).await?;
    sort_releases(&mut releases);

    for release in releases {
        println!("{release}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        None => runtime.block_on(run_server(cli.log_format)),
        Some(Command::Releases {
            name,
            all,
            index_url,
        }) => runtime.block_on(print_releases(&name, all, index_url.as_deref())),
    }
}
