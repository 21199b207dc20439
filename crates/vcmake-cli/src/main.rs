use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vcmake_build::{ToolchainKind, ToolchainSelection};
use vcmake_driver::Driver;

#[derive(Parser)]
#[command(name = "vcmake")]
#[command(author, version, about = "Generate a Makefile and compile_commands.json for a C++ project")]
struct Cli {
    /// Project directory containing vcmake.toml
    #[arg(short = 'C', long = "directory", default_value = ".")]
    directory: PathBuf,

    /// Name of the generated recipe, overriding the project setting
    #[arg(long)]
    makefile: Option<String>,

    /// Do not write compile_commands.json
    #[arg(long)]
    no_compile_commands: bool,

    /// Print the recipe to stdout instead of writing files
    #[arg(long)]
    print: bool,

    /// Toolchain family, overriding the project setting
    #[arg(long, value_enum)]
    compiler: Option<CompilerArg>,

    /// C++ compiler binary
    #[arg(long, env = "CXX")]
    cxx: Option<String>,

    /// Linker binary (defaults to the compiler)
    #[arg(long, env = "LD")]
    ld: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CompilerArg {
    /// Probe the compiler on PATH
    Auto,
    Gcc,
    Clang,
}

impl From<CompilerArg> for ToolchainKind {
    fn from(arg: CompilerArg) -> Self {
        match arg {
            CompilerArg::Auto => ToolchainKind::Auto,
            CompilerArg::Gcc => ToolchainKind::Gcc,
            CompilerArg::Clang => ToolchainKind::Clang,
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let driver = Driver::new(ToolchainSelection {
        kind: cli.compiler.map(Into::into),
        cxx: cli.cxx,
        ld: cli.ld,
    });

    let mut artifacts = driver.generate(&cli.directory)?;
    if let Some(name) = cli.makefile {
        artifacts.makefile_name = name;
    }

    if cli.print {
        print!("{}", artifacts.recipe);
        return Ok(());
    }

    let out_dir = artifacts.project_dir.clone();
    let written = driver.write_artifacts(&artifacts, &out_dir, !cli.no_compile_commands)?;
    info!(files = written.len(), "done");

    Ok(())
}
