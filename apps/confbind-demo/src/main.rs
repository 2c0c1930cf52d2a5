//! confbind demo service.
//!
//! Binds a small service configuration from command-line flags (given after
//! `--`) and a configuration file, then prints every resolved entry.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use confbind::{Binder, Configurable, ParseResult};
use confbind_sources::{FileSource, FlagSource, Format};

#[derive(Parser)]
#[command(name = "confbind-demo")]
#[command(about = "Bind flags and a config file onto a service configuration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration and print every entry
    Show {
        /// Configuration flags, e.g. `-- -service_listen_port=9000`
        #[arg(last = true)]
        flags: Vec<String>,
    },
    /// Print the default configuration document without writing it
    Defaults {
        #[arg(long, value_enum, default_value_t = DocFormat::Yaml)]
        format: DocFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DocFormat {
    Yaml,
    Json,
    Toml,
}

impl From<DocFormat> for Format {
    fn from(format: DocFormat) -> Self {
        match format {
            DocFormat::Yaml => Format::Yaml,
            DocFormat::Json => Format::Json,
            DocFormat::Toml => Format::Toml,
        }
    }
}

#[derive(Configurable, Debug, Default)]
struct ListenConf {
    #[conf(tag = "host,default=127.0.0.1,usage=listen address")]
    host: String,
    #[conf(tag = "port,default=8080,usage=listen port")]
    port: u16,
}

#[derive(Configurable, Debug, Default)]
struct ServiceConf {
    #[conf(tag = "name,default=confbind-demo,usage=service name")]
    name: String,
    listen: ListenConf,
    #[conf(tag = "debug,usage=enable debug endpoints")]
    debug: bool,
    #[conf(tag = "ratio,default=0.25,usage=trace sampling ratio")]
    sample_ratio: f64,
}

fn binder() -> Binder {
    Binder::builder()
        .result_handler(|result| match result {
            ParseResult::Failed(err) => tracing::debug!(errors = err.len(), "configuration failed"),
            ParseResult::Succeeded(entries) => {
                for entry in entries {
                    println!("{entry}");
                }
            }
        })
        .build()
}

fn show(flags: Vec<String>) -> Result<()> {
    let mut binder = binder();
    let file = FileSource::new();

    let service = binder.register_conf_with_name("service", ServiceConf::default());
    binder.register_bound_with_name("yaml", &file.conf());
    binder.register_source(FlagSource::from_args(flags));
    binder.register_source(file);

    binder.parse().context("failed to bind configuration")?;
    let conf = service.borrow();
    tracing::info!(conf = ?conf, "configuration bound");
    drop(conf);
    binder.print_result();
    Ok(())
}

fn defaults(format: DocFormat) -> Result<()> {
    let mut binder = binder();
    let file = FileSource::new();
    binder.register_conf_with_name("service", ServiceConf::default());
    binder.register_bound_with_name("yaml", &file.conf());
    binder.parse().context("failed to bind configuration")?;

    let text = Format::from(format)
        .render(&binder.document())
        .context("failed to render defaults")?;
    print!("{text}");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Show { flags } => show(flags),
        Commands::Defaults { format } => defaults(format),
    }
}
