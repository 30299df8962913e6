//! nvstore-inspect
//!
//! Читает запись файлового хранилища NVRAM вместе с сохранённой таблицей
//! типов и печатает декодированное значение.
//!
//! Реестр пуст, поэтому значения, записанные пользовательскими кодеками
//! или как объекты, не декодируются; таблица типов печатается всегда.

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use nvstore::{logging::init_logging, FileStorage, Nvram, NvramConfig, Registry, Scope};
use tracing::debug;

#[derive(Parser)]
#[command(name = "nvstore-inspect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Decode entries of a file-backed NVRAM store", long_about = None)]
struct Cli {
    /// Корневой каталог хранилища
    #[arg(long, env = "NVSTORE_ROOT")]
    root: PathBuf,
    /// Область хранилища: theme или history
    #[arg(long, default_value = "theme")]
    scope: Scope,
    /// Напечатать таблицу типов
    #[arg(long)]
    types: bool,
    /// Подробность логов (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Путь записи внутри области
    path: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    init_logging(level).map_err(|e| anyhow!(e))?;

    if cli.path.is_none() && !cli.types {
        bail!("nothing to do: pass an entry path or --types");
    }

    let config = NvramConfig::load().context("failed to load configuration")?;
    debug!(?config, root = %cli.root.display(), "opening store");
    let nvram = Nvram::with_config(
        FileStorage::new(&cli.root),
        Arc::new(Registry::empty()),
        config,
    );
    nvram.init().context("failed to load type table")?;

    if cli.types {
        for (index, name) in nvram.type_names().iter().enumerate() {
            println!("{index:>4}  {name}");
        }
    }

    if let Some(path) = &cli.path {
        let value = nvram
            .try_read_value(cli.scope, path)
            .with_context(|| format!("failed to decode {}/{path}", cli.scope))?;
        match value {
            Some(value) => println!("{value:#?}"),
            None => bail!("no entry at {}/{path}", cli.scope),
        }
    }
    Ok(())
}
