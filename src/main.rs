mod logging;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use refdata::cache::{CachedLookup, SourceAdapter};
use refdata::config::Config;
use refdata::reference::Dataset;
use refdata::{scheduler, ReferenceData};

#[derive(Parser, Debug)]
#[command(name = "refdata")]
#[command(about = "Inspect and refresh cached back office reference data")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/refdata/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Write logs to this file instead of stderr
  #[arg(long)]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(clap::Args, Debug)]
struct KeyArgs {
  /// Dataset, e.g. SystemParameter or reference-value
  dataset: Dataset,
  domain: String,
  service: String,
  workplace: String,

  /// Print an empty result instead of failing when the key is absent
  #[arg(long)]
  safe: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the cached entry for a key
  Lookup {
    #[command(flatten)]
    key: KeyArgs,

    /// Show only the record with this code
    #[arg(long)]
    code: Option<String>,
  },
  /// Show the records for a key in display order
  List {
    #[command(flatten)]
    key: KeyArgs,
  },
  /// Re-fetch datasets from the back office (all when none are given)
  Refresh { datasets: Vec<Dataset> },
  /// Drop cached datasets (all when none are given)
  Clear { datasets: Vec<Dataset> },
  /// Keep every dataset fresh on the configured schedule until interrupted
  Watch,
}

/// Run `$body` with `$lookup` bound to the dataset's lookup.
macro_rules! with_lookup {
  ($data:expr, $dataset:expr, |$lookup:ident| $body:expr) => {
    match $dataset {
      Dataset::SystemParameter => {
        let $lookup = &$data.system_parameters;
        $body
      }
      Dataset::ReferenceValue => {
        let $lookup = &$data.reference_values;
        $body
      }
      Dataset::PwsText => {
        let $lookup = &$data.pws_texts;
        $body
      }
      Dataset::SystemNotice => {
        let $lookup = &$data.system_notices;
        $body
      }
      Dataset::TaxReliefType => {
        let $lookup = &$data.tax_relief_types;
        $body
      }
    }
  };
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.log_file.as_deref())?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let reference_data = ReferenceData::from_config(&config)?;

  match args.command {
    Command::Lookup { key, code } => {
      with_lookup!(reference_data, key.dataset, |lookup| {
        show_lookup(lookup, &key, code.as_deref()).await
      })
    }
    Command::List { key } => {
      with_lookup!(reference_data, key.dataset, |lookup| show_list(lookup, &key).await)
    }
    Command::Refresh { datasets } => refresh(&reference_data, &or_all(datasets)).await,
    Command::Clear { datasets } => {
      for dataset in or_all(datasets) {
        reference_data.clear(dataset)?;
        println!("{}: cleared", dataset);
      }
      Ok(())
    }
    Command::Watch => watch(reference_data, &config).await,
  }
}

fn or_all(datasets: Vec<Dataset>) -> Vec<Dataset> {
  if datasets.is_empty() {
    Dataset::ALL.to_vec()
  } else {
    datasets
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

async fn show_lookup<A: SourceAdapter>(
  lookup: &CachedLookup<A>,
  key: &KeyArgs,
  code: Option<&str>,
) -> Result<()> {
  let (domain, service, workplace) = (&key.domain, &key.service, &key.workplace);

  match (code, key.safe) {
    (Some(code), false) => print_json(&lookup.lookup_code(domain, service, workplace, code).await?),
    (Some(code), true) => {
      let entry = lookup.safe_lookup(domain, service, workplace).await?;
      print_json(&entry.get(code))
    }
    (None, false) => print_json(&lookup.lookup(domain, service, workplace).await?),
    (None, true) => print_json(&lookup.safe_lookup(domain, service, workplace).await?),
  }
}

async fn show_list<A: SourceAdapter>(lookup: &CachedLookup<A>, key: &KeyArgs) -> Result<()> {
  let (domain, service, workplace) = (&key.domain, &key.service, &key.workplace);
  let records = if key.safe {
    lookup.safe_list(domain, service, workplace).await?
  } else {
    lookup.list(domain, service, workplace).await?
  };
  print_json(&records)
}

async fn refresh<B: refdata::back_office::BackOffice>(
  reference_data: &ReferenceData<B>,
  datasets: &[Dataset],
) -> Result<()> {
  let mut failed = 0;
  for (dataset, result) in reference_data.refresh_many(datasets).await {
    match result {
      Ok(keys) => println!("{}: {} keys", dataset, keys),
      Err(e) => {
        eprintln!("{}: {}", dataset, e);
        failed += 1;
      }
    }
  }

  if failed > 0 {
    return Err(eyre!("{} dataset(s) failed to refresh", failed));
  }
  Ok(())
}

async fn watch<B: refdata::back_office::BackOffice + 'static>(
  reference_data: ReferenceData<B>,
  config: &Config,
) -> Result<()> {
  let reference_data = Arc::new(reference_data);

  // Warm the cache so the first requests don't wait on the back office
  for (dataset, result) in reference_data.refresh_many(&Dataset::ALL).await {
    if let Err(e) = result {
      error!(%dataset, error = %e, "initial refresh failed");
    }
  }

  let handles = scheduler::spawn_refresh(Arc::clone(&reference_data), config.refresh.schedule());
  info!(tasks = handles.len(), "refresh scheduler running, press Ctrl-C to stop");

  tokio::signal::ctrl_c().await?;
  for handle in handles {
    handle.abort();
  }
  info!("refresh scheduler stopped");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_lookup_command() {
    let args = Args::parse_from([
      "refdata", "lookup", "system-parameter", "SYS", "SYS", "RSTU", "--code", "MAX_IDLE_MINS",
    ]);
    match args.command {
      Command::Lookup { key, code } => {
        assert_eq!(key.dataset, Dataset::SystemParameter);
        assert_eq!(key.workplace, "RSTU");
        assert!(!key.safe);
        assert_eq!(code.as_deref(), Some("MAX_IDLE_MINS"));
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_refresh_without_datasets_means_all() {
    let args = Args::parse_from(["refdata", "refresh"]);
    match args.command {
      Command::Refresh { datasets } => assert_eq!(or_all(datasets).len(), Dataset::ALL.len()),
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_unknown_dataset_is_rejected() {
    assert!(Args::try_parse_from(["refdata", "clear", "invoices"]).is_err());
  }
}
