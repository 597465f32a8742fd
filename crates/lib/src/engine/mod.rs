//! The incremental build engine.
//!
//! An [`Engine`] owns one loaded config, its lock and its durable record. Each
//! [`Engine::run`] walks the prereqs and then the outputs in declaration order,
//! regenerating whatever is stale, and finally persists the manifest and the
//! record if they changed.

pub mod emit;
pub mod freshness;
pub mod manifest;
pub mod state;
pub mod types;
pub mod watch;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::asset::{Asset, AssetHandler, HandlerRegistry, ToolRunner};
use crate::config::{self, AssetDecl, Config, ConfigError, expand_decl};
use crate::consts::STATE_FILENAME;
use crate::fetch::Fetcher;
use crate::lock::ConfigLock;
use crate::platform::paths::config_data_dir;
use crate::util::hash::ConfigId;

use emit::{BuildContext, EmitError, Ledger};
use freshness::Freshness;
use manifest::write_manifest;
use state::{BuildState, StateStore};

pub use types::{BuildError, CleanSummary, EngineOptions, Phase, RunSummary};
pub use watch::{WatchOptions, WatchSummary, Watcher};

/// An asset paired with the handler that generates it.
#[derive(Debug, Clone)]
struct Planned {
  asset: Asset,
  handler: Arc<dyn AssetHandler>,
}

#[derive(Debug)]
pub struct Engine {
  config: Config,
  force: bool,
  prereqs: Vec<Planned>,
  outputs: Vec<Planned>,
  tools: ToolRunner,
  store: StateStore,
  ledger: Ledger,
  initialized: bool,
  interrupt: Option<Arc<AtomicBool>>,
  lock: ConfigLock,
}

impl Engine {
  /// Loads the config at `config_path`, takes its lock and loads its durable
  /// record.
  pub fn open(
    config_path: &Path,
    options: &EngineOptions,
    registry: &HandlerRegistry,
    fetcher: &dyn Fetcher,
  ) -> Result<Self, BuildError> {
    let config = config::load(config_path, &options.profile).map_err(|source| BuildError::Config {
      config: config_path.to_path_buf(),
      source,
    })?;

    let data_dir = config_data_dir(&options.data_root, &ConfigId::for_path(&config.path));
    let lock = ConfigLock::acquire(&data_dir, &config.path)?;

    let wrap = |source| BuildError::Config {
      config: config.path.clone(),
      source,
    };
    let prereqs = plan(&config, &config.prereqs, registry, fetcher).map_err(wrap)?;
    let outputs = plan(&config, &config.generate, registry, fetcher).map_err(wrap)?;

    let store = StateStore::new(data_dir.join(STATE_FILENAME));
    let ledger = Ledger {
      state: store.load(),
      ..Ledger::default()
    };
    let tools = ToolRunner::new(config.env.clone(), config.base_dir.clone());

    info!(
      config = %config.path.display(),
      profile = %options.profile,
      prereqs = prereqs.len(),
      outputs = outputs.len(),
      "opened config"
    );

    Ok(Self {
      config,
      force: options.force,
      prereqs,
      outputs,
      tools,
      store,
      ledger,
      initialized: false,
      interrupt: options.interrupt.clone(),
      lock,
    })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn config_path(&self) -> &Path {
    &self.config.path
  }

  /// Current in-memory build record.
  pub fn state(&self) -> &BuildState {
    &self.ledger.state
  }

  pub fn state_path(&self) -> &Path {
    self.store.path()
  }

  pub fn lock_path(&self) -> &Path {
    self.lock.lock_path()
  }

  /// Concrete prereq and output assets, in run order.
  pub fn assets(&self) -> impl Iterator<Item = (Phase, &Asset)> {
    let prereqs = self.prereqs.iter().map(|p| (Phase::Prereq, &p.asset));
    let outputs = self.outputs.iter().map(|p| (Phase::Output, &p.asset));
    prereqs.chain(outputs)
  }

  /// Brings every asset up to date.
  pub fn run(&mut self) -> Result<RunSummary, BuildError> {
    if !self.initialized {
      let dir = &self.config.output.directory;
      fs::create_dir_all(dir).map_err(|source| EmitError::CreateDir {
        path: dir.clone(),
        source,
      })?;
      self.initialized = true;
    }
    self.ledger.mtimes.clear();

    let mut summary = RunSummary {
      prereqs_generated: self.run_phase(Phase::Prereq)?,
      outputs_generated: self.run_phase(Phase::Output)?,
      ..RunSummary::default()
    };

    let output = &self.config.output;
    match &output.manifest {
      Some(path) if self.ledger.manifest_dirty || output.manifest_force || self.force => {
        write_manifest(path, &self.ledger.state.manifest)?;
        info!(path = %path.display(), "updated manifest");
        summary.manifest_written = true;
        self.ledger.manifest_dirty = false;
      }
      Some(_) => {}
      None => self.ledger.manifest_dirty = false,
    }

    if self.ledger.state_dirty {
      self.store.save(&self.ledger.state)?;
      summary.state_written = true;
      self.ledger.state_dirty = false;
    }

    debug!(
      config = %self.config.path.display(),
      generated = summary.generated(),
      "run finished"
    );
    Ok(summary)
  }

  fn run_phase(&mut self, phase: Phase) -> Result<usize, BuildError> {
    let planned = match phase {
      Phase::Prereq => &self.prereqs,
      Phase::Output => &self.outputs,
    };
    let freshness = Freshness {
      force: self.force,
      phase,
      config_path: &self.config.path,
      base_dir: &self.config.base_dir,
      output_dir: &self.config.output.directory,
    };
    let ledger = &mut self.ledger;

    let mut generated = 0;
    for item in planned {
      if self.interrupt.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
        return Err(BuildError::Interrupted);
      }
      let key = item.asset.path.as_str();
      if freshness.is_fresh(key, &item.asset.depends, &mut ledger.state, &mut ledger.mtimes) {
        debug!(asset = key, %phase, "fresh");
        continue;
      }

      match phase {
        Phase::Prereq => ledger.state.prereqs.remove(key),
        Phase::Output => ledger.state.outputs.remove(key),
      };
      ledger.state_dirty = true;

      let mut ctx = BuildContext::new(
        phase,
        key,
        &self.config.base_dir,
        &self.config.output,
        &self.tools,
        ledger,
      );
      item
        .handler
        .generate(&item.asset, &mut ctx)
        .map_err(|source| BuildError::Generate {
          asset: key.to_string(),
          source,
        })?;
      generated += 1;
    }
    Ok(generated)
  }

  /// Removes generated prereqs, the output directory and the durable record.
  pub fn clean(&mut self) -> Result<CleanSummary, BuildError> {
    let mut summary = CleanSummary::default();

    for paths in self.ledger.state.prereqs.values() {
      for path in paths {
        let full = self.config.base_dir.join(path);
        if remove_path(&full, false)? {
          info!(path = %path, "removed prereq");
          summary.prereqs_removed += 1;
        }
      }
    }

    let output_dir = &self.config.output.directory;
    if output_dir.is_dir() && remove_path(output_dir, true)? {
      info!(path = %output_dir.display(), "removed output directory");
      summary.output_dir_removed = true;
    }

    summary.state_removed = self.store.remove()?;
    self.ledger = Ledger::default();
    self.initialized = false;
    Ok(summary)
  }
}

/// Expands and instantiates every declaration of one phase.
fn plan(
  config: &Config,
  decls: &[AssetDecl],
  registry: &HandlerRegistry,
  fetcher: &dyn Fetcher,
) -> Result<Vec<Planned>, ConfigError> {
  let mut planned = Vec::new();
  for decl in decls {
    let handler: Arc<dyn AssetHandler> = Arc::from(registry.create(&decl.kind, &decl.spec)?);
    for expanded in expand_decl(&config.base_dir, decl, fetcher)? {
      planned.push(Planned {
        asset: Asset {
          path: expanded.output,
          kind: decl.kind.clone(),
          sources: expanded.sources,
          depends: expanded.depends,
          spec: decl.spec.clone(),
        },
        handler: Arc::clone(&handler),
      });
    }
  }
  Ok(planned)
}

/// Deletes a file or directory tree, returning whether anything was there.
fn remove_path(path: &Path, dir: bool) -> Result<bool, BuildError> {
  let result = if dir {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  };
  match result {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(source) => Err(BuildError::Clean {
      path: PathBuf::from(path),
      source,
    }),
  }
}
