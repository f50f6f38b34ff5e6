//! Discovery of the module tree.
//!
//! ```text
//! modules/
//!   crm/                  module      -> namespace "crm"
//!     customer/           submodule   -> entity "customer"
//!       doctype.json      entity description (required)
//!       hooks.toml        lifecycle hooks (optional)
//! ```
//!
//! The walk is a single pass in sorted directory order. A submodule without
//! a description is skipped. A description that cannot be read, parsed or
//! compiled is reported and skipped without affecting other entities. A
//! broken `hooks.toml` aborts discovery.

use schemaforge_engine::CrudBinding;
use schemaforge_hooks::{HookLoadError, HookLoader};
use schemaforge_model::{
    CompileWarning, Compiled, Compiler, EntityDescription, EntityHooks, EntityKey,
    EntityRegistry, ModelError, RegistryBuilder,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name of an entity description inside a submodule directory.
pub const DESCRIPTION_FILE: &str = "doctype.json";

/// Failures that abort discovery as a whole.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Hooks(#[from] HookLoadError),
}

/// Why one entity was left out.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("cannot read description: {0}")]
    Unreadable(#[source] std::io::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug)]
pub struct SkippedEntity {
    pub dir: PathBuf,
    pub reason: SkipReason,
}

/// What a discovery pass did.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Keys registered, in discovery order. A key appears once per
    /// registration, so a replaced key shows up twice.
    pub registered: Vec<EntityKey>,
    /// Keys whose earlier registration was replaced by a later one.
    pub replaced: Vec<EntityKey>,
    pub skipped: Vec<SkippedEntity>,
    pub warnings: Vec<(EntityKey, CompileWarning)>,
}

/// The result of discovery: the frozen registry and one CRUD binding per
/// registered entity.
#[derive(Debug)]
pub struct Discovered {
    pub registry: Arc<EntityRegistry>,
    pub bindings: BTreeMap<EntityKey, CrudBinding>,
    pub report: DiscoveryReport,
}

/// Walks `root` and compiles every entity description found.
pub fn discover(
    root: &Path,
    compiler: &Compiler,
    loader: &HookLoader,
) -> Result<Discovered, DiscoveryError> {
    let mut builder = RegistryBuilder::new();
    let mut entity_hooks: HashMap<EntityKey, Option<Arc<dyn EntityHooks>>> = HashMap::new();
    let mut report = DiscoveryReport::default();

    for module in subdirectories(root)? {
        for dir in subdirectories(&module)? {
            let description = dir.join(DESCRIPTION_FILE);
            if !description.is_file() {
                debug!(dir = %dir.display(), "no entity description, skipping");
                continue;
            }

            let hooks = loader.load(&dir)?;

            let (key, compiled) = match compile_entry(compiler, &module, &dir, &description) {
                Ok(found) => found,
                Err(reason) => {
                    warn!(dir = %dir.display(), error = %reason, "skipping entity");
                    report.skipped.push(SkippedEntity { dir, reason });
                    continue;
                }
            };

            for warning in compiled.warnings {
                warn!(entity = %key, "{warning}");
                report.warnings.push((key.clone(), warning));
            }

            let bound = match &hooks {
                Some(unit) => Some(unit.bind(&compiled.entity)?),
                None => None,
            };

            if builder.register(key.clone(), compiled.entity).is_some() {
                warn!(entity = %key, dir = %dir.display(), "replacing earlier registration");
                report.replaced.push(key.clone());
            }
            entity_hooks.insert(key.clone(), bound);

            info!(entity = %key, hooks = hooks.is_some(), "registered entity");
            report.registered.push(key);
        }
    }

    let registry = Arc::new(builder.freeze());
    let bindings = registry
        .entries()
        .into_iter()
        .map(|entry| {
            let binding = match entity_hooks.remove(entry.key()).flatten() {
                Some(hooks) => CrudBinding::with_hooks(entry.clone(), hooks),
                None => CrudBinding::new(entry.clone()),
            };
            (entry.key().clone(), binding)
        })
        .collect();
    info!(
        entities = registry.len(),
        skipped = report.skipped.len(),
        warnings = report.warnings.len(),
        "discovery complete"
    );
    Ok(Discovered {
        registry,
        bindings,
        report,
    })
}

fn compile_entry(
    compiler: &Compiler,
    module: &Path,
    dir: &Path,
    description: &Path,
) -> Result<(EntityKey, Compiled), SkipReason> {
    let key = EntityKey::new(&dir_name(module), &dir_name(dir))?;
    let text = std::fs::read_to_string(description).map_err(SkipReason::Unreadable)?;
    let description = EntityDescription::from_json(&text)?;
    let compiled = compiler.compile(&description)?;
    Ok((key, compiled))
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Immediate subdirectories of `dir`, sorted by name. Names starting with
/// `.` or `_` are left out.
fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let io = |source: std::io::Error| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with(['.', '_']));
        if path.is_dir() && !hidden {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
