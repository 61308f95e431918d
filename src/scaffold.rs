//! Project scaffolding
//!
//! `taller new <name>` lays out a project that is also a Cargo package: its
//! `src/main.rs` pulls in `app/Models/mod.rs` and hands that module's catalog
//! to [`crate::cli::main`]. `taller make:model <Name>` writes the model source
//! and registers it in `app/Models/mod.rs`, so `cargo run -- train <Name>`
//! finds it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::MODELS_DIR;
use crate::naming::canonicalize;
use crate::{Error, Result};

/// Directories every project starts with.
pub const PROJECT_DIRS: [&str; 6] = [
    "app/Models",
    "app/Pipelines",
    "config",
    "database/datasets",
    "src",
    "storage/checkpoints",
];

/// Model registry module, relative to the project root.
pub const REGISTRY_FILE: &str = "app/Models/mod.rs";

const MODULES_MARKER: &str = "// taller:modules";
const MODELS_MARKER: &str = "// taller:models";

const MODEL_STUB: &str = include_str!("stubs/model.rs.stub");
const REGISTRY_STUB: &str = include_str!("stubs/registry.rs.stub");
const MAIN_STUB: &str = include_str!("stubs/main.rs.stub");
const MANIFEST_STUB: &str = include_str!("stubs/Cargo.toml.stub");

const APP_CONFIG: &str = r#"app:
  name: "My ML App"
  env: "local"
  debug: true

data:
  default_loader: "local"

storage:
  checkpoints_path: "storage/checkpoints"
"#;

/// Creates a new project directory tree.
#[derive(Debug, Clone)]
pub struct ProjectScaffolder {
    name: String,
    base: PathBuf,
}

impl ProjectScaffolder {
    /// Scaffold `name` inside `parent`.
    #[must_use]
    pub fn new(parent: impl AsRef<Path>, name: impl Into<String>) -> Self {
        let name = name.into();
        let base = parent.as_ref().join(&name);
        Self { name, base }
    }

    /// Project directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Create directories and initial files. Returns the created paths,
    /// relative to the project directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scaffold`] if the project directory already exists, or
    /// [`Error::Io`] on filesystem failures.
    pub fn build(&self) -> Result<Vec<PathBuf>> {
        if self.base.exists() {
            return Err(Error::Scaffold(format!(
                "Directory {} already exists",
                self.base.display()
            )));
        }

        let mut created = Vec::new();
        for dir in PROJECT_DIRS {
            fs::create_dir_all(self.base.join(dir))?;
            created.push(PathBuf::from(dir));
        }

        let files = [
            ("Cargo.toml", self.manifest()),
            ("src/main.rs", MAIN_STUB.replace("{{ project_name }}", &self.name)),
            (REGISTRY_FILE, REGISTRY_STUB.to_string()),
            ("config/app.yaml", APP_CONFIG.to_string()),
            ("README.md", self.readme()),
        ];
        for (path, content) in files {
            fs::write(self.base.join(path), content)?;
            created.push(PathBuf::from(path));
        }

        Ok(created)
    }

    fn manifest(&self) -> String {
        MANIFEST_STUB
            .replace("{{ package_name }}", &package_name(&self.name))
            .replace("{{ taller_version }}", env!("CARGO_PKG_VERSION"))
    }

    fn readme(&self) -> String {
        format!(
            "# {}\n\nCreate a model with `taller make:model <ModelName>`, then train it with `cargo run -- train <ModelName>`.\n",
            self.name
        )
    }
}

fn package_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

fn is_type_name(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Insert `line` just above the line holding `marker`, at the marker's indent.
fn insert_before_marker(source: &str, marker: &str, line: &str) -> Option<String> {
    let mut out = String::with_capacity(source.len() + line.len() + 8);
    let mut found = false;
    for current in source.split_inclusive('\n') {
        if !found && current.trim() == marker {
            let indent = &current[..current.len() - current.trim_start().len()];
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
            found = true;
        }
        out.push_str(current);
    }
    found.then_some(out)
}

/// Add the module declaration and catalog entry for `identifier` to the
/// registry source.
///
/// # Errors
///
/// Returns [`Error::Scaffold`] when either marker comment is missing.
pub fn register_model(registry: &str, identifier: &str) -> Result<String> {
    let key = canonicalize(identifier);
    let module = format!("pub mod {key};");
    let entry = format!(
        "models.register(\"{key}\", |ns| {{ ns.model_from_config::<{key}::{identifier}>(\"{identifier}\"); }});"
    );

    insert_before_marker(registry, MODULES_MARKER, &module)
        .and_then(|source| insert_before_marker(&source, MODELS_MARKER, &entry))
        .ok_or_else(|| {
            Error::Scaffold(format!(
                "{REGISTRY_FILE} is missing the '{MODULES_MARKER}' or '{MODELS_MARKER}' marker"
            ))
        })
}

/// Render the model stub for `identifier`.
#[must_use]
pub fn render_model_stub(identifier: &str) -> String {
    MODEL_STUB.replace("{{ class_name }}", identifier)
}

/// Write `app/Models/<canonical>.rs` for `identifier` under `root` and
/// register it in `app/Models/mod.rs`, creating the registry if absent.
///
/// # Errors
///
/// Returns [`Error::ModelsDirMissing`] outside a project, [`Error::Scaffold`]
/// if `identifier` is not a type name, the file already exists or the
/// registry has lost its markers, or [`Error::Io`].
pub fn make_model(root: impl AsRef<Path>, identifier: &str) -> Result<PathBuf> {
    let root = root.as_ref();
    let dir = root.join(MODELS_DIR);
    if !dir.is_dir() {
        return Err(Error::ModelsDirMissing(dir));
    }
    if !is_type_name(identifier) {
        return Err(Error::Scaffold(format!(
            "'{identifier}' is not a valid type name"
        )));
    }

    let path = dir.join(format!("{}.rs", canonicalize(identifier)));
    if path.exists() {
        return Err(Error::Scaffold(format!(
            "Model {identifier} already exists at {}",
            path.display()
        )));
    }

    let registry_path = root.join(REGISTRY_FILE);
    let registry = match fs::read_to_string(&registry_path) {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => REGISTRY_STUB.to_string(),
        Err(e) => return Err(e.into()),
    };
    let registry = register_model(&registry, identifier)?;

    fs::write(&path, render_model_stub(identifier))?;
    fs::write(&registry_path, registry)?;
    Ok(path)
}
