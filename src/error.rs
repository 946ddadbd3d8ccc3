use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LuaDocError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Malformed analyzer export: {reason}")]
    #[diagnostic(
        code(export::malformed),
        help("The analyzer export could not be decoded. Re-run the analyzer and check that the backend matches the export format.")
    )]
    MalformedExport { reason: String },
}

/// Configuration errors are the only fatal category: a misspelled option
/// silently ignored would hide user intent, so these are raised before any
/// model building begins.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ConfigError {
    #[error("Unknown option '{name}'")]
    #[diagnostic(
        code(config::unknown_option),
        help("Recognized options: members, undoc-members, private-members, protected-members, package-members, special-members, inherited-members, exclude-members, member-order, module-member-order, recursive.")
    )]
    UnknownOption { name: String },

    #[error("Invalid value '{value}' for option '{name}': {reason}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Non-fatal diagnostics produced while building or querying the model.
///
/// The build always continues past these: documentation generation must stay
/// useful over a partially-annotated or partially-exported codebase.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("Duplicate object '{path}'{}", location_suffix(.location))]
    #[diagnostic(
        code(model::duplicate_name),
        help("The first definition is kept; this one is moved to the orphan bucket.")
    )]
    DuplicateName {
        path: String,
        location: Option<String>,
    },

    #[error("Object '{path}' declares parent '{parent}' which is not a documentable container")]
    #[diagnostic(
        code(model::orphaned),
        help("Orphaned objects render as undocumented. Check the export for a missing or misdeclared parent.")
    )]
    Orphaned { path: String, parent: String },

    #[error("Module '{path}' is nested inside a class and was demoted to a table")]
    #[diagnostic(code(model::module_in_class))]
    ModuleInClass { path: String },

    #[error("Cannot resolve reference '{name}' from '{scope}'")]
    #[diagnostic(
        code(resolve::not_found),
        help("The original text is kept verbatim in the output.")
    )]
    UnresolvedReference { name: String, scope: String },

    #[error("Cannot resolve base type '{name}' of class '{class}'")]
    #[diagnostic(code(resolve::unresolved_base))]
    UnresolvedBase { name: String, class: String },

    #[error("Class '{path}' appears in its own inheritance chain")]
    #[diagnostic(
        code(inherit::cycle),
        help("The cycle is broken by skipping already-visited classes.")
    )]
    InheritanceCycle { path: String },

    #[error("Unknown doctype override '{doctype}' on object '{path}'")]
    #[diagnostic(code(model::unknown_doctype))]
    UnknownDoctype { path: String, doctype: String },
}

fn location_suffix(location: &Option<String>) -> String {
    match location {
        Some(loc) => format!(" (defined at {loc})"),
        None => String::new(),
    }
}

/// Collects warnings during a build, mirroring them to the `log` facade so
/// they show up even when the caller discards the collected list.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
