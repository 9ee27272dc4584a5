//! Locating class declarations behind references.

use graft_analyzer::{ClassMetadata, FileAnalysis, ParameterMetadata, ProgramIndex, SymbolRef};
use rustc_hash::FxHashSet as HashSet;
use std::path::{Path, PathBuf};

use crate::types::{ClassTarget, ConstructorParam, DependencyKind, ImportRef};

/// Inheritance chains are followed at most this deep.
const MAX_HERITAGE_DEPTH: usize = 64;

/// Resolves class references against the analysis set.
#[derive(Debug, Clone, Copy)]
pub struct ClassLocator<'a> {
    index: ProgramIndex<'a>,
}

impl<'a> ClassLocator<'a> {
    pub fn new(index: ProgramIndex<'a>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> ProgramIndex<'a> {
        self.index
    }

    /// Class a name visible in `file` refers to.
    pub fn find(&self, file: &Path, name: &str) -> Option<(&'a Path, &'a ClassMetadata)> {
        self.index.class(file, name)
    }

    /// Target for a class declared in `file`.
    pub fn declared(&self, file: &Path, class: &ClassMetadata) -> ClassTarget {
        ClassTarget {
            name: class.name.clone(),
            file: Some(file.to_path_buf()),
            import: ImportRef {
                source: file.display().to_string(),
                export_name: self.export_alias(file, &class.name),
            },
            params: self.effective_params(file, class),
            inject_sites: self
                .index
                .file(file)
                .map(|analysis| class_inject_sites(analysis, &class.name))
                .unwrap_or_default(),
        }
    }

    /// Target for a symbolic reference written in `from`.
    ///
    /// Unresolvable references (package imports, namespace members) still
    /// yield a target that generated code can import; it just has no
    /// constructor metadata.
    pub fn reference(&self, from: &Path, symbol: &SymbolRef) -> ClassTarget {
        if let Some((file, class)) = self.find(from, &symbol.name) {
            let mut target = self.declared(file, class);
            if target.import.export_name.is_none() && symbol.import_source.is_some() {
                target.import = self.written_import(from, symbol);
            }
            return target;
        }

        ClassTarget {
            name: symbol.name.clone(),
            file: None,
            import: self.written_import(from, symbol),
            params: Vec::new(),
            inject_sites: Vec::new(),
        }
    }

    fn written_import(&self, from: &Path, symbol: &SymbolRef) -> ImportRef {
        match &symbol.import_source {
            Some(source) => ImportRef {
                source: source.clone(),
                export_name: Some(symbol.export_name().to_string()),
            },
            None => ImportRef {
                source: from.display().to_string(),
                export_name: self.export_alias(from, &symbol.name),
            },
        }
    }

    /// Smallest exported alias of `local` in `file`.
    pub fn export_alias(&self, file: &Path, local: &str) -> Option<String> {
        self.index.file(file).and_then(|analysis| {
            analysis
                .exports
                .iter()
                .find(|(_, target)| target.as_str() == local)
                .map(|(exported, _)| exported.clone())
        })
    }

    /// Constructor parameters, inherited from the nearest ancestor that
    /// declares a constructor.
    pub fn effective_params(&self, file: &Path, class: &ClassMetadata) -> Vec<ConstructorParam> {
        let mut current = Some((file, class));
        let mut seen = HashSet::default();
        while let Some((file, class)) = current {
            if !seen.insert((file.to_path_buf(), class.name.clone())) || seen.len() > MAX_HERITAGE_DEPTH {
                break;
            }
            if let Some(params) = &class.constructor {
                return params.iter().map(constructor_param).collect();
            }
            current = self.parent(file, class);
        }
        Vec::new()
    }

    /// Direct base class, when it can be found.
    pub fn parent(&self, file: &Path, class: &ClassMetadata) -> Option<(&'a Path, &'a ClassMetadata)> {
        let extends = class.heritage.extends.as_ref()?;
        self.find(file, &extends.name)
    }

    /// Every resolvable ancestor, nearest first.
    pub fn ancestors(&self, file: &Path, class: &ClassMetadata) -> Vec<(&'a Path, &'a ClassMetadata)> {
        let mut chain = Vec::new();
        let mut seen: HashSet<(PathBuf, String)> = HashSet::default();
        seen.insert((file.to_path_buf(), class.name.clone()));
        let mut current = self.parent(file, class);
        while let Some((file, class)) = current {
            if !seen.insert((file.to_path_buf(), class.name.clone())) || chain.len() >= MAX_HERITAGE_DEPTH {
                break;
            }
            chain.push((file, class));
            current = self.parent(file, class);
        }
        chain
    }
}

/// Valid `inject()` sites inside the body of class `name`.
pub fn class_inject_sites(analysis: &FileAnalysis, name: &str) -> Vec<graft_analyzer::InjectSite> {
    analysis
        .inject_sites
        .iter()
        .filter(|site| site.is_valid() && site.enclosing_class.as_deref() == Some(name))
        .cloned()
        .collect()
}

fn constructor_param(param: &ParameterMetadata) -> ConstructorParam {
    let kind = if param.decorator("Inject").is_some() {
        DependencyKind::InjectDecorator
    } else {
        DependencyKind::ParamType
    };
    ConstructorParam {
        token: param.token().map(String::from),
        optional: param.optional || param.decorator("Optional").is_some(),
        kind,
    }
}
