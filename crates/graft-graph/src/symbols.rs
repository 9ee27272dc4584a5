//! Optional symbol resolution for advisory warnings.

use graft_analyzer::AnalysisMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Whole-program symbol lookups used only for non-fatal advisories.
///
/// Implementations may be partial; an unknown name is never an error.
pub trait SymbolResolver: Send + Sync {
    /// Whether `name` is declared as an interface anywhere.
    fn is_interface(&self, name: &str) -> bool;

    /// Classes declaring `implements <name>`, sorted.
    fn implementors(&self, name: &str) -> Vec<String>;
}

/// [`SymbolResolver`] backed by the analysis set.
#[derive(Debug, Clone, Default)]
pub struct ProgramSymbols {
    interfaces: BTreeSet<String>,
    implementors: BTreeMap<String, BTreeSet<String>>,
}

impl ProgramSymbols {
    pub fn new(files: &AnalysisMap) -> Self {
        let mut symbols = Self::default();
        for analysis in files.values() {
            symbols.interfaces.extend(analysis.interfaces.iter().cloned());
            for class in &analysis.classes {
                for clause in &class.heritage.implements {
                    symbols
                        .implementors
                        .entry(clause.name.clone())
                        .or_default()
                        .insert(class.name.clone());
                }
            }
        }
        symbols
    }
}

impl SymbolResolver for ProgramSymbols {
    fn is_interface(&self, name: &str) -> bool {
        self.interfaces.contains(name)
    }

    fn implementors(&self, name: &str) -> Vec<String> {
        self.implementors
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Non-fatal findings collected while building the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GraphWarning {
    /// A provider token or constructor type names an interface that no
    /// class implements.
    UnimplementedInterface {
        module: String,
        token: String,
        interface: String,
    },
    /// A constructor parameter type no module provides.
    UnresolvedDependency {
        module: String,
        consumer: String,
        token: String,
        file: PathBuf,
    },
}

impl fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnimplementedInterface {
                module,
                token,
                interface,
            } => write!(
                f,
                "[graft] '{token}' in module '{module}' is bound to interface '{interface}', which no class implements"
            ),
            Self::UnresolvedDependency {
                module,
                consumer,
                token,
                file,
            } => write!(
                f,
                "[graft] '{consumer}' in module '{module}' depends on '{token}', which no module provides ({})",
                file.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_analyzer::{FileAnalysis, MemoryRuntime, SourceAnalyzer};
    use std::path::Path;
    use std::sync::Arc;

    #[test]
    fn test_program_symbols() {
        let analyzer = SourceAnalyzer::new(Arc::new(MemoryRuntime::new("/app")));
        let path = Path::new("/app/src/repo.ts");
        let analysis: FileAnalysis = analyzer
            .analyze(
                path,
                "export interface Repo {}\nexport interface Cache {}\nexport class SqlRepo implements Repo {}",
            )
            .unwrap();
        let files = AnalysisMap::from([(path.to_path_buf(), analysis)]);
        let symbols = ProgramSymbols::new(&files);

        assert!(symbols.is_interface("Repo"));
        assert!(!symbols.is_interface("SqlRepo"));
        assert_eq!(symbols.implementors("Repo"), vec!["SqlRepo".to_string()]);
        assert!(symbols.implementors("Cache").is_empty());
    }
}
