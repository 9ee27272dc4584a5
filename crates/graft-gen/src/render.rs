//! Lowering analyzer values back into source text.

use graft_analyzer::{AnalyzerValue, FactoryCapture, InjectSite, RecordEntry, RecordKey};
use std::path::Path;

use crate::error::{GenError, Result};
use crate::imports::{ImportTable, quote, split_member};

/// Renders the replacement for an `inject()` call site.
pub type InjectRenderer<'f> = dyn Fn(&InjectSite) -> Result<String> + 'f;

/// Renders values as executable expressions, importing what they reference.
pub struct Renderer<'t, 'a> {
    imports: &'t mut ImportTable<'a>,
    sort_keys: bool,
}

impl<'t, 'a> Renderer<'t, 'a> {
    pub fn new(imports: &'t mut ImportTable<'a>) -> Self {
        Self {
            imports,
            sort_keys: false,
        }
    }

    /// Emit record properties in key order. Records containing a spread
    /// keep their written order.
    pub fn sorted(mut self) -> Self {
        self.sort_keys = true;
        self
    }

    pub fn imports(&mut self) -> &mut ImportTable<'a> {
        self.imports
    }

    /// `value` as written in `file`.
    pub fn value(&mut self, file: &Path, value: &AnalyzerValue, inject: &InjectRenderer<'_>) -> Result<String> {
        Ok(match value {
            AnalyzerValue::Null => "null".to_string(),
            AnalyzerValue::Undefined => "undefined".to_string(),
            AnalyzerValue::Bool(b) => b.to_string(),
            AnalyzerValue::Num(n) => number(*n),
            AnalyzerValue::Str(s) => quote(s),
            AnalyzerValue::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.value(file, item, inject))
                    .collect::<Result<Vec<_>>>()?;
                format!("[{}]", items.join(", "))
            }
            AnalyzerValue::Record(entries) => self.record(file, entries, inject)?,
            AnalyzerValue::Spread(inner) => format!("...{}", self.value(file, inner, inject)?),
            AnalyzerValue::SymbolicRef(symbol) => self.imports.symbol(file, symbol)?,
            AnalyzerValue::ForwardRef(name) => self.imports.binding(file, name)?,
            AnalyzerValue::CallExpr(call) => {
                let callee = self.callee(file, &call.callee, call.import_source.as_deref())?;
                format!("{callee}({})", self.args(file, &call.args, inject)?)
            }
            AnalyzerValue::NewExpr(new) => {
                let class = self.callee(file, &new.class_name, new.import_source.as_deref())?;
                format!("new {class}({})", self.args(file, &new.args, inject)?)
            }
            AnalyzerValue::FactoryCapture(capture) => format!("({})", self.capture(file, capture, inject)?),
            AnalyzerValue::Opaque(text) => format!("({text})"),
        })
    }

    /// Captured function text with every dependency identifier replaced by
    /// its import alias and every `inject()` call by `inject`'s rendering.
    ///
    /// Splices are applied from the highest offset down so earlier offsets
    /// stay valid. Identifiers inside an `inject()` call are replaced
    /// together with the call.
    pub fn capture(&mut self, file: &Path, capture: &FactoryCapture, inject: &InjectRenderer<'_>) -> Result<String> {
        let mut splices: Vec<(u32, u32, String)> = Vec::new();
        for site in &capture.inject_sites {
            splices.push((site.start, site.end, inject(&site.site)?));
        }
        for dep in &capture.deps {
            let inside_inject = capture
                .inject_sites
                .iter()
                .any(|site| site.start <= dep.start && dep.end <= site.end);
            if inside_inject {
                continue;
            }
            let alias = self.imports.binding(file, &dep.name)?;
            let text = if dep.shorthand {
                format!("{}: {alias}", dep.name)
            } else {
                alias
            };
            splices.push((dep.start, dep.end, text));
        }
        splices.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        let mut code = capture.code.clone();
        let mut limit = code.len();
        for (start, end, text) in splices {
            let (start, end) = (start as usize, end as usize);
            let valid = start <= end
                && end <= limit
                && code.is_char_boundary(start)
                && code.is_char_boundary(end);
            if !valid {
                return Err(GenError::unrenderable(
                    format!("captured function in {}", file.display()),
                    format!("splice {start}..{end} does not fit the captured text"),
                ));
            }
            code.replace_range(start..end, &text);
            limit = start;
        }
        Ok(code)
    }

    fn record(&mut self, file: &Path, entries: &[RecordEntry], inject: &InjectRenderer<'_>) -> Result<String> {
        let mut ordered: Vec<&RecordEntry> = entries.iter().collect();
        let has_spread = entries.iter().any(|e| matches!(e, RecordEntry::Spread { .. }));
        if self.sort_keys && !has_spread {
            ordered.sort_by(|a, b| entry_key(a).cmp(&entry_key(b)));
        }

        let mut parts = Vec::with_capacity(ordered.len());
        for entry in ordered {
            parts.push(match entry {
                RecordEntry::Property { key, value } => {
                    format!("{}: {}", property_key(key), self.value(file, value, inject)?)
                }
                RecordEntry::Spread { value } => format!("...{}", self.value(file, value, inject)?),
            });
        }
        Ok(if parts.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", parts.join(", "))
        })
    }

    /// Callees carry their imported name, not the local alias.
    fn callee(&mut self, file: &Path, callee: &str, import_source: Option<&str>) -> Result<String> {
        let (root, rest) = split_member(callee);
        match import_source {
            Some(source) => Ok(format!("{}{rest}", self.imports.imported(file, source, root))),
            None => Ok(format!("{}{rest}", self.imports.binding(file, root)?)),
        }
    }

    fn args(&mut self, file: &Path, args: &[AnalyzerValue], inject: &InjectRenderer<'_>) -> Result<String> {
        let args = args
            .iter()
            .map(|arg| self.value(file, arg, inject))
            .collect::<Result<Vec<_>>>()?;
        Ok(args.join(", "))
    }
}

fn entry_key(entry: &RecordEntry) -> (u8, &str) {
    match entry {
        RecordEntry::Property {
            key: RecordKey::Static(name),
            ..
        } => (0, name),
        RecordEntry::Property {
            key: RecordKey::Computed(text),
            ..
        } => (1, text),
        RecordEntry::Spread { .. } => (2, ""),
    }
}

/// Object key, quoted unless it is a plain identifier.
pub fn property_key(key: &RecordKey) -> String {
    match key {
        RecordKey::Static(name) if is_identifier(name) => name.clone(),
        RecordKey::Static(name) => quote(name),
        RecordKey::Computed(text) => format!("[{text}]"),
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// JavaScript numeric literal.
pub fn number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Inert data literal for a value: references and code become tagged
/// records instead of live bindings.
pub fn data(value: &AnalyzerValue) -> String {
    match value {
        AnalyzerValue::Null => "null".to_string(),
        AnalyzerValue::Undefined => "undefined".to_string(),
        AnalyzerValue::Bool(b) => b.to_string(),
        AnalyzerValue::Num(n) => number(*n),
        AnalyzerValue::Str(s) => quote(s),
        AnalyzerValue::Array(items) => {
            format!("[{}]", items.iter().map(data).collect::<Vec<_>>().join(", "))
        }
        AnalyzerValue::Record(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|entry| match entry {
                    RecordEntry::Property {
                        key: RecordKey::Static(name),
                        value,
                    } => format!("{}: {}", property_key(&RecordKey::Static(name.clone())), data(value)),
                    RecordEntry::Property {
                        key: RecordKey::Computed(text),
                        value,
                    } => format!("{}: {}", quote(&format!("[{text}]")), data(value)),
                    RecordEntry::Spread { value } => format!("\"...\": {}", data(value)),
                })
                .collect();
            if parts.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {} }}", parts.join(", "))
            }
        }
        AnalyzerValue::Spread(inner) => format!("{{ $spread: {} }}", data(inner)),
        AnalyzerValue::SymbolicRef(symbol) => format!("{{ $ref: {} }}", quote(&symbol.name)),
        AnalyzerValue::ForwardRef(name) => format!("{{ $ref: {} }}", quote(name)),
        AnalyzerValue::CallExpr(call) => format!(
            "{{ $call: {}, args: [{}] }}",
            quote(&call.callee),
            call.args.iter().map(data).collect::<Vec<_>>().join(", ")
        ),
        AnalyzerValue::NewExpr(new) => format!(
            "{{ $new: {}, args: [{}] }}",
            quote(&new.class_name),
            new.args.iter().map(data).collect::<Vec<_>>().join(", ")
        ),
        AnalyzerValue::FactoryCapture(capture) => format!("{{ $code: {} }}", quote(&capture.code)),
        AnalyzerValue::Opaque(text) => format!("{{ $code: {} }}", quote(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_analyzer::{
        AnalysisMap, CapturedDependency, CapturedInject, FileAnalysis, ImportBinding, ImportEdge,
        ImportedName, InjectKind, ProgramIndex, SourceSpan, SymbolRef,
    };
    use std::path::PathBuf;

    fn program() -> AnalysisMap {
        let mut analysis = FileAnalysis::new("/app/src/app.ts");
        analysis.imports.push(ImportEdge {
            source: "./clock".into(),
            resolved: "/app/src/clock.ts".into(),
            is_relative: true,
            bindings: vec![
                ImportBinding {
                    local: "Clock".into(),
                    imported: ImportedName::Named("Clock".into()),
                },
                ImportBinding {
                    local: "format".into(),
                    imported: ImportedName::Named("format".into()),
                },
            ],
        });
        let mut program = AnalysisMap::new();
        program.insert(PathBuf::from("/app/src/app.ts"), analysis);
        program
    }

    fn lookup(site: &InjectSite) -> Result<String> {
        Ok(format!("lookup({})", quote(site.token.as_deref().unwrap_or("?"))))
    }

    #[test]
    fn test_capture_splices_from_the_end() {
        let code = "(c) => ({ format, now: inject(Clock).now() })";
        let inject_start = code.find("inject").unwrap() as u32;
        let clock_start = code.find("Clock").unwrap() as u32;
        let format_start = code.find("format").unwrap() as u32;
        let capture = FactoryCapture {
            code: code.to_string(),
            params: vec!["c".into()],
            deps: vec![
                CapturedDependency {
                    name: "format".into(),
                    imported: Some("format".into()),
                    import_source: Some("/app/src/clock.ts".into()),
                    start: format_start,
                    end: format_start + 6,
                    shorthand: true,
                },
                CapturedDependency {
                    name: "Clock".into(),
                    imported: Some("Clock".into()),
                    import_source: Some("/app/src/clock.ts".into()),
                    start: clock_start,
                    end: clock_start + 5,
                    shorthand: false,
                },
            ],
            inject_sites: vec![CapturedInject {
                site: InjectSite {
                    kind: InjectKind::Token,
                    token: Some("Clock".into()),
                    import_source: Some("/app/src/clock.ts".into()),
                    span: SourceSpan::new(0, 0),
                    enclosing_class: None,
                },
                start: inject_start,
                end: inject_start + "inject(Clock)".len() as u32,
            }],
        };

        let program = program();
        let mut imports = ImportTable::new(ProgramIndex::new(&program), "/app/.graft");
        let mut renderer = Renderer::new(&mut imports);
        let out = renderer.capture(Path::new("/app/src/app.ts"), &capture, &lookup).unwrap();
        assert_eq!(out, "(c) => ({ format: format__0, now: lookup(\"Clock\").now() })");
    }

    #[test]
    fn test_sorted_records_and_literals() {
        let value = AnalyzerValue::Record(vec![
            RecordEntry::Property {
                key: RecordKey::Static("prefix".into()),
                value: AnalyzerValue::Str("/api".into()),
            },
            RecordEntry::Property {
                key: RecordKey::Static("max-age".into()),
                value: AnalyzerValue::Num(1.5),
            },
            RecordEntry::Property {
                key: RecordKey::Static("clock".into()),
                value: AnalyzerValue::SymbolicRef(SymbolRef::local("Clock")),
            },
        ]);
        let program = program();
        let mut imports = ImportTable::new(ProgramIndex::new(&program), "/app/.graft");
        let mut renderer = Renderer::new(&mut imports).sorted();
        let out = renderer.value(Path::new("/app/src/app.ts"), &value, &lookup).unwrap();
        assert_eq!(out, "{ clock: Clock__0, \"max-age\": 1.5, prefix: \"/api\" }");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(number(3.0), "3");
        assert_eq!(number(-0.25), "-0.25");
        assert_eq!(number(f64::INFINITY), "Infinity");
        assert_eq!(number(f64::NAN), "NaN");
    }

    #[test]
    fn test_data_tags_references() {
        let value = AnalyzerValue::Array(vec![
            AnalyzerValue::SymbolicRef(SymbolRef::local("cors")),
            AnalyzerValue::Str("x".into()),
        ]);
        assert_eq!(data(&value), "[{ $ref: \"cors\" }, \"x\"]");
    }
}
