//! Class metadata registry generation.
//!
//! The registry is a `Map` from node id to a deep-frozen description of the
//! class; the map itself is sealed so `set`, `delete` and `clear` throw.
//! Properties are flattened across `extends` chains and the
//! `Partial`/`Pick`/`Omit`/`Required` heritage helpers, own properties
//! overriding inherited ones.

use graft_adapter::relative_path;
use graft_analyzer::{
    ClassMetadata, DecoratorMetadata, HeritageClause, ParameterMetadata, ProgramIndex,
    TypeArgument,
};
use graft_graph::{ModuleNode, Scope};
use rustc_hash::FxHashSet as HashSet;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::imports::quote;
use crate::render::data;
use crate::runtime::{DEEP_FREEZE, HEADER, SEAL};
use crate::writer::CodeWriter;
use crate::{GenInput, GenOptions};

/// Heritage chains are followed at most this deep.
const MAX_HERITAGE_DEPTH: usize = 64;

/// A property after flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatProperty {
    pub name: String,
    pub optional: bool,
    /// Annotation as written.
    pub type_text: Option<String>,
    pub decorators: Vec<DecoratorMetadata>,
}

/// Render the metadata module.
pub fn generate_metadata(input: &GenInput<'_>, options: &GenOptions) -> Result<String> {
    let index = ProgramIndex::new(input.program);
    let mut w = CodeWriter::new();
    w.line(HEADER);
    w.blank();
    w.raw(DEEP_FREEZE);
    w.blank();
    w.raw(SEAL);
    w.blank();

    let mut classes: BTreeMap<String, (&ModuleNode, &Path, &ClassMetadata)> = BTreeMap::new();
    for module in input.graph.modules() {
        for file in &module.files {
            let Some(analysis) = input.program.get(file) else {
                continue;
            };
            for class in &analysis.classes {
                let registered =
                    module.providers.contains_key(&class.name) || module.controllers.contains_key(&class.name);
                if registered || !class.decorators.is_empty() {
                    classes.insert(module.node_id(&class.name), (module, file.as_path(), class));
                }
            }
        }
    }

    w.open("export const classMetadata = seal(new Map([");
    for (id, (module, file, class)) in &classes {
        write_class(&mut w, index, &options.root, id, module, file, class);
    }
    w.close("]));");
    w.blank();

    let mut scoped: BTreeMap<&str, Vec<String>> = [Scope::Request, Scope::Singleton, Scope::Transient]
        .into_iter()
        .map(|scope| (scope.as_str(), Vec::new()))
        .collect();
    for module in input.graph.modules() {
        for provider in module.providers.values() {
            scoped
                .entry(provider.scope.as_str())
                .or_default()
                .push(module.node_id(&provider.token));
        }
    }
    w.open("export const scopedKeys = seal(new Map([");
    for (scope, ids) in &mut scoped {
        ids.sort();
        let ids: Vec<String> = ids.iter().map(|id| quote(id)).collect();
        w.line(format!("[{}, deepFreeze([{}])],", quote(scope), ids.join(", ")));
    }
    w.close("]));");

    tracing::debug!(classes = classes.len(), "rendered class metadata");
    Ok(w.finish())
}

fn write_class(
    w: &mut CodeWriter,
    index: ProgramIndex<'_>,
    root: &Path,
    id: &str,
    module: &ModuleNode,
    file: &Path,
    class: &ClassMetadata,
) {
    let provider = module.providers.get(&class.name);
    w.open(format!("[{}, deepFreeze({{", quote(id)));
    w.line(format!("name: {},", quote(&class.name)));
    w.line(format!("module: {},", quote(&module.name)));
    w.line(format!("file: {},", quote(&relative_path(file, root))));
    w.line(format!(
        "scope: {},",
        provider.map_or_else(|| "null".to_string(), |p| quote(p.scope.as_str()))
    ));
    w.line(format!("controller: {},", module.controllers.contains_key(&class.name)));
    w.line(format!("decorators: {},", decorators(&class.decorators)));
    w.line(format!("params: {},", params(class.constructor_params())));

    w.open("methods: [");
    for method in &class.methods {
        w.line(format!(
            "{{ name: {}, static: {}, decorators: {}, params: {} }},",
            quote(&method.name),
            method.is_static,
            decorators(&method.decorators),
            params(&method.params)
        ));
    }
    w.close("],");

    w.open("properties: [");
    for property in flatten_properties(index, file, class).values() {
        w.line(format!(
            "{{ name: {}, optional: {}, type: {}, decorators: {} }},",
            quote(&property.name),
            property.optional,
            property.type_text.as_deref().map_or_else(|| "null".to_string(), quote),
            decorators(&property.decorators)
        ));
    }
    w.close("],");

    let middlewares: Vec<String> = class
        .configure
        .middlewares
        .iter()
        .map(|registration| {
            let refs: Vec<String> = registration.refs.iter().map(|r| quote(&r.name)).collect();
            format!(
                "{{ lifecycle: {}, refs: [{}] }}",
                quote(&registration.lifecycle),
                refs.join(", ")
            )
        })
        .collect();
    w.line(format!("middlewares: [{}],", middlewares.join(", ")));
    let filters: Vec<String> = class.configure.error_filters.iter().map(|f| quote(&f.name)).collect();
    w.line(format!("errorFilters: [{}],", filters.join(", ")));
    w.close("})],");
}

fn decorators(list: &[DecoratorMetadata]) -> String {
    let items: Vec<String> = list
        .iter()
        .map(|d| {
            let args: Vec<String> = d.args.iter().map(data).collect();
            format!("{{ name: {}, args: [{}] }}", quote(&d.name), args.join(", "))
        })
        .collect();
    format!("[{}]", items.join(", "))
}

fn params(list: &[ParameterMetadata]) -> String {
    let items: Vec<String> = list
        .iter()
        .map(|p| {
            format!(
                "{{ index: {}, name: {}, token: {}, optional: {}, decorators: {} }}",
                p.index,
                p.name.as_deref().map_or_else(|| "null".to_string(), quote),
                p.token().map_or_else(|| "null".to_string(), quote),
                p.optional,
                decorators(&p.decorators)
            )
        })
        .collect();
    format!("[{}]", items.join(", "))
}

/// Instance properties of `class` including inherited ones, by name.
pub fn flatten_properties(
    index: ProgramIndex<'_>,
    file: &Path,
    class: &ClassMetadata,
) -> BTreeMap<String, FlatProperty> {
    let mut visited = HashSet::default();
    Flattener { index }.class(file, class, 0, &mut visited)
}

#[derive(Clone, Copy)]
struct Flattener<'a> {
    index: ProgramIndex<'a>,
}

impl Flattener<'_> {
    fn class(
        &self,
        file: &Path,
        class: &ClassMetadata,
        depth: usize,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> BTreeMap<String, FlatProperty> {
        let mut props = BTreeMap::new();
        if depth > MAX_HERITAGE_DEPTH || !visited.insert((file.to_path_buf(), class.name.clone())) {
            return props;
        }

        let heritage = class.heritage.extends.iter().chain(&class.heritage.implements);
        for clause in heritage {
            props.extend(self.clause(file, clause, depth, visited));
        }
        for property in class.properties.iter().filter(|p| !p.is_static) {
            props.insert(
                property.name.clone(),
                FlatProperty {
                    name: property.name.clone(),
                    optional: property.optional,
                    type_text: property.type_ref.as_ref().map(|t| t.text.clone()),
                    decorators: property.decorators.clone(),
                },
            );
        }
        props
    }

    fn clause(
        &self,
        file: &Path,
        clause: &HeritageClause,
        depth: usize,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> BTreeMap<String, FlatProperty> {
        self.reference(file, &clause.name, &clause.type_arguments, depth, visited)
    }

    fn reference(
        &self,
        file: &Path,
        name: &str,
        type_arguments: &[TypeArgument],
        depth: usize,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> BTreeMap<String, FlatProperty> {
        let helper = matches!(name, "Partial" | "Pick" | "Omit" | "Required");
        if !helper {
            return match self.index.class(file, name) {
                Some((path, class)) => self.class(path, class, depth + 1, visited),
                None => BTreeMap::new(),
            };
        }

        let mut props = match type_arguments.first() {
            Some(TypeArgument::Reference {
                name,
                type_arguments,
                ..
            }) => self.reference(file, name, type_arguments, depth + 1, visited),
            _ => BTreeMap::new(),
        };
        let keys = type_arguments.get(1).map(TypeArgument::literal_keys).unwrap_or_default();
        match name {
            "Partial" => props.values_mut().for_each(|p| p.optional = true),
            "Required" => props.values_mut().for_each(|p| p.optional = false),
            "Pick" => props.retain(|name, _| keys.contains(name)),
            _ => props.retain(|name, _| !keys.contains(name)),
        }
        props
    }
}
