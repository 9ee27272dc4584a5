//! Adapter configuration artifact.

use graft_analyzer::{InjectSite, ProgramIndex};
use std::collections::BTreeMap;

use crate::error::{GenError, Result};
use crate::imports::{ImportTable, quote};
use crate::render::Renderer;
use crate::runtime::{DEEP_FREEZE, HEADER};
use crate::writer::CodeWriter;
use crate::{GenInput, GenOptions};

/// Render `adapterConfig` (module name -> adapter id -> config, keys
/// sorted) and the flattened `handlerIndex` id list.
pub fn generate_module_config(input: &GenInput<'_>, options: &GenOptions) -> Result<String> {
    let mut imports = ImportTable::new(ProgramIndex::new(input.program), &options.out_dir);
    let mut configs: BTreeMap<&str, String> = BTreeMap::new();
    for module in input.graph.modules() {
        let Some(adapters) = &module.definition.adapters else {
            continue;
        };
        let reject = |_: &InjectSite| -> Result<String> {
            Err(GenError::unrenderable(
                format!("adapter config of module '{}'", module.name),
                "inject() is not available in module configuration",
            ))
        };
        let rendered = Renderer::new(&mut imports)
            .sorted()
            .value(&module.id, adapters, &reject)?;
        configs.insert(&module.name, rendered);
    }

    let mut handler_ids: Vec<&str> = input.handler_index.iter().map(|h| h.id.as_str()).collect();
    handler_ids.sort_unstable();
    handler_ids.dedup();

    let mut w = CodeWriter::new();
    w.line(HEADER);
    imports.write(&mut w);
    w.blank();
    w.raw(DEEP_FREEZE);
    w.blank();

    w.open("export const adapterConfig = deepFreeze({");
    for (module, config) in &configs {
        w.line(format!("{}: {config},", quote(module)));
    }
    w.close("});");
    w.blank();

    w.open("export const handlerIndex = Object.freeze([");
    for id in handler_ids {
        w.line(format!("{},", quote(id)));
    }
    w.close("]);");

    Ok(w.finish())
}
