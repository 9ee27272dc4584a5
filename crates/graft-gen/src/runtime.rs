//! Fixed runtime snippets embedded in generated files.

/// First line of every generated source file.
pub const HEADER: &str = "// Generated by graft. Do not edit.";

/// Parameter name of the lookup function passed to provider factories.
pub const LOOKUP: &str = "__lookup";

pub const DEEP_FREEZE: &str = r#"function deepFreeze(value) {
  if (value !== null && typeof value === "object" && !Object.isFrozen(value)) {
    Object.freeze(value);
    for (const key of Object.keys(value)) {
      deepFreeze(value[key]);
    }
  }
  return value;
}"#;

pub const SEAL: &str = r#"function seal(map) {
  const sealed = () => {
    throw new Error("[graft] metadata registry is sealed");
  };
  for (const method of ["set", "delete", "clear"]) {
    Object.defineProperty(map, method, { value: sealed });
  }
  return Object.freeze(map);
}"#;

/// Maps token values seen by `inject()` to node ids. Thunks
/// (`inject(() => Token)`) are unwrapped when the function itself is not a
/// registered token.
pub const INJECTION_CONTEXT: &str = r#"function injectionContext(lookup, entries) {
  const ids = new Map(entries);
  return (token) => {
    const key = ids.has(token) || typeof token !== "function" ? token : token();
    if (!ids.has(key)) {
      throw new Error("[graft] inject() called with an unregistered token");
    }
    return lookup(ids.get(key));
  };
}"#;

/// Container over `registry`: singletons cached for the container's
/// lifetime, request providers cached per `createScope()`, transient
/// providers built on every lookup and aliases forwarded to their target.
pub const CONTAINER: &str = r#"export function createContainer(overrides = {}) {
  const singletons = new Map();
  const pending = new Set();
  const has = (id) => Object.prototype.hasOwnProperty.call(registry, id);
  const keys = () => Object.keys(registry).sort();

  function scope(requests) {
    const resolve = (id) => {
      if (Object.prototype.hasOwnProperty.call(overrides, id)) {
        return overrides[id];
      }
      if (!has(id)) {
        throw new Error(`[graft] No provider registered for '${id}'`);
      }
      const entry = registry[id];
      if (entry.alias !== undefined) {
        return resolve(entry.alias);
      }
      if (entry.scope === "transient") {
        return entry.factory(resolve);
      }
      const cache = entry.scope === "request" ? requests : singletons;
      if (cache === undefined) {
        throw new Error(`[graft] '${id}' is request-scoped; resolve it through createScope()`);
      }
      if (cache.has(id)) {
        return cache.get(id);
      }
      if (pending.has(id)) {
        throw new Error(`[graft] Circular construction of '${id}'`);
      }
      pending.add(id);
      try {
        const instance = entry.factory(entry.scope === "singleton" ? root : resolve);
        cache.set(id, instance);
        return instance;
      } finally {
        pending.delete(id);
      }
    };
    return resolve;
  }

  const root = scope(undefined);
  return {
    resolve: root,
    createScope() {
      return { resolve: scope(new Map()), has, keys };
    },
    has,
    keys,
  };
}"#;
