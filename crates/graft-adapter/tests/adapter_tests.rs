//! Adapter resolution and handler index tests over an in-memory project.

use graft_adapter::{AdapterError, AdapterResolver, build_handler_index};
use graft_analyzer::{AnalysisMap, MemoryRuntime, SourceAnalyzer};
use graft_graph::{GraphBuilder, GraphOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HTTP_ENTRY: &str = "/app/node_modules/@graft/http/index.ts";

fn http_package(runtime: MemoryRuntime) -> MemoryRuntime {
    runtime
        .with_package("@graft/http", HTTP_ENTRY)
        .with_file(HTTP_ENTRY, "export * from './spec';\nexport { Controller, Get } from './decorators';\n")
        .with_file(
            "/app/node_modules/@graft/http/decorators.ts",
            "export function Controller(path) {}\nexport function Get(path) {}\n",
        )
        .with_file(
            "/app/node_modules/@graft/http/spec.ts",
            "import { defineAdapter } from '@graft/core';\nimport { HttpAdapter } from './adapter';\nexport const adapterSpec = defineAdapter(HttpAdapter);\n",
        )
        .with_file(
            "/app/node_modules/@graft/http/adapter.ts",
            r#"
import { Controller, Get } from './decorators';
export class HttpAdapter {
  static adapterId = 'http';
  static middlewarePhaseOrder = ['global', 'route'];
  static supportedMiddlewarePhases = { global: true, route: true };
  static entryDecorators = { controller: Controller, handler: [Get] };
  static runtime = { start: start, stop: stop };
  static pipeline = { middlewares: [cors, auth], guards: [roles], pipes: [], handler: dispatch };
}
"#,
        )
}

const WS_ENTRY: &str = "/app/node_modules/@graft/ws/index.ts";

fn ws_package(runtime: MemoryRuntime, adapter_id: &str) -> MemoryRuntime {
    let adapter = format!(
        r#"
import {{ Gateway, Subscribe }} from './decorators';
export class WsAdapter {{
  static adapterId = '{adapter_id}';
  static middlewarePhaseOrder = ['global'];
  static supportedMiddlewarePhases = {{ global: true }};
  static entryDecorators = {{ controller: Gateway, handler: [Subscribe] }};
  static runtime = {{ start: listen, stop: close }};
  static pipeline = {{ middlewares: [], guards: [], pipes: [], handler: dispatch }};
}}
"#
    );
    runtime
        .with_package("@graft/ws", WS_ENTRY)
        .with_file(WS_ENTRY, "export * from './spec';\nexport { Gateway, Subscribe } from './decorators';\n")
        .with_file(
            "/app/node_modules/@graft/ws/decorators.ts",
            "export function Gateway(name) {}\nexport function Subscribe(event) {}\n",
        )
        .with_file(
            "/app/node_modules/@graft/ws/spec.ts",
            "import { defineAdapter } from '@graft/core';\nimport { WsAdapter } from './adapter';\nexport const adapterSpec = defineAdapter(WsAdapter);\n",
        )
        .with_file("/app/node_modules/@graft/ws/adapter.ts", adapter)
}

fn project_with(runtime: MemoryRuntime, files: &[(&str, &str)]) -> Project {
    let mut runtime = runtime;
    for (path, source) in files {
        runtime = runtime.with_file(format!("/app/{path}"), *source);
    }
    let analyzer = SourceAnalyzer::new(Arc::new(runtime));
    let program = files
        .iter()
        .map(|(path, source)| {
            let path = PathBuf::from(format!("/app/{path}"));
            let analysis = analyzer.analyze(&path, source).unwrap();
            (path, analysis)
        })
        .collect();
    Project { analyzer, program }
}

struct Project {
    analyzer: SourceAnalyzer,
    program: AnalysisMap,
}

fn project(files: &[(&str, &str)], with_http: bool) -> Project {
    let mut runtime = MemoryRuntime::new("/app");
    if with_http {
        runtime = http_package(runtime);
    }
    project_with(runtime, files)
}

const USERS_MODULE: &str = r#"
import { defineModule } from '@graft/core';
export const module = defineModule({
  name: 'users',
  adapters: { http: { middlewares: { route: [] }, prefix: '/api' } },
});
"#;

const USERS_CONTROLLER: &str = r#"
import { Controller, Get } from '@graft/http';
@Controller('/users')
export class UsersController {
  @Get('/')
  list() {}
  @Get('/:id')
  find() {}
}
"#;

#[tokio::test]
async fn test_resolves_adapter_through_reexports() {
    let p = project(
        &[("src/users/module.ts", USERS_MODULE), ("src/users/users.controller.ts", USERS_CONTROLLER)],
        true,
    );
    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();

    let http = specs.get("http").unwrap();
    assert_eq!(http.class_name, "HttpAdapter");
    assert_eq!(http.package, "@graft/http");
    assert_eq!(http.pipeline.guards, vec!["roles"]);
    assert_eq!(specs.controller_decorators(), vec!["Controller"]);
}

#[tokio::test]
async fn test_handler_index_is_sorted() {
    let p = project(
        &[("src/users/module.ts", USERS_MODULE), ("src/users/users.controller.ts", USERS_CONTROLLER)],
        true,
    );
    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();
    let options = GraphOptions {
        controller_decorators: specs.controller_decorators(),
        ..GraphOptions::default()
    };
    let graph = GraphBuilder::new(&p.program).with_options(options).build().unwrap();
    assert!(graph.module_by_name("users").unwrap().controllers.contains_key("UsersController"));

    let index = build_handler_index(&specs, &p.program, &graph, Path::new("/app")).unwrap();
    let ids: Vec<&str> = index.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "http:src/users/users.controller.ts#UsersController.find",
            "http:src/users/users.controller.ts#UsersController.list",
        ]
    );
}

#[tokio::test]
async fn test_handler_outside_controller() {
    let p = project(
        &[
            ("src/users/module.ts", USERS_MODULE),
            (
                "src/users/loose.ts",
                "import { Get } from '@graft/http';\nexport class Loose {\n  @Get('/')\n  list() {}\n}\n",
            ),
        ],
        true,
    );
    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();
    let graph = GraphBuilder::new(&p.program).build().unwrap();

    let err = build_handler_index(&specs, &p.program, &graph, Path::new("/app")).unwrap_err();
    assert!(
        matches!(&err, AdapterError::HandlerOutsideController { class, method, .. } if class == "Loose" && method == "list"),
        "{err}"
    );
}

#[tokio::test]
async fn test_unsupported_phase_in_module_config() {
    let module = USERS_MODULE.replace("route: []", "edge: []");
    let p = project(
        &[("src/users/module.ts", &module), ("src/users/users.controller.ts", USERS_CONTROLLER)],
        true,
    );
    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();
    let graph = GraphBuilder::new(&p.program).build().unwrap();

    let err = build_handler_index(&specs, &p.program, &graph, Path::new("/app")).unwrap_err();
    assert!(err.to_string().contains("Middleware phase 'edge' is not supported by adapter 'http'"), "{err}");
}

#[tokio::test]
async fn test_middlewares_decorator_phases() {
    let controller = r#"
import { Controller, Get } from '@graft/http';
import { Middlewares } from '@graft/core';
@Controller('/users')
@Middlewares({ global: [] })
export class UsersController {
  @Get('/')
  @Middlewares('session', [])
  list() {}
}
"#;
    let p = project(
        &[("src/users/module.ts", USERS_MODULE), ("src/users/users.controller.ts", controller)],
        true,
    );
    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();
    let graph = GraphBuilder::new(&p.program).build().unwrap();

    let err = build_handler_index(&specs, &p.program, &graph, Path::new("/app")).unwrap_err();
    assert!(
        matches!(&err, AdapterError::UnsupportedMiddlewarePhase { phase, .. } if phase == "session"),
        "{err}"
    );
}

#[tokio::test]
async fn test_no_adapter_spec() {
    let p = project(&[("src/users/module.ts", USERS_MODULE)], false);
    let err = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap_err();
    assert!(err.to_string().contains("No adapterSpec exports found"));
}

const CHAT_GATEWAY: &str = r#"
import { Gateway, Subscribe } from '@graft/ws';
@Gateway('chat')
export class ChatGateway {
  @Subscribe('message')
  onMessage() {}
}
"#;

#[tokio::test]
async fn test_duplicate_adapter_id() {
    let runtime = ws_package(http_package(MemoryRuntime::new("/app")), "http");
    let p = project_with(
        runtime,
        &[
            ("src/users/module.ts", USERS_MODULE),
            ("src/users/users.controller.ts", USERS_CONTROLLER),
            ("src/users/chat.gateway.ts", CHAT_GATEWAY),
        ],
    );

    let err = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap_err();
    match &err {
        AdapterError::DuplicateAdapterId { id, first, second } => {
            assert_eq!(id, "http");
            assert_eq!(first, "HttpAdapter");
            assert_eq!(second, "WsAdapter");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Duplicate adapter id"));
}

#[tokio::test]
async fn test_two_adapters_resolve_side_by_side() {
    let runtime = ws_package(http_package(MemoryRuntime::new("/app")), "ws");
    let p = project_with(
        runtime,
        &[
            ("src/users/module.ts", USERS_MODULE),
            ("src/users/users.controller.ts", USERS_CONTROLLER),
            ("src/users/chat.gateway.ts", CHAT_GATEWAY),
        ],
    );

    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs.controller_decorators(), vec!["Controller", "Gateway"]);
}

#[tokio::test]
async fn test_controller_owned_by_two_adapters() {
    let hybrid = r#"
import { Controller, Get } from '@graft/http';
import { Gateway } from '@graft/ws';
@Controller('/chat')
@Gateway('chat')
export class HybridController {
  @Get('/')
  list() {}
}
"#;
    let runtime = ws_package(http_package(MemoryRuntime::new("/app")), "ws");
    let p = project_with(
        runtime,
        &[("src/users/module.ts", USERS_MODULE), ("src/users/hybrid.controller.ts", hybrid)],
    );
    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();
    let graph = GraphBuilder::new(&p.program).build().unwrap();

    let err = build_handler_index(&specs, &p.program, &graph, Path::new("/app")).unwrap_err();
    match &err {
        AdapterError::MultipleAdapterOwners { class, adapters } => {
            assert_eq!(class, "HybridController");
            assert_eq!(adapters, &vec!["http".to_string(), "ws".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_class_middlewares_outside_controller() {
    let plain = r#"
import { Middlewares } from '@graft/core';
@Middlewares('global', [])
export class AuditTrail {
  record() {}
}
"#;
    let p = project(&[("src/users/module.ts", USERS_MODULE), ("src/users/audit.ts", plain)], true);
    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();
    let graph = GraphBuilder::new(&p.program).build().unwrap();

    let err = build_handler_index(&specs, &p.program, &graph, Path::new("/app")).unwrap_err();
    assert!(
        matches!(&err, AdapterError::MiddlewaresOutsideController { location } if location == "class 'AuditTrail'"),
        "{err}"
    );
}

#[tokio::test]
async fn test_method_middlewares_outside_controller() {
    let plain = r#"
import { Middlewares } from '@graft/core';
export class AuditTrail {
  @Middlewares('global', [])
  record() {}
}
"#;
    let p = project(&[("src/users/module.ts", USERS_MODULE), ("src/users/audit.ts", plain)], true);
    let specs = AdapterResolver::new(&p.analyzer).resolve(&p.program).await.unwrap();
    let graph = GraphBuilder::new(&p.program).build().unwrap();

    let err = build_handler_index(&specs, &p.program, &graph, Path::new("/app")).unwrap_err();
    assert!(
        matches!(&err, AdapterError::MiddlewaresOutsideController { location } if location == "'AuditTrail.record'"),
        "{err}"
    );
}
