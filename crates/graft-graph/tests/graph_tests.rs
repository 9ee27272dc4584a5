//! Graph construction and validation over analyzed in-memory projects.

use graft_analyzer::{AnalysisMap, MemoryRuntime, SourceAnalyzer};
use graft_graph::{
    GraphBuilder, GraphError, GraphWarning, ModuleGraph, ModuleImpact, ProgramSymbols,
    ProviderStrategy, Scope, Visibility,
};
use proptest::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Analyze every file of a project rooted at `/app`.
fn analyze(files: &[(&str, &str)]) -> AnalysisMap {
    let runtime = files
        .iter()
        .fold(MemoryRuntime::new("/app"), |rt, (path, src)| {
            rt.with_file(format!("/app/{path}"), *src)
        });
    let analyzer = SourceAnalyzer::new(Arc::new(runtime));
    files
        .iter()
        .map(|(path, src)| {
            let path = PathBuf::from(format!("/app/{path}"));
            let analysis = analyzer.analyze(&path, src).unwrap();
            (path, analysis)
        })
        .collect()
}

fn build(files: &[(&str, &str)]) -> Result<ModuleGraph, GraphError> {
    let analyses = analyze(files);
    GraphBuilder::new(&analyses).build()
}

fn module_file(name: &str) -> String {
    format!(
        "import {{ defineModule }} from '@graft/core';\nexport const module = defineModule({{ name: '{name}' }});\n"
    )
}

const USERS_MODULE: &str = "import { defineModule } from '@graft/core';\nexport const module = defineModule({ name: 'users' });\n";
const ORDERS_MODULE: &str = "import { defineModule } from '@graft/core';\nexport const module = defineModule({ name: 'orders' });\n";

#[test]
fn test_mutual_module_dependency_is_a_cycle() {
    let err = build(&[
        ("src/users/module.ts", USERS_MODULE),
        (
            "src/users/users.service.ts",
            r#"
import { Injectable } from '@graft/core';
import { OrdersService } from '../orders/orders.service';
@Injectable({ visibleTo: 'all' })
export class UsersService { constructor(private orders: OrdersService) {} }
"#,
        ),
        ("src/orders/module.ts", ORDERS_MODULE),
        (
            "src/orders/orders.service.ts",
            r#"
import { Injectable } from '@graft/core';
import { UsersService } from '../users/users.service';
@Injectable({ visibleTo: 'all' })
export class OrdersService { constructor(private users: UsersService) {} }
"#,
        ),
    ])
    .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("Circular dependency detected"), "{text}");
    assert!(text.contains("orders -> users -> orders"), "{text}");
}

#[test]
fn test_diamond_builds() {
    let service = |name: &str, deps: &[(&str, &str)]| {
        let imports: String = deps
            .iter()
            .map(|(class, module)| format!("import {{ {class} }} from '../{module}/service';\n"))
            .collect();
        let params: Vec<String> = deps
            .iter()
            .map(|(class, _)| format!("private {}: {class}", class.to_lowercase()))
            .collect();
        format!(
            "import {{ Injectable }} from '@graft/core';\n{imports}@Injectable({{ visibleTo: 'all' }})\nexport class {name} {{ constructor({}) {{}} }}\n",
            params.join(", ")
        )
    };

    let a = service("A", &[("B", "b"), ("C", "c")]);
    let b = service("B", &[("D", "d")]);
    let c = service("C", &[("D", "d")]);
    let d = service("D", &[]);
    let (ma, mb, mc, md) = (module_file("a"), module_file("b"), module_file("c"), module_file("d"));

    let graph = build(&[
        ("src/a/module.ts", ma.as_str()),
        ("src/a/service.ts", a.as_str()),
        ("src/b/module.ts", mb.as_str()),
        ("src/b/service.ts", b.as_str()),
        ("src/c/module.ts", mc.as_str()),
        ("src/c/service.ts", c.as_str()),
        ("src/d/module.ts", md.as_str()),
        ("src/d/service.ts", d.as_str()),
    ])
    .unwrap();

    let names: Vec<&str> = graph.modules().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);

    let a_id = Path::new("/app/src/a/module.ts");
    let deps: Vec<&Path> = graph.dependencies_of(a_id).collect();
    assert_eq!(
        deps,
        vec![Path::new("/app/src/b/module.ts"), Path::new("/app/src/c/module.ts")]
    );
}

fn billing_project(consumer_dir: &str, visible_to: &str) -> Vec<(String, String)> {
    vec![
        ("src/billing/module.ts".into(), module_file("billing")),
        (
            "src/billing/billing.service.ts".into(),
            format!(
                r#"
import {{ Injectable }} from '@graft/core';
import {{ module as ordersModule }} from '../orders/module';
@Injectable({{ visibleTo: {visible_to} }})
export class BillingService {{}}
"#
            ),
        ),
        ("src/orders/module.ts".into(), ORDERS_MODULE.into()),
        ("src/users/module.ts".into(), USERS_MODULE.into()),
        (
            format!("src/{consumer_dir}/consumer.ts"),
            r#"
import { Injectable } from '@graft/core';
import { BillingService } from '../billing/billing.service';
@Injectable()
export class Consumer { constructor(private billing: BillingService) {} }
"#
            .into(),
        ),
    ]
}

fn build_owned(files: &[(String, String)]) -> Result<ModuleGraph, GraphError> {
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect();
    build(&borrowed)
}

#[test]
fn test_allowlist_rejects_other_modules() {
    let err = build_owned(&billing_project("users", "[ordersModule]")).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("Visibility Violation"), "{text}");
    assert!(text.contains("'billing'") && text.contains("'users'"), "{text}");
}

#[test]
fn test_allowlist_admits_listed_module() {
    let graph = build_owned(&billing_project("orders", "[ordersModule, ordersModule]")).unwrap();
    let billing = graph.module_by_name("billing").unwrap();
    assert_eq!(
        billing.providers["BillingService"].visibility,
        Visibility::Allowlist(vec!["orders".to_string()])
    );
}

#[test]
fn test_visible_to_all() {
    assert!(build_owned(&billing_project("users", "'all'")).is_ok());
}

#[test]
fn test_module_visibility_is_private() {
    let err = build_owned(&billing_project("users", "'module'")).unwrap_err();
    assert!(matches!(err, GraphError::VisibilityViolation { .. }), "{err}");

    let graph = build_owned(&billing_project("billing", "'module'")).unwrap();
    let billing = graph.module_by_name("billing").unwrap();
    assert_eq!(billing.providers["BillingService"].visibility, Visibility::Module);
    assert!(billing.providers.contains_key("Consumer"));
}

fn scoped_project(consumer_scope: &str) -> Vec<(&'static str, String)> {
    vec![
        ("src/users/module.ts", USERS_MODULE.to_string()),
        (
            "src/users/context.ts",
            "import { Injectable } from '@graft/core';\n@Injectable({ scope: 'request-context' })\nexport class RequestContext {}\n".to_string(),
        ),
        (
            "src/users/service.ts",
            format!(
                "import {{ Injectable }} from '@graft/core';\nimport {{ RequestContext }} from './context';\n@Injectable({{ scope: '{consumer_scope}' }})\nexport class UsersService {{ constructor(private ctx: RequestContext) {{}} }}\n"
            ),
        ),
    ]
}

#[test]
fn test_singleton_capturing_request_scope() {
    let files = scoped_project("singleton");
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, s)| (*p, s.as_str())).collect();
    let err = build(&borrowed).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("Scope Violation"), "{text}");
    assert!(text.contains("UsersService") && text.contains("RequestContext"), "{text}");
}

#[test]
fn test_transient_may_depend_on_request_scope() {
    let files = scoped_project("transient");
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, s)| (*p, s.as_str())).collect();
    let graph = build(&borrowed).unwrap();
    let users = graph.module_by_name("users").unwrap();
    assert_eq!(users.providers["RequestContext"].scope, Scope::Request);
    assert_eq!(users.providers["UsersService"].scope, Scope::Transient);
}

#[test]
fn test_inherited_request_scope_capture() {
    let err = build(&[
        ("src/users/module.ts", USERS_MODULE),
        (
            "src/users/context.ts",
            "import { Injectable } from '@graft/core';\n@Injectable({ scope: 'request' })\nexport class RequestContext {}\n",
        ),
        (
            "src/users/base.ts",
            "import { inject } from '@graft/core';\nimport { RequestContext } from './context';\nexport class Base { protected ctx = inject(RequestContext); }\n",
        ),
        (
            "src/users/service.ts",
            "import { Injectable } from '@graft/core';\nimport { Base } from './base';\n@Injectable()\nexport class UsersService extends Base {}\n",
        ),
    ])
    .unwrap_err();

    match err {
        GraphError::ScopeViolation { consumer, target, via, .. } => {
            assert_eq!(consumer, "UsersService");
            assert_eq!(target, "RequestContext");
            assert_eq!(via.as_deref(), Some("Base"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_indeterminable_inject_token() {
    let err = build(&[
        ("src/users/module.ts", USERS_MODULE),
        (
            "src/users/service.ts",
            "import { inject } from '@graft/core';\nexport const pair = inject(A, B);\n",
        ),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("token is not statically determinable"), "{err}");
}

#[test]
fn test_definition_errors() {
    let missing = build(&[("src/users/module.ts", "export const x = 1;\n")]).unwrap_err();
    assert!(missing.to_string().contains("Missing module definition"), "{missing}");

    let multiple = build(&[(
        "src/users/module.ts",
        "import { defineModule } from '@graft/core';\nexport const module = defineModule({});\nexport const other = defineModule({});\n",
    )])
    .unwrap_err();
    assert!(multiple.to_string().contains("Multiple module definitions"), "{multiple}");

    let unexported = build(&[(
        "src/users/module.ts",
        "import { defineModule } from '@graft/core';\nconst module = defineModule({});\n",
    )])
    .unwrap_err();
    assert!(unexported.to_string().contains("Module definition is not exported"), "{unexported}");
}

#[test]
fn test_orphans_abort_build() {
    let err = build(&[
        ("src/users/module.ts", USERS_MODULE),
        ("src/b.ts", "export const b = 1;\n"),
        ("src/a.ts", "export const a = 1;\n"),
    ])
    .unwrap_err();
    match err {
        GraphError::OrphanFiles { files } => assert_eq!(
            files,
            vec![PathBuf::from("/app/src/a.ts"), PathBuf::from("/app/src/b.ts")]
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_derived_name_and_duplicates() {
    let graph = build(&[(
        "src/catalog/module.ts",
        "import { defineModule } from '@graft/core';\nexport const module = defineModule({});\n",
    )])
    .unwrap();
    assert!(graph.module_by_name("catalog").is_some());

    let err = build(&[
        ("src/one/module.ts", USERS_MODULE),
        ("src/two/module.ts", USERS_MODULE),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("Duplicate module name 'users'"), "{err}");
}

#[test]
fn test_explicit_entry_amends_implicit() {
    let graph = build(&[
        (
            "src/users/module.ts",
            r#"
import { defineModule } from '@graft/core';
import { UsersService } from './service';
import { extraProviders } from './extra';
export const module = defineModule({
  name: 'users',
  providers: [
    { provide: UsersService, scope: 'transient' },
    { provide: 'API_URL', useValue: 'https://example.test' },
    { provide: 'Alias', useExisting: UsersService },
    ...extraProviders,
  ],
});
"#,
        ),
        (
            "src/users/service.ts",
            "import { Injectable } from '@graft/core';\n@Injectable({ visibleTo: 'all' })\nexport class UsersService {}\n",
        ),
        ("src/users/extra.ts", "export const extraProviders = [];\n"),
    ])
    .unwrap();

    let users = graph.module_by_name("users").unwrap();
    let service = &users.providers["UsersService"];
    assert!(service.explicit);
    assert_eq!(service.scope, Scope::Transient);
    assert_eq!(service.visibility, Visibility::All);
    assert!(matches!(service.strategy, ProviderStrategy::Constructor { .. }));
    assert_eq!(service.file, PathBuf::from("/app/src/users/service.ts"));

    assert!(matches!(users.providers["API_URL"].strategy, ProviderStrategy::Value { .. }));
    assert!(matches!(
        &users.providers["Alias"].strategy,
        ProviderStrategy::Existing { token } if token == "UsersService"
    ));
    assert_eq!(users.dynamic_providers.len(), 1);

    let tokens: Vec<&str> = users.providers.keys().map(String::as_str).collect();
    assert_eq!(tokens, vec!["API_URL", "Alias", "UsersService"]);
}

#[test]
fn test_two_explicit_entries_are_ambiguous() {
    let err = build(&[(
        "src/users/module.ts",
        r#"
import { defineModule } from '@graft/core';
export const module = defineModule({
  providers: [
    { provide: 'TOKEN', useValue: 1 },
    { provide: 'TOKEN', useValue: 2 },
  ],
});
"#,
    )])
    .unwrap_err();
    assert!(err.to_string().contains("Ambiguous provider 'TOKEN'"), "{err}");
}

#[test]
fn test_invalid_scope_is_fatal() {
    let err = build(&[(
        "src/users/module.ts",
        "import { defineModule } from '@graft/core';\nexport const module = defineModule({ providers: [{ provide: 'X', useValue: 1, scope: 'session' }] });\n",
    )])
    .unwrap_err();
    assert!(err.to_string().contains("Invalid provider scope 'session'"), "{err}");
}

#[test]
fn test_factory_provider_dependencies() {
    let graph = build(&[(
        "src/users/module.ts",
        r#"
import { defineModule, inject, Injectable } from '@graft/core';
@Injectable()
export class Clock { now() { return 0; } }
export const module = defineModule({
  providers: [
    { provide: 'Config', useValue: { port: 8080 } },
    { provide: 'Port', useFactory: (config) => config.port, inject: ['Config'] },
    { provide: 'Now', useFactory: () => inject(Clock).now() },
  ],
});
"#,
    )])
    .unwrap();

    let users = graph.module_by_name("users").unwrap();
    let port_deps: Vec<String> = users.providers["Port"]
        .dependencies()
        .into_iter()
        .map(|d| d.token)
        .collect();
    assert_eq!(port_deps, vec!["Config".to_string()]);

    let now_deps: Vec<String> = users.providers["Now"]
        .dependencies()
        .into_iter()
        .map(|d| d.token)
        .collect();
    assert_eq!(now_deps, vec!["Clock".to_string()]);
    assert_eq!(users.raw_dependencies.len(), 1);
}

#[test]
fn test_advisory_warnings() {
    let files = analyze(&[
        ("src/users/module.ts", USERS_MODULE),
        (
            "src/users/service.ts",
            r#"
import { Injectable } from '@graft/core';
export interface Mailer { send(): void }
export class Clock {}
@Injectable()
export class UsersService { constructor(private mailer: Mailer, private clock: Clock) {} }
"#,
        ),
    ]);
    let symbols = ProgramSymbols::new(&files);
    let graph = GraphBuilder::new(&files).with_symbols(&symbols).build().unwrap();

    assert_eq!(graph.warnings().len(), 2);
    assert!(graph.warnings().iter().any(|w| matches!(
        w,
        GraphWarning::UnimplementedInterface { interface, .. } if interface == "Mailer"
    )));
    assert!(graph.warnings().iter().any(|w| matches!(
        w,
        GraphWarning::UnresolvedDependency { token, .. } if token == "Clock"
    )));
}

#[test]
fn test_module_impact() {
    let files = analyze(&[
        ("src/users/module.ts", USERS_MODULE),
        (
            "src/users/service.ts",
            "import { Injectable } from '@graft/core';\n@Injectable({ visibleTo: 'all' })\nexport class UsersService {}\n",
        ),
        ("src/orders/module.ts", ORDERS_MODULE),
        (
            "src/orders/service.ts",
            "import { Injectable } from '@graft/core';\nimport { UsersService } from '../users/service';\n@Injectable()\nexport class OrdersService { constructor(private users: UsersService) {} }\n",
        ),
        ("src/admin/module.ts", module_file("admin").as_str()),
    ]);
    let graph = GraphBuilder::new(&files).build().unwrap();

    let impact = ModuleImpact::compute(&graph, &files, &[PathBuf::from("/app/src/users/service.ts")]);
    assert_eq!(impact.changed.len(), 1);
    assert_eq!(impact.affected_names(&graph), vec!["orders", "users"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: insertion order never changes the graph.
    #[test]
    fn prop_insertion_order_is_irrelevant(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
        let project: Vec<(String, String)> = vec![
            ("src/users/module.ts".into(), USERS_MODULE.into()),
            ("src/users/a.ts".into(), "import { Injectable } from '@graft/core';\n@Injectable({ visibleTo: 'all' })\nexport class A {}\n".into()),
            ("src/users/b.ts".into(), "import { Injectable } from '@graft/core';\n@Injectable()\nexport class B {}\n".into()),
            ("src/orders/module.ts".into(), ORDERS_MODULE.into()),
            ("src/orders/c.ts".into(), "import { Injectable } from '@graft/core';\nimport { A } from '../users/a';\n@Injectable()\nexport class C { constructor(a: A) {} }\n".into()),
            ("src/admin/module.ts".into(), module_file("admin")),
        ];
        let shuffled: Vec<(String, String)> = order.iter().map(|&i| project[i].clone()).collect();

        let reference = build_owned(&project).unwrap();
        let graph = build_owned(&shuffled).unwrap();

        let ids = |g: &ModuleGraph| g.modules().map(|m| m.id.clone()).collect::<Vec<_>>();
        let tokens = |g: &ModuleGraph| {
            g.modules()
                .flat_map(|m| m.providers.keys().map(|t| m.node_id(t)))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(ids(&graph), ids(&reference));
        prop_assert_eq!(tokens(&graph), tokens(&reference));
    }
}
