//! End-to-end analyzer tests over on-disk sources.

use graft_analyzer::{
    AnalyzerValue, DiagnosticReason, FileAnalysis, InjectKind, NativeRuntime, SourceAnalyzer,
    TypeArgument,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test helper to create a temporary project with the given files
fn create_test_project(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let cwd = temp.path().to_path_buf();
    for (name, content) in files {
        let path = cwd.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
    }
    (temp, cwd)
}

fn analyze(cwd: &Path, file: &str) -> Result<FileAnalysis, graft_analyzer::AnalyzerDiagnostic> {
    let path = cwd.join(file);
    let source = std::fs::read_to_string(&path).unwrap();
    let analyzer = SourceAnalyzer::new(Arc::new(NativeRuntime::new(cwd.to_path_buf())));
    analyzer.analyze(&path, &source)
}

const USER_SERVICE: &str = r#"
import { Injectable, Inject, inject, forwardRef } from '@graft/core';
import { UserRepository } from './user.repository';
import type { Clock } from '../shared/clock';

@Injectable({ scope: 'request', visibleTo: 'all' })
export class UserService extends BaseService<UserRepository> implements Partial<Named> {
  private readonly audit = inject(AuditLog);

  constructor(
    private readonly repo: UserRepository,
    @Inject('CONFIG') config: AppConfig,
    @Inject(forwardRef(() => Mailer)) mailer?: Mailer,
  ) {
    super();
  }

  @Get('/users')
  list() {}

  @Get('/dynamic')
  ['computed' + 'name']() {}

  helper() {}
}
"#;

#[test]
fn test_class_metadata_extraction() {
    let (_temp, cwd) = create_test_project(&[
        ("src/users/user.service.ts", USER_SERVICE),
        ("src/users/user.repository.ts", "export class UserRepository {}"),
    ]);

    let analysis = analyze(&cwd, "src/users/user.service.ts").unwrap();
    let class = analysis.class("UserService").unwrap();

    let injectable = class.decorator("Injectable").unwrap();
    assert!(injectable.is_call);
    assert_eq!(
        injectable.args[0].get("scope").and_then(|v| v.as_str()),
        Some("request")
    );

    let params = class.constructor_params();
    assert_eq!(params.len(), 3);
    assert!(params[0].is_property);
    assert_eq!(params[0].token(), Some("UserRepository"));
    assert_eq!(
        params[0].type_ref.as_ref().unwrap().import_source.as_deref(),
        Some(cwd.join("src/users/user.repository.ts").to_str().unwrap())
    );
    assert_eq!(params[1].token(), Some("CONFIG"));
    assert_eq!(params[2].token(), Some("Mailer"));
    assert!(params[2].optional);

    // `helper` carries no decorators and is dropped
    let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert_eq!(names[0], "list");
    assert!(names[1].starts_with("__computed_"));
    assert!(class.methods[1].computed);

    let extends = class.heritage.extends.as_ref().unwrap();
    assert_eq!(extends.name, "BaseService");
    assert!(matches!(
        &extends.type_arguments[0],
        TypeArgument::Reference { name, .. } if name == "UserRepository"
    ));
    assert!(class.heritage.implements[0].is_mapped_helper());

    assert_eq!(analysis.inject_sites.len(), 1);
    assert_eq!(analysis.inject_sites[0].token.as_deref(), Some("AuditLog"));
    assert_eq!(
        analysis.inject_sites[0].enclosing_class.as_deref(),
        Some("UserService")
    );

    // type-only import is not an edge
    assert_eq!(analysis.imports.len(), 2);
}

#[test]
fn test_inject_classification() {
    let (_temp, cwd) = create_test_project(&[(
        "src/a.ts",
        r#"
        import { inject } from '@graft/core';
        const a = inject(Token);
        const b = inject(() => Token);
        const c = inject(function () { return Token; });
        const d = inject(A, B);
        const e = inject(tokens[0]);
        const f = inject(() => { log(); return Token; });
        const g = inject();
        "#,
    )]);

    let analysis = analyze(&cwd, "src/a.ts").unwrap();
    let kinds: Vec<_> = analysis
        .inject_sites
        .iter()
        .map(|s| (s.kind, s.token.as_deref()))
        .collect();

    assert_eq!(
        kinds,
        vec![
            (InjectKind::Token, Some("Token")),
            (InjectKind::Thunk, Some("Token")),
            (InjectKind::Thunk, Some("Token")),
            (InjectKind::Invalid, None),
            (InjectKind::Invalid, None),
            (InjectKind::Invalid, None),
            (InjectKind::Invalid, None),
        ]
    );
}

#[test]
fn test_configure_middlewares() {
    let (_temp, cwd) = create_test_project(&[(
        "src/app.controller.ts",
        r#"
        import { Cors, RateLimit, NotFoundFilter } from './middleware';
        @Controller('/app')
        export class AppController {
          configure(consumer) {
            if (enabled) {
              consumer.addMiddlewares('before', [Cors, RateLimit.withOptions({ max: 10 })]);
            }
            consumer.addErrorFilters([NotFoundFilter]);
          }
        }
        "#,
    )]);

    let analysis = analyze(&cwd, "src/app.controller.ts").unwrap();
    let configure = &analysis.classes[0].configure;

    assert_eq!(configure.middlewares.len(), 1);
    assert_eq!(configure.middlewares[0].lifecycle, "before");
    let refs = &configure.middlewares[0].refs;
    assert_eq!(refs[0].name, "Cors");
    assert_eq!(refs[1].name, "RateLimit");
    assert_eq!(
        refs[1].options.as_ref().and_then(|o| o.get("max")),
        Some(&AnalyzerValue::Num(10.0))
    );
    assert_eq!(configure.error_filters[0].name, "NotFoundFilter");
}

#[test]
fn test_bad_configure_shape_fails_whole_file() {
    let cases = [
        (
            "consumer.addMiddlewares('before', middlewares);",
            DiagnosticReason::InvalidMiddlewareShape,
        ),
        (
            "consumer.addMiddlewares(phase, [Cors]);",
            DiagnosticReason::InvalidLifecycle,
        ),
        (
            "consumer.addMiddlewares('before', [make()]);",
            DiagnosticReason::InvalidMiddlewareShape,
        ),
        (
            "consumer.addErrorFilters(NotFoundFilter);",
            DiagnosticReason::InvalidErrorFilterShape,
        ),
    ];

    for (statement, reason) in cases {
        let source = format!(
            "export class Ok {{}}\nexport class AppController {{ configure(consumer) {{ {statement} }} }}"
        );
        let (_temp, cwd) = create_test_project(&[("src/app.ts", &source)]);

        let err = analyze(&cwd, "src/app.ts").unwrap_err();
        assert_eq!(err.reason, reason, "statement: {statement}");
        assert!(err.message.contains("AppController"));
    }
}

#[test]
fn test_module_definition_with_providers() {
    let (_temp, cwd) = create_test_project(&[
        (
            "src/users/module.ts",
            r#"
            import { defineModule } from '@graft/core';
            import { UserService } from './user.service';
            import { Orders } from '../orders/module';

            export const module = defineModule({
              name: 'users',
              providers: [
                UserService,
                { provide: 'CONFIG', useValue: { ttl: 30 }, visibleTo: [Orders] },
                { provide: 'clock', useFactory: (cfg) => new Date(cfg), inject: ['CONFIG'] },
                ...dynamicProviders,
              ],
              adapters: { http: { middlewares: { before: [Cors] } } },
            });
            export { module as usersModule };
            "#,
        ),
        ("src/users/user.service.ts", "export class UserService {}"),
        ("src/orders/module.ts", "export const module = {};"),
    ]);

    let analysis = analyze(&cwd, "src/users/module.ts").unwrap();
    assert_eq!(analysis.module_definitions.len(), 1);

    let site = &analysis.module_definitions[0];
    assert_eq!(site.export_name.as_deref(), Some("module"));
    assert_eq!(site.exported_as, vec!["module".to_string(), "usersModule".to_string()]);

    let def = &site.definition;
    assert_eq!(def.name.as_deref(), Some("users"));
    assert_eq!(def.providers.len(), 4);
    assert!(def.providers[3].is_spread());

    let visible_to = def.providers[1].get("visibleTo").unwrap().as_array().unwrap();
    let orders = visible_to[0].as_symbol().unwrap();
    assert_eq!(orders.imported, None);
    assert_eq!(
        orders.import_source.as_deref(),
        Some(cwd.join("src/orders/module.ts").to_str().unwrap())
    );

    assert!(matches!(
        def.providers[2].get("useFactory"),
        Some(AnalyzerValue::FactoryCapture(_))
    ));
    assert!(def.adapters.as_ref().unwrap().get("http").is_some());
}
