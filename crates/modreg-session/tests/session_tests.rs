//! Integration tests for registration sessions

use modreg_change::{ChangeOrigin, ChangeSet};
use modreg_session::{Session, SessionCache, SessionConfig, SessionError, SessionState};
use modreg_source::{ResolveError, SourceFile};
use modreg_test_utils::{
    angular_workspace, init_tracing, single_module, APP_MODULE, ROOT_MODULE_PATH, ROUTING_MODULE,
    ROUTING_MODULE_PATH,
};
use modreg_workspace::{MemoryTree, VirtualTree};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const PATH: &str = "/src/app/app.module.ts";
const SMALL_MODULE: &str = "@NgModule({declarations: [AppComponent]})\nexport class AppModule {}\n";

fn open(tree: &MemoryTree, path: &str) -> Session {
    init_tracing();
    Session::open(tree, path, SessionConfig::default()).unwrap()
}

fn count_origin(changes: &ChangeSet, matches: impl Fn(&ChangeOrigin) -> bool) -> usize {
    changes.iter().filter(|c| matches(c.origin())).count()
}

// ============================================================================
// Example scenario
// ============================================================================

#[test]
fn declaration_with_import() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);

    let changes = session
        .add_to_slot("declarations", "WidgetComponent", Some("/widget.component"))
        .unwrap();
    session.commit(&mut tree).unwrap();

    assert_eq!(changes.len(), 2);
    assert!(matches!(changes[0].origin(), ChangeOrigin::Import { .. }));
    assert!(matches!(changes[1].origin(), ChangeOrigin::SlotEntry { .. }));
    assert_eq!(
        tree.read_text(PATH).unwrap(),
        "import { WidgetComponent } from './widget.component';\n\
         @NgModule({declarations: [AppComponent, WidgetComponent]})\n\
         export class AppModule {}\n"
    );
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn import_is_idempotent() {
    let tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);

    let first = session.add_import_only("Foo", "./a", false);
    assert!(session.is_imported("Foo", Some("/a")));
    let second = session.add_import_only("Foo", "./a", false);

    assert!(first.is_some());
    assert_eq!(second, None);
    assert_eq!(session.accumulated().len(), 1);
    assert!(session.is_imported("Foo", Some("/a")));
}

#[test]
fn snapshot_import_is_not_repeated() {
    let tree = single_module(PATH, APP_MODULE);
    let mut session = open(&tree, PATH);

    let change = session.add_import_only("AppComponent", "./app.component", false);

    assert_eq!(change, None);
    assert!(session.accumulated().is_empty());
    assert_eq!(session.state(), SessionState::Parsed);
}

#[test]
fn slot_entry_is_idempotent() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);

    session.add_declaration("Widget", Some("/widget")).unwrap();
    let second = session.add_declaration("Widget", Some("/widget")).unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(second.is_empty());
    let slot_edits = count_origin(&session.accumulated(), |o| {
        matches!(o, ChangeOrigin::SlotEntry { .. })
    });
    assert_eq!(slot_edits, 1);
    assert_eq!(result.text.matches("AppComponent, Widget]").count(), 1);
    assert_eq!(result.text.matches("import { Widget }").count(), 1);
}

#[test]
fn present_entry_only_gets_import() {
    let tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);

    let changes = session.add_declaration("AppComponent", Some("/app.component")).unwrap();

    assert_eq!(changes.len(), 1);
    assert!(matches!(changes[0].origin(), ChangeOrigin::Import { .. }));
}

#[test]
fn distinct_modules_are_distinct_imports() {
    let mut tree = single_module(PATH, "@NgModule({})\nclass M {}\n");
    let mut session = open(&tree, PATH);

    let a = session.add_import_only("Foo", "./a", false);
    let b = session.add_import_only("Foo", "./b", false);
    let result = session.commit(&mut tree).unwrap();

    assert!(a.is_some());
    assert!(b.is_some());
    assert_ne!(a, b);
    assert!(result
        .text
        .starts_with("import { Foo } from './a';\nimport { Foo } from './b';\n@NgModule"));
}

// ============================================================================
// Ordering and slot creation
// ============================================================================

#[test]
fn entries_keep_call_order_in_empty_slot() {
    let mut tree = single_module(PATH, APP_MODULE);
    let mut session = open(&tree, PATH);

    for symbol in ["A", "B", "C"] {
        session.add_symbol_to_metadata("providers", symbol, None).unwrap();
    }
    let result = session.commit(&mut tree).unwrap();

    assert!(result.text.contains("providers: [A, B, C],"));
}

#[test]
fn entries_keep_call_order_in_multiline_slot() {
    let mut tree = single_module(PATH, APP_MODULE);
    let mut session = open(&tree, PATH);

    session.add_declaration("AComponent", Some("/a.component")).unwrap();
    session.add_declaration("BComponent", Some("/b.component")).unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(result.text.contains(
        "declarations: [\n    AppComponent,\n    AComponent,\n    BComponent\n  ],"
    ));
    assert!(result.text.contains(
        "import { AppComponent } from './app.component';\n\
         import { AComponent } from './a.component';\n\
         import { BComponent } from './b.component';\n"
    ));
}

#[test]
fn absent_slot_is_created_once() {
    let mut tree = single_module(PATH, APP_MODULE);
    let mut session = open(&tree, PATH);

    let first = session
        .add_entry_component("DialogComponent", Some("/dialog.component"))
        .unwrap();
    let second = session
        .add_entry_component("ConfirmComponent", Some("/confirm.component"))
        .unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(matches!(first[1].origin(), ChangeOrigin::SlotCreation { .. }));
    assert_eq!(
        second[1].origin(),
        &ChangeOrigin::SlotCreation {
            slot: "entryComponents".to_string(),
            entries: vec!["DialogComponent".to_string(), "ConfirmComponent".to_string()],
        }
    );
    let creations = count_origin(&session.accumulated(), |o| {
        matches!(o, ChangeOrigin::SlotCreation { .. })
    });
    assert_eq!(creations, 1);
    assert!(result.text.contains(
        "bootstrap: [AppComponent],\n  entryComponents: [DialogComponent, ConfirmComponent]\n})"
    ));
    assert_eq!(result.text.matches("entryComponents").count(), 1);
}

#[test]
fn single_entry_creation() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);

    session.add_provider("ApiService", Some("/api.service")).unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(result
        .text
        .contains("@NgModule({declarations: [AppComponent], providers: [ApiService]})"));
}

#[test]
fn slots_created_in_empty_metadata_are_separated() {
    let module = "import { NgModule } from '@angular/core';\n\n\
                  @NgModule({})\nexport class AppModule {}\n";
    let mut tree = single_module(PATH, module);
    let mut session = open(&tree, PATH);

    session.add_provider("A", None).unwrap();
    session.add_export("B", None).unwrap();
    session.add_provider("C", None).unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(result.text.contains("@NgModule({providers: [A, C], exports: [B]})"));
    assert!(!SourceFile::parse(PATH, &result.text).unwrap().has_syntax_errors());
}

#[test]
fn empty_import_clause_takes_one_binding() {
    let module = "import {} from './a';\n\n\
                  @NgModule({declarations: []})\nexport class AppModule {}\n";
    let mut tree = single_module(PATH, module);
    let mut session = open(&tree, PATH);

    session.add_declaration("X", Some("/a")).unwrap();
    session.add_declaration("Y", Some("/a")).unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(result
        .text
        .starts_with("import { X } from './a';\nimport { Y } from './a';\n"));
    assert!(result.text.contains("@NgModule({declarations: [X, Y]})"));
    assert!(!SourceFile::parse(PATH, &result.text).unwrap().has_syntax_errors());
}

#[test]
fn member_expression_imports_root_identifier() {
    let mut tree = single_module(PATH, APP_MODULE);
    let mut session = open(&tree, PATH);

    session
        .add_symbol_to_metadata("imports", "RouterModule.forRoot(routes)", Some("@angular/router"))
        .unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(result
        .text
        .contains("import { RouterModule } from '@angular/router';\n"));
    assert!(result
        .text
        .contains("imports: [\n    BrowserModule,\n    RouterModule.forRoot(routes)\n  ],"));
}

#[test]
fn import_base_prefixes_suffixes() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let config = SessionConfig::with_import_base("@my/lib");
    let mut session = Session::open(&tree, PATH, config).unwrap();

    session.add_export("LibComponent", Some("/lib.component")).unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert_eq!(session.module_path(None), "@my/lib");
    assert!(result
        .text
        .starts_with("import { LibComponent } from '@my/lib/lib.component';\n"));
    assert!(result.text.contains("exports: [LibComponent]"));
}

// ============================================================================
// Commit
// ============================================================================

#[test]
fn commit_is_atomic() {
    let mut tree = single_module(PATH, APP_MODULE);
    let mut session = open(&tree, PATH);

    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();
    session.add_provider("ApiService", Some("/api.service")).unwrap();
    session.add_bootstrap("ShellComponent", Some("/shell.component")).unwrap();
    session.add_import("HttpClientModule", Some("/http")).unwrap();
    let pending = session.accumulated().len();
    let result = session.commit(&mut tree).unwrap();

    let text = tree.read_text(PATH).unwrap();
    assert_eq!(tree.commit_count(), 1);
    assert_eq!(result.applied, pending);
    for expected in [
        "import { WidgetComponent } from './widget.component';",
        "import { ApiService } from './api.service';",
        "import { ShellComponent } from './shell.component';",
        "import { HttpClientModule } from './http';",
        "    AppComponent,\n    WidgetComponent\n",
        "    BrowserModule,\n    HttpClientModule\n",
        "providers: [ApiService],",
        "bootstrap: [AppComponent, ShellComponent]",
    ] {
        assert!(text.contains(expected), "missing {expected:?} in\n{text}");
    }
}

#[test]
fn failed_resolution_leaves_session_untouched() {
    let tree = single_module(PATH, "@NgModule({providers: PROVIDERS})\nclass M {}\n");
    let mut session = open(&tree, PATH);

    let result = session.add_provider("ApiService", Some("/api.service"));

    assert_eq!(
        result,
        Err(SessionError::Resolve(ResolveError::SlotNotArray {
            slot: "providers".to_string()
        }))
    );
    assert!(session.accumulated().is_empty());
}

#[test]
fn missing_declaration_is_reported() {
    let tree = single_module(PATH, "export class Plain {}\n");
    let mut session = open(&tree, PATH);

    let result = session.add_declaration("Widget", None);

    assert!(matches!(
        result,
        Err(SessionError::Resolve(ResolveError::DeclarationNotFound { .. }))
    ));
}

#[test]
fn commit_twice_writes_identical_text() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);
    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();

    let first = session.commit(&mut tree).unwrap();
    let second = session.commit(&mut tree).unwrap();

    assert_eq!(first.text, second.text);
    assert_eq!(first.after, second.after);
    assert!(second.is_unchanged());
    assert_eq!(tree.commit_count(), 2);
    assert_eq!(session.state(), SessionState::Committed);
}

#[test]
fn foreign_write_is_refused() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);
    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();
    tree.insert(PATH, "// rewritten elsewhere\n");

    let result = session.commit(&mut tree);

    assert!(matches!(result, Err(SessionError::StaleSnapshot { .. })));
    assert_eq!(tree.read_text(PATH).unwrap(), "// rewritten elsewhere\n");
}

#[test]
fn discard_then_commit_writes_original() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);
    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();

    session.discard_accumulated();
    let result = session.commit(&mut tree).unwrap();

    assert!(session.accumulated().is_empty());
    assert_eq!(result.text, SMALL_MODULE);
    assert!(result.is_unchanged());
}

#[test]
fn discard_forgets_pending_dedup() {
    let tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);
    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();
    session.discard_accumulated();

    let again = session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();

    assert_eq!(again.len(), 2);
    assert_eq!(session.state(), SessionState::Accumulating);
}

#[test]
fn override_substitutes_pending_list() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);
    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();

    let before = session.accumulated();
    let slot_only = before.filter(|c| !matches!(c.origin(), ChangeOrigin::Import { .. }));
    session.override_accumulated(slot_only);
    let result = session.commit(&mut tree).unwrap();

    assert_eq!(before.len(), 2);
    assert_eq!(session.accumulated().len(), 1);
    assert_eq!(
        result.text,
        "@NgModule({declarations: [AppComponent, WidgetComponent]})\nexport class AppModule {}\n"
    );
}

#[test]
fn accumulated_is_a_snapshot() {
    let tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);

    let empty = session.accumulated();
    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();

    assert!(empty.is_empty());
    assert_eq!(session.accumulated().len(), 2);
}

#[test]
fn refresh_reparses_committed_text() {
    let mut tree = single_module(PATH, SMALL_MODULE);
    let mut session = open(&tree, PATH);
    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();
    session.commit(&mut tree).unwrap();

    session.refresh(&tree).unwrap();
    assert_eq!(session.state(), SessionState::Parsed);
    assert!(session.accumulated().is_empty());

    let again = session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();
    session.add_declaration("GadgetComponent", Some("/gadget.component")).unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(again.is_empty());
    assert!(result
        .text
        .contains("declarations: [AppComponent, WidgetComponent, GadgetComponent]"));
    assert!(result.text.contains(
        "import { WidgetComponent } from './widget.component';\n\
         import { GadgetComponent } from './gadget.component';\n"
    ));
}

// ============================================================================
// Routes
// ============================================================================

#[test]
fn router_declaration_is_found() {
    let tree = single_module(ROUTING_MODULE_PATH, ROUTING_MODULE);
    let session = open(&tree, ROUTING_MODULE_PATH);

    let router = session.router_module_declaration().unwrap().unwrap();

    assert_eq!(router.text, "RouterModule.forRoot(routes)");
}

#[test]
fn route_goes_before_wildcard_once() {
    let mut tree = single_module(ROUTING_MODULE_PATH, ROUTING_MODULE);
    let mut session = open(&tree, ROUTING_MODULE_PATH);
    let route = "{ path: 'about', component: AboutComponent }";

    let first = session.add_route_declaration(route).unwrap();
    let second = session.add_route_declaration(route).unwrap();
    let result = session.commit(&mut tree).unwrap();

    assert!(first.is_some());
    assert_eq!(second, None);
    assert!(result.text.contains(
        "  { path: '', component: HomeComponent },\n  \
         { path: 'about', component: AboutComponent },\n  \
         { path: '**', component: NotFoundComponent }\n];"
    ));
}

#[test]
fn route_without_router_is_an_error() {
    let tree = single_module(PATH, APP_MODULE);
    let mut session = open(&tree, PATH);

    assert_eq!(session.router_module_declaration().unwrap(), None);
    let result = session.add_route_declaration("{ path: 'x' }");

    assert!(matches!(
        result,
        Err(SessionError::Resolve(ResolveError::RouterModuleNotFound { .. }))
    ));
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn root_session_resolves_through_workspace_config() {
    let mut tree = angular_workspace();
    let mut cache = SessionCache::default();

    let session = cache.root_session(&tree, None).unwrap();
    assert_eq!(session.path(), ROOT_MODULE_PATH);
    session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();

    let shared = cache.session(&tree, "src/app/app.module.ts").unwrap();
    assert_eq!(shared.accumulated().len(), 2);
    shared.add_provider("ApiService", Some("/api.service")).unwrap();

    let results = cache.commit_all(&mut tree).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(tree.commit_count(), 1);
    let text = tree.read_text(ROOT_MODULE_PATH).unwrap();
    assert!(text.contains("WidgetComponent\n  ],"));
    assert!(text.contains("providers: [ApiService]"));
}

#[test]
fn root_session_needs_configuration() {
    let tree = single_module(PATH, SMALL_MODULE);
    let mut cache = SessionCache::default();

    let result = cache.root_session(&tree, None);

    assert!(matches!(result, Err(SessionError::Config(_))));
}

// ============================================================================
// Property-based tests
// ============================================================================

proptest! {
    #[test]
    fn prop_entries_follow_call_order(
        symbols in Just(vec!["Alpha", "Beta", "Gamma", "Delta", "Epsilon"]).prop_shuffle()
    ) {
        let mut tree = single_module(PATH, SMALL_MODULE);
        let mut session = Session::open(&tree, PATH, SessionConfig::default()).unwrap();

        for symbol in &symbols {
            session.add_symbol_to_metadata("providers", symbol, None).unwrap();
            session.add_symbol_to_metadata("providers", symbol, None).unwrap();
        }
        let result = session.commit(&mut tree).unwrap();

        let expected = format!("providers: [{}]", symbols.join(", "));
        prop_assert!(result.text.contains(&expected));
    }
}
