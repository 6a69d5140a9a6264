//! Testing utilities for modreg workspace
//!
//! Shared fixtures and test tracing setup.

#![allow(missing_docs)]

use modreg_workspace::MemoryTree;
use std::sync::Once;

pub const ROOT_MODULE_PATH: &str = "/src/app/app.module.ts";
pub const ROUTING_MODULE_PATH: &str = "/src/app/app-routing.module.ts";
pub const MAIN_PATH: &str = "/src/main.ts";

pub const ANGULAR_JSON: &str = r#"{
  "version": 1,
  "newProjectRoot": "projects",
  "defaultProject": "shop",
  "projects": {
    "shop": {
      "projectType": "application",
      "root": "",
      "sourceRoot": "src",
      "prefix": "app",
      "architect": {
        "build": {
          "builder": "@angular-devkit/build-angular:browser",
          "options": {
            "outputPath": "dist/shop",
            "index": "src/index.html",
            "main": "src/main.ts",
            "tsConfig": "tsconfig.app.json"
          }
        }
      }
    }
  }
}
"#;

pub const MAIN_TS: &str = "\
import { enableProdMode } from '@angular/core';
import { platformBrowserDynamic } from '@angular/platform-browser-dynamic';

import { AppModule } from './app/app.module';

platformBrowserDynamic().bootstrapModule(AppModule)
  .catch(err => console.error(err));
";

pub const APP_MODULE: &str = "\
import { BrowserModule } from '@angular/platform-browser';
import { NgModule } from '@angular/core';

import { AppComponent } from './app.component';

@NgModule({
  declarations: [
    AppComponent
  ],
  imports: [
    BrowserModule
  ],
  providers: [],
  bootstrap: [AppComponent]
})
export class AppModule { }
";

pub const ROUTING_MODULE: &str = "\
import { NgModule } from '@angular/core';
import { Routes, RouterModule } from '@angular/router';

const routes: Routes = [
  { path: '', component: HomeComponent },
  { path: '**', component: NotFoundComponent }
];

@NgModule({
  imports: [RouterModule.forRoot(routes)],
  exports: [RouterModule]
})
export class AppRoutingModule { }
";

/// Store holding `angular.json`, `main.ts` and the root module
pub fn angular_workspace() -> MemoryTree {
    MemoryTree::new()
        .with_file("/angular.json", ANGULAR_JSON)
        .with_file(MAIN_PATH, MAIN_TS)
        .with_file(ROOT_MODULE_PATH, APP_MODULE)
}

/// Store holding a single module file
pub fn single_module(path: &str, text: &str) -> MemoryTree {
    MemoryTree::new().with_file(path, text)
}

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
