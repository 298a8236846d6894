//! Project scaffolding: the fixed Vite + React + Tailwind project around the
//! caller's root component.
//!
//! Pure and total: the same source and dependency list always produce a
//! byte-identical [`ProjectFileSet`].

use serde_json::json;
use std::collections::BTreeMap;

use crate::config::PreviewConfig;
use crate::domain::{PackageSpec, ProjectFileSet};

/// Path of the caller-supplied root module.
pub const APP_MODULE_PATH: &str = "src/App.tsx";

/// Packages pinned by the scaffolder regardless of caller input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Default for Baseline {
    fn default() -> Self {
        let pairs = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            dependencies: pairs(&[
                ("react", "^18.2.0"),
                ("react-dom", "^18.2.0"),
                ("lucide-react", "latest"),
                ("clsx", "latest"),
                ("tailwind-merge", "latest"),
            ]),
            dev_dependencies: pairs(&[
                ("@types/react", "^18.2.66"),
                ("@types/react-dom", "^18.2.22"),
                ("@vitejs/plugin-react", "^4.2.1"),
                ("autoprefixer", "^10.4.19"),
                ("postcss", "^8.4.38"),
                ("tailwindcss", "^3.4.3"),
                ("vite", "^5.2.0"),
            ]),
        }
    }
}

impl Baseline {
    /// Whether `name` is pinned in either table.
    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }
}

/// Builds project file sets.
#[derive(Debug, Clone)]
pub struct Scaffolder {
    baseline: Baseline,
    project_name: String,
    dev_server_port: u16,
    external_port: u16,
}

impl Default for Scaffolder {
    fn default() -> Self {
        Self::from_config(&PreviewConfig::default())
    }
}

impl Scaffolder {
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            baseline: Baseline::default(),
            project_name: config.project_name.clone(),
            dev_server_port: config.dev_server_port,
            external_port: config.external_port,
        }
    }

    /// Replace the pinned baseline.
    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Runtime dependency table: baseline plus caller packages.
    ///
    /// Caller entries never override a baseline name. Duplicates collapse,
    /// the last occurrence wins. Bare names resolve to `latest`.
    pub fn resolve_dependencies(&self, requested: &[String]) -> BTreeMap<String, String> {
        let mut resolved = self.baseline.dependencies.clone();
        for spec in requested.iter().filter_map(|raw| PackageSpec::parse(raw)) {
            if self.baseline.contains(&spec.name) {
                continue;
            }
            let version = spec.version_or_latest().to_string();
            resolved.insert(spec.name, version);
        }
        resolved
    }

    /// Non-blank entries that are not valid package specifiers, in order.
    ///
    /// These are left out of the manifest.
    pub fn rejected_dependencies<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .map(String::as_str)
            .filter(|raw| !raw.trim().is_empty() && PackageSpec::parse(raw).is_none())
            .collect()
    }

    /// Produce the full project file set.
    pub fn scaffold(&self, source_code: &str, dependencies: &[String]) -> ProjectFileSet {
        let mut set = ProjectFileSet::new();
        set.write_file("package.json", self.manifest(dependencies))
            .write_file("index.html", INDEX_HTML)
            .write_file("vite.config.js", self.vite_config())
            .write_file("tailwind.config.js", TAILWIND_CONFIG)
            .write_file("postcss.config.js", POSTCSS_CONFIG)
            .create_dir("src")
            .write_file("src/main.tsx", MAIN_TSX)
            .write_file(APP_MODULE_PATH, source_code)
            .write_file("src/index.css", INDEX_CSS);
        set
    }

    fn manifest(&self, dependencies: &[String]) -> String {
        let manifest = json!({
            "name": self.project_name,
            "private": true,
            "version": "0.0.0",
            "type": "module",
            "scripts": {
                "dev": "vite",
                "build": "vite build",
                "preview": "vite preview",
            },
            "dependencies": self.resolve_dependencies(dependencies),
            "devDependencies": self.baseline.dev_dependencies,
        });
        format!("{:#}\n", manifest)
    }

    fn vite_config(&self) -> String {
        format!(
            r#"import {{ defineConfig }} from 'vite'
import react from '@vitejs/plugin-react'

export default defineConfig({{
  plugins: [react()],
  server: {{
    host: '0.0.0.0',
    port: Number(process.env.PORT) || {port},
    strictPort: true,
    hmr: {{
      clientPort: {client_port},
    }},
  }},
}})
"#,
            port = self.dev_server_port,
            client_port = self.external_port,
        )
    }
}

/// Scaffold with the default baseline and ports.
pub fn scaffold(source_code: &str, dependencies: &[String]) -> ProjectFileSet {
    Scaffolder::default().scaffold(source_code, dependencies)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Graph App</title>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/main.tsx"></script>
  </body>
</html>
"#;

const TAILWIND_CONFIG: &str = r#"/** @type {import('tailwindcss').Config} */
export default {
  content: [
    "./index.html",
    "./src/**/*.{js,ts,jsx,tsx}",
  ],
  theme: {
    extend: {},
  },
  plugins: [],
}
"#;

const POSTCSS_CONFIG: &str = r#"export default {
  plugins: {
    tailwindcss: {},
    autoprefixer: {},
  },
}
"#;

const MAIN_TSX: &str = r#"import React from 'react'
import ReactDOM from 'react-dom/client'
import App from './App.tsx'
import './index.css'

ReactDOM.createRoot(document.getElementById('root')!).render(
  <React.StrictMode>
    <App />
  </React.StrictMode>,
)
"#;

const INDEX_CSS: &str = r#"@tailwind base;
@tailwind components;
@tailwind utilities;
"#;
